use clap::Parser;
use notes_api::cli::utils::output_failure;
use notes_api::cli::{Cli, OutputFormat};
use notes_api::database::DatabaseManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    notes_api::logging::init_tracing();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);

    let result = notes_api::cli::run(cli).await;
    DatabaseManager::close().await;

    if let Err(e) = result {
        output_failure(&output_format, &e);
        std::process::exit(1);
    }

    Ok(())
}
