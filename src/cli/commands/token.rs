use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::services::TokenService;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Store an issued token for a user")]
    Store {
        #[arg(long, help = "User uu_id")]
        user: Uuid,
        #[arg(help = "Token string")]
        token: String,
        #[arg(long, help = "Use the refresh lifetime instead of the access lifetime")]
        refresh: bool,
    },

    #[command(about = "Check whether a token is live and who owns it")]
    Check {
        #[arg(help = "Token string")]
        token: String,
    },

    #[command(about = "Expire a token now")]
    Revoke {
        #[arg(help = "Token string")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = TokenService::from_env().await?;

    match cmd {
        TokenCommands::Store { user, token, refresh } => {
            let service = if refresh { service.for_refresh() } else { service };
            let stored = service.store(user, &token).await?;
            output_success(
                &output_format,
                &format!("Token stored until {}", stored.meta.expiry_ends.format("%Y-%m-%d %H:%M:%S")),
                Some(json!({ "token": stored })),
            )
        }
        TokenCommands::Check { token } => {
            let user = service.resolve_user(&token).await?;
            output_success(
                &output_format,
                &format!("Token is live for {}", user.email),
                Some(json!({ "user": user })),
            )
        }
        TokenCommands::Revoke { token } => {
            service.revoke(&token).await?;
            output_success(&output_format, "Token revoked", None)
        }
    }
}
