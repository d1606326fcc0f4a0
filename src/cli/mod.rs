pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::context::{self, Credentials};

#[derive(Parser)]
#[command(name = "notes")]
#[command(about = "Notes CLI - users, notes, tags and tokens over PostgreSQL")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long = "as-id", global = true, help = "Person id recorded in created_by/updated_by fields")]
    pub as_id: Option<i32>,

    #[arg(long = "as-name", global = true, help = "Person name recorded in created_by/updated_by fields")]
    pub as_name: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check database connectivity")]
    Health,

    #[command(about = "User registration and profiles")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Notes, tags and comments")]
    Note {
        #[command(subcommand)]
        cmd: commands::note::NoteCommands,
    },

    #[command(about = "Stored access tokens")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

impl Cli {
    /// Acting identity, when both flags are given
    pub fn credentials(&self) -> Option<Credentials> {
        match (self.as_id, self.as_name.as_deref()) {
            (Some(id), Some(name)) => Some(Credentials::new(id, name)),
            _ => None,
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    match cli.credentials() {
        Some(credentials) => context::with_credentials(credentials, dispatch(cli.command, output_format)).await,
        None => dispatch(cli.command, output_format).await,
    }
}

async fn dispatch(command: Commands, output_format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Health => commands::health::handle(output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, output_format).await,
        Commands::Note { cmd } => commands::note::handle(cmd, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
    }
}
