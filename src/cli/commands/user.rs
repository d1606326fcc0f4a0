use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::User;
use crate::services::{ProfileUpdate, RegisterUser, UserService};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Register a user, or return the existing one for that email")]
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
        #[arg(long = "password-hash", help = "Precomputed password digest to store")]
        password_hash: Option<String>,
    },

    #[command(about = "List live users")]
    List {
        #[command(flatten)]
        list: ListArgs,
    },

    #[command(about = "Show a user by uu_id or email")]
    Show {
        #[arg(help = "User uu_id or email")]
        user: String,
    },

    #[command(about = "Change name and/or surname")]
    Update {
        #[arg(help = "User uu_id")]
        uu_id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        surname: Option<String>,
    },

    #[command(about = "Soft-delete a user")]
    Deactivate {
        #[arg(help = "User uu_id")]
        uu_id: Uuid,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = UserService::from_env().await?;

    match cmd {
        UserCommands::Register { email, name, surname, password_hash } => {
            let outcome = service
                .register(RegisterUser { email, name, surname, password_hash })
                .await?;
            let message = if outcome.created {
                format!("User {} registered", outcome.record.email)
            } else {
                format!("User {} already registered", outcome.record.email)
            };
            output_success(
                &output_format,
                &message,
                Some(json!({ "created": outcome.created, "user": outcome.record })),
            )
        }
        UserCommands::List { list } => {
            let page = service.list(list.into_list_options()?).await?;
            output_page(
                &output_format,
                &format!("{:<38} {:<30} {}", "UU_ID", "EMAIL", "NAME"),
                &page,
                |u: &User| format!("{:<38} {:<30} {}", u.meta.uu_id, u.email, u.full_name()),
            )
        }
        UserCommands::Show { user } => {
            let found = match Uuid::parse_str(&user) {
                Ok(uu_id) => service.get(uu_id).await?,
                Err(_) => service
                    .find_by_email(&user)
                    .await?
                    .ok_or_else(|| crate::error::AppError::not_found(format!("No live user with email {}", user)))?,
            };
            output_record(&output_format, &found)
        }
        UserCommands::Update { uu_id, name, surname } => {
            let user = service.update_profile(uu_id, ProfileUpdate { name, surname }).await?;
            output_success(&output_format, &format!("User {} updated", uu_id), Some(json!({ "user": user })))
        }
        UserCommands::Deactivate { uu_id } => {
            service.deactivate(uu_id).await?;
            output_success(&output_format, &format!("User {} deactivated", uu_id), None)
        }
    }
}
