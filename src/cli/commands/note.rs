use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::{Comment, Note, Tag};
use crate::services::{NewNote, NoteService, NoteUpdate};

#[derive(Subcommand)]
pub enum NoteCommands {
    #[command(about = "Create a note owned by a user")]
    Create {
        #[arg(long, help = "Owner uu_id")]
        user: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
    },

    #[command(about = "List a user's live notes")]
    List {
        #[arg(long, help = "Owner uu_id")]
        user: Uuid,
        #[command(flatten)]
        list: ListArgs,
    },

    #[command(about = "Show a note with its tags and comments")]
    Show {
        #[arg(help = "Note uu_id")]
        uu_id: Uuid,
    },

    #[command(about = "Change title and/or content")]
    Update {
        #[arg(help = "Note uu_id")]
        uu_id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },

    #[command(about = "Soft-delete a note")]
    Delete {
        #[arg(help = "Note uu_id")]
        uu_id: Uuid,
    },

    #[command(about = "Tag a note")]
    Tag {
        #[arg(help = "Note uu_id")]
        uu_id: Uuid,
        #[arg(help = "Tag name")]
        name: String,
        #[arg(long, help = "Tagging user uu_id")]
        user: Uuid,
    },

    #[command(about = "Comment on a note")]
    Comment {
        #[arg(help = "Note uu_id")]
        uu_id: Uuid,
        #[arg(help = "Comment text")]
        content: String,
        #[arg(long, help = "Commenting user uu_id")]
        user: Uuid,
    },
}

pub async fn handle(cmd: NoteCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = NoteService::from_env().await?;

    match cmd {
        NoteCommands::Create { user, title, content } => {
            let note = service.create(user, NewNote { title, content }).await?;
            output_success(
                &output_format,
                &format!("Note {} created", note.meta.uu_id),
                Some(json!({ "note": note })),
            )
        }
        NoteCommands::List { user, list } => {
            let page = service.list_for_user(user, list.into_list_options()?).await?;
            output_page(
                &output_format,
                &format!("{:<38} {:<20} {}", "UU_ID", "UPDATED", "TITLE"),
                &page,
                |n: &Note| {
                    format!(
                        "{:<38} {:<20} {}",
                        n.meta.uu_id,
                        n.meta.updated_at.format("%Y-%m-%d %H:%M"),
                        n.title
                    )
                },
            )
        }
        NoteCommands::Show { uu_id } => {
            let note = service.get(uu_id).await?;
            let tags = service.tags(uu_id).await?;
            let comments = service.comments(uu_id).await?;
            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "note": note,
                            "tags": tags,
                            "comments": comments,
                        }))?
                    );
                }
                OutputFormat::Text => {
                    println!("{}", note.title);
                    println!("{}", "=".repeat(note.title.chars().count().max(8)));
                    println!("{}\n", note.content);
                    let names: Vec<&str> = tags.iter().map(|t: &Tag| t.name.as_str()).collect();
                    println!("Tags: {}", if names.is_empty() { "-".to_string() } else { names.join(", ") });
                    output_list(&output_format, "comments", &comments, |c: &Comment| {
                        format!("[{}] {}", c.meta.created_at.format("%Y-%m-%d %H:%M"), c.content)
                    })?;
                }
            }
            Ok(())
        }
        NoteCommands::Update { uu_id, title, content } => {
            let note = service.update(uu_id, NoteUpdate { title, content }).await?;
            output_success(&output_format, &format!("Note {} updated", uu_id), Some(json!({ "note": note })))
        }
        NoteCommands::Delete { uu_id } => {
            service.delete(uu_id).await?;
            output_success(&output_format, &format!("Note {} deleted", uu_id), None)
        }
        NoteCommands::Tag { uu_id, name, user } => {
            let outcome = service.add_tag(uu_id, user, &name).await?;
            let message = if outcome.created {
                format!("Tagged note {} with '{}'", uu_id, outcome.record.name)
            } else {
                format!("Note {} already tagged '{}'", uu_id, outcome.record.name)
            };
            output_success(
                &output_format,
                &message,
                Some(json!({ "created": outcome.created, "tag": outcome.record })),
            )
        }
        NoteCommands::Comment { uu_id, content, user } => {
            let comment = service.add_comment(uu_id, user, &content).await?;
            output_success(
                &output_format,
                &format!("Comment {} added", comment.meta.uu_id),
                Some(json!({ "comment": comment })),
            )
        }
    }
}
