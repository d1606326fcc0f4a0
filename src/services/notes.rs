use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use super::users::required;
use crate::database::models::{Comment, Note, Tag, User};
use crate::database::{Created, DatabaseManager, ListOptions, Page, QueryOptions, Repository};
use crate::error::AppError;
use crate::filter::split_key;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub struct NoteService {
    notes: Repository<Note>,
    tags: Repository<Tag>,
    comments: Repository<Comment>,
    users: Repository<User>,
}

impl NoteService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            notes: Repository::new(pool.clone()),
            tags: Repository::new(pool.clone()),
            comments: Repository::new(pool.clone()),
            users: Repository::new(pool),
        }
    }

    pub async fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(DatabaseManager::pool().await?))
    }

    pub async fn create(&self, owner: Uuid, note: NewNote) -> Result<Note, AppError> {
        let title = required("title", &note.title)?;
        self.users.get(owner).await?;

        let mut values = Map::new();
        values.insert("title".to_string(), Value::String(title));
        values.insert("content".to_string(), Value::String(note.content));
        values.insert("user_uu_id".to_string(), Value::String(owner.to_string()));
        Ok(self.notes.create(&values).await?)
    }

    pub async fn get(&self, uu_id: Uuid) -> Result<Note, AppError> {
        Ok(self.notes.get(uu_id).await?)
    }

    /// Page through one user's live notes. Any owner filter in `options` is replaced.
    pub async fn list_for_user(&self, owner: Uuid, options: ListOptions) -> Result<Page<Note>, AppError> {
        let mut query = QueryOptions::new::<Note>(options);
        query.query.retain(|key, _| split_key(key).0 != "user_uu_id");
        query
            .query
            .insert("user_uu_id".to_string(), Value::String(owner.to_string()));
        Ok(self.notes.paginate(query).await?)
    }

    pub async fn update(&self, uu_id: Uuid, update: NoteUpdate) -> Result<Note, AppError> {
        let mut values = Map::new();
        if let Some(title) = update.title {
            values.insert("title".to_string(), Value::String(required("title", &title)?));
        }
        if let Some(content) = update.content {
            values.insert("content".to_string(), Value::String(content));
        }
        if values.is_empty() {
            return Err(AppError::invalid_input("Nothing to update"));
        }
        Ok(self.notes.update(uu_id, &values).await?)
    }

    pub async fn delete(&self, uu_id: Uuid) -> Result<Note, AppError> {
        Ok(self.notes.soft_delete(uu_id).await?)
    }

    /// One live tag per note and name; repeated calls return the existing tag
    pub async fn add_tag(&self, note_uu_id: Uuid, author: Uuid, name: &str) -> Result<Created<Tag>, AppError> {
        let name = required("tag", name)?.to_lowercase();
        self.notes.get(note_uu_id).await?;

        let mut lookup = Map::new();
        lookup.insert("note_uu_id".to_string(), Value::String(note_uu_id.to_string()));
        lookup.insert("name".to_string(), Value::String(name));
        let mut defaults = Map::new();
        defaults.insert("user_uu_id".to_string(), Value::String(author.to_string()));

        Ok(self.tags.find_or_create_by(&lookup, &defaults).await?)
    }

    pub async fn tags(&self, note_uu_id: Uuid) -> Result<Vec<Tag>, AppError> {
        Ok(self.tags.filter_all(&by_note(note_uu_id))?.all().await?)
    }

    pub async fn add_comment(&self, note_uu_id: Uuid, author: Uuid, content: &str) -> Result<Comment, AppError> {
        let content = required("comment", content)?;
        self.notes.get(note_uu_id).await?;

        let mut values = by_note(note_uu_id);
        values.insert("user_uu_id".to_string(), Value::String(author.to_string()));
        values.insert("content".to_string(), Value::String(content));
        Ok(self.comments.create(&values).await?)
    }

    pub async fn comments(&self, note_uu_id: Uuid) -> Result<Vec<Comment>, AppError> {
        Ok(self.comments.filter_all(&by_note(note_uu_id))?.all().await?)
    }
}

fn by_note(note_uu_id: Uuid) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("note_uu_id".to_string(), Value::String(note_uu_id.to_string()));
    map
}
