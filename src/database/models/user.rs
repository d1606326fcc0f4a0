use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::entity::{Column, Entity, RecordMeta, SqlType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub email: String,
    pub name: String,
    pub surname: String,
    /// Opaque credential digest supplied by the caller
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [Column] = &[
        Column::new("email", SqlType::Text),
        Column::new("name", SqlType::Text),
        Column::new("surname", SqlType::Text),
        Column::secret("password_hash", SqlType::Text),
    ];
}
