use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::entity::{Column, Entity, RecordMeta, SqlType};

/// A stored access token. Its validity window is its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Token {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub token: String,
    pub user_uu_id: Uuid,
}

impl Entity for Token {
    const TABLE: &'static str = "tokens";
    const COLUMNS: &'static [Column] = &[
        Column::new("token", SqlType::Text),
        Column::new("user_uu_id", SqlType::Uuid),
    ];
}
