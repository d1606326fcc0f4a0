use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::entity::{Column, Entity, RecordMeta, SqlType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Note {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub content: String,
    pub user_uu_id: Uuid,
}

impl Entity for Note {
    const TABLE: &'static str = "notes";
    const COLUMNS: &'static [Column] = &[
        Column::new("title", SqlType::Text),
        Column::new("content", SqlType::Text),
        Column::new("user_uu_id", SqlType::Uuid),
    ];
}
