use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::entity::{Column, Entity, RecordMeta, SqlType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    pub note_uu_id: Uuid,
    pub user_uu_id: Uuid,
}

impl Entity for Tag {
    const TABLE: &'static str = "tags";
    const COLUMNS: &'static [Column] = &[
        Column::new("name", SqlType::Text),
        Column::new("note_uu_id", SqlType::Uuid),
        Column::new("user_uu_id", SqlType::Uuid),
    ];
}
