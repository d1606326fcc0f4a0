//! Mapped tables and the columns every record carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

/// PostgreSQL types used by mapped columns. Bound parameters are cast to these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    SmallInt,
    Text,
    Uuid,
    Boolean,
    Timestamptz,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Integer => "integer",
            SqlType::SmallInt => "smallint",
            SqlType::Text => "text",
            SqlType::Uuid => "uuid",
            SqlType::Boolean => "boolean",
            SqlType::Timestamptz => "timestamptz",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    /// Whether callers may set this column on create/update
    pub writable: bool,
    /// Whether the column may appear in filters and ORDER BY
    pub filterable: bool,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self { name, sql_type, writable: true, filterable: true }
    }

    pub const fn system(name: &'static str, sql_type: SqlType) -> Self {
        Self { name, sql_type, writable: false, filterable: true }
    }

    /// Writable but never matched or sorted on, e.g. credential digests
    pub const fn secret(name: &'static str, sql_type: SqlType) -> Self {
        Self { name, sql_type, writable: true, filterable: false }
    }
}

/// Columns shared by every mapped table
pub const RECORD_COLUMNS: &[Column] = &[
    Column::system("id", SqlType::Integer),
    Column::system("uu_id", SqlType::Uuid),
    Column::new("expiry_starts", SqlType::Timestamptz),
    Column::new("expiry_ends", SqlType::Timestamptz),
    Column::new("ref_id", SqlType::Text),
    Column::system("created_at", SqlType::Timestamptz),
    Column::system("updated_at", SqlType::Timestamptz),
    Column::system("created_by", SqlType::Text),
    Column::system("created_by_id", SqlType::Integer),
    Column::system("updated_by", SqlType::Text),
    Column::system("updated_by_id", SqlType::Integer),
    Column::system("replication_id", SqlType::SmallInt),
    Column::system("deleted", SqlType::Boolean),
    Column::new("active", SqlType::Boolean),
];

/// Table name plus its entity-specific columns
#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns
            .iter()
            .chain(RECORD_COLUMNS.iter())
            .find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column usable in WHERE and ORDER BY clauses
    pub fn filterable_column(&self, name: &str) -> Option<&'static Column> {
        self.column(name).filter(|c| c.filterable)
    }
}

/// A row type mapped onto a table
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize {
    const TABLE: &'static str;
    const COLUMNS: &'static [Column];

    fn table() -> Table {
        Table { name: Self::TABLE, columns: Self::COLUMNS }
    }
}

/// Lifecycle and audit fields, flattened into every model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecordMeta {
    pub id: i32,
    pub uu_id: Uuid,
    pub expiry_starts: DateTime<Utc>,
    pub expiry_ends: DateTime<Utc>,
    pub ref_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub created_by_id: Option<i32>,
    pub updated_by: Option<String>,
    pub updated_by_id: Option<i32>,
    pub replication_id: i16,
    pub deleted: bool,
    pub active: bool,
}

impl RecordMeta {
    /// Inside the validity window at `at` and not soft-deleted
    pub fn is_live_at(&self, at: DateTime<Utc>) -> bool {
        !self.deleted && self.expiry_starts <= at && at < self.expiry_ends
    }
}
