use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keyword filter operators, spelled as `column__op` in filter maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,

    In,
    NotIn,
    Between,
    IsNull,

    Like,
    ILike,
    StartsWith,
    EndsWith,
    Contains,
    IContains,
}

impl FilterOp {
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "eq" | "exact" => FilterOp::Eq,
            "ne" | "neq" => FilterOp::Ne,
            "gt" => FilterOp::Gt,
            "gte" | "ge" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" | "le" => FilterOp::Lte,
            "in" => FilterOp::In,
            "notin" => FilterOp::NotIn,
            "between" => FilterOp::Between,
            "isnull" => FilterOp::IsNull,
            "like" => FilterOp::Like,
            "ilike" => FilterOp::ILike,
            "startswith" => FilterOp::StartsWith,
            "endswith" => FilterOp::EndsWith,
            "contains" => FilterOp::Contains,
            "icontains" => FilterOp::IContains,
            _ => return None,
        })
    }
}

/// Split `title__ilike` into (`title`, `ilike`). A bare key has no operator.
pub fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.split_once("__") {
        Some((column, op)) => (column, Some(op)),
        None => (key, None),
    }
}

/// Which records a query may see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Only records inside their validity window and not soft-deleted
    #[default]
    Live,
    /// Everything in the table
    System,
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct FilterWhereOptions {
    pub scope: Scope,
    /// Reference instant for the validity window
    pub at: DateTime<Utc>,
}

impl Default for FilterWhereOptions {
    fn default() -> Self {
        Self {
            scope: Scope::Live,
            at: Utc::now(),
        }
    }
}

impl FilterWhereOptions {
    pub fn system() -> Self {
        Self { scope: Scope::System, ..Self::default() }
    }

    pub fn with_scope(scope: Scope) -> Self {
        Self { scope, ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything starting with `d` sorts descending
    pub fn parse(s: &str) -> Self {
        if s.trim_start().to_ascii_lowercase().starts_with('d') {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
