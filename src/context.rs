//! Caller identity for the current task, used to stamp audit columns.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub person_id: i32,
    pub person_name: String,
    pub full_name: Option<String>,
}

impl Credentials {
    pub fn new(person_id: i32, person_name: impl Into<String>) -> Self {
        Self {
            person_id,
            person_name: person_name.into(),
            full_name: None,
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    fn is_complete(&self) -> bool {
        !self.person_name.trim().is_empty()
    }
}

tokio::task_local! {
    static CREDENTIALS: Credentials;
}

/// Run `fut` with `creds` as the caller identity
pub async fn with_credentials<F>(creds: Credentials, fut: F) -> F::Output
where
    F: Future,
{
    CREDENTIALS.scope(creds, fut).await
}

pub fn current() -> Option<Credentials> {
    CREDENTIALS.try_with(|c| c.clone()).ok()
}

/// `created_by`/`created_by_id` for a new record, if an identity is set
pub fn creator_fields() -> Map<String, Value> {
    stamp("created_by", "created_by_id")
}

/// `updated_by`/`updated_by_id` for a changed record, if an identity is set
pub fn updater_fields() -> Map<String, Value> {
    stamp("updated_by", "updated_by_id")
}

fn stamp(name_key: &str, id_key: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(creds) = current().filter(Credentials::is_complete) {
        fields.insert(name_key.to_string(), Value::String(creds.person_name));
        fields.insert(id_key.to_string(), Value::from(creds.person_id));
    }
    fields
}
