use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::User;
use crate::database::{Created, DatabaseManager, ListOptions, Page, QueryOptions, Repository};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub surname: Option<String>,
}

pub struct UserService {
    users: Repository<User>,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { users: Repository::new(pool) }
    }

    pub async fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(DatabaseManager::pool().await?))
    }

    /// Find-or-create by email. `created` is false when the address was already registered.
    pub async fn register(&self, input: RegisterUser) -> Result<Created<User>, AppError> {
        let email = normalize_email(&input.email)?;
        let name = required("name", &input.name)?;
        let surname = required("surname", &input.surname)?;

        let mut lookup = Map::new();
        lookup.insert("email".to_string(), Value::String(email));

        let mut defaults = Map::new();
        defaults.insert("name".to_string(), Value::String(name));
        defaults.insert("surname".to_string(), Value::String(surname));
        if let Some(hash) = input.password_hash.filter(|h| !h.is_empty()) {
            defaults.insert("password_hash".to_string(), Value::String(hash));
        }

        let outcome = self.users.find_or_create_by(&lookup, &defaults).await?;
        if outcome.created {
            tracing::info!("Registered user {}", outcome.record.meta.uu_id);
        } else {
            tracing::debug!("User {} already registered", outcome.record.meta.uu_id);
        }
        Ok(outcome)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let mut kwargs = Map::new();
        kwargs.insert("email".to_string(), Value::String(normalize_email(email)?));
        Ok(self.users.filter_by_one(&kwargs, false)?.first().await?)
    }

    pub async fn get(&self, uu_id: Uuid) -> Result<User, AppError> {
        Ok(self.users.get(uu_id).await?)
    }

    pub async fn list(&self, options: ListOptions) -> Result<Page<User>, AppError> {
        Ok(self.users.paginate(QueryOptions::new::<User>(options)).await?)
    }

    pub async fn update_profile(&self, uu_id: Uuid, update: ProfileUpdate) -> Result<User, AppError> {
        let mut values = Map::new();
        if let Some(name) = update.name {
            values.insert("name".to_string(), Value::String(required("name", &name)?));
        }
        if let Some(surname) = update.surname {
            values.insert("surname".to_string(), Value::String(required("surname", &surname)?));
        }
        if values.is_empty() {
            return Err(AppError::invalid_input("Nothing to update"));
        }
        Ok(self.users.update(uu_id, &values).await?)
    }

    /// Soft-delete the account
    pub async fn deactivate(&self, uu_id: Uuid) -> Result<User, AppError> {
        Ok(self.users.soft_delete(uu_id).await?)
    }
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::invalid_input(format!("'{}' is not a valid email address", email))),
    }
}

pub(crate) fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::invalid_input(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
        assert!(normalize_email("ada").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ada@localhost").is_err());
    }

    #[test]
    fn required_fields_are_trimmed() {
        assert_eq!(required("name", " Ada ").unwrap(), "Ada");
        let err = required("surname", "   ").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
