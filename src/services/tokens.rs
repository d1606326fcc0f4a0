use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Token, User};
use crate::database::{DatabaseError, DatabaseManager, Repository};
use crate::error::AppError;

/// Stores caller-issued tokens as records whose validity window is the token lifetime
pub struct TokenService {
    tokens: Repository<Token>,
    users: Repository<User>,
    lifetime: Duration,
}

impl TokenService {
    /// Tokens live for the configured access lifetime
    pub fn new(pool: PgPool) -> Self {
        Self {
            tokens: Repository::new(pool.clone()),
            users: Repository::new(pool),
            lifetime: access_lifetime(),
        }
    }

    pub async fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(DatabaseManager::pool().await?))
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Store refresh tokens, which live for the configured refresh lifetime
    pub fn for_refresh(self) -> Self {
        self.with_lifetime(refresh_lifetime())
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub async fn store(&self, user_uu_id: Uuid, token: &str) -> Result<Token, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::invalid_input("token must not be empty"));
        }
        self.users.get(user_uu_id).await?;

        let starts = Utc::now();
        let mut values = Map::new();
        values.insert("token".to_string(), Value::String(token.to_string()));
        values.insert("user_uu_id".to_string(), Value::String(user_uu_id.to_string()));
        values.insert("expiry_starts".to_string(), Value::String(starts.to_rfc3339()));
        values.insert(
            "expiry_ends".to_string(),
            Value::String((starts + self.lifetime).to_rfc3339()),
        );
        let stored = self.tokens.create(&values).await?;
        tracing::info!("Stored token for user {}", user_uu_id);
        Ok(stored)
    }

    pub async fn find_live(&self, token: &str) -> Result<Option<Token>, AppError> {
        Ok(self.tokens.filter_by_one(&by_token(token), false)?.first().await?)
    }

    /// Owner of a live token
    pub async fn resolve_user(&self, token: &str) -> Result<User, AppError> {
        let stored = self
            .find_live(token)
            .await?
            .ok_or_else(|| AppError::unauthorized("Token is invalid or expired"))?;
        self.users.get(stored.user_uu_id).await.map_err(owner_error)
    }

    /// Close the token's window now
    pub async fn revoke(&self, token: &str) -> Result<Token, AppError> {
        let stored = self
            .find_live(token)
            .await?
            .ok_or_else(|| AppError::not_found("Token is not live"))?;
        Ok(self.tokens.expire(stored.meta.uu_id).await?)
    }
}

pub fn access_lifetime() -> Duration {
    Duration::seconds(crate::config::config().security.access_time_secs)
}

pub fn refresh_lifetime() -> Duration {
    Duration::seconds(crate::config::config().security.refresh_time_secs)
}

/// A missing owner invalidates the token; anything else is a real failure
fn owner_error(err: DatabaseError) -> AppError {
    match err {
        DatabaseError::NotFound(_) => AppError::unauthorized("Token owner is no longer active"),
        other => other.into(),
    }
}

fn by_token(token: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("token".to_string(), Value::String(token.trim().to_string()));
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetimes_come_from_security_config() {
        let security = &crate::config::config().security;
        assert_eq!(access_lifetime().num_seconds(), security.access_time_secs);
        assert_eq!(refresh_lifetime().num_seconds(), security.refresh_time_secs);
    }

    #[test]
    fn only_a_missing_owner_is_unauthorized() {
        assert_eq!(owner_error(DatabaseError::NotFound("users x".into())).error_code(), "UNAUTHORIZED");
        assert_eq!(
            owner_error(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)).error_code(),
            "SERVICE_UNAVAILABLE"
        );
        assert_eq!(owner_error(DatabaseError::QueryError("boom".into())).error_code(), "INTERNAL_ERROR");
    }
}
