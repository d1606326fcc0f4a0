use once_cell::sync::Lazy;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::filter::FilterError;

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<FilterError> for DatabaseError {
    fn from(err: FilterError) -> Self {
        DatabaseError::InvalidInput(err.to_string())
    }
}

static POOL: Lazy<RwLock<Option<PgPool>>> = Lazy::new(|| RwLock::new(None));

/// Owner of the process-wide connection pool
pub struct DatabaseManager;

impl DatabaseManager {
    /// Get the shared pool, connecting lazily on first use
    pub async fn pool() -> Result<PgPool, DatabaseError> {
        // Fast path: try read lock
        {
            let pool = POOL.read().await;
            if let Some(pool) = pool.as_ref() {
                return Ok(pool.clone());
            }
        }

        let mut slot = POOL.write().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }
        let pool = Self::connect(&crate::config::config().database).await?;
        *slot = Some(pool.clone());
        Ok(pool)
    }

    /// Open a new pool from explicit settings
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let connection_string = Self::build_connection_string(config)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&connection_string)
            .await?;
        info!("Created database pool for: {}@{}/{}", config.user, config.host, config.name);
        Ok(pool)
    }

    /// `DATABASE_URL` when set, otherwise assembled from the individual pieces
    pub fn build_connection_string(config: &DatabaseConfig) -> Result<String, DatabaseError> {
        if let Some(raw) = config.url.as_deref() {
            let url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
            return Ok(url.into());
        }

        if config.host.is_empty() {
            return Err(DatabaseError::ConfigMissing("POSTGRES_HOST"));
        }
        // Driver suffixes like `postgresql+psycopg2` are not part of the scheme
        let scheme = config.engine.split('+').next().unwrap_or("postgres");
        let mut url = url::Url::parse(&format!("{}://{}", scheme, config.host))
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_username(&config.user).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !config.password.is_empty() {
            url.set_password(Some(&config.password))
                .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        }
        url.set_port(Some(config.port)).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        url.set_path(&format!("/{}", config.name));
        Ok(url.into())
    }

    /// Pings the shared pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Close and forget the shared pool (e.g., on shutdown)
    pub async fn close() {
        let mut slot = POOL.write().await;
        if let Some(pool) = slot.take() {
            pool.close().await;
            info!("Closed database pool");
        }
    }
}
