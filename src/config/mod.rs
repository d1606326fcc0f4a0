use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub pagination: PageSizeConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSizeConfig {
    pub default_size: u32,
    pub min_size: u32,
    pub max_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; wins over the individual pieces below when set
    pub url: Option<String>,
    pub engine: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub max_connections: u32,
    pub enable_query_logging: bool,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Lifetime of stored access tokens, in seconds
    pub access_time_secs: i64,
    /// Lifetime of stored refresh tokens, in seconds
    pub refresh_time_secs: i64,
}

/// Page size bounds handed to the pagination engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: u32,
    pub min_size: u32,
    pub max_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self { default_size: 10, min_size: 5, max_size: 50 }
    }
}

impl PageSizeConfig {
    pub fn limits(&self) -> PageLimits {
        PageLimits {
            default_size: self.default_size,
            min_size: self.min_size,
            max_size: self.max_size,
        }
    }

    fn is_consistent(&self) -> bool {
        self.min_size >= 1
            && self.min_size <= self.max_size
            && (self.min_size..=self.max_size).contains(&self.default_size)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Pagination overrides are applied as a unit so bad bounds never leak through
        let preset = self.pagination.clone();
        if let Ok(v) = env::var("API_DEFAULT_SIZE") {
            self.pagination.default_size = v.parse().unwrap_or(self.pagination.default_size);
        }
        if let Ok(v) = env::var("API_MIN_SIZE") {
            self.pagination.min_size = v.parse().unwrap_or(self.pagination.min_size);
        }
        if let Ok(v) = env::var("API_MAX_SIZE") {
            self.pagination.max_size = v.parse().unwrap_or(self.pagination.max_size);
        }
        if !self.pagination.is_consistent() {
            tracing::warn!(
                "Ignoring inconsistent page size bounds (default={}, min={}, max={})",
                self.pagination.default_size,
                self.pagination.min_size,
                self.pagination.max_size
            );
            self.pagination = preset;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("POSTGRES_ENGINE") {
            self.database.engine = v;
        }
        if let Ok(v) = env::var("POSTGRES_USER") {
            self.database.user = v;
        }
        if let Ok(v) = env::var("POSTGRES_PASSWORD") {
            self.database.password = v;
        }
        if let Ok(v) = env::var("POSTGRES_HOST") {
            self.database.host = v;
        }
        if let Ok(v) = env::var("POSTGRES_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Ok(v) = env::var("POSTGRES_DB") {
            self.database.name = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_SLOW_QUERY_WARNING") {
            self.database.enable_slow_query_warning = v.parse().unwrap_or(self.database.enable_slow_query_warning);
        }
        if let Ok(v) = env::var("DATABASE_SLOW_QUERY_THRESHOLD_MS") {
            self.database.slow_query_threshold_ms = v.parse().unwrap_or(self.database.slow_query_threshold_ms);
        }

        // Security overrides
        if let Ok(v) = env::var("API_ACCESS_TIME") {
            self.security.access_time_secs = v.parse().unwrap_or(self.security.access_time_secs);
        }
        if let Ok(v) = env::var("API_REFRESH_TIME") {
            self.security.refresh_time_secs = v.parse().unwrap_or(self.security.refresh_time_secs);
        }

        self
    }

    fn local_database() -> DatabaseConfig {
        DatabaseConfig {
            url: None,
            engine: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            host: "localhost".to_string(),
            port: 5432,
            name: "notes".to_string(),
            max_connections: 10,
            enable_query_logging: true,
            enable_slow_query_warning: true,
            slow_query_threshold_ms: 100,
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            pagination: PageSizeConfig {
                default_size: 10,
                min_size: 5,
                max_size: 50,
            },
            database: Self::local_database(),
            security: SecurityConfig {
                access_time_secs: 432_000,
                refresh_time_secs: 864_000,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            pagination: PageSizeConfig {
                default_size: 10,
                min_size: 5,
                max_size: 50,
            },
            database: DatabaseConfig {
                max_connections: 20,
                slow_query_threshold_ms: 500,
                ..Self::local_database()
            },
            security: SecurityConfig {
                access_time_secs: 86_400,
                refresh_time_secs: 432_000,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            pagination: PageSizeConfig {
                default_size: 10,
                min_size: 5,
                max_size: 50,
            },
            database: DatabaseConfig {
                max_connections: 50,
                enable_query_logging: false,
                slow_query_threshold_ms: 1000,
                ..Self::local_database()
            },
            security: SecurityConfig {
                access_time_secs: 14_400,
                refresh_time_secs: 86_400,
            },
        }
    }
}

// Global singleton config - initialized once at first use
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.pagination.limits(), PageLimits::default());
        assert_eq!(config.security.access_time_secs, 432_000);
        assert_eq!(config.security.refresh_time_secs, 864_000);
        assert!(config.database.enable_query_logging);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.environment, Environment::Production);
        assert!(!config.database.enable_query_logging);
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.database.name, "notes");
    }

    #[test]
    fn pagination_bounds_consistency() {
        let mut p = AppConfig::development().pagination;
        assert!(p.is_consistent());
        p.default_size = 60;
        assert!(!p.is_consistent());
        p.default_size = 10;
        p.min_size = 70;
        assert!(!p.is_consistent());
        p.min_size = 0;
        assert!(!p.is_consistent());
    }

    #[test]
    fn is_production_follows_the_loaded_environment() {
        assert_eq!(crate::is_production!(), config().environment == Environment::Production);
    }
}
