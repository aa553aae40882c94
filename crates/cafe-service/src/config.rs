//! Service configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                  | Default     |
//! |---------------------------|-------------|
//! | `CAFE_DATABASE_PATH`      | `./cafe.db` |
//! | `CAFE_DB_MAX_CONNECTIONS` | `5`         |
//! | `CAFE_REQUEST_TIMEOUT_MS` | `5000`      |
//! | `CAFE_NOTIFY_BUFFER`      | `32`        |
//! | `CAFE_LOG`                | `info`      |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use cafe_db::DbConfig;

use crate::context::RequestContext;

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Budget for every persistence call of a request
    pub request_timeout: Duration,

    /// Per-subscriber notification queue length
    pub notify_buffer: usize,

    /// `tracing` filter directive
    pub log_filter: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let db_max_connections: u32 = var("CAFE_DB_MAX_CONNECTIONS", "5")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("CAFE_DB_MAX_CONNECTIONS".to_string()))?;
        if db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("CAFE_DB_MAX_CONNECTIONS".to_string()));
        }

        let timeout_ms: u64 = var("CAFE_REQUEST_TIMEOUT_MS", "5000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("CAFE_REQUEST_TIMEOUT_MS".to_string()))?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("CAFE_REQUEST_TIMEOUT_MS".to_string()));
        }

        let notify_buffer: usize = var("CAFE_NOTIFY_BUFFER", "32")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("CAFE_NOTIFY_BUFFER".to_string()))?;
        if notify_buffer == 0 {
            return Err(ConfigError::InvalidValue("CAFE_NOTIFY_BUFFER".to_string()));
        }

        Ok(ServiceConfig {
            database_path: PathBuf::from(var("CAFE_DATABASE_PATH", "./cafe.db")),
            db_max_connections,
            request_timeout: Duration::from_millis(timeout_ms),
            notify_buffer,
            log_filter: var("CAFE_LOG", "info"),
        })
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.db_max_connections)
    }

    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(self.request_timeout)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./cafe.db"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.request_timeout, Duration::from_millis(5000));
        assert_eq!(config.notify_buffer, 32);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CAFE_DATABASE_PATH", "/var/lib/cafe/orders.db"),
            ("CAFE_REQUEST_TIMEOUT_MS", "250"),
            ("CAFE_LOG", "cafe_service=debug"),
        ])
        .unwrap();
        assert_eq!(config.request_context().timeout(), Duration::from_millis(250));
        assert_eq!(config.db_config().database_path, PathBuf::from("/var/lib/cafe/orders.db"));
        assert_eq!(config.log_filter, "cafe_service=debug");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("CAFE_DB_MAX_CONNECTIONS", "many")]),
            Err(ConfigError::InvalidValue(name)) if name == "CAFE_DB_MAX_CONNECTIONS"
        ));
        assert!(load(&[("CAFE_NOTIFY_BUFFER", "0")]).is_err());
        assert!(load(&[("CAFE_REQUEST_TIMEOUT_MS", "-1")]).is_err());
    }
}
