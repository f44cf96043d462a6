//! Service configuration loaded from the environment at startup.
//!
//! | Variable | Default |
//! |---|---|
//! | `JWT_SECRET` | required |
//! | `USE_PERSISTENT_STORES` | `true` |
//! | `DATABASE_URL` | required when persistent |
//! | `DATABASE_MAX_CONNECTIONS` | `5` |
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `TOKEN_TTL_MINUTES` | `1000` |

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 1000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Which persistence adapter backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub store: StoreConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", e))?;

        let ttl_minutes = match get("TOKEN_TTL_MINUTES") {
            Some(v) => v.trim().parse::<i64>().map_err(|e| invalid("TOKEN_TTL_MINUTES", e))?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };
        if ttl_minutes <= 0 {
            return Err(invalid("TOKEN_TTL_MINUTES", "must be positive"));
        }

        let use_persistent = match get("USE_PERSISTENT_STORES") {
            Some(v) => v
                .trim()
                .parse::<bool>()
                .map_err(|e| invalid("USE_PERSISTENT_STORES", e))?,
            None => true,
        };

        let store = if use_persistent {
            let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
                Some(v) => v
                    .trim()
                    .parse::<u32>()
                    .map_err(|e| invalid("DATABASE_MAX_CONNECTIONS", e))?,
                None => DEFAULT_MAX_CONNECTIONS,
            };
            StoreConfig::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreConfig::InMemory
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            token_ttl: Duration::minutes(ttl_minutes),
            store,
        })
    }
}

impl core::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let store = match &self.store {
            StoreConfig::InMemory => "in-memory",
            StoreConfig::Postgres { .. } => "postgres",
        };
        f.debug_struct("ServiceConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_minutes", &self.token_ttl.num_minutes())
            .field("store", &store)
            .finish()
    }
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}
