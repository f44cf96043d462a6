use std::sync::Arc;

use orderdesk_auth::Hs256Jwt;
use orderdesk_infra::{InMemoryOrdersStore, OrdersStore, PostgresOrdersStore, StoreError, apply_schema};

use crate::config::{ServiceConfig, StoreConfig};

/// Shared handler dependencies, injected through an `Extension`.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn OrdersStore>,
    pub jwt: Hs256Jwt,
}

impl AppServices {
    pub fn new(store: Arc<dyn OrdersStore>, jwt: Hs256Jwt) -> Self {
        Self { store, jwt }
    }
}

/// Wire the configured store and token issuer.
///
/// The Postgres path connects eagerly and applies the schema so the first
/// request never pays for it.
pub async fn build_services(config: &ServiceConfig) -> Result<AppServices, StoreError> {
    let store: Arc<dyn OrdersStore> = match &config.store {
        StoreConfig::InMemory => {
            tracing::warn!("USE_PERSISTENT_STORES=false; data will not survive a restart");
            Arc::new(InMemoryOrdersStore::new())
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresOrdersStore::connect(database_url, *max_connections).await?;
            apply_schema(store.pool()).await?;
            tracing::info!(max_connections, "postgres store ready");
            Arc::new(store)
        }
    };

    let jwt = Hs256Jwt::new(config.jwt_secret.as_bytes(), config.token_ttl);
    tracing::info!(token_ttl_minutes = jwt.ttl().num_minutes(), "session tokens configured");
    Ok(AppServices::new(store, jwt))
}
