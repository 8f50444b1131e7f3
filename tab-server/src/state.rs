//! Application state for tab-server

use std::sync::Arc;

use crate::auth::ShopRolePolicy;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::db::{MemoryTabStore, PgTabStore, TabStore};
use crate::services::TabService;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TabService>,
    /// HMAC secret for session tokens
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(service: TabService, jwt_secret: impl Into<String>) -> Self {
        Self {
            service: Arc::new(service),
            jwt_secret: jwt_secret.into(),
        }
    }

    /// Connect storage (running migrations) and wire the production service
    pub async fn from_config(config: &Config) -> Result<Self, BoxError> {
        let store: Arc<dyn TabStore> = match &config.database_url {
            Some(url) => {
                let store = PgTabStore::connect(url, config.db_max_connections).await?;
                store.migrate().await?;
                tracing::info!(
                    max_connections = config.db_max_connections,
                    "PostgreSQL store ready"
                );
                Arc::new(store)
            }
            None => {
                tracing::warn!(
                    "DATABASE_URL not set, using in-memory store (data is not persisted)"
                );
                Arc::new(MemoryTabStore::new())
            }
        };

        let service = TabService::new(store, Arc::new(ShopRolePolicy), Arc::new(SystemClock))
            .with_removal_policy(config.removal_policy);
        tracing::info!(removal_policy = %config.removal_policy, "Tab service configured");

        Ok(Self::new(service, config.jwt_secret.clone()))
    }
}
