use std::sync::Arc;

use chrono::Duration;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::memory::MemoryStore;
use crate::database::postgres::PostgresStore;
use crate::database::store::{AccountStore, NoteStore, StoreError};

/// Services constructed once at startup and threaded through request
/// handling via axum state. No ambient global lookup.
#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub accounts: Arc<dyn AccountStore>,
    pub notes: Arc<dyn NoteStore>,
}

impl AppState {
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let tokens = TokenService::new(
            &config.jwt_secret,
            Duration::hours(config.token_expiry_hours as i64),
        );

        let (accounts, notes): (Arc<dyn AccountStore>, Arc<dyn NoteStore>) =
            match &config.database_url {
                Some(url) => {
                    let store = Arc::new(PostgresStore::connect_lazy(url)?);
                    store.init_schema().await?;
                    (store.clone(), store)
                }
                None => {
                    tracing::warn!("DATABASE_URL not set, using in-memory store");
                    let store = Arc::new(MemoryStore::new());
                    (store.clone(), store)
                }
            };

        Ok(Self {
            tokens,
            accounts,
            notes,
        })
    }

    /// State over a fresh in-memory store, for tests.
    #[cfg(test)]
    pub fn in_memory(secret: &str) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            tokens: TokenService::new(secret, Duration::hours(24)),
            accounts: store.clone(),
            notes: store,
        }
    }
}
