//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::CatalogCache;
use crate::config::ApiConfig;
use crate::events::EventHub;
use crate::pos::{HttpPosClient, PosClient, PosError};

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    pos: Option<Arc<dyn PosClient>>,
    events: EventHub,
    cache: CatalogCache,
}

impl AppState {
    /// Create the state, building a POS client when credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns `PosError` if the POS HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, PosError> {
        let pos = match &config.pos {
            Some(pos_config) => {
                Some(Arc::new(HttpPosClient::new(pos_config)?) as Arc<dyn PosClient>)
            }
            None => None,
        };
        Ok(Self::with_pos(config, pool, pos))
    }

    /// Create the state around an existing POS client.
    #[must_use]
    pub fn with_pos(config: ApiConfig, pool: PgPool, pos: Option<Arc<dyn PosClient>>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                pos,
                events: EventHub::new(),
                cache: CatalogCache::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// POS client, when credentials are configured.
    #[must_use]
    pub fn pos(&self) -> Option<&dyn PosClient> {
        self.inner.pos.as_deref()
    }

    #[must_use]
    pub fn events(&self) -> &EventHub {
        &self.inner.events
    }

    #[must_use]
    pub fn cache(&self) -> &CatalogCache {
        &self.inner.cache
    }
}
