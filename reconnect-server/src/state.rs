//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::store::AgreementStore;
use reconnect_core::FontSet;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Agreement storage backend (PostgreSQL or in-memory fallback)
    pub store: Arc<dyn AgreementStore>,
    /// Resolved document font; `None` when no usable font was found, in
    /// which case document export reports a render failure
    pub fonts: Option<Arc<FontSet>>,
    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AgreementStore>,
        fonts: Option<Arc<FontSet>>,
        config: Config,
    ) -> Self {
        Self {
            store,
            fonts,
            config: Arc::new(config),
        }
    }
}
