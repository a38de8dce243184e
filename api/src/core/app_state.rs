use std::sync::Arc;

use contextor::ChatEngine;

use crate::core::{app_config::ApiConfig, session_store::SessionStore};

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Chat core shared by every session.
    pub engine: Arc<ChatEngine>,
    /// Live sessions keyed by id.
    pub sessions: Arc<SessionStore>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(engine: Arc<ChatEngine>, config: ApiConfig) -> Self {
        Self {
            engine,
            sessions: Arc::new(SessionStore::new(config.session_idle_ttl)),
            config,
        }
    }
}
