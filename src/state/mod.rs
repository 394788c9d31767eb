use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::store::{MemoryScriptStore, ScriptStore};

/// Application state that can be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// Script persistence with upload deduplication
    pub script_store: Arc<dyn ScriptStore>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            script_store: Arc::new(MemoryScriptStore::new()),
        })
    }
}
