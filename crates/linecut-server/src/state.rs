use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use linecut_store::KeyValueStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn KeyValueStore>, config: Arc<ServerConfig>) -> Self {
        Self {
            store,
            start_time: Utc::now(),
            config,
        }
    }
}
