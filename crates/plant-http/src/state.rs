use std::sync::Arc;

use plant_core::config::{AppConfig, UploadConfig};
use plant_db::PlantStore;
use plant_media::MediaHost;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PlantStore>,
    pub media: Arc<dyn MediaHost>,
    pub upload: UploadConfig,
    /// Serve the `/test-db` diagnostics route.
    pub diagnostics: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn PlantStore>, media: Arc<dyn MediaHost>, config: &AppConfig) -> Self {
        Self {
            store,
            media,
            upload: config.upload.clone(),
            diagnostics: !config.is_production(),
        }
    }
}
