//! Shared server state.

use std::sync::Arc;
use stitch_core::AppConfig;
use stitch_storage::UploadStore;

use crate::coordinator::UploadCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UploadStore>,
    pub coordinator: Arc<UploadCoordinator>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn UploadStore>) -> anyhow::Result<Self> {
        config.server.validate().map_err(anyhow::Error::msg)?;
        config.sweep.validate().map_err(anyhow::Error::msg)?;
        let coordinator = Arc::new(UploadCoordinator::new(
            store.clone(),
            config.server.max_chunk_size,
            config.server.public_base_url.clone(),
        ));
        Ok(Self {
            config: Arc::new(config),
            store,
            coordinator,
        })
    }
}
