//! Server test utilities.

use std::sync::Arc;
use stitch_core::{AppConfig, ServerConfig, StorageConfig};
use stitch_server::{build_router, AppState};
use stitch_storage::{FilesystemStore, UploadStore};
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage and default config.
    pub async fn new() -> Self {
        Self::with_config(AppConfig::for_testing()).await
    }

    /// Create a new test server with an explicit config. The storage
    /// section is always replaced with a fresh temp directory.
    pub async fn with_config(mut config: AppConfig) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage_path = temp_dir.path().join("storage");
        config.storage = StorageConfig::Filesystem {
            path: storage_path,
        };

        let store: Arc<dyn UploadStore> = stitch_storage::from_config(&config.storage)
            .await
            .expect("Failed to create storage backend");

        let state = AppState::new(config, store).expect("Failed to create app state");
        let router = build_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Create a test server with a small max chunk size for limit tests.
    pub async fn with_max_chunk_size(max_chunk_size: u64) -> Self {
        let config = AppConfig {
            server: ServerConfig {
                max_chunk_size,
                ..Default::default()
            },
            ..AppConfig::for_testing()
        };
        Self::with_config(config).await
    }

    pub fn store(&self) -> Arc<dyn UploadStore> {
        self.state.store.clone()
    }
}

/// Create a bare filesystem store in a temp directory, without the
/// HTTP layer, for coordinator and sweep tests.
#[allow(dead_code)]
pub async fn test_store() -> (Arc<dyn UploadStore>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let store = FilesystemStore::new(temp_dir.path().join("storage"))
        .await
        .expect("Failed to create storage backend");
    (Arc::new(store), temp_dir)
}
