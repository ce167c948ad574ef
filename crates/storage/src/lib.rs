//! Session and artifact storage for Stitch.
//!
//! This crate provides:
//! - The narrow `UploadStore` interface behind which all session directory
//!   operations live
//! - Atomic per-chunk writes (temp-file-then-rename)
//! - A local filesystem backend where the directory tree IS the session state

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::FilesystemStore;
pub use error::{StorageError, StorageResult};
pub use traits::{ByteStream, StreamingUpload, UploadStore};

use std::sync::Arc;
use stitch_core::config::StorageConfig;

/// Create an upload store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn UploadStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemStore::new(path).await?;
            Ok(Arc::new(backend))
        }
    }
}
