//! Storage trait definitions.
//!
//! `UploadStore` is the narrow interface behind which all directory
//! operations live: the filesystem backend derives session state from the
//! directory tree itself, but a future implementation could swap in a
//! key-value metadata store without changing the coordinator's operations.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use stitch_core::{FileId, SessionMeta};

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Session and artifact storage abstraction.
#[async_trait]
pub trait UploadStore: Send + Sync + 'static {
    /// Persist one chunk of a session atomically, overwriting any prior
    /// payload at the same index (last write wins). Creates the session
    /// directory if absent.
    async fn write_chunk(&self, file_id: &FileId, index: u32, data: Bytes) -> StorageResult<()>;

    /// Read one chunk in full. A reader never observes a half-written
    /// chunk: ingestion renames a fully written temp file into place.
    async fn read_chunk(&self, file_id: &FileId, index: u32) -> StorageResult<Bytes>;

    /// List the indices of all chunks received for a session, in no
    /// particular order. An unknown session yields an empty list.
    async fn list_chunks(&self, file_id: &FileId) -> StorageResult<Vec<u32>>;

    /// Read the session's recorded metadata, or None if the session (or
    /// its metadata record) does not exist.
    async fn read_meta(&self, file_id: &FileId) -> StorageResult<Option<SessionMeta>>;

    /// Record session metadata atomically.
    async fn write_meta(&self, file_id: &FileId, meta: &SessionMeta) -> StorageResult<()>;

    /// Delete the session directory and all chunk files. No-op if the
    /// session does not exist; repeated calls are safe.
    async fn remove_session(&self, file_id: &FileId) -> StorageResult<()>;

    /// List the ids of all sessions currently on disk.
    async fn list_sessions(&self) -> StorageResult<Vec<FileId>>;

    /// Age of a session since last modification, or None if it does not
    /// exist. Used by the background sweep.
    async fn session_age(&self, file_id: &FileId) -> StorageResult<Option<std::time::Duration>>;

    /// Start a streaming write of a final artifact. The artifact becomes
    /// visible only when the upload is finished; aborting removes the
    /// partial output.
    async fn put_artifact(&self, name: &str) -> StorageResult<Box<dyn StreamingUpload>>;

    /// Stream a final artifact's bytes.
    async fn get_artifact(&self, name: &str) -> StorageResult<ByteStream>;

    /// Check whether a final artifact exists.
    async fn artifact_exists(&self, name: &str) -> StorageResult<bool>;

    /// Verify the storage backend is reachable. Called at startup and from
    /// the health endpoint.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Trait for streaming artifact writes.
#[async_trait]
pub trait StreamingUpload: Send {
    /// Append a block of data.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Finish the upload, making the artifact visible. Returns the total
    /// bytes written.
    async fn finish(self: Box<Self>) -> StorageResult<u64>;

    /// Abort the upload and remove the partial output.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}
