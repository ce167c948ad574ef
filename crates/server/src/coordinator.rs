//! Chunked upload coordination.
//!
//! The coordinator owns the lifecycle of an upload session: chunk
//! ingestion, status inspection, merge into a final artifact, and
//! cleanup. It is deliberately stateless - all session state lives in
//! the store, so any number of server instances sharing a store observe
//! the same sessions.

use bytes::Bytes;
use std::sync::Arc;
use stitch_core::{
    sanitize_file_name, Error as CoreError, FileId, SessionMeta, MAX_TOTAL_CHUNKS,
};
use stitch_storage::{StorageError, UploadStore};
use tracing::{debug, info, instrument, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// One incoming chunk together with the session metadata the client
/// supplies on every call.
#[derive(Debug)]
pub struct ChunkUpload {
    pub file_id: FileId,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub data: Bytes,
}

/// Status of an in-flight session: which chunk indices have been
/// received so far, in ascending order.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub uploaded_chunks: Vec<u32>,
}

pub struct UploadCoordinator {
    store: Arc<dyn UploadStore>,
    max_chunk_size: u64,
    public_base_url: String,
}

impl UploadCoordinator {
    pub fn new(store: Arc<dyn UploadStore>, max_chunk_size: u64, public_base_url: String) -> Self {
        Self {
            store,
            max_chunk_size,
            public_base_url,
        }
    }

    /// Ingest one chunk, creating the session on first contact.
    ///
    /// The first chunk's `total_chunks` is authoritative for the
    /// session; later calls that disagree are rejected. Other metadata
    /// fields may drift between calls (clients re-send them every
    /// time); drift is logged and the first value kept.
    #[instrument(skip(self, upload), fields(file_id = %upload.file_id, chunk_index = upload.chunk_index))]
    pub async fn upload_chunk(&self, upload: ChunkUpload) -> ApiResult<()> {
        let timer = metrics::CHUNK_UPLOAD_DURATION.start_timer();

        if upload.total_chunks == 0 || upload.total_chunks > MAX_TOTAL_CHUNKS {
            return Err(CoreError::InvalidChunkCount(upload.total_chunks).into());
        }
        if upload.chunk_index >= upload.total_chunks {
            return Err(CoreError::ChunkIndexOutOfRange {
                index: upload.chunk_index,
                total: upload.total_chunks,
            }
            .into());
        }
        if upload.data.is_empty() {
            return Err(CoreError::EmptyChunk.into());
        }
        if upload.data.len() as u64 > self.max_chunk_size {
            return Err(CoreError::ChunkTooLarge {
                size: upload.data.len() as u64,
                max: self.max_chunk_size,
            }
            .into());
        }
        let file_name = sanitize_file_name(&upload.file_name)?;

        match self.store.read_meta(&upload.file_id).await? {
            Some(meta) => {
                if meta.total_chunks != upload.total_chunks {
                    return Err(ApiError::BadRequest(format!(
                        "totalChunks mismatch: session expects {}, got {}",
                        meta.total_chunks, upload.total_chunks
                    )));
                }
                if meta.file_name != file_name {
                    warn!(
                        session_name = %meta.file_name,
                        request_name = %file_name,
                        "fileName differs from session metadata; keeping original"
                    );
                }
            }
            None => {
                let meta = SessionMeta::new(
                    upload.total_chunks,
                    file_name,
                    upload.file_size,
                    upload.file_type.clone(),
                );
                self.store.write_meta(&upload.file_id, &meta).await?;
                info!(total_chunks = upload.total_chunks, "Created upload session");
            }
        }

        let size = upload.data.len() as u64;
        self.store
            .write_chunk(&upload.file_id, upload.chunk_index, upload.data)
            .await?;

        metrics::CHUNKS_UPLOADED.inc();
        metrics::BYTES_UPLOADED.inc_by(size);
        timer.observe_duration();
        debug!(size, "Stored chunk");
        Ok(())
    }

    /// Report which chunks of a session have arrived so far.
    ///
    /// An unknown session reports an empty list rather than an error:
    /// a session with no chunks and a session that never existed are
    /// indistinguishable by design, so clients can poll status before
    /// the first chunk lands.
    #[instrument(skip(self), fields(file_id = %file_id))]
    pub async fn status(&self, file_id: &FileId) -> ApiResult<SessionStatus> {
        let mut uploaded = self.store.list_chunks(file_id).await?;
        uploaded.sort_unstable();
        Ok(SessionStatus {
            uploaded_chunks: uploaded,
        })
    }

    /// Merge a complete session into a final artifact and return its
    /// public download URL.
    ///
    /// Completeness is re-validated against the recorded session
    /// metadata at merge time, never against a count the client sends.
    /// On any missing chunk the session is left untouched so the
    /// client can fill the gap and retry.
    #[instrument(skip(self, file_name), fields(file_id = %file_id))]
    pub async fn merge(&self, file_id: &FileId, file_name: &str) -> ApiResult<String> {
        let timer = metrics::MERGE_DURATION.start_timer();

        let meta = match self.store.read_meta(file_id).await? {
            Some(meta) => meta,
            None => {
                return Err(ApiError::BadRequest(format!(
                    "no upload session for {file_id}"
                )))
            }
        };

        let uploaded = self.store.list_chunks(file_id).await?;
        let missing = {
            let mut present = vec![false; meta.total_chunks as usize];
            for index in &uploaded {
                if let Some(slot) = present.get_mut(*index as usize) {
                    *slot = true;
                }
            }
            present.iter().filter(|p| !**p).count()
        };
        if missing > 0 {
            metrics::MERGES_REJECTED.inc();
            warn!(
                missing,
                total = meta.total_chunks,
                "Merge rejected: session incomplete"
            );
            return Err(ApiError::IncompleteUpload { missing });
        }

        let sanitized = sanitize_file_name(file_name)?;
        let artifact_name = format!("{file_id}-{sanitized}");

        let mut upload = self.store.put_artifact(&artifact_name).await?;
        for index in 0..meta.total_chunks {
            let chunk = match self.store.read_chunk(file_id, index).await {
                Ok(chunk) => chunk,
                Err(StorageError::NotFound(_)) => {
                    // Chunk vanished between the snapshot and the read,
                    // e.g. a concurrent cleanup. Treat as incomplete.
                    abort_upload(upload).await;
                    metrics::MERGES_REJECTED.inc();
                    return Err(ApiError::IncompleteUpload { missing: 1 });
                }
                Err(e) => {
                    abort_upload(upload).await;
                    return Err(e.into());
                }
            };
            if let Err(e) = upload.write(chunk).await {
                abort_upload(upload).await;
                return Err(e.into());
            }
        }
        let written = upload.finish().await?;

        if written != meta.file_size {
            warn!(
                expected = meta.file_size,
                actual = written,
                "Merged size differs from client-declared file size"
            );
        }

        // The artifact is durable; a failed session removal only leaks
        // temp space, so log and carry on.
        if let Err(e) = self.store.remove_session(file_id).await {
            warn!(error = %e, "Failed to remove session after merge");
        } else {
            metrics::SESSIONS_CLEANED.inc();
        }

        metrics::MERGES_COMPLETED.inc();
        timer.observe_duration();
        info!(artifact = %artifact_name, size = written, "Merged upload");

        Ok(format!(
            "{}/api/files/{}",
            self.public_base_url.trim_end_matches('/'),
            artifact_name
        ))
    }

    /// Discard a session and all of its chunks. Idempotent: cleaning a
    /// session that never existed succeeds.
    #[instrument(skip(self), fields(file_id = %file_id))]
    pub async fn cleanup(&self, file_id: &FileId) -> ApiResult<()> {
        self.store.remove_session(file_id).await?;
        metrics::SESSIONS_CLEANED.inc();
        info!("Removed upload session");
        Ok(())
    }
}

async fn abort_upload(upload: Box<dyn stitch_storage::StreamingUpload>) {
    if let Err(e) = upload.abort().await {
        warn!(error = %e, "Failed to abort artifact upload");
    }
}
