//! Local filesystem storage backend.
//!
//! Sessions live under `sessions/<file_id>/` with one file per chunk named
//! by its decimal index and a `meta.json` record beside them; merged
//! artifacts live under `files/<name>`. All writes go through a temp file
//! followed by a rename, so concurrent readers see either the old or the
//! new payload in full.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, StreamingUpload, UploadStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use stitch_core::{FileId, SessionMeta};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Chunk size for streaming artifact reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// File name of the per-session metadata record.
const META_FILE: &str = "meta.json";

/// Local filesystem upload store.
pub struct FilesystemStore {
    sessions_root: PathBuf,
    artifacts_root: PathBuf,
}

impl FilesystemStore {
    /// Create a new filesystem store rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        let sessions_root = root.join("sessions");
        let artifacts_root = root.join("files");
        fs::create_dir_all(&sessions_root).await?;
        fs::create_dir_all(&artifacts_root).await?;
        Ok(Self {
            sessions_root,
            artifacts_root,
        })
    }

    fn session_dir(&self, file_id: &FileId) -> PathBuf {
        // FileId is validated to a single safe path component at parse time.
        self.sessions_root.join(file_id.as_str())
    }

    fn chunks_dir(&self, file_id: &FileId) -> PathBuf {
        self.session_dir(file_id).join("chunks")
    }

    fn chunk_path(&self, file_id: &FileId, index: u32) -> PathBuf {
        self.chunks_dir(file_id).join(index.to_string())
    }

    /// Resolve an artifact name to a path, rejecting anything that is not
    /// a plain single path component. Artifact names are built from
    /// validated inputs, but the backend enforces this independently.
    fn artifact_path(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(StorageError::InvalidKey(format!(
                "artifact name must be a plain file name: {name:?}"
            )));
        }
        if name.starts_with('.') {
            return Err(StorageError::InvalidKey(format!(
                "artifact name must not start with a dot: {name:?}"
            )));
        }
        Ok(self.artifacts_root.join(name))
    }

    /// Write `data` to `path` atomically: temp file, fsync, rename.
    /// The temp name embeds a UUID so concurrent writers to the same path
    /// never collide on the temp file itself.
    async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        let temp_path = path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        );
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, path).await?;
        Ok(())
    }
}

#[async_trait]
impl UploadStore for FilesystemStore {
    #[instrument(skip(self, data), fields(backend = "filesystem", file_id = %file_id, index, size = data.len()))]
    async fn write_chunk(&self, file_id: &FileId, index: u32, data: Bytes) -> StorageResult<()> {
        let path = self.chunk_path(file_id, index);
        Self::write_atomic(&path, &data).await
    }

    #[instrument(skip(self), fields(backend = "filesystem", file_id = %file_id, index))]
    async fn read_chunk(&self, file_id: &FileId, index: u32) -> StorageResult<Bytes> {
        let path = self.chunk_path(file_id, index);
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(format!("{file_id}/{index}"))
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem", file_id = %file_id))]
    async fn list_chunks(&self, file_id: &FileId) -> StorageResult<Vec<u32>> {
        let dir = self.chunks_dir(file_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut indices = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            // Ignore temp files still being renamed into place; their
            // names never parse as a bare integer.
            if let Ok(index) = entry.file_name().to_string_lossy().parse::<u32>() {
                indices.push(index);
            }
        }
        Ok(indices)
    }

    #[instrument(skip(self), fields(backend = "filesystem", file_id = %file_id))]
    async fn read_meta(&self, file_id: &FileId) -> StorageResult<Option<SessionMeta>> {
        let path = self.session_dir(file_id).join(META_FILE);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        let meta = serde_json::from_slice(&data)
            .map_err(|e| StorageError::CorruptMeta(format!("{file_id}: {e}")))?;
        Ok(Some(meta))
    }

    #[instrument(skip(self, meta), fields(backend = "filesystem", file_id = %file_id))]
    async fn write_meta(&self, file_id: &FileId, meta: &SessionMeta) -> StorageResult<()> {
        let path = self.session_dir(file_id).join(META_FILE);
        let data = serde_json::to_vec(meta)
            .map_err(|e| StorageError::CorruptMeta(format!("{file_id}: {e}")))?;
        Self::write_atomic(&path, &data).await
    }

    #[instrument(skip(self), fields(backend = "filesystem", file_id = %file_id))]
    async fn remove_session(&self, file_id: &FileId) -> StorageResult<()> {
        match fs::remove_dir_all(self.session_dir(file_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list_sessions(&self) -> StorageResult<Vec<FileId>> {
        let mut entries = fs::read_dir(&self.sessions_root).await?;
        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            // Directories that do not parse as a FileId were not created
            // by this store; leave them alone.
            if let Ok(id) = FileId::parse(&entry.file_name().to_string_lossy()) {
                sessions.push(id);
            }
        }
        Ok(sessions)
    }

    #[instrument(skip(self), fields(backend = "filesystem", file_id = %file_id))]
    async fn session_age(&self, file_id: &FileId) -> StorageResult<Option<std::time::Duration>> {
        let metadata = match fs::metadata(self.session_dir(file_id)).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        let modified = metadata.modified()?;
        Ok(Some(modified.elapsed().unwrap_or_default()))
    }

    #[instrument(skip(self), fields(backend = "filesystem", name))]
    async fn put_artifact(&self, name: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        let final_path = self.artifact_path(name)?;
        let temp_path = self
            .artifacts_root
            .join(format!(".tmp.{}.{}", name, Uuid::new_v4()));
        let file = fs::File::create(&temp_path).await?;
        Ok(Box::new(FilesystemArtifactUpload {
            file,
            temp_path,
            final_path,
            bytes_written: 0,
        }))
    }

    #[instrument(skip(self), fields(backend = "filesystem", name))]
    async fn get_artifact(&self, name: &str) -> StorageResult<ByteStream> {
        use tokio::io::AsyncReadExt;

        let path = self.artifact_path(name)?;
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(name.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(Box::pin(stream))
    }

    #[instrument(skip(self), fields(backend = "filesystem", name))]
    async fn artifact_exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.artifact_path(name)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        for root in [&self.sessions_root, &self.artifacts_root] {
            let metadata = fs::metadata(root).await.map_err(|e| {
                StorageError::Io(std::io::Error::new(
                    e.kind(),
                    format!("storage root not accessible: {e}"),
                ))
            })?;
            if !metadata.is_dir() {
                return Err(StorageError::Io(std::io::Error::other(format!(
                    "storage root is not a directory: {root:?}"
                ))));
            }
        }
        Ok(())
    }
}

/// Streaming artifact write for the filesystem backend.
struct FilesystemArtifactUpload {
    file: fs::File,
    temp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
}

#[async_trait]
impl StreamingUpload for FilesystemArtifactUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.file.write_all(&data).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> StorageResult<u64> {
        self.file.sync_all().await?;
        drop(self.file);
        fs::rename(&self.temp_path, &self.final_path).await?;
        Ok(self.bytes_written)
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        drop(self.file);
        let _ = fs::remove_file(&self.temp_path).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> FileId {
        FileId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn chunk_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        let file_id = id("upload-1");
        store
            .write_chunk(&file_id, 0, Bytes::from("hello"))
            .await
            .unwrap();

        let data = store.read_chunk(&file_id, 0).await.unwrap();
        assert_eq!(data, Bytes::from("hello"));
    }

    #[tokio::test]
    async fn chunk_overwrite_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        let file_id = id("upload-1");
        store
            .write_chunk(&file_id, 3, Bytes::from("first"))
            .await
            .unwrap();
        store
            .write_chunk(&file_id, 3, Bytes::from("second"))
            .await
            .unwrap();

        assert_eq!(
            store.read_chunk(&file_id, 3).await.unwrap(),
            Bytes::from("second")
        );
        assert_eq!(store.list_chunks(&file_id).await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn list_chunks_unknown_session_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        let indices = store.list_chunks(&id("never-seen")).await.unwrap();
        assert!(indices.is_empty());
    }

    #[tokio::test]
    async fn list_chunks_returns_all_indices() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        let file_id = id("upload-1");
        for index in [5u32, 0, 2] {
            store
                .write_chunk(&file_id, index, Bytes::from(vec![index as u8]))
                .await
                .unwrap();
        }

        let mut indices = store.list_chunks(&file_id).await.unwrap();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 2, 5]);
    }

    #[tokio::test]
    async fn meta_roundtrip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        let file_id = id("upload-1");
        assert!(store.read_meta(&file_id).await.unwrap().is_none());

        let meta = SessionMeta::new(3, "cat.png".to_string(), 9, "image/png".to_string());
        store.write_meta(&file_id, &meta).await.unwrap();

        let read = store.read_meta(&file_id).await.unwrap().unwrap();
        assert_eq!(read, meta);
    }

    #[tokio::test]
    async fn meta_file_not_listed_as_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        let file_id = id("upload-1");
        let meta = SessionMeta::new(2, "a.bin".to_string(), 2, "bin".to_string());
        store.write_meta(&file_id, &meta).await.unwrap();
        store
            .write_chunk(&file_id, 0, Bytes::from("x"))
            .await
            .unwrap();

        assert_eq!(store.list_chunks(&file_id).await.unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn remove_session_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        let file_id = id("upload-1");
        store
            .write_chunk(&file_id, 0, Bytes::from("x"))
            .await
            .unwrap();

        store.remove_session(&file_id).await.unwrap();
        assert!(store.list_chunks(&file_id).await.unwrap().is_empty());
        // Second removal of an absent session is not an error.
        store.remove_session(&file_id).await.unwrap();
    }

    #[tokio::test]
    async fn list_sessions_sees_created_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        store
            .write_chunk(&id("one"), 0, Bytes::from("x"))
            .await
            .unwrap();
        store
            .write_chunk(&id("two"), 0, Bytes::from("y"))
            .await
            .unwrap();

        let mut names: Vec<String> = store
            .list_sessions()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.as_str().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn session_age_none_for_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        assert!(store.session_age(&id("ghost")).await.unwrap().is_none());

        let file_id = id("real");
        store
            .write_chunk(&file_id, 0, Bytes::from("x"))
            .await
            .unwrap();
        assert!(store.session_age(&file_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn artifact_streaming_upload_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        let mut upload = store.put_artifact("f1-cat.png").await.unwrap();
        upload.write(Bytes::from("AAA")).await.unwrap();
        upload.write(Bytes::from("BBB")).await.unwrap();
        let written = upload.finish().await.unwrap();
        assert_eq!(written, 6);

        assert!(store.artifact_exists("f1-cat.png").await.unwrap());

        use futures::StreamExt;
        let mut stream = store.get_artifact("f1-cat.png").await.unwrap();
        let mut out = Vec::new();
        while let Some(block) = stream.next().await {
            out.extend_from_slice(&block.unwrap());
        }
        assert_eq!(out, b"AAABBB");
    }

    #[tokio::test]
    async fn aborted_artifact_is_not_visible() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        let mut upload = store.put_artifact("partial.bin").await.unwrap();
        upload.write(Bytes::from("oops")).await.unwrap();
        upload.abort().await.unwrap();

        assert!(!store.artifact_exists("partial.bin").await.unwrap());
    }

    #[tokio::test]
    async fn artifact_name_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        for name in ["../escape", "a/b", "a\\b", "..", "", ".hidden"] {
            let result = store.artifact_exists(name).await;
            assert!(
                matches!(result, Err(StorageError::InvalidKey(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();

        match store.get_artifact("nope.bin").await {
            Err(StorageError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn health_check_passes_on_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).await.unwrap();
        store.health_check().await.unwrap();
    }
}
