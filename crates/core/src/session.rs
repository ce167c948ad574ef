//! Upload session metadata and control-plane request types.

use crate::ident::FileId;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Metadata recorded for an upload session on first chunk.
///
/// This is the only state kept outside the chunk files themselves. The set
/// of received indices is always derived by listing the chunk directory,
/// but the declared chunk count must be recorded so the merge can detect a
/// partial upload instead of trusting however many files happen to exist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Declared total number of chunks. Authoritative from the first
    /// chunk upload; later calls must agree.
    pub total_chunks: u32,
    /// Original file name as supplied by the client (already sanitized).
    pub file_name: String,
    /// Declared size of the complete file in bytes.
    pub file_size: u64,
    /// Declared content type.
    pub file_type: String,
    /// When the session was created (first chunk received).
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SessionMeta {
    /// Create metadata for a new session.
    pub fn new(total_chunks: u32, file_name: String, file_size: u64, file_type: String) -> Self {
        Self {
            total_chunks,
            file_name,
            file_size,
            file_type,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Request body for the merge operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    /// Identifier of the session to merge.
    pub file_id: FileId,
    /// File name for the final artifact (extension is preserved).
    pub file_name: String,
    /// Declared content type of the final artifact.
    #[serde(default)]
    pub file_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_meta_json_roundtrip() {
        let meta = SessionMeta::new(3, "cat.png".to_string(), 9, "image/png".to_string());
        let json = serde_json::to_string(&meta).unwrap();
        let back: SessionMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn merge_request_uses_camel_case() {
        let json = r#"{"fileId":"f1","fileName":"cat.png","fileType":"image/png"}"#;
        let req: MergeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.file_id.as_str(), "f1");
        assert_eq!(req.file_name, "cat.png");
        assert_eq!(req.file_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn merge_request_file_type_optional() {
        let json = r#"{"fileId":"f1","fileName":"cat.png"}"#;
        let req: MergeRequest = serde_json::from_str(json).unwrap();
        assert!(req.file_type.is_none());
    }
}
