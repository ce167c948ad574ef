//! Test fixtures for generating test data and requests.

use axum::body::Body;
use axum::http::Request;
use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Generate deterministic test data based on a seed.
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        // Simple LCG for deterministic data
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// Compute SHA-256 hash of data as hex string.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    result.iter().map(|b| format!("{:02x}", b)).collect()
}

const BOUNDARY: &str = "stitch-test-boundary-7f93a1";

/// Fields of a chunk upload form. Every field is optional so tests can
/// exercise missing-field handling.
#[allow(dead_code)]
#[derive(Default)]
pub struct ChunkForm<'a> {
    pub file_id: Option<&'a str>,
    pub chunk_index: Option<u32>,
    pub total_chunks: Option<u32>,
    pub file_name: Option<&'a str>,
    pub file_size: Option<u64>,
    pub file_type: Option<&'a str>,
    pub data: Option<&'a [u8]>,
}

#[allow(dead_code)]
impl<'a> ChunkForm<'a> {
    /// A fully populated form for one chunk of a session.
    pub fn complete(
        file_id: &'a str,
        chunk_index: u32,
        total_chunks: u32,
        file_name: &'a str,
        file_size: u64,
        data: &'a [u8],
    ) -> Self {
        Self {
            file_id: Some(file_id),
            chunk_index: Some(chunk_index),
            total_chunks: Some(total_chunks),
            file_name: Some(file_name),
            file_size: Some(file_size),
            file_type: Some("application/octet-stream"),
            data: Some(data),
        }
    }

    /// Encode the form as a multipart/form-data request body.
    pub fn into_request(self) -> Request<Body> {
        let mut body = Vec::new();

        let mut text_part = |name: &str, value: String| {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        };

        if let Some(file_id) = self.file_id {
            text_part("fileId", file_id.to_string());
        }
        if let Some(chunk_index) = self.chunk_index {
            text_part("chunkIndex", chunk_index.to_string());
        }
        if let Some(total_chunks) = self.total_chunks {
            text_part("totalChunks", total_chunks.to_string());
        }
        if let Some(file_name) = self.file_name {
            text_part("fileName", file_name.to_string());
        }
        if let Some(file_size) = self.file_size {
            text_part("fileSize", file_size.to_string());
        }
        if let Some(file_type) = self.file_type {
            text_part("fileType", file_type.to_string());
        }

        if let Some(data) = self.data {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                b"Content-Disposition: form-data; name=\"file\"; filename=\"chunk\"\r\n",
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/upload/chunk")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build multipart request")
    }
}
