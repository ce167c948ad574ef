//! Core domain types and shared logic for the Stitch upload coordinator.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Validated upload identifiers and sanitized file names
//! - Per-session metadata recorded alongside chunk files
//! - Application configuration
//! - Request types for the upload control plane

pub mod config;
pub mod error;
pub mod ident;
pub mod session;

pub use config::{AppConfig, ServerConfig, StorageConfig, SweepConfig};
pub use error::{Error, Result};
pub use ident::{sanitize_file_name, FileId};
pub use session::{MergeRequest, SessionMeta};

/// Default maximum chunk size: 16 MiB
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum number of chunks a single session may declare.
pub const MAX_TOTAL_CHUNKS: u32 = 100_000;
