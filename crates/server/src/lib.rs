//! HTTP server for the Stitch chunked upload service.
//!
//! Clients split large files into chunks, upload them in any order
//! with retries, then request a merge that assembles the final
//! artifact and returns its download URL. Session state lives entirely
//! in the storage backend; the server itself holds nothing in memory.

pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod response;
pub mod routes;
pub mod state;
pub mod sweep;

pub use coordinator::{ChunkUpload, SessionStatus, UploadCoordinator};
pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use routes::build_router;
pub use state::AppState;
