//! HTTP server surface for the document pipeline: health, ingest, query,
//! LLM routing/invocation, and audit lookup (SPEC_FULL.md §6 HTTP server
//! surface), grounded on the teacher's `axum`-based server crate.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{serve, AppState};
