//! Vidmark API Library
//!
//! HTTP surface of the watermarking pipeline: the upload handler, the response
//! streamer and application setup.

mod api_doc;
mod handlers;
pub mod telemetry;

// Public modules
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::lifecycle::RequestLifecycle;
pub use state::AppState;

/// API base path prefix
pub const API_PREFIX: &str = "/api";
