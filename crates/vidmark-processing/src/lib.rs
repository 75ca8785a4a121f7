//! Vidmark Processing Library
//!
//! Builds the fixed watermark overlay graph and runs it through the external
//! media engine (FFmpeg).

pub mod error;
pub mod metadata;
pub mod video;

// Re-export commonly used types
pub use error::TransformError;
pub use metadata::VideoMetadata;
pub use video::{FFmpegExecutor, TransformExecutor, TransformGraphBuilder, TransformJob, VideoProbe};
