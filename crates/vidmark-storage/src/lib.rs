//! Vidmark Storage Library
//!
//! Transient artifact storage for the watermarking pipeline: the uploaded source
//! clip, the produced output and the shared, read-only watermark image.
//!
//! # Artifact naming
//!
//! Every artifact lives directly under the store's base directory and is named
//! `{kind}-{unix_nanos}-{uuid}.{ext}`. Names are generated in the `keys` module so
//! concurrent requests never collide.

pub(crate) mod keys;
pub mod local;
pub mod traits;
pub mod watermark;

// Re-export commonly used types
pub use local::LocalArtifactStore;
pub use traits::{
    ArtifactHandle, ArtifactKind, ArtifactStore, ByteStream, StorageError, StorageResult,
    UploadReader,
};
pub use watermark::WatermarkAsset;
