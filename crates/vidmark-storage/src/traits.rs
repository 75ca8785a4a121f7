//! Artifact store abstraction
//!
//! This module defines the ArtifactStore trait the request pipeline uses for every
//! transient file it touches. No other component reads or writes the medium directly.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Invalid artifact path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Inbound byte source consumed by [`ArtifactStore::materialize`].
pub type UploadReader<'a> = Pin<Box<dyn AsyncRead + Send + Unpin + 'a>>;

/// Chunked, sequential read of a stored artifact.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// What an artifact holds; used as the name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Source,
    Output,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Source => "source",
            ArtifactKind::Output => "output",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to one transient artifact owned by a single request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactHandle {
    id: Uuid,
    kind: ArtifactKind,
    path: PathBuf,
}

impl ArtifactHandle {
    pub(crate) fn new(id: Uuid, kind: ArtifactKind, path: PathBuf) -> Self {
        Self { id, kind, path }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Filesystem location handed to the processing engine.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Artifact store trait
///
/// Implementations own a transient medium and hand out [`ArtifactHandle`]s whose
/// paths the processing engine can read and write. Every handle created through
/// `materialize` or `allocate_output_slot` must eventually be passed to `release`.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist an inbound byte stream under a collision-resistant name.
    ///
    /// On failure nothing is left behind: a partially written file is removed
    /// before the error is returned.
    async fn materialize(
        &self,
        reader: UploadReader<'_>,
        extension_hint: Option<&str>,
    ) -> StorageResult<(ArtifactHandle, u64)>;

    /// Reserve a unique destination name. The file itself is not created.
    async fn allocate_output_slot(&self, extension: &str) -> StorageResult<ArtifactHandle>;

    /// Remove the storage behind a handle. Already-absent targets are a success,
    /// so calling this twice, or on a slot that was never written, is fine.
    async fn release(&self, handle: &ArtifactHandle) -> StorageResult<()>;

    /// Open an artifact for sequential chunked reading.
    async fn open_stream(&self, handle: &ArtifactHandle) -> StorageResult<ByteStream>;

    /// Size in bytes of a written artifact.
    async fn content_length(&self, handle: &ArtifactHandle) -> StorageResult<u64>;
}
