use crate::keys::{generate_artifact_name, sanitize_extension};
use crate::traits::{
    ArtifactHandle, ArtifactKind, ArtifactStore, ByteStream, StorageError, StorageResult,
    UploadReader,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem artifact store
#[derive(Clone)]
pub struct LocalArtifactStore {
    base_path: PathBuf,
}

impl LocalArtifactStore {
    /// Create a new LocalArtifactStore instance
    ///
    /// # Arguments
    /// * `base_path` - Directory for transient artifacts (e.g., "/tmp/vidmark")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create artifact directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalArtifactStore { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn new_handle(&self, kind: ArtifactKind, extension: &str) -> ArtifactHandle {
        let id = Uuid::new_v4();
        let name = generate_artifact_name(kind, id, extension);
        ArtifactHandle::new(id, kind, self.base_path.join(name))
    }

    /// Reject handles that do not point directly inside the base directory.
    fn checked_path<'a>(&self, handle: &'a ArtifactHandle) -> StorageResult<&'a Path> {
        let path = handle.path();
        if path.parent() != Some(self.base_path.as_path()) {
            return Err(StorageError::InvalidPath(path.display().to_string()));
        }
        Ok(path)
    }
}

/// Removes a file being written unless it is committed.
///
/// The copy in `materialize` can be abandoned at any await point (cancelled
/// request future), so removal happens from `Drop` with a blocking unlink.
struct PartialFile<'a> {
    path: Option<&'a Path>,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path: Some(path) }
    }

    fn commit(mut self) {
        self.path = None;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed partially written artifact")
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partially written artifact"
            ),
        }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn materialize(
        &self,
        mut reader: UploadReader<'_>,
        extension_hint: Option<&str>,
    ) -> StorageResult<(ArtifactHandle, u64)> {
        let extension = sanitize_extension(extension_hint.unwrap_or_default());
        let handle = self.new_handle(ArtifactKind::Source, &extension);
        let path = handle.path();
        let start = std::time::Instant::now();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let guard = PartialFile::new(path);

        let bytes_copied = async {
            let bytes_copied = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<u64, std::io::Error>(bytes_copied)
        }
        .await
        .map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to write stream to file {}: {}",
                path.display(),
                e
            ))
        })?;

        drop(file);
        guard.commit();

        tracing::info!(
            path = %path.display(),
            artifact_id = %handle.id(),
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Source artifact materialized"
        );

        Ok((handle, bytes_copied))
    }

    async fn allocate_output_slot(&self, extension: &str) -> StorageResult<ArtifactHandle> {
        let handle = self.new_handle(ArtifactKind::Output, extension);
        tracing::debug!(
            path = %handle.path().display(),
            artifact_id = %handle.id(),
            "Output slot allocated"
        );
        Ok(handle)
    }

    async fn release(&self, handle: &ArtifactHandle) -> StorageResult<()> {
        let path = self.checked_path(handle)?;

        match fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(
                    path = %path.display(),
                    artifact_id = %handle.id(),
                    kind = %handle.kind(),
                    "Artifact released"
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn open_stream(&self, handle: &ArtifactHandle) -> StorageResult<ByteStream> {
        let path = self.checked_path(handle)?;

        let file = fs::File::open(path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(handle.file_name())
            } else {
                StorageError::ReadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        let stream = tokio_util::io::ReaderStream::with_capacity(file, READ_CHUNK_SIZE).map(
            |result| {
                result.map_err(|e| StorageError::ReadFailed(format!("Failed to read chunk: {}", e)))
            },
        );

        Ok(Box::pin(stream))
    }

    async fn content_length(&self, handle: &ArtifactHandle) -> StorageResult<u64> {
        let path = self.checked_path(handle)?;
        let meta = fs::metadata(path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(handle.file_name())
            } else {
                StorageError::ReadFailed(e.to_string())
            }
        })?;
        Ok(meta.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::StreamExt;
    use std::pin::Pin;
    use tempfile::tempdir;

    fn reader_from(data: &[u8]) -> UploadReader<'static> {
        Box::pin(std::io::Cursor::new(data.to_vec()))
            as Pin<Box<dyn tokio::io::AsyncRead + Send + Unpin>>
    }

    async fn dir_entries(path: &Path) -> usize {
        let mut entries = fs::read_dir(path).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn test_materialize_and_stream_back() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path()).await.unwrap();

        let (handle, size) = store
            .materialize(reader_from(b"recorded clip"), Some("webm"))
            .await
            .unwrap();

        assert_eq!(size, 13);
        assert_eq!(handle.kind(), ArtifactKind::Source);
        assert!(handle.file_name().starts_with("source-"));
        assert!(handle.file_name().ends_with(".webm"));
        assert_eq!(store.content_length(&handle).await.unwrap(), 13);

        let mut stream = store.open_stream(&handle).await.unwrap();
        let mut downloaded = Vec::new();
        while let Some(chunk) = stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(downloaded, b"recorded clip");
    }

    #[tokio::test]
    async fn test_materialize_names_do_not_collide() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path()).await.unwrap();

        let (a, _) = store.materialize(reader_from(b"a"), None).await.unwrap();
        let (b, _) = store.materialize(reader_from(b"b"), None).await.unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.file_name().ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_output_slot_is_not_created() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path()).await.unwrap();

        let slot = store.allocate_output_slot("mp4").await.unwrap();
        let other = store.allocate_output_slot("mp4").await.unwrap();

        assert_ne!(slot.path(), other.path());
        assert_eq!(slot.kind(), ArtifactKind::Output);
        assert!(!slot.path().exists());
        assert_eq!(dir_entries(dir.path()).await, 0);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path()).await.unwrap();

        let (handle, _) = store.materialize(reader_from(b"x"), None).await.unwrap();
        store.release(&handle).await.unwrap();
        store.release(&handle).await.unwrap();
        assert!(!handle.path().exists());

        let never_written = store.allocate_output_slot("mp4").await.unwrap();
        assert!(store.release(&never_written).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path()).await.unwrap();

        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("connection reset")),
        ];
        let reader = tokio_util::io::StreamReader::new(futures::stream::iter(chunks));

        let result = store.materialize(Box::pin(reader), Some("webm")).await;

        assert!(matches!(result, Err(StorageError::WriteFailed(_))));
        assert_eq!(dir_entries(dir.path()).await, 0);
    }

    #[tokio::test]
    async fn test_abandoned_write_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path()).await.unwrap();

        let first: Vec<Result<Bytes, std::io::Error>> = vec![Ok(Bytes::from_static(b"partial"))];
        let stalled = futures::stream::iter(first).chain(futures::stream::pending());
        let reader = tokio_util::io::StreamReader::new(stalled);

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            store.materialize(Box::pin(reader), Some("webm")),
        )
        .await;

        assert!(result.is_err(), "write should still be waiting for data");
        assert_eq!(dir_entries(dir.path()).await, 0);
    }

    #[tokio::test]
    async fn test_foreign_handle_rejected() {
        let dir = tempdir().unwrap();
        let other_dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path()).await.unwrap();
        let other_store = LocalArtifactStore::new(other_dir.path()).await.unwrap();

        let foreign = other_store.allocate_output_slot("mp4").await.unwrap();
        let result = store.release(&foreign).await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_open_missing_artifact() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path()).await.unwrap();

        let slot = store.allocate_output_slot("mp4").await.unwrap();
        let result = store.open_stream(&slot).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
