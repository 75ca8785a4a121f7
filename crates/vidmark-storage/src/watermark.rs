//! The watermark image shared by every request.

use crate::traits::{StorageError, StorageResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read-only watermark image, provisioned at deployment time.
///
/// Requests only ever read it; it is never released by the pipeline.
#[derive(Debug, Clone)]
pub struct WatermarkAsset {
    path: Arc<PathBuf>,
}

impl WatermarkAsset {
    /// Resolve the asset once at startup. Fails if the image is missing.
    pub async fn resolve(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|_| StorageError::NotFound(path.display().to_string()))?;

        if !meta.is_file() {
            return Err(StorageError::ConfigError(format!(
                "Watermark {} is not a regular file",
                path.display()
            )));
        }

        let path = tokio::fs::canonicalize(&path).await?;
        tracing::info!(path = %path.display(), size_bytes = meta.len(), "Watermark asset resolved");

        Ok(Self {
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
