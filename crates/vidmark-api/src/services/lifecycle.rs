//! Ownership of the artifacts one request creates.
//!
//! A [`RequestLifecycle`] records every handle the store hands out for a request
//! and releases all of them exactly once. The release happens either through
//! [`RequestLifecycle::release_all`] on a terminal path, or from `Drop` when the
//! request future is cancelled (client disconnect, shutdown).

use std::sync::Arc;
use uuid::Uuid;
use vidmark_storage::{ArtifactHandle, ArtifactStore, StorageError, StorageResult, UploadReader};

pub struct RequestLifecycle {
    request_id: Uuid,
    store: Arc<dyn ArtifactStore>,
    artifacts: Vec<ArtifactHandle>,
}

impl RequestLifecycle {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            store,
            artifacts: Vec::new(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.artifacts.len()
    }

    /// Persist the upload and take ownership of the resulting artifact.
    /// A failed write leaves nothing to track.
    pub async fn materialize(
        &mut self,
        reader: UploadReader<'_>,
        extension_hint: Option<&str>,
    ) -> StorageResult<(ArtifactHandle, u64)> {
        let (handle, size) = self.store.materialize(reader, extension_hint).await?;
        self.artifacts.push(handle.clone());
        Ok((handle, size))
    }

    /// Reserve the output name. Tracked even though nothing is written yet, so
    /// a partial file left by a failed transform is released too.
    pub async fn allocate_output_slot(&mut self, extension: &str) -> StorageResult<ArtifactHandle> {
        let handle = self.store.allocate_output_slot(extension).await?;
        self.artifacts.push(handle.clone());
        Ok(handle)
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Release every tracked artifact. Failures are logged and never surface
    /// to the client. Handles are dropped from tracking only once their release
    /// has been attempted, so a cancelled call leaves the rest to `Drop`.
    pub async fn release_all(mut self) {
        let total = self.artifacts.len();
        while let Some(handle) = self.artifacts.last() {
            if let Err(e) = self.store.release(handle).await {
                log_release_failure(self.request_id, handle, &e);
            }
            self.artifacts.pop();
        }
        if total > 0 {
            tracing::debug!(
                request_id = %self.request_id,
                released = total,
                "Request artifacts released"
            );
        }
    }
}

fn log_release_failure(request_id: Uuid, handle: &ArtifactHandle, error: &StorageError) {
    tracing::error!(
        request_id = %request_id,
        artifact_id = %handle.id(),
        kind = %handle.kind(),
        error = %error,
        "Failed to release artifact"
    );
}

async fn release_detached(
    store: Arc<dyn ArtifactStore>,
    request_id: Uuid,
    artifacts: Vec<ArtifactHandle>,
) {
    for handle in &artifacts {
        if let Err(e) = store.release(handle).await {
            log_release_failure(request_id, handle, &e);
        }
    }
    tracing::debug!(
        request_id = %request_id,
        released = artifacts.len(),
        "Abandoned request artifacts released"
    );
}

impl Drop for RequestLifecycle {
    fn drop(&mut self) {
        if self.artifacts.is_empty() {
            return;
        }

        let artifacts = std::mem::take(&mut self.artifacts);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::debug!(
                    request_id = %self.request_id,
                    pending = artifacts.len(),
                    "Request abandoned, scheduling artifact release"
                );
                runtime.spawn(release_detached(
                    self.store.clone(),
                    self.request_id,
                    artifacts,
                ));
            }
            Err(_) => {
                tracing::error!(
                    request_id = %self.request_id,
                    pending = artifacts.len(),
                    "No runtime available, artifacts were not released"
                );
            }
        }
    }
}
