//! Application state shared by every request.
//!
//! Everything here is built once at startup and is read-only afterwards; the
//! only per-request state lives in [`crate::services::lifecycle::RequestLifecycle`].

use std::sync::Arc;
use vidmark_core::Config;
use vidmark_processing::{TransformExecutor, TransformGraphBuilder};
use vidmark_storage::{ArtifactStore, WatermarkAsset};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ArtifactStore>,
    pub watermark: WatermarkAsset,
    pub graph_builder: TransformGraphBuilder,
    pub executor: Arc<dyn TransformExecutor>,
}
