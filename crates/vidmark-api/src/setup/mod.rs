//! Application setup and initialization
//!
//! Builds the shared state (artifact store, watermark asset, engine) once at
//! startup and wires it into the router.

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use vidmark_core::Config;
use vidmark_processing::{FFmpegExecutor, TransformGraphBuilder, VideoProbe};
use vidmark_storage::{LocalArtifactStore, WatermarkAsset};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(environment = %config.environment, "Configuration loaded");

    let state = Arc::new(build_state(config.clone()).await?);
    let router = routes::setup_routes(&config, state.clone()).await?;

    Ok((state, router))
}

/// Resolve every startup dependency. A missing watermark or an unusable
/// engine path fails startup rather than individual requests.
pub async fn build_state(config: Config) -> Result<AppState> {
    let store = LocalArtifactStore::new(&config.artifact_dir)
        .await
        .context("Failed to initialize artifact store")?;

    let watermark = WatermarkAsset::resolve(&config.watermark_path)
        .await
        .with_context(|| {
            format!(
                "Watermark image not found at {}",
                config.watermark_path.display()
            )
        })?;

    let mut executor = FFmpegExecutor::new(config.ffmpeg_path.clone())
        .context("Invalid FFMPEG_PATH")?
        .with_timeout(config.transform_timeout_secs.map(Duration::from_secs));

    if let Some(ffprobe_path) = &config.ffprobe_path {
        let probe = VideoProbe::new(ffprobe_path.clone()).context("Invalid FFPROBE_PATH")?;
        executor = executor.with_output_probe(probe);
    }

    tracing::info!(
        artifact_dir = %store.base_path().display(),
        watermark = %watermark.path().display(),
        ffmpeg_path = %executor.ffmpeg_path(),
        "Pipeline components ready"
    );

    Ok(AppState {
        graph_builder: TransformGraphBuilder::new(config.audio_codec.clone()),
        store: Arc::new(store),
        watermark,
        executor: Arc::new(executor),
        config,
    })
}
