//! Transform executor - hands a built job to the external engine.

use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use vidmark_storage::ArtifactHandle;

use super::graph::TransformJob;
use super::probe::VideoProbe;
use crate::error::TransformError;

const DIAGNOSTIC_LINES: usize = 5;
const DIAGNOSTIC_MAX_CHARS: usize = 2000;

/// Runs one transform job to exactly one terminal outcome.
///
/// `Ok` carries the output handle and means the artifact is fully written and
/// usable. Any partial output on failure stays owned by the caller for release.
#[async_trait]
pub trait TransformExecutor: Send + Sync {
    async fn run(&self, job: TransformJob) -> Result<ArtifactHandle, TransformError>;
}

/// Executor backed by an FFmpeg child process.
#[derive(Debug, Clone)]
pub struct FFmpegExecutor {
    ffmpeg_path: String,
    timeout: Option<Duration>,
    output_probe: Option<VideoProbe>,
}

impl FFmpegExecutor {
    pub fn new(ffmpeg_path: impl Into<String>) -> Result<Self, TransformError> {
        let ffmpeg_path = ffmpeg_path.into();
        super::validate_binary_path(&ffmpeg_path).map_err(TransformError::InvalidEnginePath)?;

        Ok(Self {
            ffmpeg_path,
            timeout: None,
            output_probe: None,
        })
    }

    /// Bound the engine's wall-clock time. `None` keeps it unbounded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe every produced output before reporting completion.
    pub fn with_output_probe(mut self, probe: VideoProbe) -> Self {
        self.output_probe = Some(probe);
        self
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    async fn verify_output(&self, output: &ArtifactHandle) -> Result<(), TransformError> {
        let size = match tokio::fs::metadata(output.path()).await {
            Ok(meta) => meta.len(),
            Err(_) => return Err(TransformError::MissingOutput(output.file_name())),
        };
        if size == 0 {
            return Err(TransformError::MissingOutput(output.file_name()));
        }

        if let Some(probe) = &self.output_probe {
            let metadata = probe
                .probe(output.path())
                .await
                .map_err(|e| TransformError::Probe(e.to_string()))?;
            tracing::debug!(
                width = metadata.width,
                height = metadata.height,
                duration = metadata.duration,
                "Output verified"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl TransformExecutor for FFmpegExecutor {
    #[tracing::instrument(
        skip(self, job),
        fields(
            process.executable.path = %self.ffmpeg_path,
            artifact_id = %job.output().id(),
        )
    )]
    async fn run(&self, job: TransformJob) -> Result<ArtifactHandle, TransformError> {
        let start = std::time::Instant::now();
        tracing::info!(filter = %job.filter_complex(), "Starting transform");

        // Dropping the child (timeout, cancelled request) kills the engine.
        let child = Command::new(&self.ffmpeg_path)
            .args(job.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransformError::Spawn {
                program: self.ffmpeg_path.clone(),
                source,
            })?;

        let output = wait_bounded(child, self.timeout).await?;

        if !output.status.success() {
            let diagnostic = stderr_tail(&output.stderr)
                .unwrap_or_else(|| format!("engine exited with {}", output.status));
            tracing::warn!(
                status = ?output.status.code(),
                duration_ms = start.elapsed().as_millis(),
                diagnostic = %diagnostic,
                "Transform failed"
            );
            return Err(TransformError::Engine {
                status: output.status.code(),
                diagnostic,
            });
        }

        self.verify_output(job.output()).await?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            "Transform completed"
        );

        Ok(job.into_output())
    }
}

/// Wait for the child to exit. On timeout the child is dropped and killed.
async fn wait_bounded(child: Child, timeout: Option<Duration>) -> Result<Output, TransformError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| TransformError::TimedOut {
                secs: limit.as_secs(),
            })?
            .map_err(TransformError::from),
        None => Ok(child.wait_with_output().await?),
    }
}

/// Last few non-empty stderr lines; FFmpeg prints the actual cause at the end.
fn stderr_tail(stderr: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }

    let tail = lines[lines.len().saturating_sub(DIAGNOSTIC_LINES)..].join("\n");
    let char_count = tail.chars().count();
    if char_count > DIAGNOSTIC_MAX_CHARS {
        Some(tail.chars().skip(char_count - DIAGNOSTIC_MAX_CHARS).collect())
    } else {
        Some(tail)
    }
}
