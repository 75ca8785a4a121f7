//! Test helpers: build AppState and router for integration tests.
//!
//! The engine is replaced with in-process executors so these tests do not need
//! FFmpeg; the real engine is covered by `vidmark-processing`'s ignored tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use bytes::Bytes;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vidmark_api::setup::routes;
use vidmark_api::state::AppState;
use vidmark_core::config::LogFormat;
use vidmark_core::Config;
use vidmark_processing::{TransformError, TransformExecutor, TransformGraphBuilder, TransformJob};
use vidmark_storage::{
    ArtifactHandle, ArtifactStore, ByteStream, LocalArtifactStore, StorageResult, UploadReader,
    WatermarkAsset,
};

/// Store wrapper that counts every handle created and released.
pub struct CountingStore {
    inner: LocalArtifactStore,
    pub materialized: AtomicUsize,
    pub allocated: AtomicUsize,
    pub released: AtomicUsize,
}

impl CountingStore {
    pub fn created(&self) -> usize {
        self.materialized.load(Ordering::SeqCst) + self.allocated.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactStore for CountingStore {
    async fn materialize(
        &self,
        reader: UploadReader<'_>,
        extension_hint: Option<&str>,
    ) -> StorageResult<(ArtifactHandle, u64)> {
        let stored = self.inner.materialize(reader, extension_hint).await?;
        self.materialized.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn allocate_output_slot(&self, extension: &str) -> StorageResult<ArtifactHandle> {
        let handle = self.inner.allocate_output_slot(extension).await?;
        self.allocated.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    async fn release(&self, handle: &ArtifactHandle) -> StorageResult<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release(handle).await
    }

    async fn open_stream(&self, handle: &ArtifactHandle) -> StorageResult<ByteStream> {
        self.inner.open_stream(handle).await
    }

    async fn content_length(&self, handle: &ArtifactHandle) -> StorageResult<u64> {
        self.inner.content_length(handle).await
    }
}

/// Stands in for the engine by copying the source to the output slot.
pub struct CopyExecutor {
    pub delay: Duration,
}

#[async_trait]
impl TransformExecutor for CopyExecutor {
    async fn run(&self, job: TransformJob) -> Result<ArtifactHandle, TransformError> {
        tokio::time::sleep(self.delay).await;
        tokio::fs::copy(job.source(), job.output().path()).await?;
        Ok(job.into_output())
    }
}

/// Leaves a partial output behind and reports an engine failure.
pub struct FailingExecutor;

#[async_trait]
impl TransformExecutor for FailingExecutor {
    async fn run(&self, job: TransformJob) -> Result<ArtifactHandle, TransformError> {
        tokio::fs::write(job.output().path(), b"truncated").await?;
        Err(TransformError::Engine {
            status: Some(1),
            diagnostic: "Invalid data found when processing input".to_string(),
        })
    }
}

/// Test application: server plus the owned artifact directory.
pub struct TestApp {
    pub server: TestServer,
    /// Router behind the server, for driving requests without the test client
    pub router: Router,
    pub store: Arc<CountingStore>,
    pub artifact_dir: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Wait until every artifact has been released. Streaming bodies release
    /// from a spawned task, so this polls briefly.
    pub async fn wait_for_empty_artifact_dir(&self) -> bool {
        for _ in 0..100 {
            if count_files(&self.artifact_dir).await == 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

pub async fn count_files(dir: &Path) -> usize {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .expect("Failed to read artifact directory");
    let mut count = 0;
    while entries
        .next_entry()
        .await
        .expect("Failed to read entry")
        .is_some()
    {
        count += 1;
    }
    count
}

pub fn create_test_config(temp_dir: &Path) -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        ffmpeg_path: "ffmpeg".to_string(),
        ffprobe_path: None,
        watermark_path: temp_dir.join("watermark.png"),
        artifact_dir: temp_dir.join("artifacts"),
        max_video_size_bytes: 1024 * 1024,
        transform_timeout_secs: None,
        audio_codec: "copy".to_string(),
        log_format: LogFormat::Text,
    }
}

/// Setup test app with an isolated artifact directory and the given executor.
pub async fn setup_test_app(executor: Arc<dyn TransformExecutor>) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = create_test_config(temp_dir.path());

    tokio::fs::write(&config.watermark_path, b"\x89PNG watermark")
        .await
        .expect("Failed to write watermark fixture");
    let watermark = WatermarkAsset::resolve(&config.watermark_path)
        .await
        .expect("Failed to resolve watermark");

    let store = Arc::new(CountingStore {
        inner: LocalArtifactStore::new(&config.artifact_dir)
            .await
            .expect("Failed to create artifact store"),
        materialized: AtomicUsize::new(0),
        allocated: AtomicUsize::new(0),
        released: AtomicUsize::new(0),
    });

    let state = Arc::new(AppState {
        config: config.clone(),
        store: store.clone(),
        watermark,
        graph_builder: TransformGraphBuilder::default(),
        executor,
    });

    let app = routes::setup_routes(&config, state)
        .await
        .expect("Failed to setup routes");
    let server =
        TestServer::new(app.clone().into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        router: app,
        store,
        artifact_dir: config.artifact_dir.clone(),
        _temp_dir: temp_dir,
    }
}

pub fn video_form(data: &[u8], file_name: &str) -> MultipartForm {
    let part = Part::bytes(Bytes::copy_from_slice(data))
        .file_name(file_name.to_string())
        .mime_type("video/webm");
    MultipartForm::new().add_part("video", part)
}

const BOUNDARY: &str = "vidmark-test-boundary";

fn video_part_head(file_name: &str) -> Bytes {
    Bytes::from(format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"{file_name}\"\r\nContent-Type: video/webm\r\n\r\n"
    ))
}

fn video_part_tail() -> Bytes {
    Bytes::from(format!("\r\n--{BOUNDARY}--\r\n"))
}

fn multipart_request() -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri("/api/watermark")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
}

/// Raw multipart request carrying a single `video` field.
pub fn raw_video_request(data: &[u8], file_name: &str) -> Request<Body> {
    let mut body = video_part_head(file_name).to_vec();
    body.extend_from_slice(data);
    body.extend_from_slice(&video_part_tail());

    let content_length = body.len();
    multipart_request()
        .header("content-length", content_length)
        .body(Body::from(body))
        .expect("Failed to build request")
}

/// Multipart request whose `video` field sends `data` and then never finishes,
/// like a client that stalls mid-upload.
pub fn stalled_video_request(data: &'static [u8]) -> Request<Body> {
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(video_part_head("stalled.webm")),
        Ok(Bytes::from_static(data)),
    ];
    let stream = futures::stream::iter(chunks).chain(futures::stream::pending());

    multipart_request()
        .body(Body::from_stream(stream))
        .expect("Failed to build request")
}

/// Complete multipart request sent in chunks without a `Content-Length`.
pub fn chunked_video_request(size: usize) -> Request<Body> {
    let mut chunks: Vec<Result<Bytes, std::io::Error>> = vec![Ok(video_part_head("big.webm"))];
    let chunk = Bytes::from(vec![0u8; 64 * 1024]);
    let mut remaining = size;
    while remaining > 0 {
        let len = remaining.min(chunk.len());
        chunks.push(Ok(chunk.slice(..len)));
        remaining -= len;
    }
    chunks.push(Ok(video_part_tail()));

    multipart_request()
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .expect("Failed to build request")
}

/// Read a JSON error body from a raw router response.
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Expected a JSON body")
}
