//! Response Streamer
//!
//! Turns the terminal outcome of the pipeline into the HTTP response. On success
//! the output artifact is streamed back chunk by chunk and the body owns the
//! request's artifacts until the last chunk has been handed to the connection.

use crate::error::HttpAppError;
use crate::services::lifecycle::RequestLifecycle;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use vidmark_core::constants::{OUTPUT_CONTENT_TYPE, OUTPUT_EXTENSION};
use vidmark_core::AppError;
use vidmark_storage::{ArtifactHandle, ByteStream, StorageError};

/// Stream the completed output back to the client.
///
/// If the artifact cannot be opened the request's artifacts are released here
/// and the error is returned for rendering.
#[tracing::instrument(skip_all, fields(request_id = %lifecycle.request_id()))]
pub async fn on_success(
    lifecycle: RequestLifecycle,
    output: ArtifactHandle,
) -> Result<Response, HttpAppError> {
    let opened = async {
        let content_length = lifecycle.store().content_length(&output).await?;
        let stream = lifecycle.store().open_stream(&output).await?;
        Ok::<_, StorageError>((content_length, stream))
    }
    .await;

    let (content_length, stream) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open output artifact");
            lifecycle.release_all().await;
            return Err(e.into());
        }
    };

    let disposition = format!(
        "attachment; filename=\"watermarked-{}.{}\"",
        lifecycle.request_id(),
        OUTPUT_EXTENSION
    );
    tracing::info!(size_bytes = content_length, "Streaming watermarked video");

    let body = CleanupStream::new(stream, lifecycle, content_length);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, OUTPUT_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, content_length)
        .body(Body::from_stream(body))
        .map_err(|e| HttpAppError(AppError::Internal(format!("Failed to build response: {}", e))))
}

/// Release the request's artifacts, then render the error.
pub async fn on_failure(lifecycle: RequestLifecycle, error: HttpAppError) -> Response {
    let request_id = lifecycle.request_id();
    lifecycle.release_all().await;

    tracing::info!(
        request_id = %request_id,
        status = error.status().as_u16(),
        "Request finished with error"
    );
    error.into_response()
}

/// Body stream that owns the request's artifacts.
///
/// Exhaustion releases them; dropping the stream before that (client gone,
/// connection error) releases them through the lifecycle's `Drop`.
struct CleanupStream {
    inner: ByteStream,
    lifecycle: Option<RequestLifecycle>,
    expected_bytes: u64,
    bytes_sent: u64,
}

impl CleanupStream {
    fn new(inner: ByteStream, lifecycle: RequestLifecycle, expected_bytes: u64) -> Self {
        Self {
            inner,
            lifecycle: Some(lifecycle),
            expected_bytes,
            bytes_sent: 0,
        }
    }

    fn finish(&mut self, failure: Option<&StorageError>) {
        let Some(lifecycle) = self.lifecycle.take() else {
            return;
        };
        let request_id = lifecycle.request_id();

        match failure {
            Some(e) => log_transfer_failure(
                request_id,
                self.bytes_sent,
                self.expected_bytes,
                &AppError::Transfer(e.to_string()),
            ),
            None if self.bytes_sent < self.expected_bytes => log_transfer_failure(
                request_id,
                self.bytes_sent,
                self.expected_bytes,
                &AppError::Transfer("output ended before its advertised length".to_string()),
            ),
            None => tracing::info!(
                request_id = %request_id,
                bytes_sent = self.bytes_sent,
                "Transfer completed"
            ),
        }

        tokio::spawn(lifecycle.release_all());
    }
}

fn log_transfer_failure(request_id: uuid::Uuid, sent: u64, expected: u64, error: &AppError) {
    tracing::warn!(
        request_id = %request_id,
        error_class = "transfer",
        bytes_sent = sent,
        expected_bytes = expected,
        error = %error,
        "Transfer failed"
    );
}

impl Stream for CleanupStream {
    type Item = Result<Bytes, StorageError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.lifecycle.is_none() {
            return Poll::Ready(None);
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finish(Some(&e));
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finish(None);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for CleanupStream {
    fn drop(&mut self) {
        if let Some(lifecycle) = &self.lifecycle {
            log_transfer_failure(
                lifecycle.request_id(),
                self.bytes_sent,
                self.expected_bytes,
                &AppError::Transfer("client went away before the transfer completed".to_string()),
            );
        }
    }
}
