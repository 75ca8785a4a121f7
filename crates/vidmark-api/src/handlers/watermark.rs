use crate::error::{ErrorResponse, HttpAppError};
use crate::services::lifecycle::RequestLifecycle;
use crate::services::streamer;
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use vidmark_core::constants::{OUTPUT_EXTENSION, VIDEO_FIELD_NAME};
use vidmark_core::AppError;
use vidmark_storage::{ArtifactHandle, UploadReader};

/// Watermark an uploaded recording
///
/// Accepts a multipart form with a `video` file field and responds with the
/// watermarked MP4 as an attachment. Fields with other names are ignored.
#[utoipa::path(
    post,
    path = "/api/watermark",
    tag = "watermark",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Watermarked video", content_type = "video/mp4"),
        (status = 400, description = "Missing video field or upload could not be stored", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Video processing failed", body = ErrorResponse)
    )
)]
pub async fn watermark_video(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return HttpAppError::from(rejection).into_response(),
    };

    let mut lifecycle = RequestLifecycle::new(state.store.clone());

    match run_pipeline(&state, &mut lifecycle, &mut multipart).await {
        Ok(output) => match streamer::on_success(lifecycle, output).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        },
        Err(e) => streamer::on_failure(lifecycle, e).await,
    }
}

#[tracing::instrument(skip_all, fields(request_id = %lifecycle.request_id()))]
async fn run_pipeline(
    state: &AppState,
    lifecycle: &mut RequestLifecycle,
    multipart: &mut Multipart,
) -> Result<ArtifactHandle, HttpAppError> {
    let source = receive_upload(lifecycle, multipart).await?;

    let output = lifecycle
        .allocate_output_slot(OUTPUT_EXTENSION)
        .await
        .map_err(|e| AppError::StorageWrite(e.to_string()))?;

    let job = state
        .graph_builder
        .build(&source, &state.watermark, output);

    let output = state.executor.run(job).await?;
    Ok(output)
}

/// Persist the first `video` field as the request's source artifact.
async fn receive_upload(
    lifecycle: &mut RequestLifecycle,
    multipart: &mut Multipart,
) -> Result<ArtifactHandle, HttpAppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FIELD_NAME) {
            tracing::debug!(field = ?field.name(), "Skipping unrelated form field");
            continue;
        }

        let extension = field
            .file_name()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);

        let mut too_large = false;
        let limit_flag = &mut too_large;
        let chunks = field.map(move |chunk| {
            chunk.map_err(|e| {
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    *limit_flag = true;
                }
                std::io::Error::other(e)
            })
        });
        let reader: UploadReader<'_> = Box::pin(StreamReader::new(Box::pin(chunks)));

        let result = lifecycle.materialize(reader, extension.as_deref()).await;
        let (source, size) = match result {
            Ok(stored) => stored,
            Err(e) if too_large => {
                return Err(AppError::PayloadTooLarge(format!("Upload rejected: {}", e)).into())
            }
            Err(e) => return Err(e.into()),
        };

        if size == 0 {
            return Err(AppError::MissingInput(format!(
                "The '{}' field is empty",
                VIDEO_FIELD_NAME
            ))
            .into());
        }

        tracing::info!(
            artifact_id = %source.id(),
            size_bytes = size,
            content_type = ?content_type,
            "Upload received"
        );
        return Ok(source);
    }

    Err(AppError::MissingInput(format!(
        "No '{}' field in the multipart body",
        VIDEO_FIELD_NAME
    ))
    .into())
}
