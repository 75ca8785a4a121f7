//! Route configuration and setup

use crate::error::HttpAppError;
use crate::handlers;
use crate::state::AppState;
use crate::API_PREFIX;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::ToSchema;
use vidmark_core::{AppError, Config};

/// Setup all application routes
pub async fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    let api_routes = Router::new()
        .route("/watermark", post(handlers::watermark::watermark_video))
        // Multipart is bounded by the layer below, not axum's 2 MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_video_size_bytes))
        .layer(map_response(render_body_limit_rejection));

    let app = Router::new()
        .route("/health", get(health_check))
        .nest(API_PREFIX, api_routes)
        .with_state(state)
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .layer(TraceLayer::new_for_http());

    tracing::info!(
        max_video_mb = config.max_video_size_bytes / 1024 / 1024,
        "Routes configured"
    );

    Ok(app)
}

/// Give the body-limit layer's plain-text 413 the same JSON shape as every
/// other error.
async fn render_body_limit_rejection(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if response.status() != StatusCode::PAYLOAD_TOO_LARGE || is_json {
        return response;
    }

    HttpAppError(AppError::PayloadTooLarge(
        "Request body exceeds the configured upload limit".to_string(),
    ))
    .into_response()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub ffmpeg_path: String,
    /// "present" when the watermark image is still readable
    pub watermark: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthCheckResponse),
        (status = 503, description = "Watermark asset is missing", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut response = HealthCheckResponse {
        status: "healthy".to_string(),
        ffmpeg_path: state.config.ffmpeg_path.clone(),
        watermark: "present".to_string(),
    };

    let status_code = match tokio::fs::metadata(state.watermark.path()).await {
        Ok(meta) if meta.is_file() => StatusCode::OK,
        Ok(_) | Err(_) => {
            tracing::error!(
                path = %state.watermark.path().display(),
                "Watermark asset health check failed"
            );
            response.status = "unhealthy".to_string();
            response.watermark = "missing".to_string();
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    (status_code, Json(response))
}
