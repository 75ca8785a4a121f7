//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::setup::routes::HealthCheckResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vidmark API",
        version = "0.1.0",
        description = "Watermarks uploaded recordings and streams the result back as MP4."
    ),
    paths(
        handlers::watermark::watermark_video,
        crate::setup::routes::health_check,
    ),
    components(schemas(error::ErrorResponse, HealthCheckResponse)),
    tags(
        (name = "watermark", description = "Video watermarking"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
