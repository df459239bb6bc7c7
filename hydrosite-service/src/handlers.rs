//! HTTP request handlers for the analysis service.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use hydrosite::models::AnalysisRequest;

use crate::AppState;

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Human-readable failure message.
    pub detail: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Configured Earth Engine service account.
    pub service_account: String,
    /// Configured study-area asset id.
    pub region_asset: String,
}

/// Health check endpoint.
///
/// Reports the configured identity and study-area asset; always 200 once
/// the process has started.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let settings = state.session.settings();
    Json(HealthResponse {
        status: "ok".to_string(),
        service_account: settings.service_account.clone(),
        region_asset: settings.region_asset.clone(),
    })
}

/// Run the ten-layer site analysis for a point and buffer radius.
///
/// # Returns
///
/// - `200 OK` with the full `AnalysisResponse`
/// - `422 Unprocessable Entity` if `buffer_meters` is outside 1000-50000
///   (rejected before any remote call)
/// - `500 Internal Server Error` with `{"detail": ...}` on any failure
///   during region construction, remote evaluation, or response assembly
#[utoipa::path(
    post,
    path = "/analysis",
    tag = "analysis",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Analysis complete", body = hydrosite::models::AnalysisResponse),
        (status = 422, description = "Buffer radius out of range", body = ErrorDetail),
        (status = 500, description = "Analysis failed", body = ErrorDetail),
    )
)]
#[axum::debug_handler]
pub async fn perform_analysis(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> impl IntoResponse {
    let buffer_m = match request.resolve_buffer(state.session.settings().default_buffer_m) {
        Ok(buffer) => buffer,
        Err(message) => {
            tracing::warn!(
                buffer_meters = ?request.buffer_meters,
                "rejected analysis request"
            );
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorDetail { detail: message }),
            )
                .into_response();
        }
    };

    tracing::info!(
        lat = request.latitude,
        lon = request.longitude,
        buffer_m = buffer_m,
        "running analysis"
    );

    match hydrosite::run_analysis(&state.session, &request, buffer_m).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorDetail {
                    detail: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
