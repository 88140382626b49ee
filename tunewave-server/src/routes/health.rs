//! Liveness and readiness endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::warn;
use utoipa::OpenApi;

use crate::schemas::health::{HealthResponse, ReadinessChecks, ReadinessResponse};
use crate::services::workspace::JobWorkspace;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_health, get_ready),
    components(schemas(HealthResponse, ReadinessResponse, ReadinessChecks))
)]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(get_health))
        .route("/ready", get(get_ready))
}

/// Heartbeat endpoint.
///
/// Returns `{"status": "ok", "version": "..."}` with HTTP 200 as long as the
/// process is serving requests.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is alive", body = HealthResponse)
    )
)]
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}

/// Readiness probe.
///
/// Checks, on every call, that the transcoder can be found and that a
/// working directory can be created and removed.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Ready to convert", body = ReadinessResponse),
        (status = 503, description = "A dependency is missing", body = ReadinessResponse),
    )
)]
pub async fn get_ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let ffmpeg = state.converter.transcoder().resolve().await;
    let work_dir = state.converter.work_dir().to_path_buf();

    let work_dir_writable = match JobWorkspace::create_async(work_dir.clone()).await {
        Ok(workspace) => workspace.close_async().await.is_ok(),
        Err(_) => false,
    };

    let checks = ReadinessChecks {
        ffmpeg_found: ffmpeg.is_some(),
        work_dir_writable,
    };
    let ready = checks.ffmpeg_found && checks.work_dir_writable;
    if !ready {
        warn!(
            ffmpeg = %state.converter.transcoder().program().display(),
            ffmpeg_found = checks.ffmpeg_found,
            work_dir = %work_dir.display(),
            work_dir_writable = checks.work_dir_writable,
            "readiness check failed"
        );
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "unavailable" }.to_owned(),
            ffmpeg: ffmpeg.map(|p| p.display().to_string()),
            work_dir: work_dir.display().to_string(),
            checks,
        }),
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
