use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Result of the on-demand readiness probe.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    /// `"ready"` or `"unavailable"`.
    pub status: String,
    /// Resolved transcoder path, when found.
    pub ffmpeg: Option<String>,
    pub work_dir: String,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessChecks {
    pub ffmpeg_found: bool,
    pub work_dir_writable: bool,
}
