//! Cover-art conversion endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::convert::{
    ConvertRequest, ConvertResponse, ErrorResponse, REQUIRED_FIELDS_MESSAGE,
};
use crate::services::conversion::ConversionJob;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(convert),
    components(schemas(ConvertRequest, ConvertResponse, ErrorResponse))
)]
pub struct ConvertApi;

/// Routes nested under the configured base path.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/convert", post(convert))
}

/// Tag an audio file with cover art, artist and album (`POST {base}/convert`).
///
/// Downloads `audioUrl` and `imageUrl`, runs ffmpeg to embed the image as the
/// front cover and write ID3v2.3 tags, and returns the resulting MP3 as
/// base64 alongside the echoed request fields.
#[utoipa::path(
    post,
    path = "/convert",
    tag = "convert",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Tagged MP3", body = ConvertResponse),
        (status = 400, description = "A required field is missing", body = ErrorResponse),
        (status = 403, description = "Origin not allowed", body = ErrorResponse),
        (status = 500, description = "FFmpeg missing or conversion failed", body = ErrorResponse),
    )
)]
pub async fn convert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, ServerError> {
    let Json(req) = payload.map_err(|rejection| {
        debug!(error = %rejection, "unreadable convert body");
        ServerError::BadRequest(REQUIRED_FIELDS_MESSAGE.to_owned())
    })?;
    let job = ConversionJob::try_from(req)?;

    info!(
        audio_url = %job.audio_url,
        image_url = %job.image_url,
        artists = ?job.artists,
        album = %job.album,
        "conversion requested"
    );

    let data = state.converter.convert(&job).await?;
    info!(bytes = data.len(), "conversion succeeded");

    Ok(Json(ConvertResponse {
        audio_data: STANDARD.encode(&data),
        audio_url: job.audio_url,
        image_url: job.image_url,
        artists: job.artists,
        album: job.album,
    }))
}
