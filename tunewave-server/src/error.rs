//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a `{ "error": "..." }` JSON body with an appropriate status code.
//!
//! **Security note:** conversion failures are logged with full detail but
//! callers only ever see `"Conversion Failed"`, so upstream URLs, file paths
//! and transcoder output never leak to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::conversion::ConversionError;

pub const BINARY_NOT_FOUND: &str = "FFmpeg binary not found";
pub const CONVERSION_FAILED: &str = "Conversion Failed";

/// All errors that can occur in the tunewave-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request came from an origin that is not on the allow list.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The conversion pipeline failed after validation.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),

            ServerError::Conversion(e) => {
                error!(kind = e.kind(), error = %e, "conversion failed");
                let message = match e {
                    ConversionError::DependencyMissing { .. } => BINARY_NOT_FOUND,
                    _ => CONVERSION_FAILED,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_owned())
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::path::PathBuf;

    async fn render(err: ServerError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_binary_has_dedicated_message() {
        let (status, body) = render(
            ConversionError::DependencyMissing {
                path: PathBuf::from("/opt/ffmpeg"),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "FFmpeg binary not found" }));
    }

    #[tokio::test]
    async fn other_conversion_errors_are_generic() {
        let err = ConversionError::PostProcess(std::io::Error::other("/tmp/secret/output.mp3"));
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Conversion Failed" }));
    }

    #[tokio::test]
    async fn bad_request_exposes_message() {
        let (status, body) = render(ServerError::BadRequest("nope".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "nope");
    }
}
