use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::error::ServerError;
use crate::state::AppState;

pub const NOT_ALLOWED_BY_CORS: &str = "Not allowed by CORS";

/// CORS response headers for the configured origins; GET/POST with a
/// `Content-Type` header only.
pub fn cors_layer(state: &AppState) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match &state.config.cors_allowed_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();
            layer.allow_origin(origins)
        }
        // Wildcard, suitable for development only.
        None => layer.allow_origin(Any),
    }
}

/// Reject browser requests from origins outside the allow list.
///
/// Requests without an `Origin` header (curl, server-to-server) pass.
pub async fn origin_guard(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(origin) = req.headers().get(header::ORIGIN) {
        if !is_allowed(state.config.cors_allowed_origins.as_deref(), origin) {
            warn!(origin = ?origin, path = %req.uri().path(), "rejected request from disallowed origin");
            return ServerError::Forbidden(NOT_ALLOWED_BY_CORS.to_owned()).into_response();
        }
    }
    next.run(req).await
}

fn is_allowed(allowed: Option<&[String]>, origin: &HeaderValue) -> bool {
    let Some(list) = allowed else {
        return true;
    };
    origin
        .to_str()
        .map(|o| list.iter().any(|a| a == o))
        .unwrap_or(false)
}
