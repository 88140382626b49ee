use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes::{convert, health};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(info(
    title = "tunewave-server",
    description = "Embeds cover art and ID3 tags into remote audio files",
    version = "0.1.0"
))]
pub struct ApiDoc;

/// The merged document, with the convert route listed under `base_path`.
pub fn get_docs(base_path: &str) -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.nest(base_path, convert::ConvertApi::openapi())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json(State(state): State<Arc<AppState>>) -> Json<utoipa::openapi::OpenApi> {
    Json(get_docs(&state.config.base_path))
}
