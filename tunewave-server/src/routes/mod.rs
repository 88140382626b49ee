//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (per-request trace id, origin guard, CORS)
//! - Health / readiness routes
//! - `POST /convert` nested under the configured base path
//! - Optional OpenAPI document (disable with `TUNEWAVE_ENABLE_DOCS=false`)

mod convert;
pub mod doc;
mod health;

use std::sync::Arc;

use axum::{middleware, Router};
use tower::ServiceBuilder;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new().merge(health::router());

    // axum refuses to nest at the root.
    let base_path = state.config.base_path.as_str();
    app = if base_path.is_empty() {
        app.merge(convert::router())
    } else {
        app.nest(base_path, convert::router())
    };

    if state.config.enable_docs {
        app = app.merge(doc::router());
    }

    app.layer(
        // Outermost layers execute first on the way in.
        ServiceBuilder::new()
            .layer(middleware::from_fn(trace::trace_middleware))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                cors::origin_guard,
            ))
            .layer(cors::cors_layer(&state)),
    )
    .with_state(state)
}
