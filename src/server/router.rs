use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{feedback, health, history, query};
use crate::state::AppState;

/// Builds the application router: liveness probe, the query endpoint and
/// the history/feedback endpoints, with CORS and request tracing layered
/// on top.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/query", post(query::post_query))
        .route("/api/feedback", post(feedback::post_feedback))
        .route("/api/history", get(history::get_history))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Origins come from `server.cors_allowed_origins` in the config; an empty
/// or missing list means the usual local dev origins.
fn cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let configured: Vec<HeaderValue> = state
        .config
        .load_config()
        .ok()
        .as_ref()
        .and_then(|config| config.pointer("/server/cors_allowed_origins"))
        .and_then(|value| value.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|origin| origin.as_str())
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect()
        })
        .unwrap_or_default();

    let origins = if configured.is_empty() {
        LOCAL_DEV_ORIGINS
            .iter()
            .map(|origin| HeaderValue::from_static(origin))
            .collect::<Vec<_>>()
    } else {
        configured
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

const LOCAL_DEV_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8000",
];
