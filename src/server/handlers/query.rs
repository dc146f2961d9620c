use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::answer::AnswerMode;
use crate::core::errors::ApiError;
use crate::models::ModelProfile;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub mode: Option<AnswerMode>,
    #[serde(default)]
    pub profile: Option<ModelProfile>,
}

/// Answers a query. Responds 200 with the result envelope, 400 with both
/// gate scores for an unsafe query, or 500 for a processing failure.
pub async fn post_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Response {
    if payload.query.trim().is_empty() {
        return ApiError::BadRequest(
            "Query format should be: {\"query\": \"your question\"}".to_string(),
        )
        .into_response();
    }

    let mode = payload.mode.unwrap_or_default();
    let profile = payload.profile.unwrap_or_default();

    match state.pipeline.answer(&payload.query, mode, profile).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            tracing::error!("Query failed: {}", err);
            err.into_response()
        }
    }
}
