use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub query: String,
    pub feedback: String,
}

pub async fn post_feedback(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.query.trim().is_empty() || payload.feedback.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Both query and feedback are required".to_string(),
        ));
    }

    state
        .usage
        .record_feedback(&payload.query, &payload.feedback)
        .await;
    Ok(Json(json!({ "message": "Feedback received" })))
}
