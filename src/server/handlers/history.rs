use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn get_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let history = state.usage.history().await;
    Json(json!({ "history": history }))
}
