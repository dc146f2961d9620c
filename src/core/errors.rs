use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Component-level errors: model runner calls, retrieval, configuration.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let message = match &self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Internal(msg) => {
                msg.clone()
            }
        };
        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

/// Errors surfaced by the answer pipeline to its callers.
///
/// The unsafe-input rejection is a distinct variant carrying both gate
/// scores so front ends can answer with a 400; everything else maps to a
/// generic 500.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("query flagged as potentially unsafe")]
    UnsafeQuery {
        jailbreak_score: f64,
        indirect_score: f64,
    },
    #[error("search request failed: {0}")]
    SearchFailed(String),
    #[error("both primary and fallback generation failed: {primary}; {fallback}")]
    GenerationFailed { primary: String, fallback: String },
    #[error("generation failed: {0}")]
    StrategyFailed(String),
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> axum::response::Response {
        match &self {
            PipelineError::UnsafeQuery {
                jailbreak_score,
                indirect_score,
            } => {
                let body = Json(json!({
                    "warning": "The query was flagged as potentially unsafe.",
                    "jailbreak_score": jailbreak_score,
                    "indirect_score": indirect_score,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            other => {
                let body = Json(json!({ "error": other.to_string() }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
