//! Query-only generation, the terminal degraded strategy.

use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::models::{GenerateParams, ModelProfile, ModelRegistry};

use super::{
    followup, generate_text, sentiment_score, summarize_text, AnswerDraft, DEGRADED_CONFIDENCE,
};

pub async fn generate(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    query: &str,
) -> Result<AnswerDraft, ApiError> {
    tracing::info!("Generating fallback answer without retrieved context");

    let prompt = format!("Question: {} Answer:", query);
    let abstractive_answer =
        generate_text(registry, profile, &prompt, &GenerateParams::fallback()).await?;

    let summary = summarize_text(registry, profile, &abstractive_answer).await?;
    let sentiment = sentiment_score(registry, profile, &abstractive_answer).await?;
    let follow_up_questions =
        followup::generate(registry, profile, query, &abstractive_answer).await;

    Ok(AnswerDraft {
        extractive_answer: String::new(),
        abstractive_answer,
        summary,
        context_summary: String::new(),
        sentiment_score: sentiment,
        confidence_score: DEGRADED_CONFIDENCE,
        follow_up_questions,
    })
}
