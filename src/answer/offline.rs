//! Generation without any retrieval, for when connectivity is unavailable
//! or the caller asked for it explicitly.

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
    tracing::info!("Generating offline answer");

    let prompt = format!(
        "Generate a comprehensive answer to the following question without using any external \
         information:\n\nQuestion: {}\n\nProvide a detailed response that:\n\
         1. Addresses the main points of the question\n\
         2. Offers relevant examples or explanations\n\
         3. Acknowledges any limitations in answering without access to real-time information\n\n\
         Answer:",
        query
    );
    let abstractive_answer =
        generate_text(registry, profile, &prompt, &GenerateParams::abstractive()).await?;

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
