//! The full retrieval-augmented strategy.

use std::sync::Arc;

use crate::context::{truncate_chars, truncate_words};
use crate::core::errors::ApiError;
use crate::models::{GenerateParams, ModelProfile, ModelRegistry};
use crate::vector_math;

use super::{
    confidence, followup, generate_text, sentiment_score, summarize_text, AnswerDraft,
    GenerationInput,
};

/// Segments kept after ranking the processed context against the query.
const TOP_SEGMENTS: usize = 10;
/// Raw-context excerpt length inside the abstractive prompt.
const RAW_EXCERPT_CHARS: usize = 1000;
/// Processed/raw budgets for the context-summary input.
const SUMMARY_PROCESSED_CHARS: usize = 768;
const SUMMARY_RAW_CHARS: usize = 256;

/// Either a finished draft or a modeled transition to the Fallback
/// strategy. Enhanced never errors outward; every failure becomes a
/// transition carrying its reason.
pub enum EnhancedOutcome {
    Answer(Box<AnswerDraft>),
    FallBack(String),
}

pub async fn generate(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    input: GenerationInput<'_>,
    ner_enabled: bool,
) -> EnhancedOutcome {
    match run(registry, profile, input, ner_enabled).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!("Enhanced generation failed: {}", err);
            EnhancedOutcome::FallBack(err.to_string())
        }
    }
}

async fn run(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    input: GenerationInput<'_>,
    ner_enabled: bool,
) -> Result<EnhancedOutcome, ApiError> {
    tracing::info!(
        "Starting enhanced answer generation ({} chars raw, {} chars processed)",
        input.raw_context.len(),
        input.processed_context.len()
    );

    let context_summary = context_summary(registry, profile, input).await;

    let segments: Vec<String> = input
        .processed_context
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if segments.len() < 2 {
        return Ok(EnhancedOutcome::FallBack(format!(
            "only {} context segments available",
            segments.len()
        )));
    }

    let embedder = registry.embedder(profile).await?;
    let query_embeddings = embedder.embed(&[input.query.to_string()]).await?;
    let segment_embeddings = embedder.embed(&segments).await?;
    if query_embeddings.is_empty() || segment_embeddings.is_empty() {
        return Ok(EnhancedOutcome::FallBack(
            "embedding produced empty output".to_string(),
        ));
    }

    let ranking =
        vector_math::rank_descending_by_cosine(&query_embeddings[0], &segment_embeddings)?;
    let refined_context = ranking
        .iter()
        .take(TOP_SEGMENTS)
        .map(|(idx, _)| segments[*idx].as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let extractor = registry.span_extractor(profile).await?;
    let span = extractor.extract_span(input.query, &refined_context).await?;
    let extractive_answer = span.text;
    tracing::debug!(
        "Extractive answer spans tokens {}..{}",
        span.start,
        span.end
    );

    let prompt = format!(
        "Question: {}\nContext: {}\nRaw Context: {}\nExtracted Answer: {}\nContext Summary: {}\n\n\
         Provide a comprehensive answer to the question based on all the information above. \
         Be concise yet informative:",
        input.query,
        refined_context,
        truncate_chars(input.raw_context, RAW_EXCERPT_CHARS),
        extractive_answer,
        context_summary
    );
    let abstractive_answer =
        generate_text(registry, profile, &prompt, &GenerateParams::abstractive()).await?;

    let summary = summarize_text(registry, profile, &abstractive_answer).await?;
    let sentiment = sentiment_score(registry, profile, &abstractive_answer).await?;
    let confidence_score = confidence::score(
        registry,
        profile,
        &abstractive_answer,
        &extractive_answer,
        &refined_context,
        input.query,
        ner_enabled,
    )
    .await;
    let follow_up_questions =
        followup::generate(registry, profile, input.query, &abstractive_answer).await;

    Ok(EnhancedOutcome::Answer(Box::new(AnswerDraft {
        extractive_answer,
        abstractive_answer,
        summary,
        context_summary,
        sentiment_score: sentiment,
        confidence_score,
        follow_up_questions,
    })))
}

/// Small abstractive summary over truncated raw+processed context. Degrades
/// to a plain truncation when the summarization call fails.
async fn context_summary(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    input: GenerationInput<'_>,
) -> String {
    let combined = format!(
        "Processed: {} Raw: {}",
        truncate_chars(input.processed_context, SUMMARY_PROCESSED_CHARS),
        truncate_chars(input.raw_context, SUMMARY_RAW_CHARS)
    );

    match summarize_text(registry, profile, &combined).await {
        Ok(summary) => summary,
        Err(err) => {
            tracing::warn!("Context summary failed, truncating instead: {}", err);
            truncate_words(&combined, 100)
        }
    }
}
