//! Answer generation strategies and the fallback state machine.
//!
//! Four strategies exist: `Enhanced` (full retrieval-augmented path),
//! `Fallback` (query-only, intentionally cheaper), `Combined` (both at
//! once, synthesized) and `Offline` (no retrieval at all). Enhanced may
//! transition to Fallback exactly once per query; that transition is a
//! modeled outcome, not a caught panic. Fallback and Offline are terminal.

pub mod combined;
pub mod confidence;
pub mod enhanced;
pub mod fallback;
pub mod followup;
pub mod offline;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::config::PipelineSettings;
use crate::core::errors::{ApiError, PipelineError};
use crate::models::{GenerateParams, ModelProfile, ModelRegistry, ModelRole};
use crate::vector_math::softmax;

pub use enhanced::EnhancedOutcome;

/// The fixed confidence reported by the degraded terminal strategies.
///
/// This is a deliberate known-degraded placeholder, not a computed score;
/// callers read it as the signal that the answer came from a lower-fidelity
/// path.
pub const DEGRADED_CONFIDENCE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    Enhanced,
    Fallback,
    Combined,
    Offline,
}

impl Default for AnswerMode {
    fn default() -> Self {
        AnswerMode::Enhanced
    }
}

/// Everything a strategy produces short of sources and timing, which the
/// controller owns.
#[derive(Debug, Clone, Default)]
pub struct AnswerDraft {
    pub extractive_answer: String,
    pub abstractive_answer: String,
    pub summary: String,
    pub context_summary: String,
    pub sentiment_score: f64,
    pub confidence_score: f64,
    pub follow_up_questions: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub query: &'a str,
    pub raw_context: &'a str,
    pub processed_context: &'a str,
}

/// Dispatches to the strategy selected by the controller.
pub async fn generate(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    mode: AnswerMode,
    input: GenerationInput<'_>,
    settings: &PipelineSettings,
) -> Result<AnswerDraft, PipelineError> {
    match mode {
        AnswerMode::Enhanced => enhanced_with_fallback(registry, profile, input, settings).await,
        AnswerMode::Fallback => fallback::generate(registry, profile, input.query)
            .await
            .map_err(|err| PipelineError::StrategyFailed(err.to_string())),
        AnswerMode::Combined => combined::generate(registry, profile, input, settings).await,
        AnswerMode::Offline => offline::generate(registry, profile, input.query)
            .await
            .map_err(|err| PipelineError::StrategyFailed(err.to_string())),
    }
}

/// Runs Enhanced and, when it signals a transition, the Fallback strategy.
/// Only a Fallback failure after a transition is terminal.
pub(crate) async fn enhanced_with_fallback(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    input: GenerationInput<'_>,
    settings: &PipelineSettings,
) -> Result<AnswerDraft, PipelineError> {
    match enhanced::generate(registry, profile, input, settings.ner_enabled).await {
        EnhancedOutcome::Answer(draft) => Ok(*draft),
        EnhancedOutcome::FallBack(reason) => {
            tracing::warn!("Enhanced strategy degraded to fallback: {}", reason);
            fallback::generate(registry, profile, input.query)
                .await
                .map_err(|err| PipelineError::GenerationFailed {
                    primary: reason,
                    fallback: err.to_string(),
                })
        }
    }
}

/// One seq2seq generation call.
pub(crate) async fn generate_text(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    prompt: &str,
    params: &GenerateParams,
) -> Result<String, ApiError> {
    let generator = registry.generator(ModelRole::Seq2Seq, profile).await?;
    generator.generate(prompt, params).await
}

/// Abstractive summary of a finished answer.
pub(crate) async fn summarize_text(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    text: &str,
) -> Result<String, ApiError> {
    let prompt = format!("summarize: {}", text);
    generate_text(registry, profile, &prompt, &GenerateParams::summary()).await
}

/// Top class probability from the sentiment classifier, in [0, 1].
pub(crate) async fn sentiment_score(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    text: &str,
) -> Result<f64, ApiError> {
    let classifier = registry.classifier(ModelRole::Sentiment, profile).await?;
    let logits = classifier.classify(text).await?;
    let probabilities = softmax(&logits, 1.0);
    let top = probabilities
        .iter()
        .cloned()
        .fold(f32::NEG_INFINITY, f32::max);
    if !top.is_finite() {
        return Err(ApiError::Internal(
            "Sentiment classifier returned no classes".to_string(),
        ));
    }
    Ok(top as f64)
}
