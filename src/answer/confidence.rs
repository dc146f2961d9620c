//! Confidence scoring over a finished answer.
//!
//! Combines normalized similarity, length and linguistic signals into a
//! single [0, 100] estimate. Scoring is strictly fail-safe: empty inputs
//! and internal errors both yield 0.0, never an exception to the caller.

use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::models::{ModelProfile, ModelRegistry};
use crate::vector_math::cosine_similarity;

/// Reported when named-entity recognition is unavailable; a deliberate
/// midpoint rather than a zero so a missing capability does not read as a
/// bad answer.
const NER_UNAVAILABLE_SCORE: f64 = 0.5;

const WEIGHT_LENGTH: f64 = 0.15;
const WEIGHT_QUERY_SIM_ABSTRACTIVE: f64 = 0.20;
const WEIGHT_QUERY_SIM_EXTRACTIVE: f64 = 0.15;
const WEIGHT_ANSWER_SIM_CONTEXT: f64 = 0.20;
const WEIGHT_COHERENCE: f64 = 0.15;
const WEIGHT_READABILITY: f64 = 0.10;
const WEIGHT_NER: f64 = 0.05;

pub async fn score(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    abstractive: &str,
    extractive: &str,
    context: &str,
    query: &str,
    ner_enabled: bool,
) -> f64 {
    match compute(
        registry,
        profile,
        abstractive,
        extractive,
        context,
        query,
        ner_enabled,
    )
    .await
    {
        Ok(score) => score,
        Err(err) => {
            tracing::error!("Confidence scoring failed: {}", err);
            0.0
        }
    }
}

async fn compute(
    registry: &Arc<ModelRegistry>,
    profile: ModelProfile,
    abstractive: &str,
    extractive: &str,
    context: &str,
    query: &str,
    ner_enabled: bool,
) -> Result<f64, ApiError> {
    if abstractive.trim().is_empty()
        || extractive.trim().is_empty()
        || context.trim().is_empty()
        || query.trim().is_empty()
    {
        tracing::warn!("Empty input to confidence scoring");
        return Ok(0.0);
    }

    let length_score = (abstractive.split_whitespace().count() as f64 / 50.0).min(1.0);

    // One batched embedding call for all four texts.
    let texts = vec![
        query.to_string(),
        abstractive.to_string(),
        extractive.to_string(),
        context.to_string(),
    ];
    let embedder = registry.embedder(profile).await?;
    let embeddings = embedder.embed(&texts).await?;
    if embeddings.len() != 4 {
        return Err(ApiError::Internal(format!(
            "Expected 4 embeddings, got {}",
            embeddings.len()
        )));
    }

    let query_sim_abstractive = cosine_similarity(&embeddings[0], &embeddings[1])? as f64;
    let query_sim_extractive = cosine_similarity(&embeddings[0], &embeddings[2])? as f64;
    let answer_sim_context = cosine_similarity(&embeddings[1], &embeddings[3])? as f64;
    let coherence = cosine_similarity(&embeddings[1], &embeddings[2])? as f64;

    let readability = subjectivity(abstractive);
    let ner_score = if ner_enabled {
        named_entity_score(abstractive)
    } else {
        NER_UNAVAILABLE_SCORE
    };

    let combined = (length_score * WEIGHT_LENGTH
        + query_sim_abstractive * WEIGHT_QUERY_SIM_ABSTRACTIVE
        + query_sim_extractive * WEIGHT_QUERY_SIM_EXTRACTIVE
        + answer_sim_context * WEIGHT_ANSWER_SIM_CONTEXT
        + coherence * WEIGHT_COHERENCE
        + readability * WEIGHT_READABILITY
        + ner_score * WEIGHT_NER)
        * 100.0;

    let final_score = ((combined * 100.0).round() / 100.0).clamp(0.0, 100.0);
    tracing::debug!(
        "Confidence signals: length {:.2}, qa {:.2}, qe {:.2}, ac {:.2}, coh {:.2}, read {:.2}, ner {:.2} -> {:.2}",
        length_score,
        query_sim_abstractive,
        query_sim_extractive,
        answer_sim_context,
        coherence,
        readability,
        ner_score,
        final_score
    );
    Ok(final_score)
}

const SUBJECTIVE_WORDS: &[&str] = &[
    "amazing", "awful", "bad", "beautiful", "believe", "best", "better", "clearly", "definitely",
    "excellent", "fantastic", "feel", "good", "great", "hope", "horrible", "ideal", "important",
    "impressive", "interesting", "likely", "love", "maybe", "nice", "obviously", "opinion",
    "perhaps", "poor", "popular", "probably", "remarkable", "seems", "should", "significant",
    "surprising", "terrible", "think", "unfortunately", "useful", "wonderful", "worst", "worth",
];

/// Opinion-style heuristic in [0, 1]: the share of subjective vocabulary,
/// scaled so a lightly opinionated sentence lands mid-range.
pub(crate) fn subjectivity(text: &str) -> f64 {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect();
    if words.is_empty() {
        return 0.0;
    }

    let hits = words
        .iter()
        .filter(|word| SUBJECTIVE_WORDS.contains(&word.as_str()))
        .count();
    (hits as f64 * 5.0 / words.len() as f64).min(1.0)
}

/// min(entityCount / 10, 1), where entities are approximated as
/// mid-sentence capitalized tokens and standalone numbers.
fn named_entity_score(text: &str) -> f64 {
    match count_named_entities(text) {
        Some(count) => (count as f64 / 10.0).min(1.0),
        None => NER_UNAVAILABLE_SCORE,
    }
}

fn count_named_entities(text: &str) -> Option<usize> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let mut count = 0usize;
    let mut sentence_start = true;
    for token in tokens {
        let stripped = token.trim_matches(|c: char| !c.is_alphanumeric());
        if stripped.is_empty() {
            continue;
        }

        let capitalized = stripped
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false);
        let numeric = stripped.chars().all(|c| c.is_ascii_digit());

        if numeric || (capitalized && !sentence_start) {
            count += 1;
        }

        sentence_start = token.ends_with(['.', '!', '?']);
    }

    Some(count)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::core::errors::ApiError;
    use crate::models::{Classifier, Embedder, Generator, ModelFactory, ModelRole, SpanExtractor};

    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(vec![vec![1.0, 0.0]; inputs.len()])
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Err(ApiError::Internal("embedding offline".to_string()))
        }
    }

    struct Factory {
        fail_embeddings: bool,
    }

    #[async_trait]
    impl ModelFactory for Factory {
        async fn generator(
            &self,
            _: ModelRole,
            _: ModelProfile,
        ) -> Result<Arc<dyn Generator>, ApiError> {
            Err(ApiError::Internal("unused".to_string()))
        }

        async fn embedder(&self, _: ModelProfile) -> Result<Arc<dyn Embedder>, ApiError> {
            if self.fail_embeddings {
                Ok(Arc::new(FailingEmbedder))
            } else {
                Ok(Arc::new(ConstantEmbedder))
            }
        }

        async fn classifier(
            &self,
            _: ModelRole,
            _: ModelProfile,
        ) -> Result<Arc<dyn Classifier>, ApiError> {
            Err(ApiError::Internal("unused".to_string()))
        }

        async fn span_extractor(
            &self,
            _: ModelProfile,
        ) -> Result<Arc<dyn SpanExtractor>, ApiError> {
            Err(ApiError::Internal("unused".to_string()))
        }
    }

    fn registry(fail_embeddings: bool) -> Arc<ModelRegistry> {
        Arc::new(ModelRegistry::new(Arc::new(Factory { fail_embeddings })))
    }

    #[tokio::test]
    async fn empty_input_scores_exactly_zero() {
        let registry = registry(false);
        let score = score(
            &registry,
            ModelProfile::Power,
            "",
            "extract",
            "context",
            "query",
            true,
        )
        .await;
        assert_eq!(score, 0.0);
    }

    #[tokio::test]
    async fn healthy_inputs_score_within_bounds() {
        let registry = registry(false);
        let value = score(
            &registry,
            ModelProfile::Power,
            "Machine learning is a field of study that lets systems learn from data.",
            "field of study",
            "Machine learning grew out of pattern recognition research.",
            "what is machine learning",
            true,
        )
        .await;
        assert!(value > 0.0);
        assert!(value <= 100.0);
    }

    #[tokio::test]
    async fn embedding_failure_scores_zero() {
        let registry = registry(true);
        let value = score(
            &registry,
            ModelProfile::Power,
            "answer",
            "extract",
            "context",
            "query",
            true,
        )
        .await;
        assert_eq!(value, 0.0);
    }

    #[test]
    fn subjectivity_separates_opinion_from_fact() {
        let opinionated = subjectivity("I believe this is probably the best and most amazing idea.");
        let neutral = subjectivity("The capital of France is Paris.");
        assert!(opinionated > neutral);
        assert!(opinionated <= 1.0);
        assert_eq!(subjectivity(""), 0.0);
    }

    #[test]
    fn entity_count_reflects_names_and_numbers() {
        let some = count_named_entities("The answer involves Alan Turing and 1950 in England.")
            .expect("tokens present");
        assert!(some >= 3);

        assert!(count_named_entities("").is_none());
    }

    #[test]
    fn entity_score_uses_midpoint_when_unavailable() {
        assert_eq!(named_entity_score(""), NER_UNAVAILABLE_SCORE);
    }
}
