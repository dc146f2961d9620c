//! The controller sequencing safety gate, cache, retrieval, generation and
//! scoring into one answer per query.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::answer::{self, AnswerMode, GenerationInput};
use crate::cache::{QueryCache, UsageLog};
use crate::core::config::PipelineSettings;
use crate::core::errors::PipelineError;
use crate::models::{ModelProfile, ModelRegistry};
use crate::retrieval::{ProcessedContext, Retriever};
use crate::safety::SafetyGate;

/// The envelope returned to every front end and persisted to the query
/// cache. Built once per query and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub extractive_answer: String,
    pub abstractive_answer: String,
    pub summary: String,
    pub context_summary: String,
    pub sentiment_score: f64,
    pub confidence_score: f64,
    pub follow_up_questions: Vec<String>,
    pub sources: Vec<String>,
    pub processing_time: f64,
}

pub struct AnswerPipeline {
    safety: Arc<SafetyGate>,
    retriever: Arc<Retriever>,
    registry: Arc<ModelRegistry>,
    cache: Arc<QueryCache>,
    usage: Arc<UsageLog>,
    settings: PipelineSettings,
}

impl AnswerPipeline {
    pub fn new(
        safety: Arc<SafetyGate>,
        retriever: Arc<Retriever>,
        registry: Arc<ModelRegistry>,
        cache: Arc<QueryCache>,
        usage: Arc<UsageLog>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            safety,
            retriever,
            registry,
            cache,
            usage,
            settings,
        }
    }

    /// Answers one query end to end.
    ///
    /// Order: safety gate, cache lookup, history append, retrieval (skipped
    /// in offline mode), strategy dispatch, envelope assembly, cache write.
    /// A total search failure downgrades the mode to offline rather than
    /// failing the query; only "both primary and fallback generation
    /// failed" is terminal.
    pub async fn answer(
        &self,
        query: &str,
        mode: AnswerMode,
        profile: ModelProfile,
    ) -> Result<PipelineResult, PipelineError> {
        let started = Instant::now();
        tracing::info!("Processing query in {:?} mode", mode);

        let verdict = self.safety.check(query).await;
        if !verdict.is_safe {
            return Err(PipelineError::UnsafeQuery {
                jailbreak_score: verdict.jailbreak_score,
                indirect_score: verdict.indirect_score,
            });
        }

        if let Some(cached) = self.cache.get(query).await {
            tracing::info!("Serving cached result");
            return Ok(cached);
        }

        self.usage.append_query(query).await;

        let mut mode = mode;
        let mut retrieval = ProcessedContext::default();
        if mode != AnswerMode::Offline {
            match self
                .retriever
                .search(query, self.retriever.settings().num_results)
                .await
            {
                Ok(results) => {
                    retrieval = self
                        .retriever
                        .process_all_results(&results, query, profile)
                        .await;
                }
                Err(err) if self.settings.offline_on_search_failure => {
                    tracing::warn!("Search failed, downgrading to offline mode: {}", err);
                    mode = AnswerMode::Offline;
                }
                Err(err) => return Err(PipelineError::SearchFailed(err.to_string())),
            }
        }

        let input = GenerationInput {
            query,
            raw_context: &retrieval.raw_context,
            processed_context: &retrieval.processed_context,
        };
        let draft = answer::generate(&self.registry, profile, mode, input, &self.settings).await?;

        let sources = if mode == AnswerMode::Offline {
            Vec::new()
        } else {
            retrieval.sources
        };

        let result = PipelineResult {
            extractive_answer: draft.extractive_answer,
            abstractive_answer: draft.abstractive_answer,
            summary: draft.summary,
            context_summary: draft.context_summary,
            sentiment_score: draft.sentiment_score,
            confidence_score: draft.confidence_score,
            follow_up_questions: draft.follow_up_questions,
            sources,
            processing_time: started.elapsed().as_secs_f64(),
        };

        self.cache.put(query, &result).await;
        tracing::info!(
            "Answer generated in {:.2}s (confidence {:.1})",
            result.processing_time,
            result.confidence_score
        );
        Ok(result)
    }
}
