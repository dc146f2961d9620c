use std::sync::Arc;

use async_trait::async_trait;

use crate::core::errors::ApiError;

use super::types::{GenerateParams, ModelProfile, ModelRole, SpanAnswer};

/// Sequence-to-sequence text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerateParams) -> Result<String, ApiError>;
}

/// Batch text embedding. One call embeds the whole list.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}

/// Sequence classification returning raw logits, one per class.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Vec<f32>, ApiError>;
}

/// Span prediction over (question, context) for extractive answers.
#[async_trait]
pub trait SpanExtractor: Send + Sync {
    async fn extract_span(&self, question: &str, context: &str) -> Result<SpanAnswer, ApiError>;
}

/// Constructs concrete capability handles for a (role, profile) pair.
///
/// The registry calls into this exactly once per key; implementations do
/// not need their own caching.
#[async_trait]
pub trait ModelFactory: Send + Sync {
    async fn generator(
        &self,
        role: ModelRole,
        profile: ModelProfile,
    ) -> Result<Arc<dyn Generator>, ApiError>;

    async fn embedder(&self, profile: ModelProfile) -> Result<Arc<dyn Embedder>, ApiError>;

    async fn classifier(
        &self,
        role: ModelRole,
        profile: ModelProfile,
    ) -> Result<Arc<dyn Classifier>, ApiError>;

    async fn span_extractor(
        &self,
        profile: ModelProfile,
    ) -> Result<Arc<dyn SpanExtractor>, ApiError>;
}
