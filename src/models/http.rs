//! Model runner family speaking OpenAI-compatible HTTP.
//!
//! Generation and embedding use the standard `/v1/chat/completions` and
//! `/v1/embeddings` endpoints; classification logits and extractive answer
//! spans come from the runner's `/v1/classifications` and `/v1/answer-spans`
//! extensions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::ApiError;

use super::provider::{Classifier, Embedder, Generator, ModelFactory, SpanExtractor};
use super::types::{GenerateParams, ModelProfile, ModelRole, SpanAnswer};

const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

pub struct HttpModelFactory {
    base_url: String,
    client: Client,
    config: Value,
}

impl HttpModelFactory {
    pub fn new(config: &Value) -> Result<Self, ApiError> {
        let base_url = config
            .get("models")
            .and_then(|v| v.get("runner_url"))
            .and_then(|v| v.as_str())
            .unwrap_or("http://127.0.0.1:8088")
            .trim_end_matches('/')
            .to_string();

        let timeout_secs = config
            .get("models")
            .and_then(|v| v.get("call_timeout_secs"))
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_CALL_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url,
            client,
            config: config.clone(),
        })
    }

    fn model_id(&self, role: ModelRole, profile: ModelProfile) -> String {
        let configured = self
            .config
            .get("models")
            .and_then(|v| v.get(role.key()))
            .and_then(|v| v.get(profile.as_str()))
            .and_then(|v| v.as_str());

        if let Some(id) = configured {
            return id.to_string();
        }

        default_model_id(role, profile).to_string()
    }
}

fn default_model_id(role: ModelRole, profile: ModelProfile) -> &'static str {
    match (role, profile) {
        (ModelRole::Seq2Seq, ModelProfile::Power) => "flan-t5-large",
        (ModelRole::Seq2Seq, ModelProfile::Performance) => "flan-t5-small",
        (ModelRole::QaExtractive, ModelProfile::Power) => "roberta-base-squad2",
        (ModelRole::QaExtractive, ModelProfile::Performance) => "distilroberta-base",
        (ModelRole::Embedding, ModelProfile::Power) => "paraphrase-mpnet-base-v2",
        (ModelRole::Embedding, ModelProfile::Performance) => "paraphrase-minilm-l6-v2",
        (ModelRole::Classification, _) => "prompt-guard-86m",
        (ModelRole::Sentiment, ModelProfile::Power) => "bart-large-mnli",
        (ModelRole::Sentiment, ModelProfile::Performance) => "distilbert-sst2",
    }
}

#[async_trait]
impl ModelFactory for HttpModelFactory {
    async fn generator(
        &self,
        role: ModelRole,
        profile: ModelProfile,
    ) -> Result<Arc<dyn Generator>, ApiError> {
        Ok(Arc::new(HttpGenerator {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            model_id: self.model_id(role, profile),
        }))
    }

    async fn embedder(&self, profile: ModelProfile) -> Result<Arc<dyn Embedder>, ApiError> {
        Ok(Arc::new(HttpEmbedder {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            model_id: self.model_id(ModelRole::Embedding, profile),
        }))
    }

    async fn classifier(
        &self,
        role: ModelRole,
        profile: ModelProfile,
    ) -> Result<Arc<dyn Classifier>, ApiError> {
        Ok(Arc::new(HttpClassifier {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            model_id: self.model_id(role, profile),
        }))
    }

    async fn span_extractor(
        &self,
        profile: ModelProfile,
    ) -> Result<Arc<dyn SpanExtractor>, ApiError> {
        Ok(Arc::new(HttpSpanExtractor {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            model_id: self.model_id(ModelRole::QaExtractive, profile),
        }))
    }
}

struct HttpGenerator {
    base_url: String,
    client: Client,
    model_id: String,
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str, params: &GenerateParams) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = json!({
            "model": self.model_id,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "top_k": params.top_k,
            "max_tokens": params.max_tokens,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Generation call failed: {}",
                text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }
}

struct HttpEmbedder {
    base_url: String,
    client: Client,
    model_id: String,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": self.model_id,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Embedding call failed: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;

        let mut embeddings = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for item in data {
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        Ok(embeddings)
    }
}

struct HttpClassifier {
    base_url: String,
    client: Client,
    model_id: String,
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let url = format!("{}/v1/classifications", self.base_url);

        let body = json!({
            "model": self.model_id,
            "input": text,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Classification call failed: {}",
                text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let logits: Vec<f32> = payload["logits"]
            .as_array()
            .map(|vals| {
                vals.iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect()
            })
            .unwrap_or_default();

        if logits.is_empty() {
            return Err(ApiError::Internal(
                "Classification response contained no logits".to_string(),
            ));
        }

        Ok(logits)
    }
}

struct HttpSpanExtractor {
    base_url: String,
    client: Client,
    model_id: String,
}

#[async_trait]
impl SpanExtractor for HttpSpanExtractor {
    async fn extract_span(&self, question: &str, context: &str) -> Result<SpanAnswer, ApiError> {
        let url = format!("{}/v1/answer-spans", self.base_url);

        let body = json!({
            "model": self.model_id,
            "question": question,
            "context": context,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Span extraction call failed: {}",
                text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let start = payload["start"].as_u64().unwrap_or(0) as usize;
        // The end index must leave at least one token in the span.
        let end = (payload["end"].as_u64().unwrap_or(0) as usize).max(start + 1);
        let text = payload["text"].as_str().unwrap_or_default().to_string();

        Ok(SpanAnswer { text, start, end })
    }
}
