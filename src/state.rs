use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};
use thiserror::Error;

use crate::cache::{QueryCache, UsageLog};
use crate::core::config::{
    AppPaths, ChunkSettings, ConfigService, PipelineSettings, RetrievalSettings, SafetySettings,
    SearchCredentials,
};
use crate::models::http::HttpModelFactory;
use crate::models::{ModelProfile, ModelRegistry};
use crate::pipeline::AnswerPipeline;
use crate::retrieval::{GoogleSearchProvider, HttpPageFetcher, Retriever};
use crate::safety::SafetyGate;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("model runner error: {0}")]
    Models(String),
    #[error("retrieval setup error: {0}")]
    Retrieval(String),
}

/// Global application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub pipeline: Arc<AnswerPipeline>,
    pub usage: Arc<UsageLog>,
}

impl AppState {
    /// Wires configuration, the model registry, the retriever and the
    /// cache layer into one pipeline.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let config_value = config
            .load_config()
            .map_err(|e| InitializationError::Config(e.to_string()))?;

        let retrieval_settings = RetrievalSettings::from_config(&config_value);
        let chunk_settings = ChunkSettings::from_config(&config_value);
        let safety_settings = SafetySettings::from_config(&config_value);
        let pipeline_settings = PipelineSettings::from_config(&config_value);
        let credentials = SearchCredentials::from_config(&config_value);
        if !credentials.is_configured() {
            tracing::warn!(
                "Search API key or engine id missing; queries will degrade to offline mode"
            );
        }

        let factory = HttpModelFactory::new(&config_value)
            .map_err(|e| InitializationError::Models(e.to_string()))?;
        let registry = Arc::new(ModelRegistry::new(Arc::new(factory)));

        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(retrieval_settings.requests_per_second.max(1))
                .unwrap_or(NonZeroU32::MIN),
        )));

        let search_client = reqwest::Client::new();
        let search = Arc::new(GoogleSearchProvider::new(search_client, credentials));
        let fetcher = Arc::new(
            HttpPageFetcher::new(
                retrieval_settings.page_timeout_secs,
                &retrieval_settings.user_agent,
            )
            .map_err(|e| InitializationError::Retrieval(e.to_string()))?,
        );
        let retriever = Arc::new(Retriever::new(
            search,
            fetcher,
            registry.clone(),
            limiter,
            retrieval_settings,
            chunk_settings,
        ));

        let safety = Arc::new(SafetyGate::new(
            registry.clone(),
            ModelProfile::Power,
            safety_settings,
        ));

        let cache = Arc::new(QueryCache::new(paths.query_cache_path.clone()));
        let usage = Arc::new(UsageLog::new(
            paths.history_path.clone(),
            paths.feedback_path.clone(),
        ));

        let pipeline = Arc::new(AnswerPipeline::new(
            safety,
            retriever,
            registry,
            cache,
            usage.clone(),
            pipeline_settings,
        ));

        Ok(Arc::new(AppState {
            paths,
            config,
            pipeline,
            usage,
        }))
    }
}
