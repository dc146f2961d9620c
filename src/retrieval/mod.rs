//! Web evidence retrieval: provider search, concurrent scraping and
//! per-source distillation into ranked chunks.

pub mod scrape;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use governor::DefaultDirectRateLimiter;
use moka::sync::Cache;
use sha2::{Digest, Sha256};

use crate::context::{chunk_sentences, preprocess_chunks, rank_chunks, summarize_chunks};
use crate::core::config::{ChunkSettings, RetrievalSettings};
use crate::core::errors::ApiError;
use crate::models::{Embedder, ModelProfile, ModelRegistry};

pub use scrape::{FetchedPage, HttpPageFetcher, PageFetcher, ScrapedPage};
pub use search::{GoogleSearchProvider, SearchProvider, SearchResult};

/// The merged output of one retrieval pass.
#[derive(Debug, Clone, Default)]
pub struct ProcessedContext {
    pub raw_context: String,
    pub processed_context: String,
    pub sources: Vec<String>,
}

pub struct Retriever {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    registry: Arc<ModelRegistry>,
    limiter: Arc<DefaultDirectRateLimiter>,
    search_cache: Cache<String, Vec<SearchResult>>,
    page_cache: Cache<String, ScrapedPage>,
    settings: RetrievalSettings,
    chunking: ChunkSettings,
}

impl Retriever {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        registry: Arc<ModelRegistry>,
        limiter: Arc<DefaultDirectRateLimiter>,
        settings: RetrievalSettings,
        chunking: ChunkSettings,
    ) -> Self {
        let search_cache = Cache::builder()
            .max_capacity(settings.search_cache_capacity)
            .time_to_live(Duration::from_secs(settings.search_cache_ttl_secs))
            .build();
        let page_cache = Cache::builder()
            .max_capacity(settings.page_cache_capacity)
            .build();

        Self {
            search,
            fetcher,
            registry,
            limiter,
            search_cache,
            page_cache,
            settings,
            chunking,
        }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Issues a search request, cached per (query, num_results) for the
    /// cache TTL. Provider errors propagate to the caller unchanged.
    pub async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, ApiError> {
        let key = content_key(&format!("{}\u{1}{}", query, num_results));
        if let Some(hit) = self.search_cache.get(&key) {
            tracing::debug!("Search cache hit for query");
            return Ok(hit);
        }

        self.limiter.until_ready().await;
        let results = self.search.fetch(query, num_results).await?;
        self.search_cache.insert(key, results.clone());
        Ok(results)
    }

    /// Fetches and extracts one page. Failures of any kind come back as an
    /// empty page; the pipeline tolerates partial sources.
    pub async fn scrape(&self, url: &str) -> ScrapedPage {
        let key = content_key(url);
        if let Some(hit) = self.page_cache.get(&key) {
            tracing::debug!("Page cache hit for {}", url);
            return hit;
        }

        self.limiter.until_ready().await;
        let page = match self.fetcher.fetch(url).await {
            Ok(fetched) => scrape::page_from_fetched(url, &fetched),
            Err(err) => {
                tracing::warn!("Scrape failed for {}: {}", url, err);
                ScrapedPage::empty(url)
            }
        };

        if !page.is_empty() {
            self.page_cache.insert(key, page.clone());
        }
        page
    }

    /// Fans out one scrape/chunk/rank task per search result, waits for all
    /// of them, and merges the survivors in the original result order.
    pub async fn process_all_results(
        &self,
        results: &[SearchResult],
        query: &str,
        profile: ModelProfile,
    ) -> ProcessedContext {
        let embedder = match self.registry.embedder(profile).await {
            Ok(embedder) => embedder,
            Err(err) => {
                tracing::error!("Embedding model unavailable, skipping retrieval: {}", err);
                return ProcessedContext::default();
            }
        };

        let tasks = results
            .iter()
            .map(|result| self.process_result(result, query, &embedder));
        let outcomes = join_all(tasks).await;

        let mut raw_parts = Vec::new();
        let mut all_chunks = Vec::new();
        let mut sources = Vec::new();
        for outcome in outcomes {
            if outcome.raw.is_empty() {
                continue;
            }
            raw_parts.push(outcome.raw);
            all_chunks.extend(outcome.chunks);
            if !sources.contains(&outcome.url) {
                sources.push(outcome.url);
            }
        }

        let raw_context = raw_parts.join(" ");

        if all_chunks.is_empty() {
            tracing::warn!("No processed chunks available for final ranking");
            return ProcessedContext {
                raw_context,
                processed_context: String::new(),
                sources,
            };
        }

        let top = self.chunking.top_chunks_final;
        let processed_context = match rank_chunks(&embedder, query, &all_chunks).await {
            Ok(ranked) => ranked
                .into_iter()
                .take(top)
                .map(|chunk| chunk.text)
                .collect::<Vec<_>>()
                .join(" "),
            Err(err) => {
                tracing::warn!("Final chunk ranking failed, keeping source order: {}", err);
                all_chunks
                    .into_iter()
                    .take(top)
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        };

        tracing::info!(
            "Retrieval complete: {} chars raw, {} chars processed, {} sources",
            raw_context.len(),
            processed_context.len(),
            sources.len()
        );

        ProcessedContext {
            raw_context,
            processed_context,
            sources,
        }
    }

    async fn process_result(
        &self,
        result: &SearchResult,
        query: &str,
        embedder: &Arc<dyn Embedder>,
    ) -> SourceOutcome {
        let page = self.scrape(&result.link).await;
        if page.is_empty() {
            return SourceOutcome::empty(&result.link);
        }

        let chunks = chunk_sentences(&page.sentences, &self.chunking);
        let chunks = preprocess_chunks(&chunks, &self.chunking);
        if chunks.is_empty() {
            tracing::warn!("No valid chunks created from {}", result.link);
            return SourceOutcome {
                raw: page.text,
                chunks: Vec::new(),
                url: result.link.clone(),
            };
        }

        let summarized = summarize_chunks(&chunks, &self.chunking);

        match rank_chunks(embedder, query, &summarized).await {
            Ok(ranked) => SourceOutcome {
                raw: page.text,
                chunks: ranked
                    .into_iter()
                    .take(self.chunking.top_chunks_per_source)
                    .map(|chunk| chunk.text)
                    .collect(),
                url: result.link.clone(),
            },
            Err(err) => {
                tracing::warn!("Chunk ranking failed for {}: {}", result.link, err);
                SourceOutcome::empty(&result.link)
            }
        }
    }
}

struct SourceOutcome {
    raw: String,
    chunks: Vec<String>,
    url: String,
}

impl SourceOutcome {
    fn empty(url: &str) -> Self {
        Self {
            raw: String::new(),
            chunks: Vec::new(),
            url: url.to_string(),
        }
    }
}

fn content_key(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
