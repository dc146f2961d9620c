use serde_json::Value;

/// Knobs for the search/scrape stage.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Number of search results requested per query.
    pub num_results: usize,
    /// Per-page fetch timeout in seconds.
    pub page_timeout_secs: u64,
    /// Token-bucket refill rate shared by all outbound requests.
    pub requests_per_second: u32,
    /// TTL for cached raw search responses.
    pub search_cache_ttl_secs: u64,
    pub search_cache_capacity: u64,
    /// Bounded LRU for scraped pages.
    pub page_cache_capacity: u64,
    pub user_agent: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            num_results: 5,
            page_timeout_secs: 30,
            requests_per_second: 10,
            search_cache_ttl_secs: 3600,
            search_cache_capacity: 100,
            page_cache_capacity: 500,
            user_agent: format!("lyra-backend/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RetrievalSettings {
    pub fn from_config(config: &Value) -> Self {
        let mut settings = Self::default();
        let section = config.get("retrieval");

        if let Some(v) = lookup_u64(section, "num_results") {
            settings.num_results = v as usize;
        }
        if let Some(v) = lookup_u64(section, "page_timeout_secs") {
            settings.page_timeout_secs = v;
        }
        if let Some(v) = lookup_u64(section, "requests_per_second") {
            settings.requests_per_second = v.max(1) as u32;
        }
        if let Some(v) = lookup_u64(section, "search_cache_ttl_secs") {
            settings.search_cache_ttl_secs = v;
        }
        if let Some(v) = lookup_u64(section, "search_cache_capacity") {
            settings.search_cache_capacity = v;
        }
        if let Some(v) = lookup_u64(section, "page_cache_capacity") {
            settings.page_cache_capacity = v;
        }

        settings
    }
}

/// Knobs for chunking, preprocessing and per-source summarization.
#[derive(Debug, Clone)]
pub struct ChunkSettings {
    /// Word budget per chunk.
    pub chunk_size: usize,
    /// Chunks under this word count are discarded.
    pub min_chunk_threshold: usize,
    /// Chunks under this character count are merged forward.
    pub min_chunk_length: usize,
    /// Chunks under this word count skip summarization entirely.
    pub summarize_word_floor: usize,
    /// Word budget when a summary degrades to plain truncation.
    pub summary_budget: usize,
    /// Chunks kept per source after ranking.
    pub top_chunks_per_source: usize,
    /// Chunks kept in the final cross-source ranking.
    pub top_chunks_final: usize,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            min_chunk_threshold: 10,
            min_chunk_length: 100,
            summarize_word_floor: 50,
            summary_budget: 150,
            top_chunks_per_source: 3,
            top_chunks_final: 5,
        }
    }
}

impl ChunkSettings {
    pub fn from_config(config: &Value) -> Self {
        let mut settings = Self::default();
        let section = config.get("chunking");

        if let Some(v) = lookup_u64(section, "chunk_size") {
            settings.chunk_size = v as usize;
        }
        if let Some(v) = lookup_u64(section, "min_chunk_threshold") {
            settings.min_chunk_threshold = v as usize;
        }
        if let Some(v) = lookup_u64(section, "min_chunk_length") {
            settings.min_chunk_length = v as usize;
        }
        if let Some(v) = lookup_u64(section, "summary_budget") {
            settings.summary_budget = v as usize;
        }

        settings
    }
}

/// Knobs for the safety gate.
///
/// The class-index mapping depends on the classifier's output layout and is
/// deliberately configuration, not a hard-coded assumption.
#[derive(Debug, Clone)]
pub struct SafetySettings {
    pub temperature: f32,
    pub jailbreak_threshold: f64,
    pub indirect_threshold: f64,
    pub jailbreak_index: usize,
    pub indirect_index: usize,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            jailbreak_threshold: 0.5,
            indirect_threshold: 0.5,
            jailbreak_index: 2,
            indirect_index: 0,
        }
    }
}

impl SafetySettings {
    pub fn from_config(config: &Value) -> Self {
        let mut settings = Self::default();
        let section = config.get("safety");

        if let Some(v) = lookup_f64(section, "temperature") {
            settings.temperature = v as f32;
        }
        if let Some(v) = lookup_f64(section, "jailbreak_threshold") {
            settings.jailbreak_threshold = v;
        }
        if let Some(v) = lookup_f64(section, "indirect_threshold") {
            settings.indirect_threshold = v;
        }
        if let Some(v) = lookup_u64(section, "jailbreak_index") {
            settings.jailbreak_index = v as usize;
        }
        if let Some(v) = lookup_u64(section, "indirect_index") {
            settings.indirect_index = v as usize;
        }

        settings
    }
}

/// Controller-level policy.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Downgrade to offline mode when the search API itself fails.
    pub offline_on_search_failure: bool,
    /// Compute the named-entity signal during confidence scoring.
    pub ner_enabled: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            offline_on_search_failure: true,
            ner_enabled: true,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Value) -> Self {
        let mut settings = Self::default();
        let section = config.get("pipeline");

        if let Some(v) = lookup_bool(section, "offline_on_search_failure") {
            settings.offline_on_search_failure = v;
        }
        if let Some(v) = lookup_bool(section, "ner_enabled") {
            settings.ner_enabled = v;
        }

        settings
    }
}

/// Credentials for the search provider, usually supplied via secrets.yaml.
#[derive(Debug, Clone, Default)]
pub struct SearchCredentials {
    pub api_key: String,
    pub engine_id: String,
}

impl SearchCredentials {
    pub fn from_config(config: &Value) -> Self {
        let section = config.get("search");
        Self {
            api_key: lookup_str(section, "api_key").unwrap_or_default(),
            engine_id: lookup_str(section, "engine_id").unwrap_or_default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.engine_id.is_empty()
    }
}

fn lookup_u64(section: Option<&Value>, key: &str) -> Option<u64> {
    section.and_then(|v| v.get(key)).and_then(|v| v.as_u64())
}

fn lookup_f64(section: Option<&Value>, key: &str) -> Option<f64> {
    section.and_then(|v| v.get(key)).and_then(|v| v.as_f64())
}

fn lookup_bool(section: Option<&Value>, key: &str) -> Option<bool> {
    section.and_then(|v| v.get(key)).and_then(|v| v.as_bool())
}

fn lookup_str(section: Option<&Value>, key: &str) -> Option<String> {
    section
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_budgets() {
        let chunking = ChunkSettings::default();
        assert_eq!(chunking.chunk_size, 1024);
        assert_eq!(chunking.min_chunk_threshold, 10);
        assert_eq!(chunking.min_chunk_length, 100);

        let retrieval = RetrievalSettings::default();
        assert_eq!(retrieval.requests_per_second, 10);
        assert_eq!(retrieval.search_cache_ttl_secs, 3600);
    }

    #[test]
    fn config_values_override_defaults() {
        let config = json!({
            "retrieval": { "num_results": 8, "requests_per_second": 3 },
            "safety": { "jailbreak_threshold": 0.7, "jailbreak_index": 1 },
            "search": { "api_key": "k", "engine_id": "cx" }
        });

        let retrieval = RetrievalSettings::from_config(&config);
        assert_eq!(retrieval.num_results, 8);
        assert_eq!(retrieval.requests_per_second, 3);

        let safety = SafetySettings::from_config(&config);
        assert_eq!(safety.jailbreak_threshold, 0.7);
        assert_eq!(safety.jailbreak_index, 1);

        let creds = SearchCredentials::from_config(&config);
        assert!(creds.is_configured());
    }
}
