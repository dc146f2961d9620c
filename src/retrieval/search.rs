use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::config::SearchCredentials;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// A search backend returning provider-ranked results.
///
/// Errors propagate to the caller as-is; there is no retry policy here.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn fetch(&self, query: &str, num_results: usize)
        -> Result<Vec<SearchResult>, ApiError>;
}

pub struct GoogleSearchProvider {
    client: Client,
    credentials: SearchCredentials,
}

impl GoogleSearchProvider {
    pub fn new(client: Client, credentials: SearchCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchProvider {
    async fn fetch(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, ApiError> {
        if !self.credentials.is_configured() {
            return Err(ApiError::BadRequest(
                "Search API key or engine id is not configured".to_string(),
            ));
        }

        let url = format!(
            "https://www.googleapis.com/customsearch/v1?key={}&cx={}&q={}&num={}",
            self.credentials.api_key,
            self.credentials.engine_id,
            urlencoding::encode(query),
            num_results
        );

        let response = self.client.get(url).send().await.map_err(ApiError::internal)?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Search request failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        let items = payload
            .get("items")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::new();
        for item in items.iter().take(num_results) {
            let title = item
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let link = item
                .get("link")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let snippet = item
                .get("snippet")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            if !title.is_empty() && !link.is_empty() {
                results.push(SearchResult {
                    title,
                    link,
                    snippet,
                });
            }
        }

        Ok(results)
    }
}
