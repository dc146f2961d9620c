//! Page fetching and plain-text extraction.
//!
//! Extraction prefers the `main`/`article` content region and falls back to
//! the whole body, skipping script, style, nav, header, footer and aside
//! elements. The cleaned text keeps word characters and basic punctuation
//! only; URLs and email addresses are stripped before sentence splitting.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::context::split_sentences;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, Default)]
pub struct ScrapedPage {
    pub url: String,
    pub text: String,
    pub sentences: Vec<String>,
}

impl ScrapedPage {
    pub fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub content_type: String,
    pub body: String,
}

/// Raw page retrieval, separated from extraction so tests can serve canned
/// HTML and count outbound requests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ApiError>;
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ApiError> {
        let response = self.client.get(url).send().await.map_err(ApiError::internal)?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Fetch failed for {}: {}",
                url,
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await.map_err(ApiError::internal)?;
        Ok(FetchedPage { content_type, body })
    }
}

/// Builds a `ScrapedPage` from fetched HTML. Non-HTML content and empty
/// extractions yield an empty page.
pub fn page_from_fetched(url: &str, fetched: &FetchedPage) -> ScrapedPage {
    if !fetched.content_type.to_lowercase().contains("text/html") {
        tracing::warn!(
            "Unexpected content type for {}: {}",
            url,
            fetched.content_type
        );
        return ScrapedPage::empty(url);
    }

    let raw_text = extract_page_text(&fetched.body);
    let text = clean_text(&raw_text);
    if text.is_empty() {
        tracing::warn!("No text content extracted from {}", url);
        return ScrapedPage::empty(url);
    }

    let sentences = split_sentences(&text);
    ScrapedPage {
        url: url.to_string(),
        text,
        sentences,
    }
}

const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "iframe", "svg",
];

/// Extracts visible text, preferring main/article paragraphs.
pub fn extract_page_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let region_selector =
        Selector::parse("main, article").expect("static selector is valid");
    let paragraph_selector = Selector::parse("p").expect("static selector is valid");
    let body_selector = Selector::parse("body").expect("static selector is valid");

    if let Some(region) = document.select(&region_selector).next() {
        let paragraphs: Vec<String> = region
            .select(&paragraph_selector)
            .map(|p| p.text().collect::<Vec<_>>().join(" "))
            .filter(|text| !text.trim().is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join(" ");
        }
    }

    let mut parts = Vec::new();
    if let Some(body) = document.select(&body_selector).next() {
        collect_visible_text(body, &mut parts);
    }
    parts.join(" ")
}

fn collect_visible_text(element: ElementRef, parts: &mut Vec<String>) {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_visible_text(child_element, parts);
                }
            }
            _ => {}
        }
    }
}

static URL_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static NON_WORD_RE: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

pub fn clean_text(text: &str) -> String {
    let url_re = URL_RE.get_or_init(|| Regex::new(r"https?://\S+").expect("valid regex"));
    let email_re = EMAIL_RE.get_or_init(|| Regex::new(r"\S+@\S+").expect("valid regex"));
    let non_word_re =
        NON_WORD_RE.get_or_init(|| Regex::new(r"[^\w\s.,!?-]").expect("valid regex"));
    let whitespace_re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

    let text = url_re.replace_all(text, "");
    let text = email_re.replace_all(&text, "");
    let text = non_word_re.replace_all(&text, "");
    let text = whitespace_re.replace_all(&text, " ");
    text.trim().to_string()
}
