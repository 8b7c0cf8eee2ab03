//! Tavily search provider.
//!
//! Speaks the Tavily POST `/search` API with Bearer auth. Result ranking is
//! taken as-is from the provider response.

use crate::error::SearchError;
use crate::search::traits::{SearchProvider, SearchResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com/search";

/// Per-request cap. Provider requests can hang indefinitely without an
/// explicit timeout, so the configured value is clamped to a sane range.
fn clamp_timeout_ms(timeout_ms: u64) -> u64 {
    timeout_ms.clamp(1_000, 60_000)
}

pub struct TavilySearchProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    timeout_ms: u64,
}

impl TavilySearchProvider {
    pub fn new(api_key: &str, timeout_ms: u64) -> Self {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT, timeout_ms)
    }

    /// Custom endpoint constructor, used by tests and self-hosted gateways.
    pub fn with_endpoint(api_key: &str, endpoint: &str, timeout_ms: u64) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: api_key.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout_ms: clamp_timeout_ms(timeout_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    title: Option<String>,
    content: Option<String>,
}

fn map_results(parsed: TavilySearchResponse, max_results: usize) -> Vec<SearchResult> {
    parsed
        .results
        .into_iter()
        .take(max_results)
        .map(|r| SearchResult {
            title: r.title.unwrap_or_default(),
            url: r.url,
            snippet: r.content.unwrap_or_default(),
        })
        .collect()
}

#[async_trait]
impl SearchProvider for TavilySearchProvider {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let max_results = max_results.clamp(1, 20);

        let body = serde_json::json!({
            "query": query,
            "max_results": max_results,
            "include_answer": false,
            "include_raw_content": false,
            "search_depth": "basic",
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .json(&body)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| SearchError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Unavailable(format!(
                "tavily search HTTP {status}"
            )));
        }

        let parsed: TavilySearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Unavailable(e.to_string()))?;

        Ok(map_results(parsed, max_results))
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
