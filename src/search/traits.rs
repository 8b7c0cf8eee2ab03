//! Web-search provider interface.

use crate::error::SearchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One ranked search hit. Order within a result set is the provider's
/// relevance order and must be preserved downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A web-search backend.
///
/// A successful call may legitimately return zero results; only transport or
/// provider failures map to [`SearchError::Unavailable`].
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a search, returning up to `max_results` hits in provider ranking
    /// order. `max_results` must be at least 1.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;

    /// Provider name for logging and trace output.
    fn name(&self) -> &str;
}
