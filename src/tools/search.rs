//! Web search over the Tavily HTTP API.

use std::fmt::Write;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ToolAdapter, ToolResult};
use crate::agent::config::AgentConfig;
use crate::error::ToolError;

/// Search depth sent with every request.
const SEARCH_DEPTH: &str = "basic";

/// Snippet text returned when the provider finds nothing.
pub const NO_RESULTS: &str = "No search results were returned.";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// One search hit.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Extracted snippet.
    #[serde(default)]
    pub content: String,
    /// Provider relevance score.
    #[serde(default)]
    pub score: Option<f32>,
}

/// Tavily search adapter.
pub struct SearchAdapter {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl SearchAdapter {
    /// Creates the adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Search`] if the HTTP client cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ToolError::Search {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
            })?;

        Ok(Self {
            client,
            api_key: config.search_api_key.clone(),
            endpoint: format!("{}/search", config.search_base_url.trim_end_matches('/')),
        })
    }

    /// Request URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Formats hits as the numbered snippet list handed to the summarizer.
    #[must_use]
    pub fn format_hits(hits: &[SearchHit]) -> String {
        if hits.is_empty() {
            return NO_RESULTS.to_string();
        }

        let mut out = String::new();
        for (i, hit) in hits.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let title = if hit.title.trim().is_empty() {
                "(untitled)"
            } else {
                hit.title.trim()
            };
            let _ = writeln!(out, "[{}] {title}\nURL: {}\n{}", i + 1, hit.url, hit.content.trim());
        }
        out
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>, ToolError> {
        let body = SearchRequest {
            query: text,
            max_results: limit,
            search_depth: SEARCH_DEPTH,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Search {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ToolError::Search {
                message: format!("{status}: {}", detail.trim()),
                status: Some(status.as_u16()),
            });
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| ToolError::Search {
            message: format!("invalid response body: {e}"),
            status: Some(status.as_u16()),
        })?;

        let mut hits = parsed.results;
        hits.truncate(limit);
        Ok(hits)
    }
}

impl std::fmt::Debug for SearchAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchAdapter")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolAdapter for SearchAdapter {
    fn name(&self) -> &'static str {
        "web_search"
    }

    async fn query(&self, text: &str, limit: usize) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let hits = self.search(text, limit).await?;

        debug!(
            hits = hits.len(),
            max_results = limit,
            elapsed_ms = start.elapsed().as_millis(),
            "web search complete"
        );

        Ok(ToolResult {
            content: Self::format_hits(&hits),
            sources: hits.into_iter().map(|h| h.url).collect(),
            total_tokens: 0,
        })
    }
}
