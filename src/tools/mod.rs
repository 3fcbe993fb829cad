//! Tool adapters: uniform query interface over retrieval and web search.
//!
//! The dispatcher sees both strategies through [`ToolAdapter`]; which
//! adapters exist is decided once at bootstrap and recorded in the
//! session.

pub mod retrieval;
pub mod search;

use async_trait::async_trait;
use serde::Serialize;

pub use retrieval::RetrievalAdapter;
pub use search::SearchAdapter;

use crate::error::ToolError;

/// Output of one adapter call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    /// Textual payload: a grounded answer (retrieval) or numbered
    /// snippets (search).
    pub content: String,
    /// Document names or URLs the payload came from.
    pub sources: Vec<String>,
    /// Tokens spent inside the adapter, if it called a model.
    pub total_tokens: u32,
}

impl ToolResult {
    /// Creates a result with no sources.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// A queryable capability.
///
/// Implementations hold only immutable state and may be called
/// concurrently from different sessions.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Adapter name for logging.
    fn name(&self) -> &'static str;

    /// Runs one query returning at most `limit` items of evidence.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if the backing service or index fails.
    async fn query(&self, text: &str, limit: usize) -> Result<ToolResult, ToolError>;
}
