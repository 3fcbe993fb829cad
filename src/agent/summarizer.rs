//! Web-search summarizer agent.
//!
//! Turns raw search snippets into a cited answer to the original
//! question. The snippets are never shown to the user as-is.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::prompt::build_summary_prompt;
use super::provider::LlmProvider;
use super::traits::{Agent, AgentResponse};
use crate::error::AgentError;

/// Agent that answers a question from supplied search results.
pub struct SummarizerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl SummarizerAgent {
    /// Creates a new summarizer with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.answer_max_tokens,
            system_prompt,
        }
    }

    /// Summarizes `search_results` into an answer for `query`.
    ///
    /// Makes exactly one completion call whose prompt embeds both.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the completion fails or is empty.
    pub async fn summarize(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        search_results: &str,
    ) -> Result<AgentResponse, AgentError> {
        self.execute(provider, &build_summary_prompt(query, search_results))
            .await
    }
}

#[async_trait]
impl Agent for SummarizerAgent {
    fn name(&self) -> &'static str {
        "summarizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
