//! Intent classification.
//!
//! The router asks the model for a one-word label and parses it strictly:
//! anything that is not exactly one of the known labels (after trimming
//! whitespace, quotes, and punctuation) maps to [`Intent::FALLBACK`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::AgentConfig;
use super::message::TokenUsage;
use super::prompt::build_router_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::error::AgentError;

/// Classification of a user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    /// Answerable from the internal policy documents.
    Internal,
    /// Needs outside knowledge: live web search.
    External,
    /// Greeting or small talk: direct reply, no tools.
    Chat,
}

impl Intent {
    /// Intent used when the model's reply is not a known label, or when
    /// classification fails outright. Attempting a live search is safer
    /// than answering from the wrong documents or skipping tools.
    pub const FALLBACK: Self = Self::External;

    /// All labels, in the order they are presented to the model.
    pub const ALL: [Self; 3] = [Self::Internal, Self::External, Self::Chat];

    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "INTERNAL",
            Self::External => "EXTERNAL",
            Self::Chat => "CHAT",
        }
    }

    /// Parses a completion strictly.
    ///
    /// Surrounding whitespace, quotes, periods, and markdown emphasis are
    /// ignored and case is folded; the remainder must equal a label.
    /// Returns `None` for anything else.
    #[must_use]
    pub fn parse_label(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_uppercase();

        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == normalized)
    }

    /// Parses a completion, applying [`Intent::FALLBACK`] on no match.
    #[must_use]
    pub fn from_completion(raw: &str) -> Self {
        Self::parse_label(raw).unwrap_or(Self::FALLBACK)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or_else(|| AgentError::ResponseParse {
            message: "not an intent label".to_string(),
            content: s.to_string(),
        })
    }
}

/// Outcome of one classification call.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Resolved intent.
    pub intent: Intent,
    /// Raw completion text.
    pub raw: String,
    /// `false` when the completion matched no label and the fallback was used.
    pub matched: bool,
    /// Token usage of the classification call.
    pub usage: TokenUsage,
}

/// Agent that classifies a query into an [`Intent`].
pub struct RouterAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl RouterAgent {
    /// Creates a new router agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.router_model.clone(),
            max_tokens: config.router_max_tokens,
            system_prompt,
        }
    }

    /// Classifies a query with a single completion call.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the completion call fails. No retry is
    /// attempted; the caller decides how to degrade.
    pub async fn classify(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
    ) -> Result<Classification, AgentError> {
        let response = self.execute(provider, &build_router_prompt(query)).await?;
        let parsed = Intent::parse_label(&response.content);

        debug!(
            raw = response.content.trim(),
            matched = parsed.is_some(),
            "router completion parsed"
        );

        Ok(Classification {
            intent: parsed.unwrap_or(Intent::FALLBACK),
            raw: response.content,
            matched: parsed.is_some(),
            usage: response.usage,
        })
    }
}

#[async_trait]
impl Agent for RouterAgent {
    fn name(&self) -> &'static str {
        "router"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.0
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
