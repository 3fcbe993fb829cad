//! Direct-reply agent for conversational queries.
//!
//! Used for greetings and small talk. Never touches a tool.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::prompt::build_reply_prompt;
use super::provider::LlmProvider;
use super::traits::{Agent, AgentResponse};
use crate::error::AgentError;

/// Agent that answers a message directly, without retrieval or search.
pub struct ResponderAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ResponderAgent {
    /// Creates a new responder with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.answer_max_tokens,
            system_prompt,
        }
    }

    /// Replies politely to the raw user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the completion fails or is empty.
    pub async fn reply(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
    ) -> Result<AgentResponse, AgentError> {
        self.execute(provider, &build_reply_prompt(query)).await
    }
}

#[async_trait]
impl Agent for ResponderAgent {
    fn name(&self) -> &'static str {
        "responder"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.5
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
