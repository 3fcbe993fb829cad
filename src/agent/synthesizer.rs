//! Synthesizer agent for grounded retrieval answers.
//!
//! Takes the top-ranked policy excerpts from the vector index and
//! produces an answer that stays inside them.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::traits::Agent;

/// Agent that synthesizes retrieved excerpts into a final answer.
///
/// Receives the nearest-neighbour excerpts for a question and writes a
/// response grounded only in them.
pub struct SynthesizerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates a new synthesizer agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.answer_max_tokens,
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
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
