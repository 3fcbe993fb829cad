//! `OpenAI`-compatible provider implementation using the `async-openai` crate.
//!
//! Serves both Groq (through its `OpenAI`-compatible endpoint) and `OpenAI`
//! itself; any other compatible API works via the base URL override in
//! [`AgentConfig`].

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequest,
};
use async_trait::async_trait;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;

/// Groq's `OpenAI`-compatible API root.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// `OpenAI`-compatible LLM provider.
///
/// Wraps the `async-openai` client for chat completions. The underlying
/// HTTP client carries the configured request timeout.
pub struct OpenAiProvider {
    name: &'static str,
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Creates a provider for the `"openai"` or `"groq"` flavour.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] if the HTTP client cannot be built.
    pub fn new(name: &'static str, config: &AgentConfig) -> Result<Self, AgentError> {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        let base_url = config
            .base_url
            .as_deref()
            .or_else(|| (name == "groq").then_some(GROQ_API_BASE));
        if let Some(base_url) = base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::ApiRequest {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
            })?;

        Ok(Self {
            name,
            client: Client::with_config(openai_config).with_http_client(http),
        })
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: async_openai::types::ChatCompletionRequestSystemMessageContent::Text(
                        msg.content.clone(),
                    ),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: async_openai::types::ChatCompletionRequestUserMessageContent::Text(
                    msg.content.clone(),
                ),
                name: None,
            }),
            Role::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(
                        async_openai::types::ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        ),
                    ),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature.filter(|&t| t != 0.0),
            max_completion_tokens: request.max_tokens,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("name", &self.name)
            .field("client", &"<async-openai::Client>")
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let openai_request = Self::build_request(request);

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(|e| AgentError::ApiRequest {
                message: e.to_string(),
                status: None,
            })?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let finish_reason = choice.and_then(|c| {
            c.finish_reason
                .as_ref()
                .map(|fr| format!("{fr:?}").to_lowercase())
        });

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        Ok(ChatResponse {
            content,
            usage,
            finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message;

    fn config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("gsk_test")
            .search_api_key("tvly_test")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_convert_system_message() {
        let msg = message::system_message("test");
        let converted = OpenAiProvider::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn test_convert_user_message() {
        let msg = message::user_message("hello");
        let converted = OpenAiProvider::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_build_request_drops_zero_temperature() {
        let request = ChatRequest {
            model: "llama-3.3-70b-versatile".to_string(),
            messages: vec![message::user_message("test")],
            temperature: Some(0.0),
            max_tokens: Some(16),
        };
        let built = OpenAiProvider::build_request(&request);
        assert!(built.temperature.is_none());
        assert_eq!(built.max_completion_tokens, Some(16));
        assert_eq!(built.messages.len(), 1);
    }

    #[test]
    fn test_build_request_keeps_temperature() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![message::system_message("s"), message::user_message("u")],
            temperature: Some(0.3),
            max_tokens: None,
        };
        let built = OpenAiProvider::build_request(&request);
        assert_eq!(built.temperature, Some(0.3));
        assert_eq!(built.messages.len(), 2);
    }

    #[test]
    fn test_provider_names() {
        let config = config();
        let groq = OpenAiProvider::new("groq", &config).unwrap_or_else(|_| unreachable!());
        assert_eq!(groq.name(), "groq");
        let openai = OpenAiProvider::new("openai", &config).unwrap_or_else(|_| unreachable!());
        assert_eq!(openai.name(), "openai");
    }
}
