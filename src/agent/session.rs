//! Per-conversation session state.
//!
//! A session is built once by [`bootstrap`](super::bootstrap::bootstrap)
//! and never mutated. It either carries every capability the dispatcher
//! needs or the configuration error that prevented it.

use std::sync::Arc;

use super::provider::LlmProvider;
use crate::error::ConfigError;
use crate::tools::ToolAdapter;

/// Greeting shown when a session is ready.
pub const READY_MESSAGE: &str = "Nexus Online: I am ready. Select a starter question below!";

/// A suggested first message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Starter {
    /// Short label.
    pub label: &'static str,
    /// Message sent when the starter is picked.
    pub message: &'static str,
}

/// Starter prompts, one per route.
pub const STARTERS: [Starter; 3] = [
    Starter {
        label: "Internal Policy",
        message: "What are the reporting requirements for telework?",
    },
    Starter {
        label: "Live Web Search",
        message: "What is the current stock price of Apple?",
    },
    Starter {
        label: "General Chat",
        message: "Hello! Who are you?",
    },
];

/// Collaborators available to a ready session.
#[derive(Clone)]
pub struct Capabilities {
    /// Language-model provider.
    pub provider: Arc<dyn LlmProvider>,
    /// Policy retrieval, absent when no index was found.
    pub retrieval: Option<Arc<dyn ToolAdapter>>,
    /// Web search.
    pub search: Arc<dyn ToolAdapter>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("provider", &self.provider.name())
            .field("retrieval", &self.retrieval.as_ref().map(|r| r.name()))
            .field("search", &self.search.name())
            .finish()
    }
}

/// Session state.
#[derive(Debug, Clone)]
pub enum Session {
    /// Ready to answer.
    Ready(Capabilities),
    /// Bootstrap failed; every query gets a diagnostic answer.
    Failed(ConfigError),
}

impl Session {
    /// Returns `true` if the session can answer queries.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Capabilities of a ready session.
    #[must_use]
    pub const fn capabilities(&self) -> Option<&Capabilities> {
        match self {
            Self::Ready(caps) => Some(caps),
            Self::Failed(_) => None,
        }
    }

    /// Bootstrap error of a failed session.
    #[must_use]
    pub const fn failure(&self) -> Option<&ConfigError> {
        match self {
            Self::Ready(_) => None,
            Self::Failed(err) => Some(err),
        }
    }

    /// Returns `true` if policy retrieval is available.
    #[must_use]
    pub fn has_retrieval(&self) -> bool {
        self.capabilities().is_some_and(|c| c.retrieval.is_some())
    }

    /// Opening message for a conversation.
    #[must_use]
    pub fn greeting(&self) -> String {
        match self {
            Self::Ready(_) => READY_MESSAGE.to_string(),
            Self::Failed(err) => diagnostic(err),
        }
    }
}

/// Fixed answer for queries against a failed session.
#[must_use]
pub fn diagnostic(err: &ConfigError) -> String {
    format!("Nexus is offline: {err}. Fix the configuration and start a new session.")
}
