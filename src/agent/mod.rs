//! Intent routing and answer generation for policy-nexus.
//!
//! Every user message is classified by a language model and dispatched
//! to exactly one strategy. Uses a pluggable provider abstraction backed
//! by OpenAI-compatible APIs (Groq by default).
//!
//! # Architecture
//!
//! ```text
//! User query → Orchestrator
//!   ├── RouterAgent (INTERNAL | EXTERNAL | CHAT)
//!   ├── INTERNAL → RetrievalAdapter → SynthesizerAgent → answer
//!   ├── EXTERNAL → SearchAdapter → SummarizerAgent → answer
//!   └── CHAT     → ResponderAgent → answer
//! ```
//!
//! Sessions are created by [`bootstrap`] and shared read-only.

pub mod answer;
pub mod bootstrap;
pub mod client;
pub mod config;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod responder;
pub mod router;
pub mod session;
pub mod summarizer;
pub mod synthesizer;
pub mod traits;

// Re-export key types
pub use answer::{Answer, QueryState, Route, Stage, resolve_route};
pub use bootstrap::{bootstrap, build_capabilities};
pub use config::AgentConfig;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::Orchestrator;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use responder::ResponderAgent;
pub use router::{Classification, Intent, RouterAgent};
pub use session::{Capabilities, READY_MESSAGE, STARTERS, Session, Starter};
pub use summarizer::SummarizerAgent;
pub use synthesizer::SynthesizerAgent;
pub use traits::{Agent, AgentResponse};
