//! # policy-nexus
//!
//! A conversational assistant for workplace policy questions. Each user
//! message is classified by a language model and dispatched to exactly
//! one strategy:
//!
//! - **INTERNAL**: grounded answer from a local vector index of policy
//!   documents
//! - **EXTERNAL**: live web search (Tavily) summarized with cited sources
//! - **CHAT**: a direct conversational reply
//!
//! ## Example
//!
//! ```no_run
//! use policy_nexus::agent::{AgentConfig, Orchestrator, bootstrap};
//! use policy_nexus::transport::NullTransport;
//!
//! # async fn run() {
//! let config = AgentConfig::builder().from_env().resolve();
//! let session = bootstrap(&config);
//! let orchestrator = Orchestrator::new(&config);
//!
//! let answer = orchestrator
//!     .handle("What are the reporting requirements for telework?", &session, &NullTransport::default())
//!     .await;
//! println!("{} ({:?})", answer.text, answer.route);
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod error;
pub mod index;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod tools;
pub mod transport;

pub use agent::{AgentConfig, Answer, Intent, Orchestrator, Route, Session, bootstrap};
pub use error::{Error, Result};
