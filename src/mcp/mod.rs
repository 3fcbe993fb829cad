//! MCP (Model Context Protocol) server for policy-nexus.
//!
//! Exposes the dispatcher as MCP tools so other agents can ask policy
//! questions through the same routing as the CLI.
//!
//! # Feature Gate
//!
//! This module requires the `mcp` feature flag:
//! ```toml
//! [dependencies]
//! policy-nexus = { version = "...", features = ["mcp"] }
//! ```
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!   ↓ ask(query)
//! NexusMcpServer (shared Session + Orchestrator)
//!   ↓
//! Orchestrator::handle()
//!   ├── RouterAgent
//!   └── retrieval | web search | direct reply
//!   ↓
//! Answer JSON → MCP Client
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::{AskParams, ClassifyParams};
pub use server::NexusMcpServer;
pub use transport::{serve_http, serve_stdio};
