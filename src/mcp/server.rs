//! MCP server implementation for policy-nexus.
//!
//! Bootstraps one session at startup and shares it, read-only, across all
//! tool calls and HTTP sessions.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde_json::json;

use crate::agent::answer::Stage;
use crate::agent::bootstrap::bootstrap;
use crate::agent::config::AgentConfig;
use crate::agent::orchestrator::Orchestrator;
use crate::agent::session::{Session, diagnostic};
use crate::transport::NullTransport;

use super::params::{AskParams, ClassifyParams};

/// policy-nexus MCP server.
#[derive(Clone)]
pub struct NexusMcpServer {
    tool_router: ToolRouter<Self>,
    session: Arc<Session>,
    orchestrator: Arc<Orchestrator>,
}

#[tool_router]
impl NexusMcpServer {
    /// Answer a question through the intent router.
    #[tool(
        name = "ask",
        description = "Answer a workplace question. The question is classified as INTERNAL (answered from the organization's policy documents), EXTERNAL (live web search, summarized with cited sources), or CHAT (direct reply). Returns JSON with the answer text, route, intent, sources, and token usage."
    )]
    async fn ask(
        &self,
        Parameters(params): Parameters<AskParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.query.trim().is_empty() {
            return Err(McpError::invalid_params("query cannot be empty", None));
        }

        let answer = self
            .orchestrator
            .handle(&params.query, &self.session, &NullTransport::default())
            .await;

        if answer.failure == Some(Stage::Session) {
            return Ok(CallToolResult::error(vec![Content::text(answer.text)]));
        }

        let json = serde_json::to_string_pretty(&answer)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Classify a question without answering it.
    #[tool(
        name = "classify",
        description = "Classify a question as INTERNAL, EXTERNAL, or CHAT without answering it. Unrecognized model output falls back to EXTERNAL. Returns JSON with the intent, whether the label matched, and the raw model reply."
    )]
    async fn classify(
        &self,
        Parameters(params): Parameters<ClassifyParams>,
    ) -> Result<CallToolResult, McpError> {
        let caps = match self.session.as_ref() {
            Session::Ready(caps) => caps,
            Session::Failed(err) => {
                return Ok(CallToolResult::error(vec![Content::text(diagnostic(err))]));
            }
        };

        let classification = self
            .orchestrator
            .classify(caps.provider.as_ref(), &params.query)
            .await
            .map_err(|e| McpError::internal_error(format!("Classification failed: {e}"), None))?;

        let json = json!({
            "intent": classification.intent,
            "matched": classification.matched,
            "raw": classification.raw.trim(),
            "total_tokens": classification.usage.total_tokens,
        });

        Ok(CallToolResult::success(vec![Content::text(json.to_string())]))
    }
}

#[tool_handler]
impl ServerHandler for NexusMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "policy-nexus".to_string(),
                title: Some("policy-nexus MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "policy-nexus: answers workplace questions from internal policy documents, \
                 live web search, or a direct reply. Use `ask` for answers and `classify` to \
                 see how a question would be routed."
                    .to_string(),
            ),
        }
    }
}

impl NexusMcpServer {
    /// Creates a server, bootstrapping its session from `config`.
    ///
    /// A failed bootstrap still yields a server; its tools then return
    /// the configuration diagnostic.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        Self::with_session(bootstrap(config), Orchestrator::new(config))
    }

    /// Creates a server around an existing session and orchestrator.
    #[must_use]
    pub fn with_session(session: Session, orchestrator: Orchestrator) -> Self {
        Self {
            tool_router: Self::tool_router(),
            session: Arc::new(session),
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// The shared session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }
}
