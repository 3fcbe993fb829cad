//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// policy-nexus: routes workplace questions to policy documents, live web
/// search, or a direct reply.
///
/// Credentials are read from the environment or a `.env` file in the
/// working directory (`GROQ_API_KEY`, `TAVILY_API_KEY`).
#[derive(Parser, Debug)]
#[command(name = "nexus")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory (or file) holding the policy index.
    ///
    /// Defaults to `./nexus_data`. Retrieval is disabled when nothing
    /// exists there.
    #[arg(short, long, env = "NEXUS_INDEX_PATH", global = true)]
    pub index_path: Option<PathBuf>,

    /// Directory containing prompt template files.
    #[arg(long, env = "NEXUS_PROMPT_DIR", global = true)]
    pub prompt_dir: Option<PathBuf>,

    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one question.
    ///
    /// Classifies the question, runs exactly one strategy, and prints the
    /// answer followed by a routing footer.
    #[command(after_help = r#"Examples:
  nexus ask "What are the reporting requirements for telework?"
  nexus ask "What is the current stock price of Apple?"
  nexus --format json ask "Hello! Who are you?" | jq .route
"#)]
    Ask {
        /// The question.
        query: String,
    },

    /// Start an interactive conversation.
    ///
    /// Reads one question per line until EOF or `/quit`. Enter 1-3 to send
    /// a starter question.
    Chat,

    /// Classify a question without answering it.
    #[command(after_help = r#"Examples:
  nexus classify "How many vacation days do I get?"   # INTERNAL
  nexus classify "hi there"                           # CHAT
"#)]
    Classify {
        /// The question.
        query: String,
    },

    /// Check connectivity to the language model.
    Check,

    /// Show resolved configuration and index status.
    Status,

    /// Write the default prompt templates for customization.
    #[command(after_help = r#"Examples:
  nexus init-prompts                   # ~/.config/policy-nexus/prompts
  nexus init-prompts --dir ./prompts
"#)]
    InitPrompts {
        /// Target directory (defaults to the user prompt directory).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Start MCP (Model Context Protocol) server.
    #[cfg(feature = "mcp")]
    #[command(subcommand)]
    Mcp(McpCommands),
}

/// MCP server transports.
#[cfg(feature = "mcp")]
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start MCP server with stdio transport.
    ///
    /// Reads JSON-RPC messages from stdin, writes responses to stdout.
    #[command(after_help = r#"Examples:
  nexus mcp stdio
"#)]
    Stdio,

    /// Start MCP server with streamable HTTP transport.
    #[command(after_help = r#"Examples:
  nexus mcp serve                            # Listen on 127.0.0.1:3000
  nexus mcp serve --host 0.0.0.0 --port 8080
"#)]
    Serve {
        /// Host address to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on.
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}
