//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

// Allow certain patterns that improve readability in CLI output formatting
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::format_push_string)]

use std::io::Write as IoWrite;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::answer::Stage;
use crate::agent::bootstrap::bootstrap;
use crate::agent::client::create_provider;
use crate::agent::config::{AgentConfig, LLM_KEY_VARS, mask_secret};
use crate::agent::message::{ChatRequest, user_message};
use crate::agent::orchestrator::Orchestrator;
use crate::agent::session::{STARTERS, Session, diagnostic};
use crate::cli::output::{
    OutputFormat, StatusReport, format_answer, format_classification, format_status,
};
#[cfg(feature = "mcp")]
use crate::cli::parser::McpCommands;
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, ConfigError, Error, Result};
use crate::index::{self, VectorIndex};
use crate::transport::{ConsoleTransport, NullTransport, Transport};

/// Message sent by `nexus check`.
pub const CHECK_MESSAGE: &str = "Hello! Are you working?";

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute, including when the
/// session cannot be bootstrapped.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Ask { query } => cmd_ask(&resolve_config(cli), query, format),
        Commands::Chat => cmd_chat(&resolve_config(cli), format),
        Commands::Classify { query } => cmd_classify(&resolve_config(cli), query, format),
        Commands::Check => cmd_check(&resolve_config(cli), format),
        Commands::Status => cmd_status(&resolve_config(cli), format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
        #[cfg(feature = "mcp")]
        Commands::Mcp(cmd) => cmd_mcp(&resolve_config(cli), cmd),
    }
}

/// Resolves configuration: CLI flags, then environment, then defaults.
///
/// Credentials are not validated here; bootstrap reports them.
#[must_use]
pub fn resolve_config(cli: &Cli) -> AgentConfig {
    let mut builder = AgentConfig::builder();
    if let Some(path) = &cli.index_path {
        builder = builder.index_path(path);
    }
    if let Some(dir) = &cli.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    builder.from_env().resolve()
}

/// Returns the starter message for a `1`-`3` shortcut.
#[must_use]
pub fn starter_for(input: &str) -> Option<&'static str> {
    let n: usize = input.trim().parse().ok()?;
    STARTERS.get(n.checked_sub(1)?).map(|s| s.message)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn ready_session(config: &AgentConfig) -> Result<Session> {
    let session = bootstrap(config);
    if let Session::Failed(err) = &session {
        return Err(CommandError::ExecutionFailed(diagnostic(err)).into());
    }
    Ok(session)
}

fn cmd_ask(config: &AgentConfig, query: &str, format: OutputFormat) -> Result<String> {
    if query.trim().is_empty() {
        return Err(CommandError::ExecutionFailed("Query cannot be empty".to_string()).into());
    }

    let session = bootstrap(config);
    let orchestrator = Orchestrator::new(config);
    let transport: Box<dyn Transport> = match format {
        OutputFormat::Text => Box::new(ConsoleTransport::new()),
        OutputFormat::Json => Box::new(NullTransport::default()),
    };

    let rt = runtime()?;
    let answer = rt.block_on(orchestrator.handle(query, &session, transport.as_ref()));

    if answer.failure == Some(Stage::Session) {
        return Err(CommandError::ExecutionFailed(answer.text).into());
    }
    format_answer(&answer, format)
}

fn cmd_chat(config: &AgentConfig, format: OutputFormat) -> Result<String> {
    let session = ready_session(config)?;
    let orchestrator = Orchestrator::new(config);
    let transport = ConsoleTransport::new();

    let rt = runtime()?;
    rt.block_on(async {
        let mut out = std::io::stdout();
        writeln!(out, "{}", session.greeting())?;
        for (i, starter) in STARTERS.iter().enumerate() {
            writeln!(out, "  {}. [{}] {}", i + 1, starter.label, starter.message)?;
        }
        writeln!(out, "Type a question, a starter number, or /quit.")?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            write!(out, "\n> ")?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if matches!(input, "/quit" | "/exit") {
                break;
            }

            let query = starter_for(input).unwrap_or(input);
            if query != input {
                writeln!(out, "{query}")?;
            }
            let answer = orchestrator.handle(query, &session, &transport).await;
            write!(out, "\n{}", format_answer(&answer, format)?)?;
        }
        Ok::<(), Error>(())
    })?;

    Ok(String::new())
}

fn cmd_classify(config: &AgentConfig, query: &str, format: OutputFormat) -> Result<String> {
    let session = ready_session(config)?;
    let Some(caps) = session.capabilities() else {
        return Err(CommandError::ExecutionFailed("session is not ready".to_string()).into());
    };
    let orchestrator = Orchestrator::new(config);

    let rt = runtime()?;
    let classification = rt
        .block_on(orchestrator.classify(caps.provider.as_ref(), query))
        .map_err(|e| CommandError::ExecutionFailed(format!("Classification failed: {e}")))?;

    format_classification(&classification, format)
}

fn cmd_check(config: &AgentConfig, format: OutputFormat) -> Result<String> {
    if config.api_key.trim().is_empty() {
        return Err(ConfigError::MissingCredential {
            name: LLM_KEY_VARS[0],
        }
        .into());
    }

    let provider = create_provider(config)
        .map_err(|e| CommandError::ExecutionFailed(format!("Provider creation failed: {e}")))?;
    let request = ChatRequest {
        model: config.model.clone(),
        messages: vec![user_message(CHECK_MESSAGE)],
        temperature: None,
        max_tokens: Some(64),
    };

    let rt = runtime()?;
    let response = rt
        .block_on(provider.chat(&request))
        .map_err(|e| CommandError::ExecutionFailed(format!("Connection failed: {e}")))?;

    match format {
        OutputFormat::Text => Ok(format!(
            "Key:      {}\nProvider: {}\nModel:    {}\nReply:    {}\nConnection OK\n",
            mask_secret(&config.api_key),
            provider.name(),
            config.model,
            response.content.trim()
        )),
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "key": mask_secret(&config.api_key),
            "provider": provider.name(),
            "model": config.model,
            "reply": response.content.trim(),
            "total_tokens": response.usage.total_tokens,
        })),
    }
}

fn cmd_status(config: &AgentConfig, format: OutputFormat) -> Result<String> {
    let masked = |key: &str| (!key.trim().is_empty()).then(|| mask_secret(key));
    let index_file = index::locate(&config.index_path);

    let mut report = StatusReport {
        provider: config.provider.clone(),
        model: config.model.clone(),
        router_model: config.router_model.clone(),
        api_key: masked(&config.api_key),
        search_api_key: masked(&config.search_api_key),
        index_path: config.index_path.display().to_string(),
        index_file: index_file.as_ref().map(|p| p.display().to_string()),
        collection: config.collection.clone(),
        chunks: None,
        embedding_model: config.embedding_model.clone(),
        index_embedding_model: None,
        index_error: None,
        retrieval_top_k: config.retrieval_top_k,
        search_max_results: config.search_max_results,
    };

    if let Some(path) = &index_file {
        match VectorIndex::open(path, &config.collection) {
            Ok(index) => {
                report.chunks = Some(index.len());
                report.index_embedding_model = index.embedding_model().map(String::from);
            }
            Err(e) => report.index_error = Some(e.to_string()),
        }
    }

    format_status(&report, format)
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    use crate::agent::prompt::PromptSet;

    let target_dir = dir
        .map(std::path::PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ))
            } else {
                let mut output = format!(
                    "Wrote {} prompt template(s) to: {}\n",
                    written.len(),
                    target_dir.display()
                );
                for path in &written {
                    output.push_str(&format!(
                        "  {}\n",
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown")
                    ));
                }
                output.push_str("\nEdit these files to customize agent system prompts.\n");
                Ok(output)
            }
        }
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "directory": target_dir.to_string_lossy(),
            "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
            "count": written.len()
        })),
    }
}

/// Starts the MCP server with the specified transport.
///
/// Runs until the client disconnects (stdio) or the server is stopped
/// (HTTP).
#[cfg(feature = "mcp")]
fn cmd_mcp(config: &AgentConfig, cmd: &McpCommands) -> Result<String> {
    use crate::mcp::{NexusMcpServer, serve_http, serve_stdio};

    let server = NexusMcpServer::new(config);

    let rt = runtime()?;
    rt.block_on(async {
        match cmd {
            McpCommands::Stdio => serve_stdio(server).await,
            McpCommands::Serve { host, port } => serve_http(server, host, *port).await,
        }
    })
    .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}
