//! Error types for policy-nexus.
//!
//! Each layer has its own error enum; [`Error`] unifies them for the CLI
//! and other outer surfaces. Only [`ConfigError`] is fatal to a session:
//! everything else is caught by the dispatcher and turned into an answer.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Session bootstrap or configuration failure.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Language-model provider failure.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// Tool adapter failure.
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    /// Vector index failure.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// CLI command failure.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while resolving configuration or bootstrapping a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required credential is not set.
    #[error("missing credential: {name} is not set (add it to your environment or .env file)")]
    MissingCredential {
        /// Environment variable that should hold the credential.
        name: &'static str,
    },

    /// A configuration value could not be used.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Setting name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// The language or embedding model could not be constructed.
    #[error("model initialization failed: {message}")]
    ModelInit {
        /// Underlying failure.
        message: String,
    },

    /// A tool adapter could not be constructed.
    #[error("tool initialization failed: {message}")]
    ToolInit {
        /// Underlying failure.
        message: String,
    },
}

/// Errors from the language-model provider and agents.
#[derive(Error, Debug)]
pub enum AgentError {
    /// No API key was configured for the provider.
    #[error("API key missing: set GROQ_API_KEY or NEXUS_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is unknown.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// The completion request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The provider returned no usable content.
    #[error("empty completion from model {model}")]
    EmptyResponse {
        /// Model that produced the empty completion.
        model: String,
    },

    /// The completion could not be parsed.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// Raw completion text.
        content: String,
    },
}

/// Errors from tool adapters (retrieval and web search).
#[derive(Error, Debug)]
pub enum ToolError {
    /// The web-search provider failed.
    #[error("web search failed: {message}")]
    Search {
        /// Provider or transport message.
        message: String,
        /// HTTP status, when the provider answered.
        status: Option<u16>,
    },

    /// The vector index lookup failed.
    #[error("document retrieval failed: {0}")]
    Retrieval(#[from] IndexError),

    /// The grounded answer could not be synthesized.
    #[error("answer synthesis failed: {0}")]
    Synthesis(#[from] AgentError),
}

/// Errors from the vector index and embedder.
#[derive(Error, Debug)]
pub enum IndexError {
    /// `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The index file does not exist.
    #[error("index not found at {}", path.display())]
    NotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The index content is not in the expected format.
    #[error("corrupt index: {message}")]
    Corrupt {
        /// What was wrong.
        message: String,
    },

    /// A vector has a different dimension than the index.
    #[error("embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension recorded in the index.
        expected: usize,
        /// Dimension received.
        actual: usize,
    },

    /// The embedding model failed.
    #[error("embedding failed: {message}")]
    Embedding {
        /// Underlying failure.
        message: String,
    },
}

/// Errors from the UI transport. Always advisory.
#[derive(Error, Debug)]
#[error("transport error: {message}")]
pub struct TransportError {
    /// What went wrong.
    pub message: String,
}

/// CLI command errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The command could not complete.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be formatted.
    #[error("output format error: {0}")]
    OutputFormat(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}
