//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default LLM provider.
const DEFAULT_PROVIDER: &str = "groq";
/// Default answer model.
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
/// Default web-search endpoint.
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://api.tavily.com";
/// Default directory holding the vector index.
pub const DEFAULT_INDEX_PATH: &str = "./nexus_data";
/// Default index collection.
const DEFAULT_COLLECTION: &str = "policy_docs";
/// Default embedding model (must match the one used at ingestion).
pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-small-en-v1.5";
/// Number of chunks retrieved per internal query.
pub const DEFAULT_RETRIEVAL_TOP_K: usize = 3;
/// Number of web results requested per external query.
pub const DEFAULT_SEARCH_MAX_RESULTS: usize = 3;
/// The router only needs a single word back.
const DEFAULT_ROUTER_MAX_TOKENS: u32 = 16;
/// Default max tokens for answers (chat, summary, synthesis).
const DEFAULT_ANSWER_MAX_TOKENS: u32 = 1024;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variables consulted for the LLM key, in order.
pub const LLM_KEY_VARS: [&str; 2] = ["GROQ_API_KEY", "NEXUS_API_KEY"];
/// Environment variable holding the web-search key.
pub const SEARCH_KEY_VAR: &str = "TAVILY_API_KEY";

/// Configuration for a conversation session and its agents.
#[derive(Clone)]
pub struct AgentConfig {
    /// LLM provider name (`"groq"` or `"openai"`).
    pub provider: String,
    /// API key for the LLM provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model used for answers: direct replies, summaries, grounded synthesis.
    pub model: String,
    /// Model used for intent classification.
    pub router_model: String,
    /// Maximum tokens for the classification completion.
    pub router_max_tokens: u32,
    /// Maximum tokens for answer completions.
    pub answer_max_tokens: u32,
    /// API key for the web-search provider.
    pub search_api_key: String,
    /// Web-search endpoint base URL.
    pub search_base_url: String,
    /// Maximum web results per external query.
    pub search_max_results: usize,
    /// Directory (or file) holding the vector index.
    pub index_path: PathBuf,
    /// Index collection to query.
    pub collection: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Chunks retrieved per internal query.
    pub retrieval_top_k: usize,
    /// Request timeout applied to every collaborator HTTP client.
    pub timeout: Duration,
    /// Directory containing prompt template files.
    ///
    /// When set, prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing
    /// files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if a key is not found.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env().build()
    }

    /// Checks credentials and limits.
    ///
    /// Credentials are checked first, LLM key before search key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if either API key is
    /// missing or blank, and [`ConfigError::InvalidValue`] if a limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                name: LLM_KEY_VARS[0],
            });
        }
        if self.search_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                name: SEARCH_KEY_VAR,
            });
        }
        if self.retrieval_top_k == 0 {
            return Err(ConfigError::InvalidValue {
                name: "retrieval_top_k",
                value: "0".to_string(),
            });
        }
        if self.search_max_results == 0 {
            return Err(ConfigError::InvalidValue {
                name: "search_max_results",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("provider", &self.provider)
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("router_model", &self.router_model)
            .field("search_api_key", &mask_secret(&self.search_api_key))
            .field("search_base_url", &self.search_base_url)
            .field("search_max_results", &self.search_max_results)
            .field("index_path", &self.index_path)
            .field("collection", &self.collection)
            .field("embedding_model", &self.embedding_model)
            .field("retrieval_top_k", &self.retrieval_top_k)
            .field("timeout", &self.timeout)
            .field("prompt_dir", &self.prompt_dir)
            .finish_non_exhaustive()
    }
}

/// Masks a secret down to its first five characters.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(5).collect();
    format!("{prefix}...")
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    router_model: Option<String>,
    router_max_tokens: Option<u32>,
    answer_max_tokens: Option<u32>,
    search_api_key: Option<String>,
    search_base_url: Option<String>,
    search_max_results: Option<usize>,
    index_path: Option<PathBuf>,
    collection: Option<String>,
    embedding_model: Option<String>,
    retrieval_top_k: Option<usize>,
    timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
}

/// Reads a non-empty environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = env_var("NEXUS_PROVIDER");
        }
        if self.api_key.is_none() {
            self.api_key = LLM_KEY_VARS.iter().find_map(|name| env_var(name));
        }
        if self.base_url.is_none() {
            self.base_url = env_var("NEXUS_BASE_URL");
        }
        if self.model.is_none() {
            self.model = env_var("NEXUS_MODEL");
        }
        if self.router_model.is_none() {
            self.router_model = env_var("NEXUS_ROUTER_MODEL");
        }
        if self.search_api_key.is_none() {
            self.search_api_key = env_var(SEARCH_KEY_VAR);
        }
        if self.search_base_url.is_none() {
            self.search_base_url = env_var("TAVILY_BASE_URL");
        }
        if self.search_max_results.is_none() {
            self.search_max_results = env_var("NEXUS_MAX_RESULTS").and_then(|v| v.parse().ok());
        }
        if self.index_path.is_none() {
            self.index_path = env_var("NEXUS_INDEX_PATH").map(PathBuf::from);
        }
        if self.collection.is_none() {
            self.collection = env_var("NEXUS_COLLECTION");
        }
        if self.embedding_model.is_none() {
            self.embedding_model = env_var("NEXUS_EMBEDDING_MODEL");
        }
        if self.retrieval_top_k.is_none() {
            self.retrieval_top_k = env_var("NEXUS_TOP_K").and_then(|v| v.parse().ok());
        }
        if self.timeout.is_none() {
            self.timeout = env_var("NEXUS_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env_var("NEXUS_PROMPT_DIR").map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the LLM API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the LLM base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the answer model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the classification model.
    #[must_use]
    pub fn router_model(mut self, model: impl Into<String>) -> Self {
        self.router_model = Some(model.into());
        self
    }

    /// Sets max tokens for the classification completion.
    #[must_use]
    pub const fn router_max_tokens(mut self, n: u32) -> Self {
        self.router_max_tokens = Some(n);
        self
    }

    /// Sets max tokens for answer completions.
    #[must_use]
    pub const fn answer_max_tokens(mut self, n: u32) -> Self {
        self.answer_max_tokens = Some(n);
        self
    }

    /// Sets the web-search API key.
    #[must_use]
    pub fn search_api_key(mut self, key: impl Into<String>) -> Self {
        self.search_api_key = Some(key.into());
        self
    }

    /// Sets the web-search endpoint base URL.
    #[must_use]
    pub fn search_base_url(mut self, url: impl Into<String>) -> Self {
        self.search_base_url = Some(url.into());
        self
    }

    /// Sets the maximum web results per query.
    #[must_use]
    pub const fn search_max_results(mut self, n: usize) -> Self {
        self.search_max_results = Some(n);
        self
    }

    /// Sets the vector index location.
    #[must_use]
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Sets the index collection.
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Sets the embedding model name.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Sets the number of chunks retrieved per internal query.
    #[must_use]
    pub const fn retrieval_top_k(mut self, k: usize) -> Self {
        self.retrieval_top_k = Some(k);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`], validating it.
    ///
    /// # Errors
    ///
    /// See [`AgentConfig::validate`].
    pub fn build(self) -> Result<AgentConfig, ConfigError> {
        let config = self.resolve();
        config.validate()?;
        Ok(config)
    }

    /// Resolves defaults without validating.
    ///
    /// Missing credentials become empty strings; [`AgentConfig::validate`]
    /// reports them. Bootstrap relies on this to record a failed session
    /// instead of aborting.
    #[must_use]
    pub fn resolve(self) -> AgentConfig {
        let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        AgentConfig {
            provider: self
                .provider
                .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            api_key: self.api_key.unwrap_or_default(),
            base_url: self.base_url,
            router_model: self.router_model.unwrap_or_else(|| model.clone()),
            model,
            router_max_tokens: self
                .router_max_tokens
                .unwrap_or(DEFAULT_ROUTER_MAX_TOKENS),
            answer_max_tokens: self
                .answer_max_tokens
                .unwrap_or(DEFAULT_ANSWER_MAX_TOKENS),
            search_api_key: self.search_api_key.unwrap_or_default(),
            search_base_url: self
                .search_base_url
                .unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string()),
            search_max_results: self
                .search_max_results
                .unwrap_or(DEFAULT_SEARCH_MAX_RESULTS),
            index_path: self
                .index_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH)),
            collection: self
                .collection
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            embedding_model: self
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            retrieval_top_k: self.retrieval_top_k.unwrap_or(DEFAULT_RETRIEVAL_TOP_K),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
        }
    }
}
