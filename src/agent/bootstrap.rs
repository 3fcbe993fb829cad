//! Session bootstrap.
//!
//! Credentials are validated before any client is constructed. Every
//! failure becomes a [`Session::Failed`]; a session is never returned
//! with only some of its capabilities.

use std::sync::Arc;

use tracing::{info, warn};

use super::client::create_provider;
use super::config::AgentConfig;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::session::{Capabilities, Session};
use super::synthesizer::SynthesizerAgent;
use crate::error::ConfigError;
use crate::index::{self, Embedder, HashEmbedder, VectorIndex, create_embedder};
use crate::tools::{RetrievalAdapter, SearchAdapter, ToolAdapter};

/// Builds a session from resolved configuration.
///
/// Never panics or returns an error: a configuration problem is recorded
/// in the returned session.
#[must_use]
pub fn bootstrap(config: &AgentConfig) -> Session {
    match build_capabilities(config) {
        Ok(caps) => {
            info!(
                provider = caps.provider.name(),
                model = %config.model,
                retrieval = caps.retrieval.is_some(),
                "session ready"
            );
            Session::Ready(caps)
        }
        Err(err) => {
            warn!(error = %err, "session bootstrap failed");
            Session::Failed(err)
        }
    }
}

/// Validates configuration and constructs every collaborator.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredential`] or
/// [`ConfigError::InvalidValue`] from validation,
/// [`ConfigError::ModelInit`] if the LLM provider or embedder cannot be
/// created, and [`ConfigError::ToolInit`] if an adapter cannot be built.
pub fn build_capabilities(config: &AgentConfig) -> Result<Capabilities, ConfigError> {
    config.validate()?;

    let provider: Arc<dyn LlmProvider> =
        Arc::from(create_provider(config).map_err(|e| ConfigError::ModelInit {
            message: e.to_string(),
        })?);

    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    let retrieval = open_retrieval(config, &provider, &prompts)?;

    let search: Arc<dyn ToolAdapter> =
        Arc::new(SearchAdapter::new(config).map_err(|e| ConfigError::ToolInit {
            message: e.to_string(),
        })?);

    Ok(Capabilities {
        provider,
        retrieval,
        search,
    })
}

/// Opens the policy index if one exists at the configured path.
///
/// A missing index is not an error: `Ok(None)` disables retrieval.
///
/// # Errors
///
/// Returns [`ConfigError::ToolInit`] if an existing index cannot be read
/// or its vectors do not match the embedder, and
/// [`ConfigError::ModelInit`] if the embedder fails to load. The hash
/// embedder stands in for an unavailable model only when the index is
/// empty or was itself built with `feature-hash` vectors.
pub fn open_retrieval(
    config: &AgentConfig,
    provider: &Arc<dyn LlmProvider>,
    prompts: &PromptSet,
) -> Result<Option<Arc<dyn ToolAdapter>>, ConfigError> {
    let Some(path) = index::locate(&config.index_path) else {
        info!(
            path = %config.index_path.display(),
            "no policy index found, retrieval disabled"
        );
        return Ok(None);
    };

    let index = VectorIndex::open(&path, &config.collection).map_err(|e| ConfigError::ToolInit {
        message: e.to_string(),
    })?;

    let embedder: Arc<dyn Embedder> =
        match create_embedder(&config.embedding_model, index.dimensions()) {
            Ok(embedder) => Arc::from(embedder),
            Err(err)
                if index.is_empty()
                    || index.embedding_model() == Some(HashEmbedder::MODEL_NAME) =>
            {
                warn!(
                    model = %config.embedding_model,
                    error = %err,
                    "embedding model unavailable, using hash embedder"
                );
                Arc::new(HashEmbedder::new(index.dimensions()))
            }
            Err(err) => {
                return Err(ConfigError::ModelInit {
                    message: err.to_string(),
                });
            }
        };

    if !index.is_empty() && embedder.dimensions() != index.dimensions() {
        return Err(ConfigError::ToolInit {
            message: format!(
                "index at {} has {}-dimensional vectors but {} produces {}",
                path.display(),
                index.dimensions(),
                embedder.model_name(),
                embedder.dimensions()
            ),
        });
    }
    if let Some(recorded) = index.embedding_model()
        && recorded != embedder.model_name()
    {
        if !index.is_empty() && embedder.model_name() == HashEmbedder::MODEL_NAME {
            return Err(ConfigError::ToolInit {
                message: format!(
                    "index at {} was built with {recorded}; {} query vectors cannot search it",
                    path.display(),
                    HashEmbedder::MODEL_NAME
                ),
            });
        }
        warn!(
            index_model = recorded,
            query_model = embedder.model_name(),
            "index was built with a different embedding model"
        );
    }

    info!(
        path = %path.display(),
        collection = %config.collection,
        chunks = index.len(),
        "policy index loaded"
    );

    let synthesizer = SynthesizerAgent::new(config, prompts.synthesizer.clone());
    Ok(Some(Arc::new(RetrievalAdapter::new(
        index,
        embedder,
        Arc::clone(provider),
        synthesizer,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::test_support::{write_index, write_index_with_model};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> AgentConfig {
        AgentConfig::builder()
            .api_key("gsk_test")
            .search_api_key("tvly_test")
            .index_path(dir.path())
            .embedding_model("feature-hash")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_missing_credentials_fail_before_construction() {
        let session = bootstrap(&AgentConfig::builder().search_api_key("t").resolve());
        assert_eq!(
            session.failure(),
            Some(&ConfigError::MissingCredential {
                name: "GROQ_API_KEY"
            })
        );
    }

    #[test]
    fn test_unknown_provider_is_model_init_failure() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let mut cfg = config(&dir);
        cfg.provider = "mystery".to_string();
        let session = bootstrap(&cfg);
        assert!(matches!(session.failure(), Some(ConfigError::ModelInit { .. })));
    }

    #[test]
    fn test_absent_index_disables_retrieval() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let session = bootstrap(&config(&dir));
        assert!(session.is_ready());
        assert!(!session.has_retrieval());
    }

    #[test]
    fn test_present_index_enables_retrieval() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        write_index(
            &dir.path().join(index::INDEX_FILE),
            4,
            &[("a.pdf", "text", vec![1.0, 0.0, 0.0, 0.0])],
        );
        let session = bootstrap(&config(&dir));
        assert!(session.has_retrieval());
    }

    #[test]
    fn test_corrupt_index_is_tool_init_failure() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        std::fs::write(dir.path().join(index::INDEX_FILE), b"not a database")
            .unwrap_or_else(|_| unreachable!());
        let session = bootstrap(&config(&dir));
        assert!(matches!(session.failure(), Some(ConfigError::ToolInit { .. })));
    }

    const BGE_SMALL: &str = "BAAI/bge-small-en-v1.5";

    fn bge_index(dir: &TempDir, rows: &[(&str, &str, Vec<f32>)]) {
        write_index_with_model(&dir.path().join(index::INDEX_FILE), 8, BGE_SMALL, rows);
    }

    #[test]
    fn test_unavailable_model_for_real_index_is_model_init_failure() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        bge_index(&dir, &[("a.pdf", "text", vec![0.5; 8])]);
        let mut cfg = config(&dir);
        cfg.embedding_model = "not-a-real-model".to_string();

        let session = bootstrap(&cfg);

        assert!(!session.has_retrieval());
        assert!(matches!(
            session.failure(),
            Some(ConfigError::ModelInit { message }) if message.contains("not-a-real-model")
        ));
    }

    #[test]
    fn test_hash_embedder_cannot_search_real_index() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        bge_index(&dir, &[("a.pdf", "text", vec![0.5; 8])]);

        let session = bootstrap(&config(&dir));

        assert!(matches!(
            session.failure(),
            Some(ConfigError::ToolInit { message }) if message.contains(BGE_SMALL)
        ));
    }

    #[test]
    fn test_hash_index_tolerates_unavailable_model() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        write_index(
            &dir.path().join(index::INDEX_FILE),
            4,
            &[("a.pdf", "text", vec![1.0, 0.0, 0.0, 0.0])],
        );
        let mut cfg = config(&dir);
        cfg.embedding_model = "not-a-real-model".to_string();

        let session = bootstrap(&cfg);

        assert!(session.is_ready());
        assert!(session.has_retrieval());
    }

    #[test]
    fn test_empty_index_tolerates_unavailable_model() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        bge_index(&dir, &[]);
        let mut cfg = config(&dir);
        cfg.embedding_model = "not-a-real-model".to_string();

        let session = bootstrap(&cfg);

        assert!(session.is_ready());
        assert!(session.has_retrieval());
    }
}
