//! Grounded retrieval over the local policy index.
//!
//! A query is embedded on the blocking pool, matched against the
//! in-memory index, and the top excerpts are handed to the synthesizer agent, whose answer is
//! returned as the tool result.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use super::{ToolAdapter, ToolResult};
use crate::agent::prompt::{ExcerptContext, build_synthesis_prompt};
use crate::agent::provider::LlmProvider;
use crate::agent::synthesizer::SynthesizerAgent;
use crate::agent::traits::Agent;
use crate::error::{IndexError, ToolError};
use crate::index::{Embedder, VectorIndex};

/// Answer returned when the index holds nothing for the query.
pub const NO_EXCERPTS: &str =
    "The policy documents do not contain any passages relevant to this question.";

/// Retrieval adapter backed by a [`VectorIndex`].
pub struct RetrievalAdapter {
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    provider: Arc<dyn LlmProvider>,
    synthesizer: SynthesizerAgent,
}

impl RetrievalAdapter {
    /// Assembles the adapter from an opened index and its collaborators.
    #[must_use]
    pub fn new(
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        provider: Arc<dyn LlmProvider>,
        synthesizer: SynthesizerAgent,
    ) -> Self {
        Self {
            index,
            embedder,
            provider,
            synthesizer,
        }
    }

    /// The loaded index.
    #[must_use]
    pub const fn index(&self) -> &VectorIndex {
        &self.index
    }
}

impl std::fmt::Debug for RetrievalAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalAdapter")
            .field("index", &self.index.path())
            .field("chunks", &self.index.len())
            .field("embedder", &self.embedder.model_name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolAdapter for RetrievalAdapter {
    fn name(&self) -> &'static str {
        "policy_retrieval"
    }

    async fn query(&self, text: &str, limit: usize) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let embedder = Arc::clone(&self.embedder);
        let owned = text.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&owned))
            .await
            .map_err(|e| IndexError::Embedding {
                message: format!("embedding task failed: {e}"),
            })??;
        let hits = self.index.similarity_query(&vector, limit)?;

        debug!(
            hits = hits.len(),
            top_k = limit,
            best_score = hits.first().map(|h| h.score),
            elapsed_ms = start.elapsed().as_millis(),
            "index lookup complete"
        );

        if hits.is_empty() {
            return Ok(ToolResult::text(NO_EXCERPTS));
        }

        let excerpts: Vec<ExcerptContext<'_>> = hits
            .iter()
            .map(|h| ExcerptContext {
                source: h.source.as_deref(),
                score: h.score,
                content: &h.content,
            })
            .collect();
        let prompt = build_synthesis_prompt(text, &excerpts);

        let response = self
            .synthesizer
            .execute(self.provider.as_ref(), &prompt)
            .await?;

        let mut sources: Vec<String> = Vec::new();
        for source in hits.iter().filter_map(|h| h.source.clone()) {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        Ok(ToolResult {
            content: response.content,
            sources,
            total_tokens: response.usage.total_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::config::AgentConfig;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::agent::prompt::SYNTHESIZER_SYSTEM_PROMPT;
    use crate::error::AgentError;
    use crate::index::test_support::write_index;
    use crate::index::{HashEmbedder, INDEX_FILE};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CapturingProvider {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for CapturingProvider {
        fn name(&self) -> &'static str {
            "capture"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(request.last_user_content().unwrap_or_default().to_string());
            }
            Ok(ChatResponse {
                content: "Teleworkers report hours weekly.".to_string(),
                usage: TokenUsage {
                    prompt_tokens: 40,
                    completion_tokens: 6,
                    total_tokens: 46,
                },
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    fn adapter(dir: &TempDir, provider: Arc<CapturingProvider>) -> RetrievalAdapter {
        let embedder = HashEmbedder::new(256);
        let rows: Vec<(&str, &str, Vec<f32>)> = [
            ("telework.pdf", "Telework reporting requirements: report hours weekly."),
            ("telework.pdf", "Telework agreements are renewed annually."),
            ("leave.pdf", "Annual leave accrues monthly."),
            ("cafeteria.pdf", "Cafeteria breakfast served daily."),
        ]
        .into_iter()
        .map(|(s, c)| (s, c, embedder.embed(c).unwrap_or_default()))
        .collect();

        let db = dir.path().join(INDEX_FILE);
        write_index(&db, 256, &rows);
        let index = VectorIndex::open(&db, "policy_docs").unwrap_or_else(|_| unreachable!());

        let config = AgentConfig::builder()
            .api_key("k")
            .search_api_key("k")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let synthesizer = SynthesizerAgent::new(&config, SYNTHESIZER_SYSTEM_PROMPT.to_string());
        RetrievalAdapter::new(index, Arc::new(embedder), provider, synthesizer)
    }

    #[tokio::test]
    async fn test_query_grounds_answer_in_top_excerpts() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let provider = Arc::new(CapturingProvider::default());
        let adapter = adapter(&dir, Arc::clone(&provider));

        let result = adapter
            .query("What are the reporting requirements for telework?", 2)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(result.content, "Teleworkers report hours weekly.");
        assert_eq!(result.sources, vec!["telework.pdf"]);
        assert_eq!(result.total_tokens, 46);

        let prompts = provider.prompts.lock().map(|p| p.clone()).unwrap_or_default();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Telework reporting requirements"));
        assert!(prompts[0].contains("What are the reporting requirements for telework?"));
        assert!(!prompts[0].contains("cafeteria"));
    }

    #[tokio::test]
    async fn test_empty_collection_skips_model() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let db = dir.path().join(INDEX_FILE);
        write_index(&db, 64, &[]);
        let index = VectorIndex::open(&db, "policy_docs").unwrap_or_else(|_| unreachable!());
        let config = AgentConfig::builder()
            .api_key("k")
            .search_api_key("k")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = Arc::new(CapturingProvider::default());
        let adapter = RetrievalAdapter::new(
            index,
            Arc::new(HashEmbedder::new(64)),
            Arc::clone(&provider) as Arc<dyn LlmProvider>,
            SynthesizerAgent::new(&config, String::new()),
        );

        let result = adapter.query("anything", 3).await.unwrap_or_else(|_| unreachable!());
        assert_eq!(result.content, NO_EXCERPTS);
        assert!(provider.prompts.lock().map(|p| p.is_empty()).unwrap_or(false));
    }

    struct ThreadRecordingEmbedder {
        inner: HashEmbedder,
        threads: Mutex<Vec<std::thread::ThreadId>>,
    }

    impl Embedder for ThreadRecordingEmbedder {
        fn model_name(&self) -> &str {
            self.inner.model_name()
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
            if let Ok(mut threads) = self.threads.lock() {
                threads.push(std::thread::current().id());
            }
            self.inner.embed(text)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_embedding_runs_off_the_runtime_thread() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let db = dir.path().join(INDEX_FILE);
        write_index(&db, 16, &[]);
        let index = VectorIndex::open(&db, "policy_docs").unwrap_or_else(|_| unreachable!());
        let config = AgentConfig::builder()
            .api_key("k")
            .search_api_key("k")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let embedder = Arc::new(ThreadRecordingEmbedder {
            inner: HashEmbedder::new(16),
            threads: Mutex::new(Vec::new()),
        });
        let adapter = RetrievalAdapter::new(
            index,
            Arc::clone(&embedder) as Arc<dyn Embedder>,
            Arc::new(CapturingProvider::default()),
            SynthesizerAgent::new(&config, String::new()),
        );

        let (a, b) = tokio::join!(adapter.query("telework", 3), adapter.query("leave", 3));
        assert!(a.is_ok() && b.is_ok());

        let runtime_thread = std::thread::current().id();
        let threads = embedder.threads.lock().map(|t| t.clone()).unwrap_or_default();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|id| *id != runtime_thread));
    }
}
