//! Intent routing and dispatch.
//!
//! Coordinates one query: classify → pick exactly one strategy → run it
//! → answer. Every path ends in an [`Answer`]; tool and model failures
//! are turned into an answer naming the failed step so the session stays
//! usable.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::answer::{Answer, QueryState, Route, Stage, resolve_route};
use super::config::AgentConfig;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::responder::ResponderAgent;
use super::router::{Classification, Intent, RouterAgent};
use super::session::{Capabilities, Session, diagnostic};
use super::summarizer::SummarizerAgent;
use crate::error::AgentError;
use crate::tools::ToolAdapter;
use crate::transport::{MessageHandle, Transport};

/// Notice shown while the policy documents are consulted.
pub const RETRIEVAL_NOTICE: &str = "Consulting policy documents...";

/// Notice shown while the web is searched.
pub const SEARCH_NOTICE: &str = "Searching the web...";

/// Result of one strategy branch before it is wrapped in an [`Answer`].
#[derive(Default)]
struct Outcome {
    text: String,
    sources: Vec<String>,
    tokens: u32,
    failure: Option<Stage>,
}

impl Outcome {
    fn failed(stage: Stage, err: &dyn std::fmt::Display) -> Self {
        warn!(stage = ?stage, error = %err, "query step failed");
        Self {
            text: format!(
                "Sorry, something went wrong while {}: {err}. Please try again.",
                stage.describe()
            ),
            failure: Some(stage),
            ..Self::default()
        }
    }
}

/// Per-query bookkeeping.
struct Run {
    start: Instant,
    trace: Vec<QueryState>,
    tokens: u32,
}

impl Run {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            trace: vec![QueryState::Received],
            tokens: 0,
        }
    }

    fn enter(&mut self, state: QueryState) {
        debug!(state = ?state, "query state");
        self.trace.push(state);
    }

    fn finish(
        mut self,
        outcome: Outcome,
        intent: Option<Intent>,
        route: Option<Route>,
        classification_fallback: bool,
    ) -> Answer {
        self.enter(QueryState::Answered);
        let text = if outcome.text.trim().is_empty() {
            "I could not produce an answer for that question. Please try rephrasing it.".to_string()
        } else {
            outcome.text
        };
        Answer {
            text,
            intent,
            route,
            classification_fallback,
            failure: outcome.failure,
            sources: outcome.sources,
            total_tokens: self.tokens + outcome.tokens,
            elapsed: self.start.elapsed(),
            trace: self.trace,
        }
    }
}

/// Routes queries to retrieval, web search, or a direct reply.
///
/// Holds only the agents and limits; all per-conversation state lives in
/// the [`Session`] passed to [`Orchestrator::handle`], so one orchestrator
/// can serve any number of sessions.
pub struct Orchestrator {
    router: RouterAgent,
    responder: ResponderAgent,
    summarizer: SummarizerAgent,
    retrieval_top_k: usize,
    search_max_results: usize,
}

impl Orchestrator {
    /// Creates an orchestrator, loading prompt templates from
    /// [`AgentConfig::prompt_dir`] with compiled-in fallbacks.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        Self::with_prompts(config, &PromptSet::load(config.prompt_dir.as_deref()))
    }

    /// Creates an orchestrator with explicit prompts.
    #[must_use]
    pub fn with_prompts(config: &AgentConfig, prompts: &PromptSet) -> Self {
        Self {
            router: RouterAgent::new(config, prompts.router.clone()),
            responder: ResponderAgent::new(config, prompts.responder.clone()),
            summarizer: SummarizerAgent::new(config, prompts.summarizer.clone()),
            retrieval_top_k: config.retrieval_top_k,
            search_max_results: config.search_max_results,
        }
    }

    /// Runs only the classifier.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the completion call fails.
    pub async fn classify(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
    ) -> Result<Classification, AgentError> {
        self.router.classify(provider, query).await
    }

    /// Answers one query.
    ///
    /// A failed session yields its diagnostic without any model or tool
    /// call. Otherwise exactly one classification and one strategy run.
    pub async fn handle(&self, query: &str, session: &Session, transport: &dyn Transport) -> Answer {
        let mut run = Run::new();

        let caps = match session {
            Session::Ready(caps) => caps,
            Session::Failed(err) => {
                let outcome = Outcome {
                    text: diagnostic(err),
                    failure: Some(Stage::Session),
                    ..Outcome::default()
                };
                return run.finish(outcome, None, None, false);
            }
        };

        run.enter(QueryState::Classifying);
        let (intent, fallback, classification_failed) =
            match self.router.classify(caps.provider.as_ref(), query).await {
                Ok(c) => {
                    run.tokens += c.usage.total_tokens;
                    if !c.matched {
                        warn!(raw = c.raw.trim(), fallback = %Intent::FALLBACK, "unrecognized router label");
                    }
                    (c.intent, !c.matched, false)
                }
                Err(err) => {
                    warn!(error = %err, fallback = %Intent::FALLBACK, "classification failed");
                    (Intent::FALLBACK, true, true)
                }
            };

        let route = resolve_route(intent, caps.retrieval.is_some());
        info!(intent = %intent, route = %route, fallback, "query routed");

        let mut outcome = match (route, caps.retrieval.as_deref()) {
            (Route::DirectReply, _) => self.direct_reply(&mut run, caps, query).await,
            (Route::Retrieval, Some(retrieval)) => {
                self.retrieve(&mut run, retrieval, query, transport).await
            }
            _ => self.search(&mut run, caps, query, transport).await,
        };

        if classification_failed && outcome.failure.is_none() {
            outcome.failure = Some(Stage::Classification);
        }

        run.finish(outcome, Some(intent), Some(route), fallback)
    }

    async fn direct_reply(&self, run: &mut Run, caps: &Capabilities, query: &str) -> Outcome {
        run.enter(QueryState::DirectReply);
        match self.responder.reply(caps.provider.as_ref(), query).await {
            Ok(response) => Outcome {
                text: response.content,
                tokens: response.usage.total_tokens,
                ..Outcome::default()
            },
            Err(err) => Outcome::failed(Stage::Reply, &err),
        }
    }

    async fn retrieve(
        &self,
        run: &mut Run,
        retrieval: &dyn ToolAdapter,
        query: &str,
        transport: &dyn Transport,
    ) -> Outcome {
        run.enter(QueryState::Retrieving);
        let notice = post_notice(transport, RETRIEVAL_NOTICE).await;
        let start = Instant::now();

        let outcome = match retrieval.query(query, self.retrieval_top_k).await {
            Ok(result) => Outcome {
                text: result.content,
                sources: result.sources,
                tokens: result.total_tokens,
                failure: None,
            },
            Err(err) => Outcome::failed(Stage::Retrieval, &err),
        };
        debug!(
            adapter = retrieval.name(),
            elapsed_ms = start.elapsed().as_millis(),
            "retrieval finished"
        );

        retract_notice(transport, notice).await;
        outcome
    }

    async fn search(
        &self,
        run: &mut Run,
        caps: &Capabilities,
        query: &str,
        transport: &dyn Transport,
    ) -> Outcome {
        run.enter(QueryState::Searching);
        let notice = post_notice(transport, SEARCH_NOTICE).await;
        let start = Instant::now();

        let outcome = match caps.search.query(query, self.search_max_results).await {
            Err(err) => Outcome::failed(Stage::Search, &err),
            Ok(results) => {
                debug!(
                    adapter = caps.search.name(),
                    sources = results.sources.len(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "search finished"
                );
                run.enter(QueryState::Summarizing);
                match self
                    .summarizer
                    .summarize(caps.provider.as_ref(), query, &results.content)
                    .await
                {
                    Ok(response) => Outcome {
                        text: response.content,
                        sources: results.sources,
                        tokens: response.usage.total_tokens,
                        failure: None,
                    },
                    Err(err) => Outcome::failed(Stage::Summarization, &err),
                }
            }
        };

        retract_notice(transport, notice).await;
        outcome
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("retrieval_top_k", &self.retrieval_top_k)
            .field("search_max_results", &self.search_max_results)
            .finish_non_exhaustive()
    }
}

async fn post_notice(transport: &dyn Transport, text: &str) -> Option<MessageHandle> {
    match transport.send(text).await {
        Ok(handle) => Some(handle),
        Err(err) => {
            debug!(error = %err, "progress notice not shown");
            None
        }
    }
}

async fn retract_notice(transport: &dyn Transport, handle: Option<MessageHandle>) {
    if let Some(handle) = handle
        && let Err(err) = transport.retract(handle).await
    {
        debug!(error = %err, "progress notice not retracted");
    }
}
