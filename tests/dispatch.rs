//! Dispatcher behaviour against scripted collaborators.
//!
//! The provider answers by inspecting the user prompt, tool adapters
//! count their calls, and the transport records notices.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use policy_nexus::agent::message::{ChatRequest, ChatResponse, TokenUsage};
use policy_nexus::agent::prompt::PromptSet;
use policy_nexus::agent::{
    AgentConfig, Capabilities, Intent, LlmProvider, Orchestrator, QueryState, Route, Session,
    Stage,
};
use policy_nexus::error::{AgentError, ConfigError, IndexError, ToolError, TransportError};
use policy_nexus::tools::{ToolAdapter, ToolResult};
use policy_nexus::transport::{MessageHandle, Transport};

const TELEWORK: &str = "What are the reporting requirements for telework?";
const STOCK: &str = "What is the current stock price of Apple?";
const GREETING: &str = "Hello! Who are you?";

const RETRIEVAL_ANSWER: &str =
    "Teleworkers must submit a weekly hours report to their supervisor (Telework Policy §4).";
const SNIPPETS: &str = "[1] Apple Inc. (AAPL)\nURL: https://finance.example/aapl\nAAPL last traded at $231.40.";
const SUMMARY: &str = "Apple last traded at $231.40 [1].\n\nSources: https://finance.example/aapl";
const REPLY: &str = "Hi! I'm Nexus, your workplace policy assistant.";

// ── Scripted provider ───────────────────────────────────────────

struct ScriptedProvider {
    router_reply: String,
    router_fails: bool,
    fail_once_on: Mutex<Option<&'static str>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn labelling(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            router_reply: reply.to_string(),
            router_fails: false,
            fail_once_on: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Labels every query `reply`; the first call whose prompt starts
    /// with `prefix` fails.
    fn failing_once_on(reply: &str, prefix: &'static str) -> Arc<Self> {
        let provider = Self::labelling(reply);
        if let Ok(mut slot) = provider.fail_once_on.lock() {
            *slot = Some(prefix);
        }
        provider
    }

    fn failing_router() -> Arc<Self> {
        Arc::new(Self {
            router_reply: String::new(),
            router_fails: true,
            fail_once_on: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| p.starts_with(prefix))
            .collect()
    }
}

fn reply(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
        finish_reason: Some("stop".to_string()),
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let prompt = request.last_user_content().unwrap_or_default().to_string();
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }

        let fails_now = self
            .fail_once_on
            .lock()
            .map(|mut slot| slot.take_if(|prefix| prompt.starts_with(*prefix)).is_some())
            .unwrap_or(false);
        if fails_now {
            return Err(AgentError::ApiRequest {
                message: "429 Too Many Requests".to_string(),
                status: Some(429),
            });
        }

        if prompt.starts_with("Classify this query") {
            if self.router_fails {
                return Err(AgentError::ApiRequest {
                    message: "503 Service Unavailable".to_string(),
                    status: Some(503),
                });
            }
            return Ok(reply(&self.router_reply));
        }
        if prompt.starts_with("User Question:") {
            return Ok(reply(SUMMARY));
        }
        if prompt.starts_with("Reply politely") {
            return Ok(reply(REPLY));
        }
        Ok(reply("unexpected prompt"))
    }
}

// ── Counting adapters ───────────────────────────────────────────

struct CountingAdapter {
    name: &'static str,
    result: ToolResult,
    fail_first: AtomicBool,
    calls: AtomicUsize,
    limits: Mutex<Vec<usize>>,
}

impl CountingAdapter {
    fn returning(name: &'static str, content: &str, sources: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name,
            result: ToolResult {
                content: content.to_string(),
                sources: sources.iter().map(ToString::to_string).collect(),
                total_tokens: 0,
            },
            fail_first: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            limits: Mutex::new(Vec::new()),
        })
    }

    fn failing_once(name: &'static str, content: &str) -> Arc<Self> {
        let adapter = Self::returning(name, content, &["https://example.test/source"]);
        adapter.fail_first.store(true, Ordering::SeqCst);
        adapter
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn limits(&self) -> Vec<usize> {
        self.limits.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolAdapter for CountingAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn query(&self, _text: &str, limit: usize) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut limits) = self.limits.lock() {
            limits.push(limit);
        }
        if self.fail_first.swap(false, Ordering::SeqCst) {
            if self.name == "policy_retrieval" {
                return Err(ToolError::Retrieval(IndexError::Embedding {
                    message: "model session closed".to_string(),
                }));
            }
            return Err(ToolError::Search {
                message: "connection reset by peer".to_string(),
                status: None,
            });
        }
        Ok(self.result.clone())
    }
}

// ── Recording transport ─────────────────────────────────────────

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    retracted: AtomicUsize,
    fail: bool,
}

impl RecordingTransport {
    fn broken() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, text: &str) -> Result<MessageHandle, TransportError> {
        if self.fail {
            return Err(TransportError {
                message: "socket closed".to_string(),
            });
        }
        let mut sent = self.sent.lock().map_err(|_| TransportError {
            message: "poisoned".to_string(),
        })?;
        sent.push(text.to_string());
        Ok(MessageHandle(sent.len() as u64))
    }

    async fn retract(&self, _handle: MessageHandle) -> Result<(), TransportError> {
        self.retracted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Fixture ─────────────────────────────────────────────────────

struct Fixture {
    provider: Arc<ScriptedProvider>,
    retrieval: Arc<CountingAdapter>,
    search: Arc<CountingAdapter>,
    session: Session,
    orchestrator: Orchestrator,
}

impl Fixture {
    fn build(provider: Arc<ScriptedProvider>, with_retrieval: bool) -> Self {
        Self::with_search(
            provider,
            with_retrieval,
            CountingAdapter::returning("web_search", SNIPPETS, &["https://finance.example/aapl"]),
        )
    }

    fn with_search(
        provider: Arc<ScriptedProvider>,
        with_retrieval: bool,
        search: Arc<CountingAdapter>,
    ) -> Self {
        let retrieval =
            CountingAdapter::returning("policy_retrieval", RETRIEVAL_ANSWER, &["telework.pdf"]);
        Self::assemble(provider, with_retrieval.then_some(retrieval), search)
    }

    fn with_retrieval(provider: Arc<ScriptedProvider>, retrieval: Arc<CountingAdapter>) -> Self {
        Self::assemble(
            provider,
            Some(retrieval),
            CountingAdapter::returning("web_search", SNIPPETS, &["https://finance.example/aapl"]),
        )
    }

    fn assemble(
        provider: Arc<ScriptedProvider>,
        retrieval: Option<Arc<CountingAdapter>>,
        search: Arc<CountingAdapter>,
    ) -> Self {
        let with_retrieval = retrieval.is_some();
        let retrieval = retrieval.unwrap_or_else(|| {
            CountingAdapter::returning("policy_retrieval", RETRIEVAL_ANSWER, &["telework.pdf"])
        });

        let session = Session::Ready(Capabilities {
            provider: Arc::clone(&provider) as Arc<dyn LlmProvider>,
            retrieval: with_retrieval.then(|| Arc::clone(&retrieval) as Arc<dyn ToolAdapter>),
            search: Arc::clone(&search) as Arc<dyn ToolAdapter>,
        });

        let config = AgentConfig::builder()
            .api_key("gsk_test")
            .search_api_key("tvly_test")
            .build()
            .unwrap_or_else(|_| unreachable!());

        Self {
            provider,
            retrieval,
            search,
            session,
            orchestrator: Orchestrator::with_prompts(&config, &PromptSet::defaults()),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn chat_intent_invokes_no_tools() {
    let fx = Fixture::build(ScriptedProvider::labelling("CHAT"), true);
    let transport = RecordingTransport::default();

    let answer = fx.orchestrator.handle(GREETING, &fx.session, &transport).await;

    assert_eq!(answer.text, REPLY);
    assert_eq!(answer.intent, Some(Intent::Chat));
    assert_eq!(answer.route, Some(Route::DirectReply));
    assert_eq!(fx.retrieval.calls(), 0);
    assert_eq!(fx.search.calls(), 0);
    assert!(transport.sent().is_empty());

    let replies = fx.provider.calls_starting_with("Reply politely to this user message:");
    assert_eq!(replies, vec![format!("Reply politely to this user message: {GREETING}")]);
    assert_eq!(fx.provider.prompts().len(), 2);
    assert_eq!(answer.total_tokens, 30);
}

#[tokio::test]
async fn internal_with_retrieval_returns_retrieval_text_verbatim() {
    let fx = Fixture::build(ScriptedProvider::labelling("INTERNAL"), true);
    let transport = RecordingTransport::default();

    let answer = fx.orchestrator.handle(TELEWORK, &fx.session, &transport).await;

    assert_eq!(answer.text, RETRIEVAL_ANSWER);
    assert_eq!(answer.route, Some(Route::Retrieval));
    assert_eq!(answer.sources, vec!["telework.pdf"]);
    assert_eq!(fx.retrieval.calls(), 1);
    assert_eq!(fx.retrieval.limits(), vec![3]);
    assert_eq!(fx.search.calls(), 0);
    assert!(fx.provider.calls_starting_with("User Question:").is_empty());

    assert_eq!(transport.sent(), vec!["Consulting policy documents..."]);
    assert_eq!(transport.retracted.load(Ordering::SeqCst), 1);
    assert_eq!(
        answer.trace,
        vec![
            QueryState::Received,
            QueryState::Classifying,
            QueryState::Retrieving,
            QueryState::Answered
        ]
    );
}

#[tokio::test]
async fn internal_without_retrieval_routes_to_search() {
    let fx = Fixture::build(ScriptedProvider::labelling("INTERNAL"), false);
    let transport = RecordingTransport::default();

    let answer = fx.orchestrator.handle(TELEWORK, &fx.session, &transport).await;

    assert_eq!(answer.intent, Some(Intent::Internal));
    assert_eq!(answer.route, Some(Route::WebSearch));
    assert_eq!(fx.search.calls(), 1);
    assert_eq!(fx.retrieval.calls(), 0);
    assert_eq!(answer.text, SUMMARY);
}

#[tokio::test]
async fn stock_question_searches_then_summarizes_once() {
    let fx = Fixture::build(ScriptedProvider::labelling("EXTERNAL"), true);
    let transport = RecordingTransport::default();

    let answer = fx.orchestrator.handle(STOCK, &fx.session, &transport).await;

    assert_eq!(fx.search.limits(), vec![3]);
    assert_eq!(fx.retrieval.calls(), 0);

    let summaries = fx.provider.calls_starting_with("User Question:");
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].contains(STOCK));
    assert!(summaries[0].contains(SNIPPETS));
    assert!(summaries[0].contains("Cite sources"));

    assert_eq!(answer.text, SUMMARY);
    assert_eq!(answer.sources, vec!["https://finance.example/aapl"]);
    assert_eq!(answer.failure, None);
    assert_eq!(transport.sent(), vec!["Searching the web..."]);
    assert_eq!(transport.retracted.load(Ordering::SeqCst), 1);
    assert_eq!(
        answer.trace,
        vec![
            QueryState::Received,
            QueryState::Classifying,
            QueryState::Searching,
            QueryState::Summarizing,
            QueryState::Answered
        ]
    );
}

#[tokio::test]
async fn garbled_label_falls_back_to_search() {
    let fx = Fixture::build(ScriptedProvider::labelling("I'd say this is INTERNAL."), true);

    let answer = fx
        .orchestrator
        .handle(TELEWORK, &fx.session, &RecordingTransport::default())
        .await;

    assert_eq!(answer.intent, Some(Intent::External));
    assert_eq!(answer.route, Some(Route::WebSearch));
    assert!(answer.classification_fallback);
    assert_eq!(answer.failure, None);
    assert_eq!(fx.retrieval.calls(), 0);
    assert_eq!(fx.search.calls(), 1);
}

#[tokio::test]
async fn decorated_label_is_accepted() {
    let fx = Fixture::build(ScriptedProvider::labelling("  **Chat**.\n"), true);

    let answer = fx
        .orchestrator
        .handle(GREETING, &fx.session, &RecordingTransport::default())
        .await;

    assert_eq!(answer.route, Some(Route::DirectReply));
    assert!(!answer.classification_fallback);
}

#[tokio::test]
async fn classifier_failure_uses_fallback_and_still_answers() {
    let fx = Fixture::build(ScriptedProvider::failing_router(), true);

    let answer = fx
        .orchestrator
        .handle(STOCK, &fx.session, &RecordingTransport::default())
        .await;

    assert_eq!(answer.intent, Some(Intent::External));
    assert!(answer.classification_fallback);
    assert_eq!(answer.failure, Some(Stage::Classification));
    assert!(!answer.is_failure());
    assert_eq!(answer.text, SUMMARY);
    assert_eq!(fx.search.calls(), 1);
}

#[tokio::test]
async fn search_failure_yields_failure_answer_and_session_survives() {
    let fx = Fixture::with_search(
        ScriptedProvider::labelling("EXTERNAL"),
        true,
        CountingAdapter::failing_once("web_search", SNIPPETS),
    );
    let transport = RecordingTransport::default();

    let first = fx.orchestrator.handle(STOCK, &fx.session, &transport).await;
    assert!(!first.text.trim().is_empty());
    assert!(first.text.contains("searching the web"));
    assert_eq!(first.failure, Some(Stage::Search));
    assert!(fx.provider.calls_starting_with("User Question:").is_empty());
    assert_eq!(first.trace.last(), Some(&QueryState::Answered));
    assert_eq!(transport.retracted.load(Ordering::SeqCst), 1);

    let second = fx.orchestrator.handle(STOCK, &fx.session, &transport).await;
    assert_eq!(second.failure, None);
    assert_eq!(second.text, SUMMARY);
    assert_eq!(fx.search.calls(), 2);
}

#[tokio::test]
async fn failed_session_short_circuits_without_calls() {
    let provider = ScriptedProvider::labelling("CHAT");
    let fx = Fixture::build(Arc::clone(&provider), true);
    let failed = Session::Failed(ConfigError::MissingCredential {
        name: "TAVILY_API_KEY",
    });
    let transport = RecordingTransport::default();

    let answer = fx.orchestrator.handle(GREETING, &failed, &transport).await;

    assert!(answer.text.contains("TAVILY_API_KEY"));
    assert_eq!(answer.failure, Some(Stage::Session));
    assert!(provider.prompts().is_empty());
    assert_eq!(fx.retrieval.calls(), 0);
    assert_eq!(fx.search.calls(), 0);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn broken_transport_does_not_change_answer() {
    let fx = Fixture::build(ScriptedProvider::labelling("INTERNAL"), true);

    let answer = fx
        .orchestrator
        .handle(TELEWORK, &fx.session, &RecordingTransport::broken())
        .await;

    assert_eq!(answer.text, RETRIEVAL_ANSWER);
    assert_eq!(answer.failure, None);
}

#[tokio::test]
async fn shared_session_serves_concurrent_queries() {
    let fx = Arc::new(Fixture::build(ScriptedProvider::labelling("INTERNAL"), true));
    let transport = Arc::new(RecordingTransport::default());

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let fx = Arc::clone(&fx);
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                fx.orchestrator
                    .handle(TELEWORK, &fx.session, transport.as_ref())
                    .await
            })
        })
        .collect();

    for task in tasks {
        let answer = task.await.unwrap_or_else(|_| unreachable!());
        assert_eq!(answer.text, RETRIEVAL_ANSWER);
    }
    assert_eq!(fx.retrieval.calls(), 4);
}

#[tokio::test]
async fn retrieval_failure_names_the_step_and_session_survives() {
    let fx = Fixture::with_retrieval(
        ScriptedProvider::labelling("INTERNAL"),
        CountingAdapter::failing_once("policy_retrieval", RETRIEVAL_ANSWER),
    );
    let transport = RecordingTransport::default();

    let first = fx.orchestrator.handle(TELEWORK, &fx.session, &transport).await;
    assert!(!first.text.trim().is_empty());
    assert!(first.text.contains("consulting the policy documents"));
    assert!(first.text.contains("model session closed"));
    assert_eq!(first.failure, Some(Stage::Retrieval));
    assert!(first.is_failure());
    assert_eq!(first.route, Some(Route::Retrieval));
    assert_eq!(fx.search.calls(), 0);
    assert_eq!(first.trace.last(), Some(&QueryState::Answered));
    assert_eq!(transport.retracted.load(Ordering::SeqCst), 1);

    let second = fx.orchestrator.handle(TELEWORK, &fx.session, &transport).await;
    assert_eq!(second.failure, None);
    assert_eq!(second.text, RETRIEVAL_ANSWER);
    assert_eq!(fx.retrieval.calls(), 2);
}

#[tokio::test]
async fn summarizer_failure_names_the_step_and_retracts_notice() {
    let fx = Fixture::build(
        ScriptedProvider::failing_once_on("EXTERNAL", "User Question:"),
        true,
    );
    let transport = RecordingTransport::default();

    let first = fx.orchestrator.handle(STOCK, &fx.session, &transport).await;
    assert!(!first.text.trim().is_empty());
    assert!(first.text.contains("summarizing the search results"));
    assert_eq!(first.failure, Some(Stage::Summarization));
    assert!(first.sources.is_empty());
    assert_eq!(fx.search.calls(), 1);
    assert_eq!(
        first.trace,
        vec![
            QueryState::Received,
            QueryState::Classifying,
            QueryState::Searching,
            QueryState::Summarizing,
            QueryState::Answered
        ]
    );
    assert_eq!(transport.sent(), vec!["Searching the web..."]);
    assert_eq!(transport.retracted.load(Ordering::SeqCst), 1);

    let second = fx.orchestrator.handle(STOCK, &fx.session, &transport).await;
    assert_eq!(second.failure, None);
    assert_eq!(second.text, SUMMARY);
    assert_eq!(transport.retracted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn reply_failure_names_the_step_and_session_survives() {
    let fx = Fixture::build(
        ScriptedProvider::failing_once_on("CHAT", "Reply politely"),
        true,
    );
    let transport = RecordingTransport::default();

    let first = fx.orchestrator.handle(GREETING, &fx.session, &transport).await;
    assert!(!first.text.trim().is_empty());
    assert!(first.text.contains("writing a reply"));
    assert_eq!(first.failure, Some(Stage::Reply));
    assert_eq!(first.route, Some(Route::DirectReply));
    assert_eq!(fx.retrieval.calls(), 0);
    assert_eq!(fx.search.calls(), 0);
    assert!(transport.sent().is_empty());
    assert_eq!(first.trace.last(), Some(&QueryState::Answered));

    let second = fx.orchestrator.handle(GREETING, &fx.session, &transport).await;
    assert_eq!(second.failure, None);
    assert_eq!(second.text, REPLY);
}

#[tokio::test]
async fn empty_tool_text_is_replaced_with_a_notice() {
    let fx = Fixture::with_retrieval(
        ScriptedProvider::labelling("INTERNAL"),
        CountingAdapter::returning("policy_retrieval", "   ", &["telework.pdf"]),
    );

    let answer = fx
        .orchestrator
        .handle(TELEWORK, &fx.session, &RecordingTransport::default())
        .await;

    assert!(!answer.text.trim().is_empty());
    assert!(answer.text.contains("could not produce an answer"));
    assert_eq!(answer.failure, None);
    assert_eq!(answer.trace.last(), Some(&QueryState::Answered));
}
