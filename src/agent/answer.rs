//! Answer and routing types produced by the orchestrator.

use serde::Serialize;
use std::time::Duration;

use super::router::Intent;

/// Downstream strategy chosen for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Grounded answer from the local policy index.
    Retrieval,
    /// Live web search followed by summarization.
    WebSearch,
    /// One direct completion, no tools.
    DirectReply,
}

impl Route {
    /// Human-readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieval => "retrieval",
            Self::WebSearch => "web_search",
            Self::DirectReply => "direct_reply",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps an intent to a route given the session's capabilities.
///
/// `Internal` only reaches retrieval when a retrieval adapter exists;
/// otherwise it degrades to web search.
#[must_use]
pub const fn resolve_route(intent: Intent, has_retrieval: bool) -> Route {
    match intent {
        Intent::Internal if has_retrieval => Route::Retrieval,
        Intent::Internal | Intent::External => Route::WebSearch,
        Intent::Chat => Route::DirectReply,
    }
}

/// Pipeline step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The session never became ready.
    Session,
    /// The classifier call failed (the query was still answered).
    Classification,
    /// Policy document retrieval.
    Retrieval,
    /// Web search.
    Search,
    /// Summarizing search results.
    Summarization,
    /// Direct reply.
    Reply,
}

impl Stage {
    /// Description used in failure answers.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Session => "starting the session",
            Self::Classification => "classifying the question",
            Self::Retrieval => "consulting the policy documents",
            Self::Search => "searching the web",
            Self::Summarization => "summarizing the search results",
            Self::Reply => "writing a reply",
        }
    }
}

/// Per-query lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    /// Query accepted.
    Received,
    /// Waiting on the classifier.
    Classifying,
    /// Waiting on the retrieval adapter.
    Retrieving,
    /// Waiting on the search adapter.
    Searching,
    /// Waiting on the summarizer.
    Summarizing,
    /// Waiting on the direct reply.
    DirectReply,
    /// Answer produced. Terminal.
    Answered,
}

/// Final result of handling one query.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Answer text. Never empty.
    pub text: String,
    /// Classified intent; `None` if the session was not ready.
    pub intent: Option<Intent>,
    /// Route taken; `None` if the session was not ready.
    pub route: Option<Route>,
    /// `true` when the intent came from the fallback rather than a
    /// recognized classifier label.
    pub classification_fallback: bool,
    /// Step that failed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Stage>,
    /// Documents or URLs the answer draws on.
    pub sources: Vec<String>,
    /// Total tokens consumed across all calls.
    pub total_tokens: u32,
    /// Wall-clock time spent handling the query.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
    /// States visited, in order.
    pub trace: Vec<QueryState>,
}

impl Answer {
    /// Returns `true` if a pipeline step failed. A classification
    /// failure alone does not count: the query was still answered.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.failure.is_some_and(|stage| stage != Stage::Classification)
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}
