//! Output formatting for CLI commands.

#![allow(clippy::format_push_string)]

use std::fmt::Write;

use serde::Serialize;

use crate::agent::answer::Answer;
use crate::agent::router::{Classification, Intent};
use crate::error::{CommandError, Result};

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes a value as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::OutputFormat`] if serialization fails.
    pub fn to_json<T: Serialize>(self, value: &T) -> Result<String> {
        serde_json::to_string_pretty(value)
            .map_err(|e| CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into())
    }
}

/// Formats an answer with its routing footer.
///
/// # Errors
///
/// Returns [`CommandError::OutputFormat`] if JSON serialization fails.
pub fn format_answer(answer: &Answer, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => format.to_json(answer),
        OutputFormat::Text => {
            let mut output = answer.text.trim_end().to_string();
            output.push_str("\n\n---\n");
            output.push_str(&answer_footer(answer));
            if answer.classification_fallback {
                let _ = write!(
                    output,
                    "\nNote: the question could not be classified reliably; routed as {} by default.",
                    Intent::FALLBACK
                );
            }
            output.push('\n');
            Ok(output)
        }
    }
}

/// One-line routing summary for an answer.
#[must_use]
pub fn answer_footer(answer: &Answer) -> String {
    let route = answer.route.map_or("none", |r| r.as_str());
    let intent = answer.intent.map_or("-", |i| i.as_str());
    let sources = if answer.sources.is_empty() {
        "none".to_string()
    } else {
        answer.sources.join(", ")
    };
    format!(
        "Route: {route} | Intent: {intent} | Sources: {sources} | Tokens: {} | Time: {:.1}s",
        answer.total_tokens,
        answer.elapsed.as_secs_f64()
    )
}

#[derive(Serialize)]
struct ClassificationView<'a> {
    intent: Intent,
    matched: bool,
    raw: &'a str,
    total_tokens: u32,
}

/// Formats a classification result.
///
/// # Errors
///
/// Returns [`CommandError::OutputFormat`] if JSON serialization fails.
pub fn format_classification(c: &Classification, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => format.to_json(&ClassificationView {
            intent: c.intent,
            matched: c.matched,
            raw: c.raw.trim(),
            total_tokens: c.usage.total_tokens,
        }),
        OutputFormat::Text => {
            let mut output = format!("{}\n", c.intent);
            if !c.matched {
                let _ = writeln!(
                    output,
                    "(fallback: model replied {:?}, which is not a label)",
                    c.raw.trim()
                );
            }
            Ok(output)
        }
    }
}

/// Status report for `nexus status`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Provider name.
    pub provider: String,
    /// Answer model.
    pub model: String,
    /// Router model.
    pub router_model: String,
    /// Masked LLM key, or `None` when unset.
    pub api_key: Option<String>,
    /// Masked search key, or `None` when unset.
    pub search_api_key: Option<String>,
    /// Configured index path.
    pub index_path: String,
    /// Resolved index file, when present.
    pub index_file: Option<String>,
    /// Collection name.
    pub collection: String,
    /// Chunks in the collection, when the index could be opened.
    pub chunks: Option<usize>,
    /// Embedding model configured for queries.
    pub embedding_model: String,
    /// Embedding model recorded in the index.
    pub index_embedding_model: Option<String>,
    /// Index error, if opening failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_error: Option<String>,
    /// Retrieval top-k.
    pub retrieval_top_k: usize,
    /// Search max results.
    pub search_max_results: usize,
}

/// Formats a status report.
///
/// # Errors
///
/// Returns [`CommandError::OutputFormat`] if JSON serialization fails.
pub fn format_status(report: &StatusReport, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return format.to_json(report);
    }

    let unset = || "(not set)".to_string();
    let mut output = String::new();
    output.push_str("policy-nexus status\n");
    let _ = writeln!(output, "  Provider:        {}", report.provider);
    let _ = writeln!(output, "  Model:           {}", report.model);
    let _ = writeln!(output, "  Router model:    {}", report.router_model);
    let _ = writeln!(
        output,
        "  LLM key:         {}",
        report.api_key.clone().unwrap_or_else(unset)
    );
    let _ = writeln!(
        output,
        "  Search key:      {}",
        report.search_api_key.clone().unwrap_or_else(unset)
    );
    let _ = writeln!(output, "  Index path:      {}", report.index_path);
    match (&report.index_file, report.chunks, &report.index_error) {
        (None, _, _) => output.push_str("  Index:           not found (retrieval disabled)\n"),
        (Some(_), _, Some(err)) => {
            let _ = writeln!(output, "  Index:           unreadable: {err}");
        }
        (Some(file), chunks, None) => {
            let _ = writeln!(
                output,
                "  Index:           {file} ({} chunks in '{}')",
                chunks.unwrap_or(0),
                report.collection
            );
        }
    }
    let _ = writeln!(output, "  Embedding model: {}", report.embedding_model);
    if let Some(model) = &report.index_embedding_model {
        let _ = writeln!(output, "  Index built with: {model}");
    }
    let _ = writeln!(
        output,
        "  Limits:          top-k {} | search results {}",
        report.retrieval_top_k, report.search_max_results
    );
    Ok(output)
}
