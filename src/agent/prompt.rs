//! System prompts and template builders for agents.
//!
//! Prompts are the core instructions that define each agent's behavior.
//! Template builders format user messages with the query and any tool
//! output the agent has to work from.

use std::fmt::Write;
use std::path::Path;

/// System prompt for the router (intent classification) agent.
pub const ROUTER_SYSTEM_PROMPT: &str = r"You are a routing system for a workplace policy assistant. You never answer questions; you only label them.

1. If the query is about specific internal policy, rules, procedures, benefits, leave, telework, or work hours, return INTERNAL.
2. If the query requires outside knowledge, news, current events, prices, or stocks, return EXTERNAL.
3. If the query is just a greeting or small talk such as 'hi', 'hello', 'thanks', or 'who are you', return CHAT.

Reply with exactly one word: INTERNAL, EXTERNAL, or CHAT. No punctuation, no explanation.";

/// System prompt for the direct-reply (chat) agent.
pub const RESPONDER_SYSTEM_PROMPT: &str = r"You are Nexus, a friendly assistant for workplace policy questions. You can consult the organization's policy documents and search the web when a question needs it.

For greetings and small talk, reply briefly and politely in one to three sentences. Do not invent policy details; if the user asks a policy question, invite them to ask it directly.";

/// System prompt for the web-search summarizer agent.
pub const SUMMARIZER_SYSTEM_PROMPT: &str = r"You answer questions using web search results supplied by the user message.

## Rules

- Use only the supplied search results. Do not add facts that are not in them.
- If the results do not answer the question, say so plainly.
- Cite sources inline with their bracketed number, e.g. [1], and finish with a 'Sources:' list of the URLs you used.
- Keep the answer concise: a short paragraph or a few bullets.";

/// System prompt for the grounded-retrieval synthesizer agent.
pub const SYNTHESIZER_SYSTEM_PROMPT: &str = r"You answer questions about the organization's internal policies using only the policy excerpts supplied in the user message.

## Rules

- Ground every statement in the excerpts. Quote requirements, deadlines, and thresholds exactly.
- If the excerpts do not contain the answer, say that the policy documents do not cover it.
- Mention the source document of each requirement when it is given.
- Answer in plain prose or short bullets; no preamble.";

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/policy-nexus/prompts";

/// Filename for the router prompt template.
const ROUTER_FILENAME: &str = "router.md";
/// Filename for the responder prompt template.
const RESPONDER_FILENAME: &str = "responder.md";
/// Filename for the summarizer prompt template.
const SUMMARIZER_FILENAME: &str = "summarizer.md";
/// Filename for the synthesizer prompt template.
const SYNTHESIZER_FILENAME: &str = "synthesizer.md";

/// A set of system prompts for all agents.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults. Use [`PromptSet::load`] to resolve the prompt
/// directory from CLI flags, environment variables, or the default path.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt for the router agent.
    pub router: String,
    /// System prompt for the direct-reply agent.
    pub responder: String,
    /// System prompt for the web-search summarizer.
    pub summarizer: String,
    /// System prompt for the grounded-retrieval synthesizer.
    pub synthesizer: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument (from `--prompt-dir` or config)
    /// 2. `NEXUS_PROMPT_DIR` environment variable
    /// 3. `~/.config/policy-nexus/prompts/`
    ///
    /// Each file is loaded independently; a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(std::path::PathBuf::from)
            .or_else(|| {
                std::env::var("NEXUS_PROMPT_DIR")
                    .ok()
                    .map(std::path::PathBuf::from)
            })
            .or_else(|| dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR)));

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|content| !content.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            router: load_file(ROUTER_FILENAME, ROUTER_SYSTEM_PROMPT),
            responder: load_file(RESPONDER_FILENAME, RESPONDER_SYSTEM_PROMPT),
            summarizer: load_file(SUMMARIZER_FILENAME, SUMMARIZER_SYSTEM_PROMPT),
            synthesizer: load_file(SYNTHESIZER_FILENAME, SYNTHESIZER_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            router: ROUTER_SYSTEM_PROMPT.to_string(),
            responder: RESPONDER_SYSTEM_PROMPT.to_string(),
            summarizer: SUMMARIZER_SYSTEM_PROMPT.to_string(),
            synthesizer: SYNTHESIZER_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten. Use this for initial scaffolding only.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (ROUTER_FILENAME, ROUTER_SYSTEM_PROMPT),
            (RESPONDER_FILENAME, RESPONDER_SYSTEM_PROMPT),
            (SUMMARIZER_FILENAME, SUMMARIZER_SYSTEM_PROMPT),
            (SYNTHESIZER_FILENAME, SYNTHESIZER_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<std::path::PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Builds the classification instruction with the query embedded verbatim.
#[must_use]
pub fn build_router_prompt(query: &str) -> String {
    format!("Classify this query: '{query}'. Reply ONLY with one word: INTERNAL, EXTERNAL, or CHAT.")
}

/// Builds the direct-reply instruction wrapping the raw query.
#[must_use]
pub fn build_reply_prompt(query: &str) -> String {
    format!("Reply politely to this user message: {query}")
}

/// Builds the summarization message from the question and raw search results.
#[must_use]
pub fn build_summary_prompt(query: &str, search_results: &str) -> String {
    format!(
        "User Question: {query}\n\n\
         Search Results:\n{search_results}\n\n\
         Answer the question using only the search results above. Cite sources."
    )
}

/// A retrieved policy excerpt passed to the synthesis prompt builder.
pub struct ExcerptContext<'a> {
    /// Document the excerpt came from, when known.
    pub source: Option<&'a str>,
    /// Cosine similarity to the query.
    pub score: f32,
    /// Excerpt text.
    pub content: &'a str,
}

/// Builds the grounded-answer message from the question and retrieved excerpts.
#[must_use]
pub fn build_synthesis_prompt(query: &str, excerpts: &[ExcerptContext<'_>]) -> String {
    let mut prompt = String::from("<excerpts>\n");

    for (i, e) in excerpts.iter().enumerate() {
        let _ = write!(
            prompt,
            "<excerpt n=\"{n}\" source=\"{source}\" score=\"{score:.3}\">\n{content}\n</excerpt>\n\n",
            n = i + 1,
            source = e.source.unwrap_or("unknown"),
            score = e.score,
            content = e.content,
        );
    }
    let _ = write!(
        prompt,
        "</excerpts>\n\n<question>{query}</question>\n\n\
         Answer the question using only the excerpts above."
    );

    prompt
}
