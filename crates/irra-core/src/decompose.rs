//! Multi-hop query decomposition.
//!
//! A synthesis question ("how does X relate to Y") is split into simpler
//! sub-questions by the completion provider. Decomposition can only widen
//! retrieval: any failure falls back to the original query.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::completion::CompletionProvider;
use crate::prompts::decomposition_prompt;

/// Phrases that mark a query as needing multi-hop retrieval.
pub const DEFAULT_MULTI_HOP_KEYWORDS: &[&str] = &[
    "relate",
    "connect",
    "compare",
    "link",
    "difference between",
    "how does",
];

/// Case-insensitive substring test against `keywords`.
pub fn needs_multi_hop<S: AsRef<str>>(query: &str, keywords: &[S]) -> bool {
    let query = query.to_lowercase();
    keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .any(|k| !k.is_empty() && query.contains(&k))
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*(.*?)\s*```$").ok())
        .as_ref()
}

/// Remove surrounding whitespace and a Markdown code fence, if any.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = fence_regex()
        .and_then(|re| re.captures(trimmed))
        .and_then(|c| c.get(1));
    match inner {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Parse a JSON array of sub-questions.
///
/// Returns `None` unless the text is an array of strings with at least one
/// non-blank entry. Blank entries are dropped and the rest trimmed.
pub fn parse_sub_queries(text: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(text)).ok()?;
    let items = value.as_array()?;

    let mut queries = Vec::with_capacity(items.len());
    for item in items {
        let s = item.as_str()?.trim();
        if !s.is_empty() {
            queries.push(s.to_string());
        }
    }

    if queries.is_empty() {
        None
    } else {
        Some(queries)
    }
}

/// Splits complex queries with a completion provider.
#[derive(Clone)]
pub struct QueryDecomposer {
    provider: Arc<dyn CompletionProvider>,
}

impl std::fmt::Debug for QueryDecomposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryDecomposer")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl QueryDecomposer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Sub-queries for `query`; never empty.
    pub fn decompose(&self, query: &str) -> Vec<String> {
        let response = match self.provider.complete(&decomposition_prompt(query)) {
            Ok(text) => text,
            Err(e) => {
                warn!("Query decomposition failed, using original query: {}", e);
                return vec![query.to_string()];
            }
        };

        match parse_sub_queries(&response) {
            Some(queries) => {
                debug!("Decomposed query into {} sub-queries", queries.len());
                queries
            }
            None => {
                warn!("Unparseable decomposition output, using original query");
                vec![query.to_string()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::testing::ScriptedCompletion;

    fn decomposer(response: &str) -> QueryDecomposer {
        QueryDecomposer::new(Arc::new(ScriptedCompletion::new([response])))
    }

    #[test]
    fn test_needs_multi_hop() {
        let keywords = DEFAULT_MULTI_HOP_KEYWORDS;
        assert!(needs_multi_hop("How does osmosis relate to diffusion?", keywords));
        assert!(needs_multi_hop("COMPARE mitosis and meiosis", keywords));
        assert!(needs_multi_hop("What is the difference between DNA and RNA", keywords));
        assert!(!needs_multi_hop("What is osmosis?", keywords));
        assert!(!needs_multi_hop("anything", &[" "]));
    }

    #[test]
    fn test_parse_plain_array() {
        assert_eq!(
            parse_sub_queries(r#"["What is A?", " What is B? "]"#),
            Some(vec!["What is A?".to_string(), "What is B?".to_string()])
        );
    }

    #[test]
    fn test_parse_fenced_array() {
        let text = "```json\n[\"one\", \"two\"]\n```";
        assert_eq!(
            parse_sub_queries(text),
            Some(vec!["one".to_string(), "two".to_string()])
        );
    }

    #[test]
    fn test_parse_rejects_non_arrays_and_non_strings() {
        assert_eq!(parse_sub_queries("Here are some questions"), None);
        assert_eq!(parse_sub_queries(r#"{"q": "a"}"#), None);
        assert_eq!(parse_sub_queries(r#"["a", 3]"#), None);
        assert_eq!(parse_sub_queries(r#"["", "  "]"#), None);
        assert_eq!(parse_sub_queries("[]"), None);
    }

    #[test]
    fn test_decompose_success() {
        let result = decomposer(r#"["What is osmosis?", "What is diffusion?"]"#)
            .decompose("How does osmosis relate to diffusion?");
        assert_eq!(result, vec!["What is osmosis?", "What is diffusion?"]);
    }

    #[test]
    fn test_unparseable_output_falls_back_to_original() {
        let result = decomposer("Sure! First, consider osmosis.").decompose("original?");
        assert_eq!(result, vec!["original?"]);
    }

    #[test]
    fn test_provider_failure_falls_back_to_original() {
        let decomposer = QueryDecomposer::new(Arc::new(ScriptedCompletion::failing("timeout")));
        assert_eq!(decomposer.decompose("original?"), vec!["original?"]);
    }

    #[test]
    fn test_prompt_carries_query() {
        let provider = Arc::new(ScriptedCompletion::new(["[\"a\"]"]));
        QueryDecomposer::new(provider.clone()).decompose("compare X and Y");
        assert!(provider.prompt(0).contains("Original question: compare X and Y"));
    }
}
