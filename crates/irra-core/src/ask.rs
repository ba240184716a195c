//! Reflective answering loop.
//!
//! ```text
//! RETRIEVE ─► GENERATE ─► REFLECT ─┬─ confidence ≥ threshold ─► ACCEPT
//!    ▲                             └─ below ─► REVISE (maybe new query) ─┐
//!    └──────────────────────────────────────────────────────────────────┘
//! final cycle: GENERATE ─► EXHAUSTED (no reflection, last attempt returned)
//! ```
//!
//! The revised query only steers retrieval. Generation always answers the
//! user's original question.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::citations::{citations, format_citations_block};
use crate::completion::CompletionProvider;
use crate::config::{
    ReflectionConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_FINAL_K, DEFAULT_MAX_ITERATIONS,
};
use crate::decompose::strip_code_fence;
use crate::errors::IrraError;
use crate::prompts::{answer_prompt, reflection_prompt};
use crate::retrieval::{HybridRetriever, RetrieveRequest};
use crate::types::{Chunk, MetadataFilter};

/// Answer returned when retrieval finds nothing.
pub const NO_CONTEXT_ANSWER: &str = "I couldn't find relevant information in the uploaded \
course materials. Please check if the relevant notes have been uploaded.";

/// Chunks shown to the reflector.
const REFLECTION_CHUNKS: usize = 5;

// ============================================================================
// Request / Result
// ============================================================================

/// Parameters of one answer call.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub query: String,
    /// Prior conversation, rendered as text.
    pub prior_context: String,
    /// Total retrieval+generation cycles.
    pub max_iterations: usize,
    pub confidence_threshold: f32,
    pub multi_hop: bool,
    pub filter: Option<MetadataFilter>,
    pub k: usize,
    pub use_reranker: bool,
}

impl AnswerRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            prior_context: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            multi_hop: false,
            filter: None,
            k: DEFAULT_FINAL_K,
            use_reranker: true,
        }
    }

    pub fn with_prior_context(mut self, context: impl Into<String>) -> Self {
        self.prior_context = context.into();
        self
    }

    pub fn with_reflection(mut self, config: &ReflectionConfig) -> Self {
        self.max_iterations = config.max_iterations;
        self.confidence_threshold = config.confidence_threshold;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_multi_hop(mut self, multi_hop: bool) -> Self {
        self.multi_hop = multi_hop;
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    fn retrieve_request(&self, query: &str) -> RetrieveRequest {
        RetrieveRequest {
            query: query.to_string(),
            k: self.k,
            filter: self.filter.clone(),
            use_reranker: self.use_reranker,
            multi_hop: self.multi_hop,
        }
    }

    fn validate(&self) -> Result<(), IrraError> {
        if self.max_iterations == 0 {
            return Err(IrraError::invalid_argument("maxIterations must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(IrraError::invalid_argument(format!(
                "confidence threshold must be between 0 and 1, got {}",
                self.confidence_threshold
            )));
        }
        if self.query.trim().is_empty() {
            return Err(IrraError::invalid_argument("query must not be empty"));
        }
        Ok(())
    }
}

/// Final answer with its supporting material.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub answer: String,
    /// Deduplicated citation lines for `citation_chunks`.
    pub citations: Vec<String>,
    /// Chunks the returned answer was generated from.
    pub citation_chunks: Vec<Chunk>,
    pub confidence: f32,
    pub chunks_used: usize,
    pub iterations: usize,
    /// Whether reflection accepted the answer (false on exhaustion or no context).
    pub accepted: bool,
}

impl AnswerResult {
    fn no_context(iterations: usize) -> Self {
        Self {
            answer: NO_CONTEXT_ANSWER.to_string(),
            citations: Vec::new(),
            citation_chunks: Vec::new(),
            confidence: 0.0,
            chunks_used: 0,
            iterations,
            accepted: false,
        }
    }

    fn from_attempt(
        answer: String,
        chunks: Vec<Chunk>,
        confidence: f32,
        iterations: usize,
        accepted: bool,
    ) -> Self {
        Self {
            citations: citations(&chunks),
            chunks_used: chunks.len(),
            citation_chunks: chunks,
            answer,
            confidence,
            iterations,
            accepted,
        }
    }

    /// Markdown "Sources Used" block for display under the answer.
    pub fn citations_block(&self) -> String {
        format_citations_block(&self.citation_chunks)
    }
}

// ============================================================================
// Reflection verdict
// ============================================================================

/// Reflector's judgement of one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionVerdict {
    pub overall_confidence: f32,
    pub should_retry: bool,
    pub retry_suggestion: String,
}

fn default_confidence() -> f32 {
    0.5
}

impl Default for ReflectionVerdict {
    fn default() -> Self {
        Self {
            overall_confidence: default_confidence(),
            should_retry: false,
            retry_suggestion: String::new(),
        }
    }
}

impl ReflectionVerdict {
    /// Parse reflector output; `None` if it is not a JSON object.
    ///
    /// Fields are read one by one: a missing, `null` or mistyped field takes
    /// its default without discarding the others. Confidence defaults to 0.5
    /// and is clamped to `[0, 1]`.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(strip_code_fence(text)).ok()?;
        let object = value.as_object()?;

        let overall_confidence = object
            .get("overall_confidence")
            .and_then(Value::as_f64)
            .map(|c| c as f32)
            .filter(|c| c.is_finite())
            .unwrap_or_else(default_confidence)
            .clamp(0.0, 1.0);
        let should_retry = object
            .get("should_retry")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let retry_suggestion = object
            .get("retry_suggestion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            overall_confidence,
            should_retry,
            retry_suggestion,
        })
    }

    /// Next query to retrieve with: the suggestion, when it is not blank.
    fn retry_query(&self) -> Option<&str> {
        let suggestion = self.retry_suggestion.trim();
        (!suggestion.is_empty()).then_some(suggestion)
    }
}

// ============================================================================
// Loop
// ============================================================================

/// Retrieval as seen by the answer loop.
pub trait ContextSource: Send + Sync {
    fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<Chunk>, IrraError>;
}

impl ContextSource for HybridRetriever {
    fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<Chunk>, IrraError> {
        HybridRetriever::retrieve(self, request)
    }
}

/// Retrieve, generate, reflect, and retry within an iteration budget.
pub struct AnswerLoop {
    source: Arc<dyn ContextSource>,
    generator: Arc<dyn CompletionProvider>,
    reflector: Arc<dyn CompletionProvider>,
}

impl std::fmt::Debug for AnswerLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerLoop")
            .field("generator", &self.generator.name())
            .field("reflector", &self.reflector.name())
            .finish()
    }
}

impl AnswerLoop {
    pub fn new(
        source: Arc<dyn ContextSource>,
        generator: Arc<dyn CompletionProvider>,
        reflector: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            source,
            generator,
            reflector,
        }
    }

    /// Answer `request.query` from retrieved course material.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a zero iteration budget, a threshold outside
    ///   `[0, 1]` or a blank query
    /// - `Completion` if answer generation fails
    pub fn answer(&self, request: &AnswerRequest) -> Result<AnswerResult, IrraError> {
        request.validate()?;

        let mut current_query = request.query.clone();
        let mut best_confidence: Option<f32> = None;
        let mut last: Option<(String, Vec<Chunk>)> = None;
        let mut iterations = 0;

        for iteration in 1..=request.max_iterations {
            iterations = iteration;
            debug!("Answer cycle {} with query '{}'", iteration, current_query);

            let chunks = self
                .source
                .retrieve(&request.retrieve_request(&current_query))?;
            if chunks.is_empty() {
                info!("No relevant chunks found, answering without context");
                return Ok(AnswerResult::no_context(iterations));
            }

            let answer = self.generate(request, &chunks)?;

            if iteration == request.max_iterations {
                last = Some((answer, chunks));
                break;
            }

            let verdict = self.reflect(&answer, &chunks);
            let confidence = verdict.overall_confidence;
            debug!("Reflection confidence {:.2}", confidence);

            if confidence >= request.confidence_threshold {
                return Ok(AnswerResult::from_attempt(
                    answer, chunks, confidence, iterations, true,
                ));
            }

            if let Some(next) = verdict.retry_query() {
                current_query = next.to_string();
            }

            if best_confidence.map_or(true, |best| confidence > best) {
                best_confidence = Some(confidence);
            }
        }

        let Some((answer, chunks)) = last else {
            return Err(IrraError::Internal(
                "answer loop ended without an attempt".to_string(),
            ));
        };
        info!(
            "Iteration budget exhausted after {} cycles, returning last attempt",
            iterations
        );
        Ok(AnswerResult::from_attempt(
            answer,
            chunks,
            best_confidence.unwrap_or(0.0),
            iterations,
            false,
        ))
    }

    fn generate(&self, request: &AnswerRequest, chunks: &[Chunk]) -> Result<String, IrraError> {
        let context = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        let prompt = answer_prompt(&context, &request.prior_context, &request.query);
        self.generator
            .complete(&prompt)
            .map_err(|e| match e {
                IrraError::Completion { .. } => e,
                other => IrraError::completion(self.generator.name(), other.to_string()),
            })
    }

    fn reflect(&self, answer: &str, chunks: &[Chunk]) -> ReflectionVerdict {
        let shown = chunks
            .iter()
            .take(REFLECTION_CHUNKS)
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");

        match self.reflector.complete(&reflection_prompt(&shown, answer)) {
            Ok(text) => ReflectionVerdict::parse(&text).unwrap_or_else(|| {
                warn!("Unparseable reflection output, using default verdict");
                ReflectionVerdict::default()
            }),
            Err(e) => {
                warn!("Reflection failed, using default verdict: {}", e);
                ReflectionVerdict::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::testing::ScriptedCompletion;
    use crate::types::ChunkMetadata;
    use std::sync::Mutex;

    /// Returns the same chunks for every query and records the queries.
    struct StubSource {
        chunks: Vec<Chunk>,
        queries: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn new(chunks: Vec<Chunk>) -> Arc<Self> {
            Arc::new(Self {
                chunks,
                queries: Mutex::new(Vec::new()),
            })
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl ContextSource for StubSource {
        fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<Chunk>, IrraError> {
            self.queries.lock().unwrap().push(request.query.clone());
            Ok(self.chunks.clone())
        }
    }

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(
                "Osmosis is the diffusion of water.",
                ChunkMetadata::for_source("week3.pdf").with_page(4),
            ),
            Chunk::new(
                "Water moves toward higher solute concentration.",
                ChunkMetadata::for_source("week3.pdf").with_page(5),
            ),
        ]
    }

    fn verdict(confidence: f32, retry: &str) -> String {
        serde_json::json!({
            "overall_confidence": confidence,
            "should_retry": !retry.is_empty(),
            "retry_suggestion": retry,
        })
        .to_string()
    }

    struct Harness {
        source: Arc<StubSource>,
        generator: Arc<ScriptedCompletion>,
        reflector: Arc<ScriptedCompletion>,
        answer_loop: AnswerLoop,
    }

    fn harness(source_chunks: Vec<Chunk>, answers: &[&str], verdicts: Vec<String>) -> Harness {
        let source = StubSource::new(source_chunks);
        let generator = Arc::new(ScriptedCompletion::new(answers.iter().copied()));
        let reflector = Arc::new(ScriptedCompletion::new(verdicts));
        let answer_loop = AnswerLoop::new(source.clone(), generator.clone(), reflector.clone());
        Harness {
            source,
            generator,
            reflector,
            answer_loop,
        }
    }

    #[test]
    fn test_accepts_confident_answer_after_one_iteration() {
        let h = harness(chunks(), &["fixed answer"], vec![verdict(0.9, "")]);

        let result = h
            .answer_loop
            .answer(&AnswerRequest::new("What is osmosis?").with_threshold(0.6))
            .unwrap();

        assert_eq!(result.iterations, 1);
        assert!(result.accepted);
        assert_eq!(result.answer, "fixed answer");
        assert!((result.confidence - 0.9).abs() < 1e-6);
        assert_eq!(result.chunks_used, 2);
        assert_eq!(h.generator.calls(), 1);
        assert_eq!(h.reflector.calls(), 1);
    }

    #[test]
    fn test_low_confidence_retries_with_revised_query_and_returns_last() {
        let h = harness(
            chunks(),
            &["first answer", "second answer"],
            vec![verdict(0.1, "revised")],
        );

        let result = h
            .answer_loop
            .answer(&AnswerRequest::new("What is osmosis?").with_max_iterations(2))
            .unwrap();

        assert_eq!(h.source.queries(), vec!["What is osmosis?", "revised"]);
        assert_eq!(h.generator.calls(), 2);
        // the final cycle is not reflected
        assert_eq!(h.reflector.calls(), 1);
        assert_eq!(result.iterations, 2);
        assert_eq!(result.answer, "second answer");
        assert!(!result.accepted);
        assert!((result.confidence - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_generator_always_sees_original_question() {
        let h = harness(chunks(), &["a", "b"], vec![verdict(0.1, "revised")]);
        h.answer_loop
            .answer(&AnswerRequest::new("What is osmosis?").with_max_iterations(2))
            .unwrap();

        assert!(h.generator.prompt(1).contains("What is osmosis?"));
        assert!(!h.generator.prompt(1).contains("revised"));
    }

    #[test]
    fn test_empty_suggestion_retries_same_query() {
        let h = harness(chunks(), &["a"], vec![verdict(0.2, "")]);
        h.answer_loop
            .answer(&AnswerRequest::new("q1").with_max_iterations(3))
            .unwrap();
        assert_eq!(h.source.queries(), vec!["q1", "q1", "q1"]);
        assert_eq!(h.reflector.calls(), 2);
    }

    #[test]
    fn test_null_suggestion_keeps_confident_verdict() {
        let h = harness(
            chunks(),
            &["fixed answer", "unused"],
            vec![r#"{"overall_confidence": 0.9, "should_retry": false, "retry_suggestion": null}"#
                .to_string()],
        );

        let result = h
            .answer_loop
            .answer(&AnswerRequest::new("What is osmosis?").with_threshold(0.6))
            .unwrap();

        assert!(result.accepted);
        assert_eq!(result.iterations, 1);
        assert!((result.confidence - 0.9).abs() < 1e-6);
        assert_eq!(h.generator.calls(), 1);
    }

    #[test]
    fn test_suggestion_revises_query_without_retry_flag() {
        let h = harness(
            chunks(),
            &["a", "b"],
            vec![r#"{"overall_confidence": 0.1, "retry_suggestion": "revised"}"#.to_string()],
        );
        h.answer_loop
            .answer(&AnswerRequest::new("q").with_max_iterations(2))
            .unwrap();
        assert_eq!(h.source.queries(), vec!["q", "revised"]);
    }

    #[test]
    fn test_single_iteration_skips_reflection() {
        let h = harness(chunks(), &["only answer"], vec![verdict(0.9, "")]);
        let result = h
            .answer_loop
            .answer(&AnswerRequest::new("q").with_max_iterations(1))
            .unwrap();

        assert_eq!(h.reflector.calls(), 0);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.accepted);
    }

    #[test]
    fn test_no_context_short_circuits() {
        let h = harness(Vec::new(), &["unused"], vec![verdict(0.9, "")]);
        let result = h.answer_loop.answer(&AnswerRequest::new("q")).unwrap();

        assert_eq!(result.answer, NO_CONTEXT_ANSWER);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.chunks_used, 0);
        assert!(result.citations.is_empty());
        assert_eq!(h.generator.calls(), 0);
    }

    #[test]
    fn test_unparseable_reflection_uses_default_verdict() {
        // default confidence 0.5 is below 0.6, so the loop continues
        let h = harness(chunks(), &["a", "b"], vec!["I think it's fine".to_string()]);
        let result = h
            .answer_loop
            .answer(&AnswerRequest::new("q").with_max_iterations(2))
            .unwrap();
        assert_eq!(result.iterations, 2);
        assert!((result.confidence - 0.5).abs() < 1e-6);

        // ...and accepted at a threshold of 0.5
        let h = harness(chunks(), &["a"], vec!["garbage".to_string()]);
        let result = h
            .answer_loop
            .answer(&AnswerRequest::new("q").with_threshold(0.5))
            .unwrap();
        assert!(result.accepted);
    }

    #[test]
    fn test_best_confidence_reported_on_exhaustion() {
        let h = harness(
            chunks(),
            &["a", "b", "c"],
            vec![verdict(0.4, ""), verdict(0.2, "")],
        );
        let result = h
            .answer_loop
            .answer(&AnswerRequest::new("q").with_max_iterations(3))
            .unwrap();
        assert_eq!(result.answer, "c");
        assert!((result.confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_generation_failure_surfaces() {
        let source = StubSource::new(chunks());
        let answer_loop = AnswerLoop::new(
            source,
            Arc::new(ScriptedCompletion::failing("connection refused")),
            Arc::new(ScriptedCompletion::new([verdict(0.9, "")])),
        );
        assert!(matches!(
            answer_loop.answer(&AnswerRequest::new("q")),
            Err(IrraError::Completion { .. })
        ));
    }

    #[test]
    fn test_contract_errors() {
        let h = harness(chunks(), &["a"], vec![verdict(0.9, "")]);
        for request in [
            AnswerRequest::new("q").with_max_iterations(0),
            AnswerRequest::new("q").with_threshold(1.5),
            AnswerRequest::new("q").with_threshold(-0.1),
            AnswerRequest::new(" "),
        ] {
            assert!(matches!(
                h.answer_loop.answer(&request),
                Err(IrraError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_citations_follow_returned_chunks() {
        let h = harness(chunks(), &["a"], vec![verdict(0.95, "")]);
        let result = h.answer_loop.answer(&AnswerRequest::new("q")).unwrap();
        assert_eq!(
            result.citations,
            vec!["📄 week3.pdf, Page 4", "📄 week3.pdf, Page 5"]
        );
        assert!(result.citations_block().contains("Sources Used"));
    }

    #[test]
    fn test_verdict_parsing() {
        let v = ReflectionVerdict::parse("```json\n{\"overall_confidence\": 1.7}\n```").unwrap();
        assert_eq!(v.overall_confidence, 1.0);
        assert!(!v.should_retry);

        let v = ReflectionVerdict::parse(&verdict(0.3, "ask about osmotic pressure")).unwrap();
        assert_eq!(v.retry_query(), Some("ask about osmotic pressure"));

        assert!(ReflectionVerdict::parse("[1, 2]").is_none());

        let v = ReflectionVerdict::parse(
            r#"{"overall_confidence": 0.8, "should_retry": null, "retry_suggestion": null}"#,
        )
        .unwrap();
        assert!((v.overall_confidence - 0.8).abs() < 1e-6);
        assert!(!v.should_retry);
        assert_eq!(v.retry_query(), None);

        let v = ReflectionVerdict::parse(r#"{"overall_confidence": "high", "retry_suggestion": "  "}"#)
            .unwrap();
        assert_eq!(v.overall_confidence, 0.5);
        assert_eq!(v.retry_query(), None);

        let v = ReflectionVerdict::parse(r#"{"should_retry": true, "retry_suggestion": "x"}"#).unwrap();
        assert_eq!(v.overall_confidence, 0.5);
        assert_eq!(v.retry_query(), Some("x"));
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let h = harness(chunks(), &["a"], vec![verdict(0.9, "")]);
        let result = h.answer_loop.answer(&AnswerRequest::new("q")).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("chunksUsed").is_some());
        assert!(json.get("citationChunks").is_some());
    }
}
