//! Prompt templates for decomposition, answer generation and reflection.

/// Ask for 2-3 sub-questions as a JSON array of strings.
pub fn decomposition_prompt(query: &str) -> String {
    format!(
        "Given the following complex question, generate 2-3 simpler sub-questions \
that would help gather all the context needed to answer it comprehensively.

Original question: {query}

Respond with ONLY a JSON array of strings, e.g.:
[\"sub-question 1\", \"sub-question 2\", \"sub-question 3\"]"
    )
}

/// Grounded answer prompt. `question` is always the user's original question.
pub fn answer_prompt(context: &str, history: &str, question: &str) -> String {
    let history = if history.trim().is_empty() {
        "(none)"
    } else {
        history
    };
    format!(
        "You are IRRA, a study assistant that answers questions using ONLY the \
course materials provided below. If the materials do not contain the answer, \
say so plainly instead of guessing. Refer to the source material where it helps.

## Course materials
{context}

## Conversation so far
{history}

## Question
{question}

## Answer"
    )
}

/// Self-assessment prompt returning a JSON verdict.
pub fn reflection_prompt(chunks: &str, answer: &str) -> String {
    format!(
        "You are reviewing an answer produced from course materials. Judge whether \
every claim in the answer is supported by the materials and whether the answer \
is complete.

## Materials
{chunks}

## Answer
{answer}

Respond with ONLY a JSON object of this shape:
{{\"overall_confidence\": <number between 0 and 1>, \"should_retry\": <true|false>, \
\"retry_suggestion\": \"<a better search query, or empty>\"}}"
    )
}
