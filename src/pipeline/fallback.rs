//! Fallback decision logic and terminal message templates.
//!
//! The synthesizer is instructed to emit [`REFUSAL_PHRASE`] verbatim when the
//! retrieved context cannot answer the question; `should_fallback` sniffs for
//! that phrase (and the other refusal wordings models drift into), plus a
//! minimum-length heuristic for refusals phrased outside the list. The
//! refusal phrase and the trigger list must stay in sync with the synthesis
//! prompt in `synthesize.rs`.

use crate::search::SearchResult;

/// Contract string the grounded prompt instructs the model to emit when the
/// context is insufficient. Consumed by [`should_fallback`].
pub const REFUSAL_PHRASE: &str =
    "I don't have enough information to answer that based on the provided documents.";

/// Case-insensitive substrings that mark an answer as unsupported.
pub const FALLBACK_TRIGGERS: [&str; 6] = [
    "not in the document",
    "does not contain",
    "no relevant information",
    "i don't have enough information",
    "cannot answer that",
    "i do not have the required data",
];

/// Answers shorter than this (trimmed) are treated as refusals regardless of
/// wording.
pub const MIN_GROUNDED_ANSWER_LEN: usize = 30;

/// Terminal message when the search provider is not available at all.
pub const NO_ANSWER_SEARCH_UNAVAILABLE: &str = "Sorry, I couldn't find an answer in documents \
     and web search is not available. Please try rephrasing or uploading more documents.";

/// Terminal message when the search provider returned nothing usable.
pub const NO_ANSWER_MESSAGE: &str = "Sorry, I couldn't find an answer in documents or via web \
     search. Please try rephrasing or uploading more documents.";

/// Should the synthesized answer be replaced by a web-derived one?
pub fn should_fallback(answer: &str) -> bool {
    let lowered = answer.to_lowercase();
    if FALLBACK_TRIGGERS
        .iter()
        .any(|phrase| lowered.contains(phrase))
    {
        return true;
    }
    answer.trim().len() < MIN_GROUNDED_ANSWER_LEN
}

/// Short templated answer wrapping the top web result.
pub fn web_fallback_answer(result: &SearchResult) -> String {
    format!(
        "🌐 No document context matched your query, but here's something from the web:\n\n\
         *Title:* {}  \n*Snippet:* {}  \n[🔗 View Full Article]({})",
        result.title, result.snippet, result.url
    )
}
