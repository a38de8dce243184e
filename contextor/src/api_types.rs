//! Public turn results re-used by external crates (e.g., the HTTP API layer).

use serde::{Deserialize, Serialize};

/// What one turn produced.
///
/// # Example
/// ```
/// use contextor::TurnOutcome;
/// let out = TurnOutcome { answer: "Mae and Osha are twins.".into(), debug: None };
/// assert!(out.debug.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Final assistant message, also appended to the log.
    pub answer: String,
    /// Intermediate values, present only when the session's debug flag is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<TurnDebug>,
}

/// Intermediate values of a turn, for the debug panel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnDebug {
    /// Turns given to the prompts as history.
    pub history_len: usize,
    /// History-to-query rewrite, when one was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_summary: Option<String>,
    /// Text sent to the search service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_query: Option<String>,
    /// Context block handed to the RAG prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_answer: Option<String>,
}
