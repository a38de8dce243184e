use serde::Deserialize;

/// Body of POST /sessions/{id}/messages.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AskRequest {
    /// Natural language question.
    pub question: String,
}
