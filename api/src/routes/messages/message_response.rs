use contextor::{ConversationTurn, TurnDebug};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AskResponse {
    /// Final assistant message.
    pub answer: String,
    /// Intermediate values when the session's debug flag is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<TurnDebug>,
    /// Log length after the turn.
    pub message_count: usize,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ConversationTurn>,
}
