//! Append-only conversation log and history windowing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One message; never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Turns in arrival order for a single session.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: TurnRole, content: impl Into<String>) -> &ConversationTurn {
        self.turns.push(ConversationTurn {
            role,
            content: content.into(),
            created_at: Utc::now(),
        });
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Up to `max` turns preceding the last one.
    ///
    /// The last entry is the question being answered, so it never belongs to
    /// its own history. Length is `min(len - 1, max)`.
    ///
    /// ```
    /// use contextor::{ConversationLog, TurnRole};
    ///
    /// let mut log = ConversationLog::new();
    /// log.push(TurnRole::User, "Q1");
    /// log.push(TurnRole::Assistant, "A1");
    /// log.push(TurnRole::User, "Q2");
    /// let window = log.history_window(20);
    /// assert_eq!(window.len(), 2);
    /// assert_eq!(window[0].content, "Q1");
    /// ```
    pub fn history_window(&self, max: usize) -> &[ConversationTurn] {
        let Some(end) = self.turns.len().checked_sub(1) else {
            return &[];
        };
        let start = end.saturating_sub(max);
        &self.turns[start..end]
    }
}

/// Renders turns as `role: content` lines for the `<chat_history>` block.
pub fn render_history(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.as_str(), t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(n: usize) -> ConversationLog {
        let mut log = ConversationLog::new();
        for i in 0..n {
            let role = if i % 2 == 0 {
                TurnRole::User
            } else {
                TurnRole::Assistant
            };
            log.push(role, format!("m{i}"));
        }
        log
    }

    #[test]
    fn window_length_is_min_of_previous_and_max() {
        for n in 0..8 {
            for w in 1..6 {
                let log = log_of(n);
                let expected = n.saturating_sub(1).min(w);
                assert_eq!(log.history_window(w).len(), expected, "n={n} w={w}");
            }
        }
    }

    #[test]
    fn window_excludes_current_question() {
        let log = log_of(5);
        let window = log.history_window(2);
        let contents: Vec<_> = window.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["m2", "m3"]);
    }

    #[test]
    fn single_entry_has_empty_window() {
        let log = log_of(1);
        assert!(log.history_window(20).is_empty());
    }

    #[test]
    fn render_keeps_arrival_order() {
        let log = log_of(3);
        assert_eq!(
            render_history(log.history_window(20)),
            "user: m0\nassistant: m1"
        );
    }

    #[test]
    fn clear_empties_log() {
        let mut log = log_of(4);
        log.clear();
        assert!(log.is_empty());
        assert!(log.history_window(5).is_empty());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(TurnRole::Assistant).unwrap();
        assert_eq!(json, "assistant");
    }
}
