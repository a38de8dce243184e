use chrono::{DateTime, Utc};
use contextor::{ChatSession, ChatVariant, ConversationTurn, ServiceDescriptor, SessionConfig};
use serde::Serialize;
use uuid::Uuid;

/// Everything a client needs to render a session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub variant: ChatVariant,
    /// False for RAG chat without any search service.
    pub chat_enabled: bool,
    pub config: SessionConfig,
    pub services: Vec<ServiceDescriptor>,
    pub messages: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl From<&ChatSession> for SessionView {
    fn from(s: &ChatSession) -> Self {
        Self {
            id: s.id(),
            variant: s.variant(),
            chat_enabled: s.chat_enabled(),
            config: s.config().clone(),
            services: s.services().to_vec(),
            messages: s.log().turns().to_vec(),
            created_at: s.created_at(),
            last_active: s.last_active(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionDeleted {
    pub id: Uuid,
}
