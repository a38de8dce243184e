//! Per-session chat state: variant, live controls and the conversation log.

use std::fmt;
use std::str::FromStr;

use ai_llm_service::ModelCatalog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cfg::{CHAT_MESSAGES_RANGE, ContextorConfig, RETRIEVED_CHUNKS_RANGE, check_range};
use crate::conversation::ConversationLog;
use crate::error::ContextorError;
use crate::retrieve::ServiceDescriptor;

/// Which chat flavour a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatVariant {
    /// Question only.
    Generic,
    /// Question plus a trailing window of prior turns.
    WithHistory,
    /// History, document retrieval and answer aggregation.
    Rag,
}

impl ChatVariant {
    pub fn supports_history(self) -> bool {
        matches!(self, ChatVariant::WithHistory | ChatVariant::Rag)
    }

    pub fn supports_retrieval(self) -> bool {
        self == ChatVariant::Rag
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChatVariant::Generic => "generic",
            ChatVariant::WithHistory => "with_history",
            ChatVariant::Rag => "rag",
        }
    }
}

impl fmt::Display for ChatVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatVariant {
    type Err = ContextorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "generic" => Ok(ChatVariant::Generic),
            "with_history" | "history" => Ok(ChatVariant::WithHistory),
            "rag" => Ok(ChatVariant::Rag),
            other => Err(ContextorError::invalid(
                "variant",
                format!("unknown chat variant `{other}`"),
            )),
        }
    }
}

/// Current value of every user-facing control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub selected_service: Option<String>,
    pub debug: bool,
    pub use_chat_history: bool,
    pub model_generic: String,
    pub model_service: String,
    pub model_aggregation: String,
    pub model_summary: String,
    pub num_retrieved_chunks: u32,
    pub num_chat_messages: usize,
}

impl SessionConfig {
    /// Startup values: first catalog model for direct and RAG answers, the
    /// second (or last) for aggregation and summary, first service selected.
    pub fn defaults(
        catalog: &ModelCatalog,
        cfg: &ContextorConfig,
        services: &[ServiceDescriptor],
    ) -> Self {
        Self {
            selected_service: services.first().map(|s| s.name.clone()),
            debug: cfg.debug,
            use_chat_history: cfg.use_chat_history,
            model_generic: catalog.at_or_last(0).to_string(),
            model_service: catalog.at_or_last(0).to_string(),
            model_aggregation: catalog.at_or_last(1).to_string(),
            model_summary: catalog.at_or_last(1).to_string(),
            num_retrieved_chunks: cfg.num_retrieved_chunks,
            num_chat_messages: cfg.num_chat_messages,
        }
    }
}

/// Partial config update; absent fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigPatch {
    pub selected_service: Option<String>,
    pub debug: Option<bool>,
    pub use_chat_history: Option<bool>,
    pub model_generic: Option<String>,
    pub model_service: Option<String>,
    pub model_aggregation: Option<String>,
    pub model_summary: Option<String>,
    pub num_retrieved_chunks: Option<u32>,
    pub num_chat_messages: Option<usize>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Lives from connect until disconnect; never shared between users.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    variant: ChatVariant,
    config: SessionConfig,
    log: ConversationLog,
    services: Vec<ServiceDescriptor>,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(variant: ChatVariant, config: SessionConfig, services: Vec<ServiceDescriptor>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            variant,
            config,
            log: ConversationLog::new(),
            services,
            created_at: now,
            last_active: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn variant(&self) -> ChatVariant {
        self.variant
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub(crate) fn log_mut(&mut self) -> &mut ConversationLog {
        &mut self.log
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// RAG chat needs at least one search service.
    pub fn chat_enabled(&self) -> bool {
        !self.variant.supports_retrieval() || !self.services.is_empty()
    }

    pub fn selected_service(&self) -> Option<&ServiceDescriptor> {
        let name = self.config.selected_service.as_deref()?;
        self.services.iter().find(|s| s.name == name)
    }

    pub fn clear_conversation(&mut self) {
        self.log.clear();
        self.touch();
    }

    /// Validates the whole patch first; a rejected patch changes nothing.
    pub fn apply_patch(
        &mut self,
        patch: ConfigPatch,
        catalog: &ModelCatalog,
    ) -> Result<&SessionConfig, ContextorError> {
        let v = self.variant;
        let mut next = self.config.clone();

        if let Some(name) = patch.selected_service {
            require(v.supports_retrieval(), "selected_service", v)?;
            if !self.services.iter().any(|s| s.name == name) {
                return Err(ContextorError::UnknownService(name));
            }
            next.selected_service = Some(name);
        }
        if let Some(debug) = patch.debug {
            next.debug = debug;
        }
        if let Some(on) = patch.use_chat_history {
            require(v.supports_history(), "use_chat_history", v)?;
            next.use_chat_history = on;
        }
        if let Some(m) = patch.model_generic {
            next.model_generic = known_model("model_generic", m, catalog)?;
        }
        if let Some(m) = patch.model_service {
            require(v.supports_retrieval(), "model_service", v)?;
            next.model_service = known_model("model_service", m, catalog)?;
        }
        if let Some(m) = patch.model_aggregation {
            require(v.supports_retrieval(), "model_aggregation", v)?;
            next.model_aggregation = known_model("model_aggregation", m, catalog)?;
        }
        if let Some(m) = patch.model_summary {
            require(v.supports_retrieval(), "model_summary", v)?;
            next.model_summary = known_model("model_summary", m, catalog)?;
        }
        if let Some(n) = patch.num_retrieved_chunks {
            require(v.supports_retrieval(), "num_retrieved_chunks", v)?;
            check_range("num_retrieved_chunks", n, &RETRIEVED_CHUNKS_RANGE)?;
            next.num_retrieved_chunks = n;
        }
        if let Some(n) = patch.num_chat_messages {
            require(v.supports_history(), "num_chat_messages", v)?;
            check_range("num_chat_messages", n, &CHAT_MESSAGES_RANGE)?;
            next.num_chat_messages = n;
        }

        self.config = next;
        self.touch();
        Ok(&self.config)
    }
}

fn require(available: bool, control: &'static str, variant: ChatVariant) -> Result<(), ContextorError> {
    if available {
        Ok(())
    } else {
        Err(ContextorError::ControlUnavailable { control, variant })
    }
}

fn known_model(
    field: &'static str,
    model: String,
    catalog: &ModelCatalog,
) -> Result<String, ContextorError> {
    if catalog.contains(&model) {
        Ok(model)
    } else {
        Err(ContextorError::invalid(
            field,
            format!("model `{model}` is not offered"),
        ))
    }
}
