//! Chat core: conversation log, prompt templates, document retrieval and the
//! per-turn call chain.
//!
//! Entry point is [`ChatEngine`]: open a [`ChatSession`] with
//! [`ChatEngine::new_session`], then feed questions through [`ChatEngine::ask`].
//!
//! # Example
//! ```no_run
//! # use std::sync::Arc;
//! # use contextor::{ChatEngine, ChatVariant, ContextorConfig, NoopProgress};
//! # use ai_llm_service::LlmService;
//! # #[tokio::main] async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = Arc::new(LlmService::from_env(None)?);
//! let engine = ChatEngine::new(llm, None, ContextorConfig::from_env()?);
//! let mut session = engine.new_session(Some(ChatVariant::Generic)).await?;
//! let out = engine.ask(&mut session, "Who is Osha?", &NoopProgress).await?;
//! println!("{}", out.answer);
//! # Ok(()) }
//! ```

mod api_types;
mod cfg;
mod conversation;
mod engine;
mod error;
mod progress;
pub mod prompt;
mod retrieve;
mod session;

pub use api_types::{TurnDebug, TurnOutcome};
pub use cfg::{CHAT_MESSAGES_RANGE, ContextorConfig, RETRIEVED_CHUNKS_RANGE};
pub use conversation::{ConversationLog, ConversationTurn, TurnRole};
pub use engine::ChatEngine;
pub use error::ContextorError;
pub use progress::{IndicatifProgress, NoopProgress, Progress};
pub use retrieve::{CortexSearchBackend, SearchBackend, ServiceDescriptor, build_context_block};
pub use session::{ChatSession, ChatVariant, ConfigPatch, SessionConfig};
