//! Turn orchestration: one user question in, one assistant answer out.
//!
//! Generic and history chats make a single completion. RAG chat runs, in
//! order and never concurrently:
//! 1. generic answer on the bare question
//! 2. history-to-query rewrite (only with non-empty history)
//! 3. search on the selected service
//! 4. answer grounded in the retrieved context
//! 5. aggregation of answers 1 and 4
//!
//! Any failure aborts the turn before the assistant message is logged.

use std::sync::Arc;
use std::time::Instant;

use ai_llm_service::{Completion, HealthStatus, LlmService, ModelCatalog};
use snowflake_api::{CortexSearchClient, SnowflakeConfig, SqlApiClient};
use tracing::{debug, info, instrument, warn};

use crate::api_types::{TurnDebug, TurnOutcome};
use crate::cfg::ContextorConfig;
use crate::conversation::{ConversationTurn, TurnRole};
use crate::error::ContextorError;
use crate::progress::Progress;
use crate::prompt;
use crate::retrieve::{CortexSearchBackend, SearchBackend, build_context_block};
use crate::session::{ChatSession, ChatVariant, SessionConfig};

/// Shared, stateless-per-user chat core. Wrap in `Arc` and hand out clones.
pub struct ChatEngine {
    llm: Arc<dyn Completion>,
    search: Option<Arc<dyn SearchBackend>>,
    cfg: ContextorConfig,
}

impl ChatEngine {
    pub fn new(
        llm: Arc<dyn Completion>,
        search: Option<Arc<dyn SearchBackend>>,
        cfg: ContextorConfig,
    ) -> Self {
        Self { llm, search, cfg }
    }

    /// Wires the engine from the environment.
    ///
    /// With Snowflake credentials present, completions may go through Cortex
    /// and RAG sessions search `SEARCH_DATABASE.SEARCH_SCHEMA`. Without them
    /// only the HTTP providers work and RAG chat opens disabled.
    ///
    /// # Errors
    /// Invalid chat, provider or Snowflake settings.
    pub fn from_env() -> Result<Self, ContextorError> {
        let cfg = ContextorConfig::from_env()?;
        let sql = if SnowflakeConfig::is_configured() {
            Some(SqlApiClient::new(SnowflakeConfig::from_env()?)?)
        } else {
            warn!("SNOWFLAKE_ACCOUNT_URL/SNOWFLAKE_TOKEN not set; search is unavailable");
            None
        };

        let llm = LlmService::from_env(sql.clone())?;
        info!(provider = ?llm.provider(), models = llm.catalog().models().len(), "completion backend ready");

        let search = sql.map(|sql| {
            Arc::new(CortexSearchBackend::new(
                CortexSearchClient::new(sql),
                cfg.search_database.clone(),
                cfg.search_schema.clone(),
            )) as Arc<dyn SearchBackend>
        });
        Ok(Self::new(Arc::new(llm), search, cfg))
    }

    pub fn catalog(&self) -> &ModelCatalog {
        self.llm.catalog()
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    pub async fn health(&self) -> Vec<HealthStatus> {
        self.llm.health().await
    }

    /// Opens a session. RAG sessions enumerate search services once, here.
    ///
    /// Without a search backend the list is empty and RAG chat stays disabled.
    #[instrument(skip(self))]
    pub async fn new_session(
        &self,
        variant: Option<ChatVariant>,
    ) -> Result<ChatSession, ContextorError> {
        let variant = variant.unwrap_or(self.cfg.variant);
        let services = match (&self.search, variant.supports_retrieval()) {
            (Some(search), true) => search.list_services().await?,
            (None, true) => {
                warn!("no search backend configured; RAG chat is disabled");
                Vec::new()
            }
            (_, false) => Vec::new(),
        };

        let config = SessionConfig::defaults(self.catalog(), &self.cfg, &services);
        let session = ChatSession::new(variant, config, services);
        info!(
            session = %session.id(),
            %variant,
            services = session.services().len(),
            chat_enabled = session.chat_enabled(),
            "session created"
        );
        Ok(session)
    }

    /// Runs one turn against `session`.
    ///
    /// The user message is logged before any remote call; the assistant
    /// message only after every call succeeded.
    ///
    /// # Errors
    /// - [`ContextorError::ChatDisabled`] for RAG chat without services
    /// - [`ContextorError::EmptyQuestion`] for blank input
    /// - [`ContextorError::Llm`] / [`ContextorError::Search`] from remote calls
    #[instrument(skip_all, fields(session = %session.id(), variant = %session.variant()))]
    pub async fn ask(
        &self,
        session: &mut ChatSession,
        question: &str,
        progress: &dyn Progress,
    ) -> Result<TurnOutcome, ContextorError> {
        if !session.chat_enabled() {
            return Err(ContextorError::ChatDisabled);
        }
        if question.trim().is_empty() {
            return Err(ContextorError::EmptyQuestion);
        }

        session.log_mut().push(TurnRole::User, question);
        session.touch();

        let started = Instant::now();
        let prompt_question = question.replace('\'', "");
        let cfg = session.config().clone();
        let history: Vec<ConversationTurn> =
            if session.variant().supports_history() && cfg.use_chat_history {
                session.log().history_window(cfg.num_chat_messages).to_vec()
            } else {
                Vec::new()
            };

        progress.message("Thinking...");
        let result = match session.variant() {
            ChatVariant::Generic => {
                self.single_answer(&cfg, &prompt_question, None, progress)
                    .await
            }
            ChatVariant::WithHistory => {
                self.single_answer(&cfg, &prompt_question, Some(&history), progress)
                    .await
            }
            ChatVariant::Rag => {
                self.aggregated_answer(session, &cfg, &prompt_question, &history, progress)
                    .await
            }
        };

        let (answer, mut dbg) = match result {
            Ok(v) => v,
            Err(e) => {
                progress.finish("failed");
                warn!(error = %e, latency_ms = started.elapsed().as_millis(), "turn aborted");
                return Err(e);
            }
        };
        dbg.history_len = history.len();

        session.log_mut().push(TurnRole::Assistant, answer.as_str());
        session.touch();
        progress.finish("done");
        info!(
            latency_ms = started.elapsed().as_millis(),
            answer_len = answer.len(),
            "turn completed"
        );

        Ok(TurnOutcome {
            answer,
            debug: cfg.debug.then_some(dbg),
        })
    }

    async fn single_answer(
        &self,
        cfg: &SessionConfig,
        question: &str,
        history: Option<&[ConversationTurn]>,
        progress: &dyn Progress,
    ) -> Result<(String, TurnDebug), ContextorError> {
        progress.step("answering");
        let answer = self
            .llm
            .complete(&cfg.model_generic, &prompt::generic_prompt(question, history))
            .await?;
        Ok((answer, TurnDebug::default()))
    }

    async fn aggregated_answer(
        &self,
        session: &ChatSession,
        cfg: &SessionConfig,
        question: &str,
        history: &[ConversationTurn],
        progress: &dyn Progress,
    ) -> Result<(String, TurnDebug), ContextorError> {
        let search = self.search.as_ref().ok_or(ContextorError::ChatDisabled)?;
        let service = session
            .selected_service()
            .ok_or(ContextorError::ChatDisabled)?;

        progress.step("generic answer");
        let generic = self
            .llm
            .complete(
                &cfg.model_generic,
                &prompt::generic_prompt(question, Some(history)),
            )
            .await?;

        let summary = if cfg.use_chat_history && !history.is_empty() {
            progress.step("summarizing chat history");
            let s = self
                .llm
                .complete(
                    &cfg.model_summary,
                    &prompt::history_query_prompt(history, question),
                )
                .await?;
            Some(s)
        } else {
            None
        };
        let query = summary.as_deref().unwrap_or(question);

        progress.step("searching documents");
        let records = search
            .search(service, query, cfg.num_retrieved_chunks)
            .await?;
        let context = build_context_block(
            &records,
            &service.search_column,
            cfg.num_retrieved_chunks as usize,
        );
        debug!(
            service = %service.name,
            records = records.len(),
            context_len = context.len(),
            "context assembled"
        );

        progress.step("answering with context");
        let specialized = self
            .llm
            .complete(
                &cfg.model_service,
                &prompt::rag_prompt(question, history, &context),
            )
            .await?;

        progress.step("aggregating answers");
        let answer = self
            .llm
            .complete(
                &cfg.model_aggregation,
                &prompt::aggregation_prompt(question, history, &generic, &specialized),
            )
            .await?;

        let dbg = TurnDebug {
            history_len: 0,
            retrieval_query: Some(query.to_string()),
            history_summary: summary,
            context: Some(context),
            generic_answer: Some(generic),
            service_answer: Some(specialized),
        };
        Ok((answer, dbg))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use ai_llm_service::{AiLlmError, ConfigError};
    use serde_json::{Value, json};
    use snowflake_api::SearchRecord;

    use super::*;
    use crate::progress::NoopProgress;
    use crate::retrieve::ServiceDescriptor;
    use crate::session::ConfigPatch;

    /// Records every call and answers from a script keyed by prompt content.
    struct FakeLlm {
        catalog: ModelCatalog,
        calls: Mutex<Vec<(String, String)>>,
        fail_on: Option<&'static str>,
    }

    impl FakeLlm {
        fn new() -> Self {
            Self {
                catalog: ModelCatalog::cortex_default(),
                calls: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(marker: &'static str) -> Self {
            Self {
                fail_on: Some(marker),
                ..Self::new()
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Completion for FakeLlm {
        async fn complete(&self, model: &str, prompt: &str) -> Result<String, AiLlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            if self.fail_on.is_some_and(|m| prompt.contains(m)) {
                return Err(ConfigError::UnknownModel(model.to_string()).into());
            }
            let answer = if prompt.starts_with("Based on the chat history") {
                "rewritten query"
            } else if prompt.contains("<answer_a>") {
                "merged"
            } else if prompt.contains("<context>") {
                "grounded"
            } else {
                "direct"
            };
            Ok(answer.to_string())
        }

        fn catalog(&self) -> &ModelCatalog {
            &self.catalog
        }
    }

    struct FakeSearch {
        services: Vec<ServiceDescriptor>,
        records: Vec<SearchRecord>,
        queries: Mutex<Vec<(String, String, u32)>>,
    }

    impl FakeSearch {
        fn with_records(n: usize) -> Self {
            let records = (1..=n)
                .map(|i| match json!({ "CHUNK": format!("doc {i}") }) {
                    Value::Object(m) => m,
                    _ => unreachable!(),
                })
                .collect();
            Self {
                services: vec![ServiceDescriptor {
                    name: "PLOT_SEARCH".into(),
                    search_column: "CHUNK".into(),
                }],
                records,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self {
                services: vec![],
                ..Self::with_records(0)
            }
        }
    }

    #[async_trait]
    impl SearchBackend for FakeSearch {
        async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, ContextorError> {
            Ok(self.services.clone())
        }

        async fn search(
            &self,
            service: &ServiceDescriptor,
            query: &str,
            limit: u32,
        ) -> Result<Vec<SearchRecord>, ContextorError> {
            self.queries
                .lock()
                .unwrap()
                .push((service.name.clone(), query.to_string(), limit));
            Ok(self.records.clone())
        }
    }

    fn engine(llm: Arc<FakeLlm>, search: Option<Arc<FakeSearch>>) -> ChatEngine {
        let search = search.map(|s| s as Arc<dyn SearchBackend>);
        ChatEngine::new(llm, search, ContextorConfig::default())
    }

    #[tokio::test]
    async fn generic_turn_is_one_call_without_history_block() {
        let llm = Arc::new(FakeLlm::new());
        let eng = engine(llm.clone(), None);
        let mut s = eng.new_session(Some(ChatVariant::Generic)).await.unwrap();

        let out = eng.ask(&mut s, "Who's Sol?", &NoopProgress).await.unwrap();
        assert_eq!(out.answer, "direct");
        assert!(out.debug.is_some());

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "llama3.1-70b");
        assert!(calls[0].1.contains("<question>\nWhos Sol?\n</question>"));
        assert!(!calls[0].1.contains("<chat_history>"));

        let turns = s.log().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "Who's Sol?");
        assert_eq!(turns[1].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn history_turn_embeds_previous_turns() {
        let llm = Arc::new(FakeLlm::new());
        let eng = engine(llm.clone(), None);
        let mut s = eng.new_session(Some(ChatVariant::WithHistory)).await.unwrap();

        eng.ask(&mut s, "Q1", &NoopProgress).await.unwrap();
        eng.ask(&mut s, "Q2", &NoopProgress).await.unwrap();

        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].1.contains("<chat_history>\nuser: Q1\nassistant: direct\n</chat_history>"));
    }

    #[tokio::test]
    async fn history_toggle_off_renders_empty_block() {
        let llm = Arc::new(FakeLlm::new());
        let eng = engine(llm.clone(), None);
        let mut s = eng.new_session(Some(ChatVariant::WithHistory)).await.unwrap();
        let patch = ConfigPatch {
            use_chat_history: Some(false),
            ..ConfigPatch::default()
        };
        s.apply_patch(patch, eng.catalog()).unwrap();

        eng.ask(&mut s, "Q1", &NoopProgress).await.unwrap();
        eng.ask(&mut s, "Q2", &NoopProgress).await.unwrap();
        assert!(llm.calls()[1].1.contains("<chat_history>\n\n</chat_history>"));
    }

    #[tokio::test]
    async fn rag_first_turn_runs_three_calls_in_order() {
        let llm = Arc::new(FakeLlm::new());
        let search = Arc::new(FakeSearch::with_records(5));
        let eng = engine(llm.clone(), Some(search.clone()));
        let mut s = eng.new_session(Some(ChatVariant::Rag)).await.unwrap();
        let patch = ConfigPatch {
            num_retrieved_chunks: Some(3),
            ..ConfigPatch::default()
        };
        s.apply_patch(patch, eng.catalog()).unwrap();

        let out = eng.ask(&mut s, "Who is Mae?", &NoopProgress).await.unwrap();
        assert_eq!(out.answer, "merged");

        let calls = llm.calls();
        let models: Vec<_> = calls.iter().map(|c| c.0.as_str()).collect();
        assert_eq!(models, ["llama3.1-70b", "llama3.1-70b", "mistral-large2"]);
        assert!(calls[1].1.contains("Context document 3: doc 3"));
        assert!(!calls[1].1.contains("Context document 4"));
        assert!(calls[2].1.contains("<answer_a>\ndirect\n</answer_a>"));
        assert!(calls[2].1.contains("<answer_b>\ngrounded\n</answer_b>"));

        let queries = search.queries.lock().unwrap().clone();
        assert_eq!(queries, [("PLOT_SEARCH".to_string(), "Who is Mae?".to_string(), 3)]);

        let dbg = out.debug.unwrap();
        assert_eq!(dbg.history_summary, None);
        assert_eq!(dbg.generic_answer.as_deref(), Some("direct"));
        assert_eq!(dbg.service_answer.as_deref(), Some("grounded"));
    }

    #[tokio::test]
    async fn rag_with_history_rewrites_the_search_query() {
        let llm = Arc::new(FakeLlm::new());
        let search = Arc::new(FakeSearch::with_records(1));
        let eng = engine(llm.clone(), Some(search.clone()));
        let mut s = eng.new_session(Some(ChatVariant::Rag)).await.unwrap();

        eng.ask(&mut s, "Who is Mae?", &NoopProgress).await.unwrap();
        let out = eng.ask(&mut s, "And her sister?", &NoopProgress).await.unwrap();

        let calls = llm.calls();
        assert_eq!(calls.len(), 7);
        assert_eq!(calls[4].0, "mistral-large2");
        assert!(calls[4].1.starts_with("Based on the chat history"));

        let queries = search.queries.lock().unwrap().clone();
        assert_eq!(queries[1].1, "rewritten query");
        assert_eq!(
            out.debug.unwrap().retrieval_query.as_deref(),
            Some("rewritten query")
        );
    }

    #[tokio::test]
    async fn rag_without_services_is_disabled() {
        let llm = Arc::new(FakeLlm::new());
        let eng = engine(llm.clone(), Some(Arc::new(FakeSearch::empty())));
        let mut s = eng.new_session(Some(ChatVariant::Rag)).await.unwrap();
        assert!(!s.chat_enabled());

        let err = eng.ask(&mut s, "Q", &NoopProgress).await.unwrap_err();
        assert!(matches!(err, ContextorError::ChatDisabled));
        assert!(s.log().is_empty());
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_call_aborts_turn_without_assistant_message() {
        let llm = Arc::new(FakeLlm::failing_on("<context>"));
        let eng = engine(llm.clone(), Some(Arc::new(FakeSearch::with_records(2))));
        let mut s = eng.new_session(Some(ChatVariant::Rag)).await.unwrap();

        let err = eng.ask(&mut s, "Q", &NoopProgress).await.unwrap_err();
        assert!(err.is_upstream());
        // generic call succeeded, RAG call failed, aggregation never ran
        assert_eq!(llm.calls().len(), 2);
        let turns = s.log().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, TurnRole::User);
    }

    #[tokio::test]
    async fn failed_generic_call_skips_search_and_later_calls() {
        let llm = Arc::new(FakeLlm::failing_on("Who is Mae?"));
        let search = Arc::new(FakeSearch::with_records(2));
        let eng = engine(llm.clone(), Some(search.clone()));
        let mut s = eng.new_session(Some(ChatVariant::Rag)).await.unwrap();

        let err = eng.ask(&mut s, "Who is Mae?", &NoopProgress).await.unwrap_err();
        assert!(err.is_upstream());
        assert_eq!(llm.calls().len(), 1);
        assert!(search.queries.lock().unwrap().is_empty());
        let turns = s.log().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, TurnRole::User);
    }

    #[tokio::test]
    async fn rag_history_off_searches_raw_question_without_summary() {
        let llm = Arc::new(FakeLlm::new());
        let search = Arc::new(FakeSearch::with_records(1));
        let eng = engine(llm.clone(), Some(search.clone()));
        let mut s = eng.new_session(Some(ChatVariant::Rag)).await.unwrap();

        eng.ask(&mut s, "Who is Mae?", &NoopProgress).await.unwrap();
        let patch = ConfigPatch {
            use_chat_history: Some(false),
            ..ConfigPatch::default()
        };
        s.apply_patch(patch, eng.catalog()).unwrap();
        let out = eng.ask(&mut s, "And her sister?", &NoopProgress).await.unwrap();

        let calls = llm.calls();
        assert_eq!(calls.len(), 6);
        assert!(!calls.iter().any(|c| c.1.starts_with("Based on the chat history")));

        let queries = search.queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].1, "And her sister?");

        let empty = "<chat_history>\n\n</chat_history>";
        assert!(calls[4].1.contains("<context>"));
        assert!(calls[4].1.contains(empty));
        assert!(calls[5].1.contains("<answer_a>"));
        assert!(calls[5].1.contains(empty));

        let dbg = out.debug.unwrap();
        assert_eq!(dbg.history_len, 0);
        assert_eq!(dbg.history_summary, None);
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_logging() {
        let llm = Arc::new(FakeLlm::new());
        let eng = engine(llm, None);
        let mut s = eng.new_session(Some(ChatVariant::Generic)).await.unwrap();
        let err = eng.ask(&mut s, "   ", &NoopProgress).await.unwrap_err();
        assert!(matches!(err, ContextorError::EmptyQuestion));
        assert!(s.log().is_empty());
    }

    #[tokio::test]
    async fn debug_off_hides_intermediate_values() {
        let llm = Arc::new(FakeLlm::new());
        let eng = engine(llm, None);
        let mut s = eng.new_session(Some(ChatVariant::Generic)).await.unwrap();
        let patch = ConfigPatch {
            debug: Some(false),
            ..ConfigPatch::default()
        };
        s.apply_patch(patch, eng.catalog()).unwrap();
        let out = eng.ask(&mut s, "Q", &NoopProgress).await.unwrap();
        assert!(out.debug.is_none());
    }
}
