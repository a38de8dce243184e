//! In-memory session registry.
//!
//! Each session has two locks. The turn gate serializes writers (turns,
//! config patches, clears) for the whole operation. The state lock is only
//! held for a copy or a swap, so reads never wait on a remote call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use contextor::ChatSession;
use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

pub type SharedSession = Arc<SessionSlot>;

#[derive(Debug)]
pub struct SessionSlot {
    turn: Mutex<()>,
    state: RwLock<ChatSession>,
}

/// Exclusive writer access; other writers wait, readers see the last commit.
pub struct SessionWriter<'a> {
    slot: &'a SessionSlot,
    _gate: MutexGuard<'a, ()>,
}

impl SessionSlot {
    fn new(session: ChatSession) -> Self {
        Self {
            turn: Mutex::new(()),
            state: RwLock::new(session),
        }
    }

    /// Last committed state.
    pub async fn read(&self) -> RwLockReadGuard<'_, ChatSession> {
        self.state.read().await
    }

    /// Waits for any running turn, then claims the gate.
    pub async fn writer(&self) -> SessionWriter<'_> {
        SessionWriter {
            slot: self,
            _gate: self.turn.lock().await,
        }
    }

    fn is_busy(&self) -> bool {
        self.turn.try_lock().is_err()
    }
}

impl SessionWriter<'_> {
    /// Working copy for a long operation; publish it with [`Self::commit`].
    pub async fn checkout(&self) -> ChatSession {
        self.slot.state.read().await.clone()
    }

    pub async fn commit(&self, session: ChatSession) {
        *self.slot.state.write().await = session;
    }

    /// Short in-place mutation.
    pub async fn update<R>(&self, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        f(&mut *self.slot.state.write().await)
    }
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub async fn insert(&self, session: ChatSession) -> SharedSession {
        let id = session.id();
        let shared = Arc::new(SessionSlot::new(session));
        self.sessions.write().await.insert(id, shared.clone());
        shared
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle for longer than the TTL.
    ///
    /// A session whose turn gate is held is mid-turn and never idle.
    pub async fn sweep_idle(&self) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(self.idle_ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
        else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| {
            if s.is_busy() {
                return true;
            }
            match s.state.try_read() {
                Ok(session) => session.last_active() >= cutoff,
                Err(_) => true,
            }
        });
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "idle sessions discarded");
        }
        removed
    }

    /// Background sweep, every quarter TTL (at least once a second).
    pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        let period = (self.idle_ttl / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            loop {
                tick.tick().await;
                let removed = self.sweep_idle().await;
                debug!(removed, "session sweep");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use ai_llm_service::ModelCatalog;
    use contextor::{ChatVariant, ContextorConfig, SessionConfig};

    use super::*;

    fn session() -> ChatSession {
        let cfg = SessionConfig::defaults(
            &ModelCatalog::cortex_default(),
            &ContextorConfig::default(),
            &[],
        );
        ChatSession::new(ChatVariant::Generic, cfg, Vec::new())
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let store = SessionStore::new(Duration::from_secs(60));
        let s = session();
        let id = s.id();
        store.insert(s).await;
        assert!(store.get(id).await.is_some());
        assert!(store.remove(id).await);
        assert!(!store.remove(id).await);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn sweep_keeps_fresh_and_busy_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.insert(session()).await;
        assert_eq!(store.sweep_idle().await, 0);

        let zero = SessionStore::new(Duration::ZERO);
        let busy = zero.insert(session()).await;
        let _writer = busy.writer().await;
        zero.insert(session()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(zero.sweep_idle().await, 1);
        assert_eq!(zero.len().await, 1);
    }

    #[tokio::test]
    async fn reads_do_not_wait_for_the_turn_gate() {
        let store = SessionStore::new(Duration::from_secs(60));
        let slot = store.insert(session()).await;
        let short = Duration::from_millis(50);

        let writer = slot.writer().await;
        assert!(slot.is_busy());
        assert!(tokio::time::timeout(short, slot.read()).await.is_ok());
        assert!(tokio::time::timeout(short, slot.writer()).await.is_err());

        let mut working = writer.checkout().await;
        working.clear_conversation();
        let id = working.id();
        writer.commit(working).await;
        drop(writer);

        assert!(!slot.is_busy());
        assert_eq!(slot.read().await.id(), id);
    }
}
