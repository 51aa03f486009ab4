use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;

use parley_core::context::{ContextManager, Exchange};
use parley_core::errors::ContextError;
use parley_core::ids::SessionId;

use crate::error::ChatError;

struct SessionState {
    context: ContextManager,
    last_active: Instant,
}

/// One conversation: a context manager behind its own lock.
///
/// Every method takes the lock for the duration of a single in-memory
/// operation only, so callers never hold it across generation.
pub struct Session {
    id: SessionId,
    state: Mutex<SessionState>,
}

impl Session {
    fn new(id: SessionId, context: ContextManager) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState {
                context,
                last_active: Instant::now(),
            }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn compose_prompt(&self, message: &str) -> String {
        let mut state = self.state.lock();
        state.last_active = Instant::now();
        state.context.compose_prompt(message)
    }

    pub fn record_exchange(&self, user_message: &str, bot_reply: &str) {
        let mut state = self.state.lock();
        state.last_active = Instant::now();
        state.context.record_exchange(user_message, bot_reply);
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.state.lock().context.exchanges()
    }

    pub fn entries(&self) -> Vec<String> {
        self.state.lock().context.entries().to_vec()
    }

    pub fn len(&self) -> usize {
        self.state.lock().context.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().context.is_empty()
    }

    pub fn idle_for(&self) -> Duration {
        self.state.lock().last_active.elapsed()
    }
}

/// Live conversations keyed by session id.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    template: ContextManager,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(window: usize, max_sessions: usize) -> Result<Self, ContextError> {
        Ok(Self {
            sessions: DashMap::new(),
            template: ContextManager::with_window(window)?,
            max_sessions,
        })
    }

    pub fn window(&self) -> usize {
        self.template.window()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Look up a session, creating an empty one on first use.
    ///
    /// The session cap is checked before insertion without a global lock,
    /// so concurrent first requests may briefly overshoot it. The shared
    /// session is never refused.
    pub fn get_or_create(&self, id: &SessionId) -> Result<Arc<Session>, ChatError> {
        if let Some(session) = self.sessions.get(id) {
            return Ok(Arc::clone(&session));
        }

        if *id != SessionId::shared() && self.sessions.len() >= self.max_sessions {
            tracing::warn!(limit = self.max_sessions, "session limit reached");
            return Err(ChatError::TooManySessions {
                limit: self.max_sessions,
            });
        }

        let session = self
            .sessions
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::info!(session_id = %id, "session created");
                Arc::new(Session::new(id.clone(), self.template.clone()))
            })
            .clone();
        Ok(session)
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|s| Arc::clone(&s))
    }

    pub fn remove(&self, id: &SessionId) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for at least `max_idle`. Returns how many were removed.
    ///
    /// The shared session lives as long as the registry.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let shared = SessionId::shared();
        let mut removed = 0;
        self.sessions.retain(|id, session| {
            let keep = *id == shared || session.idle_for() < max_idle;
            if !keep {
                tracing::debug!(session_id = %id, "evicting idle session");
                removed += 1;
            }
            keep
        });
        removed
    }
}

/// Periodically evict idle sessions.
pub fn start_cleanup_task(
    registry: Arc<SessionRegistry>,
    interval: Duration,
    max_idle: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = registry.evict_idle(max_idle);
            if removed > 0 {
                tracing::info!(removed = removed, remaining = registry.len(), "Idle session cleanup");
            }
        }
    })
}
