//! Chat service: the compose → generate → record flow shared by every
//! front end (HTTP, web UI, REPL).

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use parley_core::context::Exchange;
use parley_core::generator::Generator;
use parley_core::ids::SessionId;

use crate::error::ChatError;
use crate::sessions::SessionRegistry;

/// Outcome of one exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub reply: String,
}

pub struct ChatService {
    generator: Arc<dyn Generator>,
    sessions: Arc<SessionRegistry>,
}

impl ChatService {
    pub fn new(generator: Arc<dyn Generator>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            generator,
            sessions,
        }
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Send one user message in a conversation and record the reply.
    ///
    /// The session lock is held only while composing and while recording;
    /// generation runs unlocked. If generation fails the transcript is left
    /// untouched.
    ///
    /// The exchange is recorded into the session that composed the prompt.
    /// If that session is reset or evicted while generation is in flight,
    /// the reply is still returned but the exchange is discarded along with
    /// the rest of the forgotten conversation.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn chat(&self, session_id: &SessionId, message: &str) -> Result<ChatReply, ChatError> {
        let session = self.sessions.get_or_create(session_id)?;
        let prompt = session.compose_prompt(message);

        let started = Instant::now();
        let reply = match self.generator.generate(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error_kind = e.error_kind(), error = %e, "generation failed");
                return Err(e.into());
            }
        };

        session.record_exchange(message, &reply);
        if !self
            .sessions
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(&current, &session))
        {
            debug!("session reset during generation, exchange discarded");
        }
        info!(
            prompt_chars = prompt.len(),
            reply_chars = reply.len(),
            transcript_len = session.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "exchange recorded"
        );

        Ok(ChatReply {
            session_id: session_id.clone(),
            reply,
        })
    }

    /// Transcript of a conversation, or `None` if the session doesn't exist.
    pub fn history(&self, session_id: &SessionId) -> Option<Vec<Exchange>> {
        self.sessions.get(session_id).map(|s| s.exchanges())
    }

    /// Forget a conversation. Returns whether it existed.
    pub fn reset(&self, session_id: &SessionId) -> bool {
        let removed = self.sessions.remove(session_id);
        if removed {
            info!(session_id = %session_id, "session reset");
        }
        removed
    }
}
