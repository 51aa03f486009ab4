use serde::{Deserialize, Serialize};

use crate::errors::ContextError;

/// Default number of transcript entries kept (6 exchanges).
pub const DEFAULT_WINDOW: usize = 12;

/// One user message paired with the reply generated for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub bot: String,
}

/// Bounded chronological transcript of a single conversation.
///
/// Entries alternate user / bot by position: even indices are user
/// messages, odd indices are replies. The transcript only grows through
/// [`ContextManager::record_exchange`] and only shrinks from the front,
/// so its length is always even and never exceeds the window.
#[derive(Clone, Debug)]
pub struct ContextManager {
    transcript: Vec<String>,
    window: usize,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextManager {
    pub fn new() -> Self {
        Self {
            transcript: Vec::with_capacity(DEFAULT_WINDOW + 2),
            window: DEFAULT_WINDOW,
        }
    }

    /// Create a manager with a custom window. The window counts entries,
    /// not exchanges, and must be a positive even number.
    pub fn with_window(window: usize) -> Result<Self, ContextError> {
        if window == 0 || window % 2 != 0 {
            return Err(ContextError::InvalidWindow(window));
        }
        Ok(Self {
            transcript: Vec::with_capacity(window + 2),
            window,
        })
    }

    /// Render the transcript plus a new user message into a model prompt.
    ///
    /// History entries are joined with `\n` and the new message is appended
    /// directly after the last entry, with no separator and no role markers.
    pub fn compose_prompt(&self, new_message: &str) -> String {
        let history = self.transcript.join("\n");
        let mut prompt = String::with_capacity(history.len() + new_message.len());
        prompt.push_str(&history);
        prompt.push_str(new_message);
        prompt
    }

    /// Append a user message and its reply, then drop the oldest entries
    /// beyond the window.
    pub fn record_exchange(&mut self, user_message: impl Into<String>, bot_reply: impl Into<String>) {
        self.transcript.push(user_message.into());
        self.transcript.push(bot_reply.into());

        if self.transcript.len() > self.window {
            let excess = self.transcript.len() - self.window;
            self.transcript.drain(..excess);
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    pub fn exchange_count(&self) -> usize {
        self.transcript.len() / 2
    }

    /// Raw transcript entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.transcript
    }

    /// Transcript grouped into user/bot pairs, oldest first.
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.transcript
            .chunks_exact(2)
            .map(|pair| Exchange {
                user: pair[0].clone(),
                bot: pair[1].clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_transcript_prompt_is_message() {
        let cm = ContextManager::new();
        assert_eq!(cm.compose_prompt("hello there"), "hello there");
        assert_eq!(cm.compose_prompt(""), "");
    }

    #[test]
    fn prompt_has_no_separator_before_new_message() {
        let mut cm = ContextManager::new();
        cm.record_exchange("hi", "hello");
        assert_eq!(cm.compose_prompt("how are you"), "hi\nhellohow are you");
    }

    #[test]
    fn prompt_joins_history_with_newlines() {
        let mut cm = ContextManager::new();
        cm.record_exchange("a", "b");
        cm.record_exchange("c", "d");
        assert_eq!(cm.compose_prompt("e"), "a\nb\nc\nde");
        assert_eq!(cm.compose_prompt("e"), format!("{}e", cm.entries().join("\n")));
    }

    #[test]
    fn compose_is_idempotent() {
        let mut cm = ContextManager::new();
        cm.record_exchange("one", "two");
        let first = cm.compose_prompt("three");
        let second = cm.compose_prompt("three");
        assert_eq!(first, second);
        assert_eq!(cm.len(), 2);
    }

    #[test]
    fn record_appends_user_then_bot() {
        let mut cm = ContextManager::new();
        cm.record_exchange("hi", "hello");
        assert_eq!(cm.entries(), ["hi", "hello"]);
        assert_eq!(cm.exchange_count(), 1);
    }

    #[test]
    fn seventh_exchange_evicts_first() {
        let mut cm = ContextManager::new();
        for i in 1..=7 {
            cm.record_exchange(format!("u{i}"), format!("b{i}"));
        }
        let expected: Vec<String> = (2..=7)
            .flat_map(|i| [format!("u{i}"), format!("b{i}")])
            .collect();
        assert_eq!(cm.entries(), expected.as_slice());
    }

    #[test]
    fn length_stays_even_and_bounded() {
        let mut cm = ContextManager::new();
        for i in 0..50 {
            cm.record_exchange(format!("user {i}"), format!("bot {i}"));
            assert_eq!(cm.len() % 2, 0);
            assert!(cm.len() <= DEFAULT_WINDOW, "len {} after {} exchanges", cm.len(), i + 1);
        }
        assert_eq!(cm.len(), DEFAULT_WINDOW);
        assert_eq!(cm.entries()[0], "user 44");
    }

    #[test]
    fn empty_strings_are_recorded() {
        let mut cm = ContextManager::new();
        cm.record_exchange("", "");
        assert_eq!(cm.len(), 2);
        assert_eq!(cm.compose_prompt("x"), "\nx");
    }

    #[test]
    fn exchanges_pair_entries() {
        let mut cm = ContextManager::new();
        cm.record_exchange("q1", "a1");
        cm.record_exchange("q2", "a2");
        let exchanges = cm.exchanges();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[1], Exchange { user: "q2".into(), bot: "a2".into() });
    }

    #[test]
    fn custom_window() {
        let mut cm = ContextManager::with_window(4).unwrap();
        for i in 1..=3 {
            cm.record_exchange(format!("u{i}"), format!("b{i}"));
        }
        assert_eq!(cm.entries(), ["u2", "b2", "u3", "b3"]);
        assert_eq!(cm.window(), 4);
    }

    #[test]
    fn odd_or_zero_window_rejected() {
        assert!(matches!(ContextManager::with_window(0), Err(ContextError::InvalidWindow(0))));
        assert!(matches!(ContextManager::with_window(7), Err(ContextError::InvalidWindow(7))));
        assert!(ContextManager::with_window(2).is_ok());
    }

    #[test]
    fn exchange_serde_shape() {
        let ex = Exchange { user: "hi".into(), bot: "hello".into() };
        let json = serde_json::to_value(&ex).unwrap();
        assert_eq!(json, serde_json::json!({"user": "hi", "bot": "hello"}));
    }
}
