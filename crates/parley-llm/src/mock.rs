use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use parley_core::errors::GenerateError;
use parley_core::generator::Generator;

/// Pre-programmed responses for deterministic testing without a model.
#[derive(Clone, Debug)]
pub enum MockResponse {
    Reply(String),
    Error(GenerateError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn reply(text: &str) -> Self {
        Self::Reply(text.to_string())
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Generator that returns scripted responses in order and records every
/// prompt it receives.
pub struct MockGenerator {
    responses: Mutex<VecDeque<MockResponse>>,
    fallback: Option<MockResponse>,
    prompts: Mutex<Vec<String>>,
    max_input_tokens: usize,
}

impl MockGenerator {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
            max_input_tokens: 128,
        }
    }

    /// A generator that answers every prompt with `reply`.
    pub fn always(reply: &str) -> Self {
        Self::new(Vec::new()).with_fallback(MockResponse::reply(reply))
    }

    /// Response used once the scripted queue is exhausted.
    pub fn with_fallback(mut self, response: MockResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let call = {
            let mut prompts = self.prompts.lock();
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };

        let next = self.responses.lock().pop_front();
        let Some(response) = next.or_else(|| self.fallback.clone()) else {
            return Err(GenerateError::InvalidRequest(format!(
                "MockGenerator: no response configured for call {call}"
            )));
        };

        resolve_response(response).await
    }
}

/// Resolve a MockResponse, unrolling nested delays iteratively.
async fn resolve_response(mut current: MockResponse) -> Result<String, GenerateError> {
    loop {
        match current {
            MockResponse::Reply(text) => return Ok(text),
            MockResponse::Error(e) => return Err(e),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_replies() {
        let mock = MockGenerator::new(vec![MockResponse::reply("first"), MockResponse::reply("second")]);
        assert_eq!(mock.generate("a").await.unwrap(), "first");
        assert_eq!(mock.generate("b").await.unwrap(), "second");
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.prompts(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn exhausted_without_fallback_errors() {
        let mock = MockGenerator::new(vec![MockResponse::reply("only")]);
        let _ = mock.generate("a").await;
        assert!(matches!(
            mock.generate("b").await,
            Err(GenerateError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn fallback_after_script() {
        let mock = MockGenerator::new(vec![MockResponse::reply("scripted")])
            .with_fallback(MockResponse::reply("again"));
        assert_eq!(mock.generate("1").await.unwrap(), "scripted");
        assert_eq!(mock.generate("2").await.unwrap(), "again");
        assert_eq!(mock.generate("3").await.unwrap(), "again");
        assert_eq!(mock.last_prompt().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn scripted_error() {
        let mock = MockGenerator::new(vec![MockResponse::Error(GenerateError::NetworkError("down".into()))]);
        assert!(matches!(mock.generate("x").await, Err(GenerateError::NetworkError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply() {
        let mock = MockGenerator::always("x").with_fallback(MockResponse::delayed(
            Duration::from_secs(5),
            MockResponse::reply("after delay"),
        ));
        let start = tokio::time::Instant::now();
        assert_eq!(mock.generate("p").await.unwrap(), "after delay");
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[test]
    fn properties() {
        let mock = MockGenerator::new(vec![]);
        assert_eq!(mock.name(), "mock");
        assert_eq!(mock.model(), "mock-model");
        assert_eq!(mock.max_input_tokens(), 128);
    }
}
