use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::GenerateError;

/// Which end of an over-budget prompt is discarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationSide {
    /// Keep the head of the prompt, drop the tail.
    #[default]
    Right,
    /// Keep the tail of the prompt, drop the head.
    Left,
}

/// Text-generation capability consumed by the chat adapters.
///
/// Implementations may truncate the prompt to their own input budget;
/// callers don't detect or react to that.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    /// Maximum prompt length, in tokens, the backend accepts before truncating.
    fn max_input_tokens(&self) -> usize;

    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}
