use parley_core::errors::GenerateError;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("generation failed: {0}")]
    Generate(#[from] GenerateError),

    #[error("session limit reached ({limit} active conversations)")]
    TooManySessions { limit: usize },
}
