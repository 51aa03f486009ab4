//! Settings types. Every section deserializes with `#[serde(default)]`, so a
//! settings file only needs the keys it overrides.

use serde::{Deserialize, Serialize};

pub use parley_core::TruncationSide;

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleySettings {
    pub server: ServerSettings,
    pub context: ContextSettings,
    pub model: ModelSettings,
    pub retry: RetrySettings,
    pub logging: LoggingSettings,
}

impl ParleySettings {
    /// Reject combinations the runtime can't honor.
    pub fn validate(&self) -> Result<()> {
        let window = self.context.window;
        if window == 0 || window % 2 != 0 {
            return Err(SettingsError::InvalidValue(format!(
                "context.window must be a positive even number, got {window}"
            )));
        }
        if self.model.max_input_tokens == 0 {
            return Err(SettingsError::InvalidValue(
                "model.maxInputTokens must be greater than zero".to_string(),
            ));
        }
        if self.model.max_new_tokens == 0 {
            return Err(SettingsError::InvalidValue(
                "model.maxNewTokens must be greater than zero".to_string(),
            ));
        }
        if self.server.max_sessions == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxSessions must be greater than zero".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(SettingsError::InvalidValue(format!(
                "retry.baseDelayMs ({}) exceeds retry.maxDelayMs ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// HTTP server and session settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Maximum number of live conversations.
    pub max_sessions: usize,
    /// Conversations idle longer than this are dropped.
    pub session_idle_timeout_secs: u64,
    /// How often idle conversations are swept.
    pub cleanup_interval_secs: u64,
    /// Maximum accepted request body size.
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_sessions: 1024,
            session_idle_timeout_secs: 3600,
            cleanup_interval_secs: 60,
            body_limit_bytes: 64 * 1024,
        }
    }
}

/// Conversation context settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextSettings {
    /// Transcript entries kept per conversation (two per exchange).
    pub window: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            window: parley_core::DEFAULT_WINDOW,
        }
    }
}

/// Generation backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    /// Inference endpoint; the model id is appended as a path segment.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer token for the inference endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Prompt budget in tokens; longer prompts are truncated.
    pub max_input_tokens: usize,
    /// Upper bound on generated tokens.
    pub max_new_tokens: u32,
    /// Which end of an over-budget prompt is dropped.
    pub truncation_side: TruncationSide,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Ask the endpoint to block until a cold model is loaded.
    pub wait_for_model: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co/models".to_string(),
            model: "facebook/blenderbot-400M-distill".to_string(),
            api_token: None,
            max_input_tokens: 128,
            max_new_tokens: 128,
            truncation_side: TruncationSide::Right,
            request_timeout_ms: 60_000,
            wait_for_model: true,
        }
    }
}

/// Retry policy for transient generation failures.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level (`trace`..`error`). `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
