//! Generator backed by a Hugging Face Inference-compatible HTTP endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use parley_core::errors::GenerateError;
use parley_core::generator::{Generator, TruncationSide};

use crate::tokens::truncate_to_tokens;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection and generation parameters for [`HttpGenerator`].
#[derive(Clone, Debug)]
pub struct HttpGeneratorConfig {
    /// Endpoint root; the model id is appended as a path.
    pub base_url: String,
    pub model: String,
    pub api_token: Option<SecretString>,
    pub max_input_tokens: usize,
    pub max_new_tokens: u32,
    pub truncation_side: TruncationSide,
    pub request_timeout: Duration,
    pub wait_for_model: bool,
}

impl Default for HttpGeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co/models".to_string(),
            model: "facebook/blenderbot-400M-distill".to_string(),
            api_token: None,
            max_input_tokens: 128,
            max_new_tokens: 128,
            truncation_side: TruncationSide::Right,
            request_timeout: Duration::from_secs(60),
            wait_for_model: true,
        }
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
    Error(ErrorBody),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    estimated_time: Option<f64>,
}

/// Sends composed prompts to a text-to-text inference endpoint.
pub struct HttpGenerator {
    client: Client,
    config: HttpGeneratorConfig,
    endpoint: String,
}

impl HttpGenerator {
    pub fn new(config: HttpGeneratorConfig) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GenerateError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/{}", config.base_url.trim_end_matches('/'), config.model);
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify_transport(&self, err: reqwest::Error) -> GenerateError {
        if err.is_timeout() {
            GenerateError::Timeout(self.config.request_timeout)
        } else {
            GenerateError::NetworkError(err.to_string())
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    fn name(&self) -> &str {
        "http"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn max_input_tokens(&self) -> usize {
        self.config.max_input_tokens
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let truncated = truncate_to_tokens(
            prompt,
            self.config.max_input_tokens,
            self.config.truncation_side,
        );
        if truncated.was_truncated() {
            debug!(
                total_tokens = truncated.total_tokens,
                kept_tokens = truncated.kept_tokens,
                "prompt truncated to input budget"
            );
        }

        let body = InferenceRequest {
            inputs: truncated.text,
            parameters: InferenceParameters {
                max_new_tokens: self.config.max_new_tokens,
            },
            options: InferenceOptions {
                wait_for_model: self.config.wait_for_model,
            },
        };

        let mut req = self
            .client
            .post(&self.endpoint)
            .timeout(self.config.request_timeout)
            .header("accept", "application/json")
            .json(&body);
        if let Some(token) = &self.config.api_token {
            req = req.bearer_auth(token.expose_secret());
        }

        let resp = req.send().await.map_err(|e| self.classify_transport(e))?;
        let status = resp.status();
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = resp.text().await.map_err(|e| self.classify_transport(e))?;

        if !status.is_success() {
            return Err(error_from_response(status, retry_after, text));
        }

        let reply = parse_generated_text(&text)?;
        debug!(reply_len = reply.len(), "generation complete");
        Ok(reply)
    }
}

/// Map a non-success response onto a [`GenerateError`].
fn error_from_response(status: StatusCode, retry_after: Option<Duration>, body: String) -> GenerateError {
    let parsed = serde_json::from_str::<ErrorBody>(&body).ok();

    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerateError::RateLimited { retry_after },
        StatusCode::SERVICE_UNAVAILABLE => GenerateError::ModelLoading {
            estimated_time: parsed
                .and_then(|e| e.estimated_time)
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64)
                .or(retry_after),
        },
        _ => {
            let message = parsed.map(|e| e.error).unwrap_or(body);
            GenerateError::from_status(status.as_u16(), message)
        }
    }
}

/// Extract the reply from a successful response body, trimmed of
/// surrounding whitespace.
fn parse_generated_text(body: &str) -> Result<String, GenerateError> {
    let parsed: InferenceResponse = serde_json::from_str(body)
        .map_err(|e| GenerateError::MalformedResponse(e.to_string()))?;

    match parsed {
        InferenceResponse::Batch(items) => items
            .into_iter()
            .next()
            .map(|g| g.generated_text.trim().to_string())
            .ok_or_else(|| GenerateError::MalformedResponse("empty generation list".into())),
        InferenceResponse::Single(g) => Ok(g.generated_text.trim().to_string()),
        InferenceResponse::Error(e) => Err(GenerateError::InvalidRequest(e.error)),
    }
}
