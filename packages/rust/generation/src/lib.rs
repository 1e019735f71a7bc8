//! Text-generation capability boundary.
//!
//! The pipeline only ever sees [`GenerationEngine`]: a prompt and fixed
//! [`GenerationParams`] in, text out. [`InferenceClient`] is the production
//! implementation, speaking the Hugging Face text-generation inference
//! request shape to a configured endpoint.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use sitechat_shared::{GenerationConfig, GenerationParams, Result, SiteChatError};

/// User-Agent string for inference requests.
const USER_AGENT: &str = concat!("SiteChat/", env!("CARGO_PKG_VERSION"));

/// How much of an error body to echo back in a failure message.
const ERROR_BODY_PREVIEW: usize = 200;

// ---------------------------------------------------------------------------
// GenerationEngine
// ---------------------------------------------------------------------------

/// Opaque prompt → text capability.
///
/// Failures are reported as [`SiteChatError::GenerationFailed`]. Callers do
/// not inspect the returned text beyond checking it is non-empty.
#[async_trait::async_trait]
pub trait GenerationEngine: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    num_return_sequences: u32,
    no_repeat_ngram_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pad_token_id: Option<u32>,
    /// Only the continuation is wanted, never the echoed prompt.
    return_full_text: bool,
}

impl From<&GenerationParams> for InferenceParameters {
    fn from(params: &GenerationParams) -> Self {
        Self {
            max_new_tokens: params.max_length,
            num_return_sequences: params.num_return_sequences,
            no_repeat_ngram_size: params.no_repeat_ngram_size,
            pad_token_id: params.pad_token_id,
            return_full_text: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedSequence {
    generated_text: String,
}

/// Endpoints answer with a list of sequences, a bare sequence, or an error.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Many(Vec<GeneratedSequence>),
    One(GeneratedSequence),
    Error { error: String },
}

// ---------------------------------------------------------------------------
// InferenceClient
// ---------------------------------------------------------------------------

/// HTTP text-generation client.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl InferenceClient {
    /// Build a client for `config.endpoint`, authenticating with `api_key`
    /// as a bearer token when present.
    pub fn new(config: &GenerationConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                SiteChatError::config(format!("failed to build inference HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl GenerationEngine for InferenceClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let request = InferenceRequest {
            inputs: prompt,
            parameters: params.into(),
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let mut rb = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            rb = rb.bearer_auth(key);
        }

        let response = rb
            .send()
            .await
            .map_err(|e| SiteChatError::GenerationFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SiteChatError::GenerationFailed(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(SiteChatError::GenerationFailed(format!(
                "inference HTTP {status}: {}",
                error_detail(&body)
            )));
        }

        let text = parse_generation(&body)?;
        debug!(output_len = text.len(), "generation complete");
        Ok(text)
    }
}

/// Pull the first generated sequence out of a successful response body.
fn parse_generation(body: &str) -> Result<String> {
    let parsed: InferenceResponse = serde_json::from_str(body).map_err(|e| {
        SiteChatError::GenerationFailed(format!("unexpected inference response: {e}"))
    })?;

    match parsed {
        InferenceResponse::Many(sequences) => sequences
            .into_iter()
            .next()
            .map(|s| s.generated_text)
            .ok_or_else(|| SiteChatError::GenerationFailed("no sequences returned".into())),
        InferenceResponse::One(sequence) => Ok(sequence.generated_text),
        InferenceResponse::Error { error } => Err(SiteChatError::GenerationFailed(error)),
    }
}

/// Prefer the endpoint's own `error` field; fall back to a body preview.
fn error_detail(body: &str) -> String {
    if let Ok(InferenceResponse::Error { error }) = serde_json::from_str(body) {
        return error;
    }
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}
