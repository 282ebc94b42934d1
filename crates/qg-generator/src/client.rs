//! Gemini API client.
//!
//! Talks to the `generateContent` REST endpoint and decides, once, whether a
//! failure is throttling or fatal. Nothing downstream inspects messages.

use std::time::Duration;

use async_trait::async_trait;
use qg_core::{ServiceError, TextGenerator};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini API status reported when a quota is used up.
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Client configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Read `GEMINI_API_KEY`, and optionally `GEMINI_MODEL` and
    /// `GEMINI_BASE_URL`, from the environment.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ClientError::MissingApiKey)?;

        let mut config = Self::new(api_key);
        if let Some(model) = non_empty_var("GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = non_empty_var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Client errors raised before any request is sent.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,

    #[error("Failed to create HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        tracing::debug!(model = %self.config.model, prompt_len = prompt.len(), "Sending request");

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::fatal(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let err = classify_error(status, &body);
            tracing::debug!(status = status.as_u16(), error = %err, "Request rejected");
            return Err(err);
        }

        extract_text(&body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn map_transport_error(error: reqwest::Error) -> ServiceError {
    if error.is_timeout() {
        ServiceError::fatal(format!("Request timeout: {error}"))
    } else if error.is_connect() {
        ServiceError::fatal(format!("Connection error: {error}"))
    } else {
        ServiceError::fatal(format!("HTTP error: {error}"))
    }
}

/// Classify a non-success response.
fn classify_error(status: StatusCode, body: &str) -> ServiceError {
    let (api_status, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.status, envelope.error.message),
        Err(_) => (String::new(), body.trim().to_string()),
    };
    let message = if message.is_empty() {
        status.to_string()
    } else {
        format!("{} {}", status.as_u16(), message)
    };

    if status == StatusCode::TOO_MANY_REQUESTS || api_status == RESOURCE_EXHAUSTED {
        ServiceError::throttled(message)
    } else {
        ServiceError::fatal(message)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, ServiceError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::fatal(format!("Failed to parse response: {e}")))?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::fatal("No candidates in response"))?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::fatal("Candidate has no text"));
    }
    Ok(text.to_string())
}
