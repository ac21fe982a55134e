//! Google Gemini client
//!
//! Uses the `generateContent` REST endpoint with an API key header. Prompts sent here
//! leave the machine, so the analyzer redacts secrets before calling it.

use super::backend::DependencyBackend;
use super::error::{truncate, BackendError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiBackend {
    api_key: String,
    model: String,
    base_url: String,
    http_client: Client,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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
    #[serde(default)]
    text: String,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
    }
}

impl GeminiBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BackendError::Configuration(
                "GEMINI_API_KEY is empty".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            http_client,
            timeout,
        })
    }

    /// Points the client at another server, for proxies and tests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl DependencyBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Sending Gemini request");

        let response = self
            .http_client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, self.timeout.as_secs()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: truncate(&body, 200),
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("generateContent: {}", e)))?;

        parsed
            .first_text()
            .ok_or_else(|| BackendError::InvalidResponse("empty response from Gemini".to_string()))
    }
}

impl fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
