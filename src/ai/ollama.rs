//! Ollama HTTP client for local inference
//!
//! Talks to a local Ollama server: `/api/tags` to check that the extraction model is
//! installed and `/api/generate` (non-streaming) to run one prompt. Nothing leaves the
//! machine, so callers send one prompt per file without redaction.

use super::backend::DependencyBackend;
use super::error::{truncate, BackendError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Ollama client for local inference
///
/// # Configuration
///
/// - **endpoint**: Ollama API endpoint (e.g., "http://localhost:11434")
/// - **model**: Model name (e.g., "nuextract")
/// - **timeout**: Request timeout duration
pub struct OllamaBackend {
    endpoint: String,
    model: String,
    http_client: Client,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaBackend {
    /// Creates a client; fails only when the HTTP client cannot be built
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http_client,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Lists installed models via `/api/tags`
    pub async fn installed_models(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/api/tags", self.endpoint);
        debug!("Checking Ollama models at {}", url);

        let response = self
            .http_client
            .get(&url)
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

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("model list: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// True when `name` is this client's model, with or without a tag
    fn is_our_model(&self, name: &str) -> bool {
        name == self.model
            || name
                .strip_prefix(self.model.as_str())
                .is_some_and(|rest| rest.starts_with(':'))
    }
}

#[async_trait]
impl DependencyBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_remote(&self) -> bool {
        false
    }

    async fn is_available(&self) -> bool {
        match self.installed_models().await {
            Ok(models) => {
                let installed = models.iter().any(|m| self.is_our_model(m));
                if installed {
                    info!(model = %self.model, "Ollama model available");
                } else {
                    warn!(
                        model = %self.model,
                        "Ollama is running but the model is not installed (ollama pull {})",
                        self.model
                    );
                }
                installed
            }
            Err(e) => {
                debug!(endpoint = %self.endpoint, error = %e, "Ollama not reachable");
                false
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Sending Ollama request");
        let start = Instant::now();

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, self.timeout.as_secs()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 404 && body.contains(&self.model) {
                return Err(BackendError::Api {
                    status: 404,
                    message: format!(
                        "Model '{}' not found. Pull it with: ollama pull {}",
                        self.model, self.model
                    ),
                });
            }
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: truncate(&body, 200),
            });
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("generate: {}", e)))?;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            response_len = generated.response.len(),
            "Ollama request completed"
        );

        Ok(generated.response)
    }
}

impl fmt::Debug for OllamaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
