//! Backend selection, prompting and response parsing

use super::backend::DependencyBackend;
use super::collect::{collect_files, redact_secrets, CollectedFile};
use super::error::BackendError;
use super::gemini::GeminiBackend;
use super::ollama::OllamaBackend;
use crate::config::SegspecConfig;
use crate::extractors::parsers::PortNumber;
use crate::model::{Confidence, NetworkDependency};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Provenance recorded on every AI-contributed fact
pub const AI_SOURCE_FILE: &str = "ai-analysis";

/// Shown before anything is sent to the cloud backend
pub const CLOUD_NOTICE: &str =
    "Note: config files will be sent to Google Gemini API. Use --ai local for fully offline analysis.";

const LOCAL_HINT: &str =
    "Ollama not reachable at localhost:11434. Install from https://ollama.com and run: ollama pull nuextract";

const CLOUD_HINT: &str =
    "GEMINI_API_KEY not set. Get a free key at https://aistudio.google.com/apikey";

const NO_BACKEND_HINT: &str = "no AI backend available. Choose one:\n\n  \
     Local (private, free):  ollama pull nuextract && segspec analyze --ai local <path>\n  \
     Cloud (fast, free tier): export GEMINI_API_KEY=... && segspec analyze --ai cloud <path>\n\n  \
     Get a Gemini key at https://aistudio.google.com/apikey";

/// Which AI backend the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AiProvider {
    /// Local when the model is installed, else cloud when a key is set
    #[default]
    Auto,
    /// Ollama only; nothing leaves the machine
    Local,
    /// Gemini only
    Cloud,
}

/// Picks a backend for `provider`, probing the local one first.
pub async fn resolve_backend(
    provider: AiProvider,
    config: &SegspecConfig,
) -> Result<Arc<dyn DependencyBackend>, BackendError> {
    let local = || {
        OllamaBackend::new(
            config.ollama_url.clone(),
            config.ollama_model.clone(),
            config.request_timeout(),
        )
    };
    let cloud = |key: &str| {
        GeminiBackend::new(key, config.gemini_model.clone(), config.request_timeout())
    };

    match provider {
        AiProvider::Local => {
            let backend = local()?;
            if backend.is_available().await {
                Ok(Arc::new(backend))
            } else {
                Err(BackendError::Unavailable(LOCAL_HINT.to_string()))
            }
        }
        AiProvider::Cloud => match config.gemini_api_key.as_deref() {
            Some(key) => Ok(Arc::new(cloud(key)?)),
            None => Err(BackendError::Unavailable(CLOUD_HINT.to_string())),
        },
        AiProvider::Auto => {
            let backend = local()?;
            if backend.is_available().await {
                info!("Using local AI backend");
                return Ok(Arc::new(backend));
            }
            match config.gemini_api_key.as_deref() {
                Some(key) => {
                    info!("Local AI backend unavailable, using Gemini");
                    Ok(Arc::new(cloud(key)?))
                }
                None => Err(BackendError::Unavailable(NO_BACKEND_HINT.to_string())),
            }
        }
    }
}

/// Prompt for a local extraction model, one file at a time
pub fn local_prompt(content: &str) -> String {
    format!(
        "<|input|>\nExtract all network dependencies (hosts, ports, service connections) from this configuration file:\n\n{}\n<|output|>\n[{{\"host\": \"\", \"port\": 0, \"protocol\": \"\", \"service_type\": \"\", \"description\": \"\"}}]",
        content
    )
}

/// One prompt covering every file, with secrets masked
pub fn cloud_prompt(files: &[CollectedFile]) -> String {
    let mut prompt = String::from(
        "Extract all network dependencies from these configuration files.\n\
         For each dependency, return a JSON object with: host, port (integer), protocol (TCP/UDP), service_type, description.\n\
         Return ONLY a JSON array. No explanation, no markdown fences.\n\n",
    );
    for file in files {
        prompt.push_str(&format!(
            "--- file: {} ---\n{}\n\n",
            file.path,
            redact_secrets(&file.content)
        ));
    }
    prompt
}

#[derive(Debug, Deserialize)]
struct AiFact {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<PortNumber>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    service_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn strip_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Decodes a model's JSON array into facts owned by `service_name`
pub fn parse_response(
    text: &str,
    service_name: &str,
) -> Result<Vec<NetworkDependency>, BackendError> {
    let body = strip_fences(text);
    let facts: Vec<AiFact> = serde_json::from_str(body).map_err(|e| {
        BackendError::InvalidResponse(format!("expected a JSON array of dependencies: {}", e))
    })?;

    let deps = facts
        .into_iter()
        .filter_map(|fact| {
            let host = fact.host.map(|h| h.trim().to_string()).unwrap_or_default();
            if host.is_empty() {
                return None;
            }
            let port = fact.port.and_then(|p| p.as_port()).unwrap_or(0);
            let description = fact
                .description
                .filter(|d| !d.trim().is_empty())
                .or(fact.service_type)
                .unwrap_or_default();

            Some(
                NetworkDependency::new(host, port, Confidence::Medium)
                    .with_source(service_name)
                    .with_protocol(fact.protocol.as_deref().unwrap_or(""))
                    .with_description(description)
                    .with_source_file(AI_SOURCE_FILE),
            )
        })
        .collect();

    Ok(deps)
}

/// Runs `backend` over the config files under `root`.
///
/// Local backends see one file per prompt and a failing file is skipped. Remote
/// backends get a single redacted prompt, and its failure is returned.
pub async fn analyze(
    backend: &dyn DependencyBackend,
    root: &Path,
    service_name: &str,
) -> Result<Vec<NetworkDependency>, BackendError> {
    let files = collect_files(root);
    if files.is_empty() {
        debug!(root = %root.display(), "No config files for AI analysis");
        return Ok(Vec::new());
    }

    info!(
        backend = backend.name(),
        files = files.len(),
        "Running AI analysis"
    );

    if backend.is_remote() {
        let response = backend.complete(&cloud_prompt(&files)).await?;
        return parse_response(&response, service_name);
    }

    let mut deps = Vec::new();
    for file in &files {
        let result = match backend.complete(&local_prompt(&file.content)).await {
            Ok(response) => parse_response(&response, service_name),
            Err(e) => Err(e),
        };
        match result {
            Ok(found) => {
                debug!(path = %file.path, found = found.len(), "AI analysis of file");
                deps.extend(found);
            }
            Err(e) => warn!(path = %file.path, error = %e, "AI analysis failed for file"),
        }
    }
    Ok(deps)
}
