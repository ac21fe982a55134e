//! Configuration management for segspec
//!
//! Settings are loaded from environment variables with defaults. Command-line flags
//! override the values that have a flag counterpart.
//!
//! # Environment Variables
//!
//! - `SEGSPEC_LOG_LEVEL`: Logging level - default: "info"
//! - `SEGSPEC_OLLAMA_URL`: Local AI endpoint - default: "http://localhost:11434"
//! - `SEGSPEC_OLLAMA_MODEL`: Local model name - default: "nuextract"
//! - `GEMINI_API_KEY`: Enables the cloud AI backend - default: unset
//! - `SEGSPEC_GEMINI_MODEL`: Cloud model name - default: "gemini-2.0-flash"
//! - `SEGSPEC_REQUEST_TIMEOUT`: AI request timeout in seconds - default: "30"
//! - `SEGSPEC_HELM_TIMEOUT`: Chart render timeout in seconds - default: "30"
//! - `SEGSPEC_CLONE_TIMEOUT`: Repository clone timeout in seconds - default: "60"
//! - `SEGSPEC_MAX_FILE_SIZE`: Files larger than this are not scanned - default: "1048576"
//!
//! # Example
//!
//! ```no_run
//! use segspec::SegspecConfig;
//!
//! let config = SegspecConfig::from_env().expect("invalid environment");
//! config.validate().expect("invalid configuration");
//! ```

use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "nuextract";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HELM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value of the wrong shape
    #[error("Failed to parse {field}: {error}")]
    InvalidValue { field: String, error: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegspecConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    pub ollama_url: String,
    pub ollama_model: String,

    /// Cloud backend is only offered when this is set
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    pub request_timeout_secs: u64,
    pub helm_timeout_secs: u64,
    pub clone_timeout_secs: u64,

    /// Maximum size in bytes of a file handed to the extractors
    pub max_file_size: u64,
}

impl Default for SegspecConfig {
    /// Loads from the environment, falling back to defaults for missing or unparsable values
    fn default() -> Self {
        Self::load(|key| env::var(key).ok(), false).unwrap_or_else(|_| Self::builtin())
    }
}

impl SegspecConfig {
    /// Loads from the environment, rejecting values that do not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| env::var(key).ok(), true)
    }

    /// Defaults with no environment lookup
    pub fn builtin() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            helm_timeout_secs: DEFAULT_HELM_TIMEOUT_SECS,
            clone_timeout_secs: DEFAULT_CLONE_TIMEOUT_SECS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    fn load<F>(lookup: F, strict: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::builtin();

        let text = |key: &str, default: String| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let number = |key: &str, default: u64| -> Result<u64, ConfigError> {
            match lookup(key).map(|v| v.trim().to_string()) {
                None => Ok(default),
                Some(v) if v.is_empty() => Ok(default),
                Some(v) => match v.parse::<u64>() {
                    Ok(n) => Ok(n),
                    Err(_) if !strict => Ok(default),
                    Err(e) => Err(ConfigError::InvalidValue {
                        field: key.to_string(),
                        error: format!("{:?} is not a number ({})", v, e),
                    }),
                },
            }
        };

        Ok(Self {
            log_level: text("SEGSPEC_LOG_LEVEL", defaults.log_level).to_lowercase(),
            ollama_url: text("SEGSPEC_OLLAMA_URL", defaults.ollama_url)
                .trim_end_matches('/')
                .to_string(),
            ollama_model: text("SEGSPEC_OLLAMA_MODEL", defaults.ollama_model),
            gemini_api_key: lookup("GEMINI_API_KEY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            gemini_model: text("SEGSPEC_GEMINI_MODEL", defaults.gemini_model),
            request_timeout_secs: number(
                "SEGSPEC_REQUEST_TIMEOUT",
                defaults.request_timeout_secs,
            )?,
            helm_timeout_secs: number("SEGSPEC_HELM_TIMEOUT", defaults.helm_timeout_secs)?,
            clone_timeout_secs: number("SEGSPEC_CLONE_TIMEOUT", defaults.clone_timeout_secs)?,
            max_file_size: number("SEGSPEC_MAX_FILE_SIZE", defaults.max_file_size)?,
        })
    }

    /// Validates the configuration
    ///
    /// Checks that timeouts are between 1 second and 10 minutes, that the file size
    /// cap is non-zero, and that the log level is known.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, secs) in [
            ("Request timeout", self.request_timeout_secs),
            ("Helm timeout", self.helm_timeout_secs),
            ("Clone timeout", self.clone_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be at least 1 second",
                    name
                )));
            }
            if secs > 600 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} cannot exceed 10 minutes",
                    name
                )));
            }
        }

        if self.max_file_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max file size must be greater than zero".to_string(),
            ));
        }

        if !self.ollama_url.starts_with("http://") && !self.ollama_url.starts_with("https://") {
            return Err(ConfigError::ValidationFailed(format!(
                "Ollama URL must start with http:// or https://: {}",
                self.ollama_url
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn helm_timeout(&self) -> Duration {
        Duration::from_secs(self.helm_timeout_secs)
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }
}

impl fmt::Display for SegspecConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Segspec Configuration:")?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Ollama: {} ({})", self.ollama_url, self.ollama_model)?;
        writeln!(
            f,
            "  Gemini: {} ({})",
            if self.gemini_api_key.is_some() {
                "key set"
            } else {
                "no key"
            },
            self.gemini_model
        )?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Helm Timeout: {}s", self.helm_timeout_secs)?;
        writeln!(f, "  Clone Timeout: {}s", self.clone_timeout_secs)?;
        writeln!(f, "  Max File Size: {} bytes", self.max_file_size)?;
        Ok(())
    }
}
