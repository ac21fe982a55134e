//! AI backend errors

use thiserror::Error;

/// Errors raised by an AI backend; callers treat all of them as warnings
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// No usable backend; the message tells the user how to get one
    #[error("{0}")]
    Unavailable(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),
}

impl BackendError {
    /// Classifies a transport error, using `timeout_secs` for the timeout message
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(timeout_secs)
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

/// Shortens `text` to at most `max` characters for error messages
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = BackendError::Api {
            status: 403,
            message: "forbidden".into(),
        };
        assert_eq!(err.to_string(), "API returned status 403: forbidden");
        assert_eq!(BackendError::Timeout(30).to_string(), "request timed out after 30s");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ééé", 2), "éé...");
    }
}
