//! The atomic network-dependency fact

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol assumed when a source does not state one
pub const DEFAULT_PROTOCOL: &str = "TCP";

/// How directly a dependency was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Explicit URL or host:port literal in config
    High,
    /// Env var, config map, or defaulted port
    Medium,
    /// Inferred transitively (build dependency, image name)
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inferred or declared network relationship.
///
/// Identity is `(source, target, port, protocol)`; `description`, `confidence`
/// and `source_file` are carried along for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDependency {
    /// Originating service; empty until the scanner assigns the scan root's name
    pub source: String,
    /// Service name, `svc.namespace` DNS name, IP literal, or `self`
    pub target: String,
    /// `0` means no usable port could be determined
    pub port: u16,
    pub protocol: String,
    pub description: String,
    pub confidence: Confidence,
    pub source_file: String,
}

impl NetworkDependency {
    /// Creates a TCP dependency with no source and no description
    pub fn new(target: impl Into<String>, port: u16, confidence: Confidence) -> Self {
        Self {
            source: String::new(),
            target: target.into(),
            port,
            protocol: DEFAULT_PROTOCOL.to_string(),
            description: String::new(),
            confidence,
            source_file: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = source_file.into();
        self
    }

    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.protocol = normalize_protocol(protocol);
        self
    }

    /// Canonical identity string: `source->target:port/protocol`
    pub fn key(&self) -> String {
        format!(
            "{}->{}:{}/{}",
            self.source, self.target, self.port, self.protocol
        )
    }

    /// True when the fact carries a port usable in a rendered rule
    pub fn has_port(&self) -> bool {
        self.port > 0
    }
}

/// Upper-cases a protocol name, falling back to TCP when blank
pub fn normalize_protocol(protocol: &str) -> String {
    let trimmed = protocol.trim();
    if trimmed.is_empty() {
        DEFAULT_PROTOCOL.to_string()
    } else {
        trimmed.to_uppercase()
    }
}
