//! AI-assisted dependency discovery
//!
//! An optional pass that asks a language model for dependencies the static extractors
//! missed. Backends are reached over HTTP (a local Ollama server or Google Gemini);
//! whatever they return is merged into the scan result as medium-confidence facts
//! marked with an `[AI] ` prefix. Backend failures never invalidate the static result.

pub mod analyzer;
pub mod backend;
pub mod collect;
pub mod error;
pub mod gemini;
pub mod ollama;

#[cfg(test)]
pub(crate) mod test_server;

pub use analyzer::{analyze, parse_response, resolve_backend, AiProvider, CLOUD_NOTICE};
pub use backend::DependencyBackend;
pub use error::BackendError;
pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;

use crate::model::dependency::normalize_protocol;
use crate::model::{Confidence, DependencySet, NetworkDependency};
use tracing::debug;

/// Marker prepended to descriptions of AI-contributed facts
pub const AI_PREFIX: &str = "[AI] ";

/// Adds AI facts to `set`, returning how many were new.
///
/// Facts are forced to medium confidence and their descriptions get [`AI_PREFIX`]
/// once. A fact whose key is already present is dropped, so AI output never
/// overrides what the extractors found.
pub fn merge_ai_dependencies<I>(set: &mut DependencySet, facts: I) -> usize
where
    I: IntoIterator<Item = NetworkDependency>,
{
    let mut added = 0;
    for mut dep in facts {
        dep.confidence = Confidence::Medium;
        dep.protocol = normalize_protocol(&dep.protocol);
        if !dep.description.starts_with(AI_PREFIX) {
            dep.description = format!("{}{}", AI_PREFIX, dep.description);
        }
        if set.contains_key(&dep.key()) {
            debug!(key = %dep.key(), "AI fact already known");
            continue;
        }
        if set.add(dep) {
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_forces_medium_and_prefix() {
        let mut set = DependencySet::new("api");
        let added = merge_ai_dependencies(
            &mut set,
            vec![
                NetworkDependency::new("queue", 5672, Confidence::High)
                    .with_source("api")
                    .with_description("RabbitMQ"),
                NetworkDependency::new("cache", 6379, Confidence::Low)
                    .with_source("api")
                    .with_description("[AI] Redis"),
            ],
        );

        assert_eq!(added, 2);
        let deps = set.dependencies();
        assert_eq!(deps[0].target, "cache");
        assert_eq!(deps[0].description, "[AI] Redis");
        assert_eq!(deps[0].confidence, Confidence::Medium);
        assert_eq!(deps[1].description, "[AI] RabbitMQ");
        assert_eq!(deps[1].confidence, Confidence::Medium);
    }

    #[test]
    fn test_merge_skips_known_keys() {
        let mut set = DependencySet::new("api");
        set.add(
            NetworkDependency::new("db", 5432, Confidence::High)
                .with_source("api")
                .with_description("PostgreSQL"),
        );

        let added = merge_ai_dependencies(
            &mut set,
            vec![
                NetworkDependency::new("db", 5432, Confidence::Medium)
                    .with_source("api")
                    .with_protocol("tcp"),
                NetworkDependency::new("db", 5432, Confidence::Medium)
                    .with_source("api")
                    .with_protocol("udp"),
            ],
        );

        assert_eq!(added, 1);
        assert_eq!(set.len(), 2);
        let tcp = set
            .dependencies()
            .into_iter()
            .find(|d| d.protocol == "TCP")
            .unwrap();
        assert_eq!(tcp.description, "PostgreSQL");
        assert_eq!(tcp.confidence, Confidence::High);
    }

    #[test]
    fn test_merge_defaults_protocol() {
        let mut set = DependencySet::new("api");
        let mut dep = NetworkDependency::new("svc", 80, Confidence::Medium).with_source("api");
        dep.protocol = String::new();

        assert_eq!(merge_ai_dependencies(&mut set, vec![dep]), 1);
        assert_eq!(set.dependencies()[0].protocol, "TCP");
    }
}
