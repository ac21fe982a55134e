//! .env file extraction

use crate::extractors::error::ExtractError;
use crate::extractors::patterns;
use crate::extractors::Extractor;
use crate::model::{Confidence, NetworkDependency};
use std::collections::HashSet;

/// Variable names with a conventional meaning
const WELL_KNOWN_VARS: &[(&str, &str)] = &[
    ("DATABASE_URL", "database"),
    ("DB_URL", "database"),
    ("DB_HOST", "database"),
    ("REDIS_URL", "Redis"),
    ("REDIS_HOST", "Redis"),
    ("KAFKA_BROKERS", "Kafka"),
    ("KAFKA_BOOTSTRAP_SERVERS", "Kafka"),
    ("RABBITMQ_URL", "RabbitMQ"),
    ("RABBITMQ_HOST", "RabbitMQ"),
    ("AMQP_URL", "RabbitMQ"),
    ("MONGODB_URI", "MongoDB"),
    ("MONGODB_URL", "MongoDB"),
    ("MONGO_URL", "MongoDB"),
    ("MONGO_HOST", "MongoDB"),
    ("ELASTICSEARCH_URL", "Elasticsearch"),
    ("ELASTICSEARCH_HOST", "Elasticsearch"),
    ("API_URL", "API service"),
    ("SERVICE_URL", "service"),
    ("POSTGRES_HOST", "PostgreSQL"),
    ("POSTGRES_URL", "PostgreSQL"),
    ("MYSQL_HOST", "MySQL"),
    ("MYSQL_URL", "MySQL"),
    ("NATS_URL", "NATS"),
    ("MEMCACHED_HOST", "Memcached"),
    ("CONSUL_HTTP_ADDR", "Consul"),
    ("VAULT_ADDR", "Vault"),
];

const GENERIC_SUFFIXES: &[&str] = &["_URL", "_URI", "_HOST", "_ADDR"];

/// Description for a variable name: exact table match, then the suffix heuristic
pub fn describe_var(key: &str) -> Option<&'static str> {
    let upper = key.to_ascii_uppercase();
    WELL_KNOWN_VARS
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|(_, desc)| *desc)
        .or_else(|| {
            GENERIC_SUFFIXES
                .iter()
                .any(|suffix| upper.ends_with(suffix))
                .then_some("service")
        })
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Extracts facts from `KEY=VALUE` lines.
///
/// Every fact is Medium; duplicates on `(target, port)` within the file are dropped.
pub fn parse_env(content: &str, source_label: &str) -> Vec<NetworkDependency> {
    let mut seen = HashSet::new();
    let mut deps = Vec::new();

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = strip_quotes(value.trim());
        if value.is_empty() {
            continue;
        }

        let Some(mut dep) = patterns::recognize(value) else {
            continue;
        };
        if let Some(desc) = describe_var(key) {
            dep.description = desc.to_string();
        }
        dep.confidence = Confidence::Medium;

        if seen.insert((dep.target.clone(), dep.port)) {
            deps.push(dep.with_source_file(source_label));
        }
    }

    deps
}

/// `.env`, `prod.env` and similar
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvFileExtractor;

impl Extractor for EnvFileExtractor {
    fn name(&self) -> &'static str {
        "env-file"
    }

    fn extract(
        &self,
        source_label: &str,
        content: &str,
    ) -> Result<Vec<NetworkDependency>, ExtractError> {
        Ok(parse_env(content, source_label))
    }
}
