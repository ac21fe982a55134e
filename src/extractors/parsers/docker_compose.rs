//! Docker Compose extraction
//!
//! Every service contributes its exposed container ports, its `depends_on` edges
//! (upgraded when the referenced service runs a well-known image), a Low-confidence
//! fact for its own well-known image, and whatever its environment values point at.

use super::PortNumber;
use crate::extractors::error::ExtractError;
use crate::extractors::patterns;
use crate::extractors::Extractor;
use crate::model::{Confidence, NetworkDependency};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Infrastructure images and the port/description they imply, matched in order
pub const WELL_KNOWN_IMAGES: &[(&str, u16, &str)] = &[
    ("postgres", 5432, "PostgreSQL"),
    ("mysql", 3306, "MySQL"),
    ("mariadb", 3306, "MariaDB"),
    ("redis", 6379, "Redis"),
    ("mongo", 27017, "MongoDB"),
    ("rabbitmq", 5672, "RabbitMQ"),
    ("elasticsearch", 9200, "Elasticsearch"),
    ("kafka", 9092, "Kafka"),
    ("nats", 4222, "NATS"),
    ("memcached", 11211, "Memcached"),
    ("consul", 8500, "Consul"),
    ("etcd", 2379, "etcd"),
    ("zookeeper", 2181, "ZooKeeper"),
    ("minio", 9000, "MinIO"),
    ("vault", 8200, "Vault"),
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposeFile {
    services: Option<BTreeMap<String, Option<ComposeService>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposeService {
    image: Option<String>,
    ports: Vec<PortEntry>,
    depends_on: Option<DependsOn>,
    environment: Option<Environment>,
}

/// Short (`"8080:80/tcp"`, `3000`) or long (`{target: 80, published: 8080}`) syntax
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortEntry {
    Short(PortNumber),
    Long { target: PortNumber },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependsOn {
    StringList(Vec<String>),
    StringMap(BTreeMap<String, serde_yaml::Value>),
}

impl DependsOn {
    fn names(&self) -> Vec<&str> {
        match self {
            DependsOn::StringList(names) => names.iter().map(String::as_str).collect(),
            DependsOn::StringMap(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Environment {
    StringList(Vec<String>),
    StringMap(BTreeMap<String, Option<serde_yaml::Value>>),
}

impl Environment {
    fn values(&self) -> Vec<&str> {
        match self {
            Environment::StringList(entries) => entries
                .iter()
                .filter_map(|entry| entry.split_once('=').map(|(_, value)| value))
                .collect(),
            Environment::StringMap(map) => map
                .values()
                .filter_map(|v| v.as_ref().and_then(serde_yaml::Value::as_str))
                .collect(),
        }
    }
}

/// Container-side port of a short-syntax mapping.
///
/// Accepts `80`, `8080:80`, `127.0.0.1:8080:80/udp` and ranges such as `8080-8081:80-81`,
/// for which the first port of the container range is kept.
pub fn parse_container_port(spec: &str) -> Option<u16> {
    let spec = spec.trim();
    let spec = spec.split('/').next().unwrap_or(spec);
    let container = spec.rsplit(':').next().unwrap_or(spec);
    let first = container.split('-').next().unwrap_or(container);
    first.trim().parse::<u16>().ok().filter(|p| *p > 0)
}

/// Well-known port and description implied by an image reference.
///
/// Registry path, tag and digest are stripped before an exact lookup, then a prefix
/// lookup in table order.
pub fn infer_from_image(image: &str) -> Option<(u16, &'static str)> {
    let name = image.trim();
    if name.is_empty() {
        return None;
    }
    let name = name.split('@').next().unwrap_or(name);
    let name = name.rsplit('/').next().unwrap_or(name);
    let name = name.split(':').next().unwrap_or(name).to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }

    WELL_KNOWN_IMAGES
        .iter()
        .find(|(known, _, _)| *known == name)
        .or_else(|| {
            WELL_KNOWN_IMAGES
                .iter()
                .find(|(known, _, _)| name.starts_with(known))
        })
        .map(|(_, port, desc)| (*port, *desc))
}

impl PortEntry {
    fn container_port(&self) -> Option<u16> {
        match self {
            PortEntry::Short(PortNumber::Text(spec)) => parse_container_port(spec),
            PortEntry::Short(number) => number.as_port(),
            PortEntry::Long { target } => target.as_port(),
        }
    }
}

/// Extracts facts from a compose file; malformed YAML is an error
pub fn parse_compose(content: &str, source_label: &str) -> Result<Vec<NetworkDependency>, ExtractError> {
    let file: ComposeFile = if content.trim().is_empty() {
        ComposeFile::default()
    } else {
        serde_yaml::from_str(content)?
    };

    let services: BTreeMap<String, ComposeService> = file
        .services
        .unwrap_or_default()
        .into_iter()
        .map(|(name, svc)| (name, svc.unwrap_or_default()))
        .collect();

    let mut deps = Vec::new();
    for (name, service) in &services {
        for port in service.ports.iter().filter_map(PortEntry::container_port) {
            deps.push(
                NetworkDependency::new(name.clone(), port, Confidence::High)
                    .with_source(name.clone())
                    .with_description("exposed port"),
            );
        }

        if let Some(depends_on) = &service.depends_on {
            for dep_name in depends_on.names() {
                let inferred = services
                    .get(dep_name)
                    .and_then(|s| s.image.as_deref())
                    .and_then(infer_from_image);
                let dep = match inferred {
                    Some((port, desc)) => NetworkDependency::new(dep_name, port, Confidence::High)
                        .with_description(desc),
                    None => NetworkDependency::new(dep_name, 0, Confidence::Medium)
                        .with_description("depends_on"),
                };
                deps.push(dep.with_source(name.clone()));
            }
        }

        if let Some((port, desc)) = service.image.as_deref().and_then(infer_from_image) {
            deps.push(
                NetworkDependency::new(name.clone(), port, Confidence::Low)
                    .with_source(name.clone())
                    .with_description(format!("{} (inferred from image)", desc)),
            );
        }

        if let Some(environment) = &service.environment {
            for value in environment.values() {
                if let Some(mut dep) = patterns::recognize(value) {
                    if dep.confidence == Confidence::High {
                        dep.confidence = Confidence::Medium;
                    }
                    deps.push(dep.with_source(name.clone()));
                }
            }
        }
    }

    Ok(deps
        .into_iter()
        .map(|d| d.with_source_file(source_label))
        .collect())
}

/// `docker-compose.yml`, `compose.yaml` and friends
#[derive(Debug, Default, Clone, Copy)]
pub struct ComposeExtractor;

impl Extractor for ComposeExtractor {
    fn name(&self) -> &'static str {
        "docker-compose"
    }

    fn extract(
        &self,
        source_label: &str,
        content: &str,
    ) -> Result<Vec<NetworkDependency>, ExtractError> {
        parse_compose(content, source_label)
    }
}
