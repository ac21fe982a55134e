//! Spring Boot configuration extraction
//!
//! `application.yml`/`application.yaml` and `application.properties` resolve to the
//! same [`KnownFields`] and therefore the same facts. YAML files are read twice: a typed
//! pass over the well-known keys and a generic pass over every string leaf. Results are
//! merged on `(target, port)`.

use super::merge_unique;
use super::PortNumber;
use crate::extractors::error::ExtractError;
use crate::extractors::patterns;
use crate::extractors::Extractor;
use crate::model::{Confidence, NetworkDependency};
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

const REDIS_DEFAULT_PORT: u16 = 6379;
const RABBITMQ_DEFAULT_PORT: u16 = 5672;

/// Property keys the typed pass already covers
const HANDLED_KEYS: &[&str] = &[
    "spring.datasource.url",
    "spring.redis.host",
    "spring.redis.port",
    "spring.data.redis.host",
    "spring.data.redis.port",
    "spring.kafka.bootstrap-servers",
    "spring.rabbitmq.host",
    "spring.rabbitmq.port",
    "server.port",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpringDocument {
    spring: SpringSection,
    server: ServerSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpringSection {
    datasource: DatasourceSection,
    redis: EndpointSection,
    data: DataSection,
    kafka: KafkaSection,
    rabbitmq: EndpointSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DatasourceSection {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DataSection {
    redis: EndpointSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EndpointSection {
    host: Option<String>,
    port: Option<PortNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KafkaSection {
    #[serde(rename = "bootstrap-servers")]
    bootstrap_servers: Option<serde_yaml::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerSection {
    port: Option<PortNumber>,
}

/// A host with an optional explicit port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: Option<u16>,
}

/// The Spring keys with a fixed meaning, independent of file dialect
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KnownFields {
    pub datasource_url: Option<String>,
    /// Both `spring.redis` (Boot 2.x) and `spring.data.redis` (Boot 3.x)
    pub redis: Vec<Endpoint>,
    pub kafka_bootstrap_servers: Vec<String>,
    pub rabbitmq: Option<Endpoint>,
    pub server_port: Option<u16>,
}

impl KnownFields {
    fn from_document(doc: SpringDocument) -> Self {
        let spring = doc.spring;
        let redis = [spring.redis, spring.data.redis]
            .into_iter()
            .filter_map(endpoint_from_section)
            .collect();

        let kafka_bootstrap_servers = match spring.kafka.bootstrap_servers {
            Some(serde_yaml::Value::String(s)) => vec![s],
            Some(serde_yaml::Value::Sequence(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        Self {
            datasource_url: spring.datasource.url.filter(|u| !u.is_empty()),
            redis,
            kafka_bootstrap_servers,
            rabbitmq: endpoint_from_section(spring.rabbitmq),
            server_port: doc.server.port.as_ref().and_then(resolved_port),
        }
    }

    fn from_properties(props: &BTreeMap<String, String>) -> Self {
        let endpoint = |host_key: &str, port_key: &str| {
            props
                .get(host_key)
                .filter(|h| !h.is_empty())
                .map(|host| Endpoint {
                    host: host.clone(),
                    port: props.get(port_key).and_then(|p| text_port(p)),
                })
        };

        let redis = [
            endpoint("spring.redis.host", "spring.redis.port"),
            endpoint("spring.data.redis.host", "spring.data.redis.port"),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            datasource_url: props.get("spring.datasource.url").cloned(),
            redis,
            kafka_bootstrap_servers: props
                .get("spring.kafka.bootstrap-servers")
                .cloned()
                .into_iter()
                .collect(),
            rabbitmq: endpoint("spring.rabbitmq.host", "spring.rabbitmq.port"),
            server_port: props.get("server.port").and_then(|p| text_port(p)),
        }
    }

    /// Facts for the well-known keys, all High except defaulted JDBC ports
    pub fn dependencies(&self, source_label: &str) -> Vec<NetworkDependency> {
        let mut deps = Vec::new();

        if let Some(dep) = self
            .datasource_url
            .as_deref()
            .and_then(|url| patterns::parse_jdbc(&resolve_placeholders(url)))
        {
            deps.push(dep);
        }

        for redis in &self.redis {
            deps.push(endpoint_dependency(redis, REDIS_DEFAULT_PORT, "Redis"));
        }

        for servers in &self.kafka_bootstrap_servers {
            for broker in servers.split(',') {
                let broker = resolve_placeholders(broker.trim());
                if let Some((host, port)) = patterns::host_ports(&broker).into_iter().next() {
                    deps.push(
                        NetworkDependency::new(host, port, Confidence::High)
                            .with_description("Kafka"),
                    );
                }
            }
        }

        if let Some(rabbit) = &self.rabbitmq {
            deps.push(endpoint_dependency(rabbit, RABBITMQ_DEFAULT_PORT, "RabbitMQ"));
        }

        if let Some(port) = self.server_port {
            deps.push(
                NetworkDependency::new("self", port, Confidence::High)
                    .with_description("server listening port"),
            );
        }

        deps.into_iter()
            .map(|d| d.with_source_file(source_label))
            .collect()
    }
}

fn endpoint_from_section(section: EndpointSection) -> Option<Endpoint> {
    let host = section.host.filter(|h| !h.is_empty())?;
    Some(Endpoint {
        host,
        port: section.port.as_ref().and_then(resolved_port),
    })
}

/// Port text with `${NAME:default}` placeholders resolved first
fn text_port(value: &str) -> Option<u16> {
    PortNumber::Text(resolve_placeholders(value).into_owned()).as_port()
}

fn resolved_port(port: &PortNumber) -> Option<u16> {
    match port {
        PortNumber::Text(text) => text_port(text),
        number => number.as_port(),
    }
}

fn endpoint_dependency(endpoint: &Endpoint, default_port: u16, label: &str) -> NetworkDependency {
    let host = resolve_placeholders(&endpoint.host).into_owned();
    NetworkDependency::new(host, endpoint.port.unwrap_or(default_port), Confidence::High)
        .with_description(label)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{[^}:]+:([^}]*)\}").expect("valid regex"))
}

/// Replaces `${NAME:default}` placeholders with their default value
pub fn resolve_placeholders(value: &str) -> Cow<'_, str> {
    placeholder_regex().replace_all(value, "$1")
}

/// Splits `.properties` content into key/value pairs.
///
/// Blank lines and `#`/`!` comments are skipped; the separator is the first `=` or `:`.
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let idx = line.find(['=', ':'])?;
            Some((
                line[..idx].trim().to_string(),
                line[idx + 1..].trim().to_string(),
            ))
        })
        .collect()
}

/// Decodes every `---` document; a malformed first document is an error, a malformed
/// later document ends the stream.
fn load_documents(content: &str, source_label: &str) -> Result<Vec<serde_yaml::Value>, ExtractError> {
    let mut documents = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        match serde_yaml::Value::deserialize(document) {
            Ok(value) => documents.push(value),
            Err(e) if index == 0 => return Err(ExtractError::Yaml(e)),
            Err(e) => {
                debug!(
                    source = source_label,
                    document = index,
                    error = %e,
                    "Stopping at malformed profile document"
                );
                break;
            }
        }
    }
    Ok(documents)
}

fn walk_strings<'a>(value: &'a serde_yaml::Value, visit: &mut dyn FnMut(&'a str)) {
    match value {
        serde_yaml::Value::String(s) => visit(s),
        serde_yaml::Value::Sequence(items) => items.iter().for_each(|v| walk_strings(v, visit)),
        serde_yaml::Value::Mapping(map) => map.values().for_each(|v| walk_strings(v, visit)),
        serde_yaml::Value::Tagged(tagged) => walk_strings(&tagged.value, visit),
        _ => {}
    }
}

/// Extracts facts from a multi-profile `application.yml`
pub fn parse_yaml(content: &str, source_label: &str) -> Result<Vec<NetworkDependency>, ExtractError> {
    let documents = load_documents(content, source_label)?;

    let mut deps = Vec::new();
    for doc in documents.iter().filter(|d| d.is_mapping()) {
        match serde_yaml::from_value::<SpringDocument>(doc.clone()) {
            Ok(typed) => {
                let found = KnownFields::from_document(typed).dependencies(source_label);
                deps = merge_unique(deps, found);
            }
            Err(e) => debug!(source = source_label, error = %e, "Typed Spring pass skipped document"),
        }
    }

    for doc in &documents {
        let mut found = Vec::new();
        walk_strings(doc, &mut |value| {
            if let Some(dep) = patterns::recognize(&resolve_placeholders(value)) {
                found.push(dep.with_source_file(source_label));
            }
        });
        deps = merge_unique(deps, found);
    }

    Ok(deps)
}

/// Extracts facts from `application.properties`
pub fn parse_properties_file(content: &str, source_label: &str) -> Vec<NetworkDependency> {
    let props = parse_properties(content);
    let mut deps = KnownFields::from_properties(&props).dependencies(source_label);

    for (key, value) in &props {
        if HANDLED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if let Some(dep) = patterns::recognize(&resolve_placeholders(value)) {
            deps = merge_unique(deps, vec![dep.with_source_file(source_label)]);
        }
    }

    deps
}

/// `application.yml` / `application.yaml`
#[derive(Debug, Default, Clone, Copy)]
pub struct SpringYamlExtractor;

impl Extractor for SpringYamlExtractor {
    fn name(&self) -> &'static str {
        "spring-yaml"
    }

    fn extract(
        &self,
        source_label: &str,
        content: &str,
    ) -> Result<Vec<NetworkDependency>, ExtractError> {
        parse_yaml(content, source_label)
    }
}

/// `application.properties`
#[derive(Debug, Default, Clone, Copy)]
pub struct SpringPropertiesExtractor;

impl Extractor for SpringPropertiesExtractor {
    fn name(&self) -> &'static str {
        "spring-properties"
    }

    fn extract(
        &self,
        source_label: &str,
        content: &str,
    ) -> Result<Vec<NetworkDependency>, ExtractError> {
        Ok(parse_properties_file(content, source_label))
    }
}
