//! Build manifest extraction (Maven and Gradle)
//!
//! Client libraries for well-known infrastructure imply a dependency on that
//! infrastructure. Build files describe a repository rather than a service, so facts
//! are Low confidence and carry no source.

use crate::extractors::error::ExtractError;
use crate::extractors::Extractor;
use crate::model::{Confidence, NetworkDependency};
use regex::Regex;
use roxmltree::Document;
use std::sync::OnceLock;

/// A client library and the infrastructure it talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownLibrary {
    pub artifact_id: &'static str,
    pub target: &'static str,
    pub port: u16,
    pub description: &'static str,
}

const fn lib(
    artifact_id: &'static str,
    target: &'static str,
    port: u16,
    description: &'static str,
) -> KnownLibrary {
    KnownLibrary {
        artifact_id,
        target,
        port,
        description,
    }
}

pub const KNOWN_LIBRARIES: &[KnownLibrary] = &[
    lib("spring-boot-starter-data-redis", "redis", 6379, "Redis (Spring Boot starter)"),
    lib("jedis", "redis", 6379, "Redis (Jedis client)"),
    lib("lettuce-core", "redis", 6379, "Redis (Lettuce client)"),
    lib("kafka-clients", "kafka", 9092, "Kafka (clients)"),
    lib("spring-kafka", "kafka", 9092, "Kafka (Spring)"),
    lib("postgresql", "postgresql", 5432, "PostgreSQL"),
    lib("spring-boot-starter-data-jpa", "postgresql", 5432, "PostgreSQL (Spring JPA)"),
    lib("mysql-connector-java", "mysql", 3306, "MySQL"),
    lib("mysql-connector-j", "mysql", 3306, "MySQL"),
    lib("mongo-java-driver", "mongodb", 27017, "MongoDB"),
    lib("spring-boot-starter-data-mongodb", "mongodb", 27017, "MongoDB (Spring)"),
    lib("spring-boot-starter-amqp", "rabbitmq", 5672, "RabbitMQ (Spring AMQP)"),
    lib("amqp-client", "rabbitmq", 5672, "RabbitMQ"),
    lib("elasticsearch-rest-high-level-client", "elasticsearch", 9200, "Elasticsearch"),
    lib("spring-data-elasticsearch", "elasticsearch", 9200, "Elasticsearch (Spring Data)"),
];

pub fn lookup_library(artifact_id: &str) -> Option<&'static KnownLibrary> {
    KNOWN_LIBRARIES.iter().find(|l| l.artifact_id == artifact_id)
}

fn library_dependency(group: &str, artifact: &str, source_label: &str) -> Option<NetworkDependency> {
    let lib = lookup_library(artifact)?;
    Some(
        NetworkDependency::new(lib.target, lib.port, Confidence::Low)
            .with_description(format!(
                "build dependency: {}:{} -> {}",
                group, artifact, lib.description
            ))
            .with_source_file(source_label),
    )
}

/// Facts from `<project><dependencies><dependency>` entries.
///
/// `dependencyManagement` and plugin dependencies are not looked at.
pub fn parse_pom(content: &str, source_label: &str) -> Result<Vec<NetworkDependency>, ExtractError> {
    let doc = Document::parse(content)?;
    let root = doc.root_element();
    if !root.has_tag_name("project") {
        return Ok(Vec::new());
    }

    let child_text = |node: roxmltree::Node, name: &str| {
        node.children()
            .find(|c| c.has_tag_name(name))
            .and_then(|c| c.text())
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    };

    let deps = root
        .children()
        .filter(|c| c.has_tag_name("dependencies"))
        .flat_map(|deps| deps.children().filter(|c| c.has_tag_name("dependency")))
        .filter_map(|dep| {
            let group = child_text(dep, "groupId");
            let artifact = child_text(dep, "artifactId");
            library_dependency(&group, &artifact, source_label)
        })
        .collect();

    Ok(deps)
}

fn gradle_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?:implementation|compile|runtimeOnly|compileOnly|api|testImplementation)\s*\(?\s*['"]([^'"]+)['"]"#,
        )
        .expect("valid regex")
    })
}

/// Facts from Groovy or Kotlin DSL dependency declarations
pub fn parse_gradle(content: &str, source_label: &str) -> Vec<NetworkDependency> {
    content
        .lines()
        .filter_map(|line| gradle_regex().captures(line.trim()))
        .filter_map(|caps| {
            let coordinate = caps.get(1)?.as_str();
            let mut parts = coordinate.split(':');
            let group = parts.next()?;
            let artifact = parts.next()?;
            library_dependency(group, artifact, source_label)
        })
        .collect()
}

/// `pom.xml`
#[derive(Debug, Default, Clone, Copy)]
pub struct MavenExtractor;

impl Extractor for MavenExtractor {
    fn name(&self) -> &'static str {
        "maven"
    }

    fn extract(
        &self,
        source_label: &str,
        content: &str,
    ) -> Result<Vec<NetworkDependency>, ExtractError> {
        parse_pom(content, source_label)
    }
}

/// `build.gradle` / `build.gradle.kts`
#[derive(Debug, Default, Clone, Copy)]
pub struct GradleExtractor;

impl Extractor for GradleExtractor {
    fn name(&self) -> &'static str {
        "gradle"
    }

    fn extract(
        &self,
        source_label: &str,
        content: &str,
    ) -> Result<Vec<NetworkDependency>, ExtractError> {
        Ok(parse_gradle(content, source_label))
    }
}
