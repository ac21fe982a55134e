//! Table of file patterns and the extractors that handle them

use super::parsers::build_file::{GradleExtractor, MavenExtractor};
use super::parsers::docker_compose::ComposeExtractor;
use super::parsers::env_file::EnvFileExtractor;
use super::parsers::kubernetes::KubernetesExtractor;
use super::parsers::spring::{SpringPropertiesExtractor, SpringYamlExtractor};
use super::Extractor;
use std::fmt;
use std::sync::Arc;

/// Matches a file's base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePattern {
    Exact(String),
    Suffix(String),
}

impl FilePattern {
    pub fn exact(name: impl Into<String>) -> Self {
        FilePattern::Exact(name.into())
    }

    pub fn suffix(suffix: impl Into<String>) -> Self {
        FilePattern::Suffix(suffix.into())
    }

    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            FilePattern::Exact(name) => file_name == name,
            FilePattern::Suffix(suffix) => file_name.ends_with(suffix.as_str()),
        }
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilePattern::Exact(name) => f.write_str(name),
            FilePattern::Suffix(suffix) => write!(f, "*{}", suffix),
        }
    }
}

/// Explicit, constructed extractor table.
///
/// A file may match several entries (an `application.yml` is scanned both as Spring
/// config and as a potential Kubernetes manifest); all of them run, in registration
/// order.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    entries: Vec<(FilePattern, Arc<dyn Extractor>)>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        let kubernetes: Arc<dyn Extractor> = Arc::new(KubernetesExtractor);
        registry.register(FilePattern::suffix(".yaml"), kubernetes.clone());
        registry.register(FilePattern::suffix(".yml"), kubernetes);

        let spring_yaml: Arc<dyn Extractor> = Arc::new(SpringYamlExtractor);
        registry.register(FilePattern::exact("application.yml"), spring_yaml.clone());
        registry.register(FilePattern::exact("application.yaml"), spring_yaml);
        registry.register(
            FilePattern::exact("application.properties"),
            Arc::new(SpringPropertiesExtractor),
        );

        let compose: Arc<dyn Extractor> = Arc::new(ComposeExtractor);
        for name in [
            "docker-compose.yml",
            "docker-compose.yaml",
            "compose.yml",
            "compose.yaml",
        ] {
            registry.register(FilePattern::exact(name), compose.clone());
        }

        registry.register(FilePattern::suffix(".env"), Arc::new(EnvFileExtractor));

        registry.register(FilePattern::exact("pom.xml"), Arc::new(MavenExtractor));
        let gradle: Arc<dyn Extractor> = Arc::new(GradleExtractor);
        registry.register(FilePattern::exact("build.gradle"), gradle.clone());
        registry.register(FilePattern::exact("build.gradle.kts"), gradle);

        registry
    }

    pub fn register(&mut self, pattern: FilePattern, extractor: Arc<dyn Extractor>) {
        self.entries.push((pattern, extractor));
    }

    /// Every extractor whose pattern matches `file_name`, in registration order
    pub fn matching(&self, file_name: &str) -> Vec<Arc<dyn Extractor>> {
        self.entries
            .iter()
            .filter(|(pattern, _)| pattern.matches(file_name))
            .map(|(_, extractor)| extractor.clone())
            .collect()
    }

    pub fn patterns(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(pattern, extractor)| format!("{} -> {}", pattern, extractor.name()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("entries", &self.patterns())
            .finish()
    }
}
