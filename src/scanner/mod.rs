//! Repository scanning
//!
//! Walks a directory tree, hands every matching file to the extractors from an
//! [`ExtractorRegistry`], renders Helm charts found along the way and folds the
//! resulting facts into one [`DependencySet`]. Per-file failures become
//! [`ScanWarning`]s; only an unreadable root is fatal.

pub mod helm;

pub use helm::{ChartRenderer, HelmCli, RenderError};

use crate::extractors::parsers::kubernetes;
use crate::extractors::ExtractorRegistry;
use crate::model::{DependencySet, NetworkDependency};
use ignore::WalkBuilder;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Directories never descended into
pub const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "target",
    ".git",
    ".svn",
    "__pycache__",
];

const CHART_FILE: &str = "Chart.yaml";

pub fn is_skipped_dir(name: &str) -> bool {
    SKIPPED_DIRS.contains(&name)
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("path does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// A non-fatal problem tied to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    /// Path relative to the scan root
    pub file: String,
    pub message: String,
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.message)
    }
}

#[derive(Debug)]
pub struct ScanReport {
    pub dependencies: DependencySet,
    pub warnings: Vec<ScanWarning>,
    pub files_scanned: usize,
    pub charts_rendered: usize,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub render_charts: bool,
    pub helm_values: Option<PathBuf>,
    pub helm_timeout: Duration,
    /// Files larger than this many bytes are skipped
    pub max_file_size: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            render_charts: true,
            helm_values: None,
            helm_timeout: Duration::from_secs(30),
            max_file_size: 1024 * 1024,
        }
    }
}

pub struct Scanner {
    root: PathBuf,
    registry: Arc<ExtractorRegistry>,
    options: ScanOptions,
    renderer: Option<Arc<dyn ChartRenderer>>,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, registry: Arc<ExtractorRegistry>) -> Self {
        Self {
            root: root.into(),
            registry,
            options: ScanOptions::default(),
            renderer: None,
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the default `helm` command line renderer
    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub async fn scan(&self) -> Result<ScanReport, ScanError> {
        let start = Instant::now();
        let root = self.resolve_root()?;
        let service_name = service_name_for(&root);

        info!(
            root = %root.display(),
            service = %service_name,
            extractors = self.registry.len(),
            "Starting scan"
        );

        let mut set = DependencySet::new(service_name.clone());
        let mut warnings = Vec::new();
        let mut charts = Vec::new();
        let mut files_scanned = 0;

        let walker = WalkBuilder::new(&root)
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                let name = entry.file_name().to_string_lossy();
                !(is_dir && entry.depth() > 0 && is_skipped_dir(&name))
            })
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) if err.depth() == Some(0) => {
                    return Err(ScanError::Walk {
                        path: root.clone(),
                        source: err,
                    });
                }
                Err(err) => {
                    warn!(error = %err, "Failed to read directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };

            if file_name == CHART_FILE {
                if let Some(dir) = path.parent() {
                    charts.push(dir.to_path_buf());
                }
            }

            let extractors = self.registry.matching(&file_name);
            if extractors.is_empty() {
                continue;
            }

            let relative = relative_path(&root, path);
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size > self.options.max_file_size {
                debug!(
                    path = %relative,
                    size,
                    max_file_size = self.options.max_file_size,
                    "Skipping oversized file"
                );
                continue;
            }

            let content = match std::fs::read(path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!(path = %relative, error = %e, "Failed to read file");
                    warnings.push(ScanWarning {
                        file: relative,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            files_scanned += 1;

            for extractor in extractors {
                match extractor.extract(&relative, &content) {
                    Ok(deps) => {
                        debug!(
                            path = %relative,
                            extractor = extractor.name(),
                            found = deps.len(),
                            "Extracted dependencies"
                        );
                        add_all(&mut set, deps, &service_name);
                    }
                    Err(e) => {
                        warn!(
                            path = %relative,
                            extractor = extractor.name(),
                            error = %e,
                            "Failed to parse file"
                        );
                        warnings.push(ScanWarning {
                            file: relative.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        let charts_rendered = if self.options.render_charts && !charts.is_empty() {
            self.render_charts(&root, &charts, &mut set, &mut warnings)
                .await
        } else {
            0
        };

        info!(
            dependencies = set.len(),
            warnings = warnings.len(),
            files_scanned,
            charts_rendered,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scan completed"
        );

        Ok(ScanReport {
            dependencies: set,
            warnings,
            files_scanned,
            charts_rendered,
        })
    }

    fn resolve_root(&self) -> Result<PathBuf, ScanError> {
        if !self.root.exists() {
            return Err(ScanError::RootNotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        self.root
            .canonicalize()
            .map_err(|_| ScanError::RootNotFound(self.root.clone()))
    }

    async fn render_charts(
        &self,
        root: &Path,
        charts: &[PathBuf],
        set: &mut DependencySet,
        warnings: &mut Vec<ScanWarning>,
    ) -> usize {
        let renderer: Arc<dyn ChartRenderer> = match &self.renderer {
            Some(renderer) => renderer.clone(),
            None => Arc::new(
                HelmCli::new(self.options.helm_timeout)
                    .with_values_file(self.options.helm_values.clone()),
            ),
        };
        let service_name = set.service_name().to_string();
        let mut rendered = 0;

        for chart_dir in charts {
            let relative = relative_path(root, chart_dir);
            let chart_file = if relative.is_empty() {
                CHART_FILE.to_string()
            } else {
                format!("{}/{}", relative, CHART_FILE)
            };

            match renderer.render(chart_dir).await {
                Ok(output) => {
                    let label = format!("{} (helm template)", chart_file);
                    let deps = kubernetes::parse_manifests(&output, &label);
                    info!(chart = %chart_file, found = deps.len(), "Rendered Helm chart");
                    add_all(set, deps, &service_name);
                    rendered += 1;
                }
                Err(e) => {
                    warn!(chart = %chart_file, error = %e, "Failed to render Helm chart");
                    warnings.push(ScanWarning {
                        file: chart_file,
                        message: e.to_string(),
                    });
                }
            }
        }

        rendered
    }
}

fn add_all(set: &mut DependencySet, deps: Vec<NetworkDependency>, service_name: &str) {
    for mut dep in deps {
        if dep.source.is_empty() {
            dep.source = service_name.to_string();
        }
        set.add(dep);
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Base name of the scan root, used as the default fact source
pub fn service_name_for(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> Arc<ExtractorRegistry> {
        Arc::new(ExtractorRegistry::with_defaults())
    }

    fn no_charts() -> ScanOptions {
        ScanOptions {
            render_charts: false,
            ..ScanOptions::default()
        }
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let scanner = Scanner::new("/definitely/not/here", registry());
        assert!(matches!(
            scanner.scan().await,
            Err(ScanError::RootNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_file_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(".env");
        fs::write(&file, "A=b:1234\n").unwrap();

        let scanner = Scanner::new(&file, registry());
        assert!(matches!(
            scanner.scan().await,
            Err(ScanError::NotADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_sources_default_to_root_name() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("billing");
        fs::create_dir(&root).unwrap();
        fs::write(root.join(".env"), "REDIS_URL=redis://cache:6379\n").unwrap();

        let report = Scanner::new(&root, registry())
            .with_options(no_charts())
            .scan()
            .await
            .unwrap();

        assert_eq!(report.dependencies.service_name(), "billing");
        let deps = report.dependencies.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source, "billing");
        assert_eq!(deps[0].source_file, ".env");
        assert_eq!(report.files_scanned, 1);
    }

    #[tokio::test]
    async fn test_skipped_directories() {
        let dir = TempDir::new().unwrap();
        for skipped in SKIPPED_DIRS {
            let sub = dir.path().join(skipped);
            fs::create_dir_all(&sub).unwrap();
            fs::write(sub.join(".env"), "DB_HOST=db:5432\n").unwrap();
        }
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/.env"), "CACHE=cache:6379\n").unwrap();

        let report = Scanner::new(dir.path(), registry())
            .with_options(no_charts())
            .scan()
            .await
            .unwrap();

        let deps = report.dependencies.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].target, "cache");
        assert_eq!(deps[0].source_file, "config/.env");
    }

    #[tokio::test]
    async fn test_parse_failure_is_warning() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("docker-compose.yml"), "services: [oops").unwrap();
        fs::write(dir.path().join(".env"), "API_URL=http://api:8080\n").unwrap();

        let report = Scanner::new(dir.path(), registry())
            .with_options(no_charts())
            .scan()
            .await
            .unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].file, "docker-compose.yml");
        assert_eq!(report.dependencies.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "API_URL=http://api:8080\n").unwrap();

        let report = Scanner::new(dir.path(), registry())
            .with_options(ScanOptions {
                max_file_size: 4,
                ..no_charts()
            })
            .scan()
            .await
            .unwrap();

        assert!(report.dependencies.is_empty());
        assert_eq!(report.files_scanned, 0);
    }

    struct CannedRenderer(Result<String, String>);

    #[async_trait]
    impl ChartRenderer for CannedRenderer {
        async fn render(&self, _chart_dir: &Path) -> Result<String, RenderError> {
            self.0.clone().map_err(RenderError::Failed)
        }
    }

    fn chart_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let chart = dir.path().join("deploy/chart");
        fs::create_dir_all(&chart).unwrap();
        fs::write(chart.join("Chart.yaml"), "name: api\nversion: 0.1.0\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_chart_output_is_parsed_as_manifests() {
        let dir = chart_tree();
        let rendered = "apiVersion: v1\nkind: Service\nmetadata:\n  name: api\nspec:\n  ports:\n    - port: 8080\n";
        let report = Scanner::new(dir.path(), registry())
            .with_renderer(Arc::new(CannedRenderer(Ok(rendered.to_string()))))
            .scan()
            .await
            .unwrap();

        assert_eq!(report.charts_rendered, 1);
        let deps = report.dependencies.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source_file, "deploy/chart/Chart.yaml (helm template)");
    }

    #[tokio::test]
    async fn test_chart_failure_is_warning() {
        let dir = chart_tree();
        let report = Scanner::new(dir.path(), registry())
            .with_renderer(Arc::new(CannedRenderer(Err("boom".to_string()))))
            .scan()
            .await
            .unwrap();

        assert_eq!(report.charts_rendered, 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].file, "deploy/chart/Chart.yaml");
        assert!(report.warnings[0].message.contains("boom"));
    }

    #[tokio::test]
    async fn test_charts_not_rendered_when_disabled() {
        let dir = chart_tree();
        let report = Scanner::new(dir.path(), registry())
            .with_options(no_charts())
            .with_renderer(Arc::new(CannedRenderer(Err("unused".to_string()))))
            .scan()
            .await
            .unwrap();

        assert!(report.warnings.is_empty());
        assert_eq!(report.charts_rendered, 0);
    }

    #[test]
    fn test_service_name_for() {
        assert_eq!(service_name_for(Path::new("/srv/orders")), "orders");
        assert_eq!(service_name_for(Path::new("/")), "unknown");
    }
}
