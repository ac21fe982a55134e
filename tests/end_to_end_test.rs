//! End-to-end scanning tests
//!
//! Runs the scanner over fixture trees and checks the facts and policies that come
//! out the other end.

use async_trait::async_trait;
use segspec::render::netpol::{LabelSelector, NetworkPolicy, Peer};
use segspec::scanner::{ChartRenderer, RenderError};
use segspec::{
    render, Confidence, DependencySet, ExtractorRegistry, NetworkDependency, ScanError,
    ScanOptions, ScanReport, Scanner,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn without_helm() -> ScanOptions {
    ScanOptions {
        render_charts: false,
        ..ScanOptions::default()
    }
}

async fn scan(root: &Path) -> ScanReport {
    Scanner::new(root, Arc::new(ExtractorRegistry::with_defaults()))
        .with_options(without_helm())
        .scan()
        .await
        .expect("scan should succeed")
}

fn fact(set: &DependencySet, source: &str, target: &str, port: u16) -> NetworkDependency {
    set.dependencies()
        .into_iter()
        .find(|d| d.source == source && d.target == target && d.port == port)
        .unwrap_or_else(|| panic!("missing {}->{}:{}", source, target, port))
}

fn parse_policies(yaml: &str) -> Vec<NetworkPolicy> {
    yaml.split("---\n")
        .map(|doc| serde_yaml::from_str(doc).expect("valid policy document"))
        .collect()
}

fn app_peer(name: &str) -> Peer {
    Peer {
        pod_selector: Some(LabelSelector::single("app", name)),
        ..Peer::default()
    }
}

#[tokio::test]
async fn test_compose_project() {
    let report = scan(&fixture("compose-app")).await;
    let set = &report.dependencies;

    assert_eq!(set.service_name(), "compose-app");
    assert!(report.warnings.is_empty());

    let exposed = fact(set, "app", "app", 3000);
    assert_eq!(exposed.protocol, "TCP");
    assert_eq!(exposed.confidence, Confidence::High);
    assert_eq!(exposed.source_file, "docker-compose.yml");

    let db = fact(set, "app", "db", 5432);
    assert_eq!(db.confidence, Confidence::High);
    assert_eq!(db.description, "PostgreSQL");

    let image = fact(set, "db", "db", 5432);
    assert_eq!(image.confidence, Confidence::Low);
}

#[tokio::test]
async fn test_compose_project_per_service_policies() {
    let report = scan(&fixture("compose-app")).await;
    let yaml = render::render_per_service(&report.dependencies).unwrap();
    assert!(yaml.starts_with("# Review:"));

    let policies = parse_policies(&yaml);
    let app = policies
        .iter()
        .find(|p| p.metadata.name == "app-netpol")
        .expect("app policy");

    assert_eq!(app.spec.policy_types, vec!["Ingress", "Egress"]);
    let to_db = app
        .spec
        .egress
        .iter()
        .find(|rule| rule.to == vec![app_peer("db")])
        .expect("egress to db");
    assert_eq!(to_db.ports[0].port, 5432);
    assert_eq!(to_db.ports[0].protocol, "TCP");

    let dns = app.spec.egress.last().expect("dns rule");
    assert_eq!(dns.ports.len(), 2);
    assert!(dns.ports.iter().all(|p| p.port == 53));
    assert_eq!(
        dns.to[0]
            .namespace_selector
            .as_ref()
            .and_then(|s| s.match_labels.get("kubernetes.io/metadata.name"))
            .map(String::as_str),
        Some("kube-system")
    );

    let db = policies
        .iter()
        .find(|p| p.metadata.name == "db-netpol")
        .expect("db policy");
    assert!(db
        .spec
        .ingress
        .iter()
        .any(|rule| rule.from == vec![app_peer("app")]));
}

#[tokio::test]
async fn test_mixed_project() {
    let report = scan(&fixture("orders-service")).await;
    let set = &report.dependencies;

    assert_eq!(set.service_name(), "orders-service");
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let db = fact(set, "orders-service", "orders-db", 5432);
    assert_eq!(db.description, "PostgreSQL");
    assert_eq!(db.source_file, "src/main/resources/application.yml");

    fact(set, "orders-service", "cache", 6379);
    fact(set, "orders-service", "self", 8080);
    fact(set, "orders", "orders", 8080);
    fact(set, "orders", "payments", 9000);

    let audit = fact(set, "orders-service", "audit", 7000);
    assert_eq!(audit.confidence, Confidence::Medium);
    assert_eq!(audit.source_file, ".env");

    let kafka = fact(set, "orders-service", "kafka", 9092);
    assert_eq!(kafka.confidence, Confidence::Low);
    assert_eq!(kafka.source_file, "pom.xml");
}

#[tokio::test]
async fn test_cluster_dns_names_are_shortened() {
    let report = scan(&fixture("orders-service")).await;
    let set = &report.dependencies;

    let inventory = fact(set, "orders", "postgres.inventory", 5432);
    assert_eq!(inventory.confidence, Confidence::High);
    assert_eq!(inventory.source_file, "k8s/deployment.yaml");
    assert!(set
        .dependencies()
        .iter()
        .all(|d| !d.target.ends_with(".svc.cluster.local")));

    let yaml = render::render_per_service(set).unwrap();
    let policies = parse_policies(&yaml);
    let orders = policies
        .iter()
        .find(|p| p.metadata.name == "orders-netpol")
        .expect("orders policy");
    let to_inventory = orders
        .spec
        .egress
        .iter()
        .find(|rule| rule.ports.first().map(|p| p.port) == Some(5432))
        .expect("egress to inventory");
    let peer = &to_inventory.to[0];
    assert_eq!(
        peer.pod_selector
            .as_ref()
            .and_then(|s| s.match_labels.get("app"))
            .map(String::as_str),
        Some("postgres")
    );
    assert_eq!(
        peer.namespace_selector
            .as_ref()
            .and_then(|s| s.match_labels.get("kubernetes.io/metadata.name"))
            .map(String::as_str),
        Some("inventory")
    );
}

#[tokio::test]
async fn test_embedded_databases_and_skipped_dirs() {
    let report = scan(&fixture("orders-service")).await;
    let set = &report.dependencies;

    assert!(set.dependencies().iter().all(|d| !d.target.contains("h2")));
    assert!(set.dependencies().iter().all(|d| d.source != "vendored"));
    assert!(set
        .dependencies()
        .iter()
        .all(|d| !d.source_file.starts_with("node_modules")));
}

#[tokio::test]
async fn test_single_service_layout() {
    let report = scan(&fixture("orders-service")).await;
    let yaml = render::render_single_service(&report.dependencies).unwrap();

    assert!(yaml.contains("name: orders-service-default-deny"));
    assert!(yaml.contains("name: orders-service-egress"));
    assert!(yaml.contains("generated-by: segspec"));
    assert!(!yaml.contains("# Skipped"));
}

#[tokio::test]
async fn test_malformed_files_become_warnings() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("docker-compose.yml"), "services: [unclosed\n").unwrap();
    fs::write(root.join(".env"), "CACHE=redis://cache:6379\n").unwrap();
    fs::create_dir(root.join("broken")).unwrap();
    fs::write(root.join("broken/pom.xml"), "<project><dependencies>").unwrap();

    let report = scan(root).await;

    let files: Vec<&str> = report.warnings.iter().map(|w| w.file.as_str()).collect();
    assert_eq!(files, vec!["broken/pom.xml", "docker-compose.yml"]);
    assert_eq!(report.dependencies.len(), 1);
    let name = report.dependencies.service_name().to_string();
    fact(&report.dependencies, &name, "cache", 6379);
}

#[tokio::test]
async fn test_empty_project() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("README.md"), "# nothing here\n").unwrap();

    let report = scan(temp.path()).await;
    assert!(report.dependencies.is_empty());
    assert_eq!(report.files_scanned, 0);
    assert_eq!(render::render_per_service(&report.dependencies).unwrap(), "");
}

#[tokio::test]
async fn test_missing_root_is_an_error() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope");

    let result = Scanner::new(&missing, Arc::new(ExtractorRegistry::with_defaults()))
        .scan()
        .await;
    assert!(matches!(result, Err(ScanError::RootNotFound(_))));
}

struct CannedChart {
    manifest: String,
    rendered: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl ChartRenderer for CannedChart {
    async fn render(&self, chart_dir: &Path) -> Result<String, RenderError> {
        self.rendered.lock().unwrap().push(chart_dir.to_path_buf());
        Ok(self.manifest.clone())
    }
}

#[tokio::test]
async fn test_helm_charts_are_rendered() {
    let temp = TempDir::new().unwrap();
    let chart = temp.path().join("deploy/chart");
    fs::create_dir_all(chart.join("templates")).unwrap();
    fs::write(chart.join("Chart.yaml"), "apiVersion: v2\nname: web\nversion: 0.1.0\n").unwrap();
    fs::write(
        chart.join("templates/deployment.yaml"),
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {{ .Release.Name }}\n",
    )
    .unwrap();

    let renderer = Arc::new(CannedChart {
        manifest: "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  template:\n    spec:\n      containers:\n        - name: web\n          env:\n            - name: SESSIONS\n              value: redis://sessions:6379\n".to_string(),
        rendered: Mutex::new(Vec::new()),
    });

    let report = Scanner::new(temp.path(), Arc::new(ExtractorRegistry::with_defaults()))
        .with_renderer(renderer.clone())
        .scan()
        .await
        .unwrap();

    assert_eq!(report.charts_rendered, 1);
    assert_eq!(renderer.rendered.lock().unwrap().len(), 1);

    let sessions = fact(&report.dependencies, "web", "sessions", 6379);
    assert_eq!(sessions.source_file, "deploy/chart/Chart.yaml (helm template)");
}

struct FailingChart;

#[async_trait]
impl ChartRenderer for FailingChart {
    async fn render(&self, _chart_dir: &Path) -> Result<String, RenderError> {
        Err(RenderError::ToolMissing("helm".to_string()))
    }
}

#[tokio::test]
async fn test_helm_failure_is_a_warning() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("Chart.yaml"), "apiVersion: v2\nname: web\n").unwrap();

    let report = Scanner::new(temp.path(), Arc::new(ExtractorRegistry::with_defaults()))
        .with_renderer(Arc::new(FailingChart))
        .scan()
        .await
        .unwrap();

    assert_eq!(report.charts_rendered, 0);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].file, "Chart.yaml");
}
