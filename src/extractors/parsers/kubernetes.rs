//! Kubernetes manifest extraction
//!
//! Multi-document YAML is decoded one document at a time into a [`Manifest`] variant
//! selected by `kind`. Workloads contribute container ports, env values and
//! ConfigMap/Secret references; Services contribute their ports; ConfigMaps have their
//! data values scanned. Helm-rendered output goes through the same path.

use super::PortNumber;
use crate::extractors::error::ExtractError;
use crate::extractors::patterns;
use crate::extractors::Extractor;
use crate::model::{Confidence, NetworkDependency};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

const UNKNOWN_NAME: &str = "unknown";

/// Kubernetes objects that carry network information
#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum Manifest {
    Deployment(Workload),
    StatefulSet(Workload),
    Service(ServiceManifest),
    ConfigMap(ConfigMapManifest),
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Workload {
    pub metadata: Metadata,
    pub spec: WorkloadSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkloadSpec {
    pub template: PodTemplate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PodTemplate {
    pub spec: PodSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PodSpec {
    pub containers: Vec<Container>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Container {
    pub ports: Vec<ContainerPort>,
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerPort {
    pub container_port: Option<PortNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    pub value: Option<serde_yaml::Value>,
    pub value_from: Option<EnvVarSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvVarSource {
    pub config_map_key_ref: Option<KeyRef>,
    pub secret_key_ref: Option<KeyRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KeyRef {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceManifest {
    pub metadata: Metadata,
    pub spec: ServiceSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceSpec {
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServicePort {
    pub port: Option<PortNumber>,
    pub target_port: Option<PortNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigMapManifest {
    pub metadata: Metadata,
    pub data: BTreeMap<String, serde_yaml::Value>,
}

impl Metadata {
    fn name_or_unknown(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_NAME)
            .to_string()
    }
}

/// Cheap pre-filter separating manifests from other YAML sharing the extension
pub fn looks_like_manifest(content: &str) -> bool {
    content.contains("apiVersion:") && content.contains("kind:")
}

/// Extracts facts from multi-document manifest YAML.
///
/// Decoding stops at the first malformed document; facts from earlier documents
/// are kept.
pub fn parse_manifests(content: &str, source_label: &str) -> Vec<NetworkDependency> {
    if !looks_like_manifest(content) {
        return Vec::new();
    }

    let mut deps = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value = match serde_yaml::Value::deserialize(document) {
            Ok(value) => value,
            Err(e) => {
                debug!(
                    source = source_label,
                    document = index,
                    error = %e,
                    "Stopping at malformed manifest document"
                );
                break;
            }
        };
        if !value.is_mapping() {
            continue;
        }

        let manifest = match serde_yaml::from_value::<Manifest>(value) {
            Ok(manifest) => manifest,
            Err(e) => {
                debug!(
                    source = source_label,
                    document = index,
                    error = %e,
                    "Skipping manifest with unexpected shape"
                );
                continue;
            }
        };

        match manifest {
            Manifest::Deployment(workload) | Manifest::StatefulSet(workload) => {
                deps.extend(workload_dependencies(&workload, source_label))
            }
            Manifest::Service(service) => {
                deps.extend(service_dependencies(&service, source_label))
            }
            Manifest::ConfigMap(config_map) => {
                deps.extend(config_map_dependencies(&config_map, source_label))
            }
            Manifest::Other => {}
        }
    }

    deps
}

fn workload_dependencies(workload: &Workload, source_label: &str) -> Vec<NetworkDependency> {
    let name = workload.metadata.name_or_unknown();
    let mut deps = Vec::new();

    for container in &workload.spec.template.spec.containers {
        for port in container
            .ports
            .iter()
            .filter_map(|p| p.container_port.as_ref().and_then(PortNumber::as_port))
        {
            deps.push(
                NetworkDependency::new(name.clone(), port, Confidence::High)
                    .with_source(name.clone())
                    .with_description(format!("container port {}", port))
                    .with_source_file(source_label),
            );
        }

        for env in &container.env {
            if let Some(value) = env.value.as_ref().and_then(serde_yaml::Value::as_str) {
                deps.extend(
                    patterns::recognize_all(value, &env.name, Confidence::High)
                        .into_iter()
                        .map(|d| d.with_source(name.clone()).with_source_file(source_label)),
                );
            }

            let Some(value_from) = &env.value_from else {
                continue;
            };
            let references = [
                ("ConfigMap", value_from.config_map_key_ref.as_ref()),
                ("Secret", value_from.secret_key_ref.as_ref()),
            ];
            for (object, key_ref) in references {
                let Some(key_ref) = key_ref.filter(|r| !r.name.is_empty()) else {
                    continue;
                };
                deps.push(
                    NetworkDependency::new(key_ref.name.clone(), 0, Confidence::Medium)
                        .with_source(name.clone())
                        .with_description(format!(
                            "env {} references {} {}",
                            env.name, object, key_ref.name
                        ))
                        .with_source_file(source_label),
                );
            }
        }
    }

    deps
}

fn service_dependencies(service: &ServiceManifest, source_label: &str) -> Vec<NetworkDependency> {
    let name = service.metadata.name_or_unknown();

    service
        .spec
        .ports
        .iter()
        .filter_map(|entry| {
            let port = entry.port.as_ref()?.as_port()?;
            let description = match entry.target_port.as_ref().and_then(PortNumber::as_port) {
                Some(target) if target != port => {
                    format!("service port {} -> targetPort {}", port, target)
                }
                _ => format!("service port {}", port),
            };
            Some(
                NetworkDependency::new(name.clone(), port, Confidence::High)
                    .with_source(name.clone())
                    .with_description(description)
                    .with_source_file(source_label),
            )
        })
        .collect()
}

fn config_map_dependencies(
    config_map: &ConfigMapManifest,
    source_label: &str,
) -> Vec<NetworkDependency> {
    let name = config_map.metadata.name_or_unknown();

    config_map
        .data
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|v| (key, v)))
        .flat_map(|(key, value)| patterns::recognize_all(value, key, Confidence::Medium))
        .map(|d| d.with_source(name.clone()).with_source_file(source_label))
        .collect()
}

/// Kubernetes manifests in any `.yaml`/`.yml` file
#[derive(Debug, Default, Clone, Copy)]
pub struct KubernetesExtractor;

impl Extractor for KubernetesExtractor {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    fn extract(
        &self,
        source_label: &str,
        content: &str,
    ) -> Result<Vec<NetworkDependency>, ExtractError> {
        Ok(parse_manifests(content, source_label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYMENT: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: orders
spec:
  template:
    spec:
      containers:
        - name: orders
          ports:
            - containerPort: 8080
          env:
            - name: DB_HOST
              value: "postgres-0.postgres.db.svc.cluster.local:5432"
            - name: PAYMENTS_URL
              value: "http://payments:9000/api"
            - name: DB_PASSWORD
              valueFrom:
                secretKeyRef:
                  name: db-credentials
                  key: password
            - name: FEATURE_FLAGS
              valueFrom:
                configMapKeyRef:
                  name: orders-config
                  key: flags
"#;

    fn find<'a>(deps: &'a [NetworkDependency], target: &str) -> &'a NetworkDependency {
        deps.iter()
            .find(|d| d.target == target)
            .unwrap_or_else(|| panic!("no dependency on {target}"))
    }

    #[test]
    fn test_deployment_container_port() {
        let deps = parse_manifests(DEPLOYMENT, "k8s/orders.yaml");
        let own = find(&deps, "orders");
        assert_eq!(own.source, "orders");
        assert_eq!(own.port, 8080);
        assert_eq!(own.confidence, Confidence::High);
        assert_eq!(own.description, "container port 8080");
        assert_eq!(own.source_file, "k8s/orders.yaml");
    }

    #[test]
    fn test_deployment_env_cluster_dns_is_normalized() {
        let deps = parse_manifests(DEPLOYMENT, "k8s/orders.yaml");
        let db = find(&deps, "postgres-0.postgres.db");
        assert_eq!(db.port, 5432);
        assert_eq!(db.source, "orders");
        assert_eq!(db.confidence, Confidence::High);
        assert!(deps.iter().all(|d| !d.target.contains("svc.cluster.local")));
    }

    #[test]
    fn test_deployment_env_url() {
        let deps = parse_manifests(DEPLOYMENT, "k8s/orders.yaml");
        let payments = find(&deps, "payments");
        assert_eq!(payments.port, 9000);
        assert_eq!(payments.confidence, Confidence::High);
    }

    #[test]
    fn test_value_from_references() {
        let deps = parse_manifests(DEPLOYMENT, "k8s/orders.yaml");

        let secret = find(&deps, "db-credentials");
        assert_eq!(secret.port, 0);
        assert_eq!(secret.confidence, Confidence::Medium);
        assert_eq!(
            secret.description,
            "env DB_PASSWORD references Secret db-credentials"
        );

        let config = find(&deps, "orders-config");
        assert_eq!(config.port, 0);
        assert!(config.description.contains("ConfigMap"));
    }

    #[test]
    fn test_service_ports() {
        let content = r#"
apiVersion: v1
kind: Service
metadata:
  name: orders
spec:
  ports:
    - port: 80
      targetPort: 8080
    - port: 9090
      targetPort: 9090
    - port: 0
"#;
        let deps = parse_manifests(content, "svc.yaml");
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].description, "service port 80 -> targetPort 8080");
        assert_eq!(deps[1].description, "service port 9090");
        assert!(deps.iter().all(|d| d.source == "orders" && d.target == "orders"));
    }

    #[test]
    fn test_config_map_values() {
        let content = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: app-config
data:
  redis: "cache:6379"
  greeting: "hello"
  replicas: 3
"#;
        let deps = parse_manifests(content, "cm.yaml");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source, "app-config");
        assert_eq!(deps[0].target, "cache");
        assert_eq!(deps[0].confidence, Confidence::Medium);
        assert_eq!(deps[0].description, "redis: host:port cache:6379");
    }

    #[test]
    fn test_statefulset_and_other_kinds() {
        let content = r#"
apiVersion: apps/v1
kind: StatefulSet
metadata:
  name: kafka
spec:
  template:
    spec:
      containers:
        - ports:
            - containerPort: "9092"
---
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web
spec:
  rules: []
"#;
        let deps = parse_manifests(content, "kafka.yaml");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].target, "kafka");
        assert_eq!(deps[0].port, 9092);
    }

    #[test]
    fn test_missing_name_is_unknown() {
        let content = r#"
apiVersion: v1
kind: Service
spec:
  ports:
    - port: 80
"#;
        let deps = parse_manifests(content, "svc.yaml");
        assert_eq!(deps[0].source, "unknown");
    }

    #[test]
    fn test_malformed_later_document_keeps_earlier_facts() {
        let content = r#"
apiVersion: v1
kind: Service
metadata:
  name: first
spec:
  ports:
    - port: 80
---
apiVersion: v1
kind: Service
metadata: [unclosed
---
apiVersion: v1
kind: Service
metadata:
  name: third
spec:
  ports:
    - port: 81
"#;
        let deps = parse_manifests(content, "multi.yaml");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source, "first");
    }

    #[test]
    fn test_non_manifest_yaml_is_ignored() {
        let content = "spring:\n  redis:\n    host: cache\n";
        assert!(parse_manifests(content, "application.yml").is_empty());
    }

    #[test]
    fn test_extractor_never_fails() {
        let extractor = KubernetesExtractor;
        let result = extractor.extract("broken.yaml", "apiVersion: v1\nkind: [\n");
        assert!(result.unwrap().is_empty());
    }
}
