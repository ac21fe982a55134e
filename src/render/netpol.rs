//! Kubernetes NetworkPolicy generation
//!
//! Two layouts are supported. Single-service output locks down the scanned service
//! with a default-deny policy plus one egress allow-list. Mesh output writes one
//! policy per service seen anywhere in the set, carrying both directions.

use super::selector::{peer_for, sanitize_name, APP_LABEL, NAMESPACE_LABEL};
use crate::model::{DependencySet, NetworkDependency};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub const API_VERSION: &str = "networking.k8s.io/v1";
pub const KIND: &str = "NetworkPolicy";
pub const GENERATED_BY: &str = "segspec";
pub const DNS_NAMESPACE: &str = "kube-system";
pub const REVIEW_COMMENT: &str = "# Review: verify podSelector labels match your deployment";

const DEFAULT_DENY_COMMENT: &str =
    "# Default deny: blocks all traffic not explicitly allowed by other policies";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicy {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: PolicySpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    pub pod_selector: LabelSelector,
    pub policy_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<IngressRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<EgressRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn single(key: &str, value: &str) -> Self {
        let mut match_labels = BTreeMap::new();
        match_labels.insert(key.to_string(), value.to_string());
        Self { match_labels }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_block: Option<IpBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpBlock {
    pub cidr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPort {
    pub port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngressRule {
    pub from: Vec<Peer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PolicyPort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgressRule {
    pub to: Vec<Peer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PolicyPort>,
}

impl NetworkPolicy {
    fn new(name: String, app: &str, policy_types: &[&str]) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("generated-by".to_string(), GENERATED_BY.to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: Metadata { name, labels },
            spec: PolicySpec {
                pod_selector: LabelSelector::single(APP_LABEL, app),
                policy_types: policy_types.iter().map(|t| t.to_string()).collect(),
                ingress: Vec::new(),
                egress: Vec::new(),
            },
        }
    }
}

fn port_of(dep: &NetworkDependency) -> PolicyPort {
    PolicyPort {
        port: dep.port,
        protocol: dep.protocol.clone(),
    }
}

fn egress_to(dep: &NetworkDependency) -> EgressRule {
    EgressRule {
        to: vec![peer_for(&dep.target)],
        ports: vec![port_of(dep)],
    }
}

/// Allows DNS over UDP and TCP to the cluster's system namespace
pub fn dns_rule() -> EgressRule {
    EgressRule {
        to: vec![Peer {
            namespace_selector: Some(LabelSelector::single(NAMESPACE_LABEL, DNS_NAMESPACE)),
            ..Peer::default()
        }],
        ports: vec![
            PolicyPort {
                port: 53,
                protocol: "UDP".to_string(),
            },
            PolicyPort {
                port: 53,
                protocol: "TCP".to_string(),
            },
        ],
    }
}

/// Sorted, unique targets of facts without a usable port
pub fn skipped_targets(set: &DependencySet) -> Vec<String> {
    set.dependencies()
        .into_iter()
        .filter(|d| !d.has_port())
        .map(|d| d.target)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Default-deny plus egress allow-list for the scanned service
pub fn single_service_policies(set: &DependencySet) -> Vec<NetworkPolicy> {
    let deps = set.dependencies();
    if deps.is_empty() {
        return Vec::new();
    }

    let app = sanitize_name(set.service_name());
    let deny = NetworkPolicy::new(
        format!("{}-default-deny", app),
        &app,
        &["Ingress", "Egress"],
    );

    let mut allow = NetworkPolicy::new(format!("{}-egress", app), &app, &["Egress"]);
    let mut seen = HashSet::new();
    for dep in deps.iter().filter(|d| d.has_port()) {
        if seen.insert((dep.target.as_str(), dep.port, dep.protocol.as_str())) {
            allow.spec.egress.push(egress_to(dep));
        }
    }
    allow.spec.egress.push(dns_rule());

    vec![deny, allow]
}

/// One policy per service appearing as a source or target
pub fn per_service_policies(set: &DependencySet) -> Vec<NetworkPolicy> {
    set.services()
        .iter()
        .map(|service| {
            let app = sanitize_name(service);
            let mut policy =
                NetworkPolicy::new(format!("{}-netpol", app), &app, &["Ingress", "Egress"]);

            for dep in set.ingress_for(service) {
                if dep.source.is_empty() {
                    continue;
                }
                let ports = if dep.has_port() {
                    vec![port_of(&dep)]
                } else {
                    Vec::new()
                };
                policy.spec.ingress.push(IngressRule {
                    from: vec![peer_for(&dep.source)],
                    ports,
                });
            }

            for dep in set.egress_for(service) {
                if dep.has_port() {
                    policy.spec.egress.push(egress_to(&dep));
                }
            }
            if !policy.spec.egress.is_empty() {
                policy.spec.egress.push(dns_rule());
            }

            policy
        })
        .collect()
}

fn to_documents(policies: &[NetworkPolicy]) -> Result<Vec<String>, serde_yaml::Error> {
    policies.iter().map(serde_yaml::to_string).collect()
}

/// Renders the single-service layout; empty set renders to an empty string
pub fn render_single_service(set: &DependencySet) -> Result<String, serde_yaml::Error> {
    let policies = single_service_policies(set);
    if policies.is_empty() {
        return Ok(String::new());
    }

    let documents = to_documents(&policies)?;
    let mut out = String::new();
    out.push_str(REVIEW_COMMENT);
    out.push('\n');
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(doc);
        if i == 0 {
            out.push_str(DEFAULT_DENY_COMMENT);
            out.push('\n');
        }
    }

    let skipped = skipped_targets(set);
    if !skipped.is_empty() {
        out.push_str(&format!("# Skipped (no port): {}\n", skipped.join(", ")));
    }
    Ok(out)
}

/// Renders the per-service layout; empty set renders to an empty string
pub fn render_per_service(set: &DependencySet) -> Result<String, serde_yaml::Error> {
    let policies = per_service_policies(set);
    if policies.is_empty() {
        return Ok(String::new());
    }

    let documents = to_documents(&policies)?;
    Ok(format!("{}\n{}", REVIEW_COMMENT, documents.join("---\n")))
}
