//! Target classification and Kubernetes name sanitization

use super::netpol::{IpBlock, LabelSelector, Peer};
use std::net::IpAddr;

/// Pod label key used for service selectors
pub const APP_LABEL: &str = "app";

/// Namespace label set by Kubernetes on every namespace
pub const NAMESPACE_LABEL: &str = "kubernetes.io/metadata.name";

const MAX_NAME_LEN: usize = 63;

/// How a dependency target is selected in a policy peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Literal IP address, selected as a single-host CIDR
    Ip(IpAddr),
    /// Dotted `service.namespace[.rest]` name
    Qualified {
        service: String,
        namespace: Option<String>,
    },
    /// Bare name used as the `app` label value
    Pod(String),
}

impl Destination {
    pub fn classify(target: &str) -> Self {
        if let Ok(ip) = target.parse::<IpAddr>() {
            return Destination::Ip(ip);
        }
        if target.contains('.') {
            let mut parts = target.splitn(3, '.');
            let service = parts.next().unwrap_or_default().to_string();
            let namespace = parts
                .next()
                .filter(|ns| !ns.is_empty())
                .map(str::to_string);
            return Destination::Qualified { service, namespace };
        }
        Destination::Pod(target.to_string())
    }

    pub fn to_peer(&self) -> Peer {
        match self {
            Destination::Ip(ip) => Peer {
                ip_block: Some(IpBlock {
                    cidr: format!("{}/32", ip),
                }),
                ..Peer::default()
            },
            Destination::Qualified { service, namespace } => Peer {
                pod_selector: Some(LabelSelector::single(APP_LABEL, service)),
                namespace_selector: namespace
                    .as_ref()
                    .map(|ns| LabelSelector::single(NAMESPACE_LABEL, ns)),
                ..Peer::default()
            },
            Destination::Pod(name) => Peer {
                pod_selector: Some(LabelSelector::single(APP_LABEL, name)),
                ..Peer::default()
            },
        }
    }
}

/// Peer selecting `target` by IP, qualified name or pod label
pub fn peer_for(target: &str) -> Peer {
    Destination::classify(target).to_peer()
}

/// Converts `name` into a valid Kubernetes resource name.
///
/// Lower-cases, maps anything outside `[a-z0-9-]` to `-`, trims hyphens, caps the
/// length at 63 and falls back to `unknown` when nothing is left.
pub fn sanitize_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let mut sanitized = mapped.trim_matches('-').to_string();
    sanitized.truncate(MAX_NAME_LEN);
    let sanitized = sanitized.trim_end_matches('-');

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        mixed = { "My App_v2.0", "my-app-v2-0" },
        plain = { "orders", "orders" },
        edges = { "--api--", "api" },
        symbols_only = { "___", "unknown" },
        empty = { "", "unknown" },
        unicode = { "café", "caf" },
    )]
    fn test_sanitize_name(input: &str, expected: &str) {
        assert_eq!(sanitize_name(input), expected);
    }

    #[test]
    fn test_sanitize_truncation_retrims() {
        let input = format!("{}-b", "a".repeat(62));
        assert_eq!(sanitize_name(&input), "a".repeat(62));

        let long = "x".repeat(100);
        assert_eq!(sanitize_name(&long).len(), 63);
    }

    #[test]
    fn test_classify_ip() {
        assert_eq!(
            Destination::classify("10.0.0.5"),
            Destination::Ip("10.0.0.5".parse().unwrap())
        );
        let peer = peer_for("10.0.0.5");
        assert_eq!(peer.ip_block.unwrap().cidr, "10.0.0.5/32");
        assert!(peer.pod_selector.is_none());
    }

    #[test]
    fn test_classify_qualified() {
        assert_eq!(
            Destination::classify("postgres-0.postgres.db"),
            Destination::Qualified {
                service: "postgres-0".into(),
                namespace: Some("postgres".into()),
            }
        );

        let peer = peer_for("orders.shop");
        assert_eq!(peer.pod_selector.unwrap().match_labels["app"], "orders");
        assert_eq!(
            peer.namespace_selector.unwrap().match_labels[NAMESPACE_LABEL],
            "shop"
        );
    }

    #[test]
    fn test_classify_trailing_dot_has_no_namespace() {
        assert_eq!(
            Destination::classify("orders."),
            Destination::Qualified {
                service: "orders".into(),
                namespace: None,
            }
        );
    }

    #[test]
    fn test_classify_bare_name() {
        let peer = peer_for("redis");
        assert_eq!(peer.pod_selector.unwrap().match_labels["app"], "redis");
        assert!(peer.namespace_selector.is_none());
        assert!(peer.ip_block.is_none());
    }
}
