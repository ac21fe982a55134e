//! Value-pattern recognition
//!
//! Classifies a single configuration value (an env var, a YAML leaf, a property) as a
//! JDBC URL, a generic URL, a Kubernetes internal DNS name, or a bare `host:port`.
//! Rules are tried in that order and the first one that applies wins.
//!
//! Two entry points exist:
//! - [`recognize`] is the generic path used by Spring, Compose and `.env` scanning. It
//!   yields at most one fact and assigns confidence per rule.
//! - [`recognize_all`] is the Kubernetes path used for container env values and
//!   ConfigMap data. It accepts every supported URL scheme with or without a port,
//!   returns every `host:port` occurrence, forces the caller's confidence and
//!   prefixes descriptions with the key the value came from.
//!
//! Returned facts carry no source and no source file; callers fill both in.

use crate::model::{Confidence, NetworkDependency};
use regex::Regex;
use std::sync::OnceLock;
use url::{Host, Url};

const CLUSTER_DNS_SUFFIX: &str = ".svc.cluster.local";

/// Embedded or in-memory JDBC drivers that never describe a network peer
const EMBEDDED_JDBC_PREFIXES: &[&str] = &["jdbc:h2:", "jdbc:derby:"];

/// Schemes recognized beyond http/https, with their display names
const DATA_SCHEMES: &[(&str, &str)] = &[
    ("postgresql", "PostgreSQL"),
    ("postgres", "PostgreSQL"),
    ("redis", "Redis"),
    ("amqp", "RabbitMQ"),
    ("mongodb", "MongoDB"),
    ("mysql", "MySQL"),
    ("kafka", "Kafka"),
];

fn jdbc_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^jdbc:(\w+)://([^/:;?]+)(?::(\d+))?").expect("valid regex"))
}

fn host_port_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([a-zA-Z0-9][-a-zA-Z0-9_.]+):(\d{2,5})\b").expect("valid regex")
    })
}

fn cluster_dns_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([a-zA-Z0-9][-a-zA-Z0-9.]*)\.([a-zA-Z0-9][-a-zA-Z0-9]*)\.svc\.cluster\.local")
            .expect("valid regex")
    })
}

/// Default port for a JDBC driver name
pub fn jdbc_default_port(driver: &str) -> Option<u16> {
    match driver {
        "postgresql" | "postgres" => Some(5432),
        "mysql" | "mariadb" => Some(3306),
        "oracle" => Some(1521),
        "sqlserver" | "mssql" => Some(1433),
        _ => None,
    }
}

fn jdbc_description(driver: &str) -> String {
    match driver {
        "postgresql" | "postgres" => "PostgreSQL".to_string(),
        "mysql" => "MySQL".to_string(),
        "mariadb" => "MariaDB".to_string(),
        "oracle" => "Oracle".to_string(),
        "sqlserver" | "mssql" => "SQL Server".to_string(),
        other => other.to_string(),
    }
}

/// True for `jdbc:h2:` and `jdbc:derby:` values, which are never network facts
pub fn is_embedded_jdbc(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    EMBEDDED_JDBC_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Parses `jdbc:<driver>://<host>[:<port>]`.
///
/// An explicit port gives High confidence, a driver default gives Medium, and an
/// unknown driver without a port gives nothing.
pub fn parse_jdbc(value: &str) -> Option<NetworkDependency> {
    let value = value.trim();
    if is_embedded_jdbc(value) {
        return None;
    }

    let caps = jdbc_regex().captures(value)?;
    let driver = caps.get(1)?.as_str().to_ascii_lowercase();
    let host = caps.get(2)?.as_str();

    let (port, confidence) = match caps.get(3) {
        Some(p) => (p.as_str().parse::<u16>().ok()?, Confidence::High),
        None => (jdbc_default_port(&driver)?, Confidence::Medium),
    };
    if port == 0 {
        return None;
    }

    Some(
        NetworkDependency::new(normalize_cluster_host(host), port, confidence)
            .with_description(jdbc_description(&driver)),
    )
}

/// Every `host:port` occurrence in `value`, skipping digest-like hosts and port 0
pub fn host_ports(value: &str) -> Vec<(String, u16)> {
    host_port_regex()
        .captures_iter(value)
        .filter_map(|caps| {
            let host = caps.get(1)?.as_str();
            let port = caps.get(2)?.as_str().parse::<u16>().ok()?;
            if host.starts_with("sha") || port == 0 {
                return None;
            }
            Some((host.to_string(), port))
        })
        .collect()
}

/// Drops a trailing `.svc.cluster.local` so `svc.ns.svc.cluster.local` becomes `svc.ns`
pub fn normalize_cluster_host(host: &str) -> String {
    host.strip_suffix(CLUSTER_DNS_SUFFIX)
        .unwrap_or(host)
        .to_string()
}

/// Generic single-fact recognition
pub fn recognize(value: &str) -> Option<NetworkDependency> {
    let value = value.trim();
    if value.is_empty() || is_embedded_jdbc(value) {
        return None;
    }

    if jdbc_regex().is_match(value) {
        return parse_jdbc(value);
    }

    if let Some(url) = parse_known_url(value) {
        let scheme = url.scheme();
        let host = url_host(&url)?;
        return match scheme {
            "http" | "https" => {
                let port = url.port_or_known_default()?;
                Some(
                    NetworkDependency::new(host, port, Confidence::High)
                        .with_description("HTTP service"),
                )
            }
            // data schemes only count with an explicit port on this path
            _ => {
                let port = url.port().filter(|p| *p > 0)?;
                Some(
                    NetworkDependency::new(host, port, Confidence::High)
                        .with_description(scheme_description(scheme)),
                )
            }
        };
    }

    if let Some((target, port)) = cluster_dns(value) {
        return Some(
            NetworkDependency::new(target, port, Confidence::Medium)
                .with_description("Kubernetes service"),
        );
    }

    host_ports(value).into_iter().next().map(|(host, port)| {
        NetworkDependency::new(host, port, Confidence::Medium).with_description("network service")
    })
}

/// Kubernetes-flavored recognition over a manifest value.
///
/// `context` names the env var or ConfigMap key the value came from.
pub fn recognize_all(value: &str, context: &str, confidence: Confidence) -> Vec<NetworkDependency> {
    let value = value.trim();
    if value.is_empty() || is_embedded_jdbc(value) {
        return Vec::new();
    }

    if jdbc_regex().is_match(value) {
        return parse_jdbc(value)
            .map(|dep| {
                let description = format!("{}: JDBC {}", context, value);
                vec![NetworkDependency {
                    confidence,
                    description,
                    ..dep
                }]
            })
            .unwrap_or_default();
    }

    if let Some(url) = parse_known_url(value) {
        let Some(host) = url_host(&url) else {
            return Vec::new();
        };
        let port = match url.scheme() {
            "http" | "https" => url.port_or_known_default().unwrap_or(0),
            _ => url.port().unwrap_or(0),
        };
        return vec![NetworkDependency::new(host, port, confidence)
            .with_description(format!("{}: URL {}", context, value))];
    }

    if let Some((target, port)) = cluster_dns(value) {
        return vec![NetworkDependency::new(target, port, confidence)
            .with_description(format!("{}: K8s service DNS {}", context, value))];
    }

    host_ports(value)
        .into_iter()
        .map(|(host, port)| {
            let description = format!("{}: host:port {}:{}", context, host, port);
            NetworkDependency::new(host, port, confidence).with_description(description)
        })
        .collect()
}

fn parse_known_url(value: &str) -> Option<Url> {
    let url = Url::parse(value).ok()?;
    let scheme = url.scheme();
    let known = scheme == "http"
        || scheme == "https"
        || DATA_SCHEMES.iter().any(|(name, _)| *name == scheme);
    if known && url.has_host() {
        Some(url)
    } else {
        None
    }
}

fn url_host(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) if domain.is_empty() => None,
        Host::Domain(domain) => Some(normalize_cluster_host(domain)),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

fn scheme_description(scheme: &str) -> String {
    DATA_SCHEMES
        .iter()
        .find(|(name, _)| *name == scheme)
        .map(|(_, desc)| desc.to_string())
        .unwrap_or_else(|| scheme.to_string())
}

/// `<svc>.<ns>.svc.cluster.local` anywhere in the value, with the port taken from the
/// first `host:port` occurrence (0 when there is none)
fn cluster_dns(value: &str) -> Option<(String, u16)> {
    let caps = cluster_dns_regex().captures(value)?;
    let service = caps.get(1)?.as_str();
    let namespace = caps.get(2)?.as_str();
    let port = host_ports(value)
        .into_iter()
        .next()
        .map(|(_, port)| port)
        .unwrap_or(0);
    Some((format!("{}.{}", service, namespace), port))
}
