// Format extractors
//
// Each parser turns one file's content into dependency facts. They share the value
// recognizer in `extractors::patterns` and the small helpers below.

pub mod build_file;
pub mod docker_compose;
pub mod env_file;
pub mod kubernetes;
pub mod spring;

use crate::model::NetworkDependency;
use serde::Deserialize;
use std::collections::HashSet;

/// A port written either as a YAML number or as a string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PortNumber {
    Number(i64),
    Text(String),
}

impl PortNumber {
    /// The port when it is a number in `1..=65535`; named ports resolve to `None`
    pub fn as_port(&self) -> Option<u16> {
        let value = match self {
            PortNumber::Number(n) => *n,
            PortNumber::Text(s) => s.trim().parse::<i64>().ok()?,
        };
        u16::try_from(value).ok().filter(|p| *p > 0)
    }
}

/// Appends facts from `extra` whose `(target, port)` is not yet in `base`.
///
/// This looser key ignores source and protocol and is only used within a single file.
pub fn merge_unique(
    mut base: Vec<NetworkDependency>,
    extra: Vec<NetworkDependency>,
) -> Vec<NetworkDependency> {
    let mut seen: HashSet<(String, u16)> =
        base.iter().map(|d| (d.target.clone(), d.port)).collect();
    for dep in extra {
        if seen.insert((dep.target.clone(), dep.port)) {
            base.push(dep);
        }
    }
    base
}
