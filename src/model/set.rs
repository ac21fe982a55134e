//! Ordered, deduplicating collection of dependency facts

use super::dependency::{normalize_protocol, NetworkDependency};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Unique facts discovered for one scanned service.
///
/// The first fact added under a canonical key wins; later duplicates are dropped
/// without merging confidence or description.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    service_name: String,
    deps: Vec<NetworkDependency>,
    seen: HashSet<String>,
    by_source: BTreeMap<String, Vec<usize>>,
    by_target: BTreeMap<String, Vec<usize>>,
}

impl DependencySet {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Inserts a fact unless its canonical key is already present.
    ///
    /// Returns `true` when the fact was new.
    pub fn add(&mut self, mut dep: NetworkDependency) -> bool {
        dep.protocol = normalize_protocol(&dep.protocol);
        if !self.seen.insert(dep.key()) {
            return false;
        }

        let index = self.deps.len();
        self.by_source
            .entry(dep.source.clone())
            .or_default()
            .push(index);
        self.by_target
            .entry(dep.target.clone())
            .or_default()
            .push(index);
        self.deps.push(dep);
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Canonical keys of every fact, unordered
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }

    /// All facts sorted by canonical key
    pub fn dependencies(&self) -> Vec<NetworkDependency> {
        sorted_by_key(self.deps.iter())
    }

    /// Adds every fact of `other`, keeping first-write-wins semantics
    pub fn merge(&mut self, other: &DependencySet) {
        for dep in &other.deps {
            self.add(dep.clone());
        }
    }

    /// Sorted, unique non-empty source names
    pub fn sources(&self) -> Vec<String> {
        self.by_source
            .keys()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect()
    }

    /// Sorted, unique names appearing as either source or target
    pub fn services(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .by_source
            .keys()
            .chain(self.by_target.keys())
            .filter(|s| !s.is_empty())
            .collect();
        names.into_iter().cloned().collect()
    }

    /// Facts whose target is `service` (inbound), sorted by key
    pub fn ingress_for(&self, service: &str) -> Vec<NetworkDependency> {
        self.indexed(&self.by_target, service)
    }

    /// Facts whose source is `service` (outbound), sorted by key
    pub fn egress_for(&self, service: &str) -> Vec<NetworkDependency> {
        self.indexed(&self.by_source, service)
    }

    /// Builds a new set bound to the same service holding only the given facts
    pub fn filtered<I>(&self, selected: I) -> DependencySet
    where
        I: IntoIterator<Item = NetworkDependency>,
    {
        let mut set = DependencySet::new(self.service_name.clone());
        for dep in selected {
            set.add(dep);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    fn indexed(&self, index: &BTreeMap<String, Vec<usize>>, name: &str) -> Vec<NetworkDependency> {
        match index.get(name) {
            Some(positions) => sorted_by_key(positions.iter().map(|&i| &self.deps[i])),
            None => Vec::new(),
        }
    }
}

impl Extend<NetworkDependency> for DependencySet {
    fn extend<T: IntoIterator<Item = NetworkDependency>>(&mut self, iter: T) {
        for dep in iter {
            self.add(dep);
        }
    }
}

fn sorted_by_key<'a>(deps: impl Iterator<Item = &'a NetworkDependency>) -> Vec<NetworkDependency> {
    let mut keyed: Vec<(String, NetworkDependency)> =
        deps.map(|d| (d.key(), d.clone())).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, d)| d).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Confidence;

    fn dep(source: &str, target: &str, port: u16) -> NetworkDependency {
        NetworkDependency::new(target, port, Confidence::High).with_source(source)
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut set = DependencySet::new("app");
        assert!(set.add(dep("app", "postgres", 5432)));
        assert!(!set.add(dep("app", "postgres", 5432)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_first_write_wins() {
        let mut set = DependencySet::new("app");
        set.add(
            NetworkDependency::new("redis", 6379, Confidence::Low)
                .with_source("app")
                .with_description("first"),
        );
        set.add(
            NetworkDependency::new("redis", 6379, Confidence::High)
                .with_source("app")
                .with_description("second"),
        );

        let deps = set.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].description, "first");
        assert_eq!(deps[0].confidence, Confidence::Low);
    }

    #[test]
    fn test_empty_protocol_is_same_key_as_tcp() {
        let mut set = DependencySet::new("app");
        let mut blank = dep("app", "db", 5432);
        blank.protocol = String::new();
        set.add(blank);
        set.add(dep("app", "db", 5432));

        assert_eq!(set.len(), 1);
        assert_eq!(set.dependencies()[0].protocol, "TCP");
    }

    #[test]
    fn test_dependencies_sorted_by_key() {
        let mut set = DependencySet::new("app");
        set.add(dep("web", "redis", 6379));
        set.add(dep("api", "postgres", 5432));
        set.add(dep("api", "kafka", 9092));

        let keys: Vec<String> = set.dependencies().iter().map(|d| d.key()).collect();
        let mut expected = keys.clone();
        expected.sort();
        assert_eq!(keys, expected);
        assert_eq!(keys[0], "api->kafka:9092/TCP");
    }

    #[test]
    fn test_merge() {
        let mut a = DependencySet::new("app");
        a.add(dep("app", "db", 5432));
        let mut b = DependencySet::new("other");
        b.add(dep("app", "db", 5432));
        b.add(dep("app", "cache", 6379));

        a.merge(&b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.service_name(), "app");
    }

    #[test]
    fn test_sources_and_services() {
        let mut set = DependencySet::new("app");
        set.add(dep("frontend", "cart", 8080));
        set.add(dep("cart", "redis", 6379));
        set.add(dep("", "kafka", 9092));

        assert_eq!(set.sources(), vec!["cart", "frontend"]);
        assert_eq!(set.services(), vec!["cart", "frontend", "kafka", "redis"]);
    }

    #[test]
    fn test_ingress_and_egress() {
        let mut set = DependencySet::new("app");
        set.add(dep("frontend", "cart", 8080));
        set.add(dep("checkout", "cart", 8080));
        set.add(dep("cart", "redis", 6379));

        let ingress = set.ingress_for("cart");
        assert_eq!(ingress.len(), 2);
        assert_eq!(ingress[0].source, "checkout");
        assert_eq!(ingress[1].source, "frontend");

        let egress = set.egress_for("cart");
        assert_eq!(egress.len(), 1);
        assert_eq!(egress[0].target, "redis");

        assert!(set.egress_for("redis").is_empty());
    }

    #[test]
    fn test_filtered_builds_new_set() {
        let mut set = DependencySet::new("app");
        set.add(dep("app", "db", 5432));
        set.add(dep("app", "cache", 6379));

        let kept: Vec<NetworkDependency> = set
            .dependencies()
            .into_iter()
            .filter(|d| d.target == "db")
            .collect();
        let filtered = set.filtered(kept);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.service_name(), "app");
        assert_eq!(set.len(), 2);
    }
}
