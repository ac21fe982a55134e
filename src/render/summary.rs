//! Human-readable dependency report

use crate::model::{Confidence, DependencySet};
use std::fmt::Write;

pub const NO_DEPENDENCIES: &str = "No dependencies found.\n";

pub fn render_summary(set: &DependencySet) -> String {
    let deps = set.dependencies();
    if deps.is_empty() {
        return NO_DEPENDENCIES.to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Service: {}", set.service_name());
    let _ = writeln!(out, "Dependencies: {}\n", deps.len());

    let (mut high, mut medium, mut low) = (0, 0, 0);
    for dep in &deps {
        match dep.confidence {
            Confidence::High => high += 1,
            Confidence::Medium => medium += 1,
            Confidence::Low => low += 1,
        }

        let endpoint = format!("{}:{}/{}", dep.target, dep.port, dep.protocol);
        let description = if dep.description.is_empty() {
            endpoint.as_str()
        } else {
            dep.description.as_str()
        };
        let _ = writeln!(
            out,
            "  → {}  [{}]  {}",
            endpoint, dep.confidence, description
        );
        if !dep.source_file.is_empty() {
            let _ = writeln!(out, "    source: {}", dep.source_file);
        }
    }

    let _ = writeln!(
        out,
        "\nConfidence: {} high, {} medium, {} low",
        high, medium, low
    );
    if low > 0 {
        let _ = writeln!(
            out,
            "⚠ {} low-confidence dependencies, verify before enforcing",
            low
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkDependency;

    #[test]
    fn test_empty_summary() {
        assert_eq!(
            render_summary(&DependencySet::new("api")),
            "No dependencies found.\n"
        );
    }

    #[test]
    fn test_summary_lines_and_tally() {
        let mut set = DependencySet::new("api");
        set.add(
            NetworkDependency::new("db", 5432, Confidence::High)
                .with_source("api")
                .with_description("PostgreSQL")
                .with_source_file("docker-compose.yml"),
        );
        set.add(NetworkDependency::new("kafka", 9092, Confidence::Low).with_source("api"));

        let summary = render_summary(&set);
        assert!(summary.starts_with("Service: api\nDependencies: 2\n\n"));
        assert!(summary.contains("  → db:5432/TCP  [high]  PostgreSQL\n    source: docker-compose.yml\n"));
        assert!(summary.contains("  → kafka:9092/TCP  [low]  kafka:9092/TCP\n"));
        assert!(summary.contains("Confidence: 1 high, 0 medium, 1 low"));
        assert!(summary.contains("1 low-confidence dependencies"));
    }

    #[test]
    fn test_no_warning_without_low_confidence() {
        let mut set = DependencySet::new("api");
        set.add(NetworkDependency::new("db", 5432, Confidence::Medium).with_source("api"));
        assert!(!render_summary(&set).contains('⚠'));
    }
}
