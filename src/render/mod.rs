//! Renderers over a finished dependency set
//!
//! Every renderer is a pure function of the set: NetworkPolicy YAML in two layouts,
//! a plain-text summary, and a JSON listing.

pub mod netpol;
pub mod selector;
pub mod summary;

pub use netpol::{
    per_service_policies, render_per_service, render_single_service, single_service_policies,
    NetworkPolicy,
};
pub use selector::{sanitize_name, Destination};
pub use summary::render_summary;

use crate::model::DependencySet;

/// Pretty-printed JSON array of every fact, sorted by key
pub fn render_json(set: &DependencySet) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(&set.dependencies())?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Confidence, NetworkDependency};

    #[test]
    fn test_render_json() {
        let mut set = DependencySet::new("api");
        set.add(
            NetworkDependency::new("db", 5432, Confidence::High)
                .with_source("api")
                .with_description("PostgreSQL"),
        );

        let json = render_json(&set).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["target"], "db");
        assert_eq!(value[0]["port"], 5432);
        assert_eq!(value[0]["confidence"], "high");
        assert_eq!(value[0]["protocol"], "TCP");
    }

    #[test]
    fn test_render_json_empty() {
        assert_eq!(render_json(&DependencySet::new("api")).unwrap(), "[]\n");
    }
}
