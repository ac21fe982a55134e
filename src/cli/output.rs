//! Output formatting and writing
//!
//! ```no_run
//! use segspec::cli::output::{OutputFormat, OutputFormatter};
//! use segspec::model::DependencySet;
//!
//! let set = DependencySet::new("api");
//! let text = OutputFormatter::new(OutputFormat::Netpol).format(&set).unwrap();
//! print!("{}", text);
//! ```

use super::commands::OutputFormatArg;
use crate::model::DependencySet;
use crate::render;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Printed instead of any format when a scan finds nothing
pub const NO_DEPENDENCIES_MESSAGE: &str = "No network dependencies found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Netpol,
    PerService,
    /// Summary, a `---` separator, then the netpol output
    All,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Summary => OutputFormat::Summary,
            OutputFormatArg::Netpol => OutputFormat::Netpol,
            OutputFormatArg::PerService => OutputFormat::PerService,
            OutputFormatArg::All => OutputFormat::All,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, set: &DependencySet) -> Result<String> {
        let text = match self.format {
            OutputFormat::Summary => render::render_summary(set),
            OutputFormat::Netpol => render::render_single_service(set)
                .context("Failed to serialize NetworkPolicy")?,
            OutputFormat::PerService => render::render_per_service(set)
                .context("Failed to serialize NetworkPolicy")?,
            OutputFormat::All => {
                let policies = render::render_single_service(set)
                    .context("Failed to serialize NetworkPolicy")?;
                format!("{}---\n{}", render::render_summary(set), policies)
            }
            OutputFormat::Json => {
                render::render_json(set).context("Failed to serialize dependencies")?
            }
        };
        Ok(text)
    }
}

/// Writes `content` to `path`, or to stdout when no path is given
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("cannot create output file {}", path.display())),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(content.as_bytes())
                .and_then(|_| handle.flush())
                .context("Failed to write to stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Confidence, NetworkDependency};
    use tempfile::TempDir;

    fn set() -> DependencySet {
        let mut set = DependencySet::new("app");
        set.add(
            NetworkDependency::new("db", 5432, Confidence::High)
                .with_source("app")
                .with_description("PostgreSQL"),
        );
        set
    }

    #[test]
    fn test_all_joins_summary_and_policies() {
        let text = OutputFormatter::new(OutputFormat::All)
            .format(&set())
            .unwrap();
        let (summary, policies) = text.split_once("---\n").unwrap();
        assert!(summary.starts_with("Service: app"));
        assert!(policies.starts_with("# Review: verify podSelector labels"));
        assert!(policies.contains("name: app-default-deny"));
    }

    #[test]
    fn test_each_format_renders() {
        for format in [
            OutputFormat::Summary,
            OutputFormat::Netpol,
            OutputFormat::PerService,
            OutputFormat::Json,
        ] {
            let text = OutputFormatter::new(format).format(&set()).unwrap();
            assert!(text.contains("db"), "{:?} output missing target", format);
        }
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.yaml");
        write_output("kind: NetworkPolicy\n", Some(&path)).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "kind: NetworkPolicy\n"
        );
    }

    #[test]
    fn test_write_output_bad_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing/out.yaml");
        let err = write_output("x", Some(&path)).unwrap_err();
        assert!(err.to_string().contains("cannot create output file"));
    }
}
