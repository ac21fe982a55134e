//! Helm chart rendering
//!
//! Charts are expanded to plain manifests by an external tool and then read by the
//! Kubernetes extractor like any other manifest file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Release name passed to `helm template`
pub const RELEASE_NAME: &str = "segspec-render";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("helm not installed: {0}")]
    ToolMissing(String),

    #[error("helm template failed: {0}")]
    Failed(String),

    #[error("helm template timed out after {0}s")]
    Timeout(u64),

    #[error("I/O error running helm: {0}")]
    Io(#[from] std::io::Error),
}

/// Expands a chart directory into multi-document manifest YAML
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, chart_dir: &Path) -> Result<String, RenderError>;
}

/// Renders charts with `helm template <release> <chart> [-f <values>]`
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
    values_file: Option<PathBuf>,
    timeout: Duration,
}

impl HelmCli {
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: PathBuf::from("helm"),
            values_file: None,
            timeout,
        }
    }

    pub fn with_values_file(mut self, values_file: Option<PathBuf>) -> Self {
        self.values_file = values_file;
        self
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn args(&self, chart_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "template".to_string(),
            RELEASE_NAME.to_string(),
            chart_dir.to_string_lossy().into_owned(),
        ];
        if let Some(values) = &self.values_file {
            args.push("-f".to_string());
            args.push(values.to_string_lossy().into_owned());
        }
        args
    }
}

#[async_trait]
impl ChartRenderer for HelmCli {
    async fn render(&self, chart_dir: &Path) -> Result<String, RenderError> {
        let args = self.args(chart_dir);
        debug!(binary = %self.binary.display(), ?args, "Rendering chart");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RenderError::ToolMissing(e.to_string()),
                _ => RenderError::Io(e),
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout.as_secs()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            };
            return Err(RenderError::Failed(message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
