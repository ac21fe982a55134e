//! GitHub repository targets
//!
//! A GitHub URL given instead of a path is shallow-cloned into a temporary directory
//! that lives as long as the returned [`ClonedRepo`].

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

fn with_scheme(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    }
}

/// True when `arg` parses as a URL whose host is exactly `github.com`.
///
/// Look-alike hosts such as `github.com.evil.com` or `evil.github.com` are rejected.
pub fn is_github_url(arg: &str) -> bool {
    Url::parse(&with_scheme(arg))
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case("github.com")))
        .unwrap_or(false)
}

/// Adds `https://` when no scheme is present
pub fn normalize_github_url(raw: &str) -> String {
    with_scheme(raw)
}

/// Repository name from the URL path, without a `.git` suffix
pub fn repo_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .nth(1)?
        .trim_end_matches(".git")
        .to_string();
    if last.is_empty() {
        None
    } else {
        Some(last)
    }
}

/// A shallow clone removed on drop
#[derive(Debug)]
pub struct ClonedRepo {
    _dir: TempDir,
    path: PathBuf,
}

impl ClonedRepo {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Runs `git clone --depth 1 <url>` into a fresh temporary directory.
///
/// The checkout is named after the repository so the scan root carries the
/// repository's name.
pub async fn clone_repo(url: &str, timeout: Duration) -> Result<ClonedRepo> {
    let dir = tempfile::Builder::new()
        .prefix("segspec-clone-")
        .tempdir()
        .context("failed to create temp directory")?;
    let name = repo_name(url).unwrap_or_else(|| "repo".to_string());
    let path = dir.path().join(name);

    info!(url, "Cloning repository");
    debug!(path = %path.display(), "Clone destination");

    let child = Command::new("git")
        .args(["clone", "--depth", "1", "--quiet"])
        .arg(url)
        .arg(&path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .context("failed to run git (is it installed?)")?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.context("git clone failed")?,
        Err(_) => bail!("git clone timed out after {} seconds", timeout.as_secs()),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone failed: {}", stderr.trim());
    }

    Ok(ClonedRepo { _dir: dir, path })
}
