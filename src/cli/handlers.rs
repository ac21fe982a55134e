//! Command handlers
//!
//! Each handler returns the process exit code. Failures are logged and summarized on
//! stderr; stdout carries only the requested output.

use super::commands::AnalyzeArgs;
use super::github::{clone_repo, is_github_url, normalize_github_url, ClonedRepo};
use super::output::{write_output, OutputFormatter, NO_DEPENDENCIES_MESSAGE};
use crate::ai::{self, merge_ai_dependencies, CLOUD_NOTICE};
use crate::config::SegspecConfig;
use crate::extractors::ExtractorRegistry;
use crate::model::DependencySet;
use crate::review::run_prompt;
use crate::scanner::{ScanOptions, ScanWarning, Scanner};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Output flags shared by every handler
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbosity {
    pub quiet: bool,
    pub verbose: bool,
}

pub async fn handle_analyze(args: &AnalyzeArgs, verbosity: Verbosity) -> i32 {
    match run_analyze(args, verbosity).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn spinner(message: &str, verbosity: Verbosity) -> Option<ProgressBar> {
    if verbosity.quiet || !atty::is(atty::Stream::Stderr) {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    Some(bar)
}

fn finish(bar: Option<ProgressBar>) {
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

/// Either a local directory or a clone kept alive for the analysis
enum Target {
    Local(PathBuf),
    Cloned(ClonedRepo),
}

impl Target {
    fn path(&self) -> &Path {
        match self {
            Target::Local(path) => path,
            Target::Cloned(repo) => repo.path(),
        }
    }
}

async fn resolve_target(
    raw: &str,
    config: &SegspecConfig,
    verbosity: Verbosity,
) -> Result<Target> {
    if !is_github_url(raw) {
        return Ok(Target::Local(PathBuf::from(raw)));
    }

    let url = normalize_github_url(raw);
    if !verbosity.quiet {
        eprintln!("Cloning {}...", url);
    }
    let bar = spinner(&format!("Cloning {}", url), verbosity);
    let cloned = clone_repo(&url, config.clone_timeout()).await;
    finish(bar);
    Ok(Target::Cloned(cloned?))
}

fn report_warnings(warnings: &[ScanWarning], verbosity: Verbosity) {
    if warnings.is_empty() || verbosity.quiet {
        return;
    }
    eprintln!(
        "Warning: {} file(s) could not be parsed (use --verbose for details)",
        warnings.len()
    );
    if verbosity.verbose {
        for warning in warnings {
            eprintln!("  {}", warning);
        }
    }
}

async fn run_analyze(args: &AnalyzeArgs, verbosity: Verbosity) -> Result<()> {
    let config = SegspecConfig::from_env().context("Invalid configuration")?;
    config.validate().context("Invalid configuration")?;
    debug!(config = %config, "Loaded configuration");

    let target = resolve_target(&args.target, &config, verbosity).await?;
    let root = target.path();

    let options = ScanOptions {
        render_charts: !args.no_helm,
        helm_values: args.helm_values.clone(),
        helm_timeout: config.helm_timeout(),
        max_file_size: config.max_file_size,
    };
    let scanner = Scanner::new(root, Arc::new(ExtractorRegistry::with_defaults()))
        .with_options(options);

    let bar = spinner("Scanning configuration files", verbosity);
    let report = scanner.scan().await;
    finish(bar);
    let report = report.context("analysis failed")?;

    report_warnings(&report.warnings, verbosity);
    let mut set = report.dependencies;

    if let Some(provider) = args.ai {
        augment_with_ai(&mut set, root, provider, &config, verbosity).await;
    }

    if set.is_empty() {
        println!("{}", NO_DEPENDENCIES_MESSAGE);
        return Ok(());
    }

    if args.interactive {
        match review(&set)? {
            Some(filtered) => set = filtered,
            None => {
                eprintln!("Cancelled.");
                return Ok(());
            }
        }
    }

    let output = OutputFormatter::new(args.format.into()).format(&set)?;
    write_output(&output, args.output.as_deref())?;
    if let Some(path) = &args.output {
        info!(path = %path.display(), "Output written");
        if !verbosity.quiet {
            eprintln!("Output written to: {}", path.display());
        }
    }

    Ok(())
}

async fn augment_with_ai(
    set: &mut DependencySet,
    root: &Path,
    provider: ai::AiProvider,
    config: &SegspecConfig,
    verbosity: Verbosity,
) {
    let backend = match ai::resolve_backend(provider, config).await {
        Ok(backend) => backend,
        Err(e) => {
            warn!(error = %e, "AI backend unavailable");
            eprintln!("Warning: AI analysis skipped: {}", e);
            return;
        }
    };

    if backend.is_remote() && !verbosity.quiet {
        eprintln!("{}", CLOUD_NOTICE);
    }

    let bar = spinner(
        &format!("Analyzing configs with {}", backend.name()),
        verbosity,
    );
    let result = ai::analyze(backend.as_ref(), root, set.service_name()).await;
    finish(bar);

    match result {
        Ok(facts) => {
            let found = facts.len();
            let added = merge_ai_dependencies(set, facts);
            info!(backend = backend.name(), found, added, "AI analysis complete");
        }
        Err(e) => {
            warn!(error = %e, "AI analysis failed");
            eprintln!("Warning: AI analysis skipped: {}", e);
        }
    }
}

/// Runs the review prompt on the terminal; `Ok(None)` means the user cancelled
fn review(set: &DependencySet) -> Result<Option<DependencySet>> {
    if !atty::is(atty::Stream::Stdout) || !atty::is(atty::Stream::Stdin) {
        eprintln!("Warning: --interactive requires a terminal, falling back to non-interactive");
        return Ok(Some(set.clone()));
    }

    let stdin = std::io::stdin();
    let mut stderr = std::io::stderr();
    let selected = run_prompt(stdin.lock(), &mut stderr, set.dependencies())
        .context("interactive review failed")?;

    Ok(selected.map(|deps| set.filtered(deps)))
}
