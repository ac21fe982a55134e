//! segspec - network dependency inference and Kubernetes NetworkPolicy generation
//!
//! This library scans an application's configuration artifacts (Spring configs,
//! Docker Compose files, Kubernetes manifests, Helm charts, build files, `.env`
//! files), infers which services talk to which, and renders the result as
//! NetworkPolicy YAML.
//!
//! # Core Concepts
//!
//! - **Dependency facts**: every extractor emits [`NetworkDependency`] values with a
//!   target, port, protocol and a [`Confidence`] level
//! - **Dependency set**: a deduplicating [`DependencySet`] keyed by
//!   `source->target:port/protocol`
//! - **Extractors**: pure per-format parsers selected by file name through an
//!   [`ExtractorRegistry`]
//! - **Renderers**: pure functions from a set to policy YAML, a summary, or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use segspec::{render, ExtractorRegistry, Scanner};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(ExtractorRegistry::with_defaults());
//! let report = Scanner::new("./my-app", registry).scan().await?;
//!
//! for warning in &report.warnings {
//!     eprintln!("skipped {}", warning);
//! }
//! print!("{}", render::render_per_service(&report.dependencies)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`model`]: dependency facts and the deduplicating set
//! - [`extractors`]: value recognizer, format parsers and the registry
//! - [`scanner`]: directory walking and Helm chart rendering
//! - [`ai`]: optional AI-assisted discovery (Ollama, Gemini)
//! - [`render`]: NetworkPolicy, summary and JSON output
//! - [`review`]: interactive selection before rendering
//! - [`cli`]: command-line front end

pub mod ai;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod model;
pub mod render;
pub mod review;
pub mod scanner;
pub mod util;

pub use ai::{merge_ai_dependencies, AiProvider, BackendError, DependencyBackend};
pub use config::{ConfigError, SegspecConfig};
pub use extractors::{ExtractError, Extractor, ExtractorRegistry, FilePattern};
pub use model::{Confidence, DependencySet, NetworkDependency};
pub use scanner::{ScanError, ScanOptions, ScanReport, ScanWarning, Scanner};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
