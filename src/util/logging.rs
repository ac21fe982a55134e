//! Structured logging setup
//!
//! Logs always go to stderr so that rendered policies on stdout stay pipeable.
//! `RUST_LOG`, when set, is honoured on top of the configured level.
//!
//! # Example
//!
//! ```no_run
//! use segspec::util::logging::{init_logging, LoggingConfig};
//! use tracing::Level;
//!
//! init_logging(LoggingConfig::with_level(Level::DEBUG));
//! tracing::debug!(root = "/srv/app", "Scanning");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// HTTP and runtime crates that are noisy below `warn`
const QUIET_CRATES: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "ignore", "globset"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for this crate's own events
    pub level: Level,

    /// Emit one JSON object per event instead of text
    pub use_json: bool,

    /// Include the module target (e.g., segspec::scanner) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

/// Parses a log level name, case-insensitively; unknown names fall back to INFO
///
/// ```
/// use segspec::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// assert_eq!(parse_level("loud"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    try_parse_level(level_str).unwrap_or_else(|| {
        eprintln!(
            "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
            level_str
        );
        Level::INFO
    })
}

/// Like [`parse_level`] without the fallback
pub fn try_parse_level(level_str: &str) -> Option<Level> {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("segspec={}", config.level).parse() {
        filter = filter.add_directive(directive);
    }

    if env::var("RUST_LOG").is_err() {
        for name in QUIET_CRATES {
            if let Ok(directive) = format!("{}=warn", name).parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

/// Installs the global subscriber; later calls are no-ops
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(&config);

        if config.use_json {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .try_init();
        } else {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .try_init();
        }
    });
}

/// Initializes from `SEGSPEC_LOG_LEVEL` and `SEGSPEC_LOG_JSON`
pub fn init_from_env() {
    let level = env::var("SEGSPEC_LOG_LEVEL")
        .map(|s| parse_level(&s))
        .unwrap_or(Level::INFO);

    let use_json = env::var("SEGSPEC_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}
