use segspec::cli::{handle_analyze, CliArgs, Commands, Verbosity};
use segspec::util::logging::{init_logging, parse_level, LoggingConfig};
use segspec::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("segspec v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let verbosity = Verbosity {
        quiet: args.quiet,
        verbose: args.verbose,
    };

    let exit_code = match &args.command {
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args, verbosity).await,
    };

    std::process::exit(exit_code);
}

/// `--log-level` wins, then `-v`, then `-q`, then `SEGSPEC_LOG_LEVEL`
fn resolve_level(args: &CliArgs) -> Level {
    if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        env::var("SEGSPEC_LOG_LEVEL")
            .map(|s| parse_level(&s))
            .unwrap_or(Level::INFO)
    }
}

fn init_logging_from_args(args: &CliArgs) {
    let use_json = env::var("SEGSPEC_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level: resolve_level(args),
        use_json,
        include_target: args.verbose,
        ..Default::default()
    });
}
