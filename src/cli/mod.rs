pub mod commands;
pub mod github;
pub mod handlers;
pub mod output;

pub use commands::{AnalyzeArgs, CliArgs, Commands, OutputFormatArg};
pub use handlers::{handle_analyze, Verbosity};
pub use output::{OutputFormat, OutputFormatter};
