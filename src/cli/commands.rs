use crate::ai::AiProvider;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Generate Kubernetes NetworkPolicy from application configs
#[derive(Parser, Debug)]
#[command(
    name = "segspec",
    about = "Generate Kubernetes NetworkPolicy from application configs",
    version,
    long_about = "segspec analyzes application configuration files and generates \
                  Kubernetes NetworkPolicy YAML for microsegmentation.\n\n\
                  Point it at your app directory. It reads configs, infers network \
                  dependencies, and outputs ready-to-apply policies.\n\n  \
                  segspec analyze ./my-app/\n  \
                  segspec analyze ./my-app/ --format netpol\n  \
                  segspec analyze ./my-app/ --ai"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Debug logging and full warning details"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Analyze application configs and generate network policies",
        long_about = "Scans a directory for application configuration files, extracts network \
                      dependencies, and generates Kubernetes NetworkPolicy YAML.\n\n\
                      The argument can be a local directory or a GitHub repository URL \
                      (https://github.com/org/repo, github.com/org/repo). GitHub repositories \
                      are shallow-cloned to a temporary directory and removed afterwards.\n\n\
                      Supported files:\n  \
                      Spring: application.yml, application.properties\n  \
                      Docker: docker-compose.yml, compose.yaml\n  \
                      Kubernetes: Deployment, StatefulSet, Service, ConfigMap manifests\n  \
                      Helm: charts are rendered with `helm template` when helm is installed\n  \
                      Environment: .env files\n  \
                      Build: pom.xml, build.gradle (dependency inference)\n\n\
                      AI-assisted analysis:\n  \
                      --ai         local Ollama when available, else Gemini\n  \
                      --ai local   fully offline via Ollama + NuExtract (ollama pull nuextract)\n  \
                      --ai cloud   Gemini (set GEMINI_API_KEY)"
    )]
    Analyze(AnalyzeArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(value_name = "PATH|GITHUB_URL", help = "Directory or GitHub repository to analyze")]
    pub target: String,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "summary",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        value_name = "PROVIDER",
        num_args = 0..=1,
        default_missing_value = "auto",
        help = "Add AI-discovered dependencies (auto, local, cloud)"
    )]
    pub ai: Option<AiProvider>,

    #[arg(
        short = 'i',
        long,
        help = "Review dependencies interactively before generating output"
    )]
    pub interactive: bool,

    #[arg(
        long,
        value_name = "FILE",
        help = "Helm values file to use when rendering charts"
    )]
    pub helm_values: Option<PathBuf>,

    #[arg(long, help = "Do not render Helm charts")]
    pub no_helm: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// Human-readable dependency report
    Summary,
    /// Default-deny plus egress allow-list for the scanned service
    Netpol,
    /// One ingress/egress policy per discovered service
    PerService,
    /// Summary followed by the netpol output
    All,
    /// JSON array of dependencies
    Json,
}
