//! InsightForge CLI: turn a directory of tabular files into a PDF brief, a
//! slide deck, and a cleaned CSV.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// InsightForge: automated insight packs from your business data
#[derive(Parser, Debug)]
#[command(name = "insightforge", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds `.insightforge/config.toml`)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline and write the report documents
    Run(RunArgs),
    /// Load and clean the input, then print the inferred schema
    Inspect {
        /// Input directory (defaults to `input.dir`)
        dir: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Input directory (defaults to `input.dir`)
    input_dir: Option<PathBuf>,

    /// Output directory (defaults to `output.dir`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the language model and compute insights locally
    #[arg(long)]
    no_llm: bool,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,

    /// SQLite database to append to the input
    #[arg(long, requires = "table")]
    sqlite: Option<PathBuf>,

    /// Table to read from the SQLite database
    #[arg(long, requires = "sqlite")]
    table: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write the default configuration to `.insightforge/config.toml`
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "insightforge", "insightforge")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "insightforge.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref()).await
}
