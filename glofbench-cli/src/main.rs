//! glofbench CLI: run the GLOF risk classifier benchmark from the terminal.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// glofbench: compare eleven classifiers on glacial-lake flood risk
#[derive(Parser, Debug)]
#[command(name = "glofbench", version, about, long_about = None)]
struct Cli {
    /// Input CSV (defaults to sikkim_glof_filtered_data.csv)
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Output workbook (defaults to Classifier_Comparison_Results.xlsx)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Workspace directory (searched for .glofbench/config.toml)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Fit classifiers concurrently
    #[arg(long, global = true)]
    parallel: bool,

    /// Stop at the first classifier failure instead of recording it
    #[arg(long, global = true)]
    fail_fast: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Subcommand (defaults to `run`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the benchmark and write the comparison workbook
    Run,
    /// Write a synthetic GLOF dataset
    Generate {
        /// Number of lakes
        #[arg(long, default_value_t = 200)]
        rows: usize,
        /// Share of high-risk lakes
        #[arg(long, default_value_t = 0.1)]
        positive_fraction: f64,
        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default .glofbench/config.toml in the workspace
    Init,
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "glofbench", "glofbench")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "glofbench.log");
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

    commands::handle_command(&cli, &workspace).await
}
