//! Prism CLI - batch image generation from the command line.
//!
//! This CLI provides a `prism-cli` command that estimates and runs batches of
//! image generation and edit jobs described in a batch file.

mod commands;
mod config;
mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{estimate, run};

/// Prism CLI - batch image generation and editing
///
/// Reads a batch file (JSON object, JSON array, or one prompt per line),
/// prices it, and runs every job with bounded concurrency, retries and a
/// batch-wide timeout.
#[derive(Parser, Debug)]
#[command(
    name = "prism-cli",
    author,
    version,
    about = "Prism - batch image generation and editing"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Config file (defaults to ./prism.toml, then ~/.prism/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate the cost of a batch without running it
    Estimate {
        /// Path to the batch file
        batch_file: PathBuf,

        /// Output the estimate as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every job of a batch
    ///
    /// Exits non-zero when any job failed or was cancelled.
    Run {
        /// Path to the batch file
        batch_file: PathBuf,

        /// Image engine to use
        #[arg(long, value_enum, default_value_t = run::Engine::Xai)]
        engine: run::Engine,

        /// Maximum concurrent jobs (1-10, overrides the batch file)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Batch timeout in milliseconds (overrides the batch file)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output directory (overrides the batch file)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Output the batch report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = config::load_config(args.config.as_deref())?;

    match args.command {
        Command::Estimate { batch_file, json } => estimate::execute(&batch_file, json, &config),
        Command::Run { batch_file, engine, concurrency, timeout_ms, output_dir, json } => {
            let options = run::RunOptions { engine, concurrency, timeout_ms, output_dir, json };
            let all_succeeded = run::execute(&batch_file, options, &config).await?;
            if !all_succeeded {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
