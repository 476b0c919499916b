//! Tally - Commerce event ingestion
//!
//! # Usage
//!
//! ```bash
//! # Replay JSON-lines raw events into the configured destinations
//! tally replay --config tally.toml --input events.jsonl
//! cat events.jsonl | tally replay --config tally.toml
//!
//! # Create the ClickHouse database and tables
//! tally schema --config tally.toml
//! tally schema --print
//! ```

mod cmd;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tally_config::{Config, LogConfig, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Config file picked up from the working directory when none is given
const DEFAULT_CONFIG_FILE: &str = "tally.toml";

/// Tally - Commerce event ingestion and fan-out
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Emit JSON-lines raw events through the configured destinations
    Replay(cmd::replay::ReplayArgs),

    /// Create the ClickHouse database and tables
    Schema(cmd::schema::SchemaArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Replay(args) => {
            init_logging(&config.log, cli.log_level.as_deref())?;
            cmd::replay::run(args, &config).await
        }
        Command::Schema(args) => {
            init_logging(&config.log, cli.log_level.as_deref())?;
            cmd::schema::run(args, &config).await
        }
    }
}

/// Load config: explicit path > `tally.toml` in the working directory > defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }

    let fallback = Path::new(DEFAULT_CONFIG_FILE);
    if fallback.exists() {
        return Config::from_file(fallback)
            .with_context(|| format!("failed to load config {DEFAULT_CONFIG_FILE}"));
    }

    Ok(Config::default())
}

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr so command output on stdout stays clean.
fn init_logging(log: &LogConfig, cli_level: Option<&str>) -> Result<()> {
    let directive = cli_level.map_or_else(|| log.directive(), str::to_string);
    let filter = EnvFilter::try_new(&directive)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    match log.format {
        LogFormat::Console => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }

    Ok(())
}
