//! xferlat: per-transfer latency breakdown of file transfer profiler logs
//!
//! Reads a profiler log, writes the normalized and correlated event timeline
//! of every transfer to a record file, and prints one row of latency metrics
//! per transfer.

use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use xferlat::{Config, DirectionChoice, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "xferlat")]
#[command(about = "Derive per-transfer latency breakdowns from profiler logs")]
#[command(version)]
struct Command {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Transfer direction: auto, download or upload
    #[arg(short, long, default_value = "auto", value_parser = DirectionChoice::from_str)]
    direction: DirectionChoice,

    /// JSON direction descriptor (overrides --direction)
    #[arg(long)]
    direction_config: Option<PathBuf>,

    /// Summary format: csv, json, table
    #[arg(short, long, default_value = "csv", value_parser = OutputFormat::from_str)]
    format: OutputFormat,

    /// Profiler log to analyze
    prom_log_file: PathBuf,

    /// Where to write the normalized event records
    handled_raw_file: PathBuf,
}

impl From<Command> for Config {
    fn from(opts: Command) -> Self {
        Config {
            verbosity: opts.verbose,
            input: opts.prom_log_file,
            records: opts.handled_raw_file,
            direction: opts.direction,
            direction_config: opts.direction_config,
            format: opts.format,
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn main() -> Result<()> {
    let config = Config::from(Command::parse());
    init_logging(config.verbosity);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = xferlat::run(&config, &mut out)?;

    tracing::info!(
        "Wrote {} transfers to {}",
        report.timelines.len(),
        config.records.display()
    );
    Ok(())
}
