//! herakles-thread-top - version 0.1.0
//!
//! Samples a JVM's threads twice and reports the top CPU consumers over the
//! interval. This is the entry point that resolves the target, acquires the
//! two snapshots and prints the ranking.

use anyhow::{Context, Result};
use clap::Parser;
use herakles_thread_top::cli::{Args, LogLevel};
use herakles_thread_top::{capture, output, proc, rank, Snapshot};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, Level};

/// Sampling interval used when a live target is given without --sample.
const DEFAULT_SAMPLE: Duration = Duration::from_secs(5);

/// Initializes tracing logging subsystem with configured log level.
///
/// Logs go to stderr; stdout carries the report.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn read_dump(path: &str) -> Result<Snapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dump file {path}"))?;
    Ok(Snapshot::from_text(text))
}

/// Resolve the positional targets into a before/after snapshot pair.
///
/// Two arguments are dump files. One argument is a dump file if it exists on
/// disk (compared against an empty "before"), otherwise a PID or JVM
/// main-class to sample live with two delayed captures.
async fn load_snapshots(args: &Args) -> Result<(Snapshot, Snapshot)> {
    match args.targets.as_slice() {
        [before, after] => {
            if args.sample.is_some() {
                Args::sample_with_files_error().exit();
            }
            Ok((read_dump(before)?, read_dump(after)?))
        }
        [target] => {
            if Path::new(target).exists() {
                if args.sample.is_some() {
                    Args::sample_with_files_error().exit();
                }
                debug!(file = %target, "comparing lone dump file against empty baseline");
                Ok((Snapshot::empty(), read_dump(target)?))
            } else {
                let pid = capture::resolve_jvm_pid(target).await?;
                let interval = args.sample.unwrap_or(DEFAULT_SAMPLE);
                capture::sample_pair(pid, interval).await
            }
        }
        // clap enforces 1..=2 positional targets
        _ => unreachable!(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args);

    let clk = *proc::CLK_TCK;
    let (before, after) = load_snapshots(&args).await?;

    let threads_before = before
        .parse_threads(clk)
        .context("failed to parse \"before\" thread dump")?;
    let threads_after = after
        .parse_threads(clk)
        .context("failed to parse \"after\" thread dump")?;

    let ranking = rank::rank_threads(&threads_before, &threads_after, args.top);
    output::print_ranking(&ranking, args.summary);

    Ok(())
}
