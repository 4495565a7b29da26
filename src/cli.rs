//! CLI arguments for herakles-thread-top.
//!
//! This module defines the command-line interface structure using the clap
//! library. Targets are positional: two dump files, one dump file, or a
//! PID/main-class to sample live.

use crate::duration::parse_duration;
use clap::{CommandFactory, Parser, ValueEnum};
use std::time::Duration;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-thread-top",
    about = "Ranks a JVM's threads by CPU usage over a sampling interval",
    long_about = "Ranks a JVM's threads by CPU usage over a sampling interval.\n\n\
                  Takes two jstack snapshots separated by an interval (or reads \
                  pre-captured dump files) and reports which threads consumed the \
                  most CPU time relative to the window, correlating the snapshots \
                  by thread id and enriching them with /proc scheduling stats \
                  where the dump headers carry no timing.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    after_help = "Project: https://github.com/cansp-dev/herakles-thread-top — More info: https://www.herakles.now — Support: exporter@herakles.now"
)]
pub struct Args {
    /// Before/after dump files, a single dump file, or a PID / JVM main class
    #[arg(value_name = "TARGET", required = true, num_args = 1..=2)]
    pub targets: Vec<String>,

    /// Limit output to the top N threads (0 = all)
    #[arg(short = 'n', long = "top", default_value_t = 0)]
    pub top: usize,

    /// Interval between the two live samples (e.g. 5s, 500ms; default 5s)
    #[arg(long, value_parser = parse_duration)]
    pub sample: Option<Duration>,

    /// Omit stack traces from the report
    #[arg(long)]
    pub summary: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Args {
    /// Usage error for --sample combined with file targets. The conflict
    /// depends on whether a target names an existing file, so it cannot be
    /// expressed as a static clap ArgGroup; building the error through the
    /// command still gets clap's usage text and exit code.
    pub fn sample_with_files_error() -> clap::Error {
        Args::command().error(
            clap::error::ErrorKind::ArgumentConflict,
            "--sample is not supported with file arguments",
        )
    }
}
