//! Thread-dump parsing: turns jstack output into per-thread records.
//!
//! Each thread entry starts with a header line like
//!
//! ```text
//! "main" #1 prio=5 os_prio=0 cpu=128.41ms elapsed=4.53s tid=0x00007f... nid=0x2eb7 waiting on condition
//! ```
//!
//! followed by indented stack-trace lines. Recent JVMs embed `cpu=` and
//! `elapsed=` directly in the header; when they are absent the times are
//! derived from the thread's `/proc/<pid>/task/<tid>/stat` record, and when
//! that is unavailable too (restricted containers) they degrade to zero
//! rather than failing the dump.

use crate::duration::{parse_duration, DurationError};
use crate::proc::{ClockTck, StatError, TaskStat};
use ahash::AHashMap as HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort a thread-dump parse.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("invalid thread name (no closing quote): {0}")]
    UnterminatedName(String),

    #[error("\"{field}=\" field missing from header: {header}")]
    MissingHeaderField {
        field: &'static str,
        header: String,
    },

    #[error("unable to parse nid \"{0}\"")]
    InvalidNid(String),

    #[error("unable to parse \"{field}\" duration")]
    InvalidDuration {
        field: &'static str,
        #[source]
        source: DurationError,
    },

    #[error("error parsing stat record for nid {nid}")]
    Stat {
        nid: i64,
        #[source]
        source: StatError,
    },
}

/// One thread as it appeared in a single snapshot. Immutable once parsed;
/// the same logical thread in two snapshots yields two independent records
/// correlated only by `tid`.
#[derive(Debug, Clone)]
pub struct Thread {
    /// Verbatim header line, reused unmodified for output.
    pub header: String,
    /// Display name between the first and last quote of the header.
    pub name: String,
    /// Display thread id (`tid=` marker), the correlation key across snapshots.
    pub tid: String,
    /// Numeric OS thread id (`nid=` marker), the correlation key into stat data.
    pub nid: i64,
    /// CPU time consumed as of the capture instant.
    pub cpu: Duration,
    /// Wall-clock time since the thread started, as of the capture instant.
    pub elapsed: Duration,
    /// Verbatim stack-trace lines.
    pub stack: String,
}

/// A point-in-time capture: the raw dump text plus (when captured live) the
/// per-task stat records keyed by numeric thread id and the system uptime.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub text: String,
    pub task_stats: HashMap<i64, String>,
    pub uptime: Option<Duration>,
}

/// Extract the value of a `name=value` marker from a header line, up to the
/// next space or end of line. Returns None for a missing marker or an empty
/// value.
fn header_field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let start = line.find(&format!("{name}="))? + name.len() + 1;
    let value = line[start..].split(' ').next().unwrap_or(&line[start..]);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Parse an integer with a base prefix: `0x`/`0X` hex, `0o`/`0O` octal,
/// `0b`/`0B` binary, a bare leading `0` also octal, otherwise decimal.
/// jstack prints nids in hex.
fn parse_prefixed_i64(s: &str) -> Option<i64> {
    let (sign, mag) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let (digits, radix) = if let Some(h) = mag.strip_prefix("0x").or_else(|| mag.strip_prefix("0X"))
    {
        (h, 16)
    } else if let Some(o) = mag.strip_prefix("0o").or_else(|| mag.strip_prefix("0O")) {
        (o, 8)
    } else if let Some(b) = mag.strip_prefix("0b").or_else(|| mag.strip_prefix("0B")) {
        (b, 2)
    } else if mag.len() > 1 && mag.starts_with('0') {
        (&mag[1..], 8)
    } else {
        (mag, 10)
    };
    i64::from_str_radix(digits, radix).ok().map(|v| sign * v)
}

impl Snapshot {
    /// A snapshot with no threads, used as the "before" side when only one
    /// dump is available.
    pub fn empty() -> Self {
        Snapshot::default()
    }

    /// A snapshot from pre-captured dump text, with no stat data or uptime.
    pub fn from_text(text: String) -> Self {
        Snapshot {
            text,
            ..Snapshot::default()
        }
    }

    /// Parse the dump text into a map of display thread id to thread record.
    ///
    /// Any malformed header or stat record aborts the whole parse; no partial
    /// mapping is returned. A duplicate display id keeps the later entry.
    pub fn parse_threads(&self, clk: ClockTck) -> Result<HashMap<String, Thread>, DumpError> {
        let mut threads = HashMap::new();
        let mut entry: Vec<&str> = Vec::new();

        for line in self.text.lines() {
            if !line.is_empty() && (line.starts_with(' ') || line.starts_with('\t')) {
                if !entry.is_empty() {
                    entry.push(line);
                }
            } else {
                if !entry.is_empty() {
                    let thread = self.parse_thread(&entry, clk)?;
                    threads.insert(thread.tid.clone(), thread);
                    entry.clear();
                }
                // Blank lines, section separators and footers are skipped;
                // only a quoted header with a nid marker opens a new entry.
                if line.starts_with('"') && line.contains("nid=") {
                    entry.push(line);
                }
            }
        }
        if !entry.is_empty() {
            let thread = self.parse_thread(&entry, clk)?;
            threads.insert(thread.tid.clone(), thread);
        }

        Ok(threads)
    }

    fn parse_thread(&self, lines: &[&str], clk: ClockTck) -> Result<Thread, DumpError> {
        let header = lines[0];
        let stack = lines[1..].join("\n");

        // Thread names can contain quote-like punctuation, so the name runs
        // from the first quote to the last quote on the line.
        let name_end = header
            .rfind('"')
            .filter(|&i| i > 0)
            .ok_or_else(|| DumpError::UnterminatedName(header.to_string()))?;
        let name = header[1..name_end].to_string();

        let tid = header_field(header, "tid")
            .ok_or_else(|| DumpError::MissingHeaderField {
                field: "tid",
                header: header.to_string(),
            })?
            .to_string();

        let nid_str = header_field(header, "nid").ok_or_else(|| DumpError::MissingHeaderField {
            field: "nid",
            header: header.to_string(),
        })?;
        let nid = parse_prefixed_i64(nid_str)
            .ok_or_else(|| DumpError::InvalidNid(nid_str.to_string()))?;

        // Parse stat data for the thread if the snapshot captured it.
        let stat = match self.task_stats.get(&nid) {
            Some(raw) => Some(
                TaskStat::parse(raw).map_err(|source| DumpError::Stat { nid, source })?,
            ),
            None => None,
        };

        // Header markers win over stat-derived values, which in turn win over
        // the zero fallback.
        let cpu = match header_field(header, "cpu") {
            Some(value) => parse_duration(value).map_err(|source| DumpError::InvalidDuration {
                field: "cpu",
                source,
            })?,
            None => match &stat {
                Some(stat) => clk.duration(stat.utime.saturating_add(stat.stime)),
                None => Duration::ZERO,
            },
        };

        let elapsed = match header_field(header, "elapsed") {
            Some(value) => parse_duration(value).map_err(|source| DumpError::InvalidDuration {
                field: "elapsed",
                source,
            })?,
            None => match (&stat, self.uptime) {
                (Some(stat), Some(uptime)) => uptime
                    .checked_sub(clk.duration(stat.starttime))
                    .unwrap_or_default(),
                _ => Duration::ZERO,
            },
        };

        Ok(Thread {
            header: header.to_string(),
            name,
            tid,
            nid,
            cpu,
            elapsed,
            stack,
        })
    }
}
