//! Live snapshot acquisition: jstack, jps and the /proc scan.
//!
//! Capturing a snapshot runs `jstack` and the per-task stat scan
//! concurrently; sampling runs two whole captures concurrently with the
//! second one delayed by the sampling interval. In every case either both
//! sides complete or the first failure aborts before any parsing starts.

use crate::dump::Snapshot;
use ahash::AHashMap as HashMap;
use anyhow::{bail, Context, Result};
use std::fs;
use std::io;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Resolve a PID or JVM main-class name to a PID.
///
/// Non-numeric arguments are looked up in `jps -l` output, whose lines are
/// `<pid> <main-class>`; the match must be exact on the main-class column.
pub async fn resolve_jvm_pid(target: &str) -> Result<i32> {
    if let Ok(pid) = target.parse::<i32>() {
        return Ok(pid);
    }

    let out = Command::new("jps")
        .arg("-l")
        .output()
        .await
        .context("failed to run jps -l")?;
    if !out.status.success() {
        bail!(
            "jps -l failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }

    let stdout = String::from_utf8_lossy(&out.stdout);
    for line in stdout.lines() {
        if let Some((pid, class)) = line.split_once(' ') {
            if class == target {
                return pid
                    .parse()
                    .with_context(|| format!("invalid pid in jps output: {line}"));
            }
        }
    }

    bail!("no JVM found matching \"{target}\"")
}

/// Read the stat record of every task of `pid`, keyed by numeric thread id.
///
/// A missing /proc tree (non-Linux, restricted container, or a process that
/// exited) yields an empty map rather than an error; individual tasks that
/// vanish mid-scan are skipped.
pub fn collect_task_stats(pid: i32) -> io::Result<HashMap<i64, String>> {
    let mut stats = HashMap::new();

    let leader = match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(stats),
        Err(e) => return Err(e),
    };
    stats.insert(i64::from(pid), leader);

    // proc(5): /proc/[pid]/task has one subdirectory per thread, named by
    // its numeric thread ID.
    let tasks = match fs::read_dir(format!("/proc/{pid}/task")) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(stats),
        Err(e) => return Err(e),
    };

    for entry in tasks.flatten() {
        let name = entry.file_name();
        let tid: i64 = match name.to_string_lossy().parse() {
            Ok(tid) => tid,
            Err(_) => continue,
        };
        if tid == i64::from(pid) {
            // Already read as the leader above.
            continue;
        }
        match fs::read_to_string(format!("/proc/{pid}/task/{tid}/stat")) {
            Ok(text) => {
                stats.insert(tid, text);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(stats)
}

/// Read system uptime from /proc/uptime (format: "<uptime> <idle>").
///
/// Returns None where the file does not exist so captures degrade to
/// header-only timing instead of failing.
pub fn read_uptime() -> io::Result<Option<Duration>> {
    let content = match fs::read_to_string("/proc/uptime") {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let uptime = content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| io::Error::other("invalid /proc/uptime format"))?;

    Ok(Some(Duration::from_secs_f64(uptime)))
}

/// Capture one snapshot: jstack output plus per-task stat records plus the
/// uptime at capture time.
pub async fn capture(pid: i32) -> Result<Snapshot> {
    let uptime = read_uptime().context("failed to read /proc/uptime")?;

    let (task_stats, out) = tokio::try_join!(
        async {
            tokio::task::spawn_blocking(move || collect_task_stats(pid))
                .await
                .context("task stat scan aborted")?
                .with_context(|| format!("failed to scan /proc/{pid}/task"))
        },
        async {
            Command::new("jstack")
                .arg(pid.to_string())
                .output()
                .await
                .context("failed to run jstack")
        },
    )?;

    if !out.status.success() {
        bail!(
            "jstack {pid} failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }

    debug!(pid, tasks = task_stats.len(), "captured snapshot");

    Ok(Snapshot {
        text: String::from_utf8_lossy(&out.stdout).into_owned(),
        task_stats,
        uptime,
    })
}

/// Take two snapshots of `pid` separated by `interval`, concurrently; a
/// failure on either side aborts the pair.
pub async fn sample_pair(pid: i32, interval: Duration) -> Result<(Snapshot, Snapshot)> {
    debug!(pid, ?interval, "sampling");
    tokio::try_join!(capture(pid), async {
        tokio::time::sleep(interval).await;
        capture(pid).await
    })
}
