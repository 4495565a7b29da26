//! Delta ranking: reconciles two snapshots into a CPU-fraction ordering.
//!
//! For every thread in the "after" snapshot the engine computes how much CPU
//! and wall-clock time it accumulated since the "before" snapshot, ranks by
//! the resulting CPU fraction, and aggregates totals for the summary line.

use crate::dump::Thread;
use ahash::AHashMap as HashMap;
use std::cmp::Ordering;

/// One ranked thread, derived fresh per ranking request.
#[derive(Debug, Clone)]
pub struct RankedThread {
    /// Display thread id.
    pub tid: String,
    /// CPU delta divided by elapsed delta over the window. Non-finite when
    /// the window length is zero; callers must tolerate that.
    pub frac: f64,
    /// CPU time accumulated in the window, in seconds. Negative if the
    /// display id was reused by an unrelated thread between snapshots.
    pub cpu_secs: f64,
    /// Wall-clock time covered by the window, in seconds.
    pub elapsed_secs: f64,
    /// Verbatim header line from the "after" snapshot.
    pub header: String,
    /// Verbatim stack text from the "after" snapshot.
    pub stack: String,
}

/// An ordered ranking plus the aggregate totals over all "after" threads.
#[derive(Debug, Clone)]
pub struct Ranking {
    pub threads: Vec<RankedThread>,
    /// Sum of CPU deltas across every "after" thread, truncated or not.
    pub total_cpu_secs: f64,
    /// Longest elapsed delta observed across every "after" thread.
    pub max_elapsed_secs: f64,
}

impl Ranking {
    /// CPU fraction for the totals line; non-finite when no thread covered a
    /// positive window.
    pub fn total_frac(&self) -> f64 {
        self.total_cpu_secs / self.max_elapsed_secs
    }
}

/// Order fractions descending with non-finite values after every finite one,
/// so zero-length windows sink to the bottom of the report deterministically.
fn frac_class(frac: f64) -> u8 {
    if frac.is_finite() {
        0
    } else if frac == f64::INFINITY {
        1
    } else if frac == f64::NEG_INFINITY {
        2
    } else {
        3
    }
}

fn compare_ranked(a: &RankedThread, b: &RankedThread) -> Ordering {
    frac_class(a.frac)
        .cmp(&frac_class(b.frac))
        // Descending within the finite class; equal classes of non-finite
        // values compare Equal here and fall through to the tid tie-break.
        .then_with(|| b.frac.partial_cmp(&a.frac).unwrap_or(Ordering::Equal))
        .then_with(|| a.tid.cmp(&b.tid))
}

/// Rank every thread of `after` by CPU fraction over the sampling window.
///
/// A thread with no `before` counterpart is treated as first observed at the
/// start of the window, so its deltas are its raw "after" values. A positive
/// `limit` keeps only the leading entries (clamped to the available count);
/// zero means all. Neither input mapping is mutated.
pub fn rank_threads(
    before: &HashMap<String, Thread>,
    after: &HashMap<String, Thread>,
    limit: usize,
) -> Ranking {
    let mut threads = Vec::with_capacity(after.len());
    let mut total_cpu_secs = 0.0_f64;
    let mut max_elapsed_secs = 0.0_f64;

    for (tid, t1) in after {
        let (cpu_secs, elapsed_secs) = match before.get(tid) {
            Some(t0) => (
                t1.cpu.as_secs_f64() - t0.cpu.as_secs_f64(),
                t1.elapsed.as_secs_f64() - t0.elapsed.as_secs_f64(),
            ),
            None => (t1.cpu.as_secs_f64(), t1.elapsed.as_secs_f64()),
        };

        total_cpu_secs += cpu_secs;
        if elapsed_secs > max_elapsed_secs {
            max_elapsed_secs = elapsed_secs;
        }

        threads.push(RankedThread {
            tid: tid.clone(),
            frac: cpu_secs / elapsed_secs,
            cpu_secs,
            elapsed_secs,
            header: t1.header.clone(),
            stack: t1.stack.clone(),
        });
    }

    threads.sort_by(compare_ranked);
    if limit > 0 {
        threads.truncate(limit);
    }

    Ranking {
        threads,
        total_cpu_secs,
        max_elapsed_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn thread(tid: &str, cpu_ms: u64, elapsed_ms: u64) -> Thread {
        Thread {
            header: format!("\"{tid}\" tid={tid} nid=1 runnable"),
            name: tid.to_string(),
            tid: tid.to_string(),
            nid: 1,
            cpu: Duration::from_millis(cpu_ms),
            elapsed: Duration::from_millis(elapsed_ms),
            stack: String::new(),
        }
    }

    fn map(threads: Vec<Thread>) -> HashMap<String, Thread> {
        threads.into_iter().map(|t| (t.tid.clone(), t)).collect()
    }

    #[test]
    fn test_delta_between_snapshots() {
        let before = map(vec![thread("t1", 1000, 5000)]);
        let after = map(vec![thread("t1", 3000, 7000)]);
        let ranking = rank_threads(&before, &after, 0);

        assert_eq!(ranking.threads.len(), 1);
        let t = &ranking.threads[0];
        assert!((t.cpu_secs - 2.0).abs() < 1e-9);
        assert!((t.elapsed_secs - 2.0).abs() < 1e-9);
        assert!((t.frac - 1.0).abs() < 1e-9);
        assert!((ranking.total_cpu_secs - 2.0).abs() < 1e-9);
        assert!((ranking.max_elapsed_secs - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_new_thread_uses_raw_after_values() {
        let before = HashMap::new();
        let after = map(vec![thread("t1", 1500, 3000)]);
        let ranking = rank_threads(&before, &after, 0);

        let t = &ranking.threads[0];
        assert!((t.cpu_secs - 1.5).abs() < 1e-9);
        assert!((t.elapsed_secs - 3.0).abs() < 1e-9);
        assert!((t.frac - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_ordering_descending_with_tid_tiebreak() {
        let before = HashMap::new();
        // Two idle threads tie at fraction 0 and must come out in tid order
        // regardless of map iteration order.
        let after = map(vec![
            thread("idle-b", 0, 1000),
            thread("busy", 900, 1000),
            thread("idle-a", 0, 1000),
            thread("half", 500, 1000),
        ]);
        let ranking = rank_threads(&before, &after, 0);
        let order: Vec<&str> = ranking.threads.iter().map(|t| t.tid.as_str()).collect();
        assert_eq!(order, vec!["busy", "half", "idle-a", "idle-b"]);
    }

    #[test]
    fn test_non_finite_fractions_sort_last() {
        let before = HashMap::new();
        let after = map(vec![
            // Zero elapsed with positive CPU: +inf fraction.
            thread("born-now", 100, 0),
            // Zero elapsed and zero CPU: NaN fraction.
            thread("idle-new", 0, 0),
            thread("busy", 500, 1000),
            thread("idle", 0, 1000),
        ]);
        let ranking = rank_threads(&before, &after, 0);
        let order: Vec<&str> = ranking.threads.iter().map(|t| t.tid.as_str()).collect();
        assert_eq!(order, vec!["busy", "idle", "born-now", "idle-new"]);
    }

    #[test]
    fn test_truncation_keeps_leading_entries() {
        let before = HashMap::new();
        let after = map((0..10).map(|i| thread(&format!("t{i}"), i * 100, 1000)).collect());
        let ranking = rank_threads(&before, &after, 3);

        let order: Vec<&str> = ranking.threads.iter().map(|t| t.tid.as_str()).collect();
        assert_eq!(order, vec!["t9", "t8", "t7"]);
        // Totals still cover every thread, not just the retained ones.
        assert!((ranking.total_cpu_secs - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_truncation_clamped_past_available_count() {
        let before = HashMap::new();
        let after = map(vec![thread("t1", 100, 1000), thread("t2", 200, 1000)]);
        let ranking = rank_threads(&before, &after, 50);
        assert_eq!(ranking.threads.len(), 2);
    }

    #[test]
    fn test_zero_limit_keeps_all() {
        let before = HashMap::new();
        let after = map(vec![thread("t1", 100, 1000), thread("t2", 200, 1000)]);
        let ranking = rank_threads(&before, &after, 0);
        assert_eq!(ranking.threads.len(), 2);
    }

    #[test]
    fn test_reused_tid_yields_negative_delta() {
        let before = map(vec![thread("t1", 5000, 9000)]);
        let after = map(vec![thread("t1", 1000, 2000)]);
        let ranking = rank_threads(&before, &after, 0);
        let t = &ranking.threads[0];
        assert!(t.cpu_secs < 0.0);
        assert!(t.elapsed_secs < 0.0);
    }

    #[test]
    fn test_total_frac_non_finite_when_no_window() {
        let before = HashMap::new();
        let after = map(vec![thread("t1", 0, 0)]);
        let ranking = rank_threads(&before, &after, 0);
        assert!(!ranking.total_frac().is_finite());
    }
}
