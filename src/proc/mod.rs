//! Kernel scheduling-stat parsing for thread CPU accounting.
//!
//! This module parses `/proc/<pid>/task/<tid>/stat` records and converts
//! their clock-tick counters into wall-clock durations.

pub mod stat;

pub use stat::{StatError, TaskStat};

use once_cell::sync::Lazy;
use std::time::Duration;

/// Clock ticks per second, as configured for the running kernel.
///
/// Tick counters in stat records (utime, stime, starttime, ...) are measured
/// in this unit. Resolved once at startup and passed explicitly into the
/// parsers rather than read as ambient state.
#[derive(Debug, Clone, Copy)]
pub struct ClockTck(f64);

impl ClockTck {
    /// Detect the system clock tick rate (usually 100, but can vary).
    pub fn detect() -> Self {
        #[cfg(unix)]
        {
            // SAFETY: sysconf is safe to call with _SC_CLK_TCK
            // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
            unsafe {
                let tck = libc::sysconf(libc::_SC_CLK_TCK);
                if tck > 0 {
                    return ClockTck(tck as f64);
                }
            }
        }
        // Fallback to common default for error cases or non-Unix platforms
        ClockTck(100.0)
    }

    /// A fixed tick rate, mainly useful for tests and pre-captured data.
    pub fn from_hz(hz: f64) -> Self {
        ClockTck(hz)
    }

    /// Convert a raw tick counter to a wall-clock duration.
    pub fn duration(&self, ticks: u64) -> Duration {
        Duration::from_secs_f64(ticks as f64 / self.0)
    }
}

/// System clock tick rate, detected once at startup.
pub static CLK_TCK: Lazy<ClockTck> = Lazy::new(ClockTck::detect);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_conversion() {
        let clk = ClockTck::from_hz(100.0);
        assert_eq!(clk.duration(300), Duration::from_secs(3));
        assert_eq!(clk.duration(50), Duration::from_millis(500));
        assert_eq!(clk.duration(0), Duration::ZERO);
    }

    #[test]
    fn test_detect_is_positive() {
        let clk = ClockTck::detect();
        assert!(clk.0 > 0.0);
    }
}
