//! herakles-thread-top core library.
//!
//! Parses jstack thread dumps and `/proc/[pid]/task/[tid]/stat` records,
//! reconciles two time-separated snapshots of the same JVM into per-thread
//! CPU fractions, and produces a deterministic ranking. The binary in
//! `main.rs` wraps this with snapshot acquisition and report printing.
//!
//! The parsing and ranking core is synchronous and purely functional over
//! its inputs: snapshots are immutable once captured and the ranking only
//! reads them.

pub mod capture;
pub mod cli;
pub mod dump;
pub mod duration;
pub mod output;
pub mod proc;
pub mod rank;

// Re-export main types for convenience
pub use dump::{DumpError, Snapshot, Thread};
pub use proc::{ClockTck, StatError, TaskStat};
pub use rank::{rank_threads, RankedThread, Ranking};
