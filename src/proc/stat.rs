//! Parser for the single-line `/proc/[pid]/stat` record format.
//!
//! The record is `pid (comm) state ppid ...` with 50 whitespace-delimited
//! fields after the command name. The command name itself may contain spaces
//! and parentheses, so it is delimited by the first `" ("` and the *last*
//! `") "` on the line rather than the first matching pair. Field meanings
//! and widths follow proc(5).

use thiserror::Error;

/// Number of whitespace-delimited fields following the command name.
const TRAILING_FIELDS: usize = 50;

/// Errors produced while parsing a stat record.
#[derive(Debug, Error)]
pub enum StatError {
    #[error("\"{0}\" field not found")]
    MissingField(&'static str),

    #[error("invalid \"{name}\" value \"{value}\"")]
    InvalidField { name: &'static str, value: String },

    #[error("expected {TRAILING_FIELDS} fields after command name, got {0}")]
    FieldCount(usize),
}

/// One parsed `/proc/[pid]/task/[tid]/stat` record.
///
/// Only `utime`, `stime` and `starttime` feed the CPU ranking; the remaining
/// fields are carried so the record round-trips the full kernel schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStat {
    /// The thread ID.
    pub pid: i64,
    /// The filename of the executable, without the surrounding parentheses.
    /// Truncated by the kernel to TASK_COMM_LEN (16) bytes.
    pub comm: String,
    /// Single-character process state code (R, S, D, Z, T, ...).
    pub state: char,
    pub ppid: i64,
    pub pgrp: i64,
    pub session: i64,
    pub tty_nr: i64,
    pub tpgid: i64,
    pub flags: u64,
    pub minflt: u64,
    pub cminflt: u64,
    pub majflt: u64,
    pub cmajflt: u64,
    /// Time scheduled in user mode, in clock ticks.
    pub utime: u64,
    /// Time scheduled in kernel mode, in clock ticks.
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: i64,
    pub itrealvalue: i64,
    /// Time the task started after system boot, in clock ticks.
    pub starttime: u64,
    pub vsize: u64,
    pub rss: i64,
    pub rsslim: u64,
    pub startcode: u64,
    pub endcode: u64,
    pub startstack: u64,
    pub kstkesp: u64,
    pub kstkeip: u64,
    pub signal: u64,
    pub blocked: u64,
    pub sigignore: u64,
    pub sigcatch: u64,
    pub wchan: u64,
    pub nswap: u64,
    pub cnswap: u64,
    pub exit_signal: i64,
    pub processor: i64,
    pub rt_priority: u64,
    pub policy: u64,
    pub delayacct_blkio_ticks: u64,
    pub guest_time: u64,
    pub cguest_time: i64,
    pub start_data: u64,
    pub end_data: u64,
    pub start_brk: u64,
    pub arg_start: u64,
    pub arg_end: u64,
    pub env_start: u64,
    pub env_end: u64,
    pub exit_code: i64,
}

fn parse_i64(name: &'static str, value: &str) -> Result<i64, StatError> {
    value.parse().map_err(|_| StatError::InvalidField {
        name,
        value: value.to_string(),
    })
}

fn parse_u64(name: &'static str, value: &str) -> Result<u64, StatError> {
    value.parse().map_err(|_| StatError::InvalidField {
        name,
        value: value.to_string(),
    })
}

fn parse_char(name: &'static str, value: &str) -> Result<char, StatError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(StatError::InvalidField {
            name,
            value: value.to_string(),
        }),
    }
}

impl TaskStat {
    /// Parse one stat line into a fully populated record.
    ///
    /// Any malformed field fails the whole record; on success every field is
    /// set from the input.
    pub fn parse(line: &str) -> Result<TaskStat, StatError> {
        let line = line.strip_suffix('\n').unwrap_or(line);

        let pid_end = line.find(' ').ok_or(StatError::MissingField("pid"))?;
        let pid = parse_i64("pid", &line[..pid_end])?;

        // The command name may contain spaces and parentheses, so locate the
        // outermost pair: first " (" from the front, last ") " from the back.
        let comm_begin = line.find(" (").ok_or(StatError::MissingField("comm"))?;
        let comm_end = line.rfind(") ").ok_or(StatError::MissingField("comm"))?;
        if comm_end < comm_begin {
            return Err(StatError::MissingField("comm"));
        }
        let comm = line[comm_begin + 2..comm_end].to_string();

        let f: Vec<&str> = line[comm_end + 2..].split_ascii_whitespace().collect();
        if f.len() != TRAILING_FIELDS {
            return Err(StatError::FieldCount(f.len()));
        }

        Ok(TaskStat {
            pid,
            comm,
            state: parse_char("state", f[0])?,
            ppid: parse_i64("ppid", f[1])?,
            pgrp: parse_i64("pgrp", f[2])?,
            session: parse_i64("session", f[3])?,
            tty_nr: parse_i64("tty_nr", f[4])?,
            tpgid: parse_i64("tpgid", f[5])?,
            flags: parse_u64("flags", f[6])?,
            minflt: parse_u64("minflt", f[7])?,
            cminflt: parse_u64("cminflt", f[8])?,
            majflt: parse_u64("majflt", f[9])?,
            cmajflt: parse_u64("cmajflt", f[10])?,
            utime: parse_u64("utime", f[11])?,
            stime: parse_u64("stime", f[12])?,
            cutime: parse_i64("cutime", f[13])?,
            cstime: parse_i64("cstime", f[14])?,
            priority: parse_i64("priority", f[15])?,
            nice: parse_i64("nice", f[16])?,
            num_threads: parse_i64("num_threads", f[17])?,
            itrealvalue: parse_i64("itrealvalue", f[18])?,
            starttime: parse_u64("starttime", f[19])?,
            vsize: parse_u64("vsize", f[20])?,
            rss: parse_i64("rss", f[21])?,
            rsslim: parse_u64("rsslim", f[22])?,
            startcode: parse_u64("startcode", f[23])?,
            endcode: parse_u64("endcode", f[24])?,
            startstack: parse_u64("startstack", f[25])?,
            kstkesp: parse_u64("kstkesp", f[26])?,
            kstkeip: parse_u64("kstkeip", f[27])?,
            signal: parse_u64("signal", f[28])?,
            blocked: parse_u64("blocked", f[29])?,
            sigignore: parse_u64("sigignore", f[30])?,
            sigcatch: parse_u64("sigcatch", f[31])?,
            wchan: parse_u64("wchan", f[32])?,
            nswap: parse_u64("nswap", f[33])?,
            cnswap: parse_u64("cnswap", f[34])?,
            exit_signal: parse_i64("exit_signal", f[35])?,
            processor: parse_i64("processor", f[36])?,
            rt_priority: parse_u64("rt_priority", f[37])?,
            policy: parse_u64("policy", f[38])?,
            delayacct_blkio_ticks: parse_u64("delayacct_blkio_ticks", f[39])?,
            guest_time: parse_u64("guest_time", f[40])?,
            cguest_time: parse_i64("cguest_time", f[41])?,
            start_data: parse_u64("start_data", f[42])?,
            end_data: parse_u64("end_data", f[43])?,
            start_brk: parse_u64("start_brk", f[44])?,
            arg_start: parse_u64("arg_start", f[45])?,
            arg_end: parse_u64("arg_end", f[46])?,
            env_start: parse_u64("env_start", f[47])?,
            env_end: parse_u64("env_end", f[48])?,
            exit_code: parse_i64("exit_code", f[49])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A realistic stat line for a java worker thread (52 fields total).
    fn sample_line(comm: &str) -> String {
        format!(
            "100 ({comm}) S 1 100 100 0 -1 4194368 2733 0 1 0 200 100 0 0 \
             20 0 37 0 50 2800778240 53415 18446744073709551615 \
             94223363066816 94223363067920 140726283964704 0 0 0 0 \
             4096 16800973 1 0 0 17 3 0 0 5 0 0 94223363078744 \
             94223363079352 94223384731648 140726283969419 140726283969432 \
             140726283969432 140726283972575 0"
        )
    }

    #[test]
    fn test_parse_basic_record() {
        let stat = TaskStat::parse(&sample_line("java")).unwrap();
        assert_eq!(stat.pid, 100);
        assert_eq!(stat.comm, "java");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.tpgid, -1);
        assert_eq!(stat.utime, 200);
        assert_eq!(stat.stime, 100);
        assert_eq!(stat.num_threads, 37);
        assert_eq!(stat.starttime, 50);
        assert_eq!(stat.processor, 3);
        assert_eq!(stat.delayacct_blkio_ticks, 5);
        assert_eq!(stat.exit_code, 0);
    }

    #[test]
    fn test_parse_comm_with_spaces_and_parens() {
        // The comm field is delimited by the outermost parenthesis pair, so
        // embedded spaces and parentheses must survive verbatim while all 50
        // trailing fields still land at their correct positions.
        let stat = TaskStat::parse(&sample_line("java (main)")).unwrap();
        assert_eq!(stat.comm, "java (main)");
        assert_eq!(stat.utime, 200);
        assert_eq!(stat.stime, 100);
        assert_eq!(stat.starttime, 50);
    }

    #[test]
    fn test_parse_trailing_newline() {
        let line = sample_line("java") + "\n";
        let stat = TaskStat::parse(&line).unwrap();
        assert_eq!(stat.exit_code, 0);
    }

    #[test]
    fn test_parse_missing_pid() {
        let err = TaskStat::parse("12345").unwrap_err();
        assert!(err.to_string().contains("pid"));
    }

    #[test]
    fn test_parse_missing_comm() {
        let err = TaskStat::parse("123 java S 1").unwrap_err();
        assert!(err.to_string().contains("comm"));
    }

    #[test]
    fn test_parse_invalid_numeric_field_names_offender() {
        let line = sample_line("java").replace(" 2733 ", " banana ");
        let err = TaskStat::parse(&line).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("minflt"), "unexpected error: {msg}");
        assert!(msg.contains("banana"), "unexpected error: {msg}");
    }

    #[test]
    fn test_parse_wrong_field_count() {
        let err = TaskStat::parse("100 (java) S 1 100").unwrap_err();
        assert!(matches!(err, StatError::FieldCount(_)));
    }

    #[test]
    fn test_parse_multichar_state_rejected() {
        let line = sample_line("java").replace(") S ", ") SS ");
        let err = TaskStat::parse(&line).unwrap_err();
        assert!(err.to_string().contains("state"));
    }

    #[test]
    fn test_parse_idempotent() {
        let line = sample_line("GC Thread#0");
        let a = TaskStat::parse(&line).unwrap();
        let b = TaskStat::parse(&line).unwrap();
        assert_eq!(a, b);
    }
}
