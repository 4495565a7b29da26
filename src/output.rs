//! Report formatting for ranked threads.
//!
//! Interactive terminals get a right-aligned percentage bracket; piped
//! output gets the raw fraction, tab-delimited, so the report stays easy to
//! post-process with sort/awk. The data is identical either way.

use crate::rank::Ranking;
use std::io::IsTerminal;

/// Print the ranked threads and the totals line to stdout.
pub fn print_ranking(ranking: &Ranking, summary: bool) {
    let interactive = std::io::stdout().is_terminal();

    for thread in &ranking.threads {
        print_entry(interactive, thread.frac, &thread.header);
        if !summary {
            if !thread.stack.is_empty() {
                println!("{}", thread.stack);
            }
            println!();
        }
    }

    let totals = format!("Total (elapsed {})", format_secs(ranking.max_elapsed_secs));
    print_entry(interactive, ranking.total_frac(), &totals);
}

fn print_entry(interactive: bool, frac: f64, header: &str) {
    if interactive {
        println!("[{:6.2}%] {}", 100.0 * frac, header);
    } else {
        println!("{frac:.6}\t{header}");
    }
}

fn format_secs(secs: f64) -> String {
    format!("{secs:.3}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(2.0), "2.000s");
        assert_eq!(format_secs(9.4999), "9.500s");
        assert_eq!(format_secs(0.0), "0.000s");
    }

    #[test]
    fn test_non_finite_fraction_formats() {
        // Degenerate windows produce non-finite fractions; formatting must
        // not panic on them.
        assert_eq!(format!("{:.6}", f64::INFINITY), "inf");
        assert_eq!(format!("{:.6}", f64::NAN), "NaN");
    }
}
