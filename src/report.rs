//! Reading back the `samples` file.
//!
//! Benchmark harnesses stop a session, read `samples`, and turn each line
//! back into an integer. [`parse_samples`] does that, and
//! [`SamplesSummary`] reduces the result to a few order statistics.

use alloc::string::String;
use alloc::vec::Vec;

use crate::Error;

/// Parse `samples` text into latencies, in file order.
///
/// Empty lines are skipped; any other line must be a decimal `u64`.
pub fn parse_samples(text: &str) -> Result<Vec<u64>, Error> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.parse::<u64>().map_err(|_| Error::Parse(String::from(line))))
        .collect()
}

/// Order statistics over a set of latencies, in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplesSummary {
    pub count: usize,
    pub min_ns: u64,
    pub max_ns: u64,
    pub p50_ns: u64,
    pub p90_ns: u64,
    pub p99_ns: u64,
}

impl SamplesSummary {
    /// Summarize ascending `samples`. All fields are zero when empty.
    ///
    /// Percentiles use the nearest-rank method. Over a top-K file they
    /// describe the tail that was kept, not the whole population.
    pub fn from_sorted(samples: &[u64]) -> Self {
        let (Some(&min_ns), Some(&max_ns)) = (samples.first(), samples.last()) else {
            return Self::default();
        };
        Self {
            count: samples.len(),
            min_ns,
            max_ns,
            p50_ns: nearest_rank(samples, 50),
            p90_ns: nearest_rank(samples, 90),
            p99_ns: nearest_rank(samples, 99),
        }
    }

    /// Summarize `samples` in any order.
    pub fn from_unsorted(mut samples: Vec<u64>) -> Self {
        samples.sort_unstable();
        Self::from_sorted(&samples)
    }
}

/// `pct`-th percentile of non-empty ascending `samples`.
fn nearest_rank(samples: &[u64], pct: usize) -> u64 {
    let rank = (pct * samples.len()).div_ceil(100).max(1);
    samples[rank - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_rank() {
        let samples: Vec<u64> = (1..=100).collect();
        assert_eq!(nearest_rank(&samples, 50), 50);
        assert_eq!(nearest_rank(&samples, 99), 99);
        assert_eq!(nearest_rank(&[7], 1), 7);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        assert_eq!(parse_samples("3\n\n5\n").unwrap(), [3, 5]);
        assert!(parse_samples("").unwrap().is_empty());
    }
}
