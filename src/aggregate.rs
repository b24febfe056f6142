//! Merging per-CPU collectors into one approximate global top-K.
//!
//! The merge feeds every value retained by an online CPU through
//! [`TopK::add_sample`] into a fresh collector of the same capacity.
//!
//! The result is an approximation of the global top-K. A CPU that saw more
//! than K samples already evicted values below its own K-th largest, and an
//! evicted value may have outranked everything another CPU kept. Every
//! returned value was really observed, so the result never overestimates;
//! it is exact when no contributing collector ever evicted, which
//! [`Aggregate::exact`] reports.

use crate::Error;
use crate::collector::{PerCpuCollectors, TopK};

/// Result of one merge.
#[derive(Debug)]
pub struct Aggregate {
    /// Merged top-K, consumed by the formatter.
    pub top: TopK<u64>,
    /// Samples seen by the contributing collectors.
    pub observed: u64,
    /// Number of online CPUs that contributed.
    pub cpus: usize,
    /// True when no contributing collector discarded a sample, which makes
    /// `top` the true global top-K.
    pub exact: bool,
}

/// Merge every online CPU's retained samples into a new collector.
///
/// Must only run once the probes are detached.
pub fn summarize(collectors: &PerCpuCollectors, capacity: usize) -> Result<Aggregate, Error> {
    let mut top = TopK::try_new(capacity)?;
    let mut observed = 0u64;
    let mut cpus = 0;
    let mut exact = true;

    collectors.for_each_online(|_, local| {
        for &value in local.values() {
            top.add_sample(value);
        }
        observed = observed.wrapping_add(local.observed());
        exact &= local.is_lossless();
        cpus += 1;
    });

    Ok(Aggregate {
        top,
        observed,
        cpus,
        exact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(collectors: &PerCpuCollectors, cpu: usize, latencies: &[u64]) {
        for &latency in latencies {
            collectors.record_entry(cpu, 1_000);
            collectors.record_return(cpu, 1_000 + latency);
        }
    }

    #[test]
    fn test_summarize_empty() {
        let collectors = PerCpuCollectors::new(2, 4).unwrap();
        let agg = summarize(&collectors, 4).unwrap();
        assert!(agg.top.is_empty());
        assert_eq!(agg.observed, 0);
        assert_eq!(agg.cpus, 2);
        assert!(agg.exact);
    }

    #[test]
    fn test_summarize_lossy_flag() {
        let collectors = PerCpuCollectors::new(1, 2).unwrap();
        feed(&collectors, 0, &[1, 2, 3]);
        let agg = summarize(&collectors, 2).unwrap();
        assert_eq!(agg.observed, 3);
        assert!(!agg.exact);
    }
}
