//! Integration tests for top-K retention and merging.
//!
//! Tests TopK, PerCpuCollectors and summarize.

use lbprof::collector::{PerCpuCollectors, TopK};
use lbprof::{Error, OutputBuffer, summarize};

/// Deterministic xorshift64 sequence.
fn xorshift(seed: u64, n: usize) -> Vec<u64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        })
        .collect()
}

fn sorted_values(topk: &TopK<u64>) -> Vec<u64> {
    let mut values = topk.values().to_vec();
    values.sort_unstable();
    values
}

/// The `k` largest values of `samples`, ascending.
fn reference_top_k(samples: &[u64], k: usize) -> Vec<u64> {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    sorted[sorted.len().saturating_sub(k)..].to_vec()
}

fn feed(collectors: &PerCpuCollectors, cpu: usize, latencies: &[u64]) {
    for &latency in latencies {
        collectors.record_entry(cpu, 10_000);
        collectors.record_return(cpu, 10_000 + latency);
    }
}

// =============================================================================
// Retention Tests
// =============================================================================

#[test]
fn test_retains_k_largest() {
    for (seed, n, k) in [(1u64, 50usize, 10usize), (7, 10, 10), (42, 5, 16), (99, 3000, 1000)] {
        let samples: Vec<u64> = xorshift(seed, n).iter().map(|v| v % 10_000).collect();
        let mut topk = TopK::try_new(k).unwrap();
        for &s in &samples {
            topk.add_sample(s);
        }

        assert_eq!(topk.len(), n.min(k));
        assert_eq!(sorted_values(&topk), reference_top_k(&samples, k));
    }
}

#[test]
fn test_retention_independent_of_order() {
    let samples = xorshift(3, 200);
    let mut reversed = samples.clone();
    reversed.reverse();

    let mut a = TopK::try_new(20).unwrap();
    let mut b = TopK::try_new(20).unwrap();
    for (&x, &y) in samples.iter().zip(&reversed) {
        a.add_sample(x);
        b.add_sample(y);
    }
    assert_eq!(sorted_values(&a), sorted_values(&b));
}

#[test]
fn test_equal_to_minimum_not_inserted() {
    let mut topk = TopK::try_new(3).unwrap();
    for v in [4u64, 8, 6] {
        assert!(topk.add_sample(v));
    }
    assert_eq!(topk.min(), Some(4));

    assert!(!topk.add_sample(4));
    assert!(!topk.add_sample(2));
    assert_eq!(sorted_values(&topk), [4, 6, 8]);

    assert!(topk.add_sample(5));
    assert_eq!(sorted_values(&topk), [5, 6, 8]);
}

#[test]
fn test_drain_ascending_empties() {
    let samples = xorshift(11, 64);
    let mut topk = TopK::try_new(64).unwrap();
    for &s in &samples {
        topk.add_sample(s);
    }
    let nr = topk.len();

    let drained: Vec<u64> = topk.drain_ascending().collect();
    assert_eq!(drained.len(), nr);
    assert!(drained.windows(2).all(|w| w[0] < w[1]));
    assert!(topk.is_empty());
}

// =============================================================================
// Per-CPU Collector Tests
// =============================================================================

#[test]
fn test_end_to_end_capacity_three() {
    let collectors = PerCpuCollectors::new(1, 3).unwrap();
    feed(&collectors, 0, &[5, 1, 9]);
    assert_eq!(collectors.with_cpu(0, |c| c.min()), Some(Some(1)));

    feed(&collectors, 0, &[3]);
    let retained = collectors.with_cpu(0, sorted_values).unwrap();
    assert_eq!(retained, [3, 5, 9]);
}

#[test]
fn test_entry_overwrites_timestamp() {
    let collectors = PerCpuCollectors::new(1, 4).unwrap();
    collectors.record_entry(0, 100);
    collectors.record_entry(0, 400);
    collectors.record_return(0, 500);
    assert_eq!(collectors.with_cpu(0, sorted_values).unwrap(), [100]);
}

#[test]
fn test_cpus_are_independent() {
    let collectors = PerCpuCollectors::new(3, 4).unwrap();
    feed(&collectors, 0, &[10]);
    feed(&collectors, 2, &[30, 31]);
    assert_eq!(collectors.with_cpu(0, |c| c.len()), Some(1));
    assert_eq!(collectors.with_cpu(1, |c| c.len()), Some(0));
    assert_eq!(collectors.with_cpu(2, |c| c.len()), Some(2));
    assert_eq!(collectors.with_cpu(3, |c| c.len()), None);
}

#[test]
fn test_set_online_bad_cpu() {
    let collectors = PerCpuCollectors::new(2, 4).unwrap();
    assert!(matches!(collectors.set_online(2, false), Err(Error::InvalidInput)));
    assert!(collectors.is_online(1));
    assert!(!collectors.is_online(2));
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_merge_respects_global_ranking() {
    let collectors = PerCpuCollectors::new(2, 2).unwrap();
    feed(&collectors, 0, &[10, 20]);
    feed(&collectors, 1, &[15, 25]);

    let mut agg = summarize(&collectors, 2).unwrap();
    assert_eq!(agg.cpus, 2);
    assert_eq!(agg.observed, 4);
    assert!(agg.exact);
    let merged: Vec<u64> = agg.top.drain_ascending().collect();
    assert_eq!(merged, [20, 25]);
}

#[test]
fn test_merge_is_approximate_after_local_eviction() {
    // CPU 0 saw the three largest values but could keep only two.
    let collectors = PerCpuCollectors::new(2, 2).unwrap();
    feed(&collectors, 0, &[100, 90, 80]);
    feed(&collectors, 1, &[1, 2]);

    let agg = summarize(&collectors, 3).unwrap();
    assert_eq!(sorted_values(&agg.top), [2, 90, 100]);
    assert!(!agg.exact);
}

#[test]
fn test_merge_exact_when_nothing_evicted() {
    let collectors = PerCpuCollectors::new(2, 4).unwrap();
    feed(&collectors, 0, &[3, 1]);
    feed(&collectors, 1, &[2]);

    let agg = summarize(&collectors, 4).unwrap();
    assert!(agg.exact);
    assert_eq!(sorted_values(&agg.top), [1, 2, 3]);
}

#[test]
fn test_merge_skips_offline_cpus() {
    let collectors = PerCpuCollectors::new(2, 4).unwrap();
    feed(&collectors, 0, &[5]);
    feed(&collectors, 1, &[500]);
    collectors.set_online(1, false).unwrap();

    let agg = summarize(&collectors, 4).unwrap();
    assert_eq!(agg.cpus, 1);
    assert_eq!(sorted_values(&agg.top), [5]);

    // Offline CPUs keep their samples.
    assert_eq!(collectors.with_cpu(1, sorted_values).unwrap(), [500]);
}

#[test]
fn test_merge_leaves_collectors_intact() {
    let collectors = PerCpuCollectors::new(1, 4).unwrap();
    feed(&collectors, 0, &[7, 8]);

    let _ = summarize(&collectors, 4).unwrap();
    let again = summarize(&collectors, 4).unwrap();
    assert_eq!(sorted_values(&again.top), [7, 8]);
}

#[test]
fn test_merge_out_of_memory_keeps_previous_text() {
    let collectors = PerCpuCollectors::new(1, 4).unwrap();
    feed(&collectors, 0, &[7]);

    let mut output = OutputBuffer::new();
    let mut agg = summarize(&collectors, 4).unwrap();
    output.format(&mut agg.top).unwrap();
    assert_eq!(output.as_bytes(), b"7\n");

    feed(&collectors, 0, &[9]);
    assert!(matches!(summarize(&collectors, usize::MAX), Err(Error::NoMemory)));
    assert_eq!(output.as_bytes(), b"7\n");

    // The collectors are untouched by the failed merge.
    assert_eq!(collectors.with_cpu(0, sorted_values).unwrap(), [7, 9]);
}

#[test]
fn test_topk_out_of_memory() {
    assert!(matches!(TopK::<u64>::try_new(usize::MAX / 4), Err(Error::NoMemory)));
    assert!(matches!(PerCpuCollectors::new(1, usize::MAX / 4), Err(Error::NoMemory)));
}

#[test]
fn test_reset_clears_collectors() {
    let collectors = PerCpuCollectors::new(2, 4).unwrap();
    feed(&collectors, 0, &[7]);
    collectors.record_return(9, 1);
    collectors.reset();

    assert_eq!(collectors.with_cpu(0, |c| c.len()), Some(0));
    assert_eq!(collectors.dropped(), 0);
}
