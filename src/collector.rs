//! Per-CPU top-K latency collectors.
//!
//! Each CPU owns one slot: the entry timestamp written by the entry
//! probe and a [`TopK`] fed by the return probe. Nothing here allocates after
//! [`PerCpuCollectors::new`] returns.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::Error;
use crate::heap::MinHeap;

/// Number of samples retained per CPU and in the merged result.
pub const NUM_SAMPLES: usize = 1000;

/// Bounded structure retaining the largest values it has been offered.
#[derive(Debug, Clone)]
pub struct TopK<T> {
    heap: MinHeap<T>,
    observed: u64,
}

impl<T: Ord + Copy> TopK<T> {
    /// Create an empty collector with pre-allocated room for `capacity`
    /// values.
    pub fn try_new(capacity: usize) -> Result<Self, Error> {
        let heap = MinHeap::try_with_capacity(capacity).map_err(|_| Error::NoMemory)?;
        Ok(Self { heap, observed: 0 })
    }

    /// Offer a sample.
    ///
    /// Below capacity the value is always kept. Once full, it replaces the
    /// current minimum only when strictly greater, so an equal value loses to
    /// the earlier arrival. Returns whether the value was retained.
    pub fn add_sample(&mut self, value: T) -> bool {
        self.observed = self.observed.wrapping_add(1);
        match self.heap.push(value) {
            Ok(()) => true,
            Err(value) => match self.heap.peek_min() {
                Some(&min) if value > min => {
                    self.heap.replace_min(value);
                    true
                }
                _ => false,
            },
        }
    }

    /// Number of retained values.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.heap.capacity()
    }

    /// Weakest retained value.
    #[inline]
    pub fn min(&self) -> Option<T> {
        self.heap.peek_min().copied()
    }

    /// Number of samples ever offered, retained or not.
    #[inline]
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Whether every offered sample is still retained.
    #[inline]
    pub fn is_lossless(&self) -> bool {
        self.observed == self.heap.len() as u64
    }

    /// Retained values in heap order.
    #[inline]
    pub fn values(&self) -> &[T] {
        self.heap.as_slice()
    }

    /// Remove and return the smallest retained value.
    #[inline]
    pub fn pop_min(&mut self) -> Option<T> {
        self.heap.pop_min()
    }

    /// Drain the retained values in ascending order.
    pub fn drain_ascending(&mut self) -> DrainAscending<'_, T> {
        DrainAscending { topk: self }
    }

    /// Forget every retained value and the observed count.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.observed = 0;
    }
}

/// Iterator returned by [`TopK::drain_ascending`].
pub struct DrainAscending<'a, T> {
    topk: &'a mut TopK<T>,
}

impl<T: Ord + Copy> Iterator for DrainAscending<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.topk.pop_min()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.topk.len();
        (len, Some(len))
    }
}

/// State owned by one CPU.
struct CpuSlot {
    /// Entry time of the most recent probed call on this CPU.
    timestamp: AtomicU64,
    /// Only ever locked with `try_lock` from probe context.
    samples: Mutex<TopK<u64>>,
    online: AtomicBool,
}

impl CpuSlot {
    fn try_new(capacity: usize) -> Result<Self, Error> {
        Ok(Self {
            timestamp: AtomicU64::new(0),
            samples: Mutex::new(TopK::try_new(capacity)?),
            online: AtomicBool::new(true),
        })
    }
}

/// Sharded collectors, one slot per CPU id.
pub struct PerCpuCollectors {
    slots: Vec<CpuSlot>,
    dropped: AtomicU64,
}

impl PerCpuCollectors {
    /// Allocate `nr_cpus` slots of `capacity` samples each.
    pub fn new(nr_cpus: usize, capacity: usize) -> Result<Self, Error> {
        if nr_cpus == 0 {
            return Err(Error::InvalidInput);
        }
        let mut slots = Vec::new();
        slots.try_reserve_exact(nr_cpus).map_err(|_| Error::NoMemory)?;
        for _ in 0..nr_cpus {
            slots.push(CpuSlot::try_new(capacity)?);
        }
        Ok(Self {
            slots,
            dropped: AtomicU64::new(0),
        })
    }

    /// Number of CPU slots.
    pub fn nr_cpus(&self) -> usize {
        self.slots.len()
    }

    /// Record an entry timestamp for `cpu`.
    ///
    /// Overwrites unconditionally; a nested call on the same CPU clobbers the
    /// outer call's start time.
    #[inline]
    pub fn record_entry(&self, cpu: usize, now_ns: u64) {
        if let Some(slot) = self.slots.get(cpu) {
            slot.timestamp.store(now_ns, Ordering::Relaxed);
        }
    }

    /// Record a return on `cpu`, feeding `now_ns - entry` to its collector.
    ///
    /// Never blocks or logs: if the slot is held elsewhere the sample is
    /// counted as dropped. Returns whether the latency was retained.
    pub fn record_return(&self, cpu: usize, now_ns: u64) -> bool {
        let Some(slot) = self.slots.get(cpu) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        let latency = now_ns.saturating_sub(slot.timestamp.load(Ordering::Relaxed));
        match slot.samples.try_lock() {
            Some(mut samples) => samples.add_sample(latency),
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Samples that could not be recorded.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Mark `cpu` online or offline. Offline CPUs keep their samples but are
    /// skipped when merging.
    pub fn set_online(&self, cpu: usize, online: bool) -> Result<(), Error> {
        let slot = self.slots.get(cpu).ok_or(Error::InvalidInput)?;
        slot.online.store(online, Ordering::Relaxed);
        Ok(())
    }

    pub fn is_online(&self, cpu: usize) -> bool {
        self.slots
            .get(cpu)
            .is_some_and(|slot| slot.online.load(Ordering::Relaxed))
    }

    /// Run `f` on every online CPU's collector, in CPU id order.
    ///
    /// Takes each slot lock in turn; callers must have stopped the probes
    /// first.
    pub fn for_each_online<F>(&self, mut f: F)
    where
        F: FnMut(usize, &TopK<u64>),
    {
        for (cpu, slot) in self.slots.iter().enumerate() {
            if slot.online.load(Ordering::Relaxed) {
                f(cpu, &*slot.samples.lock());
            }
        }
    }

    /// Run `f` on one CPU's collector regardless of its online state.
    pub fn with_cpu<R>(&self, cpu: usize, f: impl FnOnce(&TopK<u64>) -> R) -> Option<R> {
        self.slots.get(cpu).map(|slot| f(&*slot.samples.lock()))
    }

    /// Clear every collector and the dropped counter.
    pub fn reset(&self) {
        for slot in &self.slots {
            slot.samples.lock().clear();
            slot.timestamp.store(0, Ordering::Relaxed);
        }
        self.dropped.store(0, Ordering::Relaxed);
    }
}
