//! Platform abstraction layer for the probe context.
//!
//! The probes need two things from the kernel: a monotonic nanosecond clock
//! and the id of the CPU they are running on. Both are routed through
//! [`PlatformOps`] so the sampler can run in user space under test.

use core::sync::atomic::{AtomicU64, Ordering};

/// Platform operations trait.
pub trait PlatformOps {
    /// Get current monotonic time in nanoseconds.
    fn time_ns() -> u64;

    /// Get the id of the calling CPU.
    fn cpu_id() -> usize;
}

// =============================================================================
// Real Implementation (kernel environment with axhal)
// =============================================================================

/// Real platform operations using axhal.
#[cfg(all(not(test), feature = "axhal"))]
pub struct RealPlatform;

#[cfg(all(not(test), feature = "axhal"))]
impl PlatformOps for RealPlatform {
    fn time_ns() -> u64 {
        axhal::time::monotonic_time().as_nanos() as u64
    }

    fn cpu_id() -> usize {
        axhal::percpu::this_cpu_id()
    }
}

// =============================================================================
// Mock Implementation (test environment or no axhal)
// =============================================================================

static MOCK_TIME_NS: AtomicU64 = AtomicU64::new(1_000_000_000);

static MOCK_CPU_ID: AtomicU64 = AtomicU64::new(0);

/// Mock platform operations backed by atomics.
#[cfg(any(test, not(feature = "axhal")))]
pub struct MockPlatform;

#[cfg(any(test, not(feature = "axhal")))]
impl PlatformOps for MockPlatform {
    fn time_ns() -> u64 {
        MOCK_TIME_NS.load(Ordering::Relaxed)
    }

    fn cpu_id() -> usize {
        MOCK_CPU_ID.load(Ordering::Relaxed) as usize
    }
}

/// Set mock time for testing.
pub fn set_mock_time(ns: u64) {
    MOCK_TIME_NS.store(ns, Ordering::Relaxed);
}

/// Advance mock time by given nanoseconds.
pub fn advance_mock_time(ns: u64) {
    MOCK_TIME_NS.fetch_add(ns, Ordering::Relaxed);
}

/// Set mock CPU ID for testing.
pub fn set_mock_cpu_id(id: usize) {
    MOCK_CPU_ID.store(id as u64, Ordering::Relaxed);
}

// =============================================================================
// Platform Type Alias
// =============================================================================

/// The active platform implementation.
///
/// In kernel environment with axhal: RealPlatform
/// In test environment or without axhal: MockPlatform
#[cfg(all(not(test), feature = "axhal"))]
pub type Platform = RealPlatform;

#[cfg(any(test, not(feature = "axhal")))]
pub type Platform = MockPlatform;

/// Get current time in nanoseconds.
#[inline]
pub fn time_ns() -> u64 {
    Platform::time_ns()
}

/// Get the calling CPU's id.
#[inline]
pub fn cpu_id() -> usize {
    Platform::cpu_id()
}
