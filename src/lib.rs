//! Load-balance latency profiler.
//!
//! Samples the latency of every call to the scheduler's `load_balance`
//! routine from an entry/return probe pair and keeps only the slowest calls:
//! each CPU retains its [`NUM_SAMPLES`] largest latencies in a fixed-size
//! min-heap, and stopping a session merges the CPUs into one approximate
//! global top-K rendered as text.
//!
//! # Features
//!
//! - `axhal` - read time and CPU id from axhal instead of the mock platform
//!
//! # Quick Start
//!
//! ```ignore
//! use lbprof::{Profiler, ProfilerConfig, SoftProbePair};
//!
//! let probes = SoftProbePair::new();
//! let profiler = Profiler::new(ProfilerConfig::new(4), &probes)?;
//!
//! profiler.write_sampling(b"1\n")?;
//! // probes fire: profiler.on_entry(cpu, t0); profiler.on_return(cpu, t1);
//! profiler.write_sampling(b"0\n")?;
//!
//! let mut pos = 0;
//! let mut buf = [0u8; 4096];
//! let n = profiler.read_samples(&mut pos, &mut buf)?;
//! ```

#![no_std]

extern crate alloc;

#[macro_use]
extern crate log;

// =============================================================================
// Platform Abstraction (for testing support)
// =============================================================================

pub mod platform;

// =============================================================================
// Sampling Core
// =============================================================================

pub mod aggregate;
pub mod collector;
pub mod error;
pub mod heap;
pub mod output;

// =============================================================================
// Instrumentation and Control
// =============================================================================

pub mod control;
pub mod probe;
pub mod profiler;
pub mod report;

pub use aggregate::{Aggregate, summarize};
pub use collector::{NUM_SAMPLES, PerCpuCollectors, TopK};
pub use control::{CONTROL_DIR, ControlFile};
pub use error::Error;
pub use output::OutputBuffer;
pub use probe::{Instrumentation, LOAD_BALANCE_FN_NAME, ProbeHooks, ProbeKind, SoftProbePair};
pub use profiler::{Profiler, ProfilerConfig, SamplingState};
pub use report::{SamplesSummary, parse_samples};
