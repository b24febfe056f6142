//! Sampling session control.
//!
//! [`Profiler`] owns all profiler state: the per-CPU collectors, the output
//! buffer, the sampling flag, and the instrumentation backend. It has two
//! states:
//!
//! - **Idle**: probes disarmed, `samples` readable.
//! - **Sampling**: probes armed, collectors fed, `samples` busy.
//!
//! Starting arms the entry probe, then the return probe. Stopping disarms
//! them in the reverse order, so no entry is recorded without its return,
//! then merges the collectors and formats the result before returning.
//! Collectors are not cleared between sessions; their contents accumulate
//! until [`Profiler::reset_samples`] is called.
//!
//! # Known limitation
//!
//! There is one entry timestamp per CPU. If the probed routine nests on a
//! CPU, the inner entry overwrites the outer one and the outer latency is
//! measured from the wrong start.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::Error;
use crate::aggregate::{self, Aggregate};
use crate::collector::{NUM_SAMPLES, PerCpuCollectors};
use crate::control::{parse_bool, simple_read};
use crate::output::OutputBuffer;
use crate::platform;
use crate::probe::{Instrumentation, LOAD_BALANCE_FN_NAME, ProbeHooks, ProbeKind};

/// Profiler configuration.
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// Symbol the probes are placed on.
    pub target: &'static str,
    /// Number of CPU slots; CPU ids must be below this.
    pub nr_cpus: usize,
}

impl ProfilerConfig {
    /// Configuration probing `load_balance` on `nr_cpus` CPUs.
    pub const fn new(nr_cpus: usize) -> Self {
        Self {
            target: LOAD_BALANCE_FN_NAME,
            nr_cpus,
        }
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingState {
    Idle,
    Sampling,
}

/// Load-balance latency profiler.
pub struct Profiler<I: Instrumentation> {
    config: ProfilerConfig,
    probes: I,
    collectors: PerCpuCollectors,
    output: Mutex<OutputBuffer>,
    /// Written by `set_sampling` under `control`, and cleared on teardown.
    sampling: AtomicBool,
    /// Serializes toggle writers.
    control: Mutex<()>,
    sessions: AtomicU64,
}

impl<I: Instrumentation> Profiler<I> {
    /// Allocate the collectors and register both probes, disarmed.
    ///
    /// If the return probe cannot be registered the entry probe is
    /// unregistered again before failing.
    pub fn new(config: ProfilerConfig, probes: I) -> Result<Self, Error> {
        let collectors = PerCpuCollectors::new(config.nr_cpus, NUM_SAMPLES)?;

        probes
            .register(ProbeKind::Entry, config.target)
            .map_err(Error::Probe)?;
        if let Err(err) = probes.register(ProbeKind::Return, config.target) {
            if let Err(unreg) = probes.unregister(ProbeKind::Entry) {
                error!("unregister {} failed: {:?}", ProbeKind::Entry.label(), unreg);
            }
            return Err(Error::Probe(err));
        }

        info!(
            "lbprof: probing {} on {} cpus, keeping {} samples per cpu",
            config.target, config.nr_cpus, NUM_SAMPLES
        );

        Ok(Self {
            config,
            probes,
            collectors,
            output: Mutex::new(OutputBuffer::new()),
            sampling: AtomicBool::new(false),
            control: Mutex::new(()),
            sessions: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// The instrumentation backend.
    pub fn instrumentation(&self) -> &I {
        &self.probes
    }

    /// The per-CPU collectors.
    pub fn collectors(&self) -> &PerCpuCollectors {
        &self.collectors
    }

    pub fn state(&self) -> SamplingState {
        if self.is_sampling() {
            SamplingState::Sampling
        } else {
            SamplingState::Idle
        }
    }

    #[inline]
    pub fn is_sampling(&self) -> bool {
        self.sampling.load(Ordering::Acquire)
    }

    /// Completed sampling sessions.
    pub fn sessions(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }

    /// Start or stop a session.
    ///
    /// Probe and merge failures are logged, never returned: the state always
    /// follows `enable`. Requesting the current state does nothing.
    pub fn set_sampling(&self, enable: bool) {
        let _control = self.control.lock();

        if enable == self.is_sampling() {
            debug!(
                "sampling already {}",
                if enable { "enabled" } else { "disabled" }
            );
            return;
        }

        if enable {
            self.start();
        } else {
            self.stop();
        }
    }

    fn start(&self) {
        self.sampling.store(true, Ordering::Release);
        for kind in [ProbeKind::Entry, ProbeKind::Return] {
            if let Err(err) = self.probes.enable(kind) {
                error!("enable {} failed: {:?}", kind.label(), err);
            }
        }
        info!("sampling started on {}", self.config.target);
    }

    fn stop(&self) {
        // Readers wait here instead of seeing a half-written buffer.
        let mut output = self.output.lock();

        for kind in [ProbeKind::Return, ProbeKind::Entry] {
            if let Err(err) = self.probes.disable(kind) {
                error!("disable {} failed: {:?}", kind.label(), err);
            }
        }

        match aggregate::summarize(&self.collectors, NUM_SAMPLES) {
            Ok(Aggregate {
                mut top,
                observed,
                cpus,
                exact,
            }) => {
                let kept = top.len();
                match output.format(&mut top) {
                    Ok(()) => info!(
                        "sampling stopped: kept {} of {} samples from {} cpus{}",
                        kept,
                        observed,
                        cpus,
                        if exact { "" } else { " (approximate)" }
                    ),
                    Err(err) => error!("formatting samples failed: {}", err),
                }
            }
            Err(err) => error!("summarizing samples failed: {}", err),
        }

        let dropped = self.collectors.dropped();
        if dropped > 0 {
            warn!("{} samples dropped: unknown cpu or busy slot", dropped);
        }

        self.sessions.fetch_add(1, Ordering::Relaxed);
        self.sampling.store(false, Ordering::Release);
    }

    /// Handle a write to the `sampling` file.
    pub fn write_sampling(&self, input: &[u8]) -> Result<usize, Error> {
        let enable = parse_bool(input)?;
        self.set_sampling(enable);
        Ok(input.len())
    }

    /// Handle a read of the `sampling` file: `Y\n` or `N\n`.
    pub fn read_sampling(&self, pos: &mut usize, out: &mut [u8]) -> usize {
        let text: &[u8] = if self.is_sampling() { b"Y\n" } else { b"N\n" };
        simple_read(text, pos, out)
    }

    /// Handle a read of the `samples` file.
    ///
    /// Fails with [`Error::Busy`] while sampling, whatever the buffer holds.
    pub fn read_samples(&self, pos: &mut usize, out: &mut [u8]) -> Result<usize, Error> {
        if self.is_sampling() {
            return Err(Error::Busy);
        }
        let output = self.output.lock();
        Ok(simple_read(output.as_bytes(), pos, out))
    }

    /// Run `f` with the output buffer.
    pub fn with_output<R>(&self, f: impl FnOnce(&OutputBuffer) -> R) -> R {
        f(&*self.output.lock())
    }

    /// Clear every collector. Only allowed while idle.
    pub fn reset_samples(&self) -> Result<(), Error> {
        let _control = self.control.lock();
        if self.is_sampling() {
            return Err(Error::Busy);
        }
        self.collectors.reset();
        info!("samples reset");
        Ok(())
    }

    /// Mark a CPU online or offline for merging.
    pub fn set_cpu_online(&self, cpu: usize, online: bool) -> Result<(), Error> {
        self.collectors.set_online(cpu, online)
    }

    /// Samples lost to an unknown CPU id or a busy slot.
    pub fn dropped_samples(&self) -> u64 {
        self.collectors.dropped()
    }

    /// Entry probe handler: stamp `now_ns` for `cpu`.
    #[inline]
    pub fn record_entry(&self, cpu: usize, now_ns: u64) {
        self.collectors.record_entry(cpu, now_ns);
    }

    /// Return probe handler: record the latency since `cpu`'s last entry.
    #[inline]
    pub fn record_return(&self, cpu: usize, now_ns: u64) -> bool {
        self.collectors.record_return(cpu, now_ns)
    }

    /// Entry probe handler for real probes, reading the platform clock.
    #[inline]
    pub fn probe_entry(&self) {
        self.record_entry(platform::cpu_id(), platform::time_ns());
    }

    /// Return probe handler for real probes, reading the platform clock.
    #[inline]
    pub fn probe_return(&self) {
        self.record_return(platform::cpu_id(), platform::time_ns());
    }

    /// Tear the profiler down: disarm the probes if a session is running,
    /// then unregister both. Dropping does the same; this names the point
    /// where the probes go away. No samples are merged.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl<I: Instrumentation> ProbeHooks for Profiler<I> {
    #[inline]
    fn on_entry(&self, cpu: usize, now_ns: u64) {
        self.record_entry(cpu, now_ns);
    }

    #[inline]
    fn on_return(&self, cpu: usize, now_ns: u64) {
        self.record_return(cpu, now_ns);
    }
}

impl<I: Instrumentation> Drop for Profiler<I> {
    fn drop(&mut self) {
        if self.is_sampling() {
            for kind in [ProbeKind::Return, ProbeKind::Entry] {
                if let Err(err) = self.probes.disable(kind) {
                    error!("disable {} failed: {:?}", kind.label(), err);
                }
            }
            self.sampling.store(false, Ordering::Release);
        }
        for kind in [ProbeKind::Return, ProbeKind::Entry] {
            if let Err(err) = self.probes.unregister(kind) {
                error!("unregister {} failed: {:?}", kind.label(), err);
            }
        }
        info!("lbprof: probes on {} removed", self.config.target);
    }
}
