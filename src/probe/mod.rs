//! Instrumentation seam for the probed routine.
//!
//! The profiler does not patch code itself. It drives an [`Instrumentation`]
//! backend holding one entry probe and one return probe on the target
//! symbol, and the backend calls back into [`ProbeHooks`] on the CPU that
//! hit the probe.
//!
//! - [`soft`]: in-memory probe pair that dispatches invocations to the hooks
//!   only while the matching probe is enabled.

use axerrno::AxResult;

pub mod soft;

pub use soft::SoftProbePair;

/// Routine sampled by the profiler.
pub const LOAD_BALANCE_FN_NAME: &str = "load_balance";

/// The two probes placed on the target.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Function entry
    Entry = 0,
    /// Function return
    Return = 1,
}

impl ProbeKind {
    /// Whether this is a return probe.
    pub fn is_return_probe(&self) -> bool {
        matches!(self, ProbeKind::Return)
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeKind::Entry => "kprobe",
            ProbeKind::Return => "kretprobe",
        }
    }
}

/// Probe backend, driven from the control plane only.
///
/// Probes are registered disabled; `enable`/`disable` arm and disarm them
/// without releasing the registration.
pub trait Instrumentation {
    /// Register a disabled probe of `kind` on `symbol`.
    fn register(&self, kind: ProbeKind, symbol: &str) -> AxResult;

    /// Drop the registration of `kind`, disarming it first if needed.
    fn unregister(&self, kind: ProbeKind) -> AxResult;

    /// Arm the probe; callbacks start firing.
    fn enable(&self, kind: ProbeKind) -> AxResult;

    /// Disarm the probe; no callback fires once this returns.
    fn disable(&self, kind: ProbeKind) -> AxResult;
}

/// Callbacks invoked from probe context.
///
/// Both run on the CPU identified by `cpu`, synchronously inside the probed
/// call, and must neither block nor allocate.
pub trait ProbeHooks {
    fn on_entry(&self, cpu: usize, now_ns: u64);

    fn on_return(&self, cpu: usize, now_ns: u64);
}

impl<T: Instrumentation + ?Sized> Instrumentation for &T {
    fn register(&self, kind: ProbeKind, symbol: &str) -> AxResult {
        (**self).register(kind, symbol)
    }

    fn unregister(&self, kind: ProbeKind) -> AxResult {
        (**self).unregister(kind)
    }

    fn enable(&self, kind: ProbeKind) -> AxResult {
        (**self).enable(kind)
    }

    fn disable(&self, kind: ProbeKind) -> AxResult {
        (**self).disable(kind)
    }
}
