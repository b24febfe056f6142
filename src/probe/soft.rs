//! In-memory probe pair.
//!
//! Tracks registration and arming for one entry probe and one return probe
//! and forwards simulated invocations of the target routine to
//! [`ProbeHooks`]. The dispatch path reads only atomics.

use alloc::string::String;
use core::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use spin::Mutex;

use axerrno::{AxResult, ax_err};

use super::{Instrumentation, ProbeHooks, ProbeKind};

/// State of one probe slot.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Unregistered = 0,
    /// Registered but not firing.
    Disabled = 1,
    /// Registered and firing.
    Enabled = 2,
}

impl ProbeState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ProbeState::Disabled,
            2 => ProbeState::Enabled,
            _ => ProbeState::Unregistered,
        }
    }
}

struct ProbeSlot {
    state: AtomicU8,
    hits: AtomicU64,
}

impl ProbeSlot {
    const fn new() -> Self {
        Self {
            state: AtomicU8::new(ProbeState::Unregistered as u8),
            hits: AtomicU64::new(0),
        }
    }

    fn state(&self) -> ProbeState {
        ProbeState::from_raw(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ProbeState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Entry and return probe on a single symbol.
pub struct SoftProbePair {
    symbol: Mutex<Option<String>>,
    entry: ProbeSlot,
    ret: ProbeSlot,
}

impl SoftProbePair {
    pub const fn new() -> Self {
        Self {
            symbol: Mutex::new(None),
            entry: ProbeSlot::new(),
            ret: ProbeSlot::new(),
        }
    }

    fn slot(&self, kind: ProbeKind) -> &ProbeSlot {
        match kind {
            ProbeKind::Entry => &self.entry,
            ProbeKind::Return => &self.ret,
        }
    }

    /// Current state of the `kind` probe.
    pub fn state(&self, kind: ProbeKind) -> ProbeState {
        self.slot(kind).state()
    }

    /// Times the `kind` probe fired.
    pub fn hits(&self, kind: ProbeKind) -> u64 {
        self.slot(kind).hits.load(Ordering::Relaxed)
    }

    /// Symbol the probes are registered on.
    pub fn symbol(&self) -> Option<String> {
        self.symbol.lock().clone()
    }

    /// Fire the entry probe if it is armed.
    pub fn fire_entry<H: ProbeHooks + ?Sized>(&self, hooks: &H, cpu: usize, now_ns: u64) {
        if self.entry.state() == ProbeState::Enabled {
            self.entry.hits.fetch_add(1, Ordering::Relaxed);
            hooks.on_entry(cpu, now_ns);
        }
    }

    /// Fire the return probe if it is armed.
    pub fn fire_return<H: ProbeHooks + ?Sized>(&self, hooks: &H, cpu: usize, now_ns: u64) {
        if self.ret.state() == ProbeState::Enabled {
            self.ret.hits.fetch_add(1, Ordering::Relaxed);
            hooks.on_return(cpu, now_ns);
        }
    }

    /// Simulate one call of the target on `cpu` running from `entry_ns` to
    /// `exit_ns`.
    pub fn invoke<H: ProbeHooks + ?Sized>(&self, hooks: &H, cpu: usize, entry_ns: u64, exit_ns: u64) {
        self.fire_entry(hooks, cpu, entry_ns);
        self.fire_return(hooks, cpu, exit_ns);
    }
}

impl Default for SoftProbePair {
    fn default() -> Self {
        Self::new()
    }
}

impl Instrumentation for SoftProbePair {
    fn register(&self, kind: ProbeKind, symbol: &str) -> AxResult {
        let mut registered = self.symbol.lock();
        if let Some(existing) = registered.as_deref()
            && existing != symbol
        {
            return ax_err!(AlreadyExists, "probe pair bound to another symbol");
        }
        let slot = self.slot(kind);
        if slot.state() != ProbeState::Unregistered {
            return ax_err!(AlreadyExists, "probe already registered");
        }
        *registered = Some(String::from(symbol));
        slot.set_state(ProbeState::Disabled);
        info!("{}: registered on {}", kind.label(), symbol);
        Ok(())
    }

    fn unregister(&self, kind: ProbeKind) -> AxResult {
        let slot = self.slot(kind);
        if slot.state() == ProbeState::Unregistered {
            return ax_err!(NotFound, "probe not registered");
        }
        slot.set_state(ProbeState::Unregistered);

        let mut registered = self.symbol.lock();
        if self.entry.state() == ProbeState::Unregistered
            && self.ret.state() == ProbeState::Unregistered
        {
            *registered = None;
        }
        info!("{}: unregistered", kind.label());
        Ok(())
    }

    fn enable(&self, kind: ProbeKind) -> AxResult {
        let slot = self.slot(kind);
        match slot.state() {
            ProbeState::Unregistered => ax_err!(NotFound, "probe not registered"),
            ProbeState::Enabled => Ok(()),
            ProbeState::Disabled => {
                slot.set_state(ProbeState::Enabled);
                debug!("{}: enabled", kind.label());
                Ok(())
            }
        }
    }

    fn disable(&self, kind: ProbeKind) -> AxResult {
        let slot = self.slot(kind);
        match slot.state() {
            ProbeState::Unregistered => ax_err!(NotFound, "probe not registered"),
            ProbeState::Disabled => Ok(()),
            ProbeState::Enabled => {
                slot.set_state(ProbeState::Disabled);
                debug!("{}: disabled", kind.label());
                Ok(())
            }
        }
    }
}
