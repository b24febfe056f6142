//! Error type shared by the profiler modules.

use alloc::string::String;

use axerrno::AxError;

/// Error types for profiler operations.
#[derive(Debug)]
pub enum Error {
    /// Allocation failed while building collectors, merging, or growing
    /// the output buffer.
    NoMemory,
    /// Samples were read while a sampling session is running.
    Busy,
    /// Malformed input (toggle value, CPU id, CPU count).
    InvalidInput,
    /// Write to a read-only control file.
    PermissionDenied,
    /// Unknown control file.
    NotFound,
    /// The instrumentation backend refused to register a probe.
    Probe(AxError),
    /// A line of sample output is not a decimal `u64`.
    Parse(String),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoMemory => write!(f, "Out of memory"),
            Self::Busy => write!(f, "Sampling in progress"),
            Self::InvalidInput => write!(f, "Invalid argument"),
            Self::PermissionDenied => write!(f, "Permission denied"),
            Self::NotFound => write!(f, "No such control file"),
            Self::Probe(err) => write!(f, "Probe registration failed: {:?}", err),
            Self::Parse(line) => write!(f, "Invalid sample line: {:?}", line),
        }
    }
}

impl core::error::Error for Error {}
