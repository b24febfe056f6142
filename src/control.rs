//! Control files exposed under `lb_profiler/`.
//!
//! - `sampling` (0666): reads `Y\n` or `N\n`; writing a boolean starts or
//!   stops a session.
//! - `samples` (0444): the merged latencies of the last session, one per
//!   line. Reading while a session runs fails with [`Error::Busy`].
//!
//! Reads follow file semantics: the caller keeps a position that advances
//! by the number of bytes returned, and a read at or past the end returns 0.

use crate::Error;
use crate::probe::Instrumentation;
use crate::profiler::Profiler;

/// Directory holding the control files.
pub const CONTROL_DIR: &str = "lb_profiler";

/// One of the two control files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFile {
    Sampling,
    Samples,
}

impl ControlFile {
    pub const ALL: [ControlFile; 2] = [ControlFile::Sampling, ControlFile::Samples];

    /// Find a control file by name.
    pub fn lookup(name: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|file| file.name() == name)
            .ok_or(Error::NotFound)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlFile::Sampling => "sampling",
            ControlFile::Samples => "samples",
        }
    }

    /// Permission bits.
    pub fn mode(&self) -> u32 {
        match self {
            ControlFile::Sampling => 0o666,
            ControlFile::Samples => 0o444,
        }
    }

    /// Read from the file at `*pos`, advancing it.
    pub fn read<I: Instrumentation>(
        &self,
        profiler: &Profiler<I>,
        pos: &mut usize,
        out: &mut [u8],
    ) -> Result<usize, Error> {
        match self {
            ControlFile::Sampling => Ok(profiler.read_sampling(pos, out)),
            ControlFile::Samples => profiler.read_samples(pos, out),
        }
    }

    /// Write `input` to the file, returning the bytes consumed.
    pub fn write<I: Instrumentation>(
        &self,
        profiler: &Profiler<I>,
        input: &[u8],
    ) -> Result<usize, Error> {
        match self {
            ControlFile::Sampling => profiler.write_sampling(input),
            ControlFile::Samples => Err(Error::PermissionDenied),
        }
    }
}

/// Parse a kernel-style boolean.
///
/// Only the leading characters matter: `1 y Y t T` and `on` are true,
/// `0 n N f F` and `off` are false.
pub fn parse_bool(input: &[u8]) -> Result<bool, Error> {
    match input {
        [b'1' | b'y' | b'Y' | b't' | b'T', ..] => Ok(true),
        [b'0' | b'n' | b'N' | b'f' | b'F', ..] => Ok(false),
        [b'o' | b'O', b'n' | b'N', ..] => Ok(true),
        [b'o' | b'O', b'f' | b'F', ..] => Ok(false),
        _ => Err(Error::InvalidInput),
    }
}

/// Copy `src[*pos..]` into `out` and advance `pos`.
pub fn simple_read(src: &[u8], pos: &mut usize, out: &mut [u8]) -> usize {
    let Some(rest) = src.get(*pos..) else {
        return 0;
    };
    let n = out.len().min(rest.len());
    out[..n].copy_from_slice(&rest[..n]);
    *pos += n;
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true() {
        let inputs: [&[u8]; 8] = [b"1", b"1\n", b"y", b"Y", b"yes", b"on", b"ON\n", b"true"];
        for input in inputs {
            assert!(parse_bool(input).unwrap(), "{:?}", input);
        }
    }

    #[test]
    fn test_parse_bool_false() {
        let inputs: [&[u8]; 8] = [b"0", b"0\n", b"n", b"N", b"no", b"off", b"Off", b"false"];
        for input in inputs {
            assert!(!parse_bool(input).unwrap(), "{:?}", input);
        }
    }

    #[test]
    fn test_parse_bool_rejects() {
        let inputs: [&[u8]; 6] = [b"", b"\n", b"2", b"o", b"ox", b"maybe"];
        for input in inputs {
            assert!(matches!(parse_bool(input), Err(Error::InvalidInput)));
        }
    }

    #[test]
    fn test_simple_read_chunks() {
        let src = b"hello";
        let mut pos = 0;
        let mut out = [0u8; 2];
        assert_eq!(simple_read(src, &mut pos, &mut out), 2);
        assert_eq!(&out, b"he");
        assert_eq!(simple_read(src, &mut pos, &mut out), 2);
        assert_eq!(simple_read(src, &mut pos, &mut out), 1);
        assert_eq!(out[0], b'o');
        assert_eq!(simple_read(src, &mut pos, &mut out), 0);
        assert_eq!(pos, 5);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(ControlFile::lookup("samples").unwrap(), ControlFile::Samples);
        assert_eq!(ControlFile::lookup("sampling").unwrap().mode(), 0o666);
        assert!(matches!(ControlFile::lookup("foo"), Err(Error::NotFound)));
    }
}
