//! Text output for the `samples` endpoint.
//!
//! Format: one decimal latency per line, ascending, each line ending in
//! `\n`. The buffer is allocated on first use, sized from the number of
//! values, and doubles whenever a line does not fit. It never shrinks.

use alloc::vec::Vec;
use core::fmt::{self, Write};

use crate::Error;
use crate::collector::TopK;
use crate::control::simple_read;

/// Growable text buffer shared by every sampling session.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    /// Valid content is `data[..data.len()]`.
    data: Vec<u8>,
    /// Logical buffer size; one byte is always kept back for a terminator.
    size: usize,
    growths: u32,
}

impl OutputBuffer {
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            size: 0,
            growths: 0,
        }
    }

    /// Bytes of valid content.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current buffer size in bytes, zero before the first format.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// How many times the buffer has doubled.
    #[inline]
    pub fn growths(&self) -> u32 {
        self.growths
    }

    /// Valid content.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Drain `result` into the buffer in ascending order.
    ///
    /// Content is reset before the first value is written, so a failure
    /// part way leaves a truncated buffer rather than the previous session's
    /// text.
    pub fn format(&mut self, result: &mut TopK<u64>) -> Result<(), Error> {
        if self.size == 0 {
            self.allocate(2 * size_of::<u64>() * result.len() + 1)?;
        }

        self.data.clear();
        for value in result.drain_ascending() {
            writeln!(self, "{}", value).map_err(|_| Error::NoMemory)?;
        }

        debug!(
            "formatted {} bytes (buffer size {}, {} growths)",
            self.data.len(),
            self.size,
            self.growths
        );
        Ok(())
    }

    /// Copy content starting at `offset` into `out`.
    ///
    /// Returns the number of bytes copied, zero once `offset` reaches the end.
    pub fn read_at(&self, mut offset: usize, out: &mut [u8]) -> usize {
        simple_read(&self.data, &mut offset, out)
    }

    fn allocate(&mut self, size: usize) -> Result<(), Error> {
        self.data
            .try_reserve_exact(size)
            .map_err(|_| Error::NoMemory)?;
        self.size = size;
        Ok(())
    }

    fn grow(&mut self) -> Result<(), Error> {
        let new_size = self.size.checked_mul(2).ok_or(Error::NoMemory)?;
        // `try_reserve_exact` counts from `len`, not from the current size.
        self.data
            .try_reserve_exact(new_size - self.data.len())
            .map_err(|_| Error::NoMemory)?;
        self.size = new_size;
        self.growths += 1;
        debug!("output buffer grown to {} bytes", new_size);
        Ok(())
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        while self.data.len() + bytes.len() >= self.size {
            self.grow()?;
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }
}

impl Write for OutputBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s.as_bytes()).map_err(|_| fmt::Error)
    }
}
