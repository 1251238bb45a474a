#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::io::{self, Write};

use anyhow::{ensure, Result};

use crate::adler32::Adler32;

////////////////////////////////////////////////////////////////////////////////

/// Size of the deflate sliding window.
pub const WINDOW_SIZE: usize = 32768;

/// Output sink for the inflater: remembers the last `WINDOW_SIZE` bytes for
/// back-references and keeps the Adler-32 of everything written so far.
pub struct HistoryWriter<T> {
    inner: T,
    window: VecDeque<u8>,
    byte_count: u64,
    digest: Adler32,
}

impl<T: Write> Write for HistoryWriter<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written_len = self.inner.write(buf)?;
        let written = &buf[..written_len];
        self.digest.update(written);

        if written_len >= WINDOW_SIZE {
            self.window.clear();
            self.window.extend(&written[written_len - WINDOW_SIZE..]);
        } else {
            let overflow = (self.window.len() + written_len).saturating_sub(WINDOW_SIZE);
            self.window.drain(..overflow);
            self.window.extend(written);
        }
        self.byte_count += written_len as u64;
        Ok(written_len)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<T: Write> HistoryWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            window: VecDeque::with_capacity(WINDOW_SIZE),
            byte_count: 0,
            digest: Adler32::new(),
        }
    }

    /// Write a sequence of `len` bytes written `dist` bytes ago.
    pub fn write_previous(&mut self, dist: usize, len: usize) -> Result<()> {
        ensure!(dist != 0, "zero back-reference distance");
        ensure!(
            dist <= self.window.len(),
            "back-reference distance {} exceeds {} bytes of history",
            dist,
            self.window.len()
        );

        let start = self.window.len() - dist;
        let mut chunk = Vec::with_capacity(len);
        chunk.extend(self.window.range(start..).take(len.min(dist)));
        while chunk.len() < len {
            let missing = (len - chunk.len()).min(dist);
            chunk.extend_from_within(..missing);
        }

        self.write_all(&chunk)?;
        Ok(())
    }

    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    pub fn adler32(&self) -> u32 {
        self.digest.finalize()
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

////////////////////////////////////////////////////////////////////////////////
