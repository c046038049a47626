//! Streaming reader that stops at a known chunk
//!
//! [`ChunkScanningReader`] passes the bytes of its inner reader through
//! unchanged while splitting them into delimiter-terminated chunks. When a
//! chunk's fingerprint (delimiter excluded) equals the target, the stream
//! ends just before that chunk: it and everything after it are never
//! returned. Feeds are newest-first, so with the last-seen row as the target
//! the reader yields exactly the rows published since the previous poll.
//!
//! Bytes of a chunk are held back until its delimiter arrives, so the caller
//! never sees a partial chunk that later turns out to be the stopping point.

use std::io::{self, Read};
use tenderwatch_common::checksum::matches_fingerprint;
use tenderwatch_common::Fingerprint;
use thiserror::Error;

const READ_BUFFER_SIZE: usize = 8 * 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Chunk delimiter must not be empty")]
    EmptyDelimiter,
}

/// Reader that ends at the first chunk matching a target fingerprint
#[derive(Debug)]
pub struct ChunkScanningReader<R> {
    inner: R,
    delimiter: Vec<u8>,
    target: Option<Fingerprint>,
    /// Bytes since the last released boundary
    pending: Vec<u8>,
    /// Position in `pending` where the next delimiter search starts
    scan_from: usize,
    /// Released bytes not yet handed to the caller
    ready: Vec<u8>,
    ready_pos: usize,
    stopped: bool,
    inner_eof: bool,
}

impl<R: Read> ChunkScanningReader<R> {
    /// Create a reader over `inner`. With `target == None` every byte is
    /// passed through.
    pub fn new(
        inner: R,
        delimiter: impl Into<Vec<u8>>,
        target: Option<Fingerprint>,
    ) -> Result<Self, ScanError> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(ScanError::EmptyDelimiter);
        }

        Ok(Self {
            inner,
            delimiter,
            target,
            pending: Vec::new(),
            scan_from: 0,
            ready: Vec::new(),
            ready_pos: 0,
            stopped: false,
            inner_eof: false,
        })
    }

    /// Whether the target chunk was found
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn target(&self) -> Option<&Fingerprint> {
        self.target.as_ref()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let n = match self.inner.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e),
        };

        if n == 0 {
            self.inner_eof = true;
            self.finish_trailing_chunk();
        } else {
            self.pending.extend_from_slice(&buf[..n]);
            self.scan_boundaries();
        }
        Ok(())
    }

    fn scan_boundaries(&mut self) {
        let Some(target) = self.target else {
            self.release(self.pending.len());
            return;
        };

        while let Some(boundary) = self.find_delimiter() {
            if matches_fingerprint(&self.pending[..boundary], &target) {
                self.stop();
                return;
            }
            self.release(boundary + self.delimiter.len());
        }

        // A delimiter may straddle this read and the next one.
        self.scan_from = self
            .pending
            .len()
            .saturating_sub(self.delimiter.len() - 1);
    }

    fn finish_trailing_chunk(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        match self.target {
            Some(target) if matches_fingerprint(&self.pending, &target) => self.stop(),
            _ => self.release(self.pending.len()),
        }
    }

    fn find_delimiter(&self) -> Option<usize> {
        self.pending[self.scan_from..]
            .windows(self.delimiter.len())
            .position(|window| window == self.delimiter.as_slice())
            .map(|offset| self.scan_from + offset)
    }

    fn release(&mut self, len: usize) {
        self.ready.extend(self.pending.drain(..len));
        self.scan_from = 0;
    }

    fn stop(&mut self) {
        tracing::debug!(withheld = self.pending.len(), "Reached last seen chunk");
        self.stopped = true;
        self.pending.clear();
        self.scan_from = 0;
    }
}

impl<R: Read> Read for ChunkScanningReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if self.ready_pos < self.ready.len() {
                let available = &self.ready[self.ready_pos..];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                self.ready_pos += n;
                if self.ready_pos == self.ready.len() {
                    self.ready.clear();
                    self.ready_pos = 0;
                }
                return Ok(n);
            }

            if self.stopped || self.inner_eof {
                return Ok(0);
            }

            if self.target.is_none() {
                return self.inner.read(buf);
            }

            self.fill()?;
        }
    }
}
