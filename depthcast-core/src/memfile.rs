//! In-memory file handle for encoded frames.
//!
//! The encoder writes into a [`MemFile`]; once complete the file is
//! frozen into a [`MemReader`] that the upload consumes sequentially.
//! Both views share one allocation: freezing hands the buffer over
//! without copying, and the buffer is released when the reader drops.

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::DepthcastError;

// ── MemFile (write side) ─────────────────────────────────────────

/// Growable write-only buffer.
#[derive(Debug, Default)]
pub struct MemFile {
    buf: Vec<u8>,
}

impl MemFile {
    /// Reserve room for exactly `size` bytes up front.
    ///
    /// Allocation failure is reported instead of aborting the process.
    pub fn with_capacity(size: usize) -> Result<Self, DepthcastError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| DepthcastError::Allocation { size })?;
        Ok(Self { buf })
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Contents written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Finish writing and reopen the same buffer for reading.
    pub fn into_reader(self) -> MemReader {
        MemReader::new(Bytes::from(self.buf))
    }
}

impl Write for MemFile {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── MemReader (read side) ────────────────────────────────────────

/// Rewindable sequential reader over a frozen buffer.
///
/// Implements both [`std::io::Read`] and [`tokio::io::AsyncRead`] so it
/// can feed blocking or async consumers alike.
#[derive(Debug, Clone)]
pub struct MemReader {
    cursor: Cursor<Bytes>,
}

impl MemReader {
    pub fn new(bytes: Bytes) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.cursor.position())
    }

    /// Current read offset.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Move back to the start of the buffer.
    pub fn rewind(&mut self) {
        self.cursor.set_position(0);
    }

    /// The whole underlying buffer, independent of the read offset.
    pub fn bytes(&self) -> &Bytes {
        self.cursor.get_ref()
    }
}

impl Read for MemReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(out)
    }
}

impl Seek for MemReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl AsyncRead for MemReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.cursor).poll_read(cx, buf)
    }
}

// ── Tests ────────────────────────────────────────────────────────
