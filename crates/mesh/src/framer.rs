//! Byte stream framer.
//!
//! Accumulates bytes read from a serial link and cuts them into raw frames.
//! The buffer is in one of two states:
//! - unaligned: offset 0 is not known to be a frame start; `resynchronize`
//!   searches for a preamble and discards noise past the flush threshold
//! - aligned: a preamble sits at offset 0 and the frame's total length is
//!   known once the header has arrived
//!
//! # Example
//!
//! ```
//! use serialmesh_mesh::frame::Frame;
//! use serialmesh_mesh::framer::StreamFramer;
//!
//! let raw = Frame::data(1, 2, b"ping".to_vec()).encode().unwrap();
//! let (head, tail) = raw.as_bytes().split_at(3);
//!
//! let mut framer = StreamFramer::new();
//! framer.append(b"noise").unwrap();
//! framer.append(head).unwrap();
//! framer.resynchronize();
//! assert!(framer.extract().is_none());
//!
//! framer.append(tail).unwrap();
//! framer.resynchronize();
//! assert_eq!(framer.extract().unwrap(), raw);
//! ```

use crate::error::{MeshError, MeshResult};
use crate::frame::{wire_len, FrameKind, RawFrame, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use tracing::debug;

/// Receive buffer capacity: room for two maximum-size frames plus slack.
pub const RECV_BUFFER_SIZE: usize = 2 * (MAX_PAYLOAD_SIZE + 16);
/// Unaligned bytes beyond this are treated as noise and dropped.
pub const FLUSH_THRESHOLD: usize = RECV_BUFFER_SIZE / 2;

/// Per-link receive accumulation buffer.
#[derive(Debug)]
pub struct StreamFramer {
    buf: Box<[u8]>,
    write_idx: usize,
    aligned: bool,
    expected: usize,
    flushed_bytes: u64,
}

impl StreamFramer {
    /// Create a framer with the default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(RECV_BUFFER_SIZE)
    }

    /// Create a framer with a custom buffer size.
    ///
    /// Capacities smaller than one maximum-size frame can never deliver
    /// long frames.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            write_idx: 0,
            aligned: false,
            expected: 0,
            flushed_bytes: 0,
        }
    }

    /// Buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes currently buffered.
    pub fn pending(&self) -> usize {
        self.write_idx
    }

    /// Bytes that can still be appended.
    pub fn headroom(&self) -> usize {
        self.buf.len() - self.write_idx
    }

    /// Whether offset 0 holds a frame start.
    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

    /// Total bytes discarded as noise so far.
    pub fn flushed_bytes(&self) -> u64 {
        self.flushed_bytes
    }

    /// Append newly read bytes at the write offset.
    ///
    /// Callers bound their reads by [`headroom`](Self::headroom); an append
    /// that does not fit is rejected untouched.
    pub fn append(&mut self, bytes: &[u8]) -> MeshResult<()> {
        if bytes.len() > self.headroom() {
            return Err(MeshError::BufferOverflow {
                pending: bytes.len(),
                headroom: self.headroom(),
            });
        }
        let end = self.write_idx + bytes.len();
        self.buf[self.write_idx..end].copy_from_slice(bytes);
        self.write_idx = end;
        Ok(())
    }

    /// Bring a preamble to offset 0, or flush the buffer if it is only noise.
    pub fn resynchronize(&mut self) {
        if self.aligned {
            return;
        }

        let found = self.buf[..self.write_idx]
            .windows(2)
            .position(|w| FrameKind::from_preamble([w[0], w[1]]).is_some());

        if let Some(offset) = found {
            if offset > 0 {
                debug!(offset, "skipping bytes before preamble");
                self.buf.copy_within(offset..self.write_idx, 0);
                self.write_idx -= offset;
            }
            self.aligned = true;
            return;
        }

        if self.write_idx >= self.buf.len() / 2 {
            debug!(bytes = self.write_idx, "flushing unrecognised bytes");
            self.flushed_bytes += self.write_idx as u64;
            self.write_idx = 0;
        }
    }

    /// Length of the complete frame at offset 0, if it has fully arrived.
    pub fn frame_ready(&mut self) -> Option<usize> {
        if !self.aligned || self.write_idx < HEADER_SIZE {
            return None;
        }
        self.expected = wire_len(self.buf[HEADER_SIZE - 1] as usize);
        (self.write_idx >= self.expected).then_some(self.expected)
    }

    /// Move the ready frame out and compact the rest to offset 0.
    pub fn extract(&mut self) -> Option<RawFrame> {
        let size = self.frame_ready()?;
        let raw = RawFrame::from_bytes(&self.buf[..size]);

        self.buf.copy_within(size..self.write_idx, 0);
        self.write_idx -= size;
        self.aligned = false;
        self.expected = 0;

        debug!(size, frame = %hex::encode(raw.as_bytes()), "complete frame received");
        Some(raw)
    }
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}
