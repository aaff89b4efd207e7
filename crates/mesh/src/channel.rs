//! Byte channel abstraction a link is bound to.
//!
//! The physical serial binding lives outside this crate. [`MemoryChannel`]
//! provides an in-process cable for simulations and tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

/// Non-blocking byte channel (one end of a serial link).
pub trait ByteChannel {
    /// Bytes that can be read right now.
    fn bytes_available(&self) -> usize;

    /// Read up to `buf.len()` bytes without blocking.
    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Queue `bytes` for transmission.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn bytes_available(&self) -> usize {
        (**self).bytes_available()
    }

    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_up_to(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }
}

type Wire = Arc<Mutex<VecDeque<u8>>>;

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "memory channel lock poisoned")
}

/// One end of an in-memory full-duplex cable.
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    rx: Wire,
    tx: Wire,
}

impl MemoryChannel {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let a_to_b: Wire = Arc::default();
        let b_to_a: Wire = Arc::default();
        (
            Self {
                rx: b_to_a.clone(),
                tx: a_to_b.clone(),
            },
            Self {
                rx: a_to_b,
                tx: b_to_a,
            },
        )
    }

    /// Inject bytes as if the far end had written them.
    pub fn inject(&self, bytes: &[u8]) -> io::Result<()> {
        self.rx.lock().map_err(|_| poisoned())?.extend(bytes);
        Ok(())
    }

    /// Take every byte written by this end that the far end has not read.
    pub fn drain_outbound(&self) -> io::Result<Vec<u8>> {
        Ok(self.tx.lock().map_err(|_| poisoned())?.drain(..).collect())
    }
}

impl ByteChannel for MemoryChannel {
    fn bytes_available(&self) -> usize {
        self.rx.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut rx = self.rx.lock().map_err(|_| poisoned())?;
        let n = buf.len().min(rx.len());
        for (slot, byte) in buf.iter_mut().zip(rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.tx.lock().map_err(|_| poisoned())?.extend(bytes);
        Ok(())
    }
}
