//! Bounded frame queues.
//!
//! Both queues sit on a fixed slot array that never grows. A slot is occupied
//! iff it holds an item, and `pending` always equals the number of occupied
//! slots, so a scan for a free (or occupied) slot is guaranteed to succeed
//! whenever the counter says one exists.
//!
//! Ingress consumption is strict FIFO. Egress transmission scans forward from
//! the last transmitted slot, which tolerates slots being freed out of
//! enqueue order.

use crate::error::{MeshError, MeshResult};
use tracing::warn;

#[derive(Debug)]
struct Slots<T> {
    slots: Box<[Option<T>]>,
    pending: usize,
}

impl<T> Slots<T> {
    fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            pending: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Store `item` in the first free slot at or after `start`, wrapping.
    fn insert_from(&mut self, start: usize, item: T, queue: &'static str) -> MeshResult<usize> {
        if self.pending == self.capacity() {
            warn!(queue, capacity = self.capacity(), "queue full, dropping frame");
            drop(item);
            return Err(MeshError::QueueFull {
                queue,
                capacity: self.capacity(),
            });
        }

        let cap = self.capacity();
        let Some(idx) = (0..cap)
            .map(|step| (start + step) % cap)
            .find(|&i| self.slots[i].is_none())
        else {
            return Err(MeshError::QueueFull { queue, capacity: cap });
        };

        self.slots[idx] = Some(item);
        self.pending += 1;
        Ok(idx)
    }

    /// Take the item in the first occupied slot at or after `start`, wrapping.
    fn take_from(&mut self, start: usize) -> Option<(usize, T)> {
        if self.pending == 0 {
            return None;
        }

        let cap = self.capacity();
        let idx = (0..cap)
            .map(|step| (start + step) % cap)
            .find(|&i| self.slots[i].is_some())?;

        let item = self.slots[idx].take()?;
        self.pending -= 1;
        Some((idx, item))
    }

    fn clear(&mut self) -> usize {
        let dropped = self.pending;
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.pending = 0;
        dropped
    }
}

/// Receive-side queue consumed by the application in arrival order.
#[derive(Debug)]
pub struct IngressQueue<T> {
    inner: Slots<T>,
    head: usize,
}

impl<T> IngressQueue<T> {
    /// Create a queue with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Slots::new(capacity),
            head: 0,
        }
    }

    /// Store an item, returning its slot. A full queue drops the item.
    pub fn enqueue(&mut self, item: T) -> MeshResult<usize> {
        self.inner.insert_from(self.head, item, "ingress")
    }

    /// Pop the oldest item.
    pub fn pop(&mut self) -> Option<T> {
        if self.inner.pending == 0 {
            return None;
        }
        let item = self.inner.slots[self.head].take()?;
        self.inner.pending -= 1;
        self.head = (self.head + 1) % self.inner.capacity();
        Some(item)
    }

    /// Items waiting.
    pub fn len(&self) -> usize {
        self.inner.pending
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.pending == 0
    }

    /// Slot count.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Drop every waiting item, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        self.head = 0;
        self.inner.clear()
    }
}

/// Transmit-side queue drained one slot per scheduling round.
#[derive(Debug)]
pub struct EgressQueue<T> {
    inner: Slots<T>,
    last_sent: usize,
}

impl<T> EgressQueue<T> {
    /// Create a queue with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Slots::new(capacity),
            last_sent: capacity.saturating_sub(1),
        }
    }

    fn next_index(&self) -> usize {
        (self.last_sent + 1) % self.inner.capacity()
    }

    /// Store an item for transmission. A full queue drops the item.
    pub fn enqueue(&mut self, item: T) -> MeshResult<usize> {
        let start = self.next_index();
        self.inner.insert_from(start, item, "egress")
    }

    /// Move out the next item to transmit and make its slot the new scan origin.
    pub fn take_next(&mut self) -> Option<T> {
        let start = self.next_index();
        let (idx, item) = self.inner.take_from(start)?;
        self.last_sent = idx;
        Some(item)
    }

    /// Items waiting.
    pub fn len(&self) -> usize {
        self.inner.pending
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.pending == 0
    }

    /// Slot count.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Drop every waiting item, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        self.inner.clear()
    }
}
