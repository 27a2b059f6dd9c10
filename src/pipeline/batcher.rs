//! Fixed-capacity batching of parsed records.

use crate::{Batch, Location};

/// Accumulates records and hands out full batches in acceptance order.
#[derive(Debug)]
pub struct Batcher {
    capacity: usize,
    buf: Batch,
}

impl Batcher {
    /// `capacity` must be at least 1 (checked by [`SessionConfig::validate`](crate::SessionConfig::validate)).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: Location) {
        self.buf.push(record);
    }

    /// Take the buffer as a batch once it holds `capacity` records.
    pub fn drain_if_full(&mut self) -> Option<Batch> {
        if self.buf.len() < self.capacity {
            return None;
        }
        Some(std::mem::replace(
            &mut self.buf,
            Vec::with_capacity(self.capacity),
        ))
    }

    /// Take whatever is left at end of stream. Never returns an empty batch.
    pub fn drain_remaining(&mut self) -> Option<Batch> {
        if self.buf.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.buf))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
