//! Producer side of a session: lines → header / records → batches → bounded queue.

use crossbeam_channel::{Receiver, Sender, select};
use log::{debug, warn};
use std::sync::Arc;

use crate::Batch;
use crate::error::SessionError;

use super::batcher::Batcher;
use super::error_handler::ErrorLatch;
use super::header::ColumnMapping;
use super::parser::parse_row;

/// Whether the producer should keep reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Owns the per-session mapping and batcher, and the only sender of the batch queue.
pub struct Producer {
    mapping: Option<ColumnMapping>,
    batcher: Batcher,
    batch_tx: Sender<Batch>,
    latch: Arc<ErrorLatch>,
    cancelled: Receiver<()>,
    pub lines_seen: usize,
    pub rows_skipped: usize,
    pub batches_enqueued: usize,
}

impl Producer {
    pub fn new(batch_size: usize, batch_tx: Sender<Batch>, latch: Arc<ErrorLatch>) -> Self {
        let cancelled = latch.cancelled();
        Self {
            mapping: None,
            batcher: Batcher::new(batch_size),
            batch_tx,
            latch,
            cancelled,
            lines_seen: 0,
            rows_skipped: 0,
            batches_enqueued: 0,
        }
    }

    pub fn has_header(&self) -> bool {
        self.mapping.is_some()
    }

    /// Handle one non-empty logical line. The first one is the header.
    pub fn accept_line(&mut self, line: &str) -> Flow {
        self.lines_seen += 1;
        match self.mapping.as_ref().map(|m| parse_row(line, m)) {
            None => return self.accept_header(line),
            Some(Ok(record)) => self.batcher.push(record),
            Some(Err(e)) => {
                self.rows_skipped += 1;
                warn!("skipping line {}: {}", self.lines_seen, e);
                return Flow::Continue;
            }
        }
        match self.batcher.drain_if_full() {
            Some(batch) => self.enqueue(batch),
            None => Flow::Continue,
        }
    }

    fn accept_header(&mut self, line: &str) -> Flow {
        match ColumnMapping::resolve(line) {
            Ok(mapping) => {
                debug!("header resolved: {} columns", mapping.column_count());
                self.mapping = Some(mapping);
                Flow::Continue
            }
            Err(e) => {
                self.latch.record(e);
                Flow::Stop
            }
        }
    }

    /// Enqueue a batch, blocking while the queue is full. Gives up when the session is cancelled.
    fn enqueue(&mut self, batch: Batch) -> Flow {
        if self.latch.is_tripped() {
            return Flow::Stop;
        }
        let rows = batch.len();
        select! {
            send(self.batch_tx, batch) -> res => match res {
                Ok(()) => {
                    self.batches_enqueued += 1;
                    debug!("enqueued batch {} ({} rows)", self.batches_enqueued, rows);
                    Flow::Continue
                }
                // Every worker is gone; the latch says why.
                Err(_) => Flow::Stop,
            },
            recv(self.cancelled) -> _ => Flow::Stop,
        }
    }

    /// End of input: fail the session if no header arrived, otherwise enqueue the remainder.
    /// Dropping `self` afterwards closes the queue.
    pub fn finish(mut self) -> Flow {
        if self.mapping.is_none() {
            self.latch.record(SessionError::InvalidHeader(
                "stream ended before a header line".into(),
            ));
            return Flow::Stop;
        }
        match self.batcher.drain_remaining() {
            Some(batch) => self.enqueue(batch),
            None => Flow::Continue,
        }
    }
}
