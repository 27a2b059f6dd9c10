//! Session context: the channels and shared counters wired between producer, workers and reporter.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{Batch, SessionConfig};

use super::error_handler::ErrorLatch;

/// One completed batch, as seen by the reporter. The reporter reads the shared counter for the
/// total, so dropped events only coalesce acknowledgements.
#[derive(Clone, Copy, Debug)]
pub struct ProgressEvent {
    pub rows: usize,
}

/// State shared by every thread of one session. Cloning shares the same counters and latch.
#[derive(Clone)]
pub struct SessionShared {
    pub latch: Arc<ErrorLatch>,
    /// Rows acknowledged by the store. Only ever incremented.
    pub rows_written: Arc<AtomicUsize>,
    pub batches_written: Arc<AtomicUsize>,
}

impl SessionShared {
    pub fn new(latch: Arc<ErrorLatch>) -> Self {
        Self {
            latch,
            rows_written: Arc::new(AtomicUsize::new(0)),
            batches_written: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Count a completed batch. Returns the new row total.
    pub fn add_batch(&self, rows: usize) -> usize {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.rows_written.fetch_add(rows, Ordering::AcqRel) + rows
    }

    pub fn rows(&self) -> usize {
        self.rows_written.load(Ordering::Acquire)
    }

    pub fn batches(&self) -> usize {
        self.batches_written.load(Ordering::Acquire)
    }
}

/// Channels for one session. Producer gets `batch_tx`; workers get `batch_rx` and `progress_tx`;
/// the reporter gets `progress_rx`.
pub struct SessionChannels {
    pub batch_tx: Sender<Batch>,
    pub batch_rx: Receiver<Batch>,
    pub progress_tx: Sender<ProgressEvent>,
    pub progress_rx: Receiver<ProgressEvent>,
    pub shared: SessionShared,
}

/// Build the bounded batch queue and progress channel for a validated config.
pub fn create_session_channels(config: &SessionConfig, latch: Arc<ErrorLatch>) -> SessionChannels {
    let (batch_tx, batch_rx) = bounded::<Batch>(config.queue_capacity);
    let (progress_tx, progress_rx) = bounded::<ProgressEvent>(config.queue_capacity);

    SessionChannels {
        batch_tx,
        batch_rx,
        progress_tx,
        progress_rx,
        shared: SessionShared::new(latch),
    }
}
