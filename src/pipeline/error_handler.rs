//! First-error latch shared by every thread of a session.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::SessionError;

/// Records the first terminal error of a session and cancels the session when it does.
///
/// Cancellation is broadcast by dropping the only sender of a channel nobody ever sends on:
/// every clone of [`cancelled`](Self::cancelled) becomes ready at once, so it can sit in a
/// `select!` next to a blocking send or recv.
pub struct ErrorLatch {
    first: Mutex<Option<SessionError>>,
    tripped: AtomicBool,
    cancel_tx: Mutex<Option<Sender<()>>>,
    cancel_rx: Receiver<()>,
}

impl Default for ErrorLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorLatch {
    pub fn new() -> Self {
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        Self {
            first: Mutex::new(None),
            tripped: AtomicBool::new(false),
            cancel_tx: Mutex::new(Some(cancel_tx)),
            cancel_rx,
        }
    }

    /// Store `err` if no error has been recorded yet and cancel the session.
    /// Returns false (and discards `err`) when an earlier error already won.
    pub fn record(&self, err: SessionError) -> bool {
        let mut first = self.first.lock().unwrap_or_else(PoisonError::into_inner);
        if self.tripped.load(Ordering::Acquire) {
            log::debug!("discarding error after session was cancelled: {}", err);
            return false;
        }
        log::error!("{}", err);
        *first = Some(err);
        self.tripped.store(true, Ordering::Release);
        drop(first);
        self.cancel_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        true
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once an error is recorded.
    pub fn cancelled(&self) -> Receiver<()> {
        self.cancel_rx.clone()
    }

    /// Text of the recorded error, if any.
    pub fn message(&self) -> Option<String> {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|e| e.to_string())
    }

    /// Remove and return the recorded error. The latch stays tripped.
    pub fn take(&self) -> Option<SessionError> {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
