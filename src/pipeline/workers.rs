//! Upsert worker pool: N threads draining the batch queue into the store.

use crossbeam_channel::{Receiver, Sender, select};
use log::debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::Batch;
use crate::error::SessionError;
use crate::store::Store;

use super::context::{ProgressEvent, SessionShared};

/// Single upsert worker: take batches from batch_rx until the queue is closed and drained or the
/// session is cancelled. A failed upsert is recorded in the latch and ends this worker.
fn upsert_worker_loop<S>(
    id: usize,
    batch_rx: Receiver<Batch>,
    progress_tx: Sender<ProgressEvent>,
    store: Arc<S>,
    shared: SessionShared,
) where
    S: Store + ?Sized,
{
    let cancelled = shared.latch.cancelled();
    loop {
        let batch = select! {
            recv(batch_rx) -> msg => match msg {
                Ok(batch) => batch,
                Err(_) => break,
            },
            recv(cancelled) -> _ => break,
        };
        // Both arms may have been ready; a cancelled session takes no new work.
        if shared.latch.is_tripped() {
            debug!("worker {}: session cancelled, dropping batch of {}", id, batch.len());
            break;
        }
        let rows = batch.len();
        // A panicking store must fail the session before this worker's progress sender drops.
        let result = match panic::catch_unwind(AssertUnwindSafe(|| store.upsert(&batch))) {
            Ok(result) => result,
            Err(_) => {
                shared
                    .latch
                    .record(SessionError::Cancelled(format!("upsert worker {} panicked", id)));
                break;
            }
        };
        match result {
            Ok(()) => {
                let total = shared.add_batch(rows);
                debug!("worker {}: upserted {} rows ({} total)", id, rows, total);
                let _ = progress_tx.try_send(ProgressEvent { rows });
            }
            Err(e) => {
                shared.latch.record(SessionError::Store(e));
                break;
            }
        }
    }
    debug!("worker {}: exiting", id);
}

/// Spawn `worker_count` upsert workers sharing `batch_rx`. Workers exit once the caller drops the
/// last batch sender and the queue drains, or when the session latch trips.
pub fn spawn_upsert_workers<S>(
    batch_rx: &Receiver<Batch>,
    progress_tx: &Sender<ProgressEvent>,
    store: &Arc<S>,
    shared: &SessionShared,
    worker_count: usize,
) -> Vec<JoinHandle<()>>
where
    S: Store + ?Sized + 'static,
{
    (0..worker_count)
        .map(|id| {
            let batch_rx = batch_rx.clone();
            let progress_tx = progress_tx.clone();
            let store = Arc::clone(store);
            let shared = shared.clone();
            thread::spawn(move || upsert_worker_loop(id, batch_rx, progress_tx, store, shared))
        })
        .collect()
}
