//! Session coordinator: wires reassembly, producer, workers and reporter for one connection.

use crossbeam_channel::select;
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::error::SessionError;
use crate::store::Store;
use crate::transport::{StatusSink, Transport};
use crate::{SessionConfig, SessionReport, StatusMessage};

use super::context::{SessionChannels, create_session_channels};
use super::error_handler::ErrorLatch;
use super::producer::{Flow, Producer};
use super::reader::spawn_chunk_reader;
use super::reassembler::LineReassembler;
use super::reporter::spawn_reporter;
use super::workers::spawn_upsert_workers;

/// Session lifecycle. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    AwaitingHeader,
    Streaming,
    Draining,
    Terminated { success: bool },
}

/// One ingestion session bound to one connection.
///
/// The latch is exposed before [`run`](Self::run) so a caller can cancel from outside
/// (e.g. a Ctrl+C handler) by recording [`SessionError::Cancelled`].
pub struct Session {
    config: SessionConfig,
    latch: Arc<ErrorLatch>,
    state: SessionState,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            config: config.clone(),
            latch: Arc::new(ErrorLatch::new()),
            state: SessionState::AwaitingHeader,
        }
    }

    pub fn latch(&self) -> Arc<ErrorLatch> {
        Arc::clone(&self.latch)
    }

    fn transition(&mut self, next: SessionState) {
        debug!("session: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Drive the session to completion: read until end of input or first error, then drain the
    /// workers and let the reporter send the terminal message and close the connection.
    pub fn run<T, S>(mut self, transport: T, store: Arc<S>) -> Result<SessionReport, SessionError>
    where
        T: Transport,
        S: Store + ?Sized + 'static,
    {
        let (source, mut sink) = transport.split();
        let config = match self.config.validate() {
            Ok(config) => config,
            Err(e) => {
                reject(&mut sink, &e);
                return Err(e);
            }
        };

        let SessionChannels {
            batch_tx,
            batch_rx,
            progress_tx,
            progress_rx,
            shared,
        } = create_session_channels(&config, Arc::clone(&self.latch));

        let worker_handles = spawn_upsert_workers(
            &batch_rx,
            &progress_tx,
            &store,
            &shared,
            config.worker_count,
        );
        // Workers hold the remaining clones; the reporter sees disconnect once they all exit.
        drop(batch_rx);
        drop(progress_tx);
        let reporter_handle = spawn_reporter(sink, progress_rx, &shared);

        let mut producer = Producer::new(config.batch_size, batch_tx, Arc::clone(&self.latch));
        let mut reassembler = LineReassembler::new();

        let (chunk_rx, reader_handle) = spawn_chunk_reader(source, &self.latch);
        let cancelled = self.latch.cancelled();

        'read: loop {
            let chunk = select! {
                recv(chunk_rx) -> event => match event {
                    Ok(Ok(Some(chunk))) => chunk,
                    Ok(Ok(None)) => break,
                    Ok(Err(e)) => {
                        self.latch.record(SessionError::Transport(e));
                        break;
                    }
                    Err(_) => {
                        self.latch
                            .record(SessionError::Cancelled("reader thread exited".into()));
                        break;
                    }
                },
                recv(cancelled) -> _ => break,
            };
            if self.latch.is_tripped() {
                break;
            }
            for line in reassembler.feed(&chunk) {
                if producer.accept_line(&line) == Flow::Stop {
                    break 'read;
                }
                if self.state == SessionState::AwaitingHeader && producer.has_header() {
                    self.transition(SessionState::Streaming);
                }
            }
        }
        // A cancelled reader may still be blocked in a read; it exits on its own.
        if !self.latch.is_tripped() && reader_handle.join().is_err() {
            self.latch
                .record(SessionError::Cancelled("reader thread panicked".into()));
        }

        if !self.latch.is_tripped()
            && let Some(line) = reassembler.flush()
        {
            producer.accept_line(&line);
        }
        if self.state == SessionState::AwaitingHeader && producer.has_header() {
            self.transition(SessionState::Streaming);
        }
        let lines_seen = producer.lines_seen;
        let rows_skipped = producer.rows_skipped;
        // Finishing or dropping the producer releases the last batch sender and closes the queue.
        if self.latch.is_tripped() {
            drop(producer);
        } else {
            self.transition(SessionState::Draining);
            producer.finish();
        }

        join_workers(worker_handles, &self.latch);
        let acks = reporter_handle
            .join()
            .map_err(|_| SessionError::Cancelled("reporter thread panicked".into()))?;

        if let Some(e) = self.latch.take() {
            self.transition(SessionState::Terminated { success: false });
            return Err(e);
        }
        self.transition(SessionState::Terminated { success: true });
        let report = SessionReport {
            rows_written: shared.rows(),
            batches_written: shared.batches(),
            rows_skipped,
            lines_seen,
        };
        info!(
            "session complete: {} rows in {} batches, {} skipped, {} acks",
            report.rows_written, report.batches_written, report.rows_skipped, acks
        );
        Ok(report)
    }
}

/// Run one session over `transport` into `store`. See [`Session::run`].
pub fn run_session<T, S>(
    transport: T,
    store: Arc<S>,
    config: &SessionConfig,
) -> Result<SessionReport, SessionError>
where
    T: Transport,
    S: Store + ?Sized + 'static,
{
    Session::new(config).run(transport, store)
}

fn join_workers(worker_handles: Vec<JoinHandle<()>>, latch: &ErrorLatch) {
    for h in worker_handles {
        if h.join().is_err() {
            latch.record(SessionError::Cancelled("upsert worker panicked".into()));
        }
    }
}

/// Report an error that prevents the session from starting, then close.
fn reject<K: StatusSink>(sink: &mut K, err: &SessionError) {
    let msg = StatusMessage::Error {
        message: err.to_string(),
    };
    if let Err(e) = sink.send_status(&msg) {
        warn!("could not deliver error message: {}", e);
    }
    if let Err(e) = sink.close() {
        warn!("closing connection failed: {}", e);
    }
}
