//! Status reporter: owns the write half of the connection for the whole session.
//!
//! Sends coalesced progress acknowledgements while workers run, then exactly one terminal
//! message (complete or error), then closes the connection.

use crossbeam_channel::{Receiver, select};
use log::{debug, warn};
use std::thread::{self, JoinHandle};

use crate::StatusMessage;
use crate::error::SessionError;
use crate::transport::StatusSink;
use crate::utils::config::COMPLETE_MESSAGE;

use super::context::{ProgressEvent, SessionShared};

/// Runs until every progress sender is gone (all workers exited) or the session is cancelled.
fn reporter_loop<K: StatusSink>(
    mut sink: K,
    progress_rx: Receiver<ProgressEvent>,
    shared: SessionShared,
) -> usize {
    let cancelled = shared.latch.cancelled();
    let mut acks = 0_usize;
    loop {
        select! {
            recv(progress_rx) -> ev => match ev {
                Ok(_) => {
                    let coalesced = 1 + progress_rx.try_iter().count();
                    if shared.latch.is_tripped() {
                        continue;
                    }
                    let rows = shared.rows();
                    debug!("ack: {} rows ({} batch events coalesced)", rows, coalesced);
                    if let Err(e) = sink.send_status(&StatusMessage::Progress { rows }) {
                        shared.latch.record(SessionError::Transport(e));
                        continue;
                    }
                    acks += 1;
                }
                Err(_) => break,
            },
            recv(cancelled) -> _ => break,
        }
    }

    let terminal = match shared.latch.message() {
        Some(message) => StatusMessage::Error { message },
        None => StatusMessage::Complete {
            rows: shared.rows(),
            message: COMPLETE_MESSAGE.to_string(),
        },
    };
    if let Err(e) = sink.send_status(&terminal) {
        if matches!(terminal, StatusMessage::Error { .. }) {
            warn!("could not deliver error message: {}", e);
        } else {
            shared.latch.record(SessionError::Transport(e));
        }
    }
    if let Err(e) = sink.close() {
        warn!("closing connection failed: {}", e);
    }
    acks
}

/// Spawn the reporter thread. It finishes after all clones of the progress sender are dropped
/// or the latch trips. Returns the number of progress acknowledgements sent.
pub fn spawn_reporter<K>(
    sink: K,
    progress_rx: Receiver<ProgressEvent>,
    shared: &SessionShared,
) -> JoinHandle<usize>
where
    K: StatusSink + 'static,
{
    let shared = shared.clone();
    thread::spawn(move || reporter_loop(sink, progress_rx, shared))
}
