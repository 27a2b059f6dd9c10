//! Chunk reader: runs the blocking `read_next_chunk` loop on its own thread so the coordinator
//! can wait on input and on cancellation at the same time.

use crossbeam_channel::{Receiver, Sender, bounded, select};
use log::debug;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::TransportError;
use crate::transport::ChunkSource;

use super::error_handler::ErrorLatch;

/// One read result: a chunk, end of stream (`Ok(None)`), or a fatal read error.
pub type ReadEvent = Result<Option<Vec<u8>>, TransportError>;

fn reader_loop<C: ChunkSource>(
    mut source: C,
    chunk_tx: Sender<ReadEvent>,
    cancelled: Receiver<()>,
) {
    loop {
        let event = source.read_next_chunk();
        let last = !matches!(event, Ok(Some(_)));
        select! {
            send(chunk_tx, event) -> res => {
                if res.is_err() {
                    break;
                }
            },
            recv(cancelled) -> _ => {
                debug!("reader: session cancelled");
                break;
            },
        }
        if last {
            break;
        }
    }
}

/// Spawn the reader thread. The channel holds one chunk of read-ahead.
///
/// End of stream and read errors arrive as explicit events; a disconnect without either means
/// the reader thread died. After cancellation the thread exits as soon as its pending read
/// returns, so callers need not join it.
pub fn spawn_chunk_reader<C>(
    source: C,
    latch: &Arc<ErrorLatch>,
) -> (Receiver<ReadEvent>, JoinHandle<()>)
where
    C: ChunkSource + 'static,
{
    let (chunk_tx, chunk_rx) = bounded::<ReadEvent>(1);
    let cancelled = latch.cancelled();
    let handle = thread::spawn(move || reader_loop(source, chunk_tx, cancelled));
    (chunk_rx, handle)
}
