//! Connection capabilities consumed by a session: a chunk source and a status sink.
//!
//! The two halves run on different threads (the producer reads while the reporter writes), so a
//! transport is split once at session start.

mod stream;

pub use stream::{StreamSink, StreamSource, StreamTransport};

use crate::StatusMessage;
use crate::error::TransportError;

/// Read half of a connection.
pub trait ChunkSource: Send {
    /// Next chunk of raw bytes, or `None` once the peer has finished (EOF or a normal close).
    fn read_next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

/// Write half of a connection.
pub trait StatusSink: Send {
    fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Send one status frame. Encodes it as JSON text unless the sink handles frames itself.
    fn send_status(&mut self, msg: &StatusMessage) -> Result<(), TransportError> {
        let text = serde_json::to_string(msg).map_err(|e| TransportError::Write(e.into()))?;
        self.send_text(&text)
    }

    /// Close the connection. Called exactly once, after the terminal message.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// A bidirectional connection that can be split into its read and write halves.
pub trait Transport {
    type Source: ChunkSource + 'static;
    type Sink: StatusSink + 'static;

    fn split(self) -> (Self::Source, Self::Sink);
}

/// A transport assembled from independently built halves.
pub struct SplitTransport<C, K> {
    source: C,
    sink: K,
}

impl<C, K> SplitTransport<C, K>
where
    C: ChunkSource + 'static,
    K: StatusSink + 'static,
{
    pub fn new(source: C, sink: K) -> Self {
        Self { source, sink }
    }
}

impl<C, K> Transport for SplitTransport<C, K>
where
    C: ChunkSource + 'static,
    K: StatusSink + 'static,
{
    type Source = C;
    type Sink = K;

    fn split(self) -> (C, K) {
        (self.source, self.sink)
    }
}
