//! Transport over any `Read` + `Write` pair (file, stdin/stdout, TCP stream).

use std::io::{ErrorKind, Read, Write};

use crate::error::TransportError;
use crate::utils::config::DEFAULT_CHUNK_SIZE;

use super::{ChunkSource, StatusSink, Transport};

/// Reads fixed-size chunks from `reader`; writes one status message per line to `writer`.
pub struct StreamTransport<R, W> {
    reader: R,
    writer: W,
    chunk_size: usize,
}

impl<R, W> StreamTransport<R, W>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Bytes requested per read. Clamped to at least 1.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl<R, W> Transport for StreamTransport<R, W>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    type Source = StreamSource<R>;
    type Sink = StreamSink<W>;

    fn split(self) -> (Self::Source, Self::Sink) {
        (
            StreamSource::new(self.reader, self.chunk_size),
            StreamSink {
                writer: Some(self.writer),
            },
        )
    }
}

pub struct StreamSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: Read + Send> StreamSource<R> {
    /// Source reading up to `chunk_size` bytes per call (at least 1).
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0; chunk_size.max(1)],
        }
    }
}

impl<R: Read + Send> ChunkSource for StreamSource<R> {
    fn read_next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.reader.read(&mut self.buf) {
                // Only a clean end of stream finishes the input; a reset is a read error.
                Ok(0) => return Ok(None),
                Ok(n) => return Ok(Some(self.buf[..n].to_vec())),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Read(e)),
            }
        }
    }
}

pub struct StreamSink<W> {
    writer: Option<W>,
}

impl<W: Write + Send> StatusSink for StreamSink<W> {
    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::Closed)?;
        writeln!(writer, "{}", text).map_err(TransportError::Write)?;
        writer.flush().map_err(TransportError::Write)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut writer = self.writer.take().ok_or(TransportError::Closed)?;
        writer.flush().map_err(TransportError::Write)
    }
}
