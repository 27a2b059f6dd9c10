//! Console status sink: prints status messages and, in verbose mode, drives a progress counter.

use kdam::{Animation, Bar, BarExt};
use std::io::Write;

use crate::StatusMessage;
use crate::error::TransportError;
use crate::transport::StatusSink;

/// Create a counter for unknown total (shows count without percentage)
fn create_counter(desc: &'static str) -> Bar {
    kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " rows"
    )
}

/// Writes every status message to `out` as a line, except progress messages when a counter is
/// shown; those move the counter instead.
pub struct ConsoleSink<W> {
    out: Option<W>,
    bar: Option<Bar>,
    shown_rows: usize,
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, show_counter: bool) -> Self {
        Self {
            out: Some(out),
            bar: show_counter.then(|| create_counter("Ingesting")),
            shown_rows: 0,
        }
    }

    /// Move the counter to `rows`. The counter only moves forward.
    fn advance_to(&mut self, rows: usize) {
        if let Some(bar) = self.bar.as_mut()
            && rows > self.shown_rows
        {
            let _ = bar.update(rows - self.shown_rows);
            self.shown_rows = rows;
        }
    }

    fn write_line(&mut self, text: &str) -> Result<(), TransportError> {
        let out = self.out.as_mut().ok_or(TransportError::Closed)?;
        writeln!(out, "{}", text).map_err(TransportError::Write)?;
        out.flush().map_err(TransportError::Write)
    }
}

impl<W: Write + Send> StatusSink for ConsoleSink<W> {
    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.write_line(text)
    }

    fn send_status(&mut self, msg: &StatusMessage) -> Result<(), TransportError> {
        match msg {
            StatusMessage::Progress { rows } if self.bar.is_some() => {
                self.advance_to(*rows);
                return Ok(());
            }
            StatusMessage::Complete { rows, .. } => {
                self.advance_to(*rows);
                if let Some(bar) = self.bar.as_mut() {
                    let _ = bar.refresh();
                    eprintln!();
                }
            }
            _ => {}
        }
        let text = serde_json::to_string(msg).map_err(|e| TransportError::Write(e.into()))?;
        self.write_line(&text)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut out = self.out.take().ok_or(TransportError::Closed)?;
        out.flush().map_err(TransportError::Write)
    }
}
