//! Line reassembly: raw chunks in, complete logical lines out, with the incomplete tail carried
//! across chunk boundaries.

use crate::utils::config::LINE_DELIMITER;

/// Holds the bytes after the last delimiter seen so far.
///
/// The tail is kept as bytes, not text, so a multi-byte character split across two chunks is
/// decoded only once both halves have arrived.
#[derive(Debug, Default)]
pub struct LineReassembler {
    tail: Vec<u8>,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` to the pending tail and return every line it completes, trimmed,
    /// empty lines removed. Bytes after the last delimiter stay pending.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let Some(last_delim) = chunk.iter().rposition(|&b| b == LINE_DELIMITER) else {
            self.tail.extend_from_slice(chunk);
            return Vec::new();
        };

        let mut combined = std::mem::take(&mut self.tail);
        combined.extend_from_slice(&chunk[..last_delim]);
        self.tail.extend_from_slice(&chunk[last_delim + 1..]);

        combined
            .split(|&b| b == LINE_DELIMITER)
            .filter_map(decode_line)
            .collect()
    }

    /// Return the pending tail as a final line if it is non-empty after trimming.
    /// Called once at end of stream to recover a last line sent without a delimiter.
    pub fn flush(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.tail);
        decode_line(&tail)
    }

    /// Bytes currently waiting for a delimiter.
    pub fn pending_len(&self) -> usize {
        self.tail.len()
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let text = match std::str::from_utf8(raw) {
        Ok(s) => std::borrow::Cow::Borrowed(s),
        Err(e) => {
            log::warn!(
                "line is not valid UTF-8 at byte {}; decoding lossily",
                e.valid_up_to()
            );
            String::from_utf8_lossy(raw)
        }
    };
    let line = text.trim();
    (!line.is_empty()).then(|| line.to_string())
}
