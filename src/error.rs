//! Error taxonomy for ingestion sessions.

use thiserror::Error;

/// Failure reading from or writing to the connection (anything other than a normal close).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("connection already closed")]
    Closed,
}

/// Failure applying a batch to the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("upsert of {rows} rows failed: {source}")]
    Upsert {
        rows: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A single line that could not become a record. Never fatal to the session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("row has {found} columns, header has {expected}")]
    TooFewColumns { expected: usize, found: usize },
}

/// Terminal session error. Only the first one recorded is reported to the peer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("session cancelled: {0}")]
    Cancelled(String),

    #[error("invalid session config: {0}")]
    Config(String),
}
