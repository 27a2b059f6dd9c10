//! Locflow: streaming CSV ingestion with row reassembly, batching, and bounded upsert workers.

pub mod cli;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod transport;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use error::{RowError, SessionError, StoreError, TransportError};
pub use pipeline::{Session, run_session};
pub use store::{SqliteStore, Store};
pub use transport::{ChunkSource, StatusSink, StreamTransport, Transport};

/// Result alias used by the application layer (CLI, config, database open).
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
