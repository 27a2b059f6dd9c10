//! Pipeline components: reassembly, header, parsing, batching, workers, reporter, coordinator.

pub mod batcher;
pub mod context;
pub mod error_handler;
pub mod header;
pub mod orchestrator;
pub mod parser;
pub mod producer;
pub mod reader;
pub mod reassembler;
pub mod reporter;
pub mod workers;

pub use batcher::Batcher;
pub use context::{ProgressEvent, SessionChannels, SessionShared, create_session_channels};
pub use error_handler::ErrorLatch;
pub use header::ColumnMapping;
pub use orchestrator::{Session, SessionState, run_session};
pub use parser::parse_row;
pub use producer::{Flow, Producer};
pub use reader::{ReadEvent, spawn_chunk_reader};
pub use reassembler::LineReassembler;
pub use reporter::spawn_reporter;
pub use workers::spawn_upsert_workers;
