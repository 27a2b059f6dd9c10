//! Command-line front end: argument parsing, option layering, console status output.

pub mod arg_parser;
pub mod handlers;
pub mod progress;

pub use arg_parser::Cli;
pub use handlers::{IngestOpts, handle_run, resolve_opts};
pub use progress::ConsoleSink;
