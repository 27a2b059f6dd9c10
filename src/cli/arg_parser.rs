use clap::Parser;
use std::path::PathBuf;

/// Stream a CSV of locations into SQLite with batched, idempotent upserts.
#[derive(Clone, Parser)]
#[command(name = "locflow")]
#[command(about = "Ingest a locations CSV (file or stdin) into SQLite; prints status messages as JSON lines.")]
pub struct Cli {
    /// CSV file to ingest. Reads stdin when omitted or `-`.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// SQLite database path. Default: LOCFLOW_DB, then `locflow.db` in the current directory.
    #[arg(long, short)]
    pub db: Option<PathBuf>,

    /// Records per upsert batch.
    #[arg(long, short = 'b', value_parser = clap::value_parser!(usize))]
    pub batch_size: Option<usize>,

    /// Concurrent upsert workers.
    #[arg(long, short = 'w', value_parser = clap::value_parser!(usize))]
    pub workers: Option<usize>,

    /// Batch queue capacity (raised to the worker count if smaller).
    #[arg(long, short = 'q', value_parser = clap::value_parser!(usize))]
    pub queue_capacity: Option<usize>,

    /// Bytes read from the input per chunk.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub chunk_size: Option<usize>,

    /// Verbose output: debug logging and a progress counter instead of progress lines.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

impl Cli {
    /// Input path, or None for stdin.
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().filter(|p| p.as_os_str() != "-")
    }
}
