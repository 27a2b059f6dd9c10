//! CLI command handler: build options, open the database, run one session over the input.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::SessionConfig;
use crate::cli::arg_parser::Cli;
use crate::cli::progress::ConsoleSink;
use crate::error::SessionError;
use crate::pipeline::Session;
use crate::store::SqliteStore;
use crate::transport::{SplitTransport, StreamSource};
use crate::utils::config::{DEFAULT_CHUNK_SIZE, PackagePaths};
use crate::utils::locflow_toml::{apply_file_to_opts, load_locflow_toml};
use crate::utils::{db_path_from_env, setup_logging};

/// Resolved CLI options: defaults, then `.locflow.toml`, then environment, then flags.
#[derive(Clone, Debug)]
pub struct IngestOpts {
    /// None reads stdin.
    pub input: Option<PathBuf>,
    pub db_path: PathBuf,
    pub session: SessionConfig,
    pub chunk_size: usize,
    pub verbose: bool,
}

impl Default for IngestOpts {
    fn default() -> Self {
        Self {
            input: None,
            db_path: PathBuf::from(PackagePaths::get().db_filename()),
            session: SessionConfig::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            verbose: false,
        }
    }
}

/// Overwrite an option when the flag was given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $cli_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $cli.$cli_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Layer settings file, environment and flags over the defaults.
pub fn resolve_opts(cli: &Cli, dir: &Path) -> IngestOpts {
    let mut opts = IngestOpts::default();
    if let Some(file) = load_locflow_toml(dir) {
        apply_file_to_opts(&file, &mut opts);
    }
    if let Some(p) = db_path_from_env(dir) {
        opts.db_path = p;
    }
    if let Some(ref p) = cli.db {
        opts.db_path = p.clone();
    }
    opts.input = cli.input_path().cloned();
    apply_cli_opt!(cli, opts, batch_size => session.batch_size);
    apply_cli_opt!(cli, opts, workers => session.worker_count);
    apply_cli_opt!(cli, opts, queue_capacity => session.queue_capacity);
    apply_cli_opt!(cli, opts, chunk_size => chunk_size);
    apply_cli_opt!(cli, opts, verbose => verbose);
    opts
}

fn open_input(input: Option<&Path>) -> Result<Box<dyn Read + Send>> {
    match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("open input {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdin())),
    }
}

/// Ingest the input named by `cli` into the configured database.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let dir = std::env::current_dir().context("read current directory")?;
    let opts = resolve_opts(cli, &dir);
    setup_logging(opts.verbose);
    debug!("{} CONFIG: {:#?}", PackagePaths::get().pkg_name().to_uppercase(), opts);

    let store = Arc::new(SqliteStore::open(&opts.db_path)?);
    let reader = open_input(opts.input.as_deref())?;
    let transport = SplitTransport::new(
        StreamSource::new(reader, opts.chunk_size),
        ConsoleSink::new(io::stdout(), opts.verbose),
    );

    let session = Session::new(&opts.session);
    let latch = session.latch();
    ctrlc::set_handler(move || {
        latch.record(SessionError::Cancelled("interrupted".into()));
    })
    .context("set Ctrl+C handler")?;

    let report = session.run(transport, store)?;
    info!(
        "{} rows written to {} ({} lines skipped)",
        report.rows_written,
        opts.db_path.display(),
        report.rows_skipped
    );
    Ok(())
}
