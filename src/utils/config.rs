//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    db_filename: String,
    toml_filename: String,
    db_env_key: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                db_filename: format!("{pkg}.db"),
                toml_filename: format!(".{pkg}.toml"),
                db_env_key: format!("{}_DB", pkg.to_uppercase()),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Default SQLite database filename (e.g. `locflow.db`).
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    /// Settings file looked up in the working directory (e.g. `.locflow.toml`).
    pub fn toml_filename(&self) -> &str {
        &self.toml_filename
    }

    /// Environment variable holding the database path (e.g. `LOCFLOW_DB`).
    pub fn db_env_key(&self) -> &str {
        &self.db_env_key
    }
}

// ---- Session defaults ----

/// Records per batch. Balances transaction size against store round-trips.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Upsert worker threads per session.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Batch queue depth. Two batches of read-ahead per worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

// ---- Header ----

/// Column names recognized in the header line (case-sensitive).
pub struct HeaderColumns;

impl HeaderColumns {
    pub const LOC_ID: &'static str = "LOCID";
    pub const LOC_TIMEZONE: &'static str = "LOCTIMEZONE";
    pub const COUNTRY: &'static str = "COUNTRY";
    pub const LOC_NAME: &'static str = "LOCNAME";
    pub const BUSINESS: &'static str = "BUSINESS";

    /// A header line with fewer columns than this fails the session.
    pub const MIN_COLUMNS: usize = 5;
}

/// Field delimiter within a line.
pub const FIELD_DELIMITER: char = ',';

/// Logical line delimiter. A preceding `\r` is removed by trimming.
pub const LINE_DELIMITER: u8 = b'\n';

// ---- Transport / progress ----

/// Bytes per read for stream-backed transports.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Text of the terminal success message.
pub const COMPLETE_MESSAGE: &str = "CSV processed successfully";
