//! Backing store: the upsert capability and its SQLite implementation.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::Location;
use crate::error::StoreError;

/// Keyed, idempotent batch write. Called concurrently from every worker of a session.
///
/// Implementations insert each record whose `loc_id` is absent and overwrite every non-key
/// field of one that is present, so applying a batch twice leaves the same state as once.
pub trait Store: Send + Sync {
    fn upsert(&self, batch: &[Location]) -> Result<(), StoreError>;
}

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// Insert-or-overwrite keyed on `locid`.
pub(crate) const UPSERT_LOCATION_SQL: &str = r#"
INSERT INTO locations (locid, loctimezone, country, locname, business)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT (locid) DO UPDATE SET
    loctimezone = excluded.loctimezone,
    country = excluded.country,
    locname = excluded.locname,
    business = excluded.business
"#;

/// Schema for the locations table.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS locations (
    locid TEXT PRIMARY KEY,
    loctimezone TEXT NOT NULL,
    country TEXT NOT NULL,
    locname TEXT NOT NULL,
    business TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_locations_country ON locations(country);
CREATE INDEX IF NOT EXISTS idx_locations_business ON locations(business);
"#;
