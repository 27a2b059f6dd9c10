//! SQLite-backed store: open, batched upsert, and inspection queries.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, Statement};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::Location;
use crate::error::StoreError;

use super::{SCHEMA, Store, UPSERT_LOCATION_SQL, WAL_PRAGMAS};

/// One connection behind a mutex: workers upsert concurrently, SQLite applies them one
/// transaction at a time.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> Result<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .context("enable WAL")?;
    conn.execute_batch(WAL_PRAGMAS).context("set WAL pragmas")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(())
}

/// Execute one upsert for a record (used by upsert_batch).
fn execute_upsert(stmt: &mut Statement<'_>, l: &Location) -> rusqlite::Result<usize> {
    stmt.execute((
        l.loc_id.as_str(),
        l.loc_timezone.as_str(),
        l.country.as_str(),
        l.loc_name.as_str(),
        l.business.as_str(),
    ))
}

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        loc_id: row.get(0)?,
        loc_timezone: row.get(1)?,
        country: row.get(2)?,
        loc_name: row.get(3)?,
        business: row.get(4)?,
    })
}

/// Upsert a batch in a single transaction. Nothing from the batch is kept if any row fails.
fn upsert_batch(conn: &mut Connection, batch: &[Location]) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(UPSERT_LOCATION_SQL)?;
        for l in batch {
            execute_upsert(&mut stmt, l)?;
        }
    }
    tx.commit()
}

impl SqliteStore {
    /// Open or create the database at `path` and ensure schema + WAL.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open database {}", path.display()))?;
        apply_wal_and_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    /// In-memory database with the same schema (tests, dry runs).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        conn.execute_batch(SCHEMA).context("create schema")?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of rows in the locations table.
    pub fn location_count(&self) -> Result<usize> {
        let n: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))
            .context("count locations")?;
        Ok(n.max(0) as usize)
    }

    /// Page through stored locations ordered by key.
    pub fn load_locations(&self, limit: usize, offset: usize) -> Result<Vec<Location>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT locid, loctimezone, country, locname, business FROM locations \
             ORDER BY locid LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map((limit as i64, offset as i64), location_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("read location row")?);
        }
        Ok(out)
    }

    /// Fetch a single location by key.
    pub fn get_location(&self, loc_id: &str) -> Result<Option<Location>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT locid, loctimezone, country, locname, business FROM locations WHERE locid = ?1",
        )?;
        let loc = stmt
            .query_row([loc_id], location_from_row)
            .optional()
            .context("read location")?;
        Ok(loc)
    }
}

impl Store for SqliteStore {
    fn upsert(&self, batch: &[Location]) -> Result<(), StoreError> {
        let mut conn = self.lock();
        upsert_batch(&mut conn, batch).map_err(|e| StoreError::Upsert {
            rows: batch.len(),
            source: Box::new(e),
        })
    }
}
