//! Public and internal types for the locflow API and pipeline.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::utils::config::{DEFAULT_BATCH_SIZE, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_COUNT};

/// One logical row of the `locations` table. `loc_id` is the upsert key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "locid")]
    pub loc_id: String,
    #[serde(rename = "loctimezone")]
    pub loc_timezone: String,
    pub country: String,
    #[serde(rename = "locname")]
    pub loc_name: String,
    pub business: String,
}

/// Ordered group of records applied to the store in one write.
pub type Batch = Vec<Location>;

/// Per-session tuning: records per batch, worker threads, batch queue depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub batch_size: usize,
    pub worker_count: usize,
    /// Bounded queue capacity in batches. Raised to `worker_count` when smaller.
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Reject zero sizes and raise a too-small queue capacity to the worker count.
    pub fn validate(&self) -> Result<SessionConfig, SessionError> {
        if self.batch_size == 0 {
            return Err(SessionError::Config("batch_size must be at least 1".into()));
        }
        if self.worker_count == 0 {
            return Err(SessionError::Config("worker_count must be at least 1".into()));
        }
        let mut cfg = self.clone();
        if cfg.queue_capacity < cfg.worker_count {
            log::warn!(
                "queue_capacity {} is below worker_count {}; using {}",
                cfg.queue_capacity,
                cfg.worker_count,
                cfg.worker_count
            );
            cfg.queue_capacity = cfg.worker_count;
        }
        Ok(cfg)
    }
}

/// Summary of a session that terminated successfully.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Rows acknowledged by the store (sum of completed batch sizes).
    pub rows_written: usize,
    pub batches_written: usize,
    /// Lines dropped by the row parser.
    pub rows_skipped: usize,
    /// Non-empty logical lines seen, header included.
    pub lines_seen: usize,
}

/// Status frame sent back over the connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StatusMessage {
    Progress { rows: usize },
    Complete { rows: usize, message: String },
    Error { message: String },
}

impl StatusMessage {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusMessage::Progress { .. })
    }
}
