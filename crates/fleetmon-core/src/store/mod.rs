// ── Persistence seam ──
//
// The engine talks to storage through the synchronous `Store` trait. All
// writes are keyed upserts, so retrying one after a failure is harmless.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

use crate::model::{DashboardSummary, DeviceSnapshot, ErrorLogEntry, ErrorLogUpsert};

/// Persistence failures. Scoped to one write; never fatal to a pass.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("error log entry {id} not found")]
    NotFound { id: u64 },

    #[error("state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not valid: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of an error-log upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(u64),
    Updated(u64),
}

impl UpsertOutcome {
    pub fn id(self) -> u64 {
        match self {
            Self::Inserted(id) | Self::Updated(id) => id,
        }
    }
}

/// Storage for device snapshots, error-log entries and the summary row.
pub trait Store: Send + Sync + 'static {
    /// Replace the latest-state row for `snapshot.ip`.
    fn upsert_device_snapshot(&self, snapshot: DeviceSnapshot) -> Result<(), StoreError>;

    /// All device snapshots, ordered by IP.
    fn device_snapshots(&self) -> Result<Vec<DeviceSnapshot>, StoreError>;

    /// Insert or refresh the entry for `upsert.key` as one atomic step.
    fn upsert_error_log(&self, upsert: ErrorLogUpsert) -> Result<UpsertOutcome, StoreError>;

    fn error_log(&self, id: u64) -> Result<Option<ErrorLogEntry>, StoreError>;

    /// All entries, ordered by id.
    fn error_logs(&self) -> Result<Vec<ErrorLogEntry>, StoreError>;

    /// Unread entries, most recent first occurrence first.
    fn unread_error_logs(&self) -> Result<Vec<ErrorLogEntry>, StoreError> {
        let mut unread: Vec<ErrorLogEntry> = self
            .error_logs()?
            .into_iter()
            .filter(|e| !e.is_read)
            .collect();
        unread.sort_by(|a, b| {
            b.first_occurred_at
                .cmp(&a.first_occurred_at)
                .then(b.id.cmp(&a.id))
        });
        Ok(unread)
    }

    /// Acknowledge one entry. Acknowledging a read entry is a no-op.
    fn mark_error_log_read(&self, id: u64, at: DateTime<Utc>)
    -> Result<ErrorLogEntry, StoreError>;

    /// Acknowledge every unread entry; returns how many changed.
    fn mark_all_error_logs_read(&self, at: DateTime<Utc>) -> Result<usize, StoreError>;

    fn save_dashboard_summary(&self, summary: DashboardSummary) -> Result<(), StoreError>;

    fn dashboard_summary(&self) -> Result<Option<DashboardSummary>, StoreError>;

    /// Push buffered state to durable storage.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
