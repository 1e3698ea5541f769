// ── Error log entries ──
//
// One open entry per (device IP, category). Entries are created on the
// first abnormal observation, refreshed in place afterwards and never
// closed; operators only toggle the read flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;

/// Uniqueness key of an error-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogKey {
    pub device_ip: String,
    pub category: Category,
}

impl ErrorLogKey {
    pub fn new(device_ip: impl Into<String>, category: Category) -> Self {
        Self {
            device_ip: device_ip.into(),
            category,
        }
    }
}

impl std::fmt::Display for ErrorLogKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device_ip, self.category)
    }
}

/// Device readings captured alongside an error, overwritten on refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    pub camera_value: Option<i64>,
    pub ocr_value_seconds: Option<i64>,
    pub hdmi_value: Option<i64>,
    pub ac_value: Option<i64>,
    pub dc_value: Option<i64>,
}

/// Lifecycle of an entry from the operator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryState {
    OpenUnread,
    OpenRead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub id: u64,
    pub device_ip: String,
    pub category: Category,
    pub code: i64,
    pub message: String,
    pub first_occurred_at: DateTime<Utc>,
    pub last_occurred_at: DateTime<Utc>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub context: ErrorContext,
}

impl ErrorLogEntry {
    pub fn key(&self) -> ErrorLogKey {
        ErrorLogKey::new(self.device_ip.clone(), self.category)
    }

    pub fn state(&self) -> EntryState {
        if self.is_read {
            EntryState::OpenRead
        } else {
            EntryState::OpenUnread
        }
    }

    /// Acknowledge the entry. Returns `false` if it was already read, in
    /// which case the original `read_at` is kept.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(at);
        true
    }
}

/// A write request for the (device IP, category) entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLogUpsert {
    pub key: ErrorLogKey,
    pub code: i64,
    pub message: String,
    pub context: ErrorContext,
    pub observed_at: DateTime<Utc>,
}

impl ErrorLogUpsert {
    /// A fresh entry for this request.
    pub fn into_entry(self, id: u64) -> ErrorLogEntry {
        ErrorLogEntry {
            id,
            device_ip: self.key.device_ip,
            category: self.key.category,
            code: self.code,
            message: self.message,
            first_occurred_at: self.observed_at,
            last_occurred_at: self.observed_at,
            is_read: false,
            read_at: None,
            context: self.context,
        }
    }

    /// Refresh an existing entry in place. `first_occurred_at` is kept and
    /// the entry becomes unread again.
    pub fn apply_to(self, entry: &mut ErrorLogEntry) {
        entry.code = self.code;
        entry.message = self.message;
        entry.last_occurred_at = self.observed_at;
        entry.is_read = false;
        entry.context = self.context;
    }
}
