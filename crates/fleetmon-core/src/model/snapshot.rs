// ── Device snapshot ──
//
// The at-most-one-per-IP view of a device after resolution. Persisted as
// the latest-state row for that IP and overwritten each pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::{Category, PerCategory};

/// Status label used when a device reported no camera code.
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub ip: String,
    /// Instance that won camera resolution for this IP.
    pub instance: String,
    pub is_online: bool,
    /// Raw status code per category, `None` when not reported.
    pub values: PerCategory<Option<i64>>,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub ocr_value_seconds: Option<i64>,
    /// Human-readable camera status.
    pub status: String,
    pub observed_at: DateTime<Utc>,
}

impl DeviceSnapshot {
    pub fn value(&self, category: Category) -> Option<i64> {
        *self.values.get(category)
    }
}
