// ── Dashboard summary ──
//
// The single rolling summary row, rebuilt from scratch each pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::PerCategory;

/// Fixed identity of the summary row.
pub const SUMMARY_ID: u8 = 1;

/// Normal/abnormal sample counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub normal: u32,
    pub abnormal: u32,
}

impl StatusCounts {
    pub fn record(&mut self, abnormal: bool) {
        if abnormal {
            self.abnormal += 1;
        } else {
            self.normal += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub id: u8,
    pub total_devices: u32,
    pub active_devices: u32,
    pub inactive_devices: u32,
    pub counts: PerCategory<StatusCounts>,
    pub avg_cpu_usage: f64,
    pub avg_memory_usage: f64,
    pub last_updated: DateTime<Utc>,
}

impl DashboardSummary {
    /// An all-zero summary stamped `at`.
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            id: SUMMARY_ID,
            total_devices: 0,
            active_devices: 0,
            inactive_devices: 0,
            counts: PerCategory::default(),
            avg_cpu_usage: 0.0,
            avg_memory_usage: 0.0,
            last_updated: at,
        }
    }

    /// Whether two summaries agree on everything except `last_updated`.
    pub fn same_figures(&self, other: &Self) -> bool {
        Self {
            last_updated: other.last_updated,
            ..self.clone()
        } == *other
    }
}
