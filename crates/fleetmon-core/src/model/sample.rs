// ── Typed metric samples ──
//
// What the parser produces from a raw vector sample. Samples live for one
// aggregation pass and are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;

/// Which query a sample came from, and therefore how its value parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Scrape-target liveness (`up`): 1 online, anything else offline.
    Liveness,
    /// A category status code.
    Status(Category),
    CpuUsage,
    MemoryUsage,
    /// Seconds since the last successful OCR read.
    OcrSeconds,
}

impl MetricKind {
    /// Every query issued by one aggregation pass.
    pub const ALL: [MetricKind; 8] = [
        Self::Liveness,
        Self::Status(Category::Camera),
        Self::Status(Category::Hdmi),
        Self::Status(Category::Ac),
        Self::Status(Category::Dc),
        Self::CpuUsage,
        Self::MemoryUsage,
        Self::OcrSeconds,
    ];

    /// Integer-valued kinds reject fractional values; gauges keep them.
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::CpuUsage | Self::MemoryUsage)
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Liveness => f.write_str("liveness"),
            Self::Status(category) => write!(f, "{category}"),
            Self::CpuUsage => f.write_str("cpu"),
            Self::MemoryUsage => f.write_str("memory"),
            Self::OcrSeconds => f.write_str("ocr"),
        }
    }
}

/// A parsed sample value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Integer(i64),
    Float(f64),
}

impl SampleValue {
    /// The integer value, if this is an integer sample.
    pub fn as_code(self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(v),
            Self::Float(_) => None,
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

/// One typed observation for one scrape target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// `<ip>:<port>` scrape-target label (or `"unknown"`).
    pub instance: String,
    pub kind: MetricKind,
    pub value: SampleValue,
    pub timestamp: DateTime<Utc>,
}
