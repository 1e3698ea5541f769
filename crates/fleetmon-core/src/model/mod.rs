// ── Domain model ──

pub mod category;
pub mod error_log;
pub mod sample;
pub mod snapshot;
pub mod summary;

pub use category::{Category, PerCategory};
pub use error_log::{EntryState, ErrorContext, ErrorLogEntry, ErrorLogKey, ErrorLogUpsert};
pub use sample::{MetricKind, Sample, SampleValue};
pub use snapshot::{DeviceSnapshot, UNKNOWN_STATUS};
pub use summary::{DashboardSummary, SUMMARY_ID, StatusCounts};
