//! Device-state aggregation and error-log reconciliation engine.
//!
//! Sits between `fleetmon-api` and the CLI:
//!
//! - **Parsing** ([`parse`]) turns raw Prometheus vector samples into typed
//!   [`Sample`]s, dropping bad values one at a time.
//! - **Classification** ([`CategoryClassifier`]) maps a category status
//!   code to a normal/abnormal verdict and a label from [`CodeTables`].
//! - **Resolution** ([`DeviceStateResolver`]) folds every scrape target of
//!   one IP into a single [`DeviceSnapshot`] with an order-independent
//!   tie-break.
//! - **Reconciliation** ([`ErrorLogReconciler`]) opens or refreshes one
//!   [`ErrorLogEntry`] per (device, category) through the store's atomic
//!   keyed upsert.
//! - **Aggregation** ([`DashboardAggregator`]) runs one full pass and
//!   rebuilds the [`DashboardSummary`] row, returning a [`PassReport`].
//! - **Scheduling** ([`Collector`]) drives passes on an interval with
//!   skip-on-overlap semantics and graceful shutdown.
//! - **Storage** ([`Store`], [`MemoryStore`]) keeps snapshots, entries and
//!   the summary, optionally persisted to a JSON state file.

pub mod aggregate;
pub mod classify;
pub mod collector;
pub mod config;
pub mod error;
pub mod model;
pub mod parse;
pub mod reconcile;
pub mod resolve;
pub mod source;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use aggregate::{DashboardAggregator, FailedQuery, PassReport};
pub use classify::{CategoryClassifier, CodeTables, Verdict};
pub use collector::{Collector, CollectorState};
pub use config::{CollectorConfig, MetricQueries, TlsVerification};
pub use error::CoreError;
pub use parse::{DiscardReason, ParsedBatch};
pub use reconcile::{ErrorLogReconciler, ReconcileOutcome};
pub use resolve::DeviceStateResolver;
pub use source::{MetricsSource, connect};
pub use store::{MemoryStore, Store, StoreError, UpsertOutcome};

pub use fleetmon_api::{PrometheusClient, VectorSample};

pub use model::{
    Category, DashboardSummary, DeviceSnapshot, EntryState, ErrorContext, ErrorLogEntry,
    ErrorLogKey, ErrorLogUpsert, MetricKind, PerCategory, Sample, SampleValue, StatusCounts,
};
