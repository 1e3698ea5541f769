// ── Aggregation pass ──
//
// One pass: fetch every query concurrently, parse, resolve one snapshot
// per IP, persist snapshots, reconcile error logs, then rebuild and save
// the summary row. Failures are scoped: a failed query contributes no
// samples, a failed write is counted and skipped, and the pass always
// completes with a report.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use fleetmon_api::VectorSample;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::CategoryClassifier;
use crate::config::MetricQueries;
use crate::model::{DashboardSummary, DeviceSnapshot, MetricKind, PerCategory, Sample, StatusCounts, SUMMARY_ID};
use crate::parse::{parse_batch, resolve_ip};
use crate::reconcile::{ErrorLogReconciler, ReconcileOutcome};
use crate::resolve::DeviceStateResolver;
use crate::source::MetricsSource;
use crate::store::Store;

/// A query that failed during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedQuery {
    pub kind: MetricKind,
    pub query: String,
    pub error: String,
}

/// Structured outcome of one aggregation pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub summary: DashboardSummary,
    pub summary_saved: bool,
    pub failed_queries: Vec<FailedQuery>,
    pub samples: usize,
    pub discarded_samples: usize,
    pub snapshots_written: usize,
    pub error_logs_created: usize,
    pub error_logs_refreshed: usize,
    pub store_failures: usize,
}

pub struct DashboardAggregator<M, S> {
    source: M,
    store: Arc<S>,
    resolver: DeviceStateResolver,
    reconciler: ErrorLogReconciler<S>,
    queries: MetricQueries,
}

impl<M: MetricsSource, S: Store> DashboardAggregator<M, S> {
    pub fn new(
        source: M,
        store: Arc<S>,
        classifier: Arc<CategoryClassifier>,
        queries: MetricQueries,
    ) -> Self {
        Self {
            source,
            resolver: DeviceStateResolver::new(Arc::clone(&classifier)),
            reconciler: ErrorLogReconciler::new(Arc::clone(&store), classifier),
            store,
            queries,
        }
    }

    pub fn source(&self) -> &M {
        &self.source
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn reconciler(&self) -> &ErrorLogReconciler<S> {
        &self.reconciler
    }

    /// Run one aggregation pass.
    pub async fn run_pass(&self) -> PassReport {
        let started = Instant::now();
        let now = Utc::now();

        let (batches, failed_queries) = self.fetch_all().await;

        let mut samples = Vec::new();
        let mut discarded_samples = 0;
        for (kind, raws) in batches {
            let batch = parse_batch(kind, &raws);
            discarded_samples += batch.discarded.len();
            samples.extend(batch.samples);
        }

        let snapshots = self.resolver.resolve(&samples);

        let mut report = PassReport {
            started_at: now,
            elapsed_ms: 0,
            summary: summarize(&samples, now),
            summary_saved: false,
            failed_queries,
            samples: samples.len(),
            discarded_samples,
            snapshots_written: 0,
            error_logs_created: 0,
            error_logs_refreshed: 0,
            store_failures: 0,
        };

        for snapshot in &snapshots {
            self.persist_snapshot(snapshot, now, &mut report);
        }

        match self.store.save_dashboard_summary(report.summary.clone()) {
            Ok(()) => report.summary_saved = true,
            Err(e) => {
                warn!(error = %e, "failed to save dashboard summary");
                report.store_failures += 1;
            }
        }

        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        report
    }

    /// Issue every query concurrently. A failure is logged and yields no
    /// samples for that kind.
    async fn fetch_all(&self) -> (Vec<(MetricKind, Vec<VectorSample>)>, Vec<FailedQuery>) {
        let fetches = MetricKind::ALL.map(|kind| {
            let query = self.queries.for_kind(kind);
            async move { (kind, query, self.source.query_instant(query).await) }
        });

        let mut batches = Vec::with_capacity(MetricKind::ALL.len());
        let mut failed = Vec::new();
        for (kind, query, result) in join_all(fetches).await {
            match result {
                Ok(raws) => {
                    debug!(%kind, count = raws.len(), "query returned");
                    batches.push((kind, raws));
                }
                Err(e) => {
                    warn!(%kind, %query, error = %e, "metrics query failed, treating as empty");
                    failed.push(FailedQuery {
                        kind,
                        query: query.to_owned(),
                        error: e.to_string(),
                    });
                }
            }
        }
        (batches, failed)
    }

    fn persist_snapshot(&self, snapshot: &DeviceSnapshot, now: DateTime<Utc>, report: &mut PassReport) {
        match self.store.upsert_device_snapshot(snapshot.clone()) {
            Ok(()) => report.snapshots_written += 1,
            Err(e) => {
                warn!(ip = %snapshot.ip, error = %e, "failed to save device snapshot");
                report.store_failures += 1;
            }
        }

        for (category, result) in self.reconciler.reconcile_snapshot(snapshot, now) {
            match result {
                Ok(ReconcileOutcome::Created { .. }) => report.error_logs_created += 1,
                Ok(ReconcileOutcome::Refreshed { .. }) => report.error_logs_refreshed += 1,
                Ok(ReconcileOutcome::Unchanged) => {}
                Err(e) => {
                    warn!(ip = %snapshot.ip, %category, error = %e, "failed to write error log");
                    report.store_failures += 1;
                }
            }
        }
    }
}

/// Build the summary row from this pass's samples.
///
/// Device totals count distinct IPs with a liveness sample, and an IP is
/// active when any of its `up` samples reads 1, whichever port it came
/// from. Category counts are per sample, not per IP.
pub fn summarize(samples: &[Sample], now: DateTime<Utc>) -> DashboardSummary {
    let mut counts: PerCategory<StatusCounts> = PerCategory::default();
    let mut liveness: BTreeMap<&str, bool> = BTreeMap::new();
    let mut cpu = Vec::new();
    let mut memory = Vec::new();

    for sample in samples {
        match sample.kind {
            MetricKind::Liveness => {
                let up = sample.value.as_code() == Some(1);
                *liveness.entry(resolve_ip(&sample.instance)).or_default() |= up;
            }
            MetricKind::Status(category) => {
                if let Some(code) = sample.value.as_code() {
                    counts
                        .get_mut(category)
                        .record(CategoryClassifier::is_abnormal(category, code));
                }
            }
            MetricKind::CpuUsage => cpu.push(sample.value.as_f64()),
            MetricKind::MemoryUsage => memory.push(sample.value.as_f64()),
            MetricKind::OcrSeconds => {}
        }
    }

    let total = to_u32(liveness.len());
    let active = to_u32(liveness.values().filter(|up| **up).count());

    DashboardSummary {
        id: SUMMARY_ID,
        total_devices: total,
        active_devices: active,
        inactive_devices: total - active,
        counts,
        avg_cpu_usage: mean(&cpu),
        avg_memory_usage: mean(&memory),
        last_updated: now,
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
