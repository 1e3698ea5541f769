// ── Periodic collector ──
//
// Drives aggregation passes on a fixed interval. Passes never overlap:
// the timer loop and `run_once` share one pass mutex, and a tick that
// finds it held is skipped. The store is flushed after every pass and
// once more at shutdown, after the in-flight pass has finished.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregate::{DashboardAggregator, PassReport};
use crate::error::CoreError;
use crate::source::MetricsSource;
use crate::store::Store;

/// Scheduler lifecycle as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollectorState {
    /// Waiting for the next tick.
    Idle,
    /// A pass is in flight.
    Running,
    /// Shut down; the store has been flushed.
    Stopped,
}

pub struct Collector<M, S> {
    inner: Arc<CollectorInner<M, S>>,
}

impl<M, S> Clone for Collector<M, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CollectorInner<M, S> {
    aggregator: DashboardAggregator<M, S>,
    interval: Duration,
    state: watch::Sender<CollectorState>,
    last_report: watch::Sender<Option<Arc<PassReport>>>,
    pass_lock: Mutex<()>,
    /// Cancels the current timer loop; replaced on restart.
    cancel: Mutex<CancellationToken>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<M: MetricsSource, S: Store> Collector<M, S> {
    pub fn new(aggregator: DashboardAggregator<M, S>, interval: Duration) -> Self {
        let (state, _) = watch::channel(CollectorState::Idle);
        let (last_report, _) = watch::channel(None);

        Self {
            inner: Arc::new(CollectorInner {
                aggregator,
                interval,
                state,
                last_report,
                pass_lock: Mutex::new(()),
                cancel: Mutex::new(CancellationToken::new()),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn aggregator(&self) -> &DashboardAggregator<M, S> {
        &self.inner.aggregator
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the timer loop. The first pass runs immediately.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            return Err(CoreError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        *self.inner.cancel.lock().await = cancel.clone();
        self.inner.state.send_replace(CollectorState::Idle);

        *task = Some(tokio::spawn(collect_task(self.clone(), cancel)));
        info!(interval = ?self.inner.interval, "collector started");
        Ok(())
    }

    /// Stop the timer, let any in-flight pass finish, then flush the store.
    pub async fn stop(&self) -> Result<(), CoreError> {
        self.inner.cancel.lock().await.cancel();

        if let Some(handle) = self.inner.task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "collector task ended abnormally");
            }
        }

        // A manual pass may still hold the lock.
        let _guard = self.inner.pass_lock.lock().await;
        self.inner.state.send_replace(CollectorState::Stopped);
        self.inner.aggregator.store().flush()?;
        info!("collector stopped");
        Ok(())
    }

    /// Run one pass now, waiting for any pass already in flight.
    pub async fn run_once(&self) -> Arc<PassReport> {
        let _guard = self.inner.pass_lock.lock().await;
        self.execute_pass().await
    }

    /// Timer entry point: skip if a pass is already in flight.
    async fn tick(&self) {
        let Ok(_guard) = self.inner.pass_lock.try_lock() else {
            debug!("previous pass still running, skipping tick");
            return;
        };
        self.execute_pass().await;
    }

    async fn execute_pass(&self) -> Arc<PassReport> {
        self.inner.state.send_replace(CollectorState::Running);

        let mut report = self.inner.aggregator.run_pass().await;
        if let Err(e) = self.inner.aggregator.store().flush() {
            warn!(error = %e, "failed to flush store after pass");
            report.store_failures += 1;
        }
        let report = Arc::new(report);
        info!(
            devices = report.summary.total_devices,
            active = report.summary.active_devices,
            samples = report.samples,
            discarded = report.discarded_samples,
            failed_queries = report.failed_queries.len(),
            created = report.error_logs_created,
            refreshed = report.error_logs_refreshed,
            store_failures = report.store_failures,
            elapsed_ms = report.elapsed_ms,
            "aggregation pass complete"
        );

        self.inner.last_report.send_replace(Some(Arc::clone(&report)));
        self.inner.state.send_if_modified(|state| {
            if *state == CollectorState::Running {
                *state = CollectorState::Idle;
                true
            } else {
                false
            }
        });
        report
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Subscribe to lifecycle changes.
    pub fn state(&self) -> watch::Receiver<CollectorState> {
        self.inner.state.subscribe()
    }

    pub fn current_state(&self) -> CollectorState {
        *self.inner.state.borrow()
    }

    /// Subscribe to pass reports as they complete.
    pub fn reports(&self) -> watch::Receiver<Option<Arc<PassReport>>> {
        self.inner.last_report.subscribe()
    }

    pub fn last_report(&self) -> Option<Arc<PassReport>> {
        self.inner.last_report.borrow().clone()
    }
}

// ── Background task ─────────────────────────────────────────────────

async fn collect_task<M: MetricsSource, S: Store>(
    collector: Collector<M, S>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(collector.inner.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => collector.tick().await,
        }
    }
    debug!("collector task exiting");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleetmon_api::VectorSample;

    use super::*;
    use crate::classify::CategoryClassifier;
    use crate::config::MetricQueries;
    use crate::model::MetricKind;
    use crate::source::testing::StaticSource;
    use crate::store::MemoryStore;

    const PERIOD: Duration = Duration::from_secs(5);

    fn collector_with(source: StaticSource, store: MemoryStore) -> Collector<StaticSource, MemoryStore> {
        let aggregator = DashboardAggregator::new(
            source,
            Arc::new(store),
            Arc::new(CategoryClassifier::default()),
            MetricQueries::default(),
        );
        Collector::new(aggregator, PERIOD)
    }

    fn passes(collector: &Collector<StaticSource, MemoryStore>) -> usize {
        collector.aggregator().source().calls() / MetricKind::ALL.len()
    }

    #[tokio::test(start_paused = true)]
    async fn first_pass_is_immediate_then_every_interval() {
        let collector = collector_with(StaticSource::default(), MemoryStore::new());
        let mut reports = collector.reports();

        collector.start().await.unwrap();
        reports.changed().await.unwrap();
        assert_eq!(passes(&collector), 1);

        tokio::time::sleep(Duration::from_secs(11)).await;
        collector.stop().await.unwrap();

        assert_eq!(passes(&collector), 3);
        assert_eq!(collector.current_state(), CollectorState::Stopped);
        assert!(collector.last_report().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let collector = collector_with(StaticSource::default(), MemoryStore::new());
        collector.start().await.unwrap();

        let err = collector.start().await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyRunning));

        collector.stop().await.unwrap();
        collector.start().await.unwrap();
        collector.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn manual_passes_never_overlap() {
        let delay = Duration::from_secs(8);
        let collector =
            collector_with(StaticSource::default().with_delay(delay), MemoryStore::new());

        let started = tokio::time::Instant::now();
        let (a, b) = tokio::join!(collector.run_once(), collector.run_once());

        assert!(started.elapsed() >= delay * 2);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(passes(&collector), 2);
        assert_eq!(collector.current_state(), CollectorState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn state_reports_running_during_pass() {
        let collector = collector_with(
            StaticSource::default().with_delay(Duration::from_secs(1)),
            MemoryStore::new(),
        );
        let mut state = collector.state();

        let background = collector.clone();
        let pass = tokio::spawn(async move { background.run_once().await });

        state.changed().await.unwrap();
        assert_eq!(*state.borrow_and_update(), CollectorState::Running);

        pass.await.unwrap();
        assert_eq!(collector.current_state(), CollectorState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn every_pass_reaches_the_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let collector = collector_with(StaticSource::default(), MemoryStore::open(&path).unwrap());
        let mut reports = collector.reports();

        collector.start().await.unwrap();
        reports.changed().await.unwrap();

        // Readable by another process while the collector keeps running.
        let reader = MemoryStore::open(&path).unwrap();
        assert!(reader.dashboard_summary().unwrap().is_some());
        assert_eq!(collector.last_report().unwrap().store_failures, 0);

        collector.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn operator_ack_survives_collector_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let q = MetricQueries::default();
        let faulty = |value| VectorSample::new([("instance", "10.0.0.5:5000")], 1_700_000_000.0, value);
        let source = StaticSource::default()
            .respond(&q.liveness, vec![faulty("1")])
            .respond(&q.camera, vec![faulty("2")]);
        let collector = collector_with(source, MemoryStore::open(&path).unwrap());

        collector.run_once().await;

        let operator = MemoryStore::open(&path).unwrap();
        let acked = operator.mark_error_log_read(1, chrono::Utc::now()).unwrap();
        operator.flush().unwrap();

        collector.stop().await.unwrap();

        let reopened = MemoryStore::open(&path).unwrap();
        let entry = reopened.error_log(1).unwrap().unwrap();
        assert!(entry.is_read);
        assert_eq!(entry.read_at, acked.read_at);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_pass_and_flushes_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let collector = collector_with(
            StaticSource::default().with_delay(Duration::from_secs(3)),
            MemoryStore::open(&path).unwrap(),
        );
        let mut state = collector.state();

        collector.start().await.unwrap();
        // Wait until the first pass is in flight, then stop mid-pass.
        state.wait_for(|s| *s == CollectorState::Running).await.unwrap();
        collector.stop().await.unwrap();

        assert_eq!(passes(&collector), 1);
        assert!(collector.last_report().is_some(), "in-flight pass finished");
        assert!(path.exists());
    }
}
