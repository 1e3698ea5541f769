// ── Error-log reconciliation ──
//
// Decides, per (device IP, category), whether an observation opens a new
// entry, refreshes the open one, or leaves it alone. The decision itself
// is delegated to the store's atomic keyed upsert.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::classify::CategoryClassifier;
use crate::error::CoreError;
use crate::model::{Category, DeviceSnapshot, ErrorContext, ErrorLogEntry, ErrorLogKey, ErrorLogUpsert};
use crate::store::{Store, StoreError, UpsertOutcome};

/// What reconciling one observation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Created { id: u64 },
    Refreshed { id: u64 },
    /// Normal reading: nothing written.
    Unchanged,
}

impl From<UpsertOutcome> for ReconcileOutcome {
    fn from(outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Inserted(id) => Self::Created { id },
            UpsertOutcome::Updated(id) => Self::Refreshed { id },
        }
    }
}

impl ErrorContext {
    /// Capture the readings of `snapshot`.
    pub fn from_snapshot(snapshot: &DeviceSnapshot) -> Self {
        Self {
            camera_value: snapshot.value(Category::Camera),
            ocr_value_seconds: snapshot.ocr_value_seconds,
            hdmi_value: snapshot.value(Category::Hdmi),
            ac_value: snapshot.value(Category::Ac),
            dc_value: snapshot.value(Category::Dc),
        }
    }
}

pub struct ErrorLogReconciler<S> {
    store: Arc<S>,
    classifier: Arc<CategoryClassifier>,
}

impl<S> Clone for ErrorLogReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<S: Store> ErrorLogReconciler<S> {
    pub fn new(store: Arc<S>, classifier: Arc<CategoryClassifier>) -> Self {
        Self { store, classifier }
    }

    /// Reconcile one observed `code` for (`device_ip`, `category`).
    pub fn reconcile(
        &self,
        device_ip: &str,
        category: Category,
        code: i64,
        context: ErrorContext,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, StoreError> {
        let verdict = self.classifier.classify(category, code);
        if !verdict.is_abnormal {
            return Ok(ReconcileOutcome::Unchanged);
        }

        let outcome: ReconcileOutcome = self
            .store
            .upsert_error_log(ErrorLogUpsert {
                key: ErrorLogKey::new(device_ip, category),
                code,
                message: verdict.label,
                context,
                observed_at: now,
            })?
            .into();
        debug!(%device_ip, %category, code, ?outcome, "reconciled");
        Ok(outcome)
    }

    /// Reconcile every reported category of `snapshot`.
    ///
    /// Each category is written independently; one failure does not stop
    /// the others.
    pub fn reconcile_snapshot(
        &self,
        snapshot: &DeviceSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<(Category, Result<ReconcileOutcome, StoreError>)> {
        let context = ErrorContext::from_snapshot(snapshot);
        snapshot
            .values
            .iter()
            .filter_map(|(category, code)| code.map(|code| (category, code)))
            .map(|(category, code)| {
                let result = self.reconcile(&snapshot.ip, category, code, context.clone(), now);
                (category, result)
            })
            .collect()
    }

    /// Acknowledge one entry by id.
    pub fn mark_read(&self, id: u64, now: DateTime<Utc>) -> Result<ErrorLogEntry, CoreError> {
        Ok(self.store.mark_error_log_read(id, now)?)
    }

    /// Acknowledge every unread entry; returns how many changed.
    pub fn mark_all_read(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        Ok(self.store.mark_all_error_logs_read(now)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{EntryState, PerCategory};
    use crate::store::MemoryStore;

    const IP: &str = "10.0.0.5";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, ErrorLogReconciler<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let reconciler =
            ErrorLogReconciler::new(Arc::clone(&store), Arc::new(CategoryClassifier::default()));
        (store, reconciler)
    }

    fn camera(reconciler: &ErrorLogReconciler<MemoryStore>, code: i64, secs: i64) -> ReconcileOutcome {
        let context = ErrorContext {
            camera_value: Some(code),
            ..ErrorContext::default()
        };
        reconciler
            .reconcile(IP, Category::Camera, code, context, at(secs))
            .unwrap()
    }

    #[test]
    fn first_abnormal_opens_unread_entry() {
        let (store, reconciler) = setup();

        assert_eq!(camera(&reconciler, 2, 100), ReconcileOutcome::Created { id: 1 });

        let entries = store.error_logs().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.device_ip, IP);
        assert_eq!(entry.code, 2);
        assert_eq!(entry.message, "no signal");
        assert_eq!(entry.state(), EntryState::OpenUnread);
        assert_eq!(entry.first_occurred_at, entry.last_occurred_at);
    }

    #[test]
    fn later_abnormal_refreshes_same_entry() {
        let (store, reconciler) = setup();
        camera(&reconciler, 2, 100);

        assert_eq!(camera(&reconciler, 1, 200), ReconcileOutcome::Refreshed { id: 1 });

        let entries = store.error_logs().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].code, 1);
        assert_eq!(entries[0].message, "clock stopped");
        assert_eq!(entries[0].first_occurred_at, at(100));
        assert_eq!(entries[0].last_occurred_at, at(200));
        assert_eq!(entries[0].context.camera_value, Some(1));
        assert!(!entries[0].is_read);
    }

    #[test]
    fn new_abnormal_after_ack_reopens() {
        let (store, reconciler) = setup();
        camera(&reconciler, 2, 100);
        reconciler.mark_read(1, at(150)).unwrap();
        assert_eq!(store.error_log(1).unwrap().unwrap().state(), EntryState::OpenRead);

        camera(&reconciler, 2, 200);

        assert_eq!(store.error_log(1).unwrap().unwrap().state(), EntryState::OpenUnread);
    }

    #[test]
    fn normal_reading_leaves_entry_untouched() {
        let (store, reconciler) = setup();
        camera(&reconciler, 3, 100);
        reconciler.mark_read(1, at(150)).unwrap();
        let before = store.error_log(1).unwrap().unwrap();

        assert_eq!(camera(&reconciler, 0, 200), ReconcileOutcome::Unchanged);

        assert_eq!(store.error_log(1).unwrap().unwrap(), before);
    }

    #[test]
    fn normal_reading_without_entry_writes_nothing() {
        let (store, reconciler) = setup();
        assert_eq!(camera(&reconciler, 0, 100), ReconcileOutcome::Unchanged);
        assert!(store.error_logs().unwrap().is_empty());
    }

    #[test]
    fn snapshot_reconciles_each_reported_category() {
        let (store, reconciler) = setup();
        let snapshot = DeviceSnapshot {
            ip: IP.into(),
            instance: format!("{IP}:5000"),
            is_online: true,
            values: PerCategory {
                camera: Some(0),
                hdmi: Some(2),
                ac: None,
                dc: Some(1),
            },
            cpu_usage: None,
            memory_usage: None,
            ocr_value_seconds: Some(42),
            status: "normal".into(),
            observed_at: at(100),
        };

        let results = reconciler.reconcile_snapshot(&snapshot, at(100));
        let outcomes: Vec<(Category, ReconcileOutcome)> =
            results.into_iter().map(|(c, r)| (c, r.unwrap())).collect();

        assert_eq!(
            outcomes,
            vec![
                (Category::Camera, ReconcileOutcome::Unchanged),
                (Category::Hdmi, ReconcileOutcome::Created { id: 1 }),
                (Category::Dc, ReconcileOutcome::Created { id: 2 }),
            ]
        );
        let dc = store.error_log(2).unwrap().unwrap();
        assert_eq!(dc.context.ocr_value_seconds, Some(42));
        assert_eq!(dc.context.hdmi_value, Some(2));
        assert_eq!(dc.context.ac_value, None);
    }

    #[test]
    fn mark_all_is_idempotent() {
        let (_store, reconciler) = setup();
        camera(&reconciler, 2, 100);
        assert_eq!(reconciler.mark_all_read(at(110)).unwrap(), 1);
        assert_eq!(reconciler.mark_all_read(at(120)).unwrap(), 0);
    }

    #[test]
    fn mark_read_missing_entry_is_not_found() {
        let (_store, reconciler) = setup();
        let err = reconciler.mark_read(5, at(0)).unwrap_err();
        assert!(matches!(err, CoreError::ErrorLogNotFound { id: 5 }));
    }
}
