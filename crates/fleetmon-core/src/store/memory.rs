// ── In-memory store with optional state file ──
//
// One `DashMap` per table gives per-key locking: an acknowledgment and an
// aggregation write on different keys never contend, and the error-log
// upsert runs entirely under its key's shard lock. The summary row is
// swapped whole through `ArcSwap`. Flushing folds in acknowledgments
// another process wrote to the same state file, so a long-running
// collector never reverts an operator's `logs ack`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Store, StoreError, UpsertOutcome};
use crate::model::{DashboardSummary, DeviceSnapshot, ErrorLogEntry, ErrorLogKey, ErrorLogUpsert};

const STATE_VERSION: u32 = 1;

/// On-disk layout of the state file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateFile {
    version: u32,
    next_id: u64,
    #[serde(default)]
    devices: Vec<DeviceSnapshot>,
    #[serde(default)]
    error_logs: Vec<ErrorLogEntry>,
    #[serde(default)]
    summary: Option<DashboardSummary>,
}

pub struct MemoryStore {
    devices: DashMap<String, DeviceSnapshot>,
    error_logs: DashMap<ErrorLogKey, ErrorLogEntry>,
    /// Secondary index: entry id -> key.
    id_to_key: DashMap<u64, ErrorLogKey>,
    next_id: AtomicU64,
    summary: ArcSwapOption<DashboardSummary>,
    state_file: Option<PathBuf>,
    flush_lock: std::sync::Mutex<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("devices", &self.devices.len())
            .field("error_logs", &self.error_logs.len())
            .field("state_file", &self.state_file)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// A purely in-memory store; `flush` is a no-op.
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
            error_logs: DashMap::new(),
            id_to_key: DashMap::new(),
            next_id: AtomicU64::new(1),
            summary: ArcSwapOption::empty(),
            state_file: None,
            flush_lock: std::sync::Mutex::new(()),
        }
    }

    /// A store backed by `path`. Existing state is loaded; a missing file
    /// starts empty and is created on the first flush.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut store = Self::new();

        match std::fs::read(&path) {
            Ok(bytes) => {
                let state: StateFile =
                    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                        path: path.display().to_string(),
                        source,
                    })?;
                store.load(state);
                info!(
                    path = %path.display(),
                    devices = store.devices.len(),
                    error_logs = store.error_logs.len(),
                    "loaded state file"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file yet, starting empty");
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        }

        store.state_file = Some(path);
        Ok(store)
    }

    pub fn state_file(&self) -> Option<&Path> {
        self.state_file.as_deref()
    }

    fn load(&mut self, state: StateFile) {
        let mut next_id = state.next_id.max(1);
        for snapshot in state.devices {
            self.devices.insert(snapshot.ip.clone(), snapshot);
        }
        for entry in state.error_logs {
            next_id = next_id.max(entry.id + 1);
            self.id_to_key.insert(entry.id, entry.key());
            self.error_logs.insert(entry.key(), entry);
        }
        self.next_id = AtomicU64::new(next_id);
        self.summary = ArcSwapOption::new(state.summary.map(Arc::new));
    }

    fn snapshot_state(&self) -> StateFile {
        StateFile {
            version: STATE_VERSION,
            next_id: self.next_id.load(Ordering::SeqCst),
            devices: self.device_list(),
            error_logs: self.entry_list(),
            summary: self.summary.load_full().map(|s| (*s).clone()),
        }
    }

    fn device_list(&self) -> Vec<DeviceSnapshot> {
        let mut devices: Vec<DeviceSnapshot> =
            self.devices.iter().map(|r| r.value().clone()).collect();
        devices.sort_by(|a, b| a.ip.cmp(&b.ip));
        devices
    }

    fn entry_list(&self) -> Vec<ErrorLogEntry> {
        let mut entries: Vec<ErrorLogEntry> =
            self.error_logs.iter().map(|r| r.value().clone()).collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    /// Adopt acknowledgments another process wrote to `path` since we last
    /// looked. An on-disk read flag wins only when it is newer than this
    /// store's latest observation of the entry; a later abnormal
    /// observation keeps the entry unread.
    fn merge_acknowledgments(&self, path: &Path) -> usize {
        let on_disk: StateFile = match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "state file unreadable, not merging acknowledgments");
                    return 0;
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "state file unreadable, not merging acknowledgments");
                return 0;
            }
        };

        let mut merged = 0;
        for disk in on_disk.error_logs {
            let (true, Some(read_at)) = (disk.is_read, disk.read_at) else {
                continue;
            };
            let Some(mut entry) = self.error_logs.get_mut(&disk.key()) else {
                continue;
            };
            if entry.id == disk.id && read_at >= entry.last_occurred_at && entry.mark_read(read_at) {
                merged += 1;
            }
        }
        if merged > 0 {
            debug!(path = %path.display(), merged, "merged acknowledgments from state file");
        }
        merged
    }

    fn write_state_file(&self, path: &Path) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        let _guard = self
            .flush_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("flush lock poisoned".into()))?;

        self.merge_acknowledgments(path);

        let body = serde_json::to_vec_pretty(&self.snapshot_state()).map_err(|source| {
            StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            }
        })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        // Write-then-rename so a crash never leaves a half-written file.
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;

        debug!(path = %path.display(), "state file written");
        Ok(())
    }
}

impl Store for MemoryStore {
    fn upsert_device_snapshot(&self, snapshot: DeviceSnapshot) -> Result<(), StoreError> {
        self.devices.insert(snapshot.ip.clone(), snapshot);
        Ok(())
    }

    fn device_snapshots(&self) -> Result<Vec<DeviceSnapshot>, StoreError> {
        Ok(self.device_list())
    }

    fn upsert_error_log(&self, upsert: ErrorLogUpsert) -> Result<UpsertOutcome, StoreError> {
        // The shard lock is held for the whole decision, so two writers
        // racing on a new key produce one insert and one update.
        match self.error_logs.entry(upsert.key.clone()) {
            Entry::Occupied(mut occupied) => {
                let id = occupied.get().id;
                upsert.apply_to(occupied.get_mut());
                Ok(UpsertOutcome::Updated(id))
            }
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                self.id_to_key.insert(id, upsert.key.clone());
                vacant.insert(upsert.into_entry(id));
                Ok(UpsertOutcome::Inserted(id))
            }
        }
    }

    fn error_log(&self, id: u64) -> Result<Option<ErrorLogEntry>, StoreError> {
        let Some(key) = self.id_to_key.get(&id).map(|k| k.value().clone()) else {
            return Ok(None);
        };
        Ok(self.error_logs.get(&key).map(|r| r.value().clone()))
    }

    fn error_logs(&self) -> Result<Vec<ErrorLogEntry>, StoreError> {
        Ok(self.entry_list())
    }

    fn mark_error_log_read(
        &self,
        id: u64,
        at: DateTime<Utc>,
    ) -> Result<ErrorLogEntry, StoreError> {
        let key = self
            .id_to_key
            .get(&id)
            .map(|k| k.value().clone())
            .ok_or(StoreError::NotFound { id })?;
        let mut entry = self
            .error_logs
            .get_mut(&key)
            .ok_or(StoreError::NotFound { id })?;
        entry.mark_read(at);
        Ok(entry.value().clone())
    }

    fn mark_all_error_logs_read(&self, at: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut changed = 0;
        for mut entry in self.error_logs.iter_mut() {
            if entry.mark_read(at) {
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn save_dashboard_summary(&self, summary: DashboardSummary) -> Result<(), StoreError> {
        self.summary.store(Some(Arc::new(summary)));
        Ok(())
    }

    fn dashboard_summary(&self) -> Result<Option<DashboardSummary>, StoreError> {
        Ok(self.summary.load_full().map(|s| (*s).clone()))
    }

    fn flush(&self) -> Result<(), StoreError> {
        match &self.state_file {
            Some(path) => self.write_state_file(path),
            None => Ok(()),
        }
    }
}
