//! In-process backend implementing every collaborator trait.
//!
//! Used for dry runs and tests. Individual operations can be made to fail to
//! exercise partial publish paths.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{
    NotificationKind, NotificationPayload, Notifier, ObjectStorage, RecordPatch, RecordStore,
    SnapshotRecord,
};
use crate::error::{EditorError, EditorResult};

#[derive(Debug, Default)]
struct State {
    records: HashMap<String, Vec<SnapshotRecord>>,
    uploads: Vec<(String, usize)>,
    sent: Vec<(NotificationKind, NotificationPayload)>,
    creates_before_failure: Option<usize>,
    fail_updates: bool,
    fail_uploads: bool,
    fail_notifications: bool,
}

/// Record store, object storage and notifier backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> EditorResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| EditorError::remote("memory backend lock poisoned"))
    }

    // =========================================================================
    // FAILURE INJECTION
    // =========================================================================

    /// Lets `n` more creates succeed, then fails every create.
    pub fn fail_creates_after(&self, n: usize) {
        if let Ok(mut state) = self.lock() {
            state.creates_before_failure = Some(n);
        }
    }

    pub fn fail_updates(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.fail_updates = fail;
        }
    }

    pub fn fail_uploads(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.fail_uploads = fail;
        }
    }

    pub fn fail_notifications(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.fail_notifications = fail;
        }
    }

    /// Clears every injected failure.
    pub fn heal(&self) {
        if let Ok(mut state) = self.lock() {
            state.creates_before_failure = None;
            state.fail_updates = false;
            state.fail_uploads = false;
            state.fail_notifications = false;
        }
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// All records of a collection in insertion order.
    pub fn records(&self, collection: &str) -> Vec<SnapshotRecord> {
        self.lock()
            .map(|state| state.records.get(collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Record by id within a collection.
    pub fn record(&self, collection: &str, id: &str) -> Option<SnapshotRecord> {
        self.records(collection)
            .into_iter()
            .find(|r| r.id.as_deref() == Some(id))
    }

    /// Inserts a record with a known id.
    pub fn insert(&self, collection: &str, record: SnapshotRecord) -> EditorResult<String> {
        let mut state = self.lock()?;
        let id = record
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut record = record;
        record.id = Some(id.clone());
        state
            .records
            .entry(collection.to_string())
            .or_default()
            .push(record);
        Ok(id)
    }

    /// Upload paths with their sizes.
    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.lock().map(|s| s.uploads.clone()).unwrap_or_default()
    }

    /// Notifications delivered so far.
    pub fn sent(&self) -> Vec<(NotificationKind, NotificationPayload)> {
        self.lock().map(|s| s.sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryBackend {
    async fn get(&self, collection: &str, id: &str) -> EditorResult<Option<SnapshotRecord>> {
        Ok(self.record(collection, id))
    }

    async fn create(&self, collection: &str, record: &SnapshotRecord) -> EditorResult<String> {
        {
            let mut state = self.lock()?;
            match state.creates_before_failure {
                Some(0) => {
                    return Err(EditorError::remote(format!("insert into {} failed", collection)))
                }
                Some(ref mut n) => *n -= 1,
                None => {}
            }
        }
        let mut record = record.clone();
        record.id = None;
        let id = self.insert(collection, record)?;
        debug!(collection, %id, "memory record created");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: &RecordPatch) -> EditorResult<()> {
        let mut state = self.lock()?;
        if state.fail_updates {
            return Err(EditorError::remote(format!("update of {} failed", id)));
        }
        let record = state
            .records
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r.id.as_deref() == Some(id)))
            .ok_or_else(|| EditorError::remote(format!("{} {} not found", collection, id)))?;
        patch.apply_to(record);
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> EditorResult<String> {
        let mut state = self.lock()?;
        if state.fail_uploads {
            return Err(EditorError::remote("upload failed"));
        }
        let full = format!("{}/{}", bucket, path);
        state.uploads.push((full.clone(), bytes.len()));
        Ok(format!("memory://{}", full))
    }
}

#[async_trait]
impl Notifier for MemoryBackend {
    async fn send(&self, kind: NotificationKind, payload: &NotificationPayload) -> EditorResult<()> {
        let mut state = self.lock()?;
        if state.fail_notifications {
            return Err(EditorError::remote("email service unavailable"));
        }
        state.sent.push((kind, payload.clone()));
        Ok(())
    }
}
