//! AutoSaveManager: periodic crash-recovery snapshots of the element store.
//!
//! One record per design key. The record is the canvas snapshot plus a timestamp,
//! element count and format version, written as JSON into a `LocalSlot`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::slot::LocalSlot;
use crate::canvas::model::{CanvasSize, CanvasSnapshot};
use crate::canvas::store::ElementStore;
use crate::config::EditorConfig;
use crate::error::EditorResult;

/// Format version written into every record.
pub const AUTOSAVE_VERSION: &str = "1.0";

// =============================================================================
// RECORD TYPES
// =============================================================================

/// What is stored in the slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoSaveRecord {
    #[serde(flatten)]
    pub snapshot: CanvasSnapshot,

    /// Unix milliseconds.
    pub saved_at: i64,

    /// Older records omit this; it is derived from the elements then.
    #[serde(default)]
    pub element_count: Option<usize>,

    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    AUTOSAVE_VERSION.to_string()
}

impl AutoSaveRecord {
    pub fn new(snapshot: CanvasSnapshot, saved_at: DateTime<Utc>) -> Self {
        let count = snapshot.elements.len();
        Self {
            snapshot,
            saved_at: saved_at.timestamp_millis(),
            element_count: Some(count),
            version: default_version(),
        }
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.saved_at)
    }

    pub fn element_count(&self) -> usize {
        self.element_count.unwrap_or(self.snapshot.elements.len())
    }

    /// True when the record is older than `max_age` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Option<Duration>) -> bool {
        match (max_age, self.saved_at()) {
            (Some(max_age), Some(saved_at)) => now - saved_at > max_age,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Metadata about the stored record, read without touching the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedInfo {
    pub saved_at: DateTime<Utc>,
    pub element_count: usize,
    pub canvas_size: CanvasSize,
}

impl fmt::Display for SavedInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} elements on {} saved {}",
            self.element_count,
            self.canvas_size,
            self.saved_at.to_rfc3339()
        )
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Saves and restores one design's auto-save record.
pub struct AutoSaveManager {
    slot: Arc<dyn LocalSlot>,
    key: String,
    interval: Duration,
    max_age: Option<Duration>,
    last_save_at: DateTime<Utc>,
    last_saved_revision: Option<u64>,
}

impl AutoSaveManager {
    /// Creates a manager writing under `key` with a 30 second interval and no expiry.
    pub fn new(slot: Arc<dyn LocalSlot>, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
            interval: Duration::seconds(30),
            max_age: None,
            last_save_at: Utc::now(),
            last_saved_revision: None,
        }
    }

    /// Creates a manager for `design_key` using the configured key prefix, interval and expiry.
    pub fn from_config(slot: Arc<dyn LocalSlot>, config: &EditorConfig, design_key: &str) -> Self {
        Self::new(slot, config.autosave_key(design_key))
            .with_interval(Duration::seconds(config.autosave_interval_secs as i64))
            .with_max_age(
                config
                    .autosave_max_age_secs
                    .map(|secs| Duration::seconds(secs as i64)),
            )
    }

    /// Builder: Set the periodic save interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Builder: Records older than `max_age` are treated as absent.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Time of the last successful save, or of construction.
    pub fn last_save_at(&self) -> DateTime<Utc> {
        self.last_save_at
    }

    /// True when the store changed since the last save or restore.
    pub fn is_dirty(&self, store: &ElementStore) -> bool {
        self.last_saved_revision != Some(store.revision())
    }

    // =========================================================================
    // SAVE / RESTORE
    // =========================================================================

    /// Writes the store's current state, overwriting any previous record.
    pub fn save(&mut self, store: &ElementStore) -> EditorResult<()> {
        self.save_at(store, Utc::now())
    }

    /// `save` with an explicit timestamp.
    pub fn save_at(&mut self, store: &ElementStore, now: DateTime<Utc>) -> EditorResult<()> {
        let record = AutoSaveRecord::new(store.to_snapshot(), now);
        let json = serde_json::to_string(&record)?;
        self.slot.store(&self.key, &json)?;
        self.last_save_at = now;
        self.last_saved_revision = Some(store.revision());
        debug!(key = %self.key, elements = record.element_count(), "auto-saved");
        Ok(())
    }

    /// Periodic trigger. Saves when the interval has elapsed, the store is dirty
    /// and the canvas is not empty. Returns whether a save happened.
    pub fn tick(&mut self, store: &ElementStore, now: DateTime<Utc>) -> EditorResult<bool> {
        if now - self.last_save_at < self.interval {
            return Ok(false);
        }
        if !self.is_dirty(store) || store.is_empty() {
            return Ok(false);
        }
        self.save_at(store, now)?;
        Ok(true)
    }

    /// Replaces the store's elements, size and background with the saved record.
    ///
    /// Returns `false` when no valid, unexpired record exists.
    pub fn restore(&mut self, store: &mut ElementStore) -> EditorResult<bool> {
        self.restore_sized(store, None)
    }

    /// Like [`restore`](Self::restore), but leaves the store untouched when the
    /// record was saved at a size other than `expected`.
    pub fn restore_sized(
        &mut self,
        store: &mut ElementStore,
        expected: Option<CanvasSize>,
    ) -> EditorResult<bool> {
        let Some(record) = self.read_record(Utc::now())? else {
            return Ok(false);
        };
        if let Some(expected) = expected {
            let saved = record.snapshot.size();
            if saved != expected {
                warn!(key = %self.key, %saved, %expected, "auto-save record is for another canvas size");
                return Ok(false);
            }
        }
        if let Err(e) = store.load_snapshot(&record.snapshot) {
            warn!(key = %self.key, error = %e, "auto-save record has an invalid canvas");
            return Ok(false);
        }
        self.last_saved_revision = Some(store.revision());
        info!(key = %self.key, elements = store.len(), "restored auto-save");
        Ok(true)
    }

    /// Deletes the record.
    pub fn clear(&mut self) -> EditorResult<()> {
        self.slot.remove(&self.key)?;
        self.last_saved_revision = None;
        debug!(key = %self.key, "auto-save cleared");
        Ok(())
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// True when a parseable, unexpired record exists.
    pub fn has_saved_data(&self) -> bool {
        self.has_saved_data_at(Utc::now())
    }

    pub fn has_saved_data_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.read_record(now), Ok(Some(_)))
    }

    /// Metadata of the stored record, `None` when there is nothing to restore.
    pub fn get_saved_info(&self) -> Option<SavedInfo> {
        self.get_saved_info_at(Utc::now())
    }

    pub fn get_saved_info_at(&self, now: DateTime<Utc>) -> Option<SavedInfo> {
        let record = self.read_record(now).ok()??;
        Some(SavedInfo {
            saved_at: record.saved_at()?,
            element_count: record.element_count(),
            canvas_size: record.snapshot.size(),
        })
    }

    /// Raw record, ignoring expiry.
    pub fn peek(&self) -> EditorResult<Option<AutoSaveRecord>> {
        let Some(json) = self.slot.load(&self.key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(key = %self.key, error = %e, "ignoring unreadable auto-save record");
                Ok(None)
            }
        }
    }

    fn read_record(&self, now: DateTime<Utc>) -> EditorResult<Option<AutoSaveRecord>> {
        Ok(self
            .peek()?
            .filter(|record| !record.is_expired(now, self.max_age)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::model::{Background, Element, ShapeType};
    use crate::persistence::slot::MemorySlot;

    fn three_elements() -> ElementStore {
        let mut store = ElementStore::new();
        store.add_element(Element::text("one").with_id("a"));
        store.add_element(Element::shape(ShapeType::Star).with_id("b"));
        store.add_element(Element::image("photo.png").with_id("c"));
        store.set_background(Background::solid("#abcdef"));
        store
    }

    #[test]
    fn test_restore_after_reload() {
        let slot: Arc<dyn LocalSlot> = Arc::new(MemorySlot::new());
        let store = three_elements();
        AutoSaveManager::new(slot.clone(), "misgarot_autosave:d1")
            .save(&store)
            .unwrap();

        // simulated reload: fresh manager and store over the same slot
        let mut manager = AutoSaveManager::new(slot, "misgarot_autosave:d1");
        assert!(manager.has_saved_data());
        let info = manager.get_saved_info().unwrap();
        assert_eq!(info.element_count, 3);
        assert_eq!(info.canvas_size, CanvasSize::LANDSCAPE);

        let mut restored = ElementStore::with_size(CanvasSize::PORTRAIT);
        assert!(manager.restore(&mut restored).unwrap());
        assert_eq!(restored.elements(), store.elements());
        assert_eq!(restored.size(), CanvasSize::LANDSCAPE);
        assert_eq!(restored.background().color, "#abcdef");
        assert!(!manager.is_dirty(&restored));
    }

    #[test]
    fn test_nothing_to_restore() {
        let slot: Arc<dyn LocalSlot> = Arc::new(MemorySlot::new());
        let mut manager = AutoSaveManager::new(slot, "k");
        assert!(!manager.has_saved_data());
        assert!(manager.get_saved_info().is_none());
        let mut store = ElementStore::new();
        assert!(!manager.restore(&mut store).unwrap());
    }

    #[test]
    fn test_corrupt_record_is_ignored() {
        let slot = Arc::new(MemorySlot::new());
        slot.store("k", "{not json").unwrap();
        let mut manager = AutoSaveManager::new(slot, "k");
        assert!(!manager.has_saved_data());
        let mut store = ElementStore::new();
        assert!(!manager.restore(&mut store).unwrap());
    }

    #[test]
    fn test_clear() {
        let slot: Arc<dyn LocalSlot> = Arc::new(MemorySlot::new());
        let mut manager = AutoSaveManager::new(slot, "k");
        manager.save(&three_elements()).unwrap();
        manager.clear().unwrap();
        assert!(!manager.has_saved_data());
    }

    #[test]
    fn test_expired_record_is_absent() {
        let slot: Arc<dyn LocalSlot> = Arc::new(MemorySlot::new());
        let mut manager =
            AutoSaveManager::new(slot, "k").with_max_age(Some(Duration::days(7)));
        let saved = Utc::now() - Duration::days(8);
        manager.save_at(&three_elements(), saved).unwrap();

        assert!(!manager.has_saved_data());
        assert!(manager.has_saved_data_at(saved + Duration::days(1)));
        assert!(manager.peek().unwrap().is_some());
    }

    #[test]
    fn test_tick_respects_interval_and_dirty_flag() {
        let slot: Arc<dyn LocalSlot> = Arc::new(MemorySlot::new());
        let mut manager =
            AutoSaveManager::new(slot, "k").with_interval(Duration::seconds(30));
        let start = manager.last_save_at();
        let mut store = ElementStore::new();

        // empty canvas never saves
        assert!(!manager.tick(&store, start + Duration::seconds(31)).unwrap());

        store.add_element(Element::text("x"));
        assert!(!manager.tick(&store, start + Duration::seconds(10)).unwrap());
        assert!(manager.tick(&store, start + Duration::seconds(31)).unwrap());

        // clean store does not save again
        assert!(!manager.tick(&store, start + Duration::seconds(90)).unwrap());

        store.add_element(Element::text("y"));
        assert!(manager.tick(&store, start + Duration::seconds(90)).unwrap());
        assert_eq!(manager.get_saved_info_at(start + Duration::seconds(91)).unwrap().element_count, 2);
    }

    #[test]
    fn test_record_json_shape() {
        let record = AutoSaveRecord::new(three_elements().to_snapshot(), Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["canvasWidth"], 2500);
        assert_eq!(json["elementCount"], 3);
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["backgroundType"], "solid");
        assert!(json["elements"].is_array());
    }

    #[test]
    fn test_reads_record_without_element_count() {
        let json = r##"{
            "elements": [{"type": "text", "x": 1, "y": 2, "text": "hi"}],
            "canvasWidth": 1875,
            "canvasHeight": 2500,
            "backgroundColor": "#ffffff",
            "backgroundType": "solid",
            "savedAt": 1700000000000,
            "version": "1.0"
        }"##;
        let record: AutoSaveRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.element_count(), 1);
        assert_eq!(record.snapshot.size(), CanvasSize::PORTRAIT);
    }

    #[test]
    fn test_restore_sized_skips_other_canvas() {
        let slot: Arc<dyn LocalSlot> = Arc::new(MemorySlot::new());
        let mut manager = AutoSaveManager::new(slot, "misgarot_autosave:d1");
        manager.save(&three_elements()).unwrap();

        let mut portrait = ElementStore::with_size(CanvasSize::PORTRAIT);
        assert!(!manager
            .restore_sized(&mut portrait, Some(CanvasSize::PORTRAIT))
            .unwrap());
        assert!(portrait.is_empty());
        assert_eq!(portrait.size(), CanvasSize::PORTRAIT);

        assert!(manager
            .restore_sized(&mut portrait, Some(CanvasSize::LANDSCAPE))
            .unwrap());
        assert_eq!(portrait.len(), 3);
    }
}
