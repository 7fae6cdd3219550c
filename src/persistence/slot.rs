//! Local durable key-value slots.
//!
//! The browser editor keeps its auto-save and session state in local storage.
//! `LocalSlot` abstracts that store so the managers work the same against an
//! in-memory map (tests, wasm glue) or a directory on disk (CLI).

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{EditorError, EditorResult};

/// A process-local persistent string store.
pub trait LocalSlot: Send + Sync {
    /// Reads the value under `key`, `None` when absent.
    fn load(&self, key: &str) -> EditorResult<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    fn store(&self, key: &str, value: &str) -> EditorResult<()>;

    /// Deletes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> EditorResult<()>;
}

// =============================================================================
// MEMORY SLOT
// =============================================================================

/// In-memory slot.
#[derive(Debug, Default)]
pub struct MemorySlot {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> EditorError {
    EditorError::storage("memory slot lock poisoned")
}

impl LocalSlot for MemorySlot {
    fn load(&self, key: &str) -> EditorResult<Option<String>> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> EditorResult<()> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> EditorResult<()> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE SLOT
// =============================================================================

/// One file per key inside a directory.
///
/// Keys are sanitized into file names; `:` and `/` become `_`.
#[derive(Debug, Clone)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    /// Opens (and creates if needed) a slot directory.
    pub fn open(dir: impl AsRef<Path>) -> EditorResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| EditorError::storage(format!("create {}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| match c {
                ':' | '/' | '\\' => '_',
                c => c,
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl LocalSlot for FileSlot {
    fn load(&self, key: &str) -> EditorResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EditorError::storage(format!("read {}: {}", path.display(), e))),
        }
    }

    fn store(&self, key: &str, value: &str) -> EditorResult<()> {
        let path = self.path_for(key);
        // atomic replace
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .map_err(|e| EditorError::storage(format!("write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| EditorError::storage(format!("rename {}: {}", path.display(), e)))?;
        debug!(key, bytes = value.len(), "slot stored");
        Ok(())
    }

    fn remove(&self, key: &str) -> EditorResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EditorError::storage(format!("remove {}: {}", path.display(), e))),
        }
    }
}
