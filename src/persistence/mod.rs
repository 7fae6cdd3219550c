//! Local persistence module.
//!
//! Durable key-value slots and the auto-save manager built on them.

pub mod autosave;
pub mod slot;

// Re-exports for convenience
pub use autosave::{AutoSaveManager, AutoSaveRecord, SavedInfo, AUTOSAVE_VERSION};
pub use slot::{FileSlot, LocalSlot, MemorySlot};
