//! Misgarot - design core for dual-orientation magnet frames.
//!
//! A magnet frame is designed twice, once at 2500×1875 (landscape) and once at
//! 1875×2500 (portrait). This crate owns everything between the UI and the
//! backend:
//!
//! - **Element store**: the canvas being edited, with selection, z-order,
//!   clipboard and a bounded undo history
//! - **Auto-save**: periodic snapshots in a durable local slot, restored after a crash
//! - **Design session**: both orientation snapshots in one Automerge document, so
//!   moving back and forth between orientations never duplicates or loses work
//! - **Transform**: proportional landscape → portrait projection of user elements;
//!   locked frame elements are never projected implicitly
//! - **Publishing**: paired frame templates and finished client designs, pushed
//!   through narrow record / storage / notifier traits
//!
//! # Example
//!
//! ```rust
//! use misgarot::{calculate_portrait_from_landscape, CanvasSize, Element};
//!
//! let landscape = vec![Element::text("Mazal Tov").with_id("t1").at(1250.0, 937.5)];
//! let portrait =
//!     calculate_portrait_from_landscape(&landscape, CanvasSize::LANDSCAPE, CanvasSize::PORTRAIT)
//!         .unwrap();
//!
//! assert!((portrait[0].x - 937.5).abs() < 1e-9);
//! assert!((portrait[0].y - 1250.0).abs() < 1e-9);
//! assert_eq!(portrait[0].font_size(), Some(75.0));
//! ```

pub mod config;
pub mod error;

// Canvas and element store
pub mod canvas;

// Orientation session and transform
pub mod session;

// Local slots and auto-save
pub mod persistence;

// Remote collaborators
pub mod remote;

// Editor page controller
pub mod editor;

// Re-exports for convenience
pub use canvas::{
    Alignment, Background, BackgroundKind, CanvasSize, CanvasSnapshot, EditPolicy, Element,
    ElementKind, ElementPatch, ElementStore, Orientation, ShapeType,
};
pub use config::{EditorConfig, SupabaseConfig};
pub use editor::{
    EditorController, EditorMode, FinishDesignRequest, FinishOutcome, PublishFrameRequest,
    PublishOutcome, VisitState,
};
pub use error::{EditorError, EditorResult};
pub use persistence::{AutoSaveManager, AutoSaveRecord, FileSlot, LocalSlot, MemorySlot, SavedInfo};
pub use remote::{
    Collaborators, MemoryBackend, NotificationKind, NotificationPayload, ObjectStorage,
    Notifier, PreviewImage, RecordPatch, RecordStore, SnapshotRecord,
};
pub use session::{
    calculate_portrait_from_landscape, DesignSessionManager, DesignStyle, OrientationDesign,
    Projection, SessionRoot,
};

#[cfg(feature = "remote")]
pub use remote::SupabaseClient;

#[cfg(feature = "wasm")]
pub use canvas::JsElementStore;

#[cfg(feature = "wasm")]
pub use session::JsDesignSessionManager;
