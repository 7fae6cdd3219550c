//! Canvas module.
//!
//! The element model and the in-memory store that owns the canvas being edited.

pub mod model;
pub mod store;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use model::{
    normalize_rotation, partition_locked, Background, BackgroundKind, CanvasSize, CanvasSnapshot,
    Element, ElementKind, ElementPatch, GradientColors, ImageData, ObjectFit, Orientation,
    ShapeData, ShapeType, TextAlign, TextData, TextDirection,
};
pub use store::{Alignment, EditPolicy, ElementStore, MAX_HISTORY};

#[cfg(feature = "wasm")]
pub use wasm::JsElementStore;
