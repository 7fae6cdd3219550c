//! Design session module.
//!
//! Keeps the landscape and portrait snapshots of one editing visit in an Automerge
//! document and provides the transform that derives one orientation from the other.

pub mod model;
pub mod manager;
pub mod transform;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use model::{DesignStyle, OrientationDesign, SessionRoot};
pub use manager::DesignSessionManager;
pub use transform::{calculate_portrait_from_landscape, Projection};

#[cfg(feature = "wasm")]
pub use wasm::JsDesignSessionManager;
