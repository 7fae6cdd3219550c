//! Error types for the design editor core.

use thiserror::Error;

/// Result type alias for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors that can occur while editing, saving or publishing a design.
#[derive(Error, Debug)]
pub enum EditorError {
    /// Automerge error during session document operations.
    #[error("Automerge error: {0}")]
    Automerge(#[from] automerge::AutomergeError),

    /// Autosurgeon hydration error.
    #[error("Hydration error: {0}")]
    Hydrate(#[from] autosurgeon::HydrateError),

    /// Autosurgeon reconcile error.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] autosurgeon::ReconcileError),

    /// A canvas size with a zero dimension was supplied.
    #[error("Invalid canvas size: {width}x{height}")]
    InvalidCanvasSize { width: u32, height: u32 },

    /// The canvas size does not match the preset required by the editor mode.
    #[error("Canvas size {width}x{height} does not match {mode} preset {expected_width}x{expected_height}")]
    CanvasSizeMismatch {
        mode: String,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    /// Element not found on the canvas.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element belongs to the locked frame and cannot be edited by the user.
    #[error("Element is locked: {0}")]
    ElementLocked(String),

    /// A locked element was handed to the orientation transform.
    #[error("Locked element passed to orientation transform: {0}")]
    LockedElementInTransform(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Local durable slot failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote collaborator failure (record store, object storage, notifier).
    #[error("Remote error: {0}")]
    Remote(String),

    /// The design record was stored but the notification could not be sent.
    #[error("Design {record_id} saved but notification failed: {message}")]
    NotificationFailed { record_id: String, message: String },

    /// Only part of a paired publish went through.
    #[error("Partial publish: {created_id} was created but {stage} failed: {message}")]
    PartialPublish {
        created_id: String,
        paired_id: Option<String>,
        stage: String,
        message: String,
    },

    /// The editing visit has been published and accepts no further changes.
    #[error("Editing visit already finished")]
    VisitFinished,

    /// Operation is not valid in the current editor state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl EditorError {
    /// Creates an InvalidCanvasSize error.
    pub fn invalid_canvas_size(width: u32, height: u32) -> Self {
        Self::InvalidCanvasSize { width, height }
    }

    /// Creates an ElementNotFound error.
    pub fn element_not_found(id: impl Into<String>) -> Self {
        Self::ElementNotFound(id.into())
    }

    /// Creates an ElementLocked error.
    pub fn element_locked(id: impl Into<String>) -> Self {
        Self::ElementLocked(id.into())
    }

    /// Creates a Serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a Storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Creates a Remote error.
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// True for failures reported by an external collaborator.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Remote(_) | Self::NotificationFailed { .. } | Self::PartialPublish { .. }
        )
    }
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
