//! Editor page controller.
//!
//! Sequences the element store, the auto-save manager and the design session as
//! the user moves between orientations, and pushes finished designs and admin
//! frame templates to the remote collaborators.

pub mod controller;
pub mod publish;

use serde::{Deserialize, Serialize};

use crate::canvas::model::{CanvasSize, Orientation};
use crate::remote::{NotificationKind, PreviewImage};

pub use controller::EditorController;

// =============================================================================
// MODE / STATE
// =============================================================================

/// Which editor route is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    #[default]
    Landscape,
    Portrait,
    /// Any non-zero canvas size; no orientation pairing.
    Custom,
}

impl EditorMode {
    pub fn orientation(&self) -> Option<Orientation> {
        match self {
            EditorMode::Landscape => Some(Orientation::Landscape),
            EditorMode::Portrait => Some(Orientation::Portrait),
            EditorMode::Custom => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EditorMode::Landscape => "landscape",
            EditorMode::Portrait => "portrait",
            EditorMode::Custom => "custom",
        }
    }
}

impl From<Orientation> for EditorMode {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Landscape => EditorMode::Landscape,
            Orientation::Portrait => EditorMode::Portrait,
        }
    }
}

/// Lifecycle of one editing visit. `Published` is terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VisitState {
    #[default]
    Editing,
    Published { record_id: String },
}

// =============================================================================
// REQUESTS / OUTCOMES
// =============================================================================

/// Input of `EditorController::finish_design`.
#[derive(Debug, Clone)]
pub struct FinishDesignRequest {
    pub kind: NotificationKind,
    pub photographer_email: String,
    pub photographer_name: String,
    pub client_email: Option<String>,
    pub client_name: Option<String>,
    /// Rendered preview of the current canvas.
    pub preview: Option<PreviewImage>,
    /// Rendered preview of the other orientation, when the caller has one.
    pub other_preview: Option<PreviewImage>,
}

impl FinishDesignRequest {
    /// Email the design to the photographer.
    pub fn to_self(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::ToSelf,
            photographer_email: email.into(),
            photographer_name: name.into(),
            client_email: None,
            client_name: None,
            preview: None,
            other_preview: None,
        }
    }

    /// Email the design to a client on the photographer's behalf.
    pub fn to_client(
        photographer_email: impl Into<String>,
        photographer_name: impl Into<String>,
        client_email: impl Into<String>,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: NotificationKind::ToClient,
            client_email: Some(client_email.into()),
            client_name: Some(client_name.into()),
            ..Self::to_self(photographer_email, photographer_name)
        }
    }

    /// Builder: Attach the rendered previews.
    pub fn with_previews(mut self, preview: PreviewImage, other: Option<PreviewImage>) -> Self {
        self.preview = Some(preview);
        self.other_preview = other;
        self
    }
}

/// Records written by a successful `finish_design`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishOutcome {
    pub record_id: String,
    /// Record of the other orientation, when both were stored.
    pub paired_id: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Records already written by a `finish_design` that has not completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FinishProgress {
    pub record_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub paired_id: Option<String>,
    /// The current record points at `paired_id`.
    pub linked: bool,
}

impl FinishProgress {
    /// `None` until the current orientation's record exists.
    pub fn outcome(&self) -> Option<FinishOutcome> {
        Some(FinishOutcome {
            record_id: self.record_id.clone()?,
            paired_id: self.paired_id.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        })
    }
}

/// Input of `EditorController::publish_frame`.
#[derive(Debug, Clone, Default)]
pub struct PublishFrameRequest {
    pub name: String,
    pub name_en: Option<String>,
    pub category_id: Option<String>,
    pub is_premium: bool,
    /// Orientation tag for custom-mode frames.
    pub orientation: Option<Orientation>,
    /// Existing frame to pair with (portrait and custom modes).
    pub paired_frame_id: Option<String>,
    pub preview: Option<PreviewImage>,
}

impl PublishFrameRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: Set the category.
    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    /// Builder: Pair with an existing frame.
    pub fn with_paired_frame(mut self, id: impl Into<String>) -> Self {
        self.paired_frame_id = Some(id.into());
        self
    }
}

/// Frames written by a successful `publish_frame`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub frame_id: String,
    pub paired_id: Option<String>,
}

/// Preset size a mode requires, `None` for custom.
pub(crate) fn mode_preset(mode: EditorMode, landscape: CanvasSize, portrait: CanvasSize) -> Option<CanvasSize> {
    match mode {
        EditorMode::Landscape => Some(landscape),
        EditorMode::Portrait => Some(portrait),
        EditorMode::Custom => None,
    }
}
