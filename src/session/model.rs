//! Data models for the design session document.
//!
//! These structs use autosurgeon derives so the whole session lives in one
//! Automerge document, and serde for the JSON views handed to the CLI and JS.

use autosurgeon::{Hydrate, Reconcile};
use serde::{Deserialize, Serialize};

use crate::canvas::model::{Background, BackgroundKind, CanvasSize, Element, GradientColors};

// =============================================================================
// SESSION ROOT
// =============================================================================

/// Root document structure for one editing visit.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct SessionRoot {
    /// Style shared by both orientations. Saving either orientation merges into it.
    pub style: Option<DesignStyle>,

    pub landscape: Option<OrientationDesign>,

    pub portrait: Option<OrientationDesign>,

    /// Unix milliseconds of the last save.
    pub updated_at: i64,
}

impl SessionRoot {
    /// True when neither orientation has been saved.
    pub fn is_empty(&self) -> bool {
        self.landscape.is_none() && self.portrait.is_none()
    }
}

// =============================================================================
// ORIENTATION DESIGN
// =============================================================================

/// One orientation's snapshot: elements, style copy and canvas size.
#[derive(Debug, Clone, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct OrientationDesign {
    pub elements: Vec<Element>,
    pub style: DesignStyle,
    pub size: CanvasSize,
}

impl OrientationDesign {
    pub fn new(elements: Vec<Element>, style: DesignStyle, size: CanvasSize) -> Self {
        Self {
            elements,
            style,
            size,
        }
    }

    /// Number of locked frame elements.
    pub fn locked_count(&self) -> usize {
        self.elements.iter().filter(|el| el.locked).count()
    }

    pub fn has_locked(&self) -> bool {
        self.elements.iter().any(|el| el.locked)
    }
}

// =============================================================================
// DESIGN STYLE
// =============================================================================

/// Background style and frame reference shared across orientations.
#[derive(Debug, Clone, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignStyle {
    pub background_type: BackgroundKind,
    pub background_color: String,
    pub gradient_start: String,
    pub gradient_end: String,
    pub gradient_angle: f64,
    /// Frame template this design started from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
}

impl Default for DesignStyle {
    /// White solid background, used when no style has been saved yet.
    fn default() -> Self {
        let gradient = GradientColors::default();
        Self {
            background_type: BackgroundKind::Solid,
            background_color: "#ffffff".to_string(),
            gradient_start: gradient.start,
            gradient_end: gradient.end,
            gradient_angle: gradient.angle,
            frame_id: None,
        }
    }
}

impl DesignStyle {
    /// Captures a canvas background.
    pub fn from_background(background: &Background) -> Self {
        Self {
            background_type: background.kind,
            background_color: background.color.clone(),
            gradient_start: background.gradient.start.clone(),
            gradient_end: background.gradient.end.clone(),
            gradient_angle: background.gradient.angle,
            frame_id: None,
        }
    }

    /// Builder: Set the frame reference.
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = Some(frame_id.into());
        self
    }

    /// Converts back into a canvas background.
    pub fn to_background(&self) -> Background {
        Background {
            kind: self.background_type,
            color: self.background_color.clone(),
            gradient: GradientColors {
                start: self.gradient_start.clone(),
                end: self.gradient_end.clone(),
                angle: self.gradient_angle,
            },
        }
    }

    /// Merges `other` over `self`. A missing frame id keeps the current one.
    pub fn merge(&mut self, other: &DesignStyle) {
        self.background_type = other.background_type;
        self.background_color = other.background_color.clone();
        self.gradient_start = other.gradient_start.clone();
        self.gradient_end = other.gradient_end.clone();
        self.gradient_angle = other.gradient_angle;
        if other.frame_id.is_some() {
            self.frame_id = other.frame_id.clone();
        }
    }
}
