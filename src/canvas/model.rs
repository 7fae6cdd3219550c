//! Data models for the design canvas.
//!
//! These structs derive serde for the JSON snapshots written to the local slot and
//! to remote records, and autosurgeon for storage inside the design session document.

use autosurgeon::{Hydrate, Reconcile};
use serde::{Deserialize, Serialize};

use crate::error::{EditorError, EditorResult};

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

/// Normalizes a rotation in degrees into `[0, 360)`.
pub fn normalize_rotation(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let r = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

// =============================================================================
// CANVAS SIZE / ORIENTATION
// =============================================================================

/// Canvas pixel dimensions.
#[derive(Debug, Clone, Copy, Reconcile, Hydrate, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// Landscape magnet frame, 2500x1875.
    pub const LANDSCAPE: CanvasSize = CanvasSize {
        width: 2500,
        height: 1875,
    };

    /// Portrait magnet frame, 1875x2500.
    pub const PORTRAIT: CanvasSize = CanvasSize {
        width: 1875,
        height: 2500,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns an error if either dimension is zero.
    pub fn validate(&self) -> EditorResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EditorError::invalid_canvas_size(self.width, self.height));
        }
        Ok(())
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::LANDSCAPE
    }
}

impl std::fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// One of the two fixed frame orientations.
#[derive(Debug, Clone, Copy, Reconcile, Hydrate, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Default preset size for this orientation.
    pub fn preset(&self) -> CanvasSize {
        match self {
            Orientation::Landscape => CanvasSize::LANDSCAPE,
            Orientation::Portrait => CanvasSize::PORTRAIT,
        }
    }

    pub fn opposite(&self) -> Orientation {
        match self {
            Orientation::Landscape => Orientation::Portrait,
            Orientation::Portrait => Orientation::Landscape,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

// =============================================================================
// BACKGROUND
// =============================================================================

/// Canvas background fill.
#[derive(Debug, Clone, Copy, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    #[default]
    None,
    Solid,
    Gradient,
}

/// Linear gradient stops and angle.
#[derive(Debug, Clone, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct GradientColors {
    pub start: String,
    pub end: String,
    pub angle: f64,
}

impl Default for GradientColors {
    fn default() -> Self {
        Self {
            start: "#6366f1".to_string(),
            end: "#a855f7".to_string(),
            angle: 45.0,
        }
    }
}

/// Background descriptor of a canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Background {
    pub kind: BackgroundKind,
    pub color: String,
    pub gradient: GradientColors,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::None,
            color: "transparent".to_string(),
            gradient: GradientColors::default(),
        }
    }
}

impl Background {
    pub fn solid(color: impl Into<String>) -> Self {
        Self {
            kind: BackgroundKind::Solid,
            color: color.into(),
            gradient: GradientColors::default(),
        }
    }

    pub fn gradient(start: impl Into<String>, end: impl Into<String>, angle: f64) -> Self {
        Self {
            kind: BackgroundKind::Gradient,
            color: "transparent".to_string(),
            gradient: GradientColors {
                start: start.into(),
                end: end.into(),
                angle,
            },
        }
    }
}

// =============================================================================
// ELEMENT PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObjectFit {
    #[default]
    Cover,
    Contain,
    Fill,
}

#[derive(Debug, Clone, Copy, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    #[default]
    Rtl,
}

#[derive(Debug, Clone, Copy, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    #[default]
    Rectangle,
    Circle,
    Line,
    Star,
    Polygon,
    Triangle,
    Arrow,
}

/// Image payload.
#[derive(Debug, Clone, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_height: Option<f64>,
    #[serde(default)]
    pub object_fit: ObjectFit,
}

/// Text payload.
#[derive(Debug, Clone, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TextData {
    pub text: String,
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u32,
    pub fill: String,
    #[serde(default, rename = "textAlign")]
    pub align: TextAlign,
    #[serde(default)]
    pub direction: TextDirection,
    pub line_height: f64,
    #[serde(default)]
    pub letter_spacing: f64,
}

impl Default for TextData {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: "Heebo".to_string(),
            font_size: 72.0,
            font_weight: 400,
            fill: "#000000".to_string(),
            align: TextAlign::Center,
            direction: TextDirection::Rtl,
            line_height: 1.2,
            letter_spacing: 0.0,
        }
    }
}

/// Shape payload.
#[derive(Debug, Clone, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeData {
    #[serde(default)]
    pub shape_type: ShapeType,
    pub fill: String,
    pub stroke: String,
    #[serde(default)]
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
}

impl Default for ShapeData {
    fn default() -> Self {
        Self {
            shape_type: ShapeType::Rectangle,
            fill: "#6366f1".to_string(),
            stroke: "#4f46e5".to_string(),
            stroke_width: 0.0,
            corner_radius: Some(0.0),
        }
    }
}

/// Type-specific part of an element.
#[derive(Debug, Clone, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Image(ImageData),
    Text(TextData),
    Shape(ShapeData),
}

impl ElementKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Image(_) => "image",
            ElementKind::Text(_) => "text",
            ElementKind::Shape(_) => "shape",
        }
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// A visual item on the canvas.
///
/// Geometry is shared by every kind; `kind` carries the type-specific payload.
/// A `locked` element is part of the decorative frame.
#[derive(Debug, Clone, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Unique identifier. Empty means "assign one on insert".
    #[serde(default)]
    pub id: String,

    /// Layer label shown in the layers panel.
    #[serde(default)]
    pub name: String,

    pub x: f64,
    pub y: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,

    /// Degrees, normalized to `[0, 360)`.
    #[serde(default)]
    pub rotation: f64,

    /// -1 flips horizontally.
    #[serde(default = "one")]
    pub scale_x: f64,
    /// -1 flips vertically.
    #[serde(default = "one")]
    pub scale_y: f64,

    #[serde(default = "one")]
    pub opacity: f64,

    #[serde(default, alias = "isLocked")]
    pub locked: bool,

    #[serde(default = "yes", alias = "isVisible")]
    pub visible: bool,

    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    /// Creates an element of the given kind at the origin.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            opacity: 1.0,
            locked: false,
            visible: true,
            kind,
        }
    }

    /// Creates a text element with the default typography.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Text(TextData {
            text: text.into(),
            ..TextData::default()
        }))
    }

    /// Creates an image element.
    pub fn image(src: impl Into<String>) -> Self {
        Self::new(ElementKind::Image(ImageData {
            src: src.into(),
            asset_id: None,
            original_width: None,
            original_height: None,
            object_fit: ObjectFit::Cover,
        }))
    }

    /// Creates a shape element with the default fill and stroke.
    pub fn shape(shape_type: ShapeType) -> Self {
        Self::new(ElementKind::Shape(ShapeData {
            shape_type,
            ..ShapeData::default()
        }))
    }

    /// Builder: Set id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder: Set layer name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: Set position.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Builder: Set size.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Builder: Set rotation (normalized).
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = normalize_rotation(degrees);
        self
    }

    /// Builder: Mark as part of the locked frame.
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Builder: Set font size (text only, ignored otherwise).
    pub fn with_font_size(mut self, size: f64) -> Self {
        if let ElementKind::Text(ref mut text) = self.kind {
            text.font_size = size;
        }
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Font size for text elements.
    pub fn font_size(&self) -> Option<f64> {
        match &self.kind {
            ElementKind::Text(text) => Some(text.font_size),
            _ => None,
        }
    }

    /// Width used for layout math when the element has no explicit width.
    pub fn layout_width(&self) -> f64 {
        self.width.unwrap_or(0.0)
    }

    /// Height used for layout math when the element has no explicit height.
    pub fn layout_height(&self) -> f64 {
        self.height.unwrap_or(0.0)
    }
}

/// Splits elements into `(locked, unlocked)`, preserving order in each half.
pub fn partition_locked(elements: &[Element]) -> (Vec<Element>, Vec<Element>) {
    elements.iter().cloned().partition(|el| el.locked)
}

// =============================================================================
// ELEMENT PATCH
// =============================================================================

/// Partial update merged into an element by `ElementStore::update_element`.
///
/// Payload fields only apply to the kinds that carry them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementPatch {
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub opacity: Option<f64>,
    pub visible: Option<bool>,
    pub text: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub src: Option<String>,
}

impl ElementPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Move to a position.
    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Builder: Resize.
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Builder: Rotate.
    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    /// Builder: Recolor (text fill or shape fill).
    pub fn fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    /// Builder: Replace text content.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Merges the `Some` fields into `element`.
    pub fn apply_to(&self, element: &mut Element) {
        if let Some(ref name) = self.name {
            element.name = name.clone();
        }
        if let Some(x) = self.x {
            element.x = x;
        }
        if let Some(y) = self.y {
            element.y = y;
        }
        if let Some(width) = self.width {
            element.width = Some(width);
        }
        if let Some(height) = self.height {
            element.height = Some(height);
        }
        if let Some(rotation) = self.rotation {
            element.rotation = normalize_rotation(rotation);
        }
        if let Some(scale_x) = self.scale_x {
            element.scale_x = scale_x;
        }
        if let Some(scale_y) = self.scale_y {
            element.scale_y = scale_y;
        }
        if let Some(opacity) = self.opacity {
            element.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(visible) = self.visible {
            element.visible = visible;
        }

        match &mut element.kind {
            ElementKind::Text(text) => {
                if let Some(ref content) = self.text {
                    text.text = content.clone();
                }
                if let Some(ref family) = self.font_family {
                    text.font_family = family.clone();
                }
                if let Some(size) = self.font_size {
                    text.font_size = size;
                }
                if let Some(ref fill) = self.fill {
                    text.fill = fill.clone();
                }
            }
            ElementKind::Shape(shape) => {
                if let Some(ref fill) = self.fill {
                    shape.fill = fill.clone();
                }
                if let Some(ref stroke) = self.stroke {
                    shape.stroke = stroke.clone();
                }
            }
            ElementKind::Image(image) => {
                if let Some(ref src) = self.src {
                    image.src = src.clone();
                }
            }
        }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Complete serialized description of a canvas at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSnapshot {
    pub elements: Vec<Element>,
    pub canvas_width: u32,
    pub canvas_height: u32,
    #[serde(default = "transparent")]
    pub background_color: String,
    #[serde(default)]
    pub background_type: BackgroundKind,
    #[serde(default)]
    pub gradient_colors: GradientColors,
}

fn transparent() -> String {
    "transparent".to_string()
}

impl CanvasSnapshot {
    pub fn new(elements: Vec<Element>, size: CanvasSize, background: &Background) -> Self {
        Self {
            elements,
            canvas_width: size.width,
            canvas_height: size.height,
            background_color: background.color.clone(),
            background_type: background.kind,
            gradient_colors: background.gradient.clone(),
        }
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.canvas_width, self.canvas_height)
    }

    pub fn background(&self) -> Background {
        Background {
            kind: self.background_type,
            color: self.background_color.clone(),
            gradient: self.gradient_colors.clone(),
        }
    }

    pub fn locked_count(&self) -> usize {
        self.elements.iter().filter(|el| el.locked).count()
    }
}

// =============================================================================
// TESTS
// =============================================================================
