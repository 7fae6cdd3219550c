//! ElementStore: the single owner of the currently edited canvas.
//!
//! All mutation goes through the methods below; nothing here touches persistent
//! storage. Every mutating call bumps `revision()` so the auto-save manager can
//! tell whether the canvas changed since its last save.

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use super::model::{
    normalize_rotation, Background, BackgroundKind, CanvasSize, CanvasSnapshot, Element,
    ElementKind, ElementPatch, ObjectFit,
};
use crate::error::{EditorError, EditorResult};

/// Maximum number of undo steps kept.
pub const MAX_HISTORY: usize = 50;

/// Offset applied to duplicated and pasted elements.
const DUPLICATE_OFFSET: f64 = 20.0;

const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 5.0;

/// Who is editing. Only `Admin` may modify locked frame elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditPolicy {
    #[default]
    User,
    Admin,
}

/// Alignment targets for `align_selected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Top,
    Middle,
    Bottom,
}

/// In-memory scene graph of the canvas being edited.
///
/// Element order is the stacking order: the last element is on top.
#[derive(Debug, Clone)]
pub struct ElementStore {
    elements: Vec<Element>,
    selection: Vec<String>,
    size: CanvasSize,
    background: Background,
    zoom: f64,
    policy: EditPolicy,
    clipboard: Vec<Element>,
    history: Vec<Vec<Element>>,
    history_index: usize,
    revision: u64,
}

impl ElementStore {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates an empty landscape canvas.
    pub fn new() -> Self {
        Self::with_size(CanvasSize::LANDSCAPE)
    }

    /// Creates an empty canvas of the given size.
    pub fn with_size(size: CanvasSize) -> Self {
        Self {
            elements: Vec::new(),
            selection: Vec::new(),
            size,
            background: Background::default(),
            zoom: 1.0,
            policy: EditPolicy::User,
            clipboard: Vec::new(),
            history: vec![Vec::new()],
            history_index: 0,
            revision: 0,
        }
    }

    /// Sets the edit policy.
    pub fn set_policy(&mut self, policy: EditPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> EditPolicy {
        self.policy
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|el| el.id == id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Selected ids in selection order.
    pub fn selected_ids(&self) -> &[String] {
        &self.selection
    }

    /// Selected elements in stacking order.
    pub fn selected_elements(&self) -> Vec<&Element> {
        self.elements
            .iter()
            .filter(|el| self.selection.contains(&el.id))
            .collect()
    }

    /// Mutation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Captures the canvas as a snapshot.
    pub fn to_snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot::new(self.elements.clone(), self.size, &self.background)
    }

    // =========================================================================
    // CANVAS
    // =========================================================================

    /// Replaces the canvas dimensions. Existing elements are not rescaled.
    pub fn set_canvas_size(&mut self, width: u32, height: u32) -> EditorResult<()> {
        let size = CanvasSize::new(width, height);
        size.validate()?;
        self.size = size;
        self.touch();
        Ok(())
    }

    /// Sets the zoom factor, clamped to `[0.1, 5.0]`.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        };
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
        self.touch();
    }

    pub fn set_background_color(&mut self, color: impl Into<String>) {
        self.background.color = color.into();
        self.touch();
    }

    pub fn set_background_kind(&mut self, kind: BackgroundKind) {
        self.background.kind = kind;
        self.touch();
    }

    /// Merges the given gradient fields into the current gradient.
    pub fn set_gradient(&mut self, start: Option<&str>, end: Option<&str>, angle: Option<f64>) {
        if let Some(start) = start {
            self.background.gradient.start = start.to_string();
        }
        if let Some(end) = end {
            self.background.gradient.end = end.to_string();
        }
        if let Some(angle) = angle {
            self.background.gradient.angle = angle;
        }
        self.touch();
    }

    /// Replaces all content with `elements` at `size`.
    ///
    /// Selection, zoom and history are reset.
    pub fn load_design(&mut self, elements: Vec<Element>, size: CanvasSize) -> EditorResult<()> {
        size.validate()?;
        self.elements = elements;
        self.size = size;
        self.selection.clear();
        self.zoom = 1.0;
        self.history = vec![self.elements.clone()];
        self.history_index = 0;
        self.touch();
        debug!(elements = self.elements.len(), %size, "design loaded");
        Ok(())
    }

    /// Replaces elements, size and background from a snapshot.
    pub fn load_snapshot(&mut self, snapshot: &CanvasSnapshot) -> EditorResult<()> {
        self.load_design(snapshot.elements.clone(), snapshot.size())?;
        self.background = snapshot.background();
        Ok(())
    }

    /// Empties the element list and selection. Size and background stay.
    pub fn clear_canvas(&mut self) {
        self.elements.clear();
        self.selection.clear();
        self.history = vec![Vec::new()];
        self.history_index = 0;
        self.touch();
    }

    // =========================================================================
    // ELEMENT CRUD
    // =========================================================================

    /// Appends an element on top of the stack and selects it.
    ///
    /// A fresh id is generated when the element has none or its id is taken.
    pub fn add_element(&mut self, mut element: Element) -> String {
        if element.id.is_empty() || self.element(&element.id).is_some() {
            element.id = Uuid::new_v4().to_string();
        }
        if element.name.is_empty() {
            element.name = default_name(&element.kind, self.elements.len());
        }
        element.rotation = normalize_rotation(element.rotation);
        let id = element.id.clone();
        self.elements.push(element);
        self.selection = vec![id.clone()];
        self.record_history();
        id
    }

    /// Merges `patch` into the element with `id`.
    pub fn update_element(&mut self, id: &str, patch: &ElementPatch) -> EditorResult<()> {
        let index = self.editable_index(id)?;
        patch.apply_to(&mut self.elements[index]);
        self.record_history();
        Ok(())
    }

    /// Removes the element with `id` and drops it from the selection.
    pub fn delete_element(&mut self, id: &str) -> EditorResult<()> {
        let index = self.editable_index(id)?;
        self.elements.remove(index);
        self.selection.retain(|s| s != id);
        self.record_history();
        Ok(())
    }

    /// Deletes every selected element the policy allows. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        let removable: HashSet<String> = self
            .elements
            .iter()
            .filter(|el| self.selection.contains(&el.id) && self.can_edit(el))
            .map(|el| el.id.clone())
            .collect();
        self.elements.retain(|el| !removable.contains(&el.id));
        self.selection.clear();
        if !removable.is_empty() {
            self.record_history();
        }
        removable.len()
    }

    /// Copies the element 20px down-right under a new id and selects the copy.
    pub fn duplicate_element(&mut self, id: &str) -> EditorResult<String> {
        let index = self.editable_index(id)?;
        let mut copy = self.elements[index].clone();
        copy.id = Uuid::new_v4().to_string();
        copy.x += DUPLICATE_OFFSET;
        copy.y += DUPLICATE_OFFSET;
        copy.name = format!("{} (copy)", copy.name);
        let new_id = copy.id.clone();
        self.elements.push(copy);
        self.selection = vec![new_id.clone()];
        self.record_history();
        Ok(new_id)
    }

    /// Flips the locked flag. Admin only.
    pub fn toggle_lock(&mut self, id: &str) -> EditorResult<bool> {
        if self.policy != EditPolicy::Admin {
            return Err(EditorError::element_locked(id));
        }
        let index = self.index_of(id)?;
        let el = &mut self.elements[index];
        el.locked = !el.locked;
        let locked = el.locked;
        self.record_history();
        Ok(locked)
    }

    /// Flips visibility.
    pub fn toggle_visibility(&mut self, id: &str) -> EditorResult<bool> {
        let index = self.editable_index(id)?;
        let el = &mut self.elements[index];
        el.visible = !el.visible;
        let visible = el.visible;
        self.record_history();
        Ok(visible)
    }

    /// Fills the whole canvas with the element.
    pub fn stretch_to_canvas(&mut self, id: &str) -> EditorResult<()> {
        let index = self.editable_index(id)?;
        let (width, height) = (self.size.width as f64, self.size.height as f64);
        let el = &mut self.elements[index];
        el.x = 0.0;
        el.y = 0.0;
        el.width = Some(width);
        el.height = Some(height);
        el.scale_x = 1.0;
        el.scale_y = 1.0;
        el.rotation = 0.0;
        if let ElementKind::Image(ref mut image) = el.kind {
            image.object_fit = ObjectFit::Fill;
        }
        self.record_history();
        Ok(())
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Replaces the selection with `id`. Unknown ids are ignored.
    pub fn select_element(&mut self, id: &str) {
        if self.element(id).is_some() {
            self.selection = vec![id.to_string()];
        }
    }

    /// Adds or removes `id` from the selection.
    pub fn toggle_selection(&mut self, id: &str) {
        if let Some(pos) = self.selection.iter().position(|s| s == id) {
            self.selection.remove(pos);
        } else if self.element(id).is_some() {
            self.selection.push(id.to_string());
        }
    }

    /// Replaces the selection with the known ids among `ids`.
    pub fn select_many<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if self.element(id).is_some() && !selection.iter().any(|s: &String| s == id) {
                selection.push(id.to_string());
            }
        }
        self.selection = selection;
    }

    /// Selects every unlocked element.
    pub fn select_all(&mut self) {
        self.selection = self
            .elements
            .iter()
            .filter(|el| !el.locked)
            .map(|el| el.id.clone())
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // =========================================================================
    // Z-ORDER
    // =========================================================================

    /// Moves the element one step up the stack.
    pub fn bring_forward(&mut self, id: &str) -> EditorResult<()> {
        let index = self.editable_index(id)?;
        if index + 1 < self.elements.len() {
            self.elements.swap(index, index + 1);
            self.record_history();
        }
        Ok(())
    }

    /// Moves the element one step down the stack.
    pub fn send_backward(&mut self, id: &str) -> EditorResult<()> {
        let index = self.editable_index(id)?;
        if index > 0 {
            self.elements.swap(index, index - 1);
            self.record_history();
        }
        Ok(())
    }

    /// Moves the element to the top of the stack.
    pub fn bring_to_front(&mut self, id: &str) -> EditorResult<()> {
        let index = self.editable_index(id)?;
        let el = self.elements.remove(index);
        self.elements.push(el);
        self.record_history();
        Ok(())
    }

    /// Moves the element to the bottom of the stack.
    pub fn send_to_back(&mut self, id: &str) -> EditorResult<()> {
        let index = self.editable_index(id)?;
        let el = self.elements.remove(index);
        self.elements.insert(0, el);
        self.record_history();
        Ok(())
    }

    // =========================================================================
    // ALIGNMENT
    // =========================================================================

    /// Aligns the editable selected elements to each other or to the canvas.
    ///
    /// Left/right/top/bottom align to the selection's bounds; center/middle to the canvas.
    pub fn align_selected(&mut self, alignment: Alignment) {
        let targets: Vec<usize> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| self.selection.contains(&el.id) && self.can_edit(el))
            .map(|(i, _)| i)
            .collect();
        if targets.is_empty() {
            return;
        }

        let (mut min_x, mut max_right) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_bottom) = (f64::INFINITY, f64::NEG_INFINITY);
        for &i in &targets {
            let el = &self.elements[i];
            min_x = min_x.min(el.x);
            max_right = max_right.max(el.x + el.layout_width());
            min_y = min_y.min(el.y);
            max_bottom = max_bottom.max(el.y + el.layout_height());
        }
        let center_x = self.size.width as f64 / 2.0;
        let center_y = self.size.height as f64 / 2.0;

        for i in targets {
            let el = &mut self.elements[i];
            match alignment {
                Alignment::Left => el.x = min_x,
                Alignment::Center => el.x = center_x - el.layout_width() / 2.0,
                Alignment::Right => el.x = max_right - el.layout_width(),
                Alignment::Top => el.y = min_y,
                Alignment::Middle => el.y = center_y - el.layout_height() / 2.0,
                Alignment::Bottom => el.y = max_bottom - el.layout_height(),
            }
        }
        self.record_history();
    }

    // =========================================================================
    // CLIPBOARD
    // =========================================================================

    /// Copies the selected elements. Locked elements are skipped for users.
    pub fn copy_selection(&mut self) -> usize {
        self.clipboard = self
            .elements
            .iter()
            .filter(|el| self.selection.contains(&el.id) && self.can_edit(el))
            .cloned()
            .collect();
        self.clipboard.len()
    }

    /// Pastes the clipboard 20px offset under new ids and selects the pasted elements.
    pub fn paste(&mut self) -> Vec<String> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        let mut ids = Vec::with_capacity(self.clipboard.len());
        for original in self.clipboard.clone() {
            let mut el = original;
            el.id = Uuid::new_v4().to_string();
            el.x += DUPLICATE_OFFSET;
            el.y += DUPLICATE_OFFSET;
            ids.push(el.id.clone());
            self.elements.push(el);
        }
        self.selection = ids.clone();
        self.record_history();
        ids
    }

    /// Copies then deletes the selection.
    pub fn cut(&mut self) -> usize {
        let copied = self.copy_selection();
        self.delete_selected();
        copied
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    pub fn can_undo(&self) -> bool {
        self.history_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history_index + 1 < self.history.len()
    }

    /// Restores the previous element list. Returns false at the start of history.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.history_index -= 1;
        self.elements = self.history[self.history_index].clone();
        self.selection.clear();
        self.touch();
        true
    }

    /// Re-applies an undone step. Returns false at the end of history.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.history_index += 1;
        self.elements = self.history[self.history_index].clone();
        self.selection.clear();
        self.touch();
        true
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn record_history(&mut self) {
        self.history.truncate(self.history_index + 1);
        self.history.push(self.elements.clone());
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
        self.history_index = self.history.len() - 1;
        self.touch();
    }

    fn can_edit(&self, element: &Element) -> bool {
        !element.locked || self.policy == EditPolicy::Admin
    }

    fn index_of(&self, id: &str) -> EditorResult<usize> {
        self.elements
            .iter()
            .position(|el| el.id == id)
            .ok_or_else(|| EditorError::element_not_found(id))
    }

    /// Index of an element the current policy may modify.
    fn editable_index(&self, id: &str) -> EditorResult<usize> {
        let index = self.index_of(id)?;
        if !self.can_edit(&self.elements[index]) {
            return Err(EditorError::element_locked(id));
        }
        Ok(index)
    }
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::new()
    }
}

fn default_name(kind: &ElementKind, index: usize) -> String {
    let label = match kind {
        ElementKind::Image(_) => "Image",
        ElementKind::Text(_) => "Text",
        ElementKind::Shape(_) => "Shape",
    };
    format!("{} {}", label, index + 1)
}

// =============================================================================
// TESTS
// =============================================================================
