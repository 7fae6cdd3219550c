//! WASM bindings for the canvas module.
//!
//! Exposes `ElementStore` to the browser editor. Elements, patches and snapshots
//! cross the boundary as plain JS objects.

use js_sys::Array;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

use super::model::{Background, CanvasSnapshot, Element, ElementPatch};
use super::store::{Alignment, EditPolicy, ElementStore};
use crate::error::EditorError;

/// Serialize a value to JsValue with maps as plain JS objects (not Map).
pub(crate) fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&Serializer::new().serialize_maps_as_objects(true))
}

// =============================================================================
// ERROR CONVERSION
// =============================================================================

impl From<EditorError> for JsValue {
    fn from(err: EditorError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}

/// Helper macro for Result conversion
macro_rules! js_result {
    ($expr:expr) => {
        $expr.map_err(|e: EditorError| JsValue::from(e))
    };
}

fn parse_alignment(value: &str) -> Result<Alignment, JsValue> {
    match value {
        "left" => Ok(Alignment::Left),
        "center" => Ok(Alignment::Center),
        "right" => Ok(Alignment::Right),
        "top" => Ok(Alignment::Top),
        "middle" => Ok(Alignment::Middle),
        "bottom" => Ok(Alignment::Bottom),
        other => Err(JsValue::from_str(&format!("Unknown alignment: {}", other))),
    }
}

fn string_array(ids: &[String]) -> Array {
    let array = Array::new();
    for id in ids {
        array.push(&JsValue::from_str(id));
    }
    array
}

// =============================================================================
// MAIN WRAPPER TYPE
// =============================================================================

/// JavaScript-friendly wrapper around ElementStore.
#[wasm_bindgen]
pub struct JsElementStore {
    inner: ElementStore,
}

#[wasm_bindgen]
impl JsElementStore {
    /// Creates an empty landscape canvas.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const store = new JsElementStore();
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsElementStore {
        JsElementStore {
            inner: ElementStore::new(),
        }
    }

    /// Switches between user and admin editing. Admins may edit locked elements.
    #[wasm_bindgen(js_name = setAdmin)]
    pub fn set_admin(&mut self, admin: bool) {
        self.inner.set_policy(if admin {
            EditPolicy::Admin
        } else {
            EditPolicy::User
        });
    }

    /// Gets the canvas as a snapshot object.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const { elements, canvasWidth, canvasHeight } = store.getSnapshot();
    /// ```
    #[wasm_bindgen(js_name = getSnapshot)]
    pub fn get_snapshot(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(&self.inner.to_snapshot())?)
    }

    /// Replaces the canvas from a snapshot object.
    #[wasm_bindgen(js_name = loadSnapshot)]
    pub fn load_snapshot(&mut self, snapshot: JsValue) -> Result<(), JsValue> {
        let snapshot: CanvasSnapshot = from_value(snapshot)?;
        js_result!(self.inner.load_snapshot(&snapshot))
    }

    /// Mutation counter, bumped on every change.
    #[wasm_bindgen]
    pub fn revision(&self) -> f64 {
        self.inner.revision() as f64
    }
}

// =============================================================================
// ELEMENT METHODS
// =============================================================================

#[wasm_bindgen]
impl JsElementStore {
    /// Adds an element and returns its id.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const id = store.addElement({ type: 'text', x: 100, y: 100, text: 'Mazal Tov' });
    /// ```
    #[wasm_bindgen(js_name = addElement)]
    pub fn add_element(&mut self, element: JsValue) -> Result<String, JsValue> {
        let element: Element = from_value(element)?;
        Ok(self.inner.add_element(element))
    }

    /// Merges a partial update into an element.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// store.updateElement(id, { x: 200, rotation: 15 });
    /// ```
    #[wasm_bindgen(js_name = updateElement)]
    pub fn update_element(&mut self, id: &str, patch: JsValue) -> Result<(), JsValue> {
        let patch: ElementPatch = from_value(patch)?;
        js_result!(self.inner.update_element(id, &patch))
    }

    #[wasm_bindgen(js_name = deleteElement)]
    pub fn delete_element(&mut self, id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.delete_element(id))
    }

    #[wasm_bindgen(js_name = deleteSelected)]
    pub fn delete_selected(&mut self) -> usize {
        self.inner.delete_selected()
    }

    #[wasm_bindgen(js_name = duplicateElement)]
    pub fn duplicate_element(&mut self, id: &str) -> Result<String, JsValue> {
        js_result!(self.inner.duplicate_element(id))
    }

    #[wasm_bindgen(js_name = toggleLock)]
    pub fn toggle_lock(&mut self, id: &str) -> Result<bool, JsValue> {
        js_result!(self.inner.toggle_lock(id))
    }

    #[wasm_bindgen(js_name = toggleVisibility)]
    pub fn toggle_visibility(&mut self, id: &str) -> Result<bool, JsValue> {
        js_result!(self.inner.toggle_visibility(id))
    }

    #[wasm_bindgen(js_name = stretchToCanvas)]
    pub fn stretch_to_canvas(&mut self, id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.stretch_to_canvas(id))
    }

    #[wasm_bindgen(js_name = clearCanvas)]
    pub fn clear_canvas(&mut self) {
        self.inner.clear_canvas();
    }

    #[wasm_bindgen(js_name = setCanvasSize)]
    pub fn set_canvas_size(&mut self, width: u32, height: u32) -> Result<(), JsValue> {
        js_result!(self.inner.set_canvas_size(width, height))
    }

    #[wasm_bindgen(js_name = setBackground)]
    pub fn set_background(&mut self, background: JsValue) -> Result<(), JsValue> {
        let background: Background = from_value(background)?;
        self.inner.set_background(background);
        Ok(())
    }

    #[wasm_bindgen(js_name = setZoom)]
    pub fn set_zoom(&mut self, zoom: f64) {
        self.inner.set_zoom(zoom);
    }
}

// =============================================================================
// SELECTION / ORDER / CLIPBOARD
// =============================================================================

#[wasm_bindgen]
impl JsElementStore {
    #[wasm_bindgen(js_name = selectElement)]
    pub fn select_element(&mut self, id: &str) {
        self.inner.select_element(id);
    }

    #[wasm_bindgen(js_name = toggleSelection)]
    pub fn toggle_selection(&mut self, id: &str) {
        self.inner.toggle_selection(id);
    }

    #[wasm_bindgen(js_name = selectAll)]
    pub fn select_all(&mut self) {
        self.inner.select_all();
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) {
        self.inner.clear_selection();
    }

    /// Gets the selected ids as an array of strings.
    #[wasm_bindgen(js_name = getSelection)]
    pub fn get_selection(&self) -> Array {
        string_array(self.inner.selected_ids())
    }

    #[wasm_bindgen(js_name = bringForward)]
    pub fn bring_forward(&mut self, id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.bring_forward(id))
    }

    #[wasm_bindgen(js_name = sendBackward)]
    pub fn send_backward(&mut self, id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.send_backward(id))
    }

    #[wasm_bindgen(js_name = bringToFront)]
    pub fn bring_to_front(&mut self, id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.bring_to_front(id))
    }

    #[wasm_bindgen(js_name = sendToBack)]
    pub fn send_to_back(&mut self, id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.send_to_back(id))
    }

    /// Aligns the selection: "left", "center", "right", "top", "middle" or "bottom".
    #[wasm_bindgen(js_name = alignSelected)]
    pub fn align_selected(&mut self, alignment: &str) -> Result<(), JsValue> {
        self.inner.align_selected(parse_alignment(alignment)?);
        Ok(())
    }

    #[wasm_bindgen(js_name = copySelection)]
    pub fn copy_selection(&mut self) -> usize {
        self.inner.copy_selection()
    }

    #[wasm_bindgen]
    pub fn paste(&mut self) -> Array {
        string_array(&self.inner.paste())
    }

    #[wasm_bindgen]
    pub fn undo(&mut self) -> bool {
        self.inner.undo()
    }

    #[wasm_bindgen]
    pub fn redo(&mut self) -> bool {
        self.inner.redo()
    }
}

impl Default for JsElementStore {
    fn default() -> Self {
        Self::new()
    }
}
