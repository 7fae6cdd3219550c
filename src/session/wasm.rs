//! WASM bindings for the design session module.

use js_sys::Uint8Array;
use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;

use super::manager::DesignSessionManager;
use super::model::DesignStyle;
use crate::canvas::model::{CanvasSize, Element};
use crate::canvas::wasm::to_js_value;
use crate::error::EditorError;

macro_rules! js_result {
    ($expr:expr) => {
        $expr.map_err(|e: EditorError| JsValue::from(e))
    };
}

fn js_or_null<T: serde::Serialize>(value: Option<T>) -> Result<JsValue, JsValue> {
    match value {
        Some(v) => Ok(to_js_value(&v)?),
        None => Ok(JsValue::NULL),
    }
}

/// JavaScript-friendly wrapper around DesignSessionManager.
#[wasm_bindgen]
pub struct JsDesignSessionManager {
    inner: DesignSessionManager,
}

#[wasm_bindgen]
impl JsDesignSessionManager {
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsDesignSessionManager {
        JsDesignSessionManager {
            inner: DesignSessionManager::new(),
        }
    }

    /// Loads a session from saved bytes.
    #[wasm_bindgen(js_name = fromBytes)]
    pub fn from_bytes(bytes: &[u8]) -> Result<JsDesignSessionManager, JsValue> {
        let inner = js_result!(DesignSessionManager::from_bytes(bytes))?;
        Ok(JsDesignSessionManager { inner })
    }

    /// Saves to binary bytes (returns Uint8Array).
    ///
    /// # Example (JavaScript)
    /// ```js
    /// sessionStorage.setItem('misgarot_design_session', btoa(String.fromCharCode(...session.toBytes())));
    /// ```
    #[wasm_bindgen(js_name = toBytes)]
    pub fn to_bytes(&mut self) -> Uint8Array {
        let bytes = self.inner.save();
        Uint8Array::from(&bytes[..])
    }

    #[wasm_bindgen(js_name = saveLandscapeDesign)]
    pub fn save_landscape_design(
        &mut self,
        elements: JsValue,
        style: JsValue,
        width: u32,
        height: u32,
    ) -> Result<(), JsValue> {
        let elements: Vec<Element> = from_value(elements)?;
        let style: DesignStyle = from_value(style)?;
        js_result!(self
            .inner
            .save_landscape_design(elements, &style, CanvasSize::new(width, height)))
    }

    #[wasm_bindgen(js_name = savePortraitDesign)]
    pub fn save_portrait_design(
        &mut self,
        elements: JsValue,
        style: JsValue,
        width: u32,
        height: u32,
    ) -> Result<(), JsValue> {
        let elements: Vec<Element> = from_value(elements)?;
        let style: DesignStyle = from_value(style)?;
        js_result!(self
            .inner
            .save_portrait_design(elements, &style, CanvasSize::new(width, height)))
    }

    /// Returns `{ elements, style, size }` or null.
    #[wasm_bindgen(js_name = getLandscapeDesign)]
    pub fn get_landscape_design(&mut self) -> Result<JsValue, JsValue> {
        js_or_null(js_result!(self.inner.get_landscape_design())?)
    }

    /// Returns `{ elements, style, size }` or null.
    #[wasm_bindgen(js_name = getPortraitDesign)]
    pub fn get_portrait_design(&mut self) -> Result<JsValue, JsValue> {
        js_or_null(js_result!(self.inner.get_portrait_design())?)
    }

    #[wasm_bindgen(js_name = hasPortraitDesign)]
    pub fn has_portrait_design(&mut self) -> Result<bool, JsValue> {
        js_result!(self.inner.has_portrait_design())
    }

    #[wasm_bindgen(js_name = getDesignStyle)]
    pub fn get_design_style(&mut self) -> Result<JsValue, JsValue> {
        js_or_null(js_result!(self.inner.get_design_style())?)
    }

    #[wasm_bindgen(js_name = clearSession)]
    pub fn clear_session(&mut self) -> Result<(), JsValue> {
        js_result!(self.inner.clear_session())
    }

    /// Derives portrait elements from unlocked landscape elements.
    #[wasm_bindgen(js_name = calculatePortraitFromLandscape)]
    pub fn calculate_portrait_from_landscape(
        &self,
        elements: JsValue,
        landscape_width: u32,
        landscape_height: u32,
        portrait_width: u32,
        portrait_height: u32,
    ) -> Result<JsValue, JsValue> {
        let elements: Vec<Element> = from_value(elements)?;
        let derived = js_result!(self.inner.calculate_portrait_from_landscape(
            &elements,
            CanvasSize::new(landscape_width, landscape_height),
            CanvasSize::new(portrait_width, portrait_height),
        ))?;
        Ok(to_js_value(&derived)?)
    }
}

impl Default for JsDesignSessionManager {
    fn default() -> Self {
        Self::new()
    }
}
