//! DesignSessionManager: both orientation snapshots of one editing visit.
//!
//! The session lives in an Automerge document. Reads hydrate the whole root (with a
//! cache); writes mutate a hydrated copy and reconcile it back. The document bytes
//! are kept in the local slot, base64 encoded, so a reload mid-visit finds them.

use automerge::{AutoCommit, ReadDoc, ROOT};
use autosurgeon::{hydrate, reconcile};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use tracing::{debug, info};

use super::model::{DesignStyle, OrientationDesign, SessionRoot};
use super::transform;
use crate::canvas::model::{CanvasSize, Element, Orientation};
use crate::error::{EditorError, EditorResult};
use crate::persistence::slot::LocalSlot;

/// Owner of the landscape and portrait snapshots plus the shared style.
pub struct DesignSessionManager {
    doc: AutoCommit,
    /// Cached hydrated state, replaced on every write.
    cached_state: Option<SessionRoot>,
}

impl DesignSessionManager {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates an empty session.
    pub fn new() -> Self {
        Self {
            doc: AutoCommit::new(),
            cached_state: Some(SessionRoot::default()),
        }
    }

    /// Creates a session from saved document bytes.
    pub fn from_bytes(bytes: &[u8]) -> EditorResult<Self> {
        let doc = AutoCommit::load(bytes)?;
        Ok(Self {
            doc,
            cached_state: None,
        })
    }

    /// Saves the document to binary format.
    pub fn save(&mut self) -> Vec<u8> {
        self.doc.save()
    }

    /// Writes the document into `slot` under `key`.
    pub fn persist(&mut self, slot: &dyn LocalSlot, key: &str) -> EditorResult<()> {
        let encoded = STANDARD.encode(self.save());
        slot.store(key, &encoded)
    }

    /// Reads a session from `slot`. `None` when the slot holds nothing.
    pub fn load(slot: &dyn LocalSlot, key: &str) -> EditorResult<Option<Self>> {
        let Some(encoded) = slot.load(key)? else {
            return Ok(None);
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| EditorError::serialization(format!("session slot: {}", e)))?;
        Ok(Some(Self::from_bytes(&bytes)?))
    }

    // =========================================================================
    // HIGH-LEVEL OPERATIONS (via Hydrate/Reconcile)
    // =========================================================================

    /// Hydrates the entire session.
    pub fn get_state(&mut self) -> EditorResult<SessionRoot> {
        if let Some(ref cached) = self.cached_state {
            return Ok(cached.clone());
        }
        // nothing was ever written
        let state = if self.doc.length(ROOT) == 0 {
            SessionRoot::default()
        } else {
            hydrate(&self.doc)?
        };
        self.cached_state = Some(state.clone());
        Ok(state)
    }

    /// Applies `f` to the session, then reconciles back to the document.
    pub fn update_state<F>(&mut self, f: F) -> EditorResult<()>
    where
        F: FnOnce(&mut SessionRoot),
    {
        let mut state = self.get_state()?;
        f(&mut state);
        reconcile(&mut self.doc, &state)?;
        self.cached_state = Some(state);
        Ok(())
    }

    // =========================================================================
    // ORIENTATION SNAPSHOTS
    // =========================================================================

    /// Stores the landscape snapshot verbatim and merges `style` into the shared style.
    pub fn save_landscape_design(
        &mut self,
        elements: Vec<Element>,
        style: &DesignStyle,
        size: CanvasSize,
    ) -> EditorResult<()> {
        self.save_design(Orientation::Landscape, elements, style, size)
    }

    /// Stores the portrait snapshot verbatim and merges `style` into the shared style.
    pub fn save_portrait_design(
        &mut self,
        elements: Vec<Element>,
        style: &DesignStyle,
        size: CanvasSize,
    ) -> EditorResult<()> {
        self.save_design(Orientation::Portrait, elements, style, size)
    }

    /// Stores one orientation's snapshot.
    pub fn save_design(
        &mut self,
        orientation: Orientation,
        elements: Vec<Element>,
        style: &DesignStyle,
        size: CanvasSize,
    ) -> EditorResult<()> {
        size.validate()?;
        let count = elements.len();
        let now = Utc::now().timestamp_millis();
        self.update_state(|state| {
            let mut shared = state.style.take().unwrap_or_default();
            shared.merge(style);
            state.style = Some(shared);

            let design = OrientationDesign::new(elements, style.clone(), size);
            match orientation {
                Orientation::Landscape => state.landscape = Some(design),
                Orientation::Portrait => state.portrait = Some(design),
            }
            state.updated_at = now;
        })?;
        debug!(orientation = orientation.as_str(), elements = count, "saved design");
        Ok(())
    }

    pub fn get_landscape_design(&mut self) -> EditorResult<Option<OrientationDesign>> {
        Ok(self.get_state()?.landscape)
    }

    pub fn get_portrait_design(&mut self) -> EditorResult<Option<OrientationDesign>> {
        Ok(self.get_state()?.portrait)
    }

    /// Snapshot for either orientation.
    pub fn get_design(&mut self, orientation: Orientation) -> EditorResult<Option<OrientationDesign>> {
        match orientation {
            Orientation::Landscape => self.get_landscape_design(),
            Orientation::Portrait => self.get_portrait_design(),
        }
    }

    /// True when a portrait snapshot with at least one element exists.
    pub fn has_portrait_design(&mut self) -> EditorResult<bool> {
        Ok(self
            .get_portrait_design()?
            .map(|design| !design.elements.is_empty())
            .unwrap_or(false))
    }

    /// Shared style, `None` before the first save.
    pub fn get_design_style(&mut self) -> EditorResult<Option<DesignStyle>> {
        Ok(self.get_state()?.style)
    }

    /// Erases both snapshots and the shared style.
    pub fn clear_session(&mut self) -> EditorResult<()> {
        self.update_state(|state| *state = SessionRoot::default())?;
        info!("design session cleared");
        Ok(())
    }

    // =========================================================================
    // TRANSFORM
    // =========================================================================

    /// Derives portrait elements from unlocked landscape elements.
    ///
    /// See [`transform::calculate_portrait_from_landscape`].
    pub fn calculate_portrait_from_landscape(
        &self,
        elements: &[Element],
        landscape_size: CanvasSize,
        portrait_size: CanvasSize,
    ) -> EditorResult<Vec<Element>> {
        transform::calculate_portrait_from_landscape(elements, landscape_size, portrait_size)
    }
}

impl Default for DesignSessionManager {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::model::Background;
    use crate::persistence::slot::MemorySlot;

    fn elements() -> Vec<Element> {
        vec![
            Element::text("hello").with_id("t1").at(10.0, 20.0),
            Element::image("frame.png").with_id("f1").locked(),
        ]
    }

    #[test]
    fn test_new_session_is_empty() {
        let mut session = DesignSessionManager::new();
        assert!(session.get_landscape_design().unwrap().is_none());
        assert!(session.get_portrait_design().unwrap().is_none());
        assert!(!session.has_portrait_design().unwrap());
        assert!(session.get_design_style().unwrap().is_none());
    }

    #[test]
    fn test_save_and_get_landscape() {
        let mut session = DesignSessionManager::new();
        let style = DesignStyle::from_background(&Background::solid("#ff0000"));
        session
            .save_landscape_design(elements(), &style, CanvasSize::LANDSCAPE)
            .unwrap();

        let design = session.get_landscape_design().unwrap().unwrap();
        assert_eq!(design.elements, elements());
        assert_eq!(design.size, CanvasSize::LANDSCAPE);
        assert_eq!(design.locked_count(), 1);
        assert_eq!(
            session.get_design_style().unwrap().unwrap().background_color,
            "#ff0000"
        );
        assert!(session.get_state().unwrap().updated_at > 0);
    }

    #[test]
    fn test_has_portrait_design_requires_elements() {
        let mut session = DesignSessionManager::new();
        session
            .save_portrait_design(Vec::new(), &DesignStyle::default(), CanvasSize::PORTRAIT)
            .unwrap();
        assert!(!session.has_portrait_design().unwrap());

        session
            .save_portrait_design(elements(), &DesignStyle::default(), CanvasSize::PORTRAIT)
            .unwrap();
        assert!(session.has_portrait_design().unwrap());
    }

    #[test]
    fn test_portrait_style_merges_into_shared() {
        let mut session = DesignSessionManager::new();
        let landscape = DesignStyle::default().with_frame_id("frame-1");
        session
            .save_landscape_design(elements(), &landscape, CanvasSize::LANDSCAPE)
            .unwrap();
        let portrait = DesignStyle::from_background(&Background::solid("#123456"));
        session
            .save_portrait_design(elements(), &portrait, CanvasSize::PORTRAIT)
            .unwrap();

        let shared = session.get_design_style().unwrap().unwrap();
        assert_eq!(shared.background_color, "#123456");
        assert_eq!(shared.frame_id.as_deref(), Some("frame-1"));
        // each orientation keeps its own copy
        let landscape_copy = session.get_landscape_design().unwrap().unwrap().style;
        assert_eq!(landscape_copy.background_color, "#ffffff");
    }

    #[test]
    fn test_clear_session() {
        let mut session = DesignSessionManager::new();
        session
            .save_landscape_design(elements(), &DesignStyle::default(), CanvasSize::LANDSCAPE)
            .unwrap();
        session
            .save_portrait_design(elements(), &DesignStyle::default(), CanvasSize::PORTRAIT)
            .unwrap();
        session.clear_session().unwrap();

        assert!(session.get_landscape_design().unwrap().is_none());
        assert!(session.get_portrait_design().unwrap().is_none());
        assert!(session.get_design_style().unwrap().is_none());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let mut session = DesignSessionManager::new();
        session
            .save_landscape_design(elements(), &DesignStyle::default(), CanvasSize::LANDSCAPE)
            .unwrap();
        let bytes = session.save();

        let mut loaded = DesignSessionManager::from_bytes(&bytes).unwrap();
        assert_eq!(
            loaded.get_landscape_design().unwrap(),
            session.get_landscape_design().unwrap()
        );
    }

    #[test]
    fn test_persist_and_load_from_slot() {
        let slot = MemorySlot::new();
        assert!(DesignSessionManager::load(&slot, "session").unwrap().is_none());

        let mut session = DesignSessionManager::new();
        session
            .save_portrait_design(elements(), &DesignStyle::default(), CanvasSize::PORTRAIT)
            .unwrap();
        session.persist(&slot, "session").unwrap();

        let mut loaded = DesignSessionManager::load(&slot, "session").unwrap().unwrap();
        assert!(loaded.has_portrait_design().unwrap());
        assert_eq!(loaded.get_portrait_design().unwrap().unwrap().elements, elements());
    }

    #[test]
    fn test_empty_document_loads_as_empty_session() {
        let mut session = DesignSessionManager::new();
        let bytes = session.save();
        let mut loaded = DesignSessionManager::from_bytes(&bytes).unwrap();
        assert!(loaded.get_state().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_slot_contents() {
        let slot = MemorySlot::new();
        slot.store("session", "not base64!").unwrap();
        assert!(matches!(
            DesignSessionManager::load(&slot, "session"),
            Err(EditorError::Serialization(_))
        ));
    }

    #[test]
    fn test_rejects_zero_size() {
        let mut session = DesignSessionManager::new();
        let err = session
            .save_landscape_design(elements(), &DesignStyle::default(), CanvasSize::new(0, 0))
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidCanvasSize { .. }));
    }
}
