//! EditorController: navigation between orientations and the merge policy that
//! keeps the two session snapshots consistent.
//!
//! Landscape is the source of truth. Portrait user elements are derived from it on
//! the first transition; afterwards a stored portrait is kept, except that a
//! portrait carrying locked frame elements gets its user portion re-derived.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{mode_preset, EditorMode, FinishProgress, VisitState};
use crate::canvas::model::{partition_locked, Background, CanvasSize, Element, Orientation};
use crate::canvas::store::ElementStore;
use crate::config::EditorConfig;
use crate::error::{EditorError, EditorResult};
use crate::persistence::autosave::AutoSaveManager;
use crate::persistence::slot::LocalSlot;
use crate::remote::{Collaborators, SnapshotRecord};
use crate::session::manager::DesignSessionManager;
use crate::session::model::{DesignStyle, OrientationDesign};
use crate::session::transform::{calculate_portrait_from_landscape, Projection};

/// Orchestrates one editing visit.
///
/// Every remote operation takes `&mut self`, so a controller has at most one in flight.
pub struct EditorController {
    pub(super) config: EditorConfig,
    pub(super) store: ElementStore,
    pub(super) session: DesignSessionManager,
    pub(super) autosave: AutoSaveManager,
    pub(super) slot: Arc<dyn LocalSlot>,
    pub(super) remote: Collaborators,
    pub(super) mode: EditorMode,
    pub(super) template_id: Option<String>,
    pub(super) state: VisitState,
    /// Records written by a `finish_design` that has not completed yet.
    pub(super) pending_finish: Option<FinishProgress>,
}

impl EditorController {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates a controller for `design_key`, picking up a session left in `slot`.
    pub fn new(
        config: EditorConfig,
        slot: Arc<dyn LocalSlot>,
        remote: Collaborators,
        design_key: &str,
    ) -> EditorResult<Self> {
        let session = match DesignSessionManager::load(slot.as_ref(), &config.session_key) {
            Ok(Some(session)) => session,
            Ok(None) => DesignSessionManager::new(),
            Err(e) => {
                warn!(error = %e, "discarding unreadable design session");
                DesignSessionManager::new()
            }
        };
        let autosave = AutoSaveManager::from_config(slot.clone(), &config, design_key);
        let store = ElementStore::with_size(config.landscape_size);
        Ok(Self {
            config,
            store,
            session,
            autosave,
            slot,
            remote,
            mode: EditorMode::Landscape,
            template_id: None,
            state: VisitState::Editing,
            pending_finish: None,
        })
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    /// Mutable store access. Fails once the visit is published.
    pub fn store_mut(&mut self) -> EditorResult<&mut ElementStore> {
        self.ensure_editing()?;
        Ok(&mut self.store)
    }

    pub fn session(&mut self) -> &mut DesignSessionManager {
        &mut self.session
    }

    pub fn autosave(&self) -> &AutoSaveManager {
        &self.autosave
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }

    pub fn state(&self) -> &VisitState {
        &self.state
    }

    pub fn is_published(&self) -> bool {
        matches!(self.state, VisitState::Published { .. })
    }

    pub(super) fn ensure_editing(&self) -> EditorResult<()> {
        if self.is_published() {
            return Err(EditorError::VisitFinished);
        }
        Ok(())
    }

    /// Current background plus the template reference, as a session style.
    pub(super) fn current_style(&self) -> DesignStyle {
        let mut style = DesignStyle::from_background(self.store.background());
        style.frame_id = self.template_id.clone();
        style
    }

    fn persist_session(&mut self) -> EditorResult<()> {
        self.session
            .persist(self.slot.as_ref(), &self.config.session_key)
    }

    fn preset_for(&self, mode: EditorMode) -> Option<CanvasSize> {
        mode_preset(mode, self.config.landscape_size, self.config.portrait_size)
    }

    /// Loads a session snapshot into the store, checking it against the preset of `mode`.
    ///
    /// The store and the current mode are untouched on error.
    fn load_orientation_design(&mut self, mode: EditorMode, design: &OrientationDesign) -> EditorResult<()> {
        if let Some(preset) = self.preset_for(mode) {
            if design.size != preset {
                return Err(EditorError::CanvasSizeMismatch {
                    mode: mode.as_str().to_string(),
                    width: design.size.width,
                    height: design.size.height,
                    expected_width: preset.width,
                    expected_height: preset.height,
                });
            }
        }
        self.store.load_design(design.elements.clone(), design.size)?;
        self.store.set_background(design.style.to_background());
        Ok(())
    }

    /// Fails when the store is not at the preset size of the current mode.
    fn ensure_store_matches_mode(&self) -> EditorResult<()> {
        if let Some(preset) = self.preset_for(self.mode) {
            let size = self.store.size();
            if size != preset {
                return Err(EditorError::CanvasSizeMismatch {
                    mode: self.mode.as_str().to_string(),
                    width: size.width,
                    height: size.height,
                    expected_width: preset.width,
                    expected_height: preset.height,
                });
            }
        }
        Ok(())
    }

    fn load_empty(&mut self, size: CanvasSize) -> EditorResult<()> {
        self.store.load_design(Vec::new(), size)?;
        self.store.set_background(Background::default());
        Ok(())
    }

    // =========================================================================
    // ENTERING A MODE
    // =========================================================================

    /// Enters `mode`, optionally starting from the frame template `template_id`.
    ///
    /// A non-empty session snapshot for the orientation wins over the template.
    /// Template fetch failures leave an empty canvas.
    pub async fn enter(&mut self, mode: EditorMode, template_id: Option<&str>) -> EditorResult<()> {
        self.ensure_editing()?;
        self.mode = mode;
        self.template_id = template_id
            .filter(|id| !id.is_empty() && *id != "new")
            .map(str::to_string);

        if let Some(orientation) = mode.orientation() {
            if let Some(design) = self.session.get_design(orientation)? {
                if !design.elements.is_empty() {
                    self.load_orientation_design(mode, &design)?;
                    info!(mode = mode.as_str(), elements = design.elements.len(), "loaded session design");
                    return Ok(());
                }
            }
        }

        let template = match self.template_id.clone() {
            Some(id) => self.fetch_frame(&id).await,
            None => None,
        };

        match (mode, template) {
            (EditorMode::Landscape, Some(template)) => self.enter_landscape_from_template(template).await,
            (EditorMode::Portrait, Some(template)) => self.enter_portrait_from_template(template).await,
            (EditorMode::Custom, Some(template)) => {
                let Some(snapshot) = template.design_data else {
                    return self.load_empty(self.store.size());
                };
                self.store.load_snapshot(&snapshot)?;
                info!(size = %snapshot.size(), "loaded custom template");
                Ok(())
            }
            (EditorMode::Custom, None) => self.load_empty(self.store.size()),
            (_, None) => {
                let preset = self.preset_for(mode).unwrap_or(self.config.landscape_size);
                self.load_empty(preset)
            }
        }
    }

    /// Fetches a frame record; errors are logged and treated as absent.
    pub(super) async fn fetch_frame(&self, id: &str) -> Option<SnapshotRecord> {
        match self.remote.records.get(&self.config.frames_collection, id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(frame = id, error = %e, "frame template unavailable");
                None
            }
        }
    }

    /// Locked elements of the portrait counterpart of `template`.
    async fn portrait_frame_elements(&self, template: &SnapshotRecord) -> Vec<Element> {
        if template.orientation == Some(Orientation::Portrait) {
            return template
                .design_data
                .as_ref()
                .map(|s| partition_locked(&s.elements).0)
                .unwrap_or_default();
        }
        if let Some(ref paired) = template.paired_id {
            if let Some(snapshot) = self.fetch_frame(paired).await.and_then(|r| r.design_data) {
                return partition_locked(&snapshot.elements).0;
            }
        }
        template
            .design_portrait
            .as_ref()
            .map(|s| partition_locked(&s.elements).0)
            .unwrap_or_default()
    }

    /// Loads every template element and seeds both session snapshots.
    async fn enter_landscape_from_template(&mut self, template: SnapshotRecord) -> EditorResult<()> {
        let landscape_size = self.config.landscape_size;
        let portrait_size = self.config.portrait_size;
        let Some(snapshot) = template.design_data.clone() else {
            return self.load_empty(landscape_size);
        };

        self.store.load_design(snapshot.elements.clone(), landscape_size)?;
        self.store.set_background(snapshot.background());

        let (_, editable) = partition_locked(&snapshot.elements);
        let mut portrait = self.portrait_frame_elements(&template).await;
        portrait.extend(calculate_portrait_from_landscape(&editable, landscape_size, portrait_size)?);

        let mut style = self.current_style();
        if style.frame_id.is_none() {
            style.frame_id = template.id.clone();
        }
        self.session
            .save_landscape_design(snapshot.elements, &style, landscape_size)?;
        self.session.save_portrait_design(portrait, &style, portrait_size)?;
        self.persist_session()?;
        info!(template = ?template.id, "loaded landscape template");
        Ok(())
    }

    /// Loads only the locked frame elements of the portrait template.
    async fn enter_portrait_from_template(&mut self, template: SnapshotRecord) -> EditorResult<()> {
        let portrait_size = self.config.portrait_size;
        let frame = self.portrait_frame_elements(&template).await;
        let background = template
            .design_data
            .as_ref()
            .map(|s| s.background())
            .unwrap_or_default();
        self.store.load_design(frame, portrait_size)?;
        self.store.set_background(background);
        info!(template = ?template.id, locked = self.store.len(), "loaded portrait frame");
        Ok(())
    }

    // =========================================================================
    // ORIENTATION TRANSITIONS
    // =========================================================================

    /// Saves the landscape design, derives or refreshes the portrait design and
    /// switches the store to portrait.
    pub fn continue_to_portrait(&mut self) -> EditorResult<()> {
        self.ensure_editing()?;
        if self.mode != EditorMode::Landscape {
            return Err(EditorError::invalid_state(format!(
                "continue to portrait from {} mode",
                self.mode.as_str()
            )));
        }
        self.ensure_store_matches_mode()?;

        let landscape_size = self.store.size();
        let portrait_size = self.config.portrait_size;
        let elements = self.store.elements().to_vec();
        let (_, user_elements) = partition_locked(&elements);
        let style = self.current_style();

        self.session
            .save_landscape_design(elements, &style, landscape_size)?;

        match self.session.get_portrait_design()? {
            // a portrait stored at any other size is replaced by a fresh derivation
            Some(existing) if !existing.elements.is_empty() && existing.size == portrait_size => {
                if existing.has_locked() {
                    let (mut merged, _) = partition_locked(&existing.elements);
                    let locked = merged.len();
                    merged.extend(calculate_portrait_from_landscape(
                        &user_elements,
                        landscape_size,
                        portrait_size,
                    )?);
                    self.session.save_portrait_design(merged, &style, portrait_size)?;
                    debug!(locked, user = user_elements.len(), "refreshed portrait user elements");
                } else {
                    debug!(elements = existing.elements.len(), "keeping edited portrait");
                }
            }
            _ => {
                let derived =
                    calculate_portrait_from_landscape(&user_elements, landscape_size, portrait_size)?;
                debug!(elements = derived.len(), "derived portrait from landscape");
                self.session.save_portrait_design(derived, &style, portrait_size)?;
            }
        }

        self.persist_session()?;
        self.autosave.save(&self.store)?;

        match self.session.get_portrait_design()? {
            Some(design) => self.load_orientation_design(EditorMode::Portrait, &design)?,
            None => self.load_empty(portrait_size)?,
        }
        self.mode = EditorMode::Portrait;
        info!(elements = self.store.len(), "switched to portrait");
        Ok(())
    }

    /// Saves the portrait design (locked first, then user elements) and switches
    /// the store back to landscape.
    pub fn back_to_landscape(&mut self) -> EditorResult<()> {
        self.ensure_editing()?;
        if self.mode != EditorMode::Portrait {
            return Err(EditorError::invalid_state(format!(
                "back to landscape from {} mode",
                self.mode.as_str()
            )));
        }
        self.ensure_store_matches_mode()?;

        let (mut elements, user) = partition_locked(self.store.elements());
        elements.extend(user);
        let style = self.current_style();
        self.session
            .save_portrait_design(elements, &style, self.store.size())?;
        self.persist_session()?;

        match self.session.get_landscape_design()? {
            Some(design) => self.load_orientation_design(EditorMode::Landscape, &design)?,
            None => self.load_empty(self.config.landscape_size)?,
        }
        self.mode = EditorMode::Landscape;
        info!(elements = self.store.len(), "switched to landscape");
        Ok(())
    }

    /// Re-projects locked frame elements onto the other orientation preset.
    pub(super) fn project_locked_to(&self, target: CanvasSize) -> EditorResult<Vec<Element>> {
        let (locked, _) = partition_locked(self.store.elements());
        let projection = Projection::new(self.store.size(), target)?;
        Ok(projection.project_all(&locked))
    }

    // =========================================================================
    // AUTO-SAVE
    // =========================================================================

    /// Explicit save: writes the auto-save record and the session.
    pub fn save_now(&mut self) -> EditorResult<()> {
        self.ensure_editing()?;
        self.autosave.save(&self.store)?;
        self.persist_session()
    }

    /// Periodic trigger, see [`AutoSaveManager::tick`].
    pub fn tick(&mut self, now: DateTime<Utc>) -> EditorResult<bool> {
        if self.is_published() {
            return Ok(false);
        }
        self.autosave.tick(&self.store, now)
    }

    /// Restores the auto-save record into the store.
    ///
    /// In landscape and portrait modes a record saved at the other orientation's
    /// size is skipped and `false` is returned.
    pub fn restore_autosave(&mut self) -> EditorResult<bool> {
        self.ensure_editing()?;
        let expected = self.preset_for(self.mode);
        self.autosave.restore_sized(&mut self.store, expected)
    }

    /// Drops the auto-save record, the session and the canvas.
    pub fn discard_and_start_fresh(&mut self) -> EditorResult<()> {
        self.ensure_editing()?;
        self.autosave.clear()?;
        self.session.clear_session()?;
        self.persist_session()?;
        let size = self.preset_for(self.mode).unwrap_or(self.store.size());
        self.load_empty(size)?;
        self.pending_finish = None;
        info!("started fresh design");
        Ok(())
    }

    /// Clears local state after the visit is published.
    pub(super) fn finish_visit(&mut self, record_id: String) -> EditorResult<()> {
        self.autosave.clear()?;
        self.session.clear_session()?;
        self.persist_session()?;
        self.pending_finish = None;
        self.state = VisitState::Published { record_id };
        Ok(())
    }
}
