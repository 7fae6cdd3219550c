//! Publish flows: finishing a client design and publishing admin frame templates.
//!
//! Records are written one at a time with no rollback. When a later step fails
//! the error carries the ids that were already created so the pair can be fixed
//! with `link_pair`.

use tracing::{info, warn};
use uuid::Uuid;

use super::controller::EditorController;
use super::{
    EditorMode, FinishDesignRequest, FinishOutcome, FinishProgress, PublishFrameRequest,
    PublishOutcome,
};
use crate::canvas::model::{CanvasSnapshot, Orientation};
use crate::canvas::store::EditPolicy;
use crate::error::{EditorError, EditorResult};
use crate::remote::{NotificationPayload, PreviewImage, RecordPatch, SnapshotRecord};

impl EditorController {
    // =========================================================================
    // FINISH DESIGN
    // =========================================================================

    /// Stores the finished design, uploads its preview and sends the email.
    ///
    /// On success the auto-save record and the session are cleared and the visit
    /// becomes terminal. Remote failures leave the canvas untouched. Every record
    /// write is remembered, so a retry after a partial failure resumes at the step
    /// that failed and an email failure only re-sends the email.
    pub async fn finish_design(&mut self, request: FinishDesignRequest) -> EditorResult<FinishOutcome> {
        self.ensure_editing()?;

        let mut progress = self.pending_finish.take().unwrap_or_default();
        let stored = self.store_design_records(&request, &mut progress).await;
        let outcome = progress.outcome();
        if outcome.is_some() {
            self.pending_finish = Some(progress);
        }
        stored?;
        let outcome = outcome.ok_or_else(|| EditorError::invalid_state("design record missing after store"))?;

        let payload = self.notification_payload(&request, &outcome.record_id);
        if let Err(e) = self.remote.notifier.send(request.kind, &payload).await {
            warn!(record = %outcome.record_id, error = %e, "design saved but email failed");
            return Err(EditorError::NotificationFailed {
                record_id: outcome.record_id,
                message: e.to_string(),
            });
        }

        self.finish_visit(outcome.record_id.clone())?;
        info!(record = %outcome.record_id, paired = ?outcome.paired_id, "design finished");
        Ok(outcome)
    }

    /// Writes the current orientation and, when present, the other orientation
    /// from the session, then links them. Steps already recorded in `progress`
    /// are skipped.
    async fn store_design_records(
        &mut self,
        request: &FinishDesignRequest,
        progress: &mut FinishProgress,
    ) -> EditorResult<()> {
        let collection = self.config.designs_collection.clone();
        let orientation = self.mode.orientation();

        let record_id = match progress.record_id.clone() {
            Some(id) => id,
            None => {
                let current = self.client_record(self.store.to_snapshot(), orientation, request);
                let id = self.remote.records.create(&collection, &current).await?;
                progress.record_id = Some(id.clone());
                progress.thumbnail_url = self.attach_thumbnail(&collection, &id, request).await;
                id
            }
        };

        if progress.paired_id.is_none() {
            let other = match orientation {
                Some(o) => self
                    .session
                    .get_design(o.opposite())?
                    .filter(|design| !design.elements.is_empty())
                    .map(|design| {
                        let snapshot = CanvasSnapshot::new(
                            design.elements,
                            design.size,
                            &design.style.to_background(),
                        );
                        self.client_record(snapshot, Some(o.opposite()), request)
                            .with_paired_id(record_id.clone())
                    }),
                None => None,
            };
            let Some(other) = other else {
                return Ok(());
            };
            let paired_id = self
                .remote
                .records
                .create(&collection, &other)
                .await
                .map_err(|e| partial(&record_id, None, "create paired design", e))?;
            progress.paired_id = Some(paired_id);
        }

        if let (Some(paired_id), false) = (progress.paired_id.clone(), progress.linked) {
            self.remote
                .records
                .update(&collection, &record_id, &RecordPatch::pair_with(paired_id.clone()))
                .await
                .map_err(|e| partial(&record_id, Some(paired_id.as_str()), "link designs", e))?;
            progress.linked = true;
        }
        Ok(())
    }

    /// Uploads the preview and records its URL on `record_id`. Both steps are best effort.
    async fn attach_thumbnail(
        &self,
        collection: &str,
        record_id: &str,
        request: &FinishDesignRequest,
    ) -> Option<String> {
        let url = match request.preview {
            Some(ref preview) => self.upload_preview("designs", record_id, preview).await?,
            None => return None,
        };
        let patch = RecordPatch {
            thumbnail_url: Some(url.clone()),
            ..Default::default()
        };
        if let Err(e) = self.remote.records.update(collection, record_id, &patch).await {
            warn!(record = %record_id, error = %e, "could not attach thumbnail");
        }
        Some(url)
    }

    fn client_record(
        &self,
        snapshot: CanvasSnapshot,
        orientation: Option<Orientation>,
        request: &FinishDesignRequest,
    ) -> SnapshotRecord {
        let mut record = SnapshotRecord::new(snapshot, orientation);
        record.client_name = request.client_name.clone();
        record.client_email = request.client_email.clone();
        record.status = Some("sent".to_string());
        record
    }

    fn notification_payload(&self, request: &FinishDesignRequest, record_id: &str) -> NotificationPayload {
        let current = request
            .preview
            .as_ref()
            .map(PreviewImage::to_data_url)
            .unwrap_or_default();
        // without a render of the other orientation both slots carry the current one
        let other = request
            .other_preview
            .as_ref()
            .map(PreviewImage::to_data_url)
            .unwrap_or_else(|| current.clone());
        let (landscape_png, portrait_png) = match self.mode {
            EditorMode::Portrait => (other, current),
            _ => (current, other),
        };
        NotificationPayload {
            photographer_email: request.photographer_email.clone(),
            photographer_name: request.photographer_name.clone(),
            client_email: request.client_email.clone(),
            client_name: request.client_name.clone(),
            landscape_png,
            portrait_png,
            design_id: Some(record_id.to_string()),
        }
    }

    /// Uploads a preview. Failures are logged and yield `None`.
    async fn upload_preview(&self, folder: &str, name: &str, preview: &PreviewImage) -> Option<String> {
        let path = format!("{}/{}.{}", folder, name, preview.extension());
        match self
            .remote
            .storage
            .upload(
                &self.config.thumbnail_bucket,
                &path,
                preview.bytes.clone(),
                &preview.content_type,
            )
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(path = %path, error = %e, "preview upload failed, continuing without thumbnail");
                None
            }
        }
    }

    // =========================================================================
    // PUBLISH FRAME (admin)
    // =========================================================================

    /// Publishes the canvas as a frame template.
    ///
    /// In landscape mode a portrait frame holding the re-projected locked elements
    /// is created too and both are linked. In portrait and custom modes one frame
    /// is created and linked to `paired_frame_id` when given.
    pub async fn publish_frame(&mut self, request: PublishFrameRequest) -> EditorResult<PublishOutcome> {
        self.ensure_editing()?;
        if self.store.policy() != EditPolicy::Admin {
            return Err(EditorError::invalid_state("publishing frames requires admin mode"));
        }
        let collection = self.config.frames_collection.clone();

        let thumbnail_url = match request.preview {
            Some(ref preview) => {
                self.upload_preview("frames", &Uuid::new_v4().to_string(), preview)
                    .await
            }
            None => None,
        };

        if self.mode == EditorMode::Landscape {
            let landscape = self
                .frame_record(
                    self.store.to_snapshot(),
                    Some(Orientation::Landscape),
                    &request,
                )
                .with_thumbnail_url(thumbnail_url);
            let landscape_id = self.remote.records.create(&collection, &landscape).await?;
            info!(frame = %landscape_id, "landscape frame published");

            let portrait_size = self.config.portrait_size;
            let portrait_snapshot = CanvasSnapshot::new(
                self.project_locked_to(portrait_size)?,
                portrait_size,
                self.store.background(),
            );
            let mut portrait = self
                .frame_record(portrait_snapshot.clone(), Some(Orientation::Portrait), &request)
                .with_paired_id(landscape_id.clone());
            portrait.design_portrait = Some(portrait_snapshot);

            let portrait_id = self
                .remote
                .records
                .create(&collection, &portrait)
                .await
                .map_err(|e| partial(&landscape_id, None, "create portrait frame", e))?;
            self.remote
                .records
                .update(&collection, &landscape_id, &RecordPatch::pair_with(portrait_id.clone()))
                .await
                .map_err(|e| partial(&landscape_id, Some(portrait_id.as_str()), "link frames", e))?;
            info!(landscape = %landscape_id, portrait = %portrait_id, "frames linked");

            return Ok(PublishOutcome {
                frame_id: landscape_id,
                paired_id: Some(portrait_id),
            });
        }

        let orientation = request.orientation.or(self.mode.orientation());
        let mut record = self
            .frame_record(self.store.to_snapshot(), orientation, &request)
            .with_thumbnail_url(thumbnail_url);
        record.paired_id = request.paired_frame_id.clone();
        let frame_id = self.remote.records.create(&collection, &record).await?;
        info!(frame = %frame_id, "frame published");

        if let Some(ref paired) = request.paired_frame_id {
            self.remote
                .records
                .update(&collection, paired, &RecordPatch::pair_with(frame_id.clone()))
                .await
                .map_err(|e| partial(&frame_id, Some(paired.as_str()), "link frames", e))?;
            info!(frame = %frame_id, paired = %paired, "frames linked");
        }

        Ok(PublishOutcome {
            frame_id,
            paired_id: request.paired_frame_id,
        })
    }

    fn frame_record(
        &self,
        snapshot: CanvasSnapshot,
        orientation: Option<Orientation>,
        request: &PublishFrameRequest,
    ) -> SnapshotRecord {
        let mut record = SnapshotRecord::new(snapshot, orientation);
        record.name = Some(request.name.clone());
        record.name_en = request.name_en.clone();
        record.category_id = request.category_id.clone();
        record.is_premium = request.is_premium;
        record
    }

    // =========================================================================
    // PAIRING REPAIR
    // =========================================================================

    /// Points `a` and `b` in `collection` at each other.
    ///
    /// Used to repair a pairing left one-sided by a partial publish.
    pub async fn link_pair(&mut self, collection: &str, a: &str, b: &str) -> EditorResult<()> {
        self.remote
            .records
            .update(collection, a, &RecordPatch::pair_with(b))
            .await?;
        self.remote
            .records
            .update(collection, b, &RecordPatch::pair_with(a))
            .await?;
        info!(collection, a, b, "pair linked");
        Ok(())
    }
}

fn partial(created_id: &str, paired_id: Option<&str>, stage: &str, err: EditorError) -> EditorError {
    warn!(created = created_id, stage, error = %err, "partial publish");
    EditorError::PartialPublish {
        created_id: created_id.to_string(),
        paired_id: paired_id.map(str::to_string),
        stage: stage.to_string(),
        message: err.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::canvas::model::{CanvasSize, Element, ShapeType};
    use crate::config::EditorConfig;
    use crate::editor::VisitState;
    use crate::persistence::slot::MemorySlot;
    use crate::remote::{Collaborators, MemoryBackend, NotificationKind};
    use crate::session::model::DesignStyle;

    struct Harness {
        backend: Arc<MemoryBackend>,
        slot: Arc<MemorySlot>,
        editor: EditorController,
    }

    fn harness() -> Harness {
        let backend = Arc::new(MemoryBackend::new());
        let slot = Arc::new(MemorySlot::new());
        let editor = EditorController::new(
            EditorConfig::default(),
            slot.clone(),
            Collaborators::from_backend(backend.clone()),
            "design-1",
        )
        .unwrap();
        Harness {
            backend,
            slot,
            editor,
        }
    }

    fn user_elements() -> Vec<Element> {
        vec![
            Element::text("Mazal Tov").with_id("t1").at(1250.0, 937.5),
            Element::shape(ShapeType::Circle)
                .with_id("s1")
                .at(100.0, 100.0)
                .with_size(200.0, 200.0),
        ]
    }

    fn frame_elements() -> Vec<Element> {
        vec![Element::image("frame-landscape.png")
            .with_id("frame")
            .with_size(2500.0, 1875.0)
            .locked()]
    }

    fn seed_template(backend: &MemoryBackend) -> (String, String) {
        let portrait_frame = Element::image("frame-portrait.png")
            .with_id("frame-p")
            .with_size(1875.0, 2500.0)
            .locked();
        let portrait_id = backend
            .insert(
                "frames",
                SnapshotRecord::new(
                    CanvasSnapshot::new(
                        vec![portrait_frame],
                        CanvasSize::PORTRAIT,
                        &Default::default(),
                    ),
                    Some(Orientation::Portrait),
                ),
            )
            .unwrap();
        let mut elements = frame_elements();
        elements.extend(user_elements());
        let landscape_id = backend
            .insert(
                "frames",
                SnapshotRecord::new(
                    CanvasSnapshot::new(elements, CanvasSize::LANDSCAPE, &Default::default()),
                    Some(Orientation::Landscape),
                )
                .with_paired_id(portrait_id.clone()),
            )
            .unwrap();
        (landscape_id, portrait_id)
    }

    async fn landscape_with_user_elements(h: &mut Harness) {
        h.editor.enter(EditorMode::Landscape, None).await.unwrap();
        for el in user_elements() {
            h.editor.store_mut().unwrap().add_element(el);
        }
    }

    fn ids(editor: &EditorController) -> Vec<String> {
        editor.store().elements().iter().map(|e| e.id.clone()).collect()
    }

    // -------------------------------------------------------------------------
    // navigation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_continue_to_portrait_derives_elements() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;

        h.editor.continue_to_portrait().unwrap();
        assert_eq!(h.editor.mode(), EditorMode::Portrait);
        assert_eq!(h.editor.store().size(), CanvasSize::PORTRAIT);
        assert_eq!(ids(&h.editor), vec!["t1", "s1"]);
        let text = h.editor.store().element("t1").unwrap();
        assert!((text.x - 937.5).abs() < 1e-9);
        assert!((text.y - 1250.0).abs() < 1e-9);

        // continuing also auto-saved the landscape canvas
        assert!(h.editor.autosave().has_saved_data());
    }

    #[tokio::test]
    async fn test_back_and_forth_does_not_duplicate() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;

        h.editor.continue_to_portrait().unwrap();
        let first = h.editor.store().elements().to_vec();

        h.editor.back_to_landscape().unwrap();
        assert_eq!(h.editor.store().size(), CanvasSize::LANDSCAPE);
        assert_eq!(ids(&h.editor), vec!["t1", "s1"]);

        h.editor.continue_to_portrait().unwrap();
        assert_eq!(h.editor.store().elements(), first.as_slice());
    }

    #[tokio::test]
    async fn test_portrait_edits_survive_round_trip() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor.continue_to_portrait().unwrap();
        h.editor
            .store_mut()
            .unwrap()
            .add_element(Element::text("portrait only").with_id("p1"));

        h.editor.back_to_landscape().unwrap();
        assert!(h.editor.store().element("p1").is_none());
        h.editor.continue_to_portrait().unwrap();
        assert!(h.editor.store().element("p1").is_some());
        assert_eq!(h.editor.store().len(), 3);
    }

    #[tokio::test]
    async fn test_locked_portrait_elements_are_preserved() {
        let mut h = harness();
        let (landscape_id, _) = seed_template(&h.backend);

        h.editor
            .enter(EditorMode::Landscape, Some(&landscape_id))
            .await
            .unwrap();
        assert_eq!(h.editor.store().len(), 3);

        // edit a user element in landscape
        h.editor
            .store_mut()
            .unwrap()
            .update_element(
                "s1",
                &crate::canvas::model::ElementPatch::new().position(500.0, 500.0),
            )
            .unwrap();
        h.editor.continue_to_portrait().unwrap();

        let portrait = h.editor.store().elements().to_vec();
        let locked: Vec<_> = portrait.iter().filter(|e| e.locked).collect();
        assert_eq!(locked.len(), 1);
        assert_eq!(locked[0].id, "frame-p");
        assert_eq!(locked[0].width, Some(1875.0));
        // locked first, then the re-derived user elements
        assert_eq!(portrait[0].id, "frame-p");
        let shape = h.editor.store().element("s1").unwrap();
        assert!((shape.x - 500.0 * 0.75).abs() < 1e-9);
        // landscape frame never crosses over
        assert!(h.editor.store().element("frame").is_none());
    }

    #[tokio::test]
    async fn test_portrait_template_loads_locked_only() {
        let mut h = harness();
        let (landscape_id, _) = seed_template(&h.backend);
        h.editor
            .enter(EditorMode::Portrait, Some(&landscape_id))
            .await
            .unwrap();
        assert_eq!(ids(&h.editor), vec!["frame-p"]);
        assert_eq!(h.editor.store().size(), CanvasSize::PORTRAIT);
    }

    #[tokio::test]
    async fn test_missing_template_gives_empty_canvas() {
        let mut h = harness();
        h.editor
            .enter(EditorMode::Landscape, Some("does-not-exist"))
            .await
            .unwrap();
        assert!(h.editor.store().is_empty());
        assert_eq!(h.editor.store().size(), CanvasSize::LANDSCAPE);
    }

    #[tokio::test]
    async fn test_transitions_require_matching_mode() {
        let mut h = harness();
        h.editor.enter(EditorMode::Landscape, None).await.unwrap();
        assert!(matches!(
            h.editor.back_to_landscape(),
            Err(EditorError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_session_survives_controller_restart() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor.continue_to_portrait().unwrap();

        let mut reopened = EditorController::new(
            EditorConfig::default(),
            h.slot.clone(),
            Collaborators::from_backend(h.backend.clone()),
            "design-1",
        )
        .unwrap();
        reopened.enter(EditorMode::Portrait, None).await.unwrap();
        assert_eq!(ids(&reopened), vec!["t1", "s1"]);
    }

    #[tokio::test]
    async fn test_restore_autosave_after_restart() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor.save_now().unwrap();

        let mut reopened = EditorController::new(
            EditorConfig::default(),
            h.slot.clone(),
            Collaborators::from_backend(h.backend.clone()),
            "design-1",
        )
        .unwrap();
        assert!(reopened.store().is_empty());
        assert!(reopened.autosave().has_saved_data());
        assert!(reopened.restore_autosave().unwrap());
        assert_eq!(ids(&reopened), vec!["t1", "s1"]);
    }

    #[tokio::test]
    async fn test_restore_in_portrait_ignores_landscape_autosave() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor.continue_to_portrait().unwrap();

        // the landscape record saved on the way out is for the other canvas
        assert!(!h.editor.restore_autosave().unwrap());
        assert_eq!(h.editor.mode(), EditorMode::Portrait);
        assert_eq!(h.editor.store().size(), CanvasSize::PORTRAIT);

        h.editor.back_to_landscape().unwrap();
        assert_eq!(h.editor.store().size(), CanvasSize::LANDSCAPE);
        h.editor.continue_to_portrait().unwrap();
        assert_eq!(h.editor.mode(), EditorMode::Portrait);
        assert_eq!(h.editor.store().size(), CanvasSize::PORTRAIT);
        assert_eq!(ids(&h.editor), vec!["t1", "s1"]);
    }

    #[tokio::test]
    async fn test_failed_transition_keeps_mode() {
        let mut h = harness();
        h.editor.enter(EditorMode::Portrait, None).await.unwrap();
        h.editor.store_mut().unwrap().add_element(Element::text("Hi").with_id("p1"));
        h.editor
            .session()
            .save_landscape_design(user_elements(), &DesignStyle::default(), CanvasSize::PORTRAIT)
            .unwrap();

        assert!(matches!(
            h.editor.back_to_landscape(),
            Err(EditorError::CanvasSizeMismatch { .. })
        ));
        assert_eq!(h.editor.mode(), EditorMode::Portrait);
        assert_eq!(ids(&h.editor), vec!["p1"]);
    }

    #[tokio::test]
    async fn test_mis_sized_portrait_is_derived_again() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor
            .session()
            .save_portrait_design(
                vec![Element::text("stale").with_id("x")],
                &DesignStyle::default(),
                CanvasSize::LANDSCAPE,
            )
            .unwrap();

        h.editor.continue_to_portrait().unwrap();
        assert_eq!(h.editor.store().size(), CanvasSize::PORTRAIT);
        assert_eq!(ids(&h.editor), vec!["t1", "s1"]);
    }

    #[tokio::test]
    async fn test_discard_and_start_fresh() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor.continue_to_portrait().unwrap();

        h.editor.discard_and_start_fresh().unwrap();
        assert!(h.editor.store().is_empty());
        assert!(!h.editor.autosave().has_saved_data());
        assert!(h.editor.session().get_landscape_design().unwrap().is_none());
        assert!(h.editor.session().get_portrait_design().unwrap().is_none());
    }

    // -------------------------------------------------------------------------
    // finish design
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_finish_design_pairs_records_and_ends_visit() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor.continue_to_portrait().unwrap();

        let request = FinishDesignRequest::to_client("me@studio.com", "Studio", "dana@example.com", "Dana")
            .with_previews(PreviewImage::png(vec![1, 2, 3]), None);
        let outcome = h.editor.finish_design(request).await.unwrap();

        let current = h.backend.record("designs", &outcome.record_id).unwrap();
        let paired_id = outcome.paired_id.clone().unwrap();
        let other = h.backend.record("designs", &paired_id).unwrap();
        assert_eq!(current.orientation, Some(Orientation::Portrait));
        assert_eq!(other.orientation, Some(Orientation::Landscape));
        assert_eq!(current.paired_id.as_deref(), Some(paired_id.as_str()));
        assert_eq!(other.paired_id.as_deref(), Some(outcome.record_id.as_str()));
        assert!(current.thumbnail_url.is_some());

        let sent = h.backend.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, NotificationKind::ToClient);
        assert_eq!(sent[0].1.design_id.as_deref(), Some(outcome.record_id.as_str()));
        assert!(sent[0].1.portrait_png.starts_with("data:image/png;base64,"));

        assert!(h.editor.is_published());
        assert!(!h.editor.autosave().has_saved_data());
        assert!(h.editor.session().get_landscape_design().unwrap().is_none());
        assert!(h.editor.session().get_portrait_design().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_published_visit_rejects_changes() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor
            .finish_design(FinishDesignRequest::to_self("me@studio.com", "Studio"))
            .await
            .unwrap();

        assert!(matches!(h.editor.store_mut(), Err(EditorError::VisitFinished)));
        assert!(matches!(
            h.editor.continue_to_portrait(),
            Err(EditorError::VisitFinished)
        ));
        assert!(matches!(
            h.editor.enter(EditorMode::Portrait, None).await,
            Err(EditorError::VisitFinished)
        ));
        assert!(matches!(
            h.editor
                .finish_design(FinishDesignRequest::to_self("me@studio.com", "Studio"))
                .await,
            Err(EditorError::VisitFinished)
        ));
        assert!(matches!(h.editor.state(), VisitState::Published { .. }));
    }

    #[tokio::test]
    async fn test_failed_publish_keeps_state() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor.save_now().unwrap();
        h.backend.fail_creates_after(0);

        let err = h
            .editor
            .finish_design(FinishDesignRequest::to_self("me@studio.com", "Studio"))
            .await
            .unwrap_err();
        assert!(err.is_remote());
        assert!(!h.editor.is_published());
        assert_eq!(h.editor.store().len(), 2);
        assert!(h.editor.autosave().has_saved_data());

        // retry succeeds
        h.backend.heal();
        h.editor
            .finish_design(FinishDesignRequest::to_self("me@studio.com", "Studio"))
            .await
            .unwrap();
        assert!(h.editor.is_published());
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_record_and_retries_email_only() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.backend.fail_notifications(true);

        let err = h
            .editor
            .finish_design(FinishDesignRequest::to_self("me@studio.com", "Studio"))
            .await
            .unwrap_err();
        let record_id = match err {
            EditorError::NotificationFailed { record_id, .. } => record_id,
            other => panic!("unexpected error: {other}"),
        };
        assert!(h.backend.record("designs", &record_id).is_some());
        assert!(!h.editor.is_published());

        h.backend.heal();
        let outcome = h
            .editor
            .finish_design(FinishDesignRequest::to_self("me@studio.com", "Studio"))
            .await
            .unwrap();
        assert_eq!(outcome.record_id, record_id);
        assert_eq!(h.backend.records("designs").len(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_paired_create_failure_resumes() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor.continue_to_portrait().unwrap();
        h.backend.fail_creates_after(1);

        let err = h
            .editor
            .finish_design(FinishDesignRequest::to_self("me@studio.com", "Studio"))
            .await
            .unwrap_err();
        let created = match err {
            EditorError::PartialPublish { created_id, .. } => created_id,
            other => panic!("unexpected error: {other}"),
        };
        assert_eq!(h.backend.records("designs").len(), 1);

        h.backend.heal();
        let outcome = h
            .editor
            .finish_design(FinishDesignRequest::to_self("me@studio.com", "Studio"))
            .await
            .unwrap();
        assert_eq!(outcome.record_id, created);

        let records = h.backend.records("designs");
        assert_eq!(records.len(), 2);
        let paired_id = outcome.paired_id.unwrap();
        let current = h.backend.record("designs", &created).unwrap();
        let other = h.backend.record("designs", &paired_id).unwrap();
        assert_eq!(current.paired_id.as_deref(), Some(paired_id.as_str()));
        assert_eq!(other.paired_id.as_deref(), Some(created.as_str()));
        assert_eq!(h.backend.sent().len(), 1);
        assert!(h.editor.is_published());
    }

    #[tokio::test]
    async fn test_retry_after_link_failure_only_links() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.editor.continue_to_portrait().unwrap();
        h.backend.fail_updates(true);

        let err = h
            .editor
            .finish_design(FinishDesignRequest::to_self("me@studio.com", "Studio"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EditorError::PartialPublish {
                paired_id: Some(_),
                ..
            }
        ));
        assert_eq!(h.backend.records("designs").len(), 2);

        h.backend.heal();
        let outcome = h
            .editor
            .finish_design(FinishDesignRequest::to_self("me@studio.com", "Studio"))
            .await
            .unwrap();
        assert_eq!(h.backend.records("designs").len(), 2);
        let paired_id = outcome.paired_id.unwrap();
        let current = h.backend.record("designs", &outcome.record_id).unwrap();
        assert_eq!(current.paired_id.as_deref(), Some(paired_id.as_str()));
    }

    #[tokio::test]
    async fn test_preview_upload_failure_is_not_fatal() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        h.backend.fail_uploads(true);

        let request = FinishDesignRequest::to_self("me@studio.com", "Studio")
            .with_previews(PreviewImage::png(vec![9]), None);
        let outcome = h.editor.finish_design(request).await.unwrap();
        assert!(outcome.thumbnail_url.is_none());
        assert!(h.editor.is_published());
    }

    // -------------------------------------------------------------------------
    // publish frame
    // -------------------------------------------------------------------------

    async fn admin_landscape(h: &mut Harness) {
        h.editor.enter(EditorMode::Landscape, None).await.unwrap();
        let store = h.editor.store_mut().unwrap();
        store.set_policy(EditPolicy::Admin);
        for el in frame_elements() {
            store.add_element(el);
        }
        for el in user_elements() {
            store.add_element(el);
        }
    }

    #[tokio::test]
    async fn test_publish_frame_requires_admin() {
        let mut h = harness();
        landscape_with_user_elements(&mut h).await;
        let err = h
            .editor
            .publish_frame(PublishFrameRequest::new("Wedding"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_publish_landscape_frame_creates_linked_pair() {
        let mut h = harness();
        admin_landscape(&mut h).await;

        let outcome = h
            .editor
            .publish_frame(PublishFrameRequest::new("Wedding").with_category("weddings"))
            .await
            .unwrap();

        let landscape = h.backend.record("frames", &outcome.frame_id).unwrap();
        let portrait_id = outcome.paired_id.unwrap();
        let portrait = h.backend.record("frames", &portrait_id).unwrap();

        assert_eq!(landscape.paired_id.as_deref(), Some(portrait_id.as_str()));
        assert_eq!(portrait.paired_id.as_deref(), Some(outcome.frame_id.as_str()));
        assert_eq!(landscape.design_data.unwrap().elements.len(), 3);

        let portrait_data = portrait.design_data.unwrap();
        assert_eq!(portrait_data.size(), CanvasSize::PORTRAIT);
        assert_eq!(portrait_data.elements.len(), 1);
        assert!(portrait_data.elements[0].locked);
        assert_eq!(portrait.width, 1875);
        assert_eq!(portrait.category_id.as_deref(), Some("weddings"));
    }

    #[tokio::test]
    async fn test_partial_publish_reports_created_id() {
        let mut h = harness();
        admin_landscape(&mut h).await;
        h.backend.fail_creates_after(1);

        let err = h
            .editor
            .publish_frame(PublishFrameRequest::new("Wedding"))
            .await
            .unwrap_err();
        let created = match err {
            EditorError::PartialPublish {
                created_id,
                paired_id,
                ..
            } => {
                assert!(paired_id.is_none());
                created_id
            }
            other => panic!("unexpected error: {other}"),
        };
        assert!(h.backend.record("frames", &created).is_some());
        assert_eq!(h.backend.records("frames").len(), 1);
        assert_eq!(h.editor.store().len(), 3);
    }

    #[tokio::test]
    async fn test_link_failure_then_manual_repair() {
        let mut h = harness();
        admin_landscape(&mut h).await;
        h.backend.fail_updates(true);

        let err = h
            .editor
            .publish_frame(PublishFrameRequest::new("Wedding"))
            .await
            .unwrap_err();
        let (a, b) = match err {
            EditorError::PartialPublish {
                created_id,
                paired_id: Some(paired_id),
                ..
            } => (created_id, paired_id),
            other => panic!("unexpected error: {other}"),
        };
        assert!(h.backend.record("frames", &a).unwrap().paired_id.is_none());

        h.backend.heal();
        h.editor.link_pair("frames", &a, &b).await.unwrap();
        assert_eq!(h.backend.record("frames", &a).unwrap().paired_id.as_deref(), Some(b.as_str()));
        assert_eq!(h.backend.record("frames", &b).unwrap().paired_id.as_deref(), Some(a.as_str()));
    }

    #[tokio::test]
    async fn test_portrait_publish_links_existing_pair() {
        let mut h = harness();
        let existing = h
            .backend
            .insert("frames", SnapshotRecord::default())
            .unwrap();
        h.editor.enter(EditorMode::Portrait, None).await.unwrap();
        h.editor.store_mut().unwrap().set_policy(EditPolicy::Admin);
        h.editor
            .store_mut()
            .unwrap()
            .add_element(Element::image("frame-portrait.png").locked());

        let outcome = h
            .editor
            .publish_frame(PublishFrameRequest::new("Bar Mitzvah").with_paired_frame(existing.clone()))
            .await
            .unwrap();
        let created = h.backend.record("frames", &outcome.frame_id).unwrap();
        assert_eq!(created.orientation, Some(Orientation::Portrait));
        assert_eq!(created.paired_id.as_deref(), Some(existing.as_str()));
        assert_eq!(
            h.backend.record("frames", &existing).unwrap().paired_id.as_deref(),
            Some(outcome.frame_id.as_str())
        );
        // publishing a frame does not end the visit
        assert!(!h.editor.is_published());
    }
}
