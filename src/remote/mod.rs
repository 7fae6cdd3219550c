//! Remote collaborators.
//!
//! The editor publishes through three narrow traits: a record store for frame and
//! design records, object storage for preview images and a notifier for the
//! design email. `MemoryBackend` implements all three in-process; `SupabaseClient`
//! (feature `remote`) talks to the hosted backend.

pub mod memory;

#[cfg(feature = "remote")]
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::canvas::model::{CanvasSnapshot, Orientation};
use crate::error::EditorResult;

pub use memory::MemoryBackend;

#[cfg(feature = "remote")]
pub use supabase::{ClientError, SupabaseClient};

// =============================================================================
// RECORDS
// =============================================================================

/// A stored snapshot: a published frame template or a finished client design.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SnapshotRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,

    pub design_data: Option<CanvasSnapshot>,

    /// Portrait counterpart stored inline on portrait frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_portrait: Option<CanvasSnapshot>,

    /// Record of the other orientation. Symmetric once linked.
    #[serde(rename = "paired_frame_id", alias = "pairedId")]
    pub paired_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub is_premium: bool,
    pub is_active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    pub width: u32,
    pub height: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl SnapshotRecord {
    /// Creates a record for `snapshot` tagged with `orientation`.
    pub fn new(snapshot: CanvasSnapshot, orientation: Option<Orientation>) -> Self {
        Self {
            orientation,
            width: snapshot.canvas_width,
            height: snapshot.canvas_height,
            design_data: Some(snapshot),
            is_active: true,
            ..Default::default()
        }
    }

    /// Builder: Link to the record of the other orientation.
    pub fn with_paired_id(mut self, id: impl Into<String>) -> Self {
        self.paired_id = Some(id.into());
        self
    }

    /// Builder: Attach the uploaded preview.
    pub fn with_thumbnail_url(mut self, url: Option<String>) -> Self {
        self.thumbnail_url = url;
        self
    }
}

/// Partial update of a stored record. Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordPatch {
    #[serde(
        rename = "paired_frame_id",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub paired_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thumbnail_url: Option<String>,
}

impl RecordPatch {
    pub fn pair_with(id: impl Into<String>) -> Self {
        Self {
            paired_id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Applies the patch to a record in place.
    pub fn apply_to(&self, record: &mut SnapshotRecord) {
        if let Some(ref paired) = self.paired_id {
            record.paired_id = Some(paired.clone());
        }
        if let Some(ref url) = self.thumbnail_url {
            record.thumbnail_url = Some(url.clone());
        }
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Who the design email goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ToSelf,
    ToClient,
}

/// Body of the design email request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub photographer_email: String,
    pub photographer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Data URL.
    pub landscape_png: String,
    /// Data URL.
    pub portrait_png: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_id: Option<String>,
}

/// A rendered preview handed in by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl PreviewImage {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "image/png".to_string(),
        }
    }

    /// `data:<type>;base64,...`
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.bytes)
        )
    }

    /// File extension derived from the content type.
    pub fn extension(&self) -> &str {
        match self.content_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Whole-document records keyed by id, grouped in named collections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> EditorResult<Option<SnapshotRecord>>;

    /// Inserts `record` and returns its id.
    async fn create(&self, collection: &str, record: &SnapshotRecord) -> EditorResult<String>;

    async fn update(&self, collection: &str, id: &str, patch: &RecordPatch) -> EditorResult<()>;
}

/// Blob storage with public URLs.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads `bytes` to `path` inside `bucket` and returns the public URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> EditorResult<String>;
}

/// Design email delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, kind: NotificationKind, payload: &NotificationPayload) -> EditorResult<()>;
}

/// The collaborators an editor publishes through.
#[derive(Clone)]
pub struct Collaborators {
    pub records: Arc<dyn RecordStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    pub fn new(
        records: Arc<dyn RecordStore>,
        storage: Arc<dyn ObjectStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            records,
            storage,
            notifier,
        }
    }

    /// Uses one backend for all three roles.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RecordStore + ObjectStorage + Notifier + 'static,
    {
        Self {
            records: backend.clone(),
            storage: backend.clone(),
            notifier: backend,
        }
    }
}
