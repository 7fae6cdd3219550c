//! HTTP client for the hosted Supabase backend.
//!
//! Records go through PostgREST (`/rest/v1/<table>`), previews through Storage
//! (`/storage/v1/object/<bucket>/<path>`) and the design email through the
//! `send-design-email` edge function.

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    NotificationKind, NotificationPayload, Notifier, ObjectStorage, RecordPatch, RecordStore,
    SnapshotRecord,
};
use crate::config::SupabaseConfig;
use crate::error::{EditorError, EditorResult};

/// Edge function delivering design emails.
const EMAIL_FUNCTION: &str = "send-design-email";

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] header::InvalidHeaderValue),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Insert returned no row")]
    EmptyInsert,
}

impl From<ClientError> for EditorError {
    fn from(err: ClientError) -> Self {
        EditorError::remote(err.to_string())
    }
}

/// Email request body: the payload plus its kind.
#[derive(Serialize)]
struct EmailRequest<'a> {
    #[serde(rename = "type")]
    kind: NotificationKind,
    #[serde(flatten)]
    payload: &'a NotificationPayload,
}

/// Edge functions report failures in a 200 body.
#[derive(Debug, Default, Deserialize)]
struct FunctionResponse {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: serde_json::Value,
}

/// Record store, object storage and notifier over the Supabase REST APIs.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
}

impl SupabaseClient {
    /// Create a new client. The access token, when set, replaces the anon key as bearer.
    pub fn new(config: &SupabaseConfig) -> Result<Self, ClientError> {
        let bearer = config.access_token.as_deref().unwrap_or(&config.anon_key);
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );
        headers.insert("apikey", header::HeaderValue::from_str(&config.anon_key)?);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Public URL of an object in a public bucket.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }

    async fn check(resp: Response) -> Result<Response, ClientError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }
        Ok(resp)
    }

    /// GET /rest/v1/{table}?id=eq.{id}
    pub async fn fetch_record(
        &self,
        table: &str,
        id: &str,
    ) -> Result<Option<SnapshotRecord>, ClientError> {
        let resp = self
            .client
            .get(self.rest_url(table))
            .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())])
            .send()
            .await?;
        let rows: Vec<SnapshotRecord> = Self::check(resp).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    /// POST /rest/v1/{table} - returns the new row id
    pub async fn insert_record(
        &self,
        table: &str,
        record: &SnapshotRecord,
    ) -> Result<String, ClientError> {
        let resp = self
            .client
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;
        let rows: Vec<InsertedRow> = Self::check(resp).await?.json().await?;
        let row = rows.into_iter().next().ok_or(ClientError::EmptyInsert)?;
        // ids are uuids or bigints depending on the table
        let id = match row.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(id)
    }

    /// PATCH /rest/v1/{table}?id=eq.{id}
    pub async fn patch_record(
        &self,
        table: &str,
        id: &str,
        patch: &RecordPatch,
    ) -> Result<(), ClientError> {
        let resp = self
            .client
            .patch(self.rest_url(table))
            .query(&[("id", format!("eq.{}", id))])
            .json(patch)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// POST /storage/v1/object/{bucket}/{path}
    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ClientError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let resp = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(self.public_url(bucket, path))
    }

    /// POST /functions/v1/send-design-email
    pub async fn send_design_email(
        &self,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> Result<(), ClientError> {
        let url = format!("{}/functions/v1/{}", self.base_url, EMAIL_FUNCTION);
        let resp = self
            .client
            .post(&url)
            .json(&EmailRequest { kind, payload })
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body: FunctionResponse = Self::check(resp).await?.json().await.unwrap_or_default();
        if let Some(message) = body.error {
            return Err(ClientError::Api { status, message });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn get(&self, collection: &str, id: &str) -> EditorResult<Option<SnapshotRecord>> {
        debug!(collection, id, "fetching record");
        Ok(self.fetch_record(collection, id).await?)
    }

    async fn create(&self, collection: &str, record: &SnapshotRecord) -> EditorResult<String> {
        let id = self.insert_record(collection, record).await?;
        info!(collection, %id, "record created");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: &RecordPatch) -> EditorResult<()> {
        self.patch_record(collection, id, patch).await?;
        debug!(collection, id, "record updated");
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> EditorResult<String> {
        Ok(self.upload_object(bucket, path, bytes, content_type).await?)
    }
}

#[async_trait]
impl Notifier for SupabaseClient {
    async fn send(&self, kind: NotificationKind, payload: &NotificationPayload) -> EditorResult<()> {
        self.send_design_email(kind, payload).await?;
        info!(?kind, "design email sent");
        Ok(())
    }
}
