//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::canvas::model::CanvasSize;

/// Tunables shared by the editor controller and its managers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Fixed landscape canvas.
    pub landscape_size: CanvasSize,

    /// Fixed portrait canvas.
    pub portrait_size: CanvasSize,

    /// Periodic auto-save interval in seconds.
    pub autosave_interval_secs: u64,

    /// Auto-save snapshots older than this are treated as absent. `None` disables expiry.
    pub autosave_max_age_secs: Option<u64>,

    /// Prefix for the per-design auto-save slot key.
    pub autosave_key_prefix: String,

    /// Slot key holding the design session document.
    pub session_key: String,

    /// Collection holding published frame templates.
    pub frames_collection: String,

    /// Collection holding finished client designs.
    pub designs_collection: String,

    /// Storage bucket for preview thumbnails.
    pub thumbnail_bucket: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            landscape_size: CanvasSize::LANDSCAPE,
            portrait_size: CanvasSize::PORTRAIT,
            autosave_interval_secs: 30,
            autosave_max_age_secs: Some(7 * 24 * 60 * 60),
            autosave_key_prefix: "misgarot_autosave".to_string(),
            session_key: "misgarot_design_session".to_string(),
            frames_collection: "frames".to_string(),
            designs_collection: "designs".to_string(),
            thumbnail_bucket: "frame-thumbnails".to_string(),
        }
    }
}

impl EditorConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Set the auto-save interval.
    pub fn with_autosave_interval_secs(mut self, secs: u64) -> Self {
        self.autosave_interval_secs = secs;
        self
    }

    /// Builder: Set (or disable) auto-save expiry.
    pub fn with_autosave_max_age_secs(mut self, secs: Option<u64>) -> Self {
        self.autosave_max_age_secs = secs;
        self
    }

    /// Slot key for a design's auto-save snapshot.
    pub fn autosave_key(&self, design_key: &str) -> String {
        format!("{}:{}", self.autosave_key_prefix, design_key)
    }
}

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,

    /// Anonymous (or service) API key.
    pub anon_key: String,

    /// Optional user access token sent as the bearer instead of the anon key.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            access_token: None,
        }
    }

    /// Builder: Authenticate as a signed-in user.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.landscape_size, CanvasSize::new(2500, 1875));
        assert_eq!(config.portrait_size, CanvasSize::new(1875, 2500));
        assert_eq!(config.autosave_interval_secs, 30);
        assert_eq!(config.autosave_key("design-1"), "misgarot_autosave:design-1");
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"autosave_interval_secs": 5}"#).unwrap();
        assert_eq!(config.autosave_interval_secs, 5);
        assert_eq!(config.session_key, "misgarot_design_session");
    }

    #[test]
    fn test_config_builders() {
        let config = EditorConfig::new()
            .with_autosave_interval_secs(10)
            .with_autosave_max_age_secs(None);
        assert_eq!(config.autosave_interval_secs, 10);
        assert!(config.autosave_max_age_secs.is_none());

        let supabase = SupabaseConfig::new("https://xyz.supabase.co", "anon").with_access_token("jwt");
        assert_eq!(supabase.access_token.as_deref(), Some("jwt"));
    }
}
