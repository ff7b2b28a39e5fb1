//! Editor configuration supplied by the host page.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::error::EditorError;

pub const DEFAULT_CANVAS_WIDTH: f64 = 1280.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 720.0;
pub const DEFAULT_STORAGE_KEY: &str = "youtube-thumbnail-project";
pub const DEFAULT_APP_NAME: &str = "YouTube Thumbnail Maker";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_EXPORT_QUALITY: f64 = 0.9;

/// Tuning knobs for an editor instance. Every field has a default, so the
/// host only needs to send the keys it wants to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Canvas backing-store width in pixels.
    pub canvas_width: f64,
    /// Canvas backing-store height in pixels.
    pub canvas_height: f64,
    /// Key the project is saved under in browser storage.
    pub storage_key: String,
    /// Save automatically after every committed edit.
    pub autosave: bool,
    /// Largest accepted image upload, in bytes.
    pub max_upload_bytes: usize,
    /// Accepted image upload MIME types.
    pub accepted_mime_types: Vec<String>,
    /// JPEG quality used when the caller does not pass one.
    pub export_quality: f64,
    /// Application name recorded in saved project metadata.
    pub app_name: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            autosave: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_mime_types: ["image/png", "image/jpeg", "image/gif", "image/webp"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            export_quality: DEFAULT_EXPORT_QUALITY,
            app_name: DEFAULT_APP_NAME.to_owned(),
        }
    }
}

impl EditorConfig {
    /// Parse a host-provided JSON object, filling unspecified keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Validation`] when the JSON is malformed or the
    /// canvas size is not positive.
    pub fn from_json(raw: &str) -> Result<Self, EditorError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Validation`] for a non-positive canvas size or an
    /// export quality outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), EditorError> {
        if !(self.canvas_width > 0.0 && self.canvas_height > 0.0) {
            return Err(EditorError::Validation(format!(
                "canvas size must be positive, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if !(0.0..=1.0).contains(&self.export_quality) {
            return Err(EditorError::Validation(format!(
                "export quality must be within [0, 1], got {}",
                self.export_quality
            )));
        }
        Ok(())
    }

    /// Reject uploads with a disallowed type or an oversized payload.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Validation`] describing the rejected property.
    pub fn check_upload(&self, mime_type: &str, byte_len: usize) -> Result<(), EditorError> {
        if !self.accepted_mime_types.iter().any(|m| m.eq_ignore_ascii_case(mime_type)) {
            return Err(EditorError::Validation(format!("unsupported image type: {mime_type}")));
        }
        if byte_len > self.max_upload_bytes {
            return Err(EditorError::Validation(format!(
                "image is {byte_len} bytes; the limit is {}",
                self.max_upload_bytes
            )));
        }
        Ok(())
    }
}
