//! Project persistence: the JSON project document, the key/value storage it
//! is written to, and the embedded image payloads.
//!
//! Image elements carry their source raster as a PNG data URI under
//! `imageData`, encoded from the full decoded bitmap rather than the cropped
//! or scaled view. Loading decodes every embedded image concurrently and
//! completes once all of them have resolved; an element whose payload fails
//! to decode is logged and skipped.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use std::collections::HashMap;
use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::background::{Background, DEFAULT_BACKGROUND_COLOR, Pattern};
use crate::config::EditorConfig;
use crate::doc::Scene;
use crate::element::{Element, ElementKind};
use crate::error::EditorError;
use crate::surface::Bitmap;

/// Document format written by [`snapshot`].
pub const DOCUMENT_VERSION: &str = "1.0";

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";
const IMAGE_DATA_KEY: &str = "imageData";
const KNOWN_TYPES: [&str; 4] = ["text", "image", "shape", "arrow"];

// =============================================================
// Document
// =============================================================

/// Application and canvas details recorded alongside the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub app_name: String,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

/// The serialized project.
///
/// Elements stay as raw JSON until [`decode_project`] so one bad entry cannot
/// reject the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub elements: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_pattern: Option<Pattern>,
    pub version: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl ProjectDocument {
    /// Parse and validate a stored document.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Validation`] for malformed JSON or a document
    /// without a `version` string and an `elements` array.
    pub fn parse(raw: &str) -> Result<Self, EditorError> {
        let doc: Self = serde_json::from_str(raw)?;
        if doc.version.is_empty() {
            return Err(EditorError::Validation("project document has an empty version".into()));
        }
        Ok(doc)
    }

    /// Serialize to a JSON string.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures as [`EditorError::Validation`].
    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Background recorded in the document, with defaults for missing keys.
    #[must_use]
    pub fn background(&self) -> Background {
        Background {
            color: self.background_color.clone().unwrap_or_else(|| DEFAULT_BACKGROUND_COLOR.to_owned()),
            pattern: self.background_pattern.unwrap_or_default(),
        }
    }
}

/// Serialize the scene. Selection and render caches are left out.
///
/// An image whose bitmap is missing is written without `imageData` and will
/// be skipped on load.
///
/// # Errors
///
/// Returns [`EditorError::Resource`] when an image cannot be encoded.
pub fn snapshot(scene: &Scene, config: &EditorConfig, timestamp: i64) -> Result<ProjectDocument, EditorError> {
    let mut elements = Vec::with_capacity(scene.len());
    for element in scene.elements() {
        let mut value = serde_json::to_value(element)?;
        if let ElementKind::Image(image) = &element.kind {
            match &image.bitmap {
                Some(bitmap) => {
                    let uri = encode_png_data_uri(bitmap.pixels())?;
                    if let Some(fields) = value.as_object_mut() {
                        fields.insert(IMAGE_DATA_KEY.to_owned(), Value::String(uri));
                    }
                }
                None => warn!(id = %element.id, "image has no decoded bitmap; saving without pixels"),
            }
        }
        elements.push(value);
    }
    Ok(ProjectDocument {
        elements,
        background_color: Some(scene.background.color.clone()),
        background_pattern: Some(scene.background.pattern),
        version: DOCUMENT_VERSION.to_owned(),
        timestamp,
        metadata: Some(Metadata {
            app_name: config.app_name.clone(),
            canvas_width: config.canvas_width,
            canvas_height: config.canvas_height,
        }),
    })
}

// =============================================================
// Image payloads
// =============================================================

/// Encode pixels as a `data:image/png;base64,` URI.
///
/// # Errors
///
/// Returns [`EditorError::Resource`] when PNG encoding fails.
pub fn encode_png_data_uri(pixels: &RgbaImage) -> Result<String, EditorError> {
    let mut png = Vec::new();
    pixels.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(&png)))
}

/// Extract the raw bytes from a base64 `data:` URI of any image type.
///
/// # Errors
///
/// Returns [`EditorError::Resource`] when the URI is not base64 data.
pub fn data_uri_bytes(uri: &str) -> Result<Vec<u8>, EditorError> {
    let payload = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| payload)
        .ok_or_else(|| EditorError::Resource("image payload is not a base64 data URI".into()))?;
    Ok(STANDARD.decode(payload)?)
}

/// Turns encoded image bytes into a bitmap. Decoding may suspend.
pub trait ImageDecoder {
    fn decode(&self, bytes: Vec<u8>) -> impl Future<Output = Result<Bitmap, EditorError>>;
}

/// [`ImageDecoder`] backed by the `image` crate's PNG and JPEG codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecDecoder;

impl CodecDecoder {
    /// Decode synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Resource`] for an unsupported or corrupt payload.
    pub fn decode_now(bytes: &[u8]) -> Result<Bitmap, EditorError> {
        Ok(Bitmap::new(image::load_from_memory(bytes)?.to_rgba8()))
    }
}

impl ImageDecoder for CodecDecoder {
    async fn decode(&self, bytes: Vec<u8>) -> Result<Bitmap, EditorError> {
        Self::decode_now(&bytes)
    }
}

// =============================================================
// Loading
// =============================================================

/// A decoded project ready to replace the scene.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub elements: Vec<Element>,
    pub background: Background,
    /// Entries dropped because of an unknown type or a bad payload.
    pub skipped: usize,
}

/// Decode every element of `doc`, running image decodes concurrently.
///
/// Entries with a missing or unknown `type`, fields that do not parse, or an
/// image payload that fails to decode are logged and skipped.
pub async fn decode_project<D: ImageDecoder + ?Sized>(doc: &ProjectDocument, decoder: &D) -> LoadedProject {
    let pending = doc.elements.iter().enumerate().map(|(index, raw)| decode_element(index, raw, decoder));
    let results = join_all(pending).await;

    let total = results.len();
    let elements: Vec<Element> = results.into_iter().flatten().collect();
    LoadedProject { skipped: total - elements.len(), elements, background: doc.background() }
}

async fn decode_element<D: ImageDecoder + ?Sized>(index: usize, raw: &Value, decoder: &D) -> Option<Element> {
    let kind = raw.get("type").and_then(Value::as_str);
    if !kind.is_some_and(|k| KNOWN_TYPES.contains(&k)) {
        warn!(index, kind = kind.unwrap_or("<missing>"), "skipping element with unknown type");
        return None;
    }
    let mut element: Element = match serde_json::from_value(raw.clone()) {
        Ok(element) => element,
        Err(err) => {
            warn!(index, error = %err, "skipping element that does not parse");
            return None;
        }
    };
    element.set_rotation(element.rotation);

    if let Some(image) = element.as_image_mut() {
        let Some(uri) = raw.get(IMAGE_DATA_KEY).and_then(Value::as_str) else {
            warn!(index, "skipping image without embedded pixels");
            return None;
        };
        let decoded = match data_uri_bytes(uri) {
            Ok(bytes) => decoder.decode(bytes).await,
            Err(err) => Err(err),
        };
        match decoded {
            Ok(bitmap) => image.attach_bitmap(bitmap),
            Err(err) => {
                warn!(index, error = %err, "skipping image that failed to decode");
                return None;
            }
        }
    }
    let start = element.anchor();
    if let ElementKind::Arrow(arrow) = &mut element.kind {
        arrow.refresh_bounds(start);
    }
    Some(element)
}

// =============================================================
// Storage
// =============================================================

/// String key/value store the project is saved to.
pub trait Storage {
    /// # Errors
    ///
    /// Returns [`EditorError::Resource`] when the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, EditorError>;

    /// # Errors
    ///
    /// Returns [`EditorError::Resource`] when the write is refused, e.g. over quota.
    fn set(&mut self, key: &str, value: &str) -> Result<(), EditorError>;
}

/// In-memory [`Storage`] with an optional per-value size quota.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse writes longer than `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self { entries: HashMap::new(), quota: Some(bytes) }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, EditorError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EditorError> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(EditorError::Resource(format!(
                    "storage quota exceeded: {} bytes over a {quota} byte limit",
                    value.len()
                )));
            }
        }
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// The browser's `window.localStorage`.
pub struct LocalStorage {
    inner: web_sys::Storage,
}

impl LocalStorage {
    /// Open the window's local storage.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Resource`] when there is no window or storage is disabled.
    pub fn open() -> Result<Self, EditorError> {
        let inner = web_sys::window()
            .ok_or_else(|| EditorError::Resource("no window".into()))?
            .local_storage()
            .map_err(|err| EditorError::Resource(format!("local storage unavailable: {err:?}")))?
            .ok_or_else(|| EditorError::Resource("local storage is disabled".into()))?;
        Ok(Self { inner })
    }
}

impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, EditorError> {
        self.inner.get_item(key).map_err(|err| EditorError::Resource(format!("storage read failed: {err:?}")))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), EditorError> {
        self.inner.set_item(key, value).map_err(|err| EditorError::Resource(format!("storage write failed: {err:?}")))
    }
}

// =============================================================
// Save / load
// =============================================================

/// Serialize the scene and write it under the configured key.
///
/// # Errors
///
/// Returns [`EditorError::Resource`] when encoding or the write fails. The
/// previously stored project is left as it was.
pub fn save<S: Storage + ?Sized>(
    scene: &Scene,
    config: &EditorConfig,
    storage: &mut S,
    timestamp: i64,
) -> Result<(), EditorError> {
    let json = snapshot(scene, config, timestamp)?.to_json()?;
    storage.set(&config.storage_key, &json)?;
    info!(elements = scene.len(), bytes = json.len(), "project saved");
    Ok(())
}

/// Read the stored project document, if there is one.
///
/// # Errors
///
/// Returns [`EditorError::Resource`] when storage cannot be read and
/// [`EditorError::Validation`] when the stored document is malformed.
pub fn read_stored<S: Storage + ?Sized>(
    config: &EditorConfig,
    storage: &S,
) -> Result<Option<ProjectDocument>, EditorError> {
    match storage.get(&config.storage_key)? {
        Some(raw) => ProjectDocument::parse(&raw).map(Some),
        None => Ok(None),
    }
}
