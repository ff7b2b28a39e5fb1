//! Error taxonomy for editor operations.
//!
//! Validation errors abort an operation before anything is mutated and are
//! meant to be shown to the user. Resource errors are logged and the flow
//! degrades (an element is skipped, a save is dropped). `NotFound` covers
//! commands issued with no selection and is never surfaced.

use crate::segment::ModelState;
use crate::surface::SurfaceError;

/// Error returned by fallible editor operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Bad user input: invalid crop, malformed project file, rejected upload.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Storage read/write or image decode/encode failure.
    #[error("resource unavailable: {0}")]
    Resource(String),
    /// The segmentation model cannot service a request in its current state.
    #[error("segmentation model unavailable ({0})")]
    ModelUnavailable(ModelState),
    /// The operation needs a selection or element that does not exist.
    #[error("no such element")]
    NotFound,
    /// An asynchronous result arrived after the scene it was requested for was replaced.
    #[error("result belongs to a superseded scene")]
    Stale,
    /// The drawing backend rejected a call.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("malformed project document: {err}"))
    }
}

impl From<image::ImageError> for EditorError {
    fn from(err: image::ImageError) -> Self {
        Self::Resource(format!("image codec: {err}"))
    }
}

impl From<base64::DecodeError> for EditorError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Resource(format!("embedded image payload: {err}"))
    }
}
