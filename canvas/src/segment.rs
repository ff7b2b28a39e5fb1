//! Background removal through an external person-segmentation model.
//!
//! The model itself lives outside the crate; [`Segmenter`] is the contract it
//! is driven through. [`remove_background`] checks readiness, awaits the mask
//! and composites the cutout.

#[cfg(test)]
#[path = "segment_test.rs"]
mod segment_test;

use std::fmt;
use std::future::Future;

use image::RgbaImage;

use crate::error::EditorError;
use crate::surface::Bitmap;

/// Loading state of the segmentation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelState {
    #[default]
    NotRequested,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotRequested => "the model has not been loaded yet",
            Self::Loading => "the model is still loading",
            Self::Ready => "the model is ready",
            Self::Failed => "the model failed to load",
        })
    }
}

/// Per-pixel foreground mask, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    foreground: Vec<bool>,
}

impl Mask {
    /// Build a mask from row-major flags.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Resource`] when the flag count does not match
    /// `width * height`.
    pub fn new(width: u32, height: u32, foreground: Vec<bool>) -> Result<Self, EditorError> {
        let expected = u64::from(width) * u64::from(height);
        if foreground.len() as u64 != expected {
            return Err(EditorError::Resource(format!(
                "mask has {} entries, expected {expected} for {width}x{height}",
                foreground.len()
            )));
        }
        Ok(Self { width, height, foreground })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the pixel at `(x, y)` is foreground. Out-of-range is background.
    #[must_use]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.foreground.get(idx).copied().unwrap_or(false)
    }
}

/// Outcome of a segmentation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segmentation {
    Mask(Mask),
    /// The model ran but found no person in the frame.
    NoForeground,
}

/// A segmentation model.
pub trait Segmenter {
    /// Current readiness of the model.
    fn state(&self) -> ModelState;

    /// Segment `image`. Only called while [`Segmenter::state`] is `Ready`.
    fn segment(&self, image: &RgbaImage) -> impl Future<Output = Result<Segmentation, EditorError>>;
}

/// Copy `image` with alpha zeroed wherever `mask` is background.
#[must_use]
pub fn cutout(image: &RgbaImage, mask: &Mask) -> RgbaImage {
    let mut out = image.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        if !mask.is_foreground(x, y) {
            px.0[3] = 0;
        }
    }
    out
}

/// Run `segmenter` over `source` and return the cutout bitmap.
///
/// # Errors
///
/// - [`EditorError::ModelUnavailable`] when the model is not ready.
/// - [`EditorError::Validation`] when no foreground was found.
/// - [`EditorError::Resource`] when the mask size does not match the image.
pub async fn remove_background<S: Segmenter + ?Sized>(segmenter: &S, source: &Bitmap) -> Result<Bitmap, EditorError> {
    let state = segmenter.state();
    if state != ModelState::Ready {
        return Err(EditorError::ModelUnavailable(state));
    }
    let mask = match segmenter.segment(source.pixels()).await? {
        Segmentation::Mask(mask) => mask,
        Segmentation::NoForeground => {
            return Err(EditorError::Validation("no person detected in the image".into()));
        }
    };
    if mask.width() != source.width() || mask.height() != source.height() {
        return Err(EditorError::Resource(format!(
            "mask is {}x{} but the image is {}x{}",
            mask.width(),
            mask.height(),
            source.width(),
            source.height()
        )));
    }
    tracing::debug!(width = source.width(), height = source.height(), "background removed");
    Ok(Bitmap::new(cutout(source.pixels(), &mask)))
}
