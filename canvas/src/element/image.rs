//! Raster image element: display size, crop window, color effects, outline.

#[cfg(test)]
#[path = "image_test.rs"]
mod image_test;

use serde::{Deserialize, Serialize};

use super::ElementPatch;
use super::handles::{self, ACCENT_COLOR, CropHandle, Handle};
use super::outline::OutlineCache;
use crate::consts::{CROP_SHADE_ALPHA, IMAGE_FIT_FRACTION};
use crate::error::EditorError;
use crate::geom::{Point, Rect, clamp_between};
use crate::surface::{Bitmap, Surface, SurfaceResult};

/// Smallest crop window edge, in source pixels.
const MIN_CROP: f64 = 1.0;

const NEUTRAL_EFFECT: f64 = 100.0;

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

fn default_effect() -> f64 {
    NEUTRAL_EFFECT
}

fn default_outline_color() -> String {
    "#ffffff".to_owned()
}

/// Image-specific fields. Position and rotation live on [`super::Element`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub original_width: f64,
    #[serde(default)]
    pub original_height: f64,
    #[serde(default)]
    pub crop_x: f64,
    #[serde(default)]
    pub crop_y: f64,
    #[serde(default)]
    pub crop_width: f64,
    #[serde(default)]
    pub crop_height: f64,
    /// Width over height of the crop window.
    #[serde(default)]
    pub aspect_ratio: f64,
    #[serde(default = "default_true")]
    pub maintain_aspect_ratio: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Percent; 100 is neutral.
    #[serde(default = "default_effect")]
    pub brightness: f64,
    #[serde(default = "default_effect")]
    pub contrast: f64,
    #[serde(default = "default_effect")]
    pub saturation: f64,
    #[serde(default)]
    pub outline_width: f64,
    #[serde(default = "default_outline_color")]
    pub outline_color: String,
    /// Crop handles replace the normal selection chrome while set.
    #[serde(skip)]
    pub crop_mode: bool,
    #[serde(skip)]
    pub bitmap: Option<Bitmap>,
    #[serde(skip)]
    pub(super) outline: OutlineCache,
}

#[allow(clippy::float_cmp)]
impl PartialEq for ImageElement {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.original_width == other.original_width
            && self.original_height == other.original_height
            && self.crop_rect() == other.crop_rect()
            && self.aspect_ratio == other.aspect_ratio
            && self.maintain_aspect_ratio == other.maintain_aspect_ratio
            && self.opacity == other.opacity
            && self.brightness == other.brightness
            && self.contrast == other.contrast
            && self.saturation == other.saturation
            && self.outline_width == other.outline_width
            && self.outline_color == other.outline_color
    }
}

impl ImageElement {
    /// An uncropped image at the bitmap's natural size.
    #[must_use]
    pub fn new(bitmap: Bitmap) -> Self {
        let (w, h) = (f64::from(bitmap.width()), f64::from(bitmap.height()));
        Self {
            width: w,
            height: h,
            original_width: w,
            original_height: h,
            crop_x: 0.0,
            crop_y: 0.0,
            crop_width: w,
            crop_height: h,
            aspect_ratio: if h > 0.0 { w / h } else { 1.0 },
            maintain_aspect_ratio: true,
            opacity: 1.0,
            brightness: NEUTRAL_EFFECT,
            contrast: NEUTRAL_EFFECT,
            saturation: NEUTRAL_EFFECT,
            outline_width: 0.0,
            outline_color: default_outline_color(),
            crop_mode: false,
            bitmap: Some(bitmap),
            outline: OutlineCache::default(),
        }
    }

    /// Shrink to fit a fraction of the canvas and return the top-left that
    /// centers the image on it.
    pub fn place_on_canvas(&mut self, canvas: Rect) -> Point {
        let max_w = canvas.width * IMAGE_FIT_FRACTION;
        let max_h = canvas.height * IMAGE_FIT_FRACTION;
        if self.width > max_w || self.height > max_h {
            self.fit_to_size(max_w, max_h);
        }
        let c = canvas.center();
        Point::new(c.x - self.width / 2.0, c.y - self.height / 2.0)
    }

    /// Attach a freshly decoded raster, taking the source size from it.
    ///
    /// Crop fields missing from older documents default to the full image.
    pub fn attach_bitmap(&mut self, bitmap: Bitmap) {
        self.original_width = f64::from(bitmap.width());
        self.original_height = f64::from(bitmap.height());
        self.bitmap = Some(bitmap);
        if self.crop_width <= 0.0 || self.crop_height <= 0.0 {
            self.crop_x = 0.0;
            self.crop_y = 0.0;
            self.crop_width = self.original_width;
            self.crop_height = self.original_height;
        }
        self.clamp_crop();
        if !(self.aspect_ratio > 0.0) && self.crop_height > 0.0 {
            self.aspect_ratio = self.crop_width / self.crop_height;
        }
    }

    /// Crop window in source pixels.
    #[must_use]
    pub fn crop_rect(&self) -> Rect {
        Rect::new(self.crop_x, self.crop_y, self.crop_width, self.crop_height)
    }

    fn set_crop_rect(&mut self, crop: Rect) {
        self.crop_x = crop.x;
        self.crop_y = crop.y;
        self.crop_width = crop.width;
        self.crop_height = crop.height;
    }

    /// Display pixels per source pixel, horizontally and vertically.
    #[must_use]
    pub fn scale_factors(&self) -> (f64, f64) {
        let sx = if self.crop_width > 0.0 { self.width / self.crop_width } else { 1.0 };
        let sy = if self.crop_height > 0.0 { self.height / self.crop_height } else { 1.0 };
        (sx, sy)
    }

    /// Multiply both display dimensions by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.width *= factor;
        self.height *= factor;
    }

    /// Scale uniformly so the image fits inside `max_width × max_height`.
    pub fn fit_to_size(&mut self, max_width: f64, max_height: f64) {
        if self.width <= 0.0 || self.height <= 0.0 {
            return;
        }
        self.scale((max_width / self.width).min(max_height / self.height));
    }

    /// Set the crop window, clamped into the source image.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Validation`] for a non-positive or non-finite size.
    pub fn set_crop_area(&mut self, x: f64, y: f64, width: f64, height: f64) -> Result<(), EditorError> {
        if !(width > 0.0 && height > 0.0) || !x.is_finite() || !y.is_finite() || !width.is_finite() || !height.is_finite()
        {
            return Err(EditorError::Validation(format!("invalid crop area {width}x{height} at ({x}, {y})")));
        }
        let ow = self.original_width.max(MIN_CROP);
        let oh = self.original_height.max(MIN_CROP);
        self.crop_x = clamp_between(x, 0.0, ow - MIN_CROP);
        self.crop_y = clamp_between(y, 0.0, oh - MIN_CROP);
        self.crop_width = clamp_between(width, MIN_CROP, ow - self.crop_x);
        self.crop_height = clamp_between(height, MIN_CROP, oh - self.crop_y);
        self.aspect_ratio = self.crop_width / self.crop_height;
        if self.maintain_aspect_ratio {
            self.height = self.width / self.aspect_ratio;
        }
        Ok(())
    }

    /// Show the whole source image again.
    pub fn reset_crop(&mut self) {
        self.crop_x = 0.0;
        self.crop_y = 0.0;
        self.crop_width = self.original_width;
        self.crop_height = self.original_height;
        if self.original_height > 0.0 {
            self.aspect_ratio = self.original_width / self.original_height;
        }
    }

    fn clamp_crop(&mut self) {
        let ow = self.original_width;
        let oh = self.original_height;
        if ow <= 0.0 || oh <= 0.0 {
            return;
        }
        self.crop_x = clamp_between(self.crop_x, 0.0, ow - MIN_CROP);
        self.crop_y = clamp_between(self.crop_y, 0.0, oh - MIN_CROP);
        self.crop_width = clamp_between(self.crop_width, MIN_CROP.min(ow), ow - self.crop_x);
        self.crop_height = clamp_between(self.crop_height, MIN_CROP.min(oh), oh - self.crop_y);
    }

    /// CSS filter for the color effects, or `None` when all are neutral.
    #[must_use]
    pub fn filter(&self) -> Option<String> {
        let neutral = |v: f64| (v - NEUTRAL_EFFECT).abs() < f64::EPSILON;
        if neutral(self.brightness) && neutral(self.contrast) && neutral(self.saturation) {
            return None;
        }
        Some(format!(
            "brightness({}%) contrast({}%) saturate({}%)",
            self.brightness, self.contrast, self.saturation
        ))
    }

    pub(super) fn validate(&self, patch: &ElementPatch) -> Result<(), EditorError> {
        let touches_crop =
            patch.crop_x.is_some() || patch.crop_y.is_some() || patch.crop_width.is_some() || patch.crop_height.is_some();
        if !touches_crop {
            return Ok(());
        }
        let crop = Rect::new(
            patch.crop_x.unwrap_or(self.crop_x),
            patch.crop_y.unwrap_or(self.crop_y),
            patch.crop_width.unwrap_or(self.crop_width),
            patch.crop_height.unwrap_or(self.crop_height),
        );
        let source = Rect::new(0.0, 0.0, self.original_width, self.original_height);
        if !(crop.width > 0.0 && crop.height > 0.0) || !crop.is_within(&source) {
            return Err(EditorError::Validation(format!(
                "crop {}x{} at ({}, {}) does not fit the {}x{} source image",
                crop.width, crop.height, crop.x, crop.y, self.original_width, self.original_height
            )));
        }
        Ok(())
    }

    /// Apply an already validated patch.
    pub(super) fn apply(&mut self, patch: &ElementPatch) {
        if let Some(v) = patch.maintain_aspect_ratio {
            self.maintain_aspect_ratio = v;
        }
        let touches_crop =
            patch.crop_x.is_some() || patch.crop_y.is_some() || patch.crop_width.is_some() || patch.crop_height.is_some();
        if touches_crop {
            self.set_crop_rect(Rect::new(
                patch.crop_x.unwrap_or(self.crop_x),
                patch.crop_y.unwrap_or(self.crop_y),
                patch.crop_width.unwrap_or(self.crop_width),
                patch.crop_height.unwrap_or(self.crop_height),
            ));
            self.aspect_ratio = self.crop_width / self.crop_height;
            if self.maintain_aspect_ratio && patch.width.is_none() && patch.height.is_none() {
                self.height = self.width / self.aspect_ratio;
            }
        }
        if let Some(w) = patch.width {
            self.width = w;
            if self.maintain_aspect_ratio && self.aspect_ratio > 0.0 {
                self.height = w / self.aspect_ratio;
            }
        }
        if let Some(h) = patch.height {
            self.height = h;
            if self.maintain_aspect_ratio {
                self.width = h * self.aspect_ratio;
            }
        }
        if let Some(v) = patch.opacity {
            self.opacity = v;
        }
        if let Some(v) = patch.brightness {
            self.brightness = v;
        }
        if let Some(v) = patch.contrast {
            self.contrast = v;
        }
        if let Some(v) = patch.saturation {
            self.saturation = v;
        }
        if let Some(v) = patch.outline_width {
            self.outline_width = v;
        }
        if let Some(v) = &patch.outline_color {
            self.outline_color.clone_from(v);
        }
    }

    /// Draw centered on the origin of the current (rotated) frame.
    pub(super) fn draw(&mut self, surface: &mut dyn Surface) -> SurfaceResult {
        let Some(bitmap) = self.bitmap.clone() else {
            return Ok(());
        };
        let dst = Rect::new(-self.width / 2.0, -self.height / 2.0, self.width, self.height);
        surface.set_global_alpha(self.opacity);

        let crop = self.crop_rect();
        if let Some(ring) =
            self.outline.ring(&bitmap, crop, self.width, self.height, &self.outline_color, self.outline_width)
        {
            let src = Rect::new(0.0, 0.0, f64::from(ring.width()), f64::from(ring.height()));
            let pad = (f64::from(ring.width()) - self.width.round()) / 2.0;
            surface.draw_bitmap(&ring, src, dst.inflate(pad))?;
        }

        if let Some(filter) = self.filter() {
            surface.set_filter(&filter);
            let drawn = surface.draw_bitmap(&bitmap, crop, dst);
            surface.set_filter("none");
            drawn
        } else {
            surface.draw_bitmap(&bitmap, crop, dst)
        }
    }

    /// Crop handle centers around the display rect, in global coordinates.
    #[must_use]
    pub fn crop_handles(&self, anchor: Point) -> Vec<Handle<CropHandle>> {
        let r = Rect::new(anchor.x, anchor.y, self.width, self.height);
        let c = r.center();
        [
            (CropHandle::Nw, Point::new(r.x, r.y)),
            (CropHandle::N, Point::new(c.x, r.y)),
            (CropHandle::Ne, Point::new(r.right(), r.y)),
            (CropHandle::E, Point::new(r.right(), c.y)),
            (CropHandle::Se, Point::new(r.right(), r.bottom())),
            (CropHandle::S, Point::new(c.x, r.bottom())),
            (CropHandle::Sw, Point::new(r.x, r.bottom())),
            (CropHandle::W, Point::new(r.x, c.y)),
        ]
        .into_iter()
        .map(|(kind, center)| Handle { kind, center })
        .collect()
    }

    /// Dim the hidden parts of the source around the crop window and outline it.
    /// Drawn in the global (unrotated) frame.
    pub(super) fn draw_crop_overlay(&self, surface: &mut dyn Surface, anchor: Point) -> SurfaceResult {
        let (sx, sy) = self.scale_factors();
        let full_w = self.original_width * sx;
        let full_h = self.original_height * sy;
        let crop_dx = self.crop_x * sx;
        let crop_dy = self.crop_y * sy;
        let origin = Point::new(anchor.x - crop_dx, anchor.y - crop_dy);

        surface.save();
        surface.set_global_alpha(CROP_SHADE_ALPHA);
        surface.set_fill_color("#000000");
        if crop_dy > 0.0 {
            surface.fill_rect(Rect::new(origin.x, origin.y, full_w, crop_dy));
        }
        if crop_dy + self.height < full_h {
            surface.fill_rect(Rect::new(
                origin.x,
                anchor.y + self.height,
                full_w,
                full_h - (crop_dy + self.height),
            ));
        }
        if crop_dx > 0.0 {
            surface.fill_rect(Rect::new(origin.x, anchor.y, crop_dx, self.height));
        }
        if crop_dx + self.width < full_w {
            surface.fill_rect(Rect::new(
                anchor.x + self.width,
                anchor.y,
                full_w - (crop_dx + self.width),
                self.height,
            ));
        }
        surface.restore();

        surface.save();
        surface.set_stroke_color(ACCENT_COLOR);
        surface.set_line_width(2.0);
        surface.set_line_dash(&[3.0, 3.0])?;
        surface.stroke_rect(Rect::new(anchor.x, anchor.y, self.width, self.height));
        surface.set_line_dash(&[])?;
        for handle in self.crop_handles(anchor) {
            handles::draw_handle_square(surface, handle.center, ACCENT_COLOR);
        }
        surface.restore();
        Ok(())
    }
}

/// Display and crop state captured when a crop drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropOrigin {
    pub display: Rect,
    pub crop: Rect,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Source image size.
    pub source_width: f64,
    pub source_height: f64,
}

/// Result of [`crop_drag`]: the new display rect and crop window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropUpdate {
    pub display: Rect,
    pub crop: Rect,
}

/// Map a pointer delta on a crop handle to a joint display/crop update.
///
/// The display-to-source scale captured in `origin` stays fixed. Edge handles
/// move only their own edge; `Move` pans the crop window under a fixed
/// display rect. The crop window never leaves the source image.
#[must_use]
pub fn crop_drag(origin: &CropOrigin, handle: CropHandle, delta: Point) -> CropUpdate {
    let CropOrigin { display, crop, scale_x, scale_y, source_width, source_height } = *origin;
    let sdx = delta.x / scale_x;
    let sdy = delta.y / scale_y;

    if handle == CropHandle::Move {
        // Dragging right reveals content further left.
        let x = clamp_between(crop.x - sdx, 0.0, source_width - crop.width);
        let y = clamp_between(crop.y - sdy, 0.0, source_height - crop.height);
        return CropUpdate { display, crop: Rect::new(x, y, crop.width, crop.height) };
    }

    let (left, right, top, bottom) = handle.edges();
    let (mut cx, mut cw) = (crop.x, crop.width);
    let (mut cy, mut ch) = (crop.y, crop.height);

    if left {
        let right_edge = crop.right();
        cx = clamp_between(crop.x + sdx, 0.0, right_edge - MIN_CROP);
        cw = right_edge - cx;
    } else if right {
        cw = clamp_between(crop.width + sdx, MIN_CROP, source_width - crop.x);
    }
    if top {
        let bottom_edge = crop.bottom();
        cy = clamp_between(crop.y + sdy, 0.0, bottom_edge - MIN_CROP);
        ch = bottom_edge - cy;
    } else if bottom {
        ch = clamp_between(crop.height + sdy, MIN_CROP, source_height - crop.y);
    }

    let new_display = Rect::new(
        display.x + (cx - crop.x) * scale_x,
        display.y + (cy - crop.y) * scale_y,
        cw * scale_x,
        ch * scale_y,
    );
    CropUpdate { display: new_display, crop: Rect::new(cx, cy, cw, ch) }
}
