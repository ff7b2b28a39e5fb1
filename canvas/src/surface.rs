//! The 2D drawing capability the scene renders onto.
//!
//! [`Surface`] is the narrow slice of a Canvas2D-style context the renderer
//! needs: transforms, solid and gradient fills, paths, text and bitmap blits.
//! The browser implementation, [`WebSurface`], forwards to
//! [`web_sys::CanvasRenderingContext2d`]; tests use a recording surface.
//!
//! Fallible calls mirror the fallible `Canvas2D` calls and report failures as
//! [`SurfaceError`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::geom::{Point, Rect};

/// Average glyph advance as a fraction of the font size, used when no real
/// text metrics are available.
const APPROX_ADVANCE: f64 = 0.55;

/// Extra advance applied to bold faces by [`ApproxMeasurer`].
const APPROX_BOLD_FACTOR: f64 = 1.1;

/// A drawing backend call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("drawing surface: {0}")]
pub struct SurfaceError(pub String);

impl From<JsValue> for SurfaceError {
    fn from(value: JsValue) -> Self {
        Self(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

pub type SurfaceResult = Result<(), SurfaceError>;

/// Horizontal text alignment relative to the anchor x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Vertical text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Middle,
}

impl TextBaseline {
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Middle => "middle",
        }
    }
}

/// A font description: weight, pixel size, family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font<'a> {
    pub weight: &'a str,
    pub size: f64,
    pub family: &'a str,
}

impl Font<'_> {
    /// CSS shorthand, e.g. `"bold 48px Arial"`.
    #[must_use]
    pub fn css(&self) -> String {
        format!("{} {}px {}", self.weight, self.size, self.family)
    }

    /// Whether the weight renders heavier than regular.
    #[must_use]
    pub fn is_bold(&self) -> bool {
        match self.weight {
            "bold" | "bolder" => true,
            w => w.parse::<u32>().is_ok_and(|n| n >= 600),
        }
    }
}

/// Measures rendered text width. Hit testing needs this without a surface.
pub trait TextMeasurer {
    /// Advance width of `text` set in `font`, in canvas pixels.
    fn measure_text(&self, text: &str, font: &Font<'_>) -> f64;
}

/// Deterministic width estimate used before a real context is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMeasurer;

impl TextMeasurer for ApproxMeasurer {
    #[allow(clippy::cast_precision_loss)]
    fn measure_text(&self, text: &str, font: &Font<'_>) -> f64 {
        let advance = if font.is_bold() { APPROX_ADVANCE * APPROX_BOLD_FACTOR } else { APPROX_ADVANCE };
        text.chars().count() as f64 * font.size * advance
    }
}

impl TextMeasurer for CanvasRenderingContext2d {
    fn measure_text(&self, text: &str, font: &Font<'_>) -> f64 {
        self.save();
        self.set_font(&font.css());
        let width = match CanvasRenderingContext2d::measure_text(self, text) {
            Ok(metrics) => metrics.width(),
            Err(_) => ApproxMeasurer.measure_text(text, font),
        };
        self.restore();
        width
    }
}

static NEXT_BITMAP_ID: AtomicU64 = AtomicU64::new(1);

/// A decoded RGBA raster shared between elements, caches and the backend.
///
/// Each bitmap carries a process-unique id so backends can cache their own
/// upload of the pixels.
#[derive(Clone)]
pub struct Bitmap {
    id: u64,
    pixels: Arc<RgbaImage>,
}

impl Bitmap {
    #[must_use]
    pub fn new(pixels: RgbaImage) -> Self {
        Self { id: NEXT_BITMAP_ID.fetch_add(1, Ordering::Relaxed), pixels: Arc::new(pixels) }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A 2D drawing surface.
pub trait Surface: TextMeasurer {
    /// Surface width in canvas pixels.
    fn width(&self) -> f64;
    /// Surface height in canvas pixels.
    fn height(&self) -> f64;

    /// Called before the first draw of a frame.
    fn begin_frame(&mut self) {}
    /// Called after the last draw of a frame.
    fn end_frame(&mut self) {}

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f64, y: f64) -> SurfaceResult;
    fn rotate(&mut self, radians: f64) -> SurfaceResult;

    fn set_global_alpha(&mut self, alpha: f64);
    fn set_fill_color(&mut self, color: &str);
    fn set_stroke_color(&mut self, color: &str);
    fn set_line_width(&mut self, width: f64);
    fn set_line_dash(&mut self, segments: &[f64]) -> SurfaceResult;
    fn set_round_caps(&mut self, round: bool);
    /// CSS filter string applied to subsequent draws (`"none"` to clear).
    fn set_filter(&mut self, filter: &str);

    fn fill_rect(&mut self, rect: Rect);
    fn stroke_rect(&mut self, rect: Rect);
    /// Fill `rect` with a linear gradient running `from → to` through `stops`.
    fn fill_linear_gradient(&mut self, rect: Rect, from: Point, to: Point, stops: &[(f32, &str)]) -> SurfaceResult;

    fn begin_path(&mut self);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);
    fn quadratic_curve_to(&mut self, control: Point, end: Point);
    /// Add a full circle to the current path.
    fn circle(&mut self, center: Point, radius: f64) -> SurfaceResult;
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self);

    fn set_font(&mut self, font: &Font<'_>);
    fn set_text_align(&mut self, align: TextAlign);
    fn set_text_baseline(&mut self, baseline: TextBaseline);
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> SurfaceResult;
    fn stroke_text(&mut self, text: &str, x: f64, y: f64) -> SurfaceResult;

    /// Draw the `src` region of `bitmap` scaled into `dst`.
    fn draw_bitmap(&mut self, bitmap: &Bitmap, src: Rect, dst: Rect) -> SurfaceResult;
}

// =============================================================
// Browser implementation
// =============================================================

/// [`Surface`] backed by a browser `<canvas>` 2D context.
///
/// Bitmaps are uploaded once into offscreen canvases keyed by [`Bitmap::id`];
/// uploads not drawn during a frame are released at [`Surface::end_frame`].
pub struct WebSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    uploads: HashMap<u64, HtmlCanvasElement>,
    used: HashSet<u64>,
}

impl WebSurface {
    /// Acquire the 2D context of `canvas`.
    ///
    /// # Errors
    ///
    /// Returns an error when the canvas has no 2D context available.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, SurfaceError> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| SurfaceError("canvas has no 2d context".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SurfaceError("2d context has an unexpected type".into()))?;
        Ok(Self { canvas, ctx, uploads: HashMap::new(), used: HashSet::new() })
    }

    /// The underlying context, e.g. for installing as the engine's text measurer.
    #[must_use]
    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.ctx
    }

    fn upload(&mut self, bitmap: &Bitmap) -> Result<HtmlCanvasElement, SurfaceError> {
        if let Some(existing) = self.uploads.get(&bitmap.id()) {
            return Ok(existing.clone());
        }
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| SurfaceError("no document available for bitmap upload".into()))?;
        let offscreen = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| SurfaceError("created element is not a canvas".into()))?;
        offscreen.set_width(bitmap.width());
        offscreen.set_height(bitmap.height());
        let octx = offscreen
            .get_context("2d")?
            .ok_or_else(|| SurfaceError("offscreen canvas has no 2d context".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SurfaceError("2d context has an unexpected type".into()))?;
        let data = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(bitmap.pixels().as_raw().as_slice()),
            bitmap.width(),
            bitmap.height(),
        )?;
        octx.put_image_data(&data, 0.0, 0.0)?;
        self.uploads.insert(bitmap.id(), offscreen.clone());
        Ok(offscreen)
    }
}

impl TextMeasurer for WebSurface {
    fn measure_text(&self, text: &str, font: &Font<'_>) -> f64 {
        TextMeasurer::measure_text(&self.ctx, text, font)
    }
}

impl Surface for WebSurface {
    fn width(&self) -> f64 {
        f64::from(self.canvas.width())
    }

    fn height(&self) -> f64 {
        f64::from(self.canvas.height())
    }

    fn begin_frame(&mut self) {
        self.used.clear();
    }

    fn end_frame(&mut self) {
        let used = &self.used;
        self.uploads.retain(|id, _| used.contains(id));
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn translate(&mut self, x: f64, y: f64) -> SurfaceResult {
        Ok(self.ctx.translate(x, y)?)
    }

    fn rotate(&mut self, radians: f64) -> SurfaceResult {
        Ok(self.ctx.rotate(radians)?)
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn set_fill_color(&mut self, color: &str) {
        self.ctx.set_fill_style_str(color);
    }

    fn set_stroke_color(&mut self, color: &str) {
        self.ctx.set_stroke_style_str(color);
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> SurfaceResult {
        let dash = js_sys::Array::new();
        for s in segments {
            dash.push(&(*s).into());
        }
        Ok(self.ctx.set_line_dash(&dash)?)
    }

    fn set_round_caps(&mut self, round: bool) {
        let (cap, join) = if round { ("round", "round") } else { ("butt", "miter") };
        self.ctx.set_line_cap(cap);
        self.ctx.set_line_join(join);
    }

    fn set_filter(&mut self, filter: &str) {
        self.ctx.set_filter(filter);
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn fill_linear_gradient(&mut self, rect: Rect, from: Point, to: Point, stops: &[(f32, &str)]) -> SurfaceResult {
        let gradient = self.ctx.create_linear_gradient(from.x, from.y, to.x, to.y);
        for (offset, color) in stops {
            gradient.add_color_stop(*offset, color)?;
        }
        self.ctx.set_fill_style_canvas_gradient(&gradient);
        self.ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
        Ok(())
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, p: Point) {
        self.ctx.move_to(p.x, p.y);
    }

    fn line_to(&mut self, p: Point) {
        self.ctx.line_to(p.x, p.y);
    }

    fn quadratic_curve_to(&mut self, control: Point, end: Point) {
        self.ctx.quadratic_curve_to(control.x, control.y, end.x, end.y);
    }

    fn circle(&mut self, center: Point, radius: f64) -> SurfaceResult {
        Ok(self.ctx.arc(center.x, center.y, radius, 0.0, std::f64::consts::TAU)?)
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    fn fill(&mut self) {
        self.ctx.fill();
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }

    fn set_font(&mut self, font: &Font<'_>) {
        self.ctx.set_font(&font.css());
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.ctx.set_text_align(align.as_css());
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.ctx.set_text_baseline(baseline.as_css());
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> SurfaceResult {
        Ok(self.ctx.fill_text(text, x, y)?)
    }

    fn stroke_text(&mut self, text: &str, x: f64, y: f64) -> SurfaceResult {
        Ok(self.ctx.stroke_text(text, x, y)?)
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, src: Rect, dst: Rect) -> SurfaceResult {
        let source = self.upload(bitmap)?;
        self.used.insert(bitmap.id());
        Ok(self.ctx.draw_image_with_html_canvas_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
            &source, src.x, src.y, src.width, src.height, dst.x, dst.y, dst.width, dst.height,
        )?)
    }
}
