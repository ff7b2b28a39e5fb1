//! Drawable elements: the four variants and the behavior they share.
//!
//! An [`Element`] carries the fields every variant has (id, anchor, rotation,
//! layer, selection flag) and an [`ElementKind`] with the variant's own
//! fields. Rotation is always applied about the element's center, which each
//! variant defines differently; every rotation-aware operation goes through
//! [`Element::center`] and the helpers in [`crate::geom`], so drawing, hit
//! testing and handle lookup agree.

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;

pub mod arrow;
pub mod handles;
pub mod image;
pub mod outline;
pub mod shape;
pub mod text;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::color::Rgb;
use crate::consts::{BOX_RESIZE_DIVISOR, DUPLICATE_OFFSET, MIN_BOX_SIZE, SELECTION_PAD};
use crate::error::EditorError;
use crate::geom::{Point, Rect, global_to_local, local_to_global, normalize_degrees, rotate_point};
use crate::surface::{Surface, SurfaceResult, TextAlign, TextMeasurer};

pub use arrow::{ArrowElement, ArrowType};
pub use handles::{CropHandle, Handle, HandleKind};
pub use image::{CropOrigin, ImageElement};
pub use shape::{ShapeElement, ShapeType};
pub use text::TextElement;

pub type ElementId = Uuid;

/// Variant-specific element data, tagged by `type` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Text(TextElement),
    Image(ImageElement),
    Shape(ShapeElement),
    Arrow(ArrowElement),
}

/// Handle positions captured by the most recent render of a selected element.
#[derive(Debug, Clone, Default)]
struct HandleCache {
    handles: Vec<Handle<HandleKind>>,
    crop: Vec<Handle<CropHandle>>,
}

/// One drawable object on the canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(default = "Uuid::new_v4", deserialize_with = "lenient_id")]
    pub id: ElementId,
    /// Anchor: top-left for boxes, text anchor for text, start for arrows.
    pub x: f64,
    pub y: f64,
    /// Degrees clockwise, always within `[0, 360)`.
    #[serde(default)]
    pub rotation: f64,
    /// Paint order; higher draws later.
    #[serde(default)]
    pub layer: i64,
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(skip)]
    pub selected: bool,
    #[serde(skip)]
    cache: HandleCache,
}

/// Accept any id a stored project may hold. Ids that are not UUIDs (older
/// projects used numbers) are replaced with fresh ones.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(f64),
    }
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::new_v4()),
        RawId::Number(_) => Uuid::new_v4(),
    })
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.rotation.to_bits() == other.rotation.to_bits()
            && self.layer == other.layer
            && self.kind == other.kind
    }
}

/// Sparse update for an element. Only present fields are applied; fields that
/// do not belong to the element's variant are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rotation: Option<f64>,
    pub layer: Option<i64>,
    // Text
    pub text: Option<String>,
    pub font: Option<String>,
    pub size: Option<f64>,
    pub weight: Option<String>,
    pub align: Option<TextAlign>,
    // Shared style
    pub color: Option<String>,
    pub opacity: Option<f64>,
    pub outline_width: Option<f64>,
    pub outline_color: Option<String>,
    pub stroke_width: Option<f64>,
    pub stroke_color: Option<String>,
    // Image and shape
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub maintain_aspect_ratio: Option<bool>,
    pub crop_x: Option<f64>,
    pub crop_y: Option<f64>,
    pub crop_width: Option<f64>,
    pub crop_height: Option<f64>,
    pub brightness: Option<f64>,
    pub contrast: Option<f64>,
    pub saturation: Option<f64>,
    pub shape_type: Option<ShapeType>,
    // Arrow
    pub x2: Option<f64>,
    pub y2: Option<f64>,
    pub arrow_type: Option<ArrowType>,
    pub arrowhead_size: Option<f64>,
    pub curvature: Option<f64>,
}

impl ElementPatch {
    fn check(&self) -> Result<(), EditorError> {
        let numbers = [
            ("x", self.x),
            ("y", self.y),
            ("rotation", self.rotation),
            ("size", self.size),
            ("opacity", self.opacity),
            ("outlineWidth", self.outline_width),
            ("strokeWidth", self.stroke_width),
            ("width", self.width),
            ("height", self.height),
            ("cropX", self.crop_x),
            ("cropY", self.crop_y),
            ("cropWidth", self.crop_width),
            ("cropHeight", self.crop_height),
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
            ("x2", self.x2),
            ("y2", self.y2),
            ("arrowheadSize", self.arrowhead_size),
            ("curvature", self.curvature),
        ];
        for (name, value) in numbers {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(EditorError::Validation(format!("{name} must be a finite number")));
            }
        }
        let positive = [("size", self.size), ("width", self.width), ("height", self.height)];
        for (name, value) in positive {
            if value.is_some_and(|v| v <= 0.0) {
                return Err(EditorError::Validation(format!("{name} must be positive")));
            }
        }
        let non_negative = [
            ("outlineWidth", self.outline_width),
            ("strokeWidth", self.stroke_width),
            ("arrowheadSize", self.arrowhead_size),
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
        ];
        for (name, value) in non_negative {
            if value.is_some_and(|v| v < 0.0) {
                return Err(EditorError::Validation(format!("{name} must not be negative")));
            }
        }
        if self.opacity.is_some_and(|v| !(0.0..=1.0).contains(&v)) {
            return Err(EditorError::Validation("opacity must be within [0, 1]".into()));
        }
        if self.curvature.is_some_and(|v| !(-1.0..=1.0).contains(&v)) {
            return Err(EditorError::Validation("curvature must be within [-1, 1]".into()));
        }
        let colors = [("color", &self.color), ("outlineColor", &self.outline_color), ("strokeColor", &self.stroke_color)];
        for (name, value) in colors {
            if let Some(v) = value {
                if Rgb::parse(v).is_none() {
                    return Err(EditorError::Validation(format!("{name} {v:?} is not a hex color")));
                }
            }
        }
        Ok(())
    }
}

impl Element {
    /// A new unselected element with a fresh id on layer 0.
    #[must_use]
    pub fn new(anchor: Point, kind: ElementKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            x: anchor.x,
            y: anchor.y,
            rotation: 0.0,
            layer: 0,
            kind,
            selected: false,
            cache: HandleCache::default(),
        }
    }

    #[must_use]
    pub fn anchor(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// The serialized `type` tag.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ElementKind::Text(_) => "text",
            ElementKind::Image(_) => "image",
            ElementKind::Shape(_) => "shape",
            ElementKind::Arrow(_) => "arrow",
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&TextElement> {
        match &self.kind {
            ElementKind::Text(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_image(&self) -> Option<&ImageElement> {
        match &self.kind {
            ElementKind::Image(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut ImageElement> {
        match &mut self.kind {
            ElementKind::Image(i) => Some(i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_shape(&self) -> Option<&ShapeElement> {
        match &self.kind {
            ElementKind::Shape(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_arrow(&self) -> Option<&ArrowElement> {
        match &self.kind {
            ElementKind::Arrow(a) => Some(a),
            _ => None,
        }
    }

    // =============================================================
    // Geometry
    // =============================================================

    /// Bounds before rotation, in canvas coordinates.
    #[must_use]
    pub fn local_bounds<M: TextMeasurer + ?Sized>(&self, measurer: &M) -> Rect {
        match &self.kind {
            ElementKind::Text(t) => t.bounds(self.anchor(), measurer),
            ElementKind::Image(i) => Rect::new(self.x, self.y, i.width, i.height),
            ElementKind::Shape(s) => Rect::new(self.x, self.y, s.width, s.height),
            ElementKind::Arrow(a) => a.bounding_box,
        }
    }

    /// Rotation pivot.
    #[must_use]
    pub fn center<M: TextMeasurer + ?Sized>(&self, measurer: &M) -> Point {
        match &self.kind {
            ElementKind::Arrow(a) => a.midpoint(self.anchor()),
            _ => self.local_bounds(measurer).center(),
        }
    }

    /// Axis-aligned bounds of the rotated element.
    #[must_use]
    pub fn bounds<M: TextMeasurer + ?Sized>(&self, measurer: &M) -> Rect {
        let b = self.local_bounds(measurer);
        let pivot = self.center(measurer);
        let corners = [
            Point::new(b.x, b.y),
            Point::new(b.right(), b.y),
            Point::new(b.right(), b.bottom()),
            Point::new(b.x, b.bottom()),
        ]
        .map(|p| rotate_point(p, pivot, self.rotation));
        Rect::enclosing(&corners)
    }

    /// Body hit test in the element's own rotated frame.
    #[must_use]
    pub fn contains<M: TextMeasurer + ?Sized>(&self, p: Point, measurer: &M) -> bool {
        let pivot = self.center(measurer);
        let local = global_to_local(p, pivot, self.rotation);
        match &self.kind {
            ElementKind::Text(t) => t.bounds(self.anchor(), measurer).contains(local),
            ElementKind::Image(i) => Rect::new(self.x, self.y, i.width, i.height).contains(local),
            ElementKind::Shape(s) => s.contains_local(Point::new(local.x - pivot.x, local.y - pivot.y)),
            ElementKind::Arrow(a) => a.touches(self.anchor(), local),
        }
    }

    /// Whether the crop overlay replaces the normal selection chrome.
    #[must_use]
    pub fn crop_active(&self) -> bool {
        self.rotation == 0.0 && self.as_image().is_some_and(|i| i.crop_mode)
    }

    /// Selection box around the pivot, before rotation.
    fn selection_box<M: TextMeasurer + ?Sized>(&self, measurer: &M) -> Rect {
        let b = self.local_bounds(measurer);
        let pivot = self.center(measurer);
        Rect::new(b.x - pivot.x, b.y - pivot.y, b.width, b.height).inflate(SELECTION_PAD)
    }

    fn handle_offsets<M: TextMeasurer + ?Sized>(&self, measurer: &M) -> Vec<(HandleKind, Point)> {
        match &self.kind {
            ElementKind::Arrow(a) => a.handle_offsets(self.anchor()),
            _ => handles::box_handle_offsets(self.selection_box(measurer)),
        }
    }

    /// Recompute the cached global handle positions from the current fields.
    pub fn layout_handles<M: TextMeasurer + ?Sized>(&mut self, measurer: &M) {
        if !self.selected {
            self.cache = HandleCache::default();
            return;
        }
        if self.crop_active() {
            let anchor = self.anchor();
            self.cache.crop = self.as_image().map(|i| i.crop_handles(anchor)).unwrap_or_default();
            self.cache.handles.clear();
            return;
        }
        let offsets = self.handle_offsets(measurer);
        self.cache.handles = handles::to_global(&offsets, self.center(measurer), self.rotation);
        self.cache.crop.clear();
    }

    /// Handles cached by the last render.
    #[must_use]
    pub fn handles(&self) -> &[Handle<HandleKind>] {
        &self.cache.handles
    }

    /// Resize, rotate or arrow handle under `p`. Only selected elements have handles.
    #[must_use]
    pub fn handle_at(&self, p: Point) -> Option<HandleKind> {
        if !self.selected {
            return None;
        }
        handles::hit(&self.cache.handles, p)
    }

    /// Crop handle under `p`, or `Move` inside the crop window.
    #[must_use]
    pub fn crop_handle_at(&self, p: Point) -> Option<CropHandle> {
        if !self.selected || !self.crop_active() {
            return None;
        }
        if let Some(kind) = handles::hit(&self.cache.crop, p) {
            return Some(kind);
        }
        let image = self.as_image()?;
        Rect::new(self.x, self.y, image.width, image.height).contains(p).then_some(CropHandle::Move)
    }

    // =============================================================
    // Mutation
    // =============================================================

    /// Move rigidly by `(dx, dy)`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        if let ElementKind::Arrow(a) = &mut self.kind {
            a.x2 += dx;
            a.y2 += dy;
            let start = Point::new(self.x, self.y);
            a.refresh_bounds(start);
        }
    }

    /// Move rigidly so the anchor lands on `anchor`.
    pub fn move_to(&mut self, anchor: Point) {
        self.translate(anchor.x - self.x, anchor.y - self.y);
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = normalize_degrees(degrees);
    }

    /// Apply `patch` atomically: every field is validated before any is written.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Validation`] and leaves the element untouched
    /// when any present field is out of range.
    pub fn apply_patch(&mut self, patch: &ElementPatch) -> Result<(), EditorError> {
        patch.check()?;
        if let ElementKind::Image(i) = &self.kind {
            i.validate(patch)?;
        }

        if let Some(v) = patch.x {
            self.x = v;
        }
        if let Some(v) = patch.y {
            self.y = v;
        }
        if let Some(v) = patch.rotation {
            self.set_rotation(v);
        }
        if let Some(v) = patch.layer {
            self.layer = v;
        }
        let start = self.anchor();
        match &mut self.kind {
            ElementKind::Text(t) => t.apply(patch),
            ElementKind::Image(i) => i.apply(patch),
            ElementKind::Shape(s) => s.apply(patch),
            ElementKind::Arrow(a) => {
                a.apply(patch);
                a.refresh_bounds(start);
            }
        }
        Ok(())
    }

    /// Copy with a fresh id, offset down-right, unselected and out of crop mode.
    /// The caller assigns the layer.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = Uuid::new_v4();
        copy.selected = false;
        copy.cache = HandleCache::default();
        if let ElementKind::Image(i) = &mut copy.kind {
            i.crop_mode = false;
        }
        copy.translate(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
        copy
    }

    /// Fold an arrow's rotation into its endpoints so they can be dragged
    /// directly. Other variants are unchanged.
    pub fn bake_rotation(&mut self) {
        if self.rotation == 0.0 {
            return;
        }
        let start = self.anchor();
        if let ElementKind::Arrow(a) = &mut self.kind {
            let mid = a.midpoint(start);
            let s = rotate_point(start, mid, self.rotation);
            let e = rotate_point(a.end(), mid, self.rotation);
            // Curvature is relative to the segment, so it carries over.
            a.x2 = e.x;
            a.y2 = e.y;
            a.refresh_bounds(s);
            self.x = s.x;
            self.y = s.y;
            self.rotation = 0.0;
        }
    }

    // =============================================================
    // Gestures
    // =============================================================

    /// Apply a handle drag from `start` to `pointer`, measured against the
    /// element as it was when the drag began.
    pub fn resize_from<M: TextMeasurer + ?Sized>(
        &mut self,
        origin: &Element,
        handle: HandleKind,
        start: Point,
        pointer: Point,
        measurer: &M,
    ) {
        if matches!(self.kind, ElementKind::Image(_) | ElementKind::Shape(_)) {
            self.resize_box(origin, handle, start, pointer, measurer);
            return;
        }
        let anchor = self.anchor();
        match (&mut self.kind, &origin.kind) {
            (ElementKind::Arrow(a), ElementKind::Arrow(_)) => {
                let mut start_point = anchor;
                match handle {
                    HandleKind::Start => start_point = pointer,
                    HandleKind::End => {
                        a.x2 = pointer.x;
                        a.y2 = pointer.y;
                    }
                    HandleKind::Control if a.arrow_type == ArrowType::Curved => {
                        a.curvature = a.curvature_toward(anchor, pointer);
                    }
                    _ => {}
                }
                a.refresh_bounds(start_point);
                self.x = start_point.x;
                self.y = start_point.y;
            }
            (ElementKind::Text(t), ElementKind::Text(o)) => {
                let Some(grow) = grows(origin.rotation, handle, start, pointer) else {
                    return;
                };
                t.size = TextElement::resized(o.size, start.distance(pointer), grow);
            }
            _ => {}
        }
    }

    /// Scale a box element about the corner opposite `handle`.
    fn resize_box<M: TextMeasurer + ?Sized>(
        &mut self,
        origin: &Element,
        handle: HandleKind,
        start: Point,
        pointer: Point,
        measurer: &M,
    ) {
        let (Some(grow), Some(opposite)) =
            (grows(origin.rotation, handle, start, pointer), handle.opposite().and_then(HandleKind::outward))
        else {
            return;
        };
        let b = origin.local_bounds(measurer);
        let step = start.distance(pointer) / BOX_RESIZE_DIVISOR;
        let scale = if grow { 1.0 + step } else { 1.0 - step };

        let (width, height) = match &mut self.kind {
            ElementKind::Image(i) if i.maintain_aspect_ratio => {
                let s = scale.max(MIN_BOX_SIZE / b.width).max(MIN_BOX_SIZE / b.height);
                i.width = b.width * s;
                i.height = b.height * s;
                (i.width, i.height)
            }
            ElementKind::Image(i) => {
                i.width = (b.width * scale).max(MIN_BOX_SIZE);
                i.height = (b.height * scale).max(MIN_BOX_SIZE);
                (i.width, i.height)
            }
            ElementKind::Shape(s) => {
                s.width = (b.width * scale).max(MIN_BOX_SIZE);
                s.height = (b.height * scale).max(MIN_BOX_SIZE);
                (s.width, s.height)
            }
            _ => return,
        };

        // Keep the opposite corner where it was on screen.
        let pivot = b.center();
        let fixed = local_to_global(
            Point::new(opposite.x * b.width / 2.0, opposite.y * b.height / 2.0),
            pivot,
            origin.rotation,
        );
        let reach = rotate_point(
            Point::new(opposite.x * width / 2.0, opposite.y * height / 2.0),
            Point::default(),
            origin.rotation,
        );
        let center = Point::new(fixed.x - reach.x, fixed.y - reach.y);
        self.x = center.x - width / 2.0;
        self.y = center.y - height / 2.0;
    }

    /// State captured at the start of a crop drag.
    #[must_use]
    pub fn crop_origin(&self) -> Option<CropOrigin> {
        let image = self.as_image()?;
        let (scale_x, scale_y) = image.scale_factors();
        Some(CropOrigin {
            display: Rect::new(self.x, self.y, image.width, image.height),
            crop: image.crop_rect(),
            scale_x,
            scale_y,
            source_width: image.original_width,
            source_height: image.original_height,
        })
    }

    /// Apply a crop handle drag of `delta` relative to `origin`.
    pub fn crop_from(&mut self, origin: &CropOrigin, handle: CropHandle, delta: Point) {
        let update = image::crop_drag(origin, handle, delta);
        if let ElementKind::Image(i) = &mut self.kind {
            i.width = update.display.width;
            i.height = update.display.height;
            i.crop_x = update.crop.x;
            i.crop_y = update.crop.y;
            i.crop_width = update.crop.width;
            i.crop_height = update.crop.height;
            i.aspect_ratio = update.crop.width / update.crop.height;
            self.x = update.display.x;
            self.y = update.display.y;
        }
    }

    // =============================================================
    // Rendering
    // =============================================================

    /// Draw the element and, when `chrome` is set and the element is
    /// selected, its selection outline and handles. Handle positions are
    /// cached for hit testing whenever the element is selected.
    ///
    /// # Errors
    ///
    /// Propagates surface failures.
    pub fn render(&mut self, surface: &mut dyn Surface, chrome: bool) -> SurfaceResult {
        let pivot = self.center(&*surface);
        let anchor = self.anchor();
        let rotation = self.rotation;
        let kind = &mut self.kind;
        in_frame(surface, pivot, rotation, |s| match kind {
            ElementKind::Text(t) => t.draw(s),
            ElementKind::Image(i) => i.draw(s),
            ElementKind::Shape(sh) => sh.draw(s),
            ElementKind::Arrow(a) => {
                a.draw(s, anchor);
                Ok(())
            }
        })?;

        self.layout_handles(&*surface);
        if !self.selected || !chrome {
            return Ok(());
        }
        if self.crop_active() {
            return match &self.kind {
                ElementKind::Image(i) => i.draw_crop_overlay(surface, anchor),
                _ => Ok(()),
            };
        }
        match &self.kind {
            ElementKind::Arrow(a) => in_frame(surface, pivot, rotation, |s| a.draw_selection(s, anchor)),
            _ => {
                let local_box = self.selection_box(&*surface);
                let offsets = handles::box_handle_offsets(local_box);
                in_frame(surface, pivot, rotation, |s| handles::draw_box_selection(s, local_box, &offsets))
            }
        }
    }
}

/// Whether a corner drag from `start` to `pointer` moves outward, judged in
/// the element's unrotated frame. `None` for handles without a direction.
fn grows(rotation: f64, handle: HandleKind, start: Point, pointer: Point) -> Option<bool> {
    let out = handle.outward()?;
    let delta = rotate_point(Point::new(pointer.x - start.x, pointer.y - start.y), Point::default(), -rotation);
    Some(delta.x * out.x + delta.y * out.y > 0.0)
}

/// Rotation after dragging the rotate handle from `start` to `pointer` about
/// `center`, normalized into `[0, 360)`.
#[must_use]
pub fn dragged_rotation(start_rotation: f64, center: Point, start: Point, pointer: Point) -> f64 {
    let initial = (start.y - center.y).atan2(start.x - center.x);
    let current = (pointer.y - center.y).atan2(pointer.x - center.x);
    normalize_degrees(start_rotation + (current - initial).to_degrees())
}

/// Run `draw` with the surface translated to `pivot` and rotated by `degrees`,
/// restoring the surface state afterwards even when drawing fails.
fn in_frame(
    surface: &mut dyn Surface,
    pivot: Point,
    degrees: f64,
    draw: impl FnOnce(&mut dyn Surface) -> SurfaceResult,
) -> SurfaceResult {
    surface.save();
    let result = draw_in_frame(surface, pivot, degrees, draw);
    surface.restore();
    result
}

fn draw_in_frame(
    surface: &mut dyn Surface,
    pivot: Point,
    degrees: f64,
    draw: impl FnOnce(&mut dyn Surface) -> SurfaceResult,
) -> SurfaceResult {
    surface.translate(pivot.x, pivot.y)?;
    surface.rotate(degrees.to_radians())?;
    draw(surface)
}
