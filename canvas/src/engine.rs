use tracing::{debug, info, warn};
use wasm_bindgen::JsValue;
use web_sys::HtmlCanvasElement;

use crate::background::Pattern;
use crate::color::Rgb;
use crate::config::EditorConfig;
use crate::consts::NEW_ELEMENT_POS;
use crate::doc::Scene;
use crate::element::{
    ArrowElement, Element, ElementId, ElementKind, ElementPatch, HandleKind, ImageElement, ShapeElement, ShapeType,
    TextElement, dragged_rotation,
};
use crate::error::EditorError;
use crate::geom::Point;
use crate::hit::{Hit, HitPart, hit_test};
use crate::input::{Button, Cursor, InputState, Key, Modifiers};
use crate::persist::{self, CodecDecoder, ImageDecoder, LoadedProject, LocalStorage, ProjectDocument, Storage};
use crate::render;
use crate::segment::{self, Segmenter};
use crate::surface::{ApproxMeasurer, Bitmap, Surface, SurfaceResult, TextMeasurer, WebSurface};
use crate::viewport::Viewport;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers and commands for the host to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The selection changed, or the selected element changed in a way the
    /// property panel should reflect (e.g. a live rotation).
    SelectionChanged(Option<ElementId>),
    SetCursor(Cursor),
    RenderNeeded,
    /// A committed edit the host should persist (see [`Engine::save`]).
    SaveRequested,
}

/// Raster export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Jpeg,
    Png,
}

impl ExportFormat {
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Ticket for an asynchronous insertion, tied to the scene that was current
/// when the work was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInsert {
    generation: u64,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub scene: Scene,
    pub input: InputState,
    pub viewport: Viewport,
    pub config: EditorConfig,
    measurer: Box<dyn TextMeasurer>,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(EditorConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty editor sized from `config`.
    #[must_use]
    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            scene: Scene::new(),
            input: InputState::default(),
            viewport: Viewport::new(config.canvas_width, config.canvas_height),
            config,
            measurer: Box::new(ApproxMeasurer),
        }
    }

    /// Replace the text measurer used for hit testing outside of rendering.
    pub fn set_measurer(&mut self, measurer: Box<dyn TextMeasurer>) {
        self.measurer = measurer;
        self.refresh_handles();
    }

    /// Record the CSS size the canvas is displayed at.
    pub fn set_viewport(&mut self, css_width: f64, css_height: f64) {
        self.viewport.set_css_size(css_width, css_height);
    }

    // =============================================================
    // Queries
    // =============================================================

    /// The currently selected element, if any.
    #[must_use]
    pub fn selection(&self) -> Option<ElementId> {
        self.scene.selection()
    }

    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.scene.get(id)
    }

    /// Cursor for the element part under a canvas-space point.
    #[must_use]
    pub fn cursor_at(&self, p: Point) -> Cursor {
        Cursor::for_hit(hit_test(p, &self.scene, &*self.measurer).map(|hit| hit.part))
    }

    // =============================================================
    // Pointer input
    // =============================================================

    /// Start a gesture on whatever is under the pointer.
    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary || !self.input.is_idle() {
            return Vec::new();
        }
        let p = self.viewport.screen_to_canvas(screen_pt);
        let before = self.scene.selection();

        match hit_test(p, &self.scene, &*self.measurer) {
            Some(hit) => self.begin_gesture(hit, p),
            None => self.scene.clear_selection(),
        }
        self.refresh_handles();

        let after = self.scene.selection();
        let mut actions = Vec::new();
        if after != before {
            actions.push(Action::SelectionChanged(after));
        }
        if after != before || !self.input.is_idle() {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    fn begin_gesture(&mut self, hit: Hit, p: Point) {
        let Hit { id, part } = hit;
        if self.scene.selection() != Some(id) {
            self.scene.clear_selection();
            self.scene.select(&id);
        }
        if let HitPart::Handle(_) = part {
            if let Some(element) = self.scene.get_mut(&id) {
                // Arrow endpoints are dragged in canvas space.
                element.bake_rotation();
            }
        }
        let Some(element) = self.scene.get(&id) else {
            return;
        };
        self.input = match part {
            HitPart::Body => InputState::Dragging { id, offset: Point::new(p.x - element.x, p.y - element.y) },
            HitPart::Handle(HandleKind::Rotate) => InputState::Rotating {
                id,
                center: element.center(&*self.measurer),
                start: p,
                orig_rotation: element.rotation,
            },
            HitPart::Handle(handle) => InputState::Resizing { id, handle, start: p, origin: Box::new(element.clone()) },
            HitPart::Crop(handle) => match element.crop_origin() {
                Some(origin) => InputState::Cropping { id, handle, start: p, origin },
                None => InputState::Idle,
            },
        };
        debug!(gesture = self.input.name(), %id, "gesture started");
    }

    /// Advance the active gesture, or update the hover cursor when idle.
    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let p = self.viewport.screen_to_canvas(screen_pt);
        let measurer = &*self.measurer;
        let mut actions = Vec::new();
        match &self.input {
            InputState::Idle => return vec![Action::SetCursor(self.cursor_at(p))],
            InputState::Dragging { id, offset } => {
                if let Some(element) = self.scene.get_mut(id) {
                    element.move_to(Point::new(p.x - offset.x, p.y - offset.y));
                }
            }
            InputState::Resizing { id, handle, start, origin } => {
                if let Some(element) = self.scene.get_mut(id) {
                    element.resize_from(origin, *handle, *start, p, measurer);
                }
            }
            InputState::Rotating { id, center, start, orig_rotation } => {
                if let Some(element) = self.scene.get_mut(id) {
                    element.set_rotation(dragged_rotation(*orig_rotation, *center, *start, p));
                }
                actions.push(Action::SelectionChanged(Some(*id)));
            }
            InputState::Cropping { id, handle, start, origin } => {
                if let Some(element) = self.scene.get_mut(id) {
                    element.crop_from(origin, *handle, Point::new(p.x - start.x, p.y - start.y));
                }
            }
        }
        self.refresh_handles();
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Finish the active gesture and recompute the cursor.
    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let p = self.viewport.screen_to_canvas(screen_pt);
        let finished = std::mem::take(&mut self.input);
        let mut actions = Vec::new();
        if let Some(id) = finished.target() {
            debug!(gesture = finished.name(), %id, "gesture finished");
            actions.push(Action::RenderNeeded);
            self.push_save(&mut actions);
        }
        actions.push(Action::SetCursor(self.cursor_at(p)));
        actions
    }

    // =============================================================
    // Keyboard
    // =============================================================

    pub fn on_key_down(&mut self, key: Key, _modifiers: Modifiers) -> Vec<Action> {
        if !self.input.is_idle() {
            return Vec::new();
        }
        match key.0.as_str() {
            "Delete" | "Backspace" => self.delete_selected().unwrap_or_default(),
            "Escape" => self.escape(),
            "Tab" => self.cycle_selection(),
            _ => Vec::new(),
        }
    }

    /// Leave crop mode if the selection is cropping, otherwise deselect.
    fn escape(&mut self) -> Vec<Action> {
        if let Some(image) = self.scene.selected_mut().and_then(Element::as_image_mut) {
            if image.crop_mode {
                image.crop_mode = false;
                self.refresh_handles();
                return vec![Action::RenderNeeded];
            }
        }
        self.clear_selection()
    }

    // =============================================================
    // Adding elements
    // =============================================================

    /// Add the default text element and select it.
    pub fn add_text(&mut self) -> Vec<Action> {
        let anchor = Point::new(NEW_ELEMENT_POS, NEW_ELEMENT_POS);
        self.add_element(Element::new(anchor, ElementKind::Text(TextElement::default())))
    }

    pub fn add_shape(&mut self, shape_type: ShapeType) -> Vec<Action> {
        let anchor = Point::new(NEW_ELEMENT_POS, NEW_ELEMENT_POS);
        self.add_element(Element::new(anchor, ElementKind::Shape(ShapeElement::new(shape_type))))
    }

    pub fn add_arrow(&mut self) -> Vec<Action> {
        let anchor = Point::new(NEW_ELEMENT_POS, NEW_ELEMENT_POS);
        self.add_element(Element::new(anchor, ElementKind::Arrow(ArrowElement::new(anchor))))
    }

    /// Add a decoded image, shrunk to fit the canvas and centered on it.
    pub fn add_image(&mut self, bitmap: Bitmap) -> Vec<Action> {
        let mut image = ImageElement::new(bitmap);
        let anchor = image.place_on_canvas(self.viewport.bounds());
        self.add_element(Element::new(anchor, ElementKind::Image(image)))
    }

    /// Insert `element` on top and select it.
    pub fn add_element(&mut self, element: Element) -> Vec<Action> {
        let id = self.scene.insert(element);
        self.scene.clear_selection();
        self.scene.select(&id);
        self.refresh_handles();
        debug!(%id, kind = self.scene.get(&id).map_or("", Element::type_name), "element added");
        self.committed(Some(id))
    }

    /// Capture the current scene generation before starting async work whose
    /// result will be inserted later.
    #[must_use]
    pub fn begin_insert(&self) -> PendingInsert {
        PendingInsert { generation: self.scene.generation() }
    }

    /// Add an image produced by async work started with [`Self::begin_insert`].
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Stale`] when the scene was replaced in the
    /// meantime; the image is dropped.
    pub fn insert_pending_image(&mut self, pending: PendingInsert, bitmap: Bitmap) -> Result<Vec<Action>, EditorError> {
        self.check_current(pending)?;
        Ok(self.add_image(bitmap))
    }

    /// Cut the person out of the selected image and add the result as a new
    /// image centered on the canvas.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotFound`] without a selected image, the segmentation
    /// errors of [`segment::remove_background`], or [`EditorError::Stale`]
    /// when the scene was replaced while the mask was computed.
    pub async fn cutout_selected<S: Segmenter + ?Sized>(&mut self, segmenter: &S) -> Result<Vec<Action>, EditorError> {
        let source = self
            .scene
            .selected()
            .and_then(Element::as_image)
            .and_then(|image| image.bitmap.clone())
            .ok_or(EditorError::NotFound)?;
        let pending = self.begin_insert();
        let cutout = segment::remove_background(segmenter, &source).await?;
        self.insert_pending_image(pending, cutout)
    }

    /// Validate an uploaded file, decode it, and add it as an image.
    ///
    /// # Errors
    ///
    /// [`EditorError::Validation`] for a disallowed type or size,
    /// [`EditorError::Resource`] when the bytes do not decode, or
    /// [`EditorError::Stale`] when the scene was replaced during decoding.
    pub async fn add_upload<D: ImageDecoder + ?Sized>(
        &mut self,
        mime_type: &str,
        bytes: Vec<u8>,
        decoder: &D,
    ) -> Result<Vec<Action>, EditorError> {
        self.config.check_upload(mime_type, bytes.len())?;
        let pending = self.begin_insert();
        let bitmap = decoder.decode(bytes).await.inspect_err(|err| {
            warn!(error = %err, mime_type, "upload could not be decoded");
        })?;
        self.insert_pending_image(pending, bitmap)
    }

    fn check_current(&self, pending: PendingInsert) -> Result<(), EditorError> {
        if pending.generation != self.scene.generation() {
            warn!(requested = pending.generation, current = self.scene.generation(), "dropping stale result");
            return Err(EditorError::Stale);
        }
        Ok(())
    }

    // =============================================================
    // Editing the selection
    // =============================================================

    /// Apply a partial update to the selected element.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotFound`] without a selection, or
    /// [`EditorError::Validation`] when the patch is rejected.
    pub fn update_selected(&mut self, patch: &ElementPatch) -> Result<Vec<Action>, EditorError> {
        let id = self.scene.selection().ok_or(EditorError::NotFound)?;
        self.scene.apply_patch(&id, patch)?;
        self.refresh_handles();
        let mut actions = vec![Action::RenderNeeded];
        if patch.size.is_some() {
            actions.insert(0, Action::SelectionChanged(Some(id)));
        }
        self.push_save(&mut actions);
        Ok(actions)
    }

    /// # Errors
    ///
    /// [`EditorError::NotFound`] without a selection.
    pub fn delete_selected(&mut self) -> Result<Vec<Action>, EditorError> {
        let id = self.scene.selection().ok_or(EditorError::NotFound)?;
        self.scene.remove(&id);
        debug!(%id, "element deleted");
        Ok(self.committed(None))
    }

    /// Copy the selection, offset down-right, on top of everything, and
    /// select the copy.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotFound`] without a selection.
    pub fn duplicate_selected(&mut self) -> Result<Vec<Action>, EditorError> {
        let copy = self.scene.selected().map(Element::duplicate).ok_or(EditorError::NotFound)?;
        Ok(self.add_element(copy))
    }

    /// # Errors
    ///
    /// [`EditorError::NotFound`] for an unknown id.
    pub fn select(&mut self, id: &ElementId) -> Result<Vec<Action>, EditorError> {
        if self.scene.get(id).is_none() {
            return Err(EditorError::NotFound);
        }
        if self.scene.selection() == Some(*id) {
            return Ok(Vec::new());
        }
        self.scene.clear_selection();
        self.scene.select(id);
        self.refresh_handles();
        Ok(vec![Action::SelectionChanged(Some(*id)), Action::RenderNeeded])
    }

    pub fn clear_selection(&mut self) -> Vec<Action> {
        if self.scene.selection().is_none() {
            return Vec::new();
        }
        self.scene.clear_selection();
        vec![Action::SelectionChanged(None), Action::RenderNeeded]
    }

    /// Select the next element in insertion order, wrapping, and bring it
    /// into view when it hangs off the canvas.
    pub fn cycle_selection(&mut self) -> Vec<Action> {
        let Some(id) = self.scene.next_in_cycle() else {
            return Vec::new();
        };
        self.scene.clear_selection();
        self.scene.select(&id);

        let canvas = self.viewport.bounds();
        let mut moved = false;
        if let Some(element) = self.scene.get_mut(&id) {
            let b = element.bounds(&*self.measurer);
            if !b.is_within(&canvas) {
                let left = ((canvas.width - b.width) / 2.0).max(0.0);
                let top = ((canvas.height - b.height) / 2.0).max(0.0);
                element.translate(left - b.x, top - b.y);
                moved = true;
            }
        }
        self.refresh_handles();

        let mut actions = vec![Action::SelectionChanged(Some(id)), Action::RenderNeeded];
        if moved {
            self.push_save(&mut actions);
        }
        actions
    }

    // =============================================================
    // Z-order
    // =============================================================

    /// # Errors
    ///
    /// [`EditorError::NotFound`] without a selection.
    pub fn bring_to_front(&mut self) -> Result<Vec<Action>, EditorError> {
        self.reorder(Scene::bring_to_front)
    }

    /// # Errors
    ///
    /// [`EditorError::NotFound`] without a selection.
    pub fn send_to_back(&mut self) -> Result<Vec<Action>, EditorError> {
        self.reorder(Scene::send_to_back)
    }

    /// Returns no actions when the selection is already on top.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotFound`] without a selection.
    pub fn bring_forward(&mut self) -> Result<Vec<Action>, EditorError> {
        self.reorder(Scene::bring_forward)
    }

    /// Returns no actions when the selection is already at the bottom.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotFound`] without a selection.
    pub fn send_backward(&mut self) -> Result<Vec<Action>, EditorError> {
        self.reorder(Scene::send_backward)
    }

    fn reorder(&mut self, op: fn(&mut Scene, &ElementId) -> bool) -> Result<Vec<Action>, EditorError> {
        let id = self.scene.selection().ok_or(EditorError::NotFound)?;
        if !op(&mut self.scene, &id) {
            return Ok(Vec::new());
        }
        Ok(self.committed(Some(id)))
    }

    // =============================================================
    // Crop mode
    // =============================================================

    /// Enter or leave crop mode on the selected image. Returns the new mode.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotFound`] when the selection is not an image.
    pub fn toggle_crop_mode(&mut self) -> Result<bool, EditorError> {
        let image = self.scene.selected_mut().and_then(Element::as_image_mut).ok_or(EditorError::NotFound)?;
        image.crop_mode = !image.crop_mode;
        let on = image.crop_mode;
        self.refresh_handles();
        Ok(on)
    }

    /// # Errors
    ///
    /// [`EditorError::NotFound`] when the selection is not an image.
    pub fn reset_crop(&mut self) -> Result<Vec<Action>, EditorError> {
        let image = self.scene.selected_mut().and_then(Element::as_image_mut).ok_or(EditorError::NotFound)?;
        image.reset_crop();
        if image.maintain_aspect_ratio && image.aspect_ratio > 0.0 {
            image.height = image.width / image.aspect_ratio;
        }
        self.refresh_handles();
        Ok(self.committed(self.scene.selection()))
    }

    /// Set the selected image's crop window, clamped into the source.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotFound`] when the selection is not an image, or
    /// [`EditorError::Validation`] for a non-positive size.
    pub fn set_crop_area(&mut self, x: f64, y: f64, width: f64, height: f64) -> Result<Vec<Action>, EditorError> {
        let image = self.scene.selected_mut().and_then(Element::as_image_mut).ok_or(EditorError::NotFound)?;
        image.set_crop_area(x, y, width, height)?;
        self.refresh_handles();
        Ok(self.committed(self.scene.selection()))
    }

    // =============================================================
    // Background and scene
    // =============================================================

    /// # Errors
    ///
    /// [`EditorError::Validation`] unless `color` is a `#rgb` or `#rrggbb` hex color.
    pub fn set_background_color(&mut self, color: &str) -> Result<Vec<Action>, EditorError> {
        if Rgb::parse(color).is_none() {
            return Err(EditorError::Validation(format!("not a hex color: {color}")));
        }
        color.clone_into(&mut self.scene.background.color);
        Ok(self.committed(self.scene.selection()))
    }

    pub fn set_background_pattern(&mut self, pattern: Pattern) -> Vec<Action> {
        self.scene.background.pattern = pattern;
        self.committed(self.scene.selection())
    }

    /// Remove every element. The background stays.
    pub fn clear_scene(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        self.scene.clear();
        info!("scene cleared");
        self.committed(None)
    }

    // =============================================================
    // Rendering
    // =============================================================

    /// Draw the scene with selection chrome.
    ///
    /// # Errors
    ///
    /// Propagates surface failures.
    pub fn render(&mut self, surface: &mut dyn Surface) -> SurfaceResult {
        render::draw(surface, &mut self.scene, true)
    }

    /// Draw the scene as it should appear in an exported image.
    ///
    /// # Errors
    ///
    /// Propagates surface failures.
    pub fn render_for_export(&mut self, surface: &mut dyn Surface) -> SurfaceResult {
        render::draw(surface, &mut self.scene, false)
    }

    // =============================================================
    // Persistence
    // =============================================================

    /// Serialize the scene.
    ///
    /// # Errors
    ///
    /// [`EditorError::Resource`] when an image cannot be encoded.
    pub fn snapshot(&self, timestamp: i64) -> Result<ProjectDocument, EditorError> {
        persist::snapshot(&self.scene, &self.config, timestamp)
    }

    /// Write the project to `storage`. A failed write leaves the previously
    /// stored project as it was.
    ///
    /// # Errors
    ///
    /// [`EditorError::Resource`] when encoding or the write fails.
    pub fn save_to<S: Storage + ?Sized>(&self, storage: &mut S, timestamp: i64) -> Result<(), EditorError> {
        persist::save(&self.scene, &self.config, storage, timestamp).inspect_err(|err| {
            warn!(error = %err, "project save failed");
        })
    }

    /// Replace the scene with a decoded project.
    ///
    /// # Errors
    ///
    /// [`EditorError::Stale`] when the scene was replaced after `pending`
    /// was taken; the current scene is kept.
    pub fn install_project(
        &mut self,
        pending: PendingInsert,
        project: LoadedProject,
    ) -> Result<Vec<Action>, EditorError> {
        self.check_current(pending)?;
        let LoadedProject { elements, background, skipped } = project;
        self.input = InputState::Idle;
        self.scene.load(elements, background);
        info!(elements = self.scene.len(), skipped, "project loaded");
        Ok(vec![Action::SelectionChanged(None), Action::RenderNeeded])
    }

    /// Decode `doc` and replace the scene with it.
    ///
    /// # Errors
    ///
    /// [`EditorError::Stale`] when the scene was replaced while images were
    /// decoding.
    pub async fn load_document<D: ImageDecoder + ?Sized>(
        &mut self,
        doc: &ProjectDocument,
        decoder: &D,
    ) -> Result<Vec<Action>, EditorError> {
        let pending = self.begin_insert();
        let project = persist::decode_project(doc, decoder).await;
        self.install_project(pending, project)
    }

    /// Load the project stored in `storage`, if any. A malformed stored
    /// document leaves the current scene untouched.
    ///
    /// # Errors
    ///
    /// [`EditorError::Resource`] when storage cannot be read,
    /// [`EditorError::Validation`] for a malformed document.
    pub async fn load_from<S: Storage + ?Sized, D: ImageDecoder + ?Sized>(
        &mut self,
        storage: &S,
        decoder: &D,
    ) -> Result<Vec<Action>, EditorError> {
        let doc = persist::read_stored(&self.config, storage).inspect_err(|err| {
            warn!(error = %err, "stored project could not be read");
        })?;
        match doc {
            Some(doc) => self.load_document(&doc, decoder).await,
            None => {
                debug!("no saved project");
                Ok(Vec::new())
            }
        }
    }

    // =============================================================
    // Helpers
    // =============================================================

    /// Recompute handle positions of the selected element.
    fn refresh_handles(&mut self) {
        let measurer = &*self.measurer;
        if let Some(element) = self.scene.selected_mut() {
            element.layout_handles(measurer);
        }
    }

    fn push_save(&self, actions: &mut Vec<Action>) {
        if self.config.autosave {
            actions.push(Action::SaveRequested);
        }
    }

    /// Actions for a committed edit that leaves `selection` selected.
    fn committed(&self, selection: Option<ElementId>) -> Vec<Action> {
        let mut actions = vec![Action::SelectionChanged(selection), Action::RenderNeeded];
        self.push_save(&mut actions);
        actions
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    surface: WebSurface,
    pub core: EngineCore,
}

impl Engine {
    /// Create an engine bound to `canvas`, sizing its backing store from `config`.
    ///
    /// # Errors
    ///
    /// [`EditorError::Validation`] for an invalid config, or
    /// [`EditorError::Surface`] when the canvas has no 2D context.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(canvas: HtmlCanvasElement, config: EditorConfig) -> Result<Self, EditorError> {
        config.validate()?;
        canvas.set_width(config.canvas_width.round() as u32);
        canvas.set_height(config.canvas_height.round() as u32);
        let surface = WebSurface::new(canvas.clone())?;
        let mut core = EngineCore::with_config(config);
        core.set_measurer(Box::new(surface.context().clone()));
        Ok(Self { canvas, surface, core })
    }

    // --- Input events ---

    pub fn set_viewport(&mut self, css_width: f64, css_height: f64) {
        self.core.set_viewport(css_width, css_height);
    }

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(screen_pt, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_move(screen_pt, modifiers)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_up(screen_pt, button, modifiers)
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// [`EditorError::Surface`] when the context rejects a call.
    pub fn render(&mut self) -> Result<(), EditorError> {
        Ok(self.core.render(&mut self.surface)?)
    }

    /// Encode the canvas without selection chrome as a data URL, then redraw
    /// it with chrome.
    ///
    /// # Errors
    ///
    /// [`EditorError::Validation`] for a quality outside `[0, 1]`,
    /// [`EditorError::Resource`] when the browser refuses to encode.
    pub fn export(&mut self, format: ExportFormat, quality: Option<f64>) -> Result<String, EditorError> {
        let quality = quality.unwrap_or(self.core.config.export_quality);
        if !(0.0..=1.0).contains(&quality) {
            return Err(EditorError::Validation(format!("export quality must be within [0, 1], got {quality}")));
        }
        self.core.render_for_export(&mut self.surface)?;
        let encoded = self
            .canvas
            .to_data_url_with_type_and_encoder_options(format.mime_type(), &JsValue::from_f64(quality))
            .map_err(|err| EditorError::Resource(format!("canvas export failed: {err:?}")));
        self.render()?;
        encoded
    }

    // --- Persistence ---

    /// Save the project to local storage.
    ///
    /// # Errors
    ///
    /// [`EditorError::Resource`] when storage is unavailable or full.
    #[allow(clippy::cast_possible_truncation)]
    pub fn save(&self) -> Result<(), EditorError> {
        let mut storage = LocalStorage::open()?;
        self.core.save_to(&mut storage, js_sys::Date::now() as i64)
    }

    /// Load the project saved in local storage.
    ///
    /// # Errors
    ///
    /// See [`EngineCore::load_from`].
    pub async fn load(&mut self) -> Result<Vec<Action>, EditorError> {
        let storage = LocalStorage::open()?;
        self.core.load_from(&storage, &CodecDecoder).await
    }

    /// Validate and decode an uploaded file, then add it as an image.
    ///
    /// # Errors
    ///
    /// See [`EngineCore::add_upload`].
    pub async fn add_upload(&mut self, mime_type: &str, bytes: Vec<u8>) -> Result<Vec<Action>, EditorError> {
        self.core.add_upload(mime_type, bytes, &CodecDecoder).await
    }

    // --- Delegated queries ---

    #[must_use]
    pub fn selection(&self) -> Option<ElementId> {
        self.core.selection()
    }

    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.core.element(id)
    }
}
