//! Shared numeric constants for the canvas crate.

// ── Handles ─────────────────────────────────────────────────────

/// Side length of a square selection handle, in canvas pixels.
pub const HANDLE_SIZE: f64 = 8.0;

/// Gap between an element's bounds and its dashed selection outline.
pub const SELECTION_PAD: f64 = 5.0;

/// Distance from the top of the selection outline to the rotate handle center.
pub const ROTATE_HANDLE_OFFSET: f64 = 20.0;

/// Length of the guide line drawn from the outline toward the rotate handle.
pub const ROTATE_GUIDE_LEN: f64 = 15.0;

// ── Gestures ────────────────────────────────────────────────────

/// Smallest font size reachable through a resize gesture.
pub const MIN_TEXT_SIZE: f64 = 12.0;

/// Smallest width/height reachable through a resize or crop gesture.
pub const MIN_BOX_SIZE: f64 = 20.0;

/// Pointer distance that maps to one text resize step.
pub const TEXT_RESIZE_DIVISOR: f64 = 50.0;

/// Font size change per text resize step.
pub const TEXT_RESIZE_STEP: f64 = 20.0;

/// Pointer distance that maps to a 1.0 change in box scale.
pub const BOX_RESIZE_DIVISOR: f64 = 200.0;

/// Offset applied to duplicated elements.
pub const DUPLICATE_OFFSET: f64 = 20.0;

// ── Arrows ──────────────────────────────────────────────────────

/// Minimum hit tolerance around an arrow path.
pub const ARROW_MIN_TOLERANCE: f64 = 10.0;

/// Extra tolerance added to the stroke width when hit testing arrows.
pub const ARROW_STROKE_SLOP: f64 = 5.0;

/// Number of linear segments used to sample a curved arrow.
pub const CURVE_SEGMENTS: u32 = 20;

/// Curve parameter used to estimate the arrowhead direction.
pub const ARROWHEAD_TANGENT_T: f64 = 0.99;

/// Padding around the control point in a curved arrow's bounding box.
pub const CURVE_BOUNDS_PAD: f64 = 10.0;

// ── Images ──────────────────────────────────────────────────────

/// Fraction of the canvas a freshly added image may occupy.
pub const IMAGE_FIT_FRACTION: f64 = 0.8;

/// Alpha of the dimmed region outside the crop window.
pub const CROP_SHADE_ALPHA: f64 = 0.3;

// ── Commands ────────────────────────────────────────────────────

/// Canvas x and y at which new text, shapes and arrows are placed.
pub const NEW_ELEMENT_POS: f64 = 100.0;
