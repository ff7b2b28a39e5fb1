//! Selection handles: placement, drawing and hit testing.
//!
//! Handle centers are laid out once per frame as offsets in the element's
//! unrotated local frame (origin at the rotation pivot). The same offsets are
//! drawn inside the rotated frame and mapped to global space for the hit-test
//! cache, so a handle is always clickable exactly where it was painted.

#[cfg(test)]
#[path = "handles_test.rs"]
mod handles_test;

use crate::consts::{HANDLE_SIZE, ROTATE_GUIDE_LEN, ROTATE_HANDLE_OFFSET};
use crate::geom::{Point, Rect, local_to_global};
use crate::surface::{Surface, SurfaceResult};

pub(crate) const OUTLINE_COLOR: &str = "#ff0000";
pub(crate) const HANDLE_FILL: &str = "#ff0000";
const HANDLE_STROKE: &str = "#ffffff";
/// Rotate knobs, arrow control points and crop boundaries.
pub(crate) const ACCENT_COLOR: &str = "#00ff00";
pub(crate) const OUTLINE_DASH: [f64; 2] = [5.0, 5.0];

/// Which handle of a selected element was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Top-left corner resize.
    Nw,
    /// Top-right corner resize.
    Ne,
    /// Bottom-left corner resize.
    Sw,
    /// Bottom-right corner resize.
    Se,
    /// Rotation knob above the top edge.
    Rotate,
    /// Arrow start point.
    Start,
    /// Arrow end point.
    End,
    /// Curved arrow control point.
    Control,
}

impl HandleKind {
    /// Unit direction pointing away from the element for corner handles.
    #[must_use]
    pub fn outward(self) -> Option<Point> {
        match self {
            Self::Nw => Some(Point::new(-1.0, -1.0)),
            Self::Ne => Some(Point::new(1.0, -1.0)),
            Self::Sw => Some(Point::new(-1.0, 1.0)),
            Self::Se => Some(Point::new(1.0, 1.0)),
            Self::Rotate | Self::Start | Self::End | Self::Control => None,
        }
    }

    /// The diagonally opposite corner.
    #[must_use]
    pub fn opposite(self) -> Option<Self> {
        match self {
            Self::Nw => Some(Self::Se),
            Self::Ne => Some(Self::Sw),
            Self::Sw => Some(Self::Ne),
            Self::Se => Some(Self::Nw),
            Self::Rotate | Self::Start | Self::End | Self::Control => None,
        }
    }
}

/// Handles on an image's crop window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CropHandle {
    /// Pan the crop window over the source image.
    Move,
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl CropHandle {
    /// Which edges the handle drags: `(left, right, top, bottom)`.
    #[must_use]
    pub fn edges(self) -> (bool, bool, bool, bool) {
        match self {
            Self::Move => (false, false, false, false),
            Self::N => (false, false, true, false),
            Self::S => (false, false, false, true),
            Self::E => (false, true, false, false),
            Self::W => (true, false, false, false),
            Self::Ne => (false, true, true, false),
            Self::Nw => (true, false, true, false),
            Self::Se => (false, true, false, true),
            Self::Sw => (true, false, false, true),
        }
    }
}

/// A handle placed in global canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle<K> {
    pub kind: K,
    /// Handle center in global coordinates.
    pub center: Point,
}

impl<K: Copy> Handle<K> {
    /// The square hit region around the center.
    #[must_use]
    pub fn hit_box(&self) -> Rect {
        Rect::centered(self.center, HANDLE_SIZE)
    }
}

/// Return the first handle whose box contains `p`.
#[must_use]
pub fn hit<K: Copy>(handles: &[Handle<K>], p: Point) -> Option<K> {
    handles.iter().find(|h| h.hit_box().contains(p)).map(|h| h.kind)
}

/// Local handle offsets for a selection box given relative to the pivot.
#[must_use]
pub fn box_handle_offsets(local_box: Rect) -> Vec<(HandleKind, Point)> {
    vec![
        (HandleKind::Nw, Point::new(local_box.x, local_box.y)),
        (HandleKind::Ne, Point::new(local_box.right(), local_box.y)),
        (HandleKind::Sw, Point::new(local_box.x, local_box.bottom())),
        (HandleKind::Se, Point::new(local_box.right(), local_box.bottom())),
        (HandleKind::Rotate, Point::new(local_box.center().x, local_box.y - ROTATE_HANDLE_OFFSET)),
    ]
}

/// Map local offsets into global handles around `pivot`.
#[must_use]
pub fn to_global<K: Copy>(offsets: &[(K, Point)], pivot: Point, rotation: f64) -> Vec<Handle<K>> {
    offsets
        .iter()
        .map(|(kind, offset)| Handle { kind: *kind, center: local_to_global(*offset, pivot, rotation) })
        .collect()
}

/// Draw the dashed outline, corner squares and rotate knob in the current
/// (already translated and rotated) frame.
///
/// # Errors
///
/// Propagates surface failures.
pub fn draw_box_selection(
    surface: &mut dyn Surface,
    local_box: Rect,
    offsets: &[(HandleKind, Point)],
) -> SurfaceResult {
    surface.save();
    surface.set_global_alpha(1.0);
    surface.set_stroke_color(OUTLINE_COLOR);
    surface.set_line_width(2.0);
    surface.set_line_dash(&OUTLINE_DASH)?;
    surface.stroke_rect(local_box);
    surface.set_line_dash(&[])?;

    // Guide from the top edge toward the rotate knob.
    let top_mid = Point::new(local_box.center().x, local_box.y);
    surface.set_stroke_color(ACCENT_COLOR);
    surface.set_line_width(1.0);
    surface.begin_path();
    surface.move_to(top_mid);
    surface.line_to(Point::new(top_mid.x, top_mid.y - ROTATE_GUIDE_LEN));
    surface.stroke();

    for (kind, center) in offsets {
        let fill = if *kind == HandleKind::Rotate { ACCENT_COLOR } else { HANDLE_FILL };
        draw_handle_square(surface, *center, fill);
    }
    surface.restore();
    Ok(())
}

/// Draw one handle square centered on `center` in the current frame.
pub fn draw_handle_square(surface: &mut dyn Surface, center: Point, fill: &str) {
    let rect = Rect::centered(center, HANDLE_SIZE);
    surface.set_fill_color(fill);
    surface.set_stroke_color(HANDLE_STROKE);
    surface.set_line_width(1.0);
    surface.fill_rect(rect);
    surface.stroke_rect(rect);
}
