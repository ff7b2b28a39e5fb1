//! Straight or curved arrow element.
//!
//! The start point is the element anchor (`x`, `y`); the end point is stored
//! here. A curved arrow is a quadratic Bézier whose control point sits on the
//! perpendicular bisector of the base segment, `curvature × length` away.

use std::f64::consts::FRAC_PI_6;

use serde::{Deserialize, Serialize};

use super::ElementPatch;
use super::handles::{self, ACCENT_COLOR, HANDLE_FILL, HandleKind, OUTLINE_COLOR, OUTLINE_DASH};
use crate::consts::{
    ARROW_MIN_TOLERANCE, ARROW_STROKE_SLOP, ARROWHEAD_TANGENT_T, CURVE_BOUNDS_PAD, CURVE_SEGMENTS, SELECTION_PAD,
};
use crate::geom::{Point, Rect, distance_to_segment, quadratic_bezier, signed_distance_to_line};
use crate::surface::{Surface, SurfaceResult};

pub const DEFAULT_ARROW_DX: f64 = 100.0;
pub const DEFAULT_ARROW_DY: f64 = 50.0;
pub const DEFAULT_ARROW_COLOR: &str = "#000000";
pub const DEFAULT_ARROW_STROKE: f64 = 3.0;
pub const DEFAULT_ARROWHEAD_SIZE: f64 = 15.0;
pub const DEFAULT_CURVATURE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowType {
    #[default]
    Straight,
    Curved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowElement {
    pub x2: f64,
    pub y2: f64,
    #[serde(default)]
    pub arrow_type: ArrowType,
    pub color: String,
    pub opacity: f64,
    pub stroke_width: f64,
    pub arrowhead_size: f64,
    /// In `[-1, 1]`; the sign picks the side the curve bows toward.
    pub curvature: f64,
    /// Unrotated bounds of the drawn arrow, kept in sync with the geometry.
    #[serde(default)]
    pub bounding_box: Rect,
}

impl ArrowElement {
    /// A straight arrow from `start` with the default extent.
    #[must_use]
    pub fn new(start: Point) -> Self {
        let mut arrow = Self {
            x2: start.x + DEFAULT_ARROW_DX,
            y2: start.y + DEFAULT_ARROW_DY,
            arrow_type: ArrowType::Straight,
            color: DEFAULT_ARROW_COLOR.to_owned(),
            opacity: 1.0,
            stroke_width: DEFAULT_ARROW_STROKE,
            arrowhead_size: DEFAULT_ARROWHEAD_SIZE,
            curvature: DEFAULT_CURVATURE,
            bounding_box: Rect::default(),
        };
        arrow.refresh_bounds(start);
        arrow
    }

    #[must_use]
    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    /// Midpoint of the base segment, the arrow's rotation pivot.
    #[must_use]
    pub fn midpoint(&self, start: Point) -> Point {
        Point::new((start.x + self.x2) / 2.0, (start.y + self.y2) / 2.0)
    }

    fn is_curved(&self) -> bool {
        self.arrow_type == ArrowType::Curved
    }

    /// Bézier control point. Degenerate arrows use the midpoint.
    #[must_use]
    pub fn control_point(&self, start: Point) -> Point {
        let mid = self.midpoint(start);
        let dx = self.x2 - start.x;
        let dy = self.y2 - start.y;
        let len = dx.hypot(dy);
        if len == 0.0 {
            return mid;
        }
        let offset = len * self.curvature;
        Point::new(mid.x - dy / len * offset, mid.y + dx / len * offset)
    }

    /// Recompute [`ArrowElement::bounding_box`] for the current geometry.
    pub fn refresh_bounds(&mut self, start: Point) {
        let end = self.end();
        let pad = self.arrowhead_size;
        let base = Rect::enclosing(&[start, end]).inflate(pad);
        self.bounding_box = if self.is_curved() && self.curvature != 0.0 {
            let c = self.control_point(start);
            let corners = [Point::new(base.x, base.y), Point::new(base.right(), base.bottom()), c];
            Rect::enclosing(&corners).inflate(CURVE_BOUNDS_PAD)
        } else {
            base
        };
    }

    /// Distance within which a point counts as touching the arrow.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        (self.stroke_width + ARROW_STROKE_SLOP).max(ARROW_MIN_TOLERANCE)
    }

    /// Hit test in the unrotated frame, against the drawn path.
    #[must_use]
    pub fn touches(&self, start: Point, p: Point) -> bool {
        let tol = self.tolerance();
        let end = self.end();
        if !self.is_curved() {
            return distance_to_segment(p, start, end) <= tol;
        }
        let c = self.control_point(start);
        let n = f64::from(CURVE_SEGMENTS);
        (0..CURVE_SEGMENTS).any(|i| {
            let a = quadratic_bezier(start, c, end, f64::from(i) / n);
            let b = quadratic_bezier(start, c, end, f64::from(i + 1) / n);
            distance_to_segment(p, a, b) <= tol
        })
    }

    /// Curvature that puts the control point under `p`, clamped to `[-1, 1]`.
    #[must_use]
    pub fn curvature_toward(&self, start: Point, p: Point) -> f64 {
        let end = self.end();
        let len = start.distance(end);
        if len == 0.0 {
            return self.curvature;
        }
        (signed_distance_to_line(p, start, end) / len).clamp(-1.0, 1.0)
    }

    /// Handle positions as offsets from the midpoint.
    pub(super) fn handle_offsets(&self, start: Point) -> Vec<(HandleKind, Point)> {
        let mid = self.midpoint(start);
        let rel = |p: Point| Point::new(p.x - mid.x, p.y - mid.y);
        let mut out = vec![(HandleKind::Start, rel(start)), (HandleKind::End, rel(self.end()))];
        if self.is_curved() {
            out.push((HandleKind::Control, rel(self.control_point(start))));
        }
        out
    }

    pub(super) fn apply(&mut self, patch: &ElementPatch) {
        if let Some(v) = patch.x2 {
            self.x2 = v;
        }
        if let Some(v) = patch.y2 {
            self.y2 = v;
        }
        if let Some(v) = patch.arrow_type {
            self.arrow_type = v;
        }
        if let Some(v) = &patch.color {
            self.color.clone_from(v);
        }
        if let Some(v) = patch.opacity {
            self.opacity = v;
        }
        if let Some(v) = patch.stroke_width {
            self.stroke_width = v;
        }
        if let Some(v) = patch.arrowhead_size {
            self.arrowhead_size = v;
        }
        if let Some(v) = patch.curvature {
            self.curvature = v;
        }
    }

    /// Draw in the current frame, whose origin is the arrow midpoint.
    pub(super) fn draw(&self, surface: &mut dyn Surface, start: Point) {
        let mid = self.midpoint(start);
        let rel = |p: Point| Point::new(p.x - mid.x, p.y - mid.y);
        let (s, e) = (rel(start), rel(self.end()));

        surface.set_global_alpha(self.opacity);
        surface.set_stroke_color(&self.color);
        surface.set_fill_color(&self.color);
        surface.set_line_width(self.stroke_width);
        surface.set_round_caps(true);

        surface.begin_path();
        surface.move_to(s);
        let from = if self.is_curved() {
            let c = rel(self.control_point(start));
            surface.quadratic_curve_to(c, e);
            quadratic_bezier(s, c, e, ARROWHEAD_TANGENT_T)
        } else {
            surface.line_to(e);
            s
        };
        surface.stroke();
        self.draw_head(surface, e, from);
    }

    /// Two strokes at ±30° behind the tip, pointing away from `from`.
    fn draw_head(&self, surface: &mut dyn Surface, tip: Point, from: Point) {
        let angle = (tip.y - from.y).atan2(tip.x - from.x);
        let len = self.arrowhead_size;
        surface.begin_path();
        for side in [angle - FRAC_PI_6, angle + FRAC_PI_6] {
            surface.move_to(tip);
            surface.line_to(Point::new(tip.x - len * side.cos(), tip.y - len * side.sin()));
        }
        surface.stroke();
    }

    /// Dashed bounds, endpoint handles and the control handle with its guides.
    pub(super) fn draw_selection(&self, surface: &mut dyn Surface, start: Point) -> SurfaceResult {
        let mid = self.midpoint(start);
        let b = self.bounding_box.inflate(SELECTION_PAD);
        surface.save();
        surface.set_global_alpha(1.0);
        surface.set_stroke_color(OUTLINE_COLOR);
        surface.set_line_width(2.0);
        surface.set_line_dash(&OUTLINE_DASH)?;
        surface.stroke_rect(Rect::new(b.x - mid.x, b.y - mid.y, b.width, b.height));
        surface.set_line_dash(&[])?;

        let offsets = self.handle_offsets(start);
        if self.is_curved() {
            let point = |kind: HandleKind| offsets.iter().find(|(k, _)| *k == kind).map(|(_, p)| *p);
            if let (Some(s), Some(c), Some(e)) =
                (point(HandleKind::Start), point(HandleKind::Control), point(HandleKind::End))
            {
                surface.set_stroke_color(ACCENT_COLOR);
                surface.set_line_width(1.0);
                surface.set_line_dash(&[2.0, 2.0])?;
                surface.begin_path();
                surface.move_to(s);
                surface.line_to(c);
                surface.line_to(e);
                surface.stroke();
                surface.set_line_dash(&[])?;
            }
        }
        for (kind, center) in &offsets {
            let fill = if *kind == HandleKind::Control { ACCENT_COLOR } else { HANDLE_FILL };
            handles::draw_handle_square(surface, *center, fill);
        }
        surface.restore();
        Ok(())
    }
}
