//! Filled geometric shape element.

use serde::{Deserialize, Serialize};

use super::ElementPatch;
use crate::color::darken;
use crate::geom::{Point, Rect};
use crate::surface::{Surface, SurfaceResult};

pub const DEFAULT_SHAPE_SIZE: f64 = 100.0;
pub const DEFAULT_SHAPE_COLOR: &str = "#ffffff";
pub const DEFAULT_SHAPE_OPACITY: f64 = 0.3;
pub const DEFAULT_SHAPE_STROKE: f64 = 2.0;

/// Amount the stroke is darkened relative to the fill.
const STROKE_DARKEN: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    #[default]
    Rectangle,
    Circle,
    Triangle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeElement {
    pub shape_type: ShapeType,
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub opacity: f64,
    pub stroke_width: f64,
    pub stroke_color: String,
}

impl ShapeElement {
    #[must_use]
    pub fn new(shape_type: ShapeType) -> Self {
        Self {
            shape_type,
            width: DEFAULT_SHAPE_SIZE,
            height: DEFAULT_SHAPE_SIZE,
            color: DEFAULT_SHAPE_COLOR.to_owned(),
            opacity: DEFAULT_SHAPE_OPACITY,
            stroke_width: DEFAULT_SHAPE_STROKE,
            stroke_color: darken(DEFAULT_SHAPE_COLOR, STROKE_DARKEN),
        }
    }

    /// Hit test against the unrotated local frame centered on the shape.
    #[must_use]
    pub fn contains_local(&self, local: Point) -> bool {
        match self.shape_type {
            ShapeType::Circle => local.distance(Point::default()) <= self.width.min(self.height) / 2.0,
            // Triangles hit on their bounding box.
            ShapeType::Rectangle | ShapeType::Triangle => {
                Rect::new(-self.width / 2.0, -self.height / 2.0, self.width, self.height).contains(local)
            }
        }
    }

    pub(super) fn apply(&mut self, patch: &ElementPatch) {
        if let Some(v) = patch.shape_type {
            self.shape_type = v;
        }
        if let Some(v) = patch.width {
            self.width = v;
        }
        if let Some(v) = patch.height {
            self.height = v;
        }
        if let Some(v) = &patch.color {
            self.color.clone_from(v);
            self.stroke_color = darken(v, STROKE_DARKEN);
        }
        if let Some(v) = patch.opacity {
            self.opacity = v;
        }
        if let Some(v) = patch.stroke_width {
            self.stroke_width = v;
        }
        if let Some(v) = &patch.stroke_color {
            self.stroke_color.clone_from(v);
        }
    }

    /// Draw centered on the origin of the current (rotated) frame.
    pub(super) fn draw(&self, surface: &mut dyn Surface) -> SurfaceResult {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        surface.set_global_alpha(self.opacity);
        surface.set_fill_color(&self.color);
        surface.set_stroke_color(&self.stroke_color);
        surface.set_line_width(self.stroke_width);
        match self.shape_type {
            ShapeType::Rectangle => {
                let r = Rect::new(-hw, -hh, self.width, self.height);
                surface.fill_rect(r);
                surface.stroke_rect(r);
            }
            ShapeType::Circle => {
                surface.begin_path();
                surface.circle(Point::default(), hw.min(hh))?;
                surface.fill();
                surface.stroke();
            }
            ShapeType::Triangle => {
                surface.begin_path();
                surface.move_to(Point::new(0.0, -hh));
                surface.line_to(Point::new(-hw, hh));
                surface.line_to(Point::new(hw, hh));
                surface.close_path();
                surface.fill();
                surface.stroke();
            }
        }
        Ok(())
    }
}
