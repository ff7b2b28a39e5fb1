//! Single-line text element.

use serde::{Deserialize, Serialize};

use super::ElementPatch;
use crate::consts::{MIN_TEXT_SIZE, TEXT_RESIZE_DIVISOR, TEXT_RESIZE_STEP};
use crate::geom::{Point, Rect};
use crate::surface::{Font, Surface, SurfaceResult, TextAlign, TextBaseline, TextMeasurer};

pub const DEFAULT_TEXT: &str = "Sample Text";
pub const DEFAULT_FONT: &str = "Arial";
pub const DEFAULT_TEXT_SIZE: f64 = 48.0;
pub const DEFAULT_TEXT_COLOR: &str = "#000000";
pub const DEFAULT_WEIGHT: &str = "normal";

fn default_font() -> String {
    DEFAULT_FONT.to_owned()
}

fn default_weight() -> String {
    DEFAULT_WEIGHT.to_owned()
}

fn default_outline_color() -> String {
    DEFAULT_TEXT_COLOR.to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub text: String,
    #[serde(default = "default_font")]
    pub font: String,
    pub size: f64,
    pub color: String,
    #[serde(default = "default_weight")]
    pub weight: String,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub outline_width: f64,
    #[serde(default = "default_outline_color")]
    pub outline_color: String,
}

impl Default for TextElement {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_owned(),
            font: default_font(),
            size: DEFAULT_TEXT_SIZE,
            color: DEFAULT_TEXT_COLOR.to_owned(),
            weight: default_weight(),
            align: TextAlign::Left,
            outline_width: 0.0,
            outline_color: default_outline_color(),
        }
    }
}

impl TextElement {
    #[must_use]
    pub fn font(&self) -> Font<'_> {
        Font { weight: &self.weight, size: self.size, family: &self.font }
    }

    /// Unrotated bounds for a text anchored at `anchor`.
    ///
    /// The anchor is the top of the line; its x is the left edge, middle or
    /// right edge depending on the alignment.
    #[must_use]
    pub fn bounds<M: TextMeasurer + ?Sized>(&self, anchor: Point, measurer: &M) -> Rect {
        let width = measurer.measure_text(&self.text, &self.font());
        let left = match self.align {
            TextAlign::Left => anchor.x,
            TextAlign::Center => anchor.x - width / 2.0,
            TextAlign::Right => anchor.x - width,
        };
        Rect::new(left, anchor.y, width, self.size)
    }

    /// Font size after a resize drag of `distance` pixels from the start size.
    #[must_use]
    pub fn resized(start_size: f64, distance: f64, grow: bool) -> f64 {
        let step = distance / TEXT_RESIZE_DIVISOR * TEXT_RESIZE_STEP;
        let size = if grow { start_size + step } else { start_size - step };
        size.max(MIN_TEXT_SIZE).round()
    }

    pub(super) fn apply(&mut self, patch: &ElementPatch) {
        if let Some(v) = &patch.text {
            self.text.clone_from(v);
        }
        if let Some(v) = &patch.font {
            self.font.clone_from(v);
        }
        if let Some(v) = patch.size {
            self.size = v;
        }
        if let Some(v) = &patch.color {
            self.color.clone_from(v);
        }
        if let Some(v) = &patch.weight {
            self.weight.clone_from(v);
        }
        if let Some(v) = patch.align {
            self.align = v;
        }
        if let Some(v) = patch.outline_width {
            self.outline_width = v;
        }
        if let Some(v) = &patch.outline_color {
            self.outline_color.clone_from(v);
        }
    }

    /// Draw centered on the origin of the current (rotated) frame.
    pub(super) fn draw(&self, surface: &mut dyn Surface) -> SurfaceResult {
        surface.set_font(&self.font());
        surface.set_text_align(TextAlign::Center);
        surface.set_text_baseline(TextBaseline::Middle);
        if self.outline_width > 0.0 {
            // The stroke straddles the glyph edge, so double it to get the
            // requested visible width outside the fill.
            surface.set_stroke_color(&self.outline_color);
            surface.set_line_width(self.outline_width * 2.0);
            surface.set_round_caps(true);
            surface.stroke_text(&self.text, 0.0, 0.0)?;
        }
        surface.set_fill_color(&self.color);
        surface.fill_text(&self.text, 0.0, 0.0)
    }
}
