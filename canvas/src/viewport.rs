//! Canvas viewport: maps pointer positions from CSS pixels into canvas pixels.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use crate::geom::{Point, Rect};

/// Pixel geometry of the drawing canvas.
///
/// `width` / `height` are the canvas backing-store size in canvas pixels; every
/// element coordinate lives in this space. `css_width` / `css_height` are the
/// size the host lays the canvas out at, so pointer events reported in CSS
/// pixels can be scaled back into canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub css_width: f64,
    pub css_height: f64,
}

impl Viewport {
    /// A viewport displayed at its native size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, css_width: width, css_height: height }
    }

    /// Record the size the host currently displays the canvas at.
    pub fn set_css_size(&mut self, css_width: f64, css_height: f64) {
        self.css_width = css_width;
        self.css_height = css_height;
    }

    /// Convert a CSS-pixel offset (relative to the canvas' top-left) into canvas pixels.
    #[must_use]
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        Point {
            x: screen.x * scale(self.width, self.css_width),
            y: screen.y * scale(self.height, self.css_height),
        }
    }

    /// The full canvas rectangle.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

fn scale(canvas: f64, css: f64) -> f64 {
    if css > 0.0 { canvas / css } else { 1.0 }
}
