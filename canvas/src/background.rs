//! Procedural canvas backgrounds parameterized by a base color.

#[cfg(test)]
#[path = "background_test.rs"]
mod background_test;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::darken;
use crate::geom::{Point, Rect};
use crate::surface::{Surface, SurfaceResult};

pub const DEFAULT_BACKGROUND_COLOR: &str = "#ffffff";

const GRADIENT_DARKEN: f64 = 0.3;
const STRIPE_DARKEN: f64 = 0.1;
const STRIPE_WIDTH: f64 = 40.0;
const DOT_DARKEN: f64 = 0.2;
const DOT_RADIUS: f64 = 6.0;
const DOT_SPACING: f64 = 40.0;

/// Fill pattern drawn under every element.
///
/// Unknown names read from a document or the host fall back to `Solid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Pattern {
    #[default]
    Solid,
    Gradient,
    Stripes,
    Dots,
}

impl Pattern {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Gradient => "gradient",
            Self::Stripes => "stripes",
            Self::Dots => "dots",
        }
    }

    /// Parse a pattern name, falling back to [`Pattern::Solid`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "gradient" => Self::Gradient,
            "stripes" => Self::Stripes,
            "dots" => Self::Dots,
            _ => Self::Solid,
        }
    }
}

impl From<String> for Pattern {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.as_str().to_owned()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scene background: base color plus pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    pub color: String,
    pub pattern: Pattern,
}

impl Default for Background {
    fn default() -> Self {
        Self { color: DEFAULT_BACKGROUND_COLOR.to_owned(), pattern: Pattern::Solid }
    }
}

impl Background {
    /// Fill the whole surface.
    ///
    /// # Errors
    ///
    /// Propagates surface failures.
    pub fn render(&self, surface: &mut dyn Surface) -> SurfaceResult {
        let full = Rect::new(0.0, 0.0, surface.width(), surface.height());
        surface.save();
        surface.set_global_alpha(1.0);
        let result = match self.pattern {
            Pattern::Solid => {
                fill_solid(surface, full, &self.color);
                Ok(())
            }
            Pattern::Gradient => render_gradient(surface, full, &self.color),
            Pattern::Stripes => {
                render_stripes(surface, full, &self.color);
                Ok(())
            }
            Pattern::Dots => render_dots(surface, full, &self.color),
        };
        surface.restore();
        result
    }
}

fn fill_solid(surface: &mut dyn Surface, full: Rect, color: &str) {
    surface.set_fill_color(color);
    surface.fill_rect(full);
}

fn render_gradient(surface: &mut dyn Surface, full: Rect, color: &str) -> SurfaceResult {
    let end = darken(color, GRADIENT_DARKEN);
    surface.fill_linear_gradient(
        full,
        Point::new(full.x, full.y),
        Point::new(full.right(), full.bottom()),
        &[(0.0, color), (1.0, &end)],
    )
}

fn render_stripes(surface: &mut dyn Surface, full: Rect, color: &str) {
    fill_solid(surface, full, color);
    surface.set_fill_color(&darken(color, STRIPE_DARKEN));
    let mut x = 0.0;
    while x < full.width {
        surface.fill_rect(Rect::new(x, 0.0, STRIPE_WIDTH, full.height));
        x += STRIPE_WIDTH * 2.0;
    }
}

fn render_dots(surface: &mut dyn Surface, full: Rect, color: &str) -> SurfaceResult {
    fill_solid(surface, full, color);
    surface.set_fill_color(&darken(color, DOT_DARKEN));
    let mut x = DOT_SPACING;
    while x < full.width {
        let mut y = DOT_SPACING;
        while y < full.height {
            surface.begin_path();
            surface.circle(Point::new(x, y), DOT_RADIUS)?;
            surface.fill();
            y += DOT_SPACING;
        }
        x += DOT_SPACING;
    }
    Ok(())
}
