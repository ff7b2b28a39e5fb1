//! Geometry helpers shared by every element variant.
//!
//! All angles stored on elements are in degrees, clockwise in canvas space
//! (y grows downward). The helpers here are the single source of truth for
//! rotating between an element's local frame and global canvas space, so that
//! draw-time handle placement and hit-time lookups use identical math.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use serde::{Deserialize, Serialize};

/// A point in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Square of side `size` centered on `center`.
    #[must_use]
    pub fn centered(center: Point, size: f64) -> Self {
        Self::new(center.x - size / 2.0, center.y - size / 2.0, size, size)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Grow the rectangle by `pad` on every side.
    #[must_use]
    pub fn inflate(&self, pad: f64) -> Self {
        Self::new(self.x - pad, self.y - pad, self.width + pad * 2.0, self.height + pad * 2.0)
    }

    /// Whether the rectangle lies entirely inside `outer`.
    #[must_use]
    pub fn is_within(&self, outer: &Rect) -> bool {
        self.x >= outer.x && self.y >= outer.y && self.right() <= outer.right() && self.bottom() <= outer.bottom()
    }

    /// Smallest rectangle enclosing every point. Returns a zero rect for an empty slice.
    #[must_use]
    pub fn enclosing(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

/// Rotate `p` about `pivot` by `degrees` (clockwise in canvas space).
#[must_use]
pub fn rotate_point(p: Point, pivot: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = p.x - pivot.x;
    let dy = p.y - pivot.y;
    Point::new(pivot.x + dx * cos - dy * sin, pivot.y + dx * sin + dy * cos)
}

/// Map a local offset (relative to `pivot`, unrotated) into global space.
#[must_use]
pub fn local_to_global(offset: Point, pivot: Point, degrees: f64) -> Point {
    rotate_point(Point::new(pivot.x + offset.x, pivot.y + offset.y), pivot, degrees)
}

/// Map a global point into an element's unrotated frame around `pivot`.
#[must_use]
pub fn global_to_local(p: Point, pivot: Point, degrees: f64) -> Point {
    rotate_point(p, pivot, -degrees)
}

/// Normalize an angle in degrees into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let r = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if r >= 360.0 { 0.0 } else { r }
}

/// Shortest distance from `p` to the segment `a`–`b`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let cx = b.x - a.x;
    let cy = b.y - a.y;
    let len_sq = cx * cx + cy * cy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * cx + (p.y - a.y) * cy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * cx, a.y + t * cy))
}

/// Evaluate a quadratic Bézier `p0 → p2` with control `p1` at parameter `t`.
#[must_use]
pub fn quadratic_bezier(p0: Point, p1: Point, p2: Point, t: f64) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * p0.x + 2.0 * u * t * p1.x + t * t * p2.x,
        u * u * p0.y + 2.0 * u * t * p1.y + t * t * p2.y,
    )
}

/// Signed perpendicular distance of `p` from the infinite line `a → b`.
///
/// Positive values lie on the side the left-hand normal `(-dy, dx)` points to.
/// Returns `0.0` for a degenerate line.
#[must_use]
pub fn signed_distance_to_line(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return 0.0;
    }
    ((p.x - a.x) * -dy + (p.y - a.y) * dx) / len
}

/// Axis-aligned bounds of `rect` after rotating it about its center.
#[must_use]
pub fn rotated_bounds(rect: &Rect, degrees: f64) -> Rect {
    let c = rect.center();
    let corners = [
        Point::new(rect.x, rect.y),
        Point::new(rect.right(), rect.y),
        Point::new(rect.right(), rect.bottom()),
        Point::new(rect.x, rect.bottom()),
    ]
    .map(|p| rotate_point(p, c, degrees));
    Rect::enclosing(&corners)
}

/// Clamp `value` into `[min, max]` without panicking on an inverted range;
/// `min` wins when `max < min`.
#[must_use]
pub fn clamp_between(value: f64, min: f64, max: f64) -> f64 {
    value.min(max).max(min)
}
