//! Recording drawing surface for unit tests.
//!
//! Every call is captured as an [`Op`]. The surface also tracks the current
//! translate/rotate transform so tests can ask where a rect drawn in a
//! rotated frame ended up in global coordinates.

use crate::geom::{Point, Rect, rotate_point};
use crate::surface::{ApproxMeasurer, Bitmap, Font, Surface, SurfaceResult, TextAlign, TextBaseline, TextMeasurer};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    BeginFrame,
    EndFrame,
    Save,
    Restore,
    Translate(f64, f64),
    Rotate(f64),
    GlobalAlpha(f64),
    FillColor(String),
    StrokeColor(String),
    LineWidth(f64),
    LineDash(Vec<f64>),
    Filter(String),
    /// A filled rect and its center mapped to global coordinates.
    FillRect { rect: Rect, global_center: Point },
    StrokeRect(Rect),
    Gradient { rect: Rect, stops: Vec<(f32, String)> },
    BeginPath,
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    Circle(Point, f64),
    ClosePath,
    Fill,
    Stroke,
    Font(String),
    FillText(String),
    StrokeText(String),
    DrawBitmap { id: u64, src: Rect, dst: Rect },
}

#[derive(Debug, Clone, Copy)]
struct Transform {
    origin: Point,
    /// Radians.
    angle: f64,
}

pub struct RecordingSurface {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<Op>,
    transform: Transform,
    stack: Vec<Transform>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            transform: Transform { origin: Point::default(), angle: 0.0 },
            stack: Vec::new(),
        }
    }

    /// Save/restore nesting depth; zero when balanced.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn to_global(&self, p: Point) -> Point {
        let rotated = rotate_point(p, Point::default(), self.transform.angle.to_degrees());
        Point::new(self.transform.origin.x + rotated.x, self.transform.origin.y + rotated.y)
    }

    /// Global centers of every filled square of side `size`.
    pub fn filled_squares(&self, size: f64) -> Vec<Point> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::FillRect { rect, global_center }
                    if (rect.width - size).abs() < 1e-9 && (rect.height - size).abs() < 1e-9 =>
                {
                    Some(*global_center)
                }
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }
}

impl TextMeasurer for RecordingSurface {
    fn measure_text(&self, text: &str, font: &Font<'_>) -> f64 {
        ApproxMeasurer.measure_text(text, font)
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn begin_frame(&mut self) {
        self.ops.push(Op::BeginFrame);
    }

    fn end_frame(&mut self) {
        self.ops.push(Op::EndFrame);
    }

    fn save(&mut self) {
        self.stack.push(self.transform);
        self.ops.push(Op::Save);
    }

    fn restore(&mut self) {
        if let Some(t) = self.stack.pop() {
            self.transform = t;
        }
        self.ops.push(Op::Restore);
    }

    fn translate(&mut self, x: f64, y: f64) -> SurfaceResult {
        self.transform.origin = self.to_global(Point::new(x, y));
        self.ops.push(Op::Translate(x, y));
        Ok(())
    }

    fn rotate(&mut self, radians: f64) -> SurfaceResult {
        self.transform.angle += radians;
        self.ops.push(Op::Rotate(radians));
        Ok(())
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ops.push(Op::GlobalAlpha(alpha));
    }

    fn set_fill_color(&mut self, color: &str) {
        self.ops.push(Op::FillColor(color.to_owned()));
    }

    fn set_stroke_color(&mut self, color: &str) {
        self.ops.push(Op::StrokeColor(color.to_owned()));
    }

    fn set_line_width(&mut self, width: f64) {
        self.ops.push(Op::LineWidth(width));
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> SurfaceResult {
        self.ops.push(Op::LineDash(segments.to_vec()));
        Ok(())
    }

    fn set_round_caps(&mut self, _round: bool) {}

    fn set_filter(&mut self, filter: &str) {
        self.ops.push(Op::Filter(filter.to_owned()));
    }

    fn fill_rect(&mut self, rect: Rect) {
        let global_center = self.to_global(rect.center());
        self.ops.push(Op::FillRect { rect, global_center });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.ops.push(Op::StrokeRect(rect));
    }

    fn fill_linear_gradient(&mut self, rect: Rect, _from: Point, _to: Point, stops: &[(f32, &str)]) -> SurfaceResult {
        let stops = stops.iter().map(|(o, c)| (*o, (*c).to_owned())).collect();
        self.ops.push(Op::Gradient { rect, stops });
        Ok(())
    }

    fn begin_path(&mut self) {
        self.ops.push(Op::BeginPath);
    }

    fn move_to(&mut self, p: Point) {
        self.ops.push(Op::MoveTo(p));
    }

    fn line_to(&mut self, p: Point) {
        self.ops.push(Op::LineTo(p));
    }

    fn quadratic_curve_to(&mut self, control: Point, end: Point) {
        self.ops.push(Op::QuadTo(control, end));
    }

    fn circle(&mut self, center: Point, radius: f64) -> SurfaceResult {
        self.ops.push(Op::Circle(center, radius));
        Ok(())
    }

    fn close_path(&mut self) {
        self.ops.push(Op::ClosePath);
    }

    fn fill(&mut self) {
        self.ops.push(Op::Fill);
    }

    fn stroke(&mut self) {
        self.ops.push(Op::Stroke);
    }

    fn set_font(&mut self, font: &Font<'_>) {
        self.ops.push(Op::Font(font.css()));
    }

    fn set_text_align(&mut self, _align: TextAlign) {}

    fn set_text_baseline(&mut self, _baseline: TextBaseline) {}

    fn fill_text(&mut self, text: &str, _x: f64, _y: f64) -> SurfaceResult {
        self.ops.push(Op::FillText(text.to_owned()));
        Ok(())
    }

    fn stroke_text(&mut self, text: &str, _x: f64, _y: f64) -> SurfaceResult {
        self.ops.push(Op::StrokeText(text.to_owned()));
        Ok(())
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, src: Rect, dst: Rect) -> SurfaceResult {
        self.ops.push(Op::DrawBitmap { id: bitmap.id(), src, dst });
        Ok(())
    }
}
