#![allow(clippy::float_cmp)]

use ::image::RgbaImage;

use super::*;
use crate::surface::{ApproxMeasurer, Bitmap};
use crate::test_support::RecordingSurface;

const EPS: f64 = 1e-6;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

fn close_pt(a: Point, b: Point) -> bool {
    close(a.x, b.x) && close(a.y, b.y)
}

fn text_at(x: f64, y: f64) -> Element {
    Element::new(Point::new(x, y), ElementKind::Text(TextElement::default()))
}

fn shape_at(x: f64, y: f64) -> Element {
    Element::new(Point::new(x, y), ElementKind::Shape(ShapeElement::new(ShapeType::Rectangle)))
}

fn image_at(x: f64, y: f64, w: u32, h: u32) -> Element {
    let bitmap = Bitmap::new(RgbaImage::new(w, h));
    Element::new(Point::new(x, y), ElementKind::Image(ImageElement::new(bitmap)))
}

fn arrow(start: Point, end: Point) -> Element {
    let mut el = Element::new(start, ElementKind::Arrow(ArrowElement::new(start)));
    let patch = ElementPatch { x2: Some(end.x), y2: Some(end.y), ..ElementPatch::default() };
    el.apply_patch(&patch).unwrap();
    el
}

fn curved(start: Point, end: Point) -> Element {
    let mut el = arrow(start, end);
    el.apply_patch(&ElementPatch { arrow_type: Some(ArrowType::Curved), ..ElementPatch::default() }).unwrap();
    el
}

fn render_selected(el: &mut Element) -> RecordingSurface {
    let mut surface = RecordingSurface::new(1280.0, 720.0);
    el.selected = true;
    el.render(&mut surface, true).unwrap();
    surface
}

// =============================================================
// Centers and bounds
// =============================================================

#[test]
fn text_center_follows_alignment() {
    let m = ApproxMeasurer;
    let mut el = text_at(100.0, 100.0);
    let w = el.local_bounds(&m).width;
    assert!(close_pt(el.center(&m), Point::new(100.0 + w / 2.0, 124.0)));

    el.apply_patch(&ElementPatch { align: Some(TextAlign::Center), ..ElementPatch::default() }).unwrap();
    assert!(close_pt(el.center(&m), Point::new(100.0, 124.0)));

    el.apply_patch(&ElementPatch { align: Some(TextAlign::Right), ..ElementPatch::default() }).unwrap();
    assert!(close_pt(el.center(&m), Point::new(100.0 - w / 2.0, 124.0)));
}

#[test]
fn box_and_arrow_centers() {
    let m = ApproxMeasurer;
    assert_eq!(shape_at(10.0, 10.0).center(&m), Point::new(60.0, 60.0));
    assert_eq!(image_at(0.0, 0.0, 200, 100).center(&m), Point::new(100.0, 50.0));
    assert_eq!(arrow(Point::new(0.0, 0.0), Point::new(100.0, 40.0)).center(&m), Point::new(50.0, 20.0));
}

#[test]
fn rotated_bounds_grow() {
    let m = ApproxMeasurer;
    let mut el = shape_at(0.0, 0.0);
    el.set_rotation(45.0);
    let b = el.bounds(&m);
    let diag = 100.0 * std::f64::consts::SQRT_2;
    assert!(close(b.width, diag));
    assert!(close(b.center().x, 50.0));
}

// =============================================================
// Body hit tests
// =============================================================

#[test]
fn text_hit_test_respects_rotation() {
    let m = ApproxMeasurer;
    let mut el = text_at(100.0, 100.0);
    assert!(el.contains(Point::new(100.0, 100.0), &m));
    assert!(!el.contains(Point::new(-10.0, -10.0), &m));

    // A point just right of the unrotated box is outside until rotated onto it.
    let c = el.center(&m);
    let w = el.local_bounds(&m).width;
    let below = Point::new(c.x, c.y + w / 2.0 - 2.0);
    assert!(!el.contains(below, &m));
    el.set_rotation(90.0);
    assert!(el.contains(below, &m));
}

#[test]
fn circle_hit_test_is_circular() {
    let m = ApproxMeasurer;
    let mut el = shape_at(0.0, 0.0);
    el.apply_patch(&ElementPatch { shape_type: Some(ShapeType::Circle), ..ElementPatch::default() }).unwrap();
    assert!(el.contains(Point::new(50.0, 50.0), &m));
    assert!(el.contains(Point::new(50.0, 1.0), &m));
    assert!(!el.contains(Point::new(3.0, 3.0), &m));
}

#[test]
fn triangle_hits_on_bounding_box() {
    let m = ApproxMeasurer;
    let mut el = shape_at(0.0, 0.0);
    el.apply_patch(&ElementPatch { shape_type: Some(ShapeType::Triangle), ..ElementPatch::default() }).unwrap();
    assert!(el.contains(Point::new(2.0, 2.0), &m));
}

#[test]
fn straight_arrow_tolerance() {
    let m = ApproxMeasurer;
    let mut el = arrow(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    el.apply_patch(&ElementPatch { stroke_width: Some(3.0), ..ElementPatch::default() }).unwrap();
    assert!(el.contains(Point::new(50.0, 9.0), &m));
    assert!(!el.contains(Point::new(50.0, 11.0), &m));

    el.apply_patch(&ElementPatch { stroke_width: Some(12.0), ..ElementPatch::default() }).unwrap();
    assert!(el.contains(Point::new(50.0, 16.0), &m));
}

#[test]
fn curved_arrow_hits_along_curve_not_chord() {
    let m = ApproxMeasurer;
    let el = curved(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    let a = el.as_arrow().unwrap();
    assert!(close_pt(a.control_point(el.anchor()), Point::new(50.0, 30.0)));
    // Curve apex sits at half the control offset.
    assert!(el.contains(Point::new(50.0, 15.0), &m));
    assert!(!el.contains(Point::new(50.0, -12.0), &m));
}

// =============================================================
// Handles
// =============================================================

#[test]
fn unselected_elements_have_no_handles() {
    let mut el = shape_at(0.0, 0.0);
    let mut surface = RecordingSurface::new(100.0, 100.0);
    el.render(&mut surface, true).unwrap();
    assert!(el.handles().is_empty());
    assert_eq!(el.handle_at(Point::new(-5.0, -5.0)), None);
}

#[test]
fn handles_are_clickable_where_drawn_at_any_rotation() {
    let variants: Vec<Element> = vec![
        text_at(300.0, 200.0),
        image_at(300.0, 200.0, 200, 120),
        shape_at(300.0, 200.0),
        curved(Point::new(300.0, 200.0), Point::new(420.0, 260.0)),
    ];
    for template in variants {
        for step in 0..24 {
            let mut el = template.clone();
            el.set_rotation(f64::from(step) * 15.0);
            let surface = render_selected(&mut el);
            assert!(!el.handles().is_empty());
            let drawn = surface.filled_squares(crate::consts::HANDLE_SIZE);
            for handle in el.handles() {
                assert_eq!(el.handle_at(handle.center), Some(handle.kind), "{} at {}°", el.type_name(), el.rotation);
                assert!(
                    drawn.iter().any(|p| close_pt(*p, handle.center)),
                    "{:?} of {} not drawn at its cached position",
                    handle.kind,
                    el.type_name()
                );
            }
            assert_eq!(surface.depth(), 0);
        }
    }
}

#[test]
fn box_handles_include_rotate_knob_above_top() {
    let mut el = shape_at(0.0, 0.0);
    render_selected(&mut el);
    let rotate = el.handles().iter().find(|h| h.kind == HandleKind::Rotate).unwrap();
    assert!(close_pt(rotate.center, Point::new(50.0, -25.0)));
    let nw = el.handles().iter().find(|h| h.kind == HandleKind::Nw).unwrap();
    assert!(close_pt(nw.center, Point::new(-5.0, -5.0)));
}

#[test]
fn arrow_handles_are_endpoints_and_control() {
    let mut straight = arrow(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    render_selected(&mut straight);
    let kinds: Vec<HandleKind> = straight.handles().iter().map(|h| h.kind).collect();
    assert_eq!(kinds, vec![HandleKind::Start, HandleKind::End]);

    let mut bent = curved(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    render_selected(&mut bent);
    assert_eq!(bent.handle_at(Point::new(50.0, 30.0)), Some(HandleKind::Control));
}

#[test]
fn crop_mode_swaps_handles_for_crop_handles() {
    let mut el = image_at(0.0, 0.0, 200, 100);
    el.as_image_mut().unwrap().crop_mode = true;
    render_selected(&mut el);
    assert!(el.handles().is_empty());
    assert_eq!(el.crop_handle_at(Point::new(200.0, 50.0)), Some(CropHandle::E));
    assert_eq!(el.crop_handle_at(Point::new(100.0, 50.0)), Some(CropHandle::Move));
    assert_eq!(el.crop_handle_at(Point::new(300.0, 50.0)), None);

    // Rotated images keep the normal chrome.
    el.set_rotation(10.0);
    render_selected(&mut el);
    assert!(!el.crop_active());
    assert!(!el.handles().is_empty());
    assert_eq!(el.crop_handle_at(Point::new(100.0, 50.0)), None);
}

#[test]
fn export_render_skips_chrome_but_keeps_cache() {
    let mut el = shape_at(0.0, 0.0);
    el.selected = true;
    let mut surface = RecordingSurface::new(200.0, 200.0);
    el.render(&mut surface, false).unwrap();
    assert!(surface.filled_squares(crate::consts::HANDLE_SIZE).is_empty());
    assert_eq!(el.handles().len(), 5);
}

// =============================================================
// Updates
// =============================================================

#[test]
fn rotation_is_normalized() {
    let mut el = shape_at(0.0, 0.0);
    el.apply_patch(&ElementPatch { rotation: Some(725.0), ..ElementPatch::default() }).unwrap();
    assert!(close(el.rotation, 5.0));
    el.apply_patch(&ElementPatch { rotation: Some(-90.0), ..ElementPatch::default() }).unwrap();
    assert!(close(el.rotation, 270.0));
}

#[test]
fn invalid_patch_mutates_nothing() {
    let mut el = text_at(100.0, 100.0);
    let before = el.clone();
    let patch = ElementPatch {
        text: Some("changed".into()),
        x: Some(5.0),
        size: Some(-3.0),
        ..ElementPatch::default()
    };
    assert!(matches!(el.apply_patch(&patch), Err(EditorError::Validation(_))));
    assert_eq!(el, before);

    let nan = ElementPatch { y: Some(f64::NAN), ..ElementPatch::default() };
    assert!(el.apply_patch(&nan).is_err());
    assert_eq!(el, before);
}

#[test]
fn fields_of_other_variants_are_ignored() {
    let mut el = shape_at(0.0, 0.0);
    el.apply_patch(&ElementPatch { text: Some("x".into()), x2: Some(9.0), ..ElementPatch::default() }).unwrap();
    assert_eq!(el.as_shape().unwrap(), &ShapeElement::new(ShapeType::Rectangle));
}

#[test]
fn shape_color_rederives_stroke_unless_given() {
    let mut el = shape_at(0.0, 0.0);
    el.apply_patch(&ElementPatch { color: Some("#ff0000".into()), ..ElementPatch::default() }).unwrap();
    assert_eq!(el.as_shape().unwrap().stroke_color, "#cc0000");

    el.apply_patch(&ElementPatch {
        color: Some("#00ff00".into()),
        stroke_color: Some("#123456".into()),
        ..ElementPatch::default()
    })
    .unwrap();
    assert_eq!(el.as_shape().unwrap().stroke_color, "#123456");
}

#[test]
fn arrow_patch_refreshes_bounds() {
    let el = arrow(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    assert_eq!(el.as_arrow().unwrap().bounding_box, Rect::new(-15.0, -15.0, 130.0, 30.0));

    let bent = curved(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    // Control point (50, 30) plus the curve padding.
    assert_eq!(bent.as_arrow().unwrap().bounding_box, Rect::new(-25.0, -25.0, 150.0, 65.0));
}

#[test]
fn translate_moves_arrow_rigidly() {
    let mut el = arrow(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    el.move_to(Point::new(10.0, 20.0));
    let a = el.as_arrow().unwrap();
    assert_eq!((el.x, el.y, a.x2, a.y2), (10.0, 20.0, 110.0, 20.0));
    assert_eq!(a.bounding_box.x, -5.0);
}

#[test]
fn duplicate_gets_new_id_and_offset() {
    let mut el = arrow(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    el.selected = true;
    let copy = el.duplicate();
    assert_ne!(copy.id, el.id);
    assert!(!copy.selected);
    assert_eq!((copy.x, copy.y), (20.0, 20.0));
    assert_eq!(copy.as_arrow().unwrap().x2, 120.0);
    assert_eq!(copy.as_arrow().unwrap().color, el.as_arrow().unwrap().color);
}

#[test]
fn bake_rotation_keeps_arrow_endpoints_on_screen() {
    let mut el = arrow(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    el.set_rotation(90.0);
    el.bake_rotation();
    let a = el.as_arrow().unwrap();
    assert_eq!(el.rotation, 0.0);
    assert!(close_pt(el.anchor(), Point::new(50.0, -50.0)));
    assert!(close_pt(a.end(), Point::new(50.0, 50.0)));
}

// =============================================================
// Gestures
// =============================================================

#[test]
fn text_resize_grows_outward_and_clamps() {
    let m = ApproxMeasurer;
    let origin = text_at(0.0, 0.0);
    let mut el = origin.clone();
    let start = Point::new(100.0, 100.0);
    el.resize_from(&origin, HandleKind::Se, start, Point::new(150.0, 100.0), &m);
    assert_eq!(el.as_text().unwrap().size, 68.0);

    el.resize_from(&origin, HandleKind::Se, start, Point::new(-400.0, 100.0), &m);
    assert_eq!(el.as_text().unwrap().size, 12.0);
}

#[test]
fn box_resize_keeps_opposite_corner() {
    let m = ApproxMeasurer;
    let origin = shape_at(0.0, 0.0);
    let mut el = origin.clone();
    el.resize_from(&origin, HandleKind::Se, Point::new(105.0, 105.0), Point::new(125.0, 125.0), &m);
    let s = el.as_shape().unwrap();
    let expected = 100.0 * (1.0 + 800.0_f64.sqrt() / 200.0);
    assert!(close(s.width, expected));
    assert!(close(el.x, 0.0) && close(el.y, 0.0));

    el.resize_from(&origin, HandleKind::Nw, Point::new(0.0, 0.0), Point::new(40.0, 0.0), &m);
    let s = el.as_shape().unwrap();
    assert!(close(s.width, 80.0));
    assert!(close(el.x + s.width, 100.0) && close(el.y + s.height, 100.0));
}

#[test]
fn box_resize_keeps_opposite_corner_when_rotated() {
    let m = ApproxMeasurer;
    let mut origin = shape_at(0.0, 0.0);
    origin.set_rotation(90.0);
    let fixed_before = local_to_global(Point::new(-50.0, -50.0), origin.center(&m), 90.0);

    let mut el = origin.clone();
    // Se points toward (-1, 1) on screen after a quarter turn.
    el.resize_from(&origin, HandleKind::Se, Point::new(0.0, 100.0), Point::new(-20.0, 120.0), &m);
    let s = el.as_shape().unwrap();
    assert!(s.width > 100.0);
    let fixed_after = local_to_global(Point::new(-s.width / 2.0, -s.height / 2.0), el.center(&m), 90.0);
    assert!(close_pt(fixed_before, fixed_after));
}

#[test]
fn box_resize_clamps_to_minimum() {
    let m = ApproxMeasurer;
    let origin = shape_at(0.0, 0.0);
    let mut el = origin.clone();
    el.resize_from(&origin, HandleKind::Se, Point::new(100.0, 100.0), Point::new(-300.0, -300.0), &m);
    let s = el.as_shape().unwrap();
    assert_eq!((s.width, s.height), (20.0, 20.0));
}

#[test]
fn image_resize_keeps_aspect() {
    let m = ApproxMeasurer;
    let origin = image_at(0.0, 0.0, 200, 100);
    let mut el = origin.clone();
    el.resize_from(&origin, HandleKind::Se, Point::new(200.0, 100.0), Point::new(200.0, 50.0), &m);
    let i = el.as_image().unwrap();
    assert!(i.width < 200.0);
    assert!(close(i.width / i.height, 2.0));
}

#[test]
fn arrow_handles_relocate_endpoints_and_curvature() {
    let m = ApproxMeasurer;
    let origin = curved(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    let mut el = origin.clone();
    el.resize_from(&origin, HandleKind::End, Point::new(100.0, 0.0), Point::new(120.0, 10.0), &m);
    assert_eq!(el.as_arrow().unwrap().end(), Point::new(120.0, 10.0));

    let mut el = origin.clone();
    el.resize_from(&origin, HandleKind::Start, Point::new(0.0, 0.0), Point::new(-5.0, 5.0), &m);
    assert_eq!(el.anchor(), Point::new(-5.0, 5.0));

    let mut el = origin.clone();
    el.resize_from(&origin, HandleKind::Control, Point::new(50.0, 30.0), Point::new(50.0, -60.0), &m);
    assert!(close(el.as_arrow().unwrap().curvature, -0.6));
    el.resize_from(&origin, HandleKind::Control, Point::new(50.0, 30.0), Point::new(50.0, 500.0), &m);
    assert_eq!(el.as_arrow().unwrap().curvature, 1.0);
}

#[test]
fn rotation_drag_adds_swept_angle() {
    let center = Point::new(0.0, 0.0);
    let r = dragged_rotation(300.0, center, Point::new(10.0, 0.0), Point::new(0.0, 10.0));
    assert!(close(r, 30.0));
    let r = dragged_rotation(0.0, center, Point::new(10.0, 0.0), Point::new(0.0, -10.0));
    assert!(close(r, 270.0));
}

#[test]
fn crop_from_updates_display_and_aspect() {
    let mut el = image_at(0.0, 0.0, 200, 100);
    let origin = el.crop_origin().unwrap();
    el.crop_from(&origin, CropHandle::W, Point::new(50.0, 0.0));
    let i = el.as_image().unwrap();
    assert_eq!((el.x, i.width, i.crop_x, i.crop_width), (50.0, 150.0, 50.0, 150.0));
    assert!(close(i.aspect_ratio, 1.5));
}

// =============================================================
// Serialization
// =============================================================

#[test]
fn missing_rotation_and_layer_default_to_zero() {
    let raw = r##"{ "type": "text", "x": 100, "y": 100, "text": "Hi", "size": 48, "color": "#000000" }"##;
    let el: Element = serde_json::from_str(raw).unwrap();
    assert_eq!(el.rotation, 0.0);
    assert_eq!(el.layer, 0);
    assert_eq!(el.as_text().unwrap().font, "Arial");
}

#[test]
fn numeric_ids_are_replaced() {
    let raw = r##"{ "id": 1712345678901.42, "type": "shape", "x": 0, "y": 0, "shapeType": "circle",
        "width": 10, "height": 10, "color": "#ffffff", "opacity": 1, "strokeWidth": 2, "strokeColor": "#000000" }"##;
    let el: Element = serde_json::from_str(raw).unwrap();
    assert!(!el.id.is_nil());
    assert_eq!(el.as_shape().unwrap().shape_type, ShapeType::Circle);
}

#[test]
fn serialized_element_is_tagged_and_camel_cased() {
    let el = arrow(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    let value = serde_json::to_value(&el).unwrap();
    assert_eq!(value["type"], "arrow");
    assert_eq!(value["arrowType"], "straight");
    assert_eq!(value["arrowheadSize"], 15.0);
    assert!(value.get("selected").is_none());
}

#[test]
fn every_variant_round_trips() {
    let mut image = image_at(10.0, 20.0, 200, 100);
    image
        .apply_patch(&ElementPatch {
            crop_x: Some(20.0),
            crop_width: Some(100.0),
            rotation: Some(33.5),
            outline_width: Some(4.0),
            brightness: Some(120.0),
            ..ElementPatch::default()
        })
        .unwrap();
    let mut text = text_at(1.5, 2.25);
    text.apply_patch(&ElementPatch { rotation: Some(12.0), outline_width: Some(2.0), ..ElementPatch::default() })
        .unwrap();
    let originals = vec![text, image, shape_at(3.0, 4.0), curved(Point::new(0.0, 0.0), Point::new(77.7, 12.3))];
    for original in originals {
        let json = serde_json::to_string(&original).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original, "{json}");
    }
}
