#![allow(clippy::float_cmp)]

use image::RgbaImage;

use super::*;
use crate::test_support::{Op, RecordingSurface};

fn image(w: u32, h: u32) -> ImageElement {
    ImageElement::new(Bitmap::new(RgbaImage::new(w, h)))
}

fn origin_for(img: &ImageElement, anchor: Point) -> CropOrigin {
    let (scale_x, scale_y) = img.scale_factors();
    CropOrigin {
        display: Rect::new(anchor.x, anchor.y, img.width, img.height),
        crop: img.crop_rect(),
        scale_x,
        scale_y,
        source_width: img.original_width,
        source_height: img.original_height,
    }
}

fn within_source(crop: Rect, w: f64, h: f64) -> bool {
    crop.x >= 0.0 && crop.y >= 0.0 && crop.right() <= w + 1e-9 && crop.bottom() <= h + 1e-9 && crop.width > 0.0
}

#[test]
fn new_image_is_uncropped() {
    let img = image(400, 200);
    assert_eq!(img.crop_rect(), Rect::new(0.0, 0.0, 400.0, 200.0));
    assert_eq!(img.aspect_ratio, 2.0);
    assert!(img.maintain_aspect_ratio);
    assert_eq!(img.filter(), None);
}

#[test]
fn place_on_canvas_fits_and_centers() {
    let mut img = image(2000, 1000);
    let anchor = img.place_on_canvas(Rect::new(0.0, 0.0, 1280.0, 720.0));
    assert_eq!(img.width, 1024.0);
    assert_eq!(img.height, 512.0);
    assert_eq!(anchor, Point::new(128.0, 104.0));

    let mut small = image(100, 50);
    let anchor = small.place_on_canvas(Rect::new(0.0, 0.0, 1280.0, 720.0));
    assert_eq!((small.width, small.height), (100.0, 50.0));
    assert_eq!(anchor, Point::new(590.0, 335.0));
}

#[test]
fn set_crop_area_clamps_and_updates_aspect() {
    let mut img = image(400, 200);
    img.set_crop_area(-10.0, 50.0, 1000.0, 100.0).unwrap();
    assert_eq!(img.crop_rect(), Rect::new(0.0, 50.0, 400.0, 100.0));
    assert_eq!(img.aspect_ratio, 4.0);
    assert_eq!(img.height, 100.0);
}

#[test]
fn set_crop_area_rejects_empty() {
    let mut img = image(400, 200);
    assert!(matches!(img.set_crop_area(0.0, 0.0, 0.0, 10.0), Err(EditorError::Validation(_))));
    assert_eq!(img.crop_rect(), Rect::new(0.0, 0.0, 400.0, 200.0));
}

#[test]
fn reset_crop_restores_source_aspect() {
    let mut img = image(400, 200);
    img.set_crop_area(10.0, 10.0, 50.0, 50.0).unwrap();
    img.reset_crop();
    assert_eq!(img.crop_rect(), Rect::new(0.0, 0.0, 400.0, 200.0));
    assert_eq!(img.aspect_ratio, 2.0);
}

#[test]
fn scale_and_fit() {
    let mut img = image(400, 200);
    img.scale(0.5);
    assert_eq!((img.width, img.height), (200.0, 100.0));
    img.fit_to_size(100.0, 100.0);
    assert_eq!((img.width, img.height), (100.0, 50.0));
}

#[test]
fn width_update_follows_aspect() {
    let mut img = image(400, 200);
    let patch = ElementPatch { width: Some(100.0), ..ElementPatch::default() };
    img.validate(&patch).unwrap();
    img.apply(&patch);
    assert_eq!(img.height, 50.0);

    let patch = ElementPatch { height: Some(100.0), ..ElementPatch::default() };
    img.apply(&patch);
    assert_eq!(img.width, 200.0);

    let free = ElementPatch { maintain_aspect_ratio: Some(false), width: Some(10.0), ..ElementPatch::default() };
    img.apply(&free);
    assert_eq!((img.width, img.height), (10.0, 100.0));
}

#[test]
fn crop_update_recomputes_aspect_from_crop() {
    let mut img = image(400, 200);
    let patch = ElementPatch { crop_width: Some(200.0), ..ElementPatch::default() };
    img.validate(&patch).unwrap();
    img.apply(&patch);
    assert_eq!(img.aspect_ratio, 1.0);
    assert_eq!(img.height, img.width);
}

#[test]
fn crop_update_outside_source_is_rejected() {
    let img = image(400, 200);
    let patch = ElementPatch { crop_x: Some(300.0), crop_width: Some(200.0), ..ElementPatch::default() };
    assert!(matches!(img.validate(&patch), Err(EditorError::Validation(_))));
    let patch = ElementPatch { crop_height: Some(0.0), ..ElementPatch::default() };
    assert!(img.validate(&patch).is_err());
}

#[test]
fn filter_string_lists_effects() {
    let mut img = image(10, 10);
    img.brightness = 120.0;
    assert_eq!(img.filter().unwrap(), "brightness(120%) contrast(100%) saturate(100%)");
}

#[test]
fn attach_bitmap_fills_missing_crop() {
    let mut img: ImageElement = serde_json::from_str(r#"{ "width": 50, "height": 25 }"#).unwrap();
    assert!(img.bitmap.is_none());
    img.attach_bitmap(Bitmap::new(RgbaImage::new(80, 40)));
    assert_eq!(img.crop_rect(), Rect::new(0.0, 0.0, 80.0, 40.0));
    assert_eq!(img.aspect_ratio, 2.0);
    assert_eq!(img.opacity, 1.0);
    assert_eq!(img.brightness, 100.0);
}

#[test]
fn attach_bitmap_clamps_stale_crop() {
    let mut img = image(400, 200);
    img.crop_x = 350.0;
    img.crop_width = 200.0;
    img.attach_bitmap(Bitmap::new(RgbaImage::new(400, 200)));
    assert!(within_source(img.crop_rect(), 400.0, 200.0));
}

#[test]
fn draw_applies_crop_opacity_and_filter() {
    let mut img = image(400, 200);
    img.set_crop_area(100.0, 0.0, 200.0, 200.0).unwrap();
    img.opacity = 0.5;
    img.contrast = 80.0;
    let mut surface = RecordingSurface::new(800.0, 600.0);
    img.draw(&mut surface).unwrap();
    assert!(surface.ops.contains(&Op::GlobalAlpha(0.5)));
    assert!(surface.ops.iter().any(|op| matches!(op, Op::Filter(f) if f.contains("contrast(80%)"))));
    assert!(surface.ops.iter().any(|op| matches!(
        op,
        Op::DrawBitmap { src, .. } if *src == Rect::new(100.0, 0.0, 200.0, 200.0)
    )));
    assert_eq!(surface.ops.last(), Some(&Op::Filter("none".into())));
}

#[test]
fn draw_with_outline_blits_ring_first() {
    let mut img = image(20, 10);
    img.outline_width = 3.0;
    let mut surface = RecordingSurface::new(100.0, 100.0);
    img.draw(&mut surface).unwrap();
    let blits: Vec<Rect> = surface
        .ops
        .iter()
        .filter_map(|op| match op {
            Op::DrawBitmap { dst, .. } => Some(*dst),
            _ => None,
        })
        .collect();
    assert_eq!(blits, vec![Rect::new(-13.0, -8.0, 26.0, 16.0), Rect::new(-10.0, -5.0, 20.0, 10.0)]);

    img.draw(&mut surface).unwrap();
    assert_eq!(img.outline.builds(), 1);
}

#[test]
fn crop_overlay_dims_hidden_regions() {
    let mut img = image(400, 200);
    img.set_crop_area(100.0, 50.0, 200.0, 100.0).unwrap();
    img.width = 200.0;
    img.height = 100.0;
    let mut surface = RecordingSurface::new(800.0, 600.0);
    img.draw_crop_overlay(&mut surface, Point::new(300.0, 300.0)).unwrap();
    // Four shaded bands plus eight handles.
    let shaded = surface.count(|op| matches!(op, Op::FillRect { rect, .. } if rect.width > 8.0));
    assert_eq!(shaded, 4);
    assert_eq!(surface.filled_squares(crate::consts::HANDLE_SIZE).len(), 8);
    assert!(surface.ops.contains(&Op::FillRect {
        rect: Rect::new(200.0, 250.0, 400.0, 50.0),
        global_center: Point::new(400.0, 275.0),
    }));
}

#[test]
fn crop_move_pans_window_without_moving_display() {
    let mut img = image(400, 200);
    img.set_crop_area(100.0, 50.0, 200.0, 100.0).unwrap();
    let origin = origin_for(&img, Point::new(10.0, 10.0));

    let update = crop_drag(&origin, CropHandle::Move, Point::new(40.0, 0.0));
    assert_eq!(update.display, origin.display);
    // Display is twice the crop size, so 40 display px is 20 source px.
    assert_eq!(update.crop.x, 80.0);

    let update = crop_drag(&origin, CropHandle::Move, Point::new(1000.0, -1000.0));
    assert_eq!((update.crop.x, update.crop.y), (0.0, 100.0));
}

#[test]
fn edge_handles_keep_opposite_edge_fixed() {
    let mut img = image(400, 200);
    img.set_crop_area(100.0, 50.0, 200.0, 100.0).unwrap();
    img.width = 400.0;
    img.height = 200.0;
    let origin = origin_for(&img, Point::new(0.0, 0.0));
    assert_eq!((origin.scale_x, origin.scale_y), (2.0, 2.0));

    let w = crop_drag(&origin, CropHandle::W, Point::new(-40.0, 0.0));
    assert_eq!(w.display.right(), origin.display.right());
    assert_eq!((w.crop.x, w.crop.width), (80.0, 220.0));
    assert_eq!(w.display.width / w.crop.width, 2.0);

    let n = crop_drag(&origin, CropHandle::N, Point::new(0.0, 20.0));
    assert_eq!(n.display.bottom(), origin.display.bottom());
    assert_eq!((n.crop.y, n.crop.height), (60.0, 90.0));

    let se = crop_drag(&origin, CropHandle::Se, Point::new(1000.0, 1000.0));
    assert_eq!((se.display.x, se.display.y), (0.0, 0.0));
    assert_eq!((se.crop.right(), se.crop.bottom()), (400.0, 200.0));
}

#[test]
fn crop_window_never_leaves_source_over_a_drag() {
    let mut img = image(300, 150);
    img.set_crop_area(50.0, 25.0, 100.0, 50.0).unwrap();
    let handles = [
        CropHandle::Move,
        CropHandle::N,
        CropHandle::S,
        CropHandle::E,
        CropHandle::W,
        CropHandle::Ne,
        CropHandle::Nw,
        CropHandle::Se,
        CropHandle::Sw,
    ];
    for handle in handles {
        let origin = origin_for(&img, Point::new(20.0, 20.0));
        for i in -40..=40 {
            let d = f64::from(i) * 17.0;
            let update = crop_drag(&origin, handle, Point::new(d, -d * 0.7));
            assert!(within_source(update.crop, 300.0, 150.0), "{handle:?} {d}: {:?}", update.crop);
            assert!(update.crop.height > 0.0);
            let scale = update.display.width / update.crop.width;
            assert!((scale - origin.scale_x).abs() < 1e-9);
        }
    }
}
