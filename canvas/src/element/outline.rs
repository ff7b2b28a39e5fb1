//! Outline ring around an image's opaque pixels.
//!
//! The ring is built on the CPU in two steps: recolor the cropped and scaled
//! image into a solid silhouette that keeps the source alpha, then dilate it
//! by stamping the silhouette at every offset inside a disc of the outline
//! radius and erase the unshifted silhouette from the result. Dilation is
//! `O(radius²)` per opaque pixel, so the ring is cached and rebuilt only when
//! its inputs change.

#[cfg(test)]
#[path = "outline_test.rs"]
mod outline_test;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::color::Rgb;
use crate::geom::Rect;
use crate::surface::Bitmap;

/// Inputs that determine the ring's pixels.
#[derive(Debug, Clone, PartialEq)]
struct OutlineKey {
    source: u64,
    width: u32,
    height: u32,
    crop: [u64; 4],
    color: Rgb,
    radius: u32,
}

/// Cached outline ring for one image element.
#[derive(Debug, Clone, Default)]
pub struct OutlineCache {
    key: Option<OutlineKey>,
    ring: Option<Bitmap>,
    builds: u32,
}

impl OutlineCache {
    /// The ring for the given inputs, rebuilt only when they changed.
    ///
    /// Returns `None` when the outline is disabled, the color does not parse
    /// or the requested size is empty. The ring bitmap is `radius` pixels
    /// larger than the display size on every side.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn ring(
        &mut self,
        source: &Bitmap,
        crop: Rect,
        width: f64,
        height: f64,
        color: &str,
        radius: f64,
    ) -> Option<Bitmap> {
        let radius = radius.round();
        if !(radius >= 1.0) || !(width >= 1.0) || !(height >= 1.0) || source.width() == 0 || source.height() == 0 {
            return None;
        }
        let color = Rgb::parse(color)?;
        let key = OutlineKey {
            source: source.id(),
            width: width.round() as u32,
            height: height.round() as u32,
            crop: [crop.x.to_bits(), crop.y.to_bits(), crop.width.to_bits(), crop.height.to_bits()],
            color,
            radius: radius as u32,
        };
        if self.key.as_ref() == Some(&key) {
            return self.ring.clone();
        }
        let shape = silhouette(source.pixels(), crop, key.width, key.height, color);
        let ring = Bitmap::new(dilate_ring(&shape, key.radius));
        self.builds += 1;
        self.key = Some(key);
        self.ring = Some(ring.clone());
        Some(ring)
    }

    /// How many times the ring has been rebuilt.
    #[must_use]
    pub fn builds(&self) -> u32 {
        self.builds
    }
}

/// Crop `source`, scale it to `width × height` and recolor every pixel to
/// `color` keeping its alpha.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn silhouette(source: &RgbaImage, crop: Rect, width: u32, height: u32, color: Rgb) -> RgbaImage {
    let cx = (crop.x.max(0.0).floor() as u32).min(source.width().saturating_sub(1));
    let cy = (crop.y.max(0.0).floor() as u32).min(source.height().saturating_sub(1));
    let cw = (crop.width.round().max(1.0) as u32).min(source.width() - cx);
    let ch = (crop.height.round().max(1.0) as u32).min(source.height() - cy);
    let cropped = imageops::crop_imm(source, cx, cy, cw, ch).to_image();
    let mut scaled = imageops::resize(&cropped, width, height, FilterType::Triangle);
    for px in scaled.pixels_mut() {
        *px = Rgba([color.r, color.g, color.b, px.0[3]]);
    }
    scaled
}

/// Dilate `shape` by a disc of `radius` and remove the original footprint.
///
/// The result is `radius` pixels larger than `shape` on every side.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn dilate_ring(shape: &RgbaImage, radius: u32) -> RgbaImage {
    let (w, h) = shape.dimensions();
    let mut ring = RgbaImage::new(w + radius * 2, h + radius * 2);
    let r = radius as i64;
    let disc: Vec<(i64, i64)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= r * r)
        .collect();

    let mut color = [0u8; 3];
    for (x, y, px) in shape.enumerate_pixels() {
        let alpha = px.0[3];
        if alpha == 0 {
            continue;
        }
        color = [px.0[0], px.0[1], px.0[2]];
        for (dx, dy) in &disc {
            // Offsets stay in range: the ring is padded by `radius`.
            let tx = (i64::from(x) + r + dx) as u32;
            let ty = (i64::from(y) + r + dy) as u32;
            let target = ring.get_pixel_mut(tx, ty);
            if alpha > target.0[3] {
                target.0[3] = alpha;
            }
        }
    }

    // Erase the unshifted silhouette (destination-out).
    for (x, y, px) in shape.enumerate_pixels() {
        let target = ring.get_pixel_mut(x + radius, y + radius);
        let keep = u16::from(255 - px.0[3]);
        target.0[3] = u8::try_from(u16::from(target.0[3]) * keep / 255).unwrap_or(u8::MAX);
    }
    for px in ring.pixels_mut() {
        if px.0[3] > 0 {
            px.0[0] = color[0];
            px.0[1] = color[1];
            px.0[2] = color[2];
        }
    }
    ring
}
