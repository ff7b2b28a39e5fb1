//! Rendering: composites the full scene onto a drawing surface.
//!
//! Every frame is drawn from scratch: background first, then each element in
//! ascending layer order. Rendering is not a pure read. Each selected element
//! refreshes its cached handle positions, and image outline rings are rebuilt
//! when their inputs change.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::doc::Scene;
use crate::surface::{Surface, SurfaceResult};

/// Draw the full scene.
///
/// With `chrome` off, selection outlines and handles are left out, as for
/// raster export. Handle caches are refreshed either way.
///
/// # Errors
///
/// Returns the first surface failure; the frame is still closed.
pub fn draw(surface: &mut dyn Surface, scene: &mut Scene, chrome: bool) -> SurfaceResult {
    surface.begin_frame();
    let result = draw_layers(surface, scene, chrome);
    surface.end_frame();
    result
}

fn draw_layers(surface: &mut dyn Surface, scene: &mut Scene, chrome: bool) -> SurfaceResult {
    scene.background.render(surface)?;
    let order = scene.paint_order();
    let elements = scene.elements_mut();
    for index in order {
        elements[index].render(surface, chrome)?;
    }
    Ok(())
}
