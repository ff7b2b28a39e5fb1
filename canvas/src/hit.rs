//! Hit testing over the whole scene.
//!
//! Priority order, shared by pointer-down and hover:
//! 1. crop handles (or the crop window) of the selected image in crop mode;
//! 2. from the top layer down, the handles of the selected element, then
//!    each element's body.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::doc::Scene;
use crate::element::{CropHandle, ElementId, HandleKind};
use crate::geom::Point;
use crate::surface::TextMeasurer;

/// Which part of an element was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    /// Resize, rotate or arrow handle of the selected element.
    Handle(HandleKind),
    /// Crop handle, or `CropHandle::Move` inside the crop window.
    Crop(CropHandle),
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub id: ElementId,
    pub part: HitPart,
}

/// Find what is under `p`, or `None` for empty canvas.
///
/// Handle positions come from the most recent render.
#[must_use]
pub fn hit_test<M: TextMeasurer + ?Sized>(p: Point, scene: &Scene, measurer: &M) -> Option<Hit> {
    if let Some(selected) = scene.selected() {
        if let Some(handle) = selected.crop_handle_at(p) {
            return Some(Hit { id: selected.id, part: HitPart::Crop(handle) });
        }
    }

    scene.sorted_by_layer().into_iter().rev().find_map(|element| {
        if let Some(handle) = element.handle_at(p) {
            return Some(Hit { id: element.id, part: HitPart::Handle(handle) });
        }
        element.contains(p, measurer).then_some(Hit { id: element.id, part: HitPart::Body })
    })
}
