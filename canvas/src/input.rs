//! Input model: modifier keys, mouse buttons, cursor hints and the gesture
//! state machine.
//!
//! `InputState` is the gesture being tracked between pointer-down and
//! pointer-up. Each active variant carries what the gesture needs to compute
//! the element's state from the pointer position alone, so a move never
//! accumulates rounding from earlier moves.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::element::{CropHandle, CropOrigin, Element, ElementId, HandleKind};
use crate::geom::Point;
use crate::hit::HitPart;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger touch).
    Primary,
    Middle,
    Secondary,
}

impl Button {
    /// Map a DOM `MouseEvent.button` code.
    #[must_use]
    pub fn from_dom(code: i16) -> Self {
        match code {
            1 => Self::Middle,
            2 => Self::Secondary,
            _ => Self::Primary,
        }
    }
}

/// A keyboard key as reported by the browser (e.g. `"Delete"`, `"Tab"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Cursor hint for the host to apply to the canvas element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Move,
    Grab,
    /// Diagonal resize, top-left to bottom-right.
    NwseResize,
    /// Diagonal resize, top-right to bottom-left.
    NeswResize,
    NsResize,
    EwResize,
    Crosshair,
}

impl Cursor {
    /// CSS `cursor` value.
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Move => "move",
            Self::Grab => "grab",
            Self::NwseResize => "nwse-resize",
            Self::NeswResize => "nesw-resize",
            Self::NsResize => "ns-resize",
            Self::EwResize => "ew-resize",
            Self::Crosshair => "crosshair",
        }
    }

    /// Cursor for whatever is under the pointer.
    #[must_use]
    pub fn for_hit(part: Option<HitPart>) -> Self {
        match part {
            None => Self::Default,
            Some(HitPart::Body) => Self::Move,
            Some(HitPart::Handle(handle)) => match handle {
                HandleKind::Nw | HandleKind::Se => Self::NwseResize,
                HandleKind::Ne | HandleKind::Sw => Self::NeswResize,
                HandleKind::Rotate => Self::Grab,
                HandleKind::Start | HandleKind::End | HandleKind::Control => Self::Crosshair,
            },
            Some(HitPart::Crop(handle)) => match handle {
                CropHandle::N | CropHandle::S => Self::NsResize,
                CropHandle::E | CropHandle::W => Self::EwResize,
                CropHandle::Nw | CropHandle::Se => Self::NwseResize,
                CropHandle::Ne | CropHandle::Sw => Self::NeswResize,
                CropHandle::Move => Self::Move,
            },
        }
    }
}

/// Internal state for the gesture state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Moving an element across the canvas.
    Dragging {
        id: ElementId,
        /// Pointer position minus the element anchor at pointer-down.
        offset: Point,
    },
    /// Dragging a resize or arrow handle.
    Resizing {
        id: ElementId,
        handle: HandleKind,
        /// Pointer position at pointer-down.
        start: Point,
        /// The element as it was at pointer-down.
        origin: Box<Element>,
    },
    /// Dragging the rotate handle.
    Rotating {
        id: ElementId,
        /// Rotation pivot in canvas coordinates.
        center: Point,
        start: Point,
        orig_rotation: f64,
    },
    /// Dragging a crop handle or panning the crop window.
    Cropping {
        id: ElementId,
        handle: CropHandle,
        start: Point,
        origin: CropOrigin,
    },
}

impl InputState {
    /// Element the active gesture acts on.
    #[must_use]
    pub fn target(&self) -> Option<ElementId> {
        match self {
            Self::Idle => None,
            Self::Dragging { id, .. }
            | Self::Resizing { id, .. }
            | Self::Rotating { id, .. }
            | Self::Cropping { id, .. } => Some(*id),
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Short gesture name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dragging { .. } => "drag",
            Self::Resizing { .. } => "resize",
            Self::Rotating { .. } => "rotate",
            Self::Cropping { .. } => "crop",
        }
    }
}
