//! Scene and interaction engine for the thumbnail editor.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! editable scene of a fixed-size thumbnail canvas: translating raw DOM input
//! into element mutations, hit-testing elements and their handles, drawing the
//! background and elements, and saving projects to browser storage. The host
//! JavaScript layer wires DOM events and toolbar buttons to the engine and
//! reacts to the returned [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Scene: element store, selection, and z-order |
//! | [`element`] | Text, image, shape, and arrow elements with their handles |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`hit`] | Hit-testing against elements and handles |
//! | [`render`] | Scene rendering onto a [`surface::Surface`] |
//! | [`background`] | Background color and pattern painter |
//! | [`persist`] | Project document, image embedding, and storage |
//! | [`segment`] | Background-removal collaborator and mask cutout |
//! | [`surface`] | Drawing surface abstraction and the 2D canvas backend |
//! | [`viewport`] | Screen-to-canvas coordinate conversion |
//! | [`geom`] | Points, rects, rotation, and curve math |
//! | [`color`] | Hex color parsing and shading |
//! | [`config`] | Editor configuration |
//! | [`error`] | Error type shared by fallible operations |
//! | [`consts`] | Shared numeric constants (handle sizes, minimum sizes, etc.) |

pub mod background;
pub mod color;
pub mod config;
pub mod consts;
pub mod doc;
pub mod element;
pub mod engine;
pub mod error;
pub mod geom;
pub mod hit;
pub mod input;
pub mod persist;
pub mod render;
pub mod segment;
pub mod surface;
pub mod viewport;

#[cfg(test)]
mod test_support;
