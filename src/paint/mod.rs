//! Display list and rendering backends.
//!
//! The box tree only records `PaintCmd`s; rasterization belongs to whatever
//! implements `Backend`.

pub mod painter;
pub mod record;

pub use painter::{PaintCmd, Painter, PlacedGlyph};
pub use record::RecordingBackend;

use crate::core::geom::Rect;

pub trait Backend {
    fn draw(&mut self, area: Rect, cmds: &[PaintCmd]);
}
