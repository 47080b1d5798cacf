//! Headless backend for tests and the dump binary.

use crate::core::geom::{Point, Rect};
use crate::paint::{Backend, PaintCmd};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawnGlyph {
    pub id: u32,
    pub pos: Point,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    frames: usize,
    glyphs: Vec<DrawnGlyph>,
    rects: Vec<Rect>,
    placeholders: Vec<Rect>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Glyphs of the last frame, sorted top to bottom then left to right.
    pub fn glyphs(&self) -> &[DrawnGlyph] {
        &self.glyphs
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn placeholders(&self) -> &[Rect] {
        &self.placeholders
    }

    pub fn glyph_ids(&self) -> Vec<u32> {
        self.glyphs.iter().map(|g| g.id).collect()
    }
}

impl Backend for RecordingBackend {
    fn draw(&mut self, area: Rect, cmds: &[PaintCmd]) {
        self.frames += 1;
        self.glyphs.clear();
        self.rects.clear();
        self.placeholders.clear();
        for cmd in cmds {
            match cmd {
                PaintCmd::Glyphs { origin, glyphs, .. } => {
                    for g in glyphs {
                        let pos = Point::new(origin.x + g.x, origin.y);
                        if !area.contains(pos) {
                            continue;
                        }
                        self.glyphs.push(DrawnGlyph { id: g.id, pos });
                    }
                }
                PaintCmd::FillRect { rect, .. } | PaintCmd::Frame { rect, .. } => {
                    let clip = rect.intersect(area);
                    if !clip.is_empty() {
                        self.rects.push(clip);
                    }
                }
                PaintCmd::Placeholder { rect } => {
                    let clip = rect.intersect(area);
                    if !clip.is_empty() {
                        self.placeholders.push(clip);
                    }
                }
            }
        }
        self.glyphs.sort_by_key(|g| (g.pos.y, g.pos.x));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/paint/record.rs"]
mod tests;
