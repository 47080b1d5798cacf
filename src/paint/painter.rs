use crate::core::geom::{Point, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedGlyph {
    pub id: u32,
    /// Offset from the run origin, already in visual order.
    pub x: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaintCmd {
    /// A run of glyphs; `origin` is the left end of the baseline.
    Glyphs {
        origin: Point,
        glyphs: Vec<PlacedGlyph>,
        size: i32,
        color: u32,
        underline: bool,
    },
    FillRect { rect: Rect, color: u32 },
    Frame { rect: Rect, color: u32 },
    /// Extent of content that has not been built yet.
    Placeholder { rect: Rect },
}

#[derive(Debug, Default)]
pub struct Painter {
    cmds: Vec<PaintCmd>,
}

impl Painter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    pub fn cmds(&self) -> &[PaintCmd] {
        &self.cmds
    }

    pub fn into_cmds(self) -> Vec<PaintCmd> {
        self.cmds
    }

    pub fn push(&mut self, cmd: PaintCmd) {
        self.cmds.push(cmd);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: u32) {
        self.cmds.push(PaintCmd::FillRect { rect, color });
    }

    pub fn frame(&mut self, rect: Rect, color: u32) {
        self.cmds.push(PaintCmd::Frame { rect, color });
    }

    pub fn placeholder(&mut self, rect: Rect) {
        self.cmds.push(PaintCmd::Placeholder { rect });
    }

    pub fn glyph_count(&self) -> usize {
        self.cmds
            .iter()
            .map(|cmd| match cmd {
                PaintCmd::Glyphs { glyphs, .. } => glyphs.len(),
                _ => 0,
            })
            .sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/paint/painter.rs"]
mod tests;
