//! Display list generation.

use super::{BoxId, BoxKind, BoxTree};
use crate::core::geom::{Point, Rect};
use crate::paint::Painter;

const CELL_FRAME_COLOR: u32 = 0x808080;

impl BoxTree {
    /// Records every box intersecting `clip` (root coordinates).
    pub fn paint(&self, painter: &mut Painter, clip: Rect) {
        let root = self.root();
        let origin = self.get(root).map_or(Point::ZERO, |n| n.origin);
        self.paint_box(painter, root, origin, clip);
    }

    fn paint_box(&self, painter: &mut Painter, id: BoxId, origin: Point, clip: Rect) {
        let Some(node) = self.get(id) else {
            return;
        };
        let rect = Rect::from_origin_size(origin, node.size);
        if !rect.intersects(clip) {
            return;
        }
        match &node.kind {
            BoxKind::Paragraph(p) => {
                for line in &p.lines {
                    let baseline = origin.y + line.y + line.ascent;
                    let line_rect = Rect::new(origin.x, origin.y + line.y, node.size.width, line.height);
                    if !line_rect.intersects(clip) {
                        continue;
                    }
                    for f in &line.fragments {
                        let Some(child) = self.get(f.source) else {
                            continue;
                        };
                        match &child.kind {
                            BoxKind::String(s) | BoxKind::BrokenString(s) => {
                                if let Some(seg) = &s.segment {
                                    seg.draw(
                                        painter,
                                        Point::new(origin.x + f.x, baseline),
                                        f.range.clone(),
                                        f.rtl,
                                        &s.props,
                                    );
                                }
                            }
                            _ => self.paint_box(painter, f.source, origin + child.origin, clip),
                        }
                    }
                }
            }
            BoxKind::String(s) | BoxKind::BrokenString(s) => {
                if let Some(seg) = &s.segment {
                    seg.draw(
                        painter,
                        Point::new(origin.x, origin.y + seg.ascent()),
                        0..s.text.len(),
                        false,
                        &s.props,
                    );
                }
            }
            BoxKind::Lazy(_) => painter.placeholder(rect),
            BoxKind::TableCell(cell) => {
                painter.frame(rect, CELL_FRAME_COLOR);
                for &child in &cell.children {
                    if let Some(c) = self.get(child) {
                        self.paint_box(painter, child, origin + c.origin, clip);
                    }
                }
            }
            kind => {
                for &child in kind.children() {
                    if let Some(c) = self.get(child) {
                        self.paint_box(painter, child, origin + c.origin, clip);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/boxes/paint.rs"]
mod tests;
