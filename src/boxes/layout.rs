//! 测量与排列
//!
//! `layout_box` 先测量子节点，再给它们分配原点。干净的盒子在相同宽度下直接
//! 返回缓存尺寸，增量重排因此只涉及脏盒子及其祖先链。

use rustc_hash::FxHashSet;

use super::{paragraph, table, BoxId, BoxKind, BoxTree, Flow};
use crate::core::error::LayoutError;
use crate::core::geom::{Point, Size};
use crate::settings::ViewSettings;
use crate::text::Segmenter;

enum Plan {
    Pile(Vec<BoxId>),
    Row(Vec<BoxId>),
    Paragraph,
    LoneString,
    Table,
    TableRow,
    Cell(Vec<BoxId>),
    Lazy(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Constraints {
    pub width: i32,
}

impl Constraints {
    pub fn width(width: i32) -> Self {
        Self { width }
    }
}

pub struct LayoutCx<'a> {
    pub segmenter: &'a mut Segmenter,
    pub settings: &'a ViewSettings,
}

impl<'a> LayoutCx<'a> {
    pub fn new(segmenter: &'a mut Segmenter, settings: &'a ViewSettings) -> Self {
        Self {
            segmenter,
            settings,
        }
    }
}

impl BoxTree {
    /// Lays out the subtree at `root`. The constraint is validated before
    /// anything is touched.
    pub fn layout(
        &mut self,
        cx: &mut LayoutCx<'_>,
        root: BoxId,
        constraints: Constraints,
    ) -> Result<Size, LayoutError> {
        let max = cx.settings.max_layout_width;
        if constraints.width < 0 || constraints.width > max {
            return Err(LayoutError::InvalidConstraint {
                width: constraints.width,
                max,
            });
        }
        let Some(node) = self.get(root) else {
            return Err(LayoutError::UnknownBox(root));
        };
        if !node.dirty && node.constraint == Some(constraints.width) {
            self.relayout_dirty(cx)?;
        } else {
            self.take_pending();
            self.layout_box(cx, root, constraints.width);
        }
        Ok(self.get(root).map_or(Size::ZERO, |n| n.size))
    }

    /// Re-lays out every container whose children changed, each at its
    /// previous width, then climbs the ancestor chain while sizes keep
    /// changing. Returns the boxes that were laid out again.
    pub fn relayout_dirty(&mut self, cx: &mut LayoutCx<'_>) -> Result<Vec<BoxId>, LayoutError> {
        let mut work: Vec<BoxId> = self
            .take_pending()
            .into_iter()
            .filter(|id| self.contains(*id))
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        work.sort_by_key(|id| std::cmp::Reverse(self.depth(*id)));

        let mut relaid = Vec::new();
        for id in work {
            let Some(node) = self.get(id) else {
                continue;
            };
            // Never laid out: the next full layout reaches it.
            let Some(width) = node.constraint else {
                continue;
            };
            let before = node.size;
            self.force_dirty(id);
            let after = self.layout_box(cx, id, width);
            relaid.push(id);

            let mut changed = after != before;
            let mut child = id;
            while changed {
                let Some(parent) = self.parent(child) else {
                    break;
                };
                let Some(width) = self.get(parent).and_then(|n| n.constraint) else {
                    break;
                };
                let before = self.get(parent).map_or(Size::ZERO, |n| n.size);
                self.force_dirty(parent);
                let after = self.layout_box(cx, parent, width);
                relaid.push(parent);
                changed = after != before;
                child = parent;
            }
        }
        if !relaid.is_empty() {
            tracing::debug!(boxes = relaid.len(), "incremental relayout");
        }
        Ok(relaid)
    }

    fn force_dirty(&mut self, id: BoxId) {
        if let Some(node) = self.get_mut(id) {
            node.dirty = true;
        }
    }

    pub(crate) fn layout_box(&mut self, cx: &mut LayoutCx<'_>, id: BoxId, width: i32) -> Size {
        let Some(node) = self.get(id) else {
            return Size::ZERO;
        };
        if !node.dirty && node.constraint == Some(width) {
            if let BoxKind::TableCell(cell) = &node.kind {
                return Size::new(node.size.width, cell.content_height);
            }
            return node.size;
        }

        let plan = match &node.kind {
            BoxKind::Group(group) => match group.flow {
                Flow::Pile => Plan::Pile(group.children.clone()),
                Flow::Row => Plan::Row(group.children.clone()),
            },
            BoxKind::Paragraph(_) => Plan::Paragraph,
            BoxKind::String(_) | BoxKind::BrokenString(_) => Plan::LoneString,
            BoxKind::Table(_) => Plan::Table,
            BoxKind::TableRow(_) => Plan::TableRow,
            BoxKind::TableCell(cell) => Plan::Cell(cell.children.clone()),
            BoxKind::Lazy(lazy) => Plan::Lazy(lazy.estimated_height),
        };

        let size = match plan {
            Plan::Pile(children) => self.layout_pile(cx, &children, width),
            Plan::Row(children) => self.layout_row(cx, &children, width),
            Plan::Paragraph => paragraph::layout_paragraph(self, cx, id, width),
            Plan::LoneString => paragraph::layout_lone_string(self, cx, id),
            Plan::Table => table::layout_table(self, cx, id, width),
            Plan::TableRow => table::layout_row_in_table(self, cx, id, width),
            Plan::Cell(children) => {
                let size = self.layout_pile(cx, &children, width);
                if let Some(BoxKind::TableCell(cell)) = self.get_mut(id).map(|n| &mut n.kind) {
                    cell.content_height = size.height;
                }
                size
            }
            Plan::Lazy(estimated_height) => Size::new(width, estimated_height.max(0)),
        };

        if let Some(node) = self.get_mut(id) {
            node.size = size;
            node.constraint = Some(width);
            node.dirty = false;
        }
        size
    }

    pub(crate) fn layout_pile(
        &mut self,
        cx: &mut LayoutCx<'_>,
        children: &[BoxId],
        width: i32,
    ) -> Size {
        let mut y = 0i32;
        for &child in children {
            let size = self.layout_box(cx, child, width);
            self.set_origin(child, Point::new(0, y));
            y = y.saturating_add(size.height);
        }
        Size::new(width, y)
    }

    fn layout_row(&mut self, cx: &mut LayoutCx<'_>, children: &[BoxId], width: i32) -> Size {
        let mut x = 0i32;
        let mut height = 0i32;
        for &child in children {
            let remaining = (width - x).max(0);
            let size = self.layout_box(cx, child, remaining);
            self.set_origin(child, Point::new(x, 0));
            x = x.saturating_add(size.width);
            height = height.max(size.height);
        }
        Size::new(x, height)
    }

    pub(crate) fn set_origin(&mut self, id: BoxId, origin: Point) {
        if let Some(node) = self.get_mut(id) {
            node.origin = origin;
        }
    }

    pub(crate) fn set_size(&mut self, id: BoxId, size: Size) {
        if let Some(node) = self.get_mut(id) {
            node.size = size;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/boxes/layout.rs"]
mod tests;
