//! 盒子树
//!
//! 盒子存放在 slotmap 里，每个盒子记录父节点，容器持有有序的子节点列表。
//! 所有变体都是 `BoxKind` 的负载，布局、命中测试和绘制各自只需一次 match。

pub mod layout;
pub mod lazy;
pub mod paint;
pub mod paragraph;
pub mod table;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use std::fmt::Write as _;

use crate::core::error::{BuildError, ShapeError};
use crate::core::geom::{Point, Rect, Size};
use crate::text::{ParaProps, Segment, TextProps};

pub use hit_test::Hit;
pub use layout::{Constraints, LayoutCx};
pub use lazy::{LazyBox, LazyState, LazyToken};
pub use paragraph::{Fragment, LineBox};

new_key_type! { pub struct BoxId; }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Children stacked top to bottom at the full width.
    Pile,
    /// Children left to right.
    Row,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupBox {
    pub children: Vec<BoxId>,
    pub flow: Flow,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParagraphBox {
    pub children: Vec<BoxId>,
    pub props: ParaProps,
    pub lines: Vec<LineBox>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringBox {
    pub text: String,
    pub props: TextProps,
    /// Filled by layout; dropped only by replacing the box.
    pub segment: Option<Segment>,
    pub shape_error: Option<ShapeError>,
}

impl StringBox {
    pub fn new(text: String, props: TextProps) -> Self {
        Self {
            text,
            props,
            segment: None,
            shape_error: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnWidth {
    Fixed(i32),
    Percent(i32),
    Auto,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableBox {
    pub rows: Vec<BoxId>,
    pub columns: Vec<ColumnWidth>,
    /// Resolved by the last layout.
    pub col_widths: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRowBox {
    pub cells: Vec<BoxId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableCellBox {
    pub children: Vec<BoxId>,
    pub col_span: usize,
    /// Height before the row stretched the cell.
    pub content_height: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoxKind {
    Group(GroupBox),
    Paragraph(ParagraphBox),
    String(StringBox),
    /// Continuation of a run after a hard break; always starts a line.
    BrokenString(StringBox),
    Table(TableBox),
    TableRow(TableRowBox),
    TableCell(TableCellBox),
    Lazy(LazyBox),
}

impl BoxKind {
    pub fn pile() -> Self {
        BoxKind::Group(GroupBox {
            children: Vec::new(),
            flow: Flow::Pile,
        })
    }

    pub fn row() -> Self {
        BoxKind::Group(GroupBox {
            children: Vec::new(),
            flow: Flow::Row,
        })
    }

    pub fn paragraph(props: ParaProps) -> Self {
        BoxKind::Paragraph(ParagraphBox {
            children: Vec::new(),
            props,
            lines: Vec::new(),
        })
    }

    pub fn string(text: impl Into<String>, props: TextProps) -> Self {
        BoxKind::String(StringBox::new(text.into(), props))
    }

    pub fn broken_string(text: impl Into<String>, props: TextProps) -> Self {
        BoxKind::BrokenString(StringBox::new(text.into(), props))
    }

    pub fn table(columns: Vec<ColumnWidth>) -> Self {
        BoxKind::Table(TableBox {
            rows: Vec::new(),
            columns,
            col_widths: Vec::new(),
        })
    }

    pub fn table_row() -> Self {
        BoxKind::TableRow(TableRowBox { cells: Vec::new() })
    }

    pub fn table_cell(col_span: usize) -> Self {
        BoxKind::TableCell(TableCellBox {
            children: Vec::new(),
            col_span,
            content_height: 0,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            BoxKind::Group(g) => match g.flow {
                Flow::Pile => "pile",
                Flow::Row => "row",
            },
            BoxKind::Paragraph(_) => "paragraph",
            BoxKind::String(_) => "string",
            BoxKind::BrokenString(_) => "broken string",
            BoxKind::Table(_) => "table",
            BoxKind::TableRow(_) => "table row",
            BoxKind::TableCell(_) => "table cell",
            BoxKind::Lazy(_) => "lazy",
        }
    }

    pub fn children(&self) -> &[BoxId] {
        match self {
            BoxKind::Group(g) => &g.children,
            BoxKind::Paragraph(p) => &p.children,
            BoxKind::Table(t) => &t.rows,
            BoxKind::TableRow(r) => &r.cells,
            BoxKind::TableCell(c) => &c.children,
            BoxKind::String(_) | BoxKind::BrokenString(_) | BoxKind::Lazy(_) => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<BoxId>> {
        match self {
            BoxKind::Group(g) => Some(&mut g.children),
            BoxKind::Paragraph(p) => Some(&mut p.children),
            BoxKind::Table(t) => Some(&mut t.rows),
            BoxKind::TableRow(r) => Some(&mut r.cells),
            BoxKind::TableCell(c) => Some(&mut c.children),
            BoxKind::String(_) | BoxKind::BrokenString(_) | BoxKind::Lazy(_) => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, BoxKind::String(_) | BoxKind::BrokenString(_))
    }

    pub fn as_string(&self) -> Option<&StringBox> {
        match self {
            BoxKind::String(s) | BoxKind::BrokenString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_lazy(&self) -> Option<&LazyBox> {
        match self {
            BoxKind::Lazy(l) => Some(l),
            _ => None,
        }
    }

    fn accepts(&self, child: &BoxKind) -> bool {
        match self {
            BoxKind::Group(_) | BoxKind::TableCell(_) => {
                !matches!(child, BoxKind::TableRow(_) | BoxKind::TableCell(_))
            }
            BoxKind::Paragraph(_) => matches!(
                child,
                BoxKind::String(_) | BoxKind::BrokenString(_) | BoxKind::Group(_) | BoxKind::Table(_)
            ),
            BoxKind::Table(_) => matches!(child, BoxKind::TableRow(_)),
            BoxKind::TableRow(_) => matches!(child, BoxKind::TableCell(_)),
            BoxKind::String(_) | BoxKind::BrokenString(_) | BoxKind::Lazy(_) => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoxNode {
    pub parent: Option<BoxId>,
    pub kind: BoxKind,
    /// Relative to the parent's origin.
    pub origin: Point,
    pub size: Size,
    /// Width of the last layout; `None` until laid out.
    pub constraint: Option<i32>,
    pub dirty: bool,
}

impl BoxNode {
    fn new(parent: Option<BoxId>, kind: BoxKind) -> Self {
        Self {
            parent,
            kind,
            origin: Point::ZERO,
            size: Size::ZERO,
            constraint: None,
            dirty: true,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.origin, self.size)
    }
}

pub struct BoxTree {
    arena: SlotMap<BoxId, BoxNode>,
    root: BoxId,
    /// Containers whose child list changed since the last relayout.
    pending: Vec<BoxId>,
    /// Lazy boxes already replaced by their content.
    materialized: FxHashSet<BoxId>,
}

impl std::fmt::Debug for BoxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxTree")
            .field("root", &self.root)
            .field("len", &self.arena.len())
            .finish()
    }
}

impl Default for BoxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BoxTree {
    /// A tree holding only an empty pile.
    pub fn new() -> Self {
        let mut arena = SlotMap::with_key();
        let root = arena.insert(BoxNode::new(None, BoxKind::pile()));
        Self {
            arena,
            root,
            pending: Vec::new(),
            materialized: FxHashSet::default(),
        }
    }

    pub fn root(&self) -> BoxId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kind(self.root).map_or(true, |k| k.children().is_empty())
    }

    pub fn contains(&self, id: BoxId) -> bool {
        self.arena.contains_key(id)
    }

    pub fn get(&self, id: BoxId) -> Option<&BoxNode> {
        self.arena.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: BoxId) -> Option<&mut BoxNode> {
        self.arena.get_mut(id)
    }

    pub fn kind(&self, id: BoxId) -> Option<&BoxKind> {
        self.arena.get(id).map(|n| &n.kind)
    }

    pub fn parent(&self, id: BoxId) -> Option<BoxId> {
        self.arena.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: BoxId) -> &[BoxId] {
        self.arena.get(id).map_or(&[], |n| n.kind.children())
    }

    pub fn index_in_parent(&self, id: BoxId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoxId, &BoxNode)> {
        self.arena.iter()
    }

    /// Inserts a new box as child `index` of `parent`.
    pub fn insert(
        &mut self,
        parent: BoxId,
        index: usize,
        kind: BoxKind,
    ) -> Result<BoxId, BuildError> {
        let parent_node = self
            .arena
            .get(parent)
            .ok_or(BuildError::UnknownBox(parent))?;
        if !parent_node.kind.accepts(&kind) {
            return Err(BuildError::InvalidChild {
                container: parent_node.kind.name(),
                child: kind.name(),
            });
        }
        let id = self.arena.insert(BoxNode::new(Some(parent), kind));
        let node = &mut self.arena[parent];
        if let Some(children) = node.kind.children_mut() {
            let index = index.min(children.len());
            children.insert(index, id);
        }
        node.dirty = true;
        self.pending.push(parent);
        Ok(id)
    }

    /// Detaches `len` children of `parent` starting at `start` and frees
    /// their subtrees. Returns every freed id, detached roots first.
    pub fn remove_range(&mut self, parent: BoxId, start: usize, len: usize) -> Vec<BoxId> {
        let Some(node) = self.arena.get_mut(parent) else {
            return Vec::new();
        };
        let Some(children) = node.kind.children_mut() else {
            return Vec::new();
        };
        let start = start.min(children.len());
        let end = start.saturating_add(len).min(children.len());
        let detached: Vec<BoxId> = children.drain(start..end).collect();
        node.dirty = true;
        self.pending.push(parent);

        let mut removed = detached.clone();
        let mut stack: Vec<BoxId> = detached;
        while let Some(id) = stack.pop() {
            if let Some(n) = self.arena.remove(id) {
                for child in n.kind.children() {
                    removed.push(*child);
                    stack.push(*child);
                }
            }
        }
        removed
    }

    pub fn mark_dirty(&mut self, id: BoxId) {
        if let Some(node) = self.arena.get_mut(id) {
            node.dirty = true;
            self.pending.push(id);
        }
    }

    /// Forgets every shaped segment and dirties the whole tree, so the next
    /// layout shapes each run again. Returns how many runs were reset.
    pub fn discard_segments(&mut self) -> usize {
        let mut reset = 0;
        for (_, node) in self.arena.iter_mut() {
            node.dirty = true;
            if let BoxKind::String(s) | BoxKind::BrokenString(s) = &mut node.kind {
                s.segment = None;
                s.shape_error = None;
                reset += 1;
            }
        }
        reset
    }

    pub(crate) fn take_pending(&mut self) -> Vec<BoxId> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn depth(&self, id: BoxId) -> usize {
        let mut depth = 0;
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            depth += 1;
            cur = self.parent(p);
        }
        depth
    }

    /// Child indexes from the root down to `id`; empty for the root or for
    /// a box no longer attached.
    pub fn path(&self, id: BoxId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.parent(cur) {
            match self.children(parent).iter().position(|c| *c == cur) {
                Some(idx) => path.push(idx),
                None => return Vec::new(),
            }
            cur = parent;
        }
        path.reverse();
        path
    }

    pub fn is_reachable(&self, id: BoxId) -> bool {
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            match self.parent(cur) {
                Some(p) if self.children(p).contains(&cur) => cur = p,
                _ => return false,
            }
        }
    }

    /// True when `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: BoxId, id: BoxId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent(c);
        }
        false
    }

    pub fn abs_origin(&self, id: BoxId) -> Point {
        let mut origin = Point::ZERO;
        let mut cur = Some(id);
        while let Some(c) = cur {
            let Some(node) = self.arena.get(c) else {
                break;
            };
            origin = origin + node.origin;
            cur = node.parent;
        }
        origin
    }

    pub fn abs_rect(&self, id: BoxId) -> Rect {
        let size = self.arena.get(id).map_or(Size::ZERO, |n| n.size);
        Rect::from_origin_size(self.abs_origin(id), size)
    }

    /// Pre-order ids of `id` and everything below it.
    pub fn descendants(&self, id: BoxId) -> Vec<BoxId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if !self.arena.contains_key(cur) {
                continue;
            }
            out.push(cur);
            for child in self.children(cur).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Indented outline of the tree with positions and sizes.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for id in self.descendants(self.root) {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            let indent = "  ".repeat(self.depth(id));
            let _ = write!(
                out,
                "{}{} @({},{}) {}x{}",
                indent,
                node.kind.name(),
                node.origin.x,
                node.origin.y,
                node.size.width,
                node.size.height
            );
            match &node.kind {
                BoxKind::String(s) | BoxKind::BrokenString(s) => {
                    let _ = write!(out, " {:?}", s.text);
                }
                BoxKind::Paragraph(p) => {
                    let _ = write!(out, " lines={}", p.lines.len());
                }
                BoxKind::Lazy(l) => {
                    let _ = write!(
                        out,
                        " items={}..{} {:?}",
                        l.token.items.start, l.token.items.end, l.state
                    );
                }
                _ => {}
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/boxes/tree.rs"]
mod tests;
