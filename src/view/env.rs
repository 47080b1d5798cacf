//! 视图构建环境
//!
//! `ViewEnv` 定位在某个容器的某个子槽位，从那里开始追加盒子。完整构建从根开始；
//! 局部重建和懒加载从被丢弃盒子原来的位置开始，三者共用同一份构建代码。

use super::constructor::{Frag, ViewConstructor};
use crate::boxes::{BoxId, BoxKind, BoxTree, ColumnWidth, LazyBox, LazyToken};
use crate::core::error::BuildError;
use crate::data::{AttrTag, DataAccess, ObjectHandle, TsString};
use crate::notify::{NotifierId, NotifierIndex, PropKind, PropRecipe};
use crate::settings::ViewSettings;
use crate::text::{is_hard_break, FontId, ParaProps, TextProps, WsId};

struct Open {
    id: BoxId,
    next: usize,
}

#[derive(Clone, Copy)]
struct Frame {
    object: ObjectHandle,
    /// Notifier of the attribute that displays `object`.
    notifier: Option<NotifierId>,
    index: usize,
}

/// Where a build starts and what it reads.
pub(crate) struct BuildSite<'a> {
    pub data: &'a dyn DataAccess,
    pub vc: &'a dyn ViewConstructor,
    pub settings: &'a ViewSettings,
    pub parent: BoxId,
    pub at: usize,
    pub props: TextProps,
    /// Width the tree was last laid out at; only used for height estimates.
    pub width: i32,
    /// Objects already open above the site.
    pub depth: usize,
}

pub struct ViewEnv<'a> {
    tree: &'a mut BoxTree,
    index: &'a mut NotifierIndex,
    data: &'a dyn DataAccess,
    vc: &'a dyn ViewConstructor,
    settings: &'a ViewSettings,
    width: i32,
    depth: usize,
    base_start: usize,
    containers: Vec<Open>,
    /// Text props per open container.
    props: Vec<TextProps>,
    /// Containers below these counts belong to an enclosing attribute.
    floors: Vec<usize>,
    frames: Vec<Frame>,
    created: Vec<NotifierId>,
    touched: Vec<(ObjectHandle, AttrTag)>,
}

impl<'a> ViewEnv<'a> {
    pub(crate) fn new(
        tree: &'a mut BoxTree,
        index: &'a mut NotifierIndex,
        site: BuildSite<'a>,
    ) -> Self {
        Self {
            tree,
            index,
            data: site.data,
            vc: site.vc,
            settings: site.settings,
            width: site.width,
            depth: site.depth,
            base_start: site.at,
            containers: vec![Open {
                id: site.parent,
                next: site.at,
            }],
            props: vec![site.props],
            floors: vec![1],
            frames: Vec::new(),
            created: Vec::new(),
            touched: Vec::new(),
        }
    }

    pub fn data(&self) -> &dyn DataAccess {
        self.data
    }

    pub fn props(&self) -> TextProps {
        self.props.last().cloned().unwrap_or_default()
    }

    /// Objects currently being displayed, outermost included.
    pub fn depth(&self) -> usize {
        self.depth + self.frames.len()
    }

    // -- containers ---------------------------------------------------------

    pub fn open_pile(&mut self) -> Result<BoxId, BuildError> {
        self.open(BoxKind::pile())
    }

    pub fn open_row(&mut self) -> Result<BoxId, BuildError> {
        self.open(BoxKind::row())
    }

    pub fn open_paragraph(&mut self, props: ParaProps) -> Result<BoxId, BuildError> {
        self.open(BoxKind::paragraph(props))
    }

    pub fn open_table(&mut self, columns: Vec<ColumnWidth>) -> Result<BoxId, BuildError> {
        self.open(BoxKind::table(columns))
    }

    pub fn open_table_row(&mut self) -> Result<BoxId, BuildError> {
        self.open(BoxKind::table_row())
    }

    pub fn open_table_cell(&mut self, col_span: usize) -> Result<BoxId, BuildError> {
        self.open(BoxKind::table_cell(col_span))
    }

    /// Closes whatever container is innermost.
    pub fn close(&mut self) -> Result<(), BuildError> {
        let floor = self.floors.last().copied().unwrap_or(1);
        if self.containers.len() <= floor {
            return Err(BuildError::Unbalanced {
                expected: "an open container",
                found: "close",
            });
        }
        self.pop_container();
        Ok(())
    }

    pub fn close_pile(&mut self) -> Result<(), BuildError> {
        self.close_kind("pile")
    }

    pub fn close_row(&mut self) -> Result<(), BuildError> {
        self.close_kind("row")
    }

    pub fn close_paragraph(&mut self) -> Result<(), BuildError> {
        self.close_kind("paragraph")
    }

    pub fn close_table(&mut self) -> Result<(), BuildError> {
        self.close_kind("table")
    }

    pub fn close_table_row(&mut self) -> Result<(), BuildError> {
        self.close_kind("table row")
    }

    pub fn close_table_cell(&mut self) -> Result<(), BuildError> {
        self.close_kind("table cell")
    }

    fn close_kind(&mut self, expected: &'static str) -> Result<(), BuildError> {
        let found = self.top_name();
        if found != expected {
            return Err(BuildError::Unbalanced { expected, found });
        }
        self.close()
    }

    fn open(&mut self, kind: BoxKind) -> Result<BoxId, BuildError> {
        let id = self.insert_here(kind)?;
        let props = self.props();
        self.containers.push(Open { id, next: 0 });
        self.props.push(props);
        Ok(id)
    }

    fn pop_container(&mut self) {
        self.containers.pop();
        self.props.pop();
    }

    fn cursor(&self) -> (BoxId, usize) {
        // The base container is never popped.
        let open = &self.containers[self.containers.len() - 1];
        (open.id, open.next)
    }

    fn top_kind(&self) -> Option<&BoxKind> {
        self.containers.last().and_then(|o| self.tree.kind(o.id))
    }

    fn top_name(&self) -> &'static str {
        self.top_kind().map_or("nothing", |k| k.name())
    }

    fn insert_here(&mut self, kind: BoxKind) -> Result<BoxId, BuildError> {
        let (parent, at) = self.cursor();
        let id = self.tree.insert(parent, at, kind)?;
        if let Some(open) = self.containers.last_mut() {
            open.next += 1;
        }
        Ok(id)
    }

    // -- formatting ---------------------------------------------------------

    pub fn set_font(&mut self, font: FontId) {
        if let Some(p) = self.props.last_mut() {
            p.font = font;
        }
    }

    pub fn set_ws(&mut self, ws: WsId) {
        if let Some(p) = self.props.last_mut() {
            p.ws = ws;
        }
    }

    pub fn set_size(&mut self, size: i32) {
        if let Some(p) = self.props.last_mut() {
            p.size = size;
        }
    }

    pub fn set_bold(&mut self, bold: bool) {
        if let Some(p) = self.props.last_mut() {
            p.bold = bold;
        }
    }

    pub fn set_props(&mut self, props: TextProps) {
        if let Some(p) = self.props.last_mut() {
            *p = props;
        }
    }

    // -- content ------------------------------------------------------------

    pub fn add_string_prop(&mut self, tag: AttrTag) -> Result<(), BuildError> {
        self.show_attribute(tag, PropKind::String).map(drop)
    }

    pub fn add_int_prop(&mut self, tag: AttrTag) -> Result<(), BuildError> {
        self.show_attribute(tag, PropKind::Int).map(drop)
    }

    /// Displays the object held by `tag` with `frag`.
    pub fn add_obj_prop(&mut self, tag: AttrTag, frag: Frag) -> Result<(), BuildError> {
        self.show_attribute(tag, PropKind::Object { frag }).map(drop)
    }

    /// Displays every object of sequence `tag` with `frag`.
    pub fn add_obj_vec(&mut self, tag: AttrTag, frag: Frag) -> Result<(), BuildError> {
        self.show_attribute(tag, PropKind::Sequence { frag }).map(drop)
    }

    /// Like `add_obj_vec`, but items become lazy placeholders that are built
    /// when first needed.
    pub fn add_lazy_vec(&mut self, tag: AttrTag, frag: Frag) -> Result<(), BuildError> {
        self.show_attribute(tag, PropKind::LazySequence { frag })
            .map(drop)
    }

    /// Text that belongs to the view rather than the data; never rebuilt on
    /// its own.
    pub fn add_string(&mut self, text: &TsString) -> Result<(), BuildError> {
        self.add_text(text)
    }

    pub fn add_literal(&mut self, text: &str) -> Result<(), BuildError> {
        self.add_text(&TsString::plain(text))
    }

    fn frame(&self) -> Result<Frame, BuildError> {
        self.frames.last().copied().ok_or(BuildError::Unbalanced {
            expected: "an object display",
            found: "attribute",
        })
    }

    fn show_attribute(&mut self, tag: AttrTag, kind: PropKind) -> Result<NotifierId, BuildError> {
        let frame = self.frame()?;
        let (parent, start) = self.cursor();
        let recipe = PropRecipe {
            kind,
            props: self.props(),
        };
        let id = self.index.begin(
            frame.object,
            tag,
            parent,
            start,
            frame.notifier,
            frame.index,
            recipe,
        );
        self.created.push(id);
        self.touched.push((frame.object, tag));

        let floor = self.containers.len();
        self.floors.push(floor);
        let filled = self.fill_attribute(id, frame.object, tag, kind);
        self.floors.pop();
        filled?;

        if self.containers.len() != floor {
            return Err(BuildError::Unbalanced {
                expected: self.top_name(),
                found: "end of attribute",
            });
        }
        let (_, end) = self.cursor();
        let mut len = end - start;
        if len == 0 {
            self.insert_placeholder()?;
            len = 1;
        }
        self.index.complete(id, len, self.tree);
        Ok(id)
    }

    fn fill_attribute(
        &mut self,
        id: NotifierId,
        object: ObjectHandle,
        tag: AttrTag,
        kind: PropKind,
    ) -> Result<(), BuildError> {
        let data = self.data;
        match kind {
            PropKind::String => match data.read_string(object, tag) {
                Some(text) => self.add_text(&text),
                None => Ok(()),
            },
            PropKind::Int => match data.read_int(object, tag) {
                Some(n) => self.add_text(&TsString::plain(&n.to_string())),
                None => Ok(()),
            },
            PropKind::Object { frag } => match data.object_at(object, tag, 0) {
                Some(child) => self.display_object(child, frag, Some(id), 0),
                None => Ok(()),
            },
            PropKind::Sequence { frag } => {
                for (i, item) in data.read_objects(object, tag).into_iter().enumerate() {
                    self.display_object(item, frag, Some(id), i)?;
                }
                Ok(())
            }
            PropKind::LazySequence { frag } => {
                let items = data.read_objects(object, tag);
                let chunk = self.settings.lazy_chunk_size.max(1);
                let mut start = 0;
                while start < items.len() {
                    let end = (start + chunk).min(items.len());
                    let estimated = items[start..end]
                        .iter()
                        .map(|item| {
                            self.vc
                                .estimate_height(*item, frag, self.width)
                                .unwrap_or(self.settings.estimated_item_height)
                        })
                        .sum();
                    let token = LazyToken {
                        object,
                        tag,
                        frag,
                        items: start..end,
                    };
                    self.insert_here(BoxKind::Lazy(LazyBox::new(token, estimated)))?;
                    start = end;
                }
                Ok(())
            }
        }
    }

    fn display_object(
        &mut self,
        object: ObjectHandle,
        frag: Frag,
        notifier: Option<NotifierId>,
        index: usize,
    ) -> Result<(), BuildError> {
        let depth = self.depth();
        if depth >= self.settings.max_build_depth {
            return Err(BuildError::DepthExceeded { object, depth });
        }
        if !self.data.contains(object) {
            tracing::debug!(%object, "skipping display of missing object");
            return Ok(());
        }
        self.frames.push(Frame {
            object,
            notifier,
            index,
        });
        // Formatting set while showing one object stays with that object.
        let props = self.props();
        let vc = self.vc;
        let shown = vc.display(self, object, frag);
        self.frames.pop();
        if let Some(p) = self.props.last_mut() {
            *p = props;
        }
        shown
    }

    /// Strings outside a paragraph get a paragraph of their own.
    fn add_text(&mut self, text: &TsString) -> Result<(), BuildError> {
        let pieces = self.split_runs(text);
        if pieces.is_empty() {
            return Ok(());
        }
        let in_paragraph = matches!(self.top_kind(), Some(BoxKind::Paragraph(_)));
        if !in_paragraph {
            self.open(BoxKind::paragraph(ParaProps::default()))?;
        }
        for (text, props, broken) in pieces {
            let kind = if broken {
                BoxKind::broken_string(text, props)
            } else {
                BoxKind::string(text, props)
            };
            self.insert_here(kind)?;
        }
        if !in_paragraph {
            self.pop_container();
        }
        Ok(())
    }

    /// Cuts runs at hard breaks and merges neighbours with equal props.
    /// The flag marks pieces that follow a break.
    fn split_runs(&self, text: &TsString) -> Vec<(String, TextProps, bool)> {
        let base = self.props();
        let mut out: Vec<(String, TextProps, bool)> = Vec::new();
        let mut after_break = false;
        for run in &text.runs {
            let props = run.props.clone().unwrap_or_else(|| base.clone());
            let mut rest = run.text.as_str();
            loop {
                let cut = rest.char_indices().find(|&(_, c)| is_hard_break(c));
                let (piece, tail) = match cut {
                    Some((i, c)) => {
                        let mut skip = i + c.len_utf8();
                        if c == '\r' && rest[skip..].starts_with('\n') {
                            skip += 1;
                        }
                        (&rest[..i], Some(&rest[skip..]))
                    }
                    None => (rest, None),
                };
                if !piece.is_empty() {
                    match out.last_mut() {
                        Some(last) if !after_break && last.1 == props => last.0.push_str(piece),
                        _ => out.push((piece.to_string(), props.clone(), after_break)),
                    }
                    after_break = false;
                }
                match tail {
                    Some(t) => {
                        after_break = true;
                        rest = t;
                    }
                    None => break,
                }
            }
        }
        out
    }

    /// Zero-size stand-in so an attribute that shows nothing still has a
    /// position among its siblings.
    fn insert_placeholder(&mut self) -> Result<BoxId, BuildError> {
        let kind = match self.top_kind() {
            Some(BoxKind::Paragraph(_)) => BoxKind::string("", self.props()),
            Some(BoxKind::Table(_)) => BoxKind::table_row(),
            Some(BoxKind::TableRow(_)) => BoxKind::table_cell(0),
            _ => BoxKind::pile(),
        };
        self.insert_here(kind)
    }

    fn check_closed(&self) -> Result<(), BuildError> {
        if self.containers.len() != 1 {
            return Err(BuildError::Unbalanced {
                expected: self.top_name(),
                found: "end of display",
            });
        }
        Ok(())
    }

    // -- entry points -------------------------------------------------------

    pub(crate) fn display_root(&mut self, object: ObjectHandle, frag: Frag) -> Result<(), BuildError> {
        self.display_object(object, frag, None, 0)?;
        self.check_closed()
    }

    /// Shows one attribute occurrence again, as recorded by `recipe`.
    pub(crate) fn redisplay(
        &mut self,
        object: ObjectHandle,
        tag: AttrTag,
        recipe: &PropRecipe,
        parent: Option<NotifierId>,
        index_in_parent: usize,
    ) -> Result<NotifierId, BuildError> {
        self.set_props(recipe.props.clone());
        self.frames.push(Frame {
            object,
            notifier: parent,
            index: index_in_parent,
        });
        let shown = self.show_attribute(tag, recipe.kind);
        self.frames.pop();
        let id = shown?;
        self.check_closed()?;
        Ok(id)
    }

    /// Builds the items a lazy placeholder stood for. Always leaves at least
    /// one box behind.
    pub(crate) fn display_items(
        &mut self,
        token: &LazyToken,
        parent: Option<NotifierId>,
    ) -> Result<(), BuildError> {
        let items = self.data.read_objects(token.object, token.tag);
        for i in token.items.clone() {
            let Some(item) = items.get(i) else {
                break;
            };
            self.display_object(*item, token.frag, parent, i)?;
        }
        self.check_closed()?;
        if self.inserted() == 0 {
            self.insert_placeholder()?;
        }
        Ok(())
    }

    /// Boxes added to the starting container.
    pub(crate) fn inserted(&self) -> usize {
        self.containers[0].next - self.base_start
    }

    pub(crate) fn created(&self) -> &[NotifierId] {
        &self.created
    }

    pub(crate) fn touched(&self) -> &[(ObjectHandle, AttrTag)] {
        &self.touched
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/env.rs"]
mod tests;
