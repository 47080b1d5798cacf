//! 段落布局：断行和双向文本重排
//!
//! 负责：
//! - 把行内子节点拼成一段逻辑文本（原子子节点用 U+FFFC 占位）
//! - 按 UAX #14 断点贪心选行
//! - 每行按 bidi 分段，片段按视觉顺序摆放
//!
//! 子节点保持逻辑顺序，只有片段的 x 坐标体现视觉顺序。

use std::collections::BTreeMap;
use std::ops::Range;

use unicode_bidi::{BidiInfo, Level};
use unicode_linebreak::{linebreaks, BreakOpportunity};
use unicode_segmentation::UnicodeSegmentation;

use super::layout::LayoutCx;
use super::{BoxId, BoxKind, BoxTree, ParagraphBox};
use crate::core::geom::{Point, Rect, Size};
use crate::text::{Align, Direction, ParaProps, Segment, TextProps};

const OBJECT_REPLACEMENT: &str = "\u{FFFC}";

/// A piece of one child shown on one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub source: BoxId,
    /// Byte range inside the source string; `0..3` for atomic children.
    pub range: Range<usize>,
    /// Relative to the paragraph.
    pub x: i32,
    pub width: i32,
    pub rtl: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineBox {
    pub y: i32,
    pub height: i32,
    pub ascent: i32,
    /// Width of the visible content, trailing whitespace excluded.
    pub width: i32,
    /// Byte range in the paragraph's logical text.
    pub range: Range<usize>,
    /// Left to right.
    pub fragments: Vec<Fragment>,
}

impl ParagraphBox {
    pub fn line_ranges(&self) -> Vec<Range<usize>> {
        self.lines.iter().map(|l| l.range.clone()).collect()
    }
}

#[derive(Clone, Copy, Debug)]
enum ItemKind {
    Text,
    Atomic(Size),
}

#[derive(Clone, Debug)]
struct Item {
    id: BoxId,
    start: usize,
    end: usize,
    kind: ItemKind,
}

/// Read-only view of a paragraph's inline content once every string has
/// been shaped and every atomic child measured.
struct Inline<'t> {
    tree: &'t BoxTree,
    items: Vec<Item>,
    text: String,
    /// Starts of broken-string children.
    forced: Vec<usize>,
}

impl<'t> Inline<'t> {
    fn collect(tree: &'t BoxTree, children: &[BoxId]) -> Self {
        let mut text = String::new();
        let mut items = Vec::with_capacity(children.len());
        let mut forced = Vec::new();
        for &id in children {
            let Some(node) = tree.get(id) else {
                continue;
            };
            let start = text.len();
            let kind = match &node.kind {
                BoxKind::String(s) => {
                    text.push_str(&s.text);
                    ItemKind::Text
                }
                BoxKind::BrokenString(s) => {
                    forced.push(start);
                    text.push_str(&s.text);
                    ItemKind::Text
                }
                _ => {
                    text.push_str(OBJECT_REPLACEMENT);
                    ItemKind::Atomic(node.size)
                }
            };
            items.push(Item {
                id,
                start,
                end: text.len(),
                kind,
            });
        }
        Self {
            tree,
            items,
            text,
            forced,
        }
    }

    fn segment(&self, id: BoxId) -> Option<&'t Segment> {
        self.tree.kind(id)?.as_string()?.segment.as_ref()
    }

    fn props(&self, id: BoxId) -> Option<&'t TextProps> {
        self.tree.kind(id)?.as_string().map(|s| &s.props)
    }

    fn piece_width(&self, item: &Item, start: usize, end: usize) -> i32 {
        match item.kind {
            ItemKind::Text => self
                .segment(item.id)
                .map_or(0, |s| s.width_between(start - item.start, end - item.start)),
            ItemKind::Atomic(size) => size.width,
        }
    }

    /// Items overlapping `start..end`, with the overlap.
    fn pieces(&self, start: usize, end: usize) -> impl Iterator<Item = (&Item, usize, usize)> {
        let first = self.items.partition_point(|it| it.end <= start);
        self.items[first..]
            .iter()
            .take_while(move |it| it.start < end)
            .filter_map(move |it| {
                let a = start.max(it.start);
                let b = end.min(it.end);
                (a < b).then_some((it, a, b))
            })
    }

    fn measure(&self, start: usize, end: usize) -> i32 {
        self.pieces(start, end)
            .map(|(it, a, b)| self.piece_width(it, a, b))
            .sum()
    }

    fn content_end(&self, range: &Range<usize>) -> usize {
        range.start + self.text[range.clone()].trim_end().len()
    }

    fn opportunities(&self) -> Vec<(usize, bool)> {
        let mut ops: BTreeMap<usize, bool> = BTreeMap::new();
        for (pos, op) in linebreaks(&self.text) {
            ops.insert(pos, matches!(op, BreakOpportunity::Mandatory));
        }
        for &pos in &self.forced {
            if pos > 0 && pos < self.text.len() {
                ops.insert(pos, true);
            }
        }
        ops.insert(self.text.len(), true);
        ops.into_iter().collect()
    }

    /// Greedy partition into line ranges.
    fn break_lines(&self, width: i32) -> Vec<Range<usize>> {
        let len = self.text.len();
        let mut lines = Vec::new();
        if len == 0 {
            return lines;
        }
        let ops = self.opportunities();
        let mut start = 0;
        let mut i = 0;
        while start < len {
            while i < ops.len() && ops[i].0 <= start {
                i += 1;
            }
            let mut best = None;
            while let Some(&(pos, mandatory)) = ops.get(i) {
                let end = self.content_end(&(start..pos));
                if self.measure(start, end) > width {
                    break;
                }
                best = Some(pos);
                i += 1;
                if mandatory {
                    break;
                }
            }
            let end = match best {
                Some(end) => end,
                None => {
                    let limit = ops.get(i).map_or(len, |op| op.0);
                    self.emergency_break(start, limit, width)
                }
            };
            lines.push(start..end);
            start = end;
        }
        lines
    }

    /// Splits an overlong word at the last grapheme boundary that fits,
    /// taking at least one grapheme.
    fn emergency_break(&self, start: usize, limit: usize, width: i32) -> usize {
        let word = &self.text[start..limit];
        let mut end = start;
        for (idx, g) in word.grapheme_indices(true) {
            let next = start + idx + g.len();
            if self.measure(start, next) > width {
                break;
            }
            end = next;
        }
        if end == start {
            end = word.graphemes(true).next().map_or(limit, |g| start + g.len());
        }
        end
    }
}

struct LinePlan {
    range: Range<usize>,
    /// `(item index, start, end, rtl)` in visual order.
    pieces: Vec<(usize, usize, usize, bool)>,
}

fn base_level(direction: Direction) -> Option<Level> {
    match direction {
        Direction::Ltr => Some(Level::ltr()),
        Direction::Rtl => Some(Level::rtl()),
        Direction::Auto => None,
    }
}

/// Visual runs of every line; returns the plans and whether the resolved
/// paragraph direction is right to left.
fn reorder(inline: &Inline<'_>, props: &ParaProps, lines: Vec<Range<usize>>) -> (Vec<LinePlan>, bool) {
    let bidi = BidiInfo::new(&inline.text, base_level(props.direction));
    let base_rtl = bidi
        .paragraphs
        .first()
        .map_or(props.direction == Direction::Rtl, |p| p.level.is_rtl());

    let plans = lines
        .into_iter()
        .map(|range| {
            let content = range.start..inline.content_end(&range);
            let mut runs: Vec<(Range<usize>, bool)> = Vec::new();
            if !content.is_empty() {
                let para = bidi
                    .paragraphs
                    .iter()
                    .find(|p| p.range.contains(&content.start))
                    .or_else(|| bidi.paragraphs.first());
                match para {
                    Some(para) => {
                        let line = content.start..content.end.min(para.range.end);
                        let (levels, level_runs) = bidi.visual_runs(para, line);
                        for run in level_runs {
                            let rtl = levels.get(run.start).is_some_and(|l| l.is_rtl());
                            runs.push((run, rtl));
                        }
                    }
                    None => runs.push((content.clone(), false)),
                }
            }

            let mut pieces = Vec::new();
            for (run, rtl) in runs {
                let first = inline.items.partition_point(|it| it.end <= run.start);
                let mut run_pieces: Vec<(usize, usize, usize, bool)> = inline.items[first..]
                    .iter()
                    .enumerate()
                    .take_while(|(_, it)| it.start < run.end)
                    .filter_map(|(k, it)| {
                        let a = run.start.max(it.start);
                        let b = run.end.min(it.end);
                        (a < b).then_some((first + k, a, b, rtl))
                    })
                    .collect();
                if rtl {
                    run_pieces.reverse();
                }
                pieces.extend(run_pieces);
            }
            LinePlan { range, pieces }
        })
        .collect();
    (plans, base_rtl)
}

fn shape_if_needed(tree: &mut BoxTree, cx: &mut LayoutCx<'_>, id: BoxId) {
    let shaped = {
        let Some(s) = tree.kind(id).and_then(|k| k.as_string()) else {
            return;
        };
        if s.segment.is_some() {
            return;
        }
        cx.segmenter.segment_or_fallback(&s.text, &s.props)
    };
    if let Some(BoxKind::String(s) | BoxKind::BrokenString(s)) =
        tree.get_mut(id).map(|n| &mut n.kind)
    {
        s.segment = Some(shaped.0);
        s.shape_error = shaped.1;
    }
}

/// A string box laid out on its own, outside any paragraph.
pub(crate) fn layout_lone_string(tree: &mut BoxTree, cx: &mut LayoutCx<'_>, id: BoxId) -> Size {
    shape_if_needed(tree, cx, id);
    tree.kind(id)
        .and_then(|k| k.as_string())
        .and_then(|s| s.segment.as_ref())
        .map_or(Size::ZERO, |seg| Size::new(seg.width(), seg.height()))
}

pub(crate) fn layout_paragraph(
    tree: &mut BoxTree,
    cx: &mut LayoutCx<'_>,
    id: BoxId,
    width: i32,
) -> Size {
    let (children, props) = match tree.kind(id) {
        Some(BoxKind::Paragraph(p)) => (p.children.clone(), p.props),
        _ => return Size::ZERO,
    };

    for &child in &children {
        let is_string = tree.kind(child).is_some_and(|k| k.is_string());
        if is_string {
            shape_if_needed(tree, cx, child);
        } else {
            tree.layout_box(cx, child, width);
        }
    }

    let fallback = TextProps::default().with_size(cx.settings.default_font_size);
    let spacing = cx.settings.line_spacing_percent.max(1);

    let (lines, placements, height) = {
        let inline = Inline::collect(tree, &children);
        let ranges = inline.break_lines(width);
        let (plans, base_rtl) = reorder(&inline, &props, ranges);

        let align = match (props.align, base_rtl) {
            (Align::Leading, false) | (Align::Left, _) => Align::Left,
            (Align::Leading, true) | (Align::Right, _) => Align::Right,
            (Align::Center, _) => Align::Center,
        };

        let mut lines: Vec<LineBox> = Vec::with_capacity(plans.len());
        let mut y = 0i32;
        for plan in plans {
            let mut ascent = 0i32;
            let mut descent = 0i32;
            for &(k, _, _, _) in &plan.pieces {
                let item = &inline.items[k];
                match item.kind {
                    ItemKind::Text => {
                        if let Some(seg) = inline.segment(item.id) {
                            ascent = ascent.max(seg.ascent());
                            descent = descent.max(seg.descent());
                        }
                    }
                    ItemKind::Atomic(size) => ascent = ascent.max(size.height),
                }
            }
            if ascent == 0 && descent == 0 {
                let props = inline
                    .pieces(plan.range.start, plan.range.end)
                    .find_map(|(it, _, _)| inline.props(it.id))
                    .unwrap_or(&fallback);
                ascent = props.ascent();
                descent = props.descent();
            }
            let height = (ascent + descent).saturating_mul(spacing) / 100;

            let mut fragments = Vec::with_capacity(plan.pieces.len());
            let mut x = 0i32;
            for (k, a, b, rtl) in plan.pieces {
                let item = &inline.items[k];
                let w = inline.piece_width(item, a, b);
                fragments.push(Fragment {
                    source: item.id,
                    range: (a - item.start)..(b - item.start),
                    x,
                    width: w,
                    rtl,
                });
                x += w;
            }
            let free = (width - x).max(0);
            let shift = match align {
                Align::Right => free,
                Align::Center => free / 2,
                _ => 0,
            };
            for f in &mut fragments {
                f.x += shift;
            }

            lines.push(LineBox {
                y,
                height,
                ascent,
                width: x,
                range: plan.range,
                fragments,
            });
            y = y.saturating_add(height);
        }

        let placements: Vec<(BoxId, Rect)> = inline
            .items
            .iter()
            .map(|item| (item.id, place_item(item, &lines, y)))
            .collect();
        (lines, placements, y)
    };

    for (child, rect) in placements {
        tree.set_origin(child, rect.origin());
        if tree.kind(child).is_some_and(|k| k.is_string()) {
            tree.set_size(child, rect.size());
        }
    }
    if let Some(BoxKind::Paragraph(p)) = tree.get_mut(id).map(|n| &mut n.kind) {
        p.lines = lines;
    }
    Size::new(width, height)
}

fn place_item(item: &Item, lines: &[LineBox], total_height: i32) -> Rect {
    let mut rect: Option<Rect> = None;
    for line in lines {
        for f in line.fragments.iter().filter(|f| f.source == item.id) {
            let r = match item.kind {
                ItemKind::Atomic(size) => Rect::from_origin_size(
                    Point::new(f.x, line.y + line.ascent - size.height),
                    size,
                ),
                ItemKind::Text => Rect::new(f.x, line.y, f.width, line.height),
            };
            rect = Some(rect.map_or(r, |acc| acc.union(r)));
        }
    }
    rect.unwrap_or_else(|| {
        // Nothing visible: park at the start of the line holding the item.
        let y = lines
            .iter()
            .find(|l| l.range.start <= item.start && item.start < l.range.end)
            .map_or(total_height, |l| l.y);
        Rect::new(0, y, 0, 0)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/boxes/paragraph.rs"]
mod tests;
