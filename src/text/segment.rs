use std::ops::Range;

use super::engine::EngineKind;
use super::props::TextProps;
use crate::core::geom::Point;
use crate::paint::{PaintCmd, Painter, PlacedGlyph};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Glyph {
    pub id: u32,
    pub advance: i32,
    /// Byte offset of the first character of the cluster this glyph renders.
    pub cluster: usize,
    /// Drawn without the shaping the run asked for.
    pub substituted: bool,
}

/// Shaped output for the run of one string box.
///
/// Glyphs are kept in logical order; visual order is decided per line
/// fragment by the paragraph, so one segment can be re-broken into lines of
/// any width without reshaping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    engine: EngineKind,
    glyphs: Vec<Glyph>,
    prefix: Vec<i32>,
    text_len: usize,
    ascent: i32,
    descent: i32,
}

impl Segment {
    pub(crate) fn new(
        engine: EngineKind,
        glyphs: Vec<Glyph>,
        text_len: usize,
        props: &TextProps,
    ) -> Self {
        let mut prefix = Vec::with_capacity(glyphs.len() + 1);
        let mut x = 0i32;
        prefix.push(0);
        for g in &glyphs {
            x = x.saturating_add(g.advance);
            prefix.push(x);
        }
        Self {
            engine,
            glyphs,
            prefix,
            text_len,
            ascent: props.ascent(),
            descent: props.descent(),
        }
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn ascent(&self) -> i32 {
        self.ascent
    }

    pub fn descent(&self) -> i32 {
        self.descent
    }

    pub fn height(&self) -> i32 {
        self.ascent + self.descent
    }

    pub fn width(&self) -> i32 {
        self.prefix.last().copied().unwrap_or(0)
    }

    pub fn has_substitutions(&self) -> bool {
        self.glyphs.iter().any(|g| g.substituted)
    }

    /// Logical advance of every cluster starting before `offset`.
    pub fn advance_to(&self, offset: usize) -> i32 {
        let idx = self.glyphs.partition_point(|g| g.cluster < offset);
        self.prefix[idx]
    }

    pub fn width_between(&self, start: usize, end: usize) -> i32 {
        if end <= start {
            return 0;
        }
        self.advance_to(end) - self.advance_to(start)
    }

    /// Cluster starts in logical order, followed by the text length.
    pub fn boundaries(&self) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::with_capacity(self.glyphs.len() + 1);
        for g in &self.glyphs {
            if out.last() != Some(&g.cluster) {
                out.push(g.cluster);
            }
        }
        if out.last() != Some(&self.text_len) {
            out.push(self.text_len);
        }
        out
    }

    fn glyph_span(&self, range: &Range<usize>) -> Range<usize> {
        let start = self.glyphs.partition_point(|g| g.cluster < range.start);
        let end = self.glyphs.partition_point(|g| g.cluster < range.end);
        start..end.max(start)
    }

    /// Clusters of `range` as `(start, end, width)` in visual order.
    fn visual_clusters(&self, range: &Range<usize>, rtl: bool) -> Vec<(usize, usize, i32)> {
        let span = self.glyph_span(range);
        let mut clusters: Vec<(usize, usize, i32)> = Vec::new();
        for g in &self.glyphs[span] {
            match clusters.last_mut() {
                Some(last) if last.0 == g.cluster => last.2 += g.advance,
                _ => clusters.push((g.cluster, g.cluster, g.advance)),
            }
        }
        let len = clusters.len();
        for i in 0..len {
            let end = if i + 1 < len {
                clusters[i + 1].0
            } else {
                range.end.min(self.text_len)
            };
            clusters[i].1 = end;
        }
        if rtl {
            clusters.reverse();
        }
        clusters
    }

    /// Hit test inside a fragment: the cluster boundary nearest to `x`,
    /// measured from the fragment's left edge.
    pub fn offset_at_x(&self, range: Range<usize>, x: i32, rtl: bool) -> usize {
        if x <= 0 {
            return if rtl { range.end } else { range.start };
        }
        let mut left = 0i32;
        for (start, end, width) in self.visual_clusters(&range, rtl) {
            let right = left + width;
            if x < right {
                let mid = left + width / 2;
                return match (x < mid, rtl) {
                    (true, false) => start,
                    (false, false) => end,
                    (true, true) => end,
                    (false, true) => start,
                };
            }
            left = right;
        }
        if rtl {
            range.start
        } else {
            range.end
        }
    }

    /// Caret x for `offset` inside a fragment, measured from its left edge.
    pub fn x_at_offset(&self, range: Range<usize>, offset: usize, rtl: bool) -> i32 {
        let offset = offset.clamp(range.start, range.end);
        let before = self.width_between(range.start, offset);
        if rtl {
            self.width_between(range.start, range.end) - before
        } else {
            before
        }
    }

    /// Emits the glyphs of `range` with the left end of the baseline at
    /// `origin`.
    pub fn draw(
        &self,
        painter: &mut Painter,
        origin: Point,
        range: Range<usize>,
        rtl: bool,
        props: &TextProps,
    ) {
        let span = self.glyph_span(&range);
        if span.is_empty() {
            return;
        }
        let mut placed = Vec::with_capacity(span.len());
        let mut x = 0i32;
        let glyphs = &self.glyphs[span];
        let mut push = |g: &Glyph| {
            placed.push(PlacedGlyph { id: g.id, x });
            x += g.advance;
        };
        if rtl {
            glyphs.iter().rev().for_each(&mut push);
        } else {
            glyphs.iter().for_each(&mut push);
        }
        painter.push(PaintCmd::Glyphs {
            origin,
            glyphs: placed,
            size: props.size,
            color: props.color,
            underline: props.underline,
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/segment.rs"]
mod tests;
