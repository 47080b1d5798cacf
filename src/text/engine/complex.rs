use std::hash::Hasher;

use rustc_hash::FxHasher;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::{advance, is_joining};
use crate::text::props::TextProps;
use crate::text::segment::Glyph;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum JoinForm {
    Isolated = 0,
    Initial = 1,
    Medial = 2,
    Final = 3,
}

impl JoinForm {
    fn from_neighbours(joins_prev: bool, joins_next: bool) -> Self {
        match (joins_prev, joins_next) {
            (false, false) => JoinForm::Isolated,
            (false, true) => JoinForm::Initial,
            (true, true) => JoinForm::Medial,
            (true, false) => JoinForm::Final,
        }
    }
}

/// One glyph per grapheme cluster. Joining letters get a contextual form
/// baked into the glyph id, so editing a neighbour changes the glyph.
pub(crate) fn shape(text: &str, props: &TextProps) -> Vec<Glyph> {
    let clusters: Vec<(usize, &str)> = text.grapheme_indices(true).collect();
    let joins: Vec<bool> = clusters
        .iter()
        .map(|(_, g)| g.chars().next().is_some_and(is_joining))
        .collect();

    clusters
        .iter()
        .enumerate()
        .map(|(i, &(cluster, g))| {
            let id = if joins[i] {
                let joins_prev = i > 0 && joins[i - 1];
                let joins_next = i + 1 < joins.len() && joins[i + 1];
                let form = JoinForm::from_neighbours(joins_prev, joins_next);
                let base = g.chars().next().map_or(0, |c| c as u32);
                (base << 2) | form as u32
            } else {
                cluster_id(g)
            };
            Glyph {
                id,
                advance: advance(g.width(), props),
                cluster,
                substituted: false,
            }
        })
        .collect()
}

fn cluster_id(g: &str) -> u32 {
    let mut chars = g.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c as u32,
        _ => {
            let mut hasher = FxHasher::default();
            hasher.write(g.as_bytes());
            let h = hasher.finish();
            ((h >> 32) as u32 ^ h as u32) | 0x4000_0000
        }
    }
}
