use super::*;
use crate::text::engine::{self, EngineKind};

fn latin(text: &str) -> Segment {
    engine::shape(EngineKind::Simple, text, &TextProps::default(), None)
}

#[test]
fn widths_accumulate_per_cluster() {
    let seg = latin("hello");
    assert_eq!(seg.width(), 40);
    assert_eq!(seg.advance_to(0), 0);
    assert_eq!(seg.advance_to(2), 16);
    assert_eq!(seg.width_between(1, 4), 24);
    assert_eq!(seg.width_between(4, 1), 0);
    assert_eq!(seg.height(), 13 + 4);
}

#[test]
fn boundaries_end_with_text_len() {
    let seg = latin("añb");
    assert_eq!(seg.boundaries(), vec![0, 1, 3, 4]);
}

#[test]
fn offset_at_x_uses_half_width_rule() {
    let seg = latin("abc");
    assert_eq!(seg.offset_at_x(0..3, -5, false), 0);
    assert_eq!(seg.offset_at_x(0..3, 3, false), 0);
    assert_eq!(seg.offset_at_x(0..3, 4, false), 1);
    assert_eq!(seg.offset_at_x(0..3, 12, false), 2);
    assert_eq!(seg.offset_at_x(0..3, 100, false), 3);
}

#[test]
fn offset_at_x_mirrors_for_rtl_fragments() {
    let seg = latin("abc");
    // Visual order is c b a; the left half of `c` is after it logically.
    assert_eq!(seg.offset_at_x(0..3, 1, true), 3);
    assert_eq!(seg.offset_at_x(0..3, 6, true), 2);
    assert_eq!(seg.offset_at_x(0..3, 23, true), 0);
    assert_eq!(seg.x_at_offset(0..3, 0, true), 24);
    assert_eq!(seg.x_at_offset(0..3, 3, true), 0);
    assert_eq!(seg.x_at_offset(0..3, 1, false), 8);
}

#[test]
fn draw_places_glyphs_in_visual_order() {
    let seg = latin("abc");
    let mut painter = Painter::new();
    seg.draw(&mut painter, Point::new(10, 20), 1..3, true, &TextProps::default());
    let PaintCmd::Glyphs { origin, glyphs, .. } = &painter.cmds()[0] else {
        panic!("expected a glyph run");
    };
    assert_eq!(*origin, Point::new(10, 20));
    let ids: Vec<u32> = glyphs.iter().map(|g| g.id).collect();
    assert_eq!(ids, vec!['c' as u32, 'b' as u32]);
    assert_eq!(glyphs[1].x, 8);
}

#[test]
fn draw_skips_empty_ranges() {
    let seg = latin("abc");
    let mut painter = Painter::new();
    seg.draw(&mut painter, Point::ZERO, 2..2, false, &TextProps::default());
    assert!(painter.cmds().is_empty());
}
