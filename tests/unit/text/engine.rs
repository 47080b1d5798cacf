use super::*;
use crate::text::registry::SmartRules;

#[test]
fn advance_table_follows_cell_width() {
    let props = TextProps::default();
    assert_eq!(advance(0, &props), 0);
    assert_eq!(advance(1, &props), 8);
    assert_eq!(advance(2, &props), 16);
    let bold = TextProps {
        bold: true,
        ..TextProps::default()
    };
    assert_eq!(advance(1, &bold), 9);
}

#[test]
fn simple_engine_maps_chars_to_code_points() {
    let seg = shape(EngineKind::Simple, "a中", &TextProps::default(), None);
    let ids: Vec<u32> = seg.glyphs().iter().map(|g| g.id).collect();
    assert_eq!(ids, vec!['a' as u32, '中' as u32]);
    assert_eq!(seg.width(), 24);
    assert!(!seg.has_substitutions());
}

#[test]
fn complex_engine_groups_graphemes() {
    let seg = shape(EngineKind::Complex, "e\u{301}x", &TextProps::default(), None);
    assert_eq!(seg.glyphs().len(), 2);
    assert_eq!(seg.glyphs()[0].cluster, 0);
    assert_eq!(seg.glyphs()[1].cluster, 3);
}

#[test]
fn joining_letters_take_contextual_forms() {
    let props = TextProps::default();
    let word = shape(EngineKind::Complex, "بتث", &props, None);
    let forms: Vec<u32> = word.glyphs().iter().map(|g| g.id & 3).collect();
    assert_eq!(forms, vec![1, 2, 3]);

    let alone = shape(EngineKind::Complex, "ت", &props, None);
    assert_eq!(alone.glyphs()[0].id & 3, 0);
    assert_ne!(alone.glyphs()[0].id, word.glyphs()[1].id);
}

#[test]
fn smart_engine_prefers_longest_rule() {
    let rules = SmartRules::new().ligature("f", 1).ligature("ffi", 2);
    let seg = shape(EngineKind::Smart, "ffia", &TextProps::default(), Some(&rules));
    let ids: Vec<u32> = seg.glyphs().iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![2 | smart::LIGATURE_BIT, 'a' as u32]);
    assert_eq!(seg.glyphs()[1].cluster, 3);
    assert_eq!(seg.width(), 16 + 8);
}

#[test]
fn substituted_shaping_flags_complex_scripts() {
    let seg = shape_substituted("aب", &TextProps::default());
    assert_eq!(seg.engine(), EngineKind::Simple);
    let flags: Vec<bool> = seg.glyphs().iter().map(|g| g.substituted).collect();
    assert_eq!(flags, vec![false, true]);
}

#[test]
fn multi_char_clusters_get_stable_hashed_ids() {
    let props = TextProps::default();
    let a = shape(EngineKind::Complex, "e\u{301}o\u{308}", &props, None);
    let b = shape(EngineKind::Complex, "e\u{301}o\u{308}", &props, None);
    let ids: Vec<u32> = a.glyphs().iter().map(|g| g.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|id| id & 0x4000_0000 != 0));
    assert_ne!(ids[0], ids[1]);
    assert_eq!(a, b);
}

#[test]
fn huge_sizes_do_not_overflow_advances() {
    let props = TextProps::default().with_size(i32::MAX);
    assert_eq!(advance(3, &props), i32::MAX);
}
