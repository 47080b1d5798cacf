use super::*;

#[test]
fn line_metrics_for_common_sizes() {
    let p = TextProps::default();
    assert_eq!((p.ascent(), p.descent()), (13, 4));
    let p = p.with_size(24);
    assert_eq!(p.ascent() + p.descent(), 26);
}

#[test]
fn huge_sizes_saturate() {
    let p = TextProps::default().with_size(i32::MAX);
    assert_eq!(p.ascent(), i32::MAX / 5);
    assert_eq!(p.descent(), i32::MAX / 4);
    let p = TextProps::default().with_size(-3);
    assert_eq!((p.ascent(), p.descent()), (1, 1));
}
