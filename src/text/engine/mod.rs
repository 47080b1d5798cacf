//! 分段引擎
//!
//! 每个引擎把一段格式统一的 run 按逻辑顺序转成字形。引擎之间只在字符如何
//! 分组、每组得到什么字形 id 上不同；度量统一来自 `advance`。

pub mod complex;
pub mod simple;
pub mod smart;

use unicode_script::{Script, UnicodeScript};

use super::props::TextProps;
use super::registry::SmartRules;
use super::segment::Segment;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Simple,
    Complex,
    Smart,
}

impl EngineKind {
    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Simple => "simple",
            EngineKind::Complex => "complex",
            EngineKind::Smart => "smart",
        }
    }
}

pub(crate) fn shape(
    kind: EngineKind,
    text: &str,
    props: &TextProps,
    rules: Option<&SmartRules>,
) -> Segment {
    let glyphs = match (kind, rules) {
        (EngineKind::Smart, Some(rules)) => smart::shape(text, props, rules),
        (EngineKind::Complex, _) => complex::shape(text, props),
        _ => simple::shape(text, props, false),
    };
    Segment::new(kind, glyphs, text.len(), props)
}

/// Best-effort shaping used when no engine fits the run.
pub(crate) fn shape_substituted(text: &str, props: &TextProps) -> Segment {
    Segment::new(
        EngineKind::Simple,
        simple::shape(text, props, true),
        text.len(),
        props,
    )
}

/// Advance of something `cells` terminal columns wide.
pub(crate) fn advance(cells: usize, props: &TextProps) -> i32 {
    if cells == 0 {
        return 0;
    }
    let half = props.size.max(2).saturating_add(1) / 2;
    let base = half.saturating_mul(i32::try_from(cells).unwrap_or(i32::MAX));
    if props.bold {
        base.saturating_add(1)
    } else {
        base
    }
}

pub(crate) fn requires_complex_shaping(ch: char) -> bool {
    matches!(
        ch.script(),
        Script::Arabic
            | Script::Syriac
            | Script::Nko
            | Script::Mongolian
            | Script::Hebrew
            | Script::Devanagari
            | Script::Bengali
            | Script::Gurmukhi
            | Script::Gujarati
            | Script::Oriya
            | Script::Tamil
            | Script::Telugu
            | Script::Kannada
            | Script::Malayalam
            | Script::Sinhala
            | Script::Thai
            | Script::Lao
            | Script::Tibetan
            | Script::Myanmar
            | Script::Khmer
    )
}

/// Scripts whose letters change shape depending on their neighbours.
pub(crate) fn is_joining(ch: char) -> bool {
    matches!(
        ch.script(),
        Script::Arabic | Script::Syriac | Script::Nko | Script::Mongolian
    ) && ch.is_alphabetic()
}

#[cfg(test)]
#[path = "../../../tests/unit/text/engine.rs"]
mod tests;
