use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::advance;
use crate::text::props::TextProps;
use crate::text::registry::SmartRules;
use crate::text::segment::Glyph;

/// Marks glyph ids produced by a ligature rule.
pub const LIGATURE_BIT: u32 = 0x8000_0000;

/// Applies the font's rules left to right, longest match first. A ligature
/// is one cluster one column narrower than its parts.
pub(crate) fn shape(text: &str, props: &TextProps, rules: &SmartRules) -> Vec<Glyph> {
    let mut glyphs = Vec::with_capacity(text.len());
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        if let Some((len, glyph)) = rules.match_at(rest) {
            let cells = rest[..len].width().saturating_sub(1).max(1);
            glyphs.push(Glyph {
                id: glyph | LIGATURE_BIT,
                advance: advance(cells, props),
                cluster: pos,
                substituted: false,
            });
            pos += len;
            continue;
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        glyphs.push(Glyph {
            id: ch as u32,
            advance: advance(ch.width().unwrap_or(0), props),
            cluster: pos,
            substituted: false,
        });
        pos += ch.len_utf8();
    }
    glyphs
}
