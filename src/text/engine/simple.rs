use unicode_width::UnicodeWidthChar;

use super::{advance, requires_complex_shaping};
use crate::text::props::TextProps;
use crate::text::segment::Glyph;

/// One glyph per character; the glyph id is the code point.
///
/// With `substitute` set, characters this engine cannot render properly are
/// still emitted but flagged.
pub(crate) fn shape(text: &str, props: &TextProps, substitute: bool) -> Vec<Glyph> {
    text.char_indices()
        .map(|(cluster, ch)| Glyph {
            id: ch as u32,
            advance: advance(ch.width().unwrap_or(0), props),
            cluster,
            substituted: substitute && requires_complex_shaping(ch),
        })
        .collect()
}
