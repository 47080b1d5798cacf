//! 文本
//!
//! 包含：
//! - 文本格式（props）
//! - 字体注册表接口
//! - 分段引擎以及为每个 run 选择引擎的调度器

pub mod dispatch;
pub mod engine;
pub mod props;
pub mod registry;
pub mod segment;

pub use dispatch::{EngineCache, Segmenter, SegmenterStats};
pub use engine::EngineKind;
pub use props::{Align, Direction, FontId, ParaProps, TextProps, WsId};
pub use registry::{
    next_registry_id, EngineCaps, FontFace, FontRegistry, MemoryRegistry, ResolvedFace,
    SmartRules, WritingSystem,
};
pub use segment::{Glyph, Segment};

/// Characters that force a new line and may never appear inside a run:
/// the mandatory breaks of UAX #14.
pub fn is_hard_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}
