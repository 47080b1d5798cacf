//! 分段层看到的字体 / 书写系统注册表
//!
//! 注册表是外部协作者；调度器只需要把 (字体, 书写系统) 解析成能力标志，
//! 以及带规则字体内嵌的整形规则。

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use std::ops::{BitOr, BitOrAssign};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::props::{FontId, WsId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct EngineCaps(u8);

impl EngineCaps {
    pub const NONE: Self = Self(0);
    pub const SIMPLE: Self = Self(1 << 0);
    pub const COMPLEX: Self = Self(1 << 1);
    pub const SMART: Self = Self(1 << 2);

    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EngineCaps {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EngineCaps {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Substitution rules embedded in a "smart" font: each pattern is replaced
/// by a single glyph, longest match first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmartRules {
    ligatures: Vec<(CompactString, u32)>,
}

impl SmartRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ligature(mut self, pattern: &str, glyph: u32) -> Self {
        if !pattern.is_empty() {
            self.ligatures.push((CompactString::from(pattern), glyph));
            self.ligatures
                .sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        }
        self
    }

    /// Longest rule matching at the start of `text`.
    pub fn match_at(&self, text: &str) -> Option<(usize, u32)> {
        self.ligatures
            .iter()
            .find(|(pattern, _)| text.starts_with(pattern.as_str()))
            .map(|(pattern, glyph)| (pattern.len(), *glyph))
    }

    pub fn len(&self) -> usize {
        self.ligatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ligatures.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct FontFace {
    pub name: CompactString,
    pub caps: EngineCaps,
    pub rules: Option<Arc<SmartRules>>,
}

impl FontFace {
    pub fn new(name: &str, caps: EngineCaps) -> Self {
        Self {
            name: CompactString::from(name),
            caps,
            rules: None,
        }
    }

    pub fn with_rules(mut self, rules: SmartRules) -> Self {
        self.caps |= EngineCaps::SMART;
        self.rules = Some(Arc::new(rules));
        self
    }
}

#[derive(Clone, Debug)]
pub struct WritingSystem {
    pub name: CompactString,
    /// Needs contextual reordering/reshaping.
    pub complex: bool,
    pub rtl: bool,
    /// Lets rule-carrying fonts use the smart engine. Off unless asked for.
    pub smart_enabled: bool,
}

impl WritingSystem {
    pub fn simple(name: &str) -> Self {
        Self {
            name: CompactString::from(name),
            complex: false,
            rtl: false,
            smart_enabled: false,
        }
    }

    pub fn complex(name: &str, rtl: bool) -> Self {
        Self {
            name: CompactString::from(name),
            complex: true,
            rtl,
            smart_enabled: false,
        }
    }

    pub fn with_smart(mut self, enabled: bool) -> Self {
        self.smart_enabled = enabled;
        self
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedFace {
    pub caps: EngineCaps,
    pub needs_complex: bool,
    pub rtl: bool,
    pub smart_enabled: bool,
    pub rules: Option<Arc<SmartRules>>,
}

pub trait FontRegistry {
    /// Distinguishes registry instances; generations are only comparable
    /// between answers from the same id.
    fn id(&self) -> u64;

    /// `None` when either the font or the writing system is unknown.
    fn resolve(&self, font: FontId, ws: WsId) -> Option<ResolvedFace>;

    /// Bumped whenever any font or writing-system definition changes.
    fn generation(&self) -> u64;
}

/// Hands out registry ids; 0 is never issued.
pub fn next_registry_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
pub struct MemoryRegistry {
    id: u64,
    fonts: FxHashMap<FontId, FontFace>,
    systems: FxHashMap<WsId, WritingSystem>,
    generation: u64,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self {
            id: next_registry_id(),
            fonts: FxHashMap::default(),
            systems: FxHashMap::default(),
            generation: 0,
        }
    }
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Font 0 / ws 0 as a plain Latin setup; handy for documents that never
    /// mention fonts.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_font(
            FontId(0),
            FontFace::new("Serif", EngineCaps::SIMPLE | EngineCaps::COMPLEX),
        );
        registry.register_ws(WsId(0), WritingSystem::simple("en"));
        registry
    }

    pub fn register_font(&mut self, id: FontId, face: FontFace) {
        self.fonts.insert(id, face);
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn register_ws(&mut self, id: WsId, ws: WritingSystem) {
        self.systems.insert(id, ws);
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn remove_font(&mut self, id: FontId) -> Option<FontFace> {
        let removed = self.fonts.remove(&id);
        if removed.is_some() {
            self.generation = self.generation.wrapping_add(1);
        }
        removed
    }

    /// Returns false when the writing system is unknown.
    pub fn set_smart_enabled(&mut self, id: WsId, enabled: bool) -> bool {
        let Some(system) = self.systems.get_mut(&id) else {
            return false;
        };
        if system.smart_enabled != enabled {
            system.smart_enabled = enabled;
            self.generation = self.generation.wrapping_add(1);
        }
        true
    }

    pub fn font(&self, id: FontId) -> Option<&FontFace> {
        self.fonts.get(&id)
    }

    pub fn ws(&self, id: WsId) -> Option<&WritingSystem> {
        self.systems.get(&id)
    }
}

impl FontRegistry for MemoryRegistry {
    fn resolve(&self, font: FontId, ws: WsId) -> Option<ResolvedFace> {
        let face = self.fonts.get(&font)?;
        let system = self.systems.get(&ws)?;
        Some(ResolvedFace {
            caps: face.caps,
            needs_complex: system.complex,
            rtl: system.rtl,
            smart_enabled: system.smart_enabled,
            rules: face.rules.clone(),
        })
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}
