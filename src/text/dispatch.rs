//! 引擎选择和分段入口

use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock, RwLock};

use super::engine::{self, EngineKind};
use super::props::{FontId, TextProps, WsId};
use super::registry::{EngineCaps, FontRegistry, ResolvedFace, SmartRules};
use super::segment::Segment;
use super::is_hard_break;
use crate::core::error::ShapeError;

#[derive(Clone, Debug)]
enum Selection {
    Engine(EngineKind, Option<Arc<SmartRules>>),
    Unsupported,
}

/// Which registry answer a cached table belongs to: `(registry id, generation)`.
type Stamp = (u64, u64);

#[derive(Debug, Default)]
struct CacheState {
    stamp: Option<Stamp>,
    entries: FxHashMap<(FontId, WsId), Selection>,
}

/// Read-mostly `(font, ws) -> engine` table.
///
/// Entries are tagged with the registry and generation they were computed
/// against; the first lookup under any other stamp drops the whole table.
#[derive(Debug, Default)]
pub struct EngineCache {
    state: RwLock<CacheState>,
}

impl EngineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide table shared by segmenters that do not bring their own.
    pub fn global() -> Arc<EngineCache> {
        static GLOBAL: OnceLock<Arc<EngineCache>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(EngineCache::new())).clone()
    }

    pub fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.entries.clear();
        state.stamp = None;
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: (FontId, WsId), stamp: Stamp) -> Option<Selection> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if state.stamp != Some(stamp) {
            return None;
        }
        state.entries.get(&key).cloned()
    }

    fn put(&self, key: (FontId, WsId), stamp: Stamp, selection: Selection) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.stamp != Some(stamp) {
            if let Some((old_registry, old_generation)) = state.stamp {
                tracing::debug!(
                    old_registry,
                    old_generation,
                    registry = stamp.0,
                    generation = stamp.1,
                    "engine cache reset: registry changed"
                );
            }
            state.entries.clear();
            state.stamp = Some(stamp);
        }
        state.entries.insert(key, selection);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SegmenterStats {
    /// Runs shaped by their selected engine.
    pub shaped: u64,
    pub fallbacks: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

pub struct Segmenter {
    registry: Box<dyn FontRegistry>,
    cache: Arc<EngineCache>,
    stats: SegmenterStats,
}

impl std::fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segmenter")
            .field("registry", &self.registry.id())
            .field("generation", &self.registry.generation())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Segmenter {
    pub fn new(registry: impl FontRegistry + 'static) -> Self {
        Self::with_cache(registry, EngineCache::global())
    }

    pub fn with_cache(registry: impl FontRegistry + 'static, cache: Arc<EngineCache>) -> Self {
        Self {
            registry: Box::new(registry),
            cache,
            stats: SegmenterStats::default(),
        }
    }

    pub fn registry(&self) -> &dyn FontRegistry {
        self.registry.as_ref()
    }

    /// Swaps the registry and drops every cached selection.
    pub fn replace_registry(&mut self, registry: impl FontRegistry + 'static) {
        self.registry = Box::new(registry);
        self.cache.invalidate();
    }

    pub fn cache(&self) -> &Arc<EngineCache> {
        &self.cache
    }

    pub fn stats(&self) -> SegmenterStats {
        self.stats
    }

    pub fn select(&mut self, font: FontId, ws: WsId) -> Result<EngineKind, ShapeError> {
        match self.selection(font, ws) {
            Selection::Engine(kind, _) => Ok(kind),
            Selection::Unsupported => Err(ShapeError::Unsupported { font, ws }),
        }
    }

    fn selection(&mut self, font: FontId, ws: WsId) -> Selection {
        let stamp = (self.registry.id(), self.registry.generation());
        if let Some(hit) = self.cache.get((font, ws), stamp) {
            self.stats.cache_hits += 1;
            return hit;
        }
        self.stats.cache_misses += 1;
        let selection = match self.registry.resolve(font, ws) {
            Some(face) => choose(&face),
            None => Selection::Unsupported,
        };
        tracing::debug!(font = font.0, ws = ws.0, ?selection, "engine selected");
        self.cache.put((font, ws), stamp, selection.clone());
        selection
    }

    /// Shapes one run. The run must not contain a hard line break.
    pub fn segment(&mut self, text: &str, props: &TextProps) -> Result<Segment, ShapeError> {
        if let Some((offset, _)) = text.char_indices().find(|&(_, c)| is_hard_break(c)) {
            return Err(ShapeError::HardBreakInRun { offset });
        }
        match self.selection(props.font, props.ws) {
            Selection::Engine(kind, rules) => {
                self.stats.shaped += 1;
                Ok(engine::shape(kind, text, props, rules.as_deref()))
            }
            Selection::Unsupported => Err(ShapeError::Unsupported {
                font: props.font,
                ws: props.ws,
            }),
        }
    }

    /// Like `segment`, but never fails: on error the run is drawn by the
    /// simple engine with substitutions flagged.
    pub fn segment_or_fallback(
        &mut self,
        text: &str,
        props: &TextProps,
    ) -> (Segment, Option<ShapeError>) {
        match self.segment(text, props) {
            Ok(segment) => (segment, None),
            Err(e) => {
                tracing::warn!(error = %e, len = text.len(), "shaping fell back to simple engine");
                self.stats.fallbacks += 1;
                (engine::shape_substituted(text, props), Some(e))
            }
        }
    }
}

fn choose(face: &ResolvedFace) -> Selection {
    if face.smart_enabled && face.caps.contains(EngineCaps::SMART) {
        if let Some(rules) = &face.rules {
            return Selection::Engine(EngineKind::Smart, Some(rules.clone()));
        }
    }
    if face.needs_complex {
        return if face.caps.contains(EngineCaps::COMPLEX) {
            Selection::Engine(EngineKind::Complex, None)
        } else {
            Selection::Unsupported
        };
    }
    if face.caps.contains(EngineCaps::SIMPLE) {
        Selection::Engine(EngineKind::Simple, None)
    } else if face.caps.contains(EngineCaps::COMPLEX) {
        Selection::Engine(EngineKind::Complex, None)
    } else {
        Selection::Unsupported
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/dispatch.rs"]
mod tests;
