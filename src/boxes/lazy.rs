//! 懒加载盒子：尚未构建的序列项的占位符
//!
//! 状态流转：`Placeholder -> Materializing -> Materialized`。最后一个状态
//! 没有自己的盒子：占位符被原地替换为各项的盒子，只记住它的 id，
//! 所以对同一盒子的第二次请求什么也不做。

use std::ops::Range;

use super::{BoxId, BoxKind, BoxTree};
use crate::core::error::BuildError;
use crate::core::geom::Rect;
use crate::data::{AttrTag, ObjectHandle};
use crate::view::Frag;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LazyState {
    Placeholder,
    Materializing,
    Materialized,
}

/// What to build: items `items` of sequence `tag` on `object`, each shown
/// with `frag`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LazyToken {
    pub object: ObjectHandle,
    pub tag: AttrTag,
    pub frag: Frag,
    pub items: Range<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LazyBox {
    pub token: LazyToken,
    pub estimated_height: i32,
    pub state: LazyState,
}

impl LazyBox {
    pub fn new(token: LazyToken, estimated_height: i32) -> Self {
        Self {
            token,
            estimated_height,
            state: LazyState::Placeholder,
        }
    }
}

impl BoxTree {
    pub fn lazy_state(&self, id: BoxId) -> Option<LazyState> {
        match self.kind(id) {
            Some(BoxKind::Lazy(l)) => Some(l.state),
            Some(_) => None,
            None => self
                .materialized
                .contains(&id)
                .then_some(LazyState::Materialized),
        }
    }

    /// Moves a placeholder to `Materializing` and hands back its token.
    /// `Ok(None)` when there is nothing to do.
    pub(crate) fn begin_materializing(
        &mut self,
        id: BoxId,
    ) -> Result<Option<LazyToken>, BuildError> {
        if self.materialized.contains(&id) {
            return Ok(None);
        }
        match self.get_mut(id).map(|n| &mut n.kind) {
            Some(BoxKind::Lazy(lazy)) => match lazy.state {
                LazyState::Placeholder => {
                    lazy.state = LazyState::Materializing;
                    Ok(Some(lazy.token.clone()))
                }
                LazyState::Materializing | LazyState::Materialized => Ok(None),
            },
            Some(_) => Err(BuildError::NotLazy(id)),
            None => Err(BuildError::UnknownBox(id)),
        }
    }

    pub(crate) fn finish_materializing(&mut self, id: BoxId) {
        self.materialized.insert(id);
    }

    pub fn materialized_count(&self) -> usize {
        self.materialized.len()
    }

    /// Lazy placeholders in document order.
    pub fn lazy_boxes(&self) -> Vec<BoxId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| matches!(self.kind(*id), Some(BoxKind::Lazy(_))))
            .collect()
    }

    pub fn lazy_boxes_in(&self, window: Rect) -> Vec<BoxId> {
        self.lazy_boxes()
            .into_iter()
            .filter(|id| self.abs_rect(*id).intersects(window))
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/boxes/lazy.rs"]
mod tests;
