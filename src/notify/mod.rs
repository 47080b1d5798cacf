//! 通知索引：哪些盒子范围显示了哪个属性
//!
//! 每个被显示的属性出现拥有一个通知器。通知器记录一段连续的兄弟盒子
//! （`BoxRange`）以及构建它时所在的父通知器，由此可以得到回到根的构建路径。
//! 三张辅助表负责反向查询：
//!
//! * `by_attr`: `(object, tag)` → 按文档顺序排列的通知器，列表下标就是出现序号；
//! * `by_box`: 盒子 → 直接包含它的通知器；
//! * `by_parent`: 容器盒子 → 范围位于其中的通知器。
//!
//! 下面的操作同时更新这四个结构；`verify` 检查它们彼此一致并与盒子树一致。

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};

use crate::boxes::{BoxId, BoxTree};
use crate::core::error::IndexError;
use crate::data::{AttrTag, ObjectHandle};
use crate::text::TextProps;
use crate::view::Frag;

new_key_type! { pub struct NotifierId; }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NotifierKey {
    pub object: ObjectHandle,
    pub tag: AttrTag,
    /// 1-based, in document order.
    pub occurrence: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoxRange {
    pub parent: BoxId,
    pub start: usize,
    pub len: usize,
}

impl BoxRange {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// How the attribute was displayed, so it can be displayed again in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropKind {
    String,
    Int,
    Object { frag: Frag },
    Sequence { frag: Frag },
    LazySequence { frag: Frag },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropRecipe {
    pub kind: PropKind,
    /// Props in effect when the attribute was first displayed.
    pub props: TextProps,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notifier {
    pub object: ObjectHandle,
    pub tag: AttrTag,
    pub range: BoxRange,
    pub parent: Option<NotifierId>,
    /// Index of `object` inside the parent notifier's attribute.
    pub index_in_parent: usize,
    pub recipe: PropRecipe,
}

#[derive(Debug, Default)]
pub struct NotifierIndex {
    notifiers: SlotMap<NotifierId, Notifier>,
    by_attr: FxHashMap<(ObjectHandle, AttrTag), Vec<NotifierId>>,
    by_box: FxHashMap<BoxId, Vec<NotifierId>>,
    by_parent: FxHashMap<BoxId, Vec<NotifierId>>,
    kids: FxHashMap<NotifierId, Vec<NotifierId>>,
}

impl NotifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn get(&self, id: NotifierId) -> Option<&Notifier> {
        self.notifiers.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NotifierId, &Notifier)> {
        self.notifiers.iter()
    }

    /// Opens a notifier whose range starts at child `start` of `parent`.
    /// The length is filled in by `complete`.
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        &mut self,
        object: ObjectHandle,
        tag: AttrTag,
        parent: BoxId,
        start: usize,
        parent_notifier: Option<NotifierId>,
        index_in_parent: usize,
        recipe: PropRecipe,
    ) -> NotifierId {
        let id = self.notifiers.insert(Notifier {
            object,
            tag,
            range: BoxRange {
                parent,
                start,
                len: 0,
            },
            parent: parent_notifier,
            index_in_parent,
            recipe,
        });
        self.by_attr.entry((object, tag)).or_default().push(id);
        self.by_parent.entry(parent).or_default().push(id);
        if let Some(p) = parent_notifier {
            self.kids.entry(p).or_default().push(id);
        }
        id
    }

    pub fn complete(&mut self, id: NotifierId, len: usize, tree: &BoxTree) {
        let Some(n) = self.notifiers.get_mut(id) else {
            return;
        };
        n.range.len = len;
        let range = n.range;
        let children = tree.children(range.parent);
        let end = range.end().min(children.len());
        for &b in children.get(range.start..end).unwrap_or(&[]) {
            self.by_box.entry(b).or_default().push(id);
        }
    }

    pub fn lookup(&self, object: ObjectHandle, tag: AttrTag) -> &[NotifierId] {
        self.by_attr
            .get(&(object, tag))
            .map_or(&[], |v| v.as_slice())
    }

    /// Notifiers for `repeat` occurrences starting at the 1-based
    /// `occurrence`, clamped to what is displayed.
    pub fn occurrences(
        &self,
        object: ObjectHandle,
        tag: AttrTag,
        occurrence: u32,
        repeat: u32,
    ) -> Vec<NotifierId> {
        if occurrence == 0 || repeat == 0 {
            return Vec::new();
        }
        let list = self.lookup(object, tag);
        let start = (occurrence - 1) as usize;
        let end = start.saturating_add(repeat as usize).min(list.len());
        list.get(start..end).map_or_else(Vec::new, |s| s.to_vec())
    }

    pub fn occurrence_of(&self, id: NotifierId) -> Option<u32> {
        let n = self.notifiers.get(id)?;
        let pos = self.lookup(n.object, n.tag).iter().position(|x| *x == id)?;
        Some(pos as u32 + 1)
    }

    /// 1-based position of `id` among the displays of its attribute made by
    /// the same enclosing notifier.
    pub fn sibling_ordinal(&self, id: NotifierId) -> Option<u32> {
        let n = self.notifiers.get(id)?;
        let mut ordinal = 0;
        for other in self.lookup(n.object, n.tag) {
            if self.notifiers.get(*other).map(|o| o.parent) == Some(n.parent) {
                ordinal += 1;
            }
            if *other == id {
                return Some(ordinal);
            }
        }
        None
    }

    pub fn key_of(&self, id: NotifierId) -> Option<NotifierKey> {
        let n = self.notifiers.get(id)?;
        Some(NotifierKey {
            object: n.object,
            tag: n.tag,
            occurrence: self.occurrence_of(id)?,
        })
    }

    pub fn range_for(&self, key: NotifierKey) -> Option<BoxRange> {
        let id = *self
            .occurrences(key.object, key.tag, key.occurrence, 1)
            .first()?;
        self.notifiers.get(id).map(|n| n.range)
    }

    /// `id` followed by its enclosing notifiers, innermost first.
    pub fn chain(&self, id: NotifierId) -> Vec<NotifierId> {
        let mut out = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            let Some(n) = self.notifiers.get(c) else {
                break;
            };
            out.push(c);
            cur = n.parent;
        }
        out
    }

    /// True when `ancestor` strictly encloses `id`.
    pub fn is_ancestor(&self, ancestor: NotifierId, id: NotifierId) -> bool {
        ancestor != id && self.chain(id).contains(&ancestor)
    }

    /// Nearest notifier enclosing both, if any.
    pub fn common_ancestor(&self, a: NotifierId, b: NotifierId) -> Option<NotifierId> {
        let chain_b: FxHashSet<NotifierId> = self.chain(b).into_iter().collect();
        self.chain(a).into_iter().find(|n| chain_b.contains(n))
    }

    /// `id` and everything built inside it, parents before children.
    pub fn descendants(&self, id: NotifierId) -> Vec<NotifierId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if !self.notifiers.contains_key(cur) {
                continue;
            }
            out.push(cur);
            if let Some(kids) = self.kids.get(&cur) {
                stack.extend(kids.iter().rev().copied());
            }
        }
        out
    }

    pub fn directly_containing(&self, b: BoxId) -> &[NotifierId] {
        self.by_box.get(&b).map_or(&[], |v| v.as_slice())
    }

    /// Innermost notifier whose range holds `b` or one of its ancestors.
    pub fn innermost_for_box(&self, tree: &BoxTree, b: BoxId) -> Option<NotifierId> {
        let mut cur = Some(b);
        while let Some(c) = cur {
            let direct = self.directly_containing(c);
            if let Some(best) = direct.iter().copied().max_by_key(|n| self.chain(*n).len()) {
                return Some(best);
            }
            cur = tree.parent(c);
        }
        None
    }

    pub fn key_for_box(&self, tree: &BoxTree, b: BoxId) -> Option<NotifierKey> {
        self.key_of(self.innermost_for_box(tree, b)?)
    }

    /// Drops `id` and every notifier nested in it. Returns the attribute
    /// keys that lost a notifier.
    pub fn remove_subtree(&mut self, id: NotifierId) -> Vec<(ObjectHandle, AttrTag)> {
        let doomed = self.descendants(id);
        let mut keys = Vec::with_capacity(doomed.len());
        for nid in doomed.iter().rev() {
            let Some(n) = self.notifiers.remove(*nid) else {
                continue;
            };
            keys.push((n.object, n.tag));
            if let Some(list) = self.by_attr.get_mut(&(n.object, n.tag)) {
                list.retain(|x| x != nid);
                if list.is_empty() {
                    self.by_attr.remove(&(n.object, n.tag));
                }
            }
            if let Some(list) = self.by_parent.get_mut(&n.range.parent) {
                list.retain(|x| x != nid);
                if list.is_empty() {
                    self.by_parent.remove(&n.range.parent);
                }
            }
            if let Some(p) = n.parent {
                if let Some(list) = self.kids.get_mut(&p) {
                    list.retain(|x| x != nid);
                }
            }
            self.kids.remove(nid);
        }
        let gone: FxHashSet<NotifierId> = doomed.into_iter().collect();
        self.by_box.retain(|_, list| {
            list.retain(|x| !gone.contains(x));
            !list.is_empty()
        });
        keys
    }

    /// Forgets freed boxes, both as range members and as range parents.
    pub fn forget_boxes(&mut self, boxes: &[BoxId]) {
        for b in boxes {
            self.by_box.remove(b);
            self.by_parent.remove(b);
        }
    }

    /// Notifiers ranged directly inside `parent`.
    pub fn ranged_in(&self, parent: BoxId) -> Vec<NotifierId> {
        self.by_parent.get(&parent).cloned().unwrap_or_default()
    }

    /// Accounts for children `start..start + old_len` of `parent` having
    /// been replaced by `new_len` fresh ones. `enclosing` and its ancestors
    /// ranged in `parent` grow or shrink and take the fresh boxes; the
    /// others after the splice point shift. Notifiers in `fresh` were built
    /// against the new children and are left alone.
    pub fn splice(
        &mut self,
        tree: &BoxTree,
        parent: BoxId,
        start: usize,
        old_len: usize,
        new_len: usize,
        enclosing: Option<NotifierId>,
        fresh: &FxHashSet<NotifierId>,
    ) {
        let containing: FxHashSet<NotifierId> = enclosing
            .map(|e| self.chain(e).into_iter().collect())
            .unwrap_or_default();
        let new_boxes: Vec<BoxId> = tree
            .children(parent)
            .get(start..start + new_len)
            .map_or_else(Vec::new, |s| s.to_vec());

        for nid in self.ranged_in(parent) {
            if fresh.contains(&nid) {
                continue;
            }
            let Some(n) = self.notifiers.get_mut(nid) else {
                continue;
            };
            if containing.contains(&nid) {
                n.range.len = n.range.len + new_len - old_len;
                for b in &new_boxes {
                    let list = self.by_box.entry(*b).or_default();
                    if !list.contains(&nid) {
                        list.push(nid);
                    }
                }
            } else if n.range.start >= start + old_len {
                n.range.start = n.range.start + new_len - old_len;
            }
        }
    }

    fn doc_position(&self, tree: &BoxTree, id: NotifierId) -> Vec<usize> {
        let Some(n) = self.notifiers.get(id) else {
            return Vec::new();
        };
        let mut pos = tree.path(n.range.parent);
        pos.push(n.range.start);
        pos
    }

    /// Re-sorts the occurrence lists of `keys` into document order.
    pub fn reorder(&mut self, tree: &BoxTree, keys: &[(ObjectHandle, AttrTag)]) {
        let keys: FxHashSet<(ObjectHandle, AttrTag)> = keys.iter().copied().collect();
        for key in keys {
            let Some(list) = self.by_attr.get(&key) else {
                continue;
            };
            let mut keyed: Vec<(Vec<usize>, usize, NotifierId)> = list
                .iter()
                .map(|id| (self.doc_position(tree, *id), self.chain(*id).len(), *id))
                .collect();
            keyed.sort();
            let sorted = keyed.into_iter().map(|(_, _, id)| id).collect();
            self.by_attr.insert(key, sorted);
        }
    }

    /// Checks the index against itself and against `tree`.
    pub fn verify(&self, tree: &BoxTree) -> Result<(), IndexError> {
        for (id, n) in self.notifiers.iter() {
            let r = n.range;
            if !tree.contains(r.parent) {
                return Err(IndexError::DeadBox { box_id: r.parent });
            }
            if !tree.is_reachable(r.parent) {
                return Err(IndexError::Unreachable { box_id: r.parent });
            }
            if r.len == 0 {
                return Err(IndexError::EmptyRange { object: n.object });
            }
            let children = tree.children(r.parent);
            if r.end() > children.len() {
                return Err(IndexError::RangeOutOfBounds {
                    parent: r.parent,
                    start: r.start,
                    len: r.len,
                    children: children.len(),
                });
            }
            for b in &children[r.start..r.end()] {
                if !self.directly_containing(*b).contains(&id) {
                    return Err(IndexError::MissingBoxEntry { box_id: *b });
                }
            }
            if !self
                .by_parent
                .get(&r.parent)
                .is_some_and(|l| l.contains(&id))
            {
                return Err(IndexError::MissingBoxEntry { box_id: r.parent });
            }
            if let Some(p) = n.parent {
                let Some(pn) = self.notifiers.get(p) else {
                    return Err(IndexError::ParentMismatch { object: n.object });
                };
                let pr = pn.range;
                let inside = if pr.parent == r.parent {
                    r.start >= pr.start && r.end() <= pr.end()
                } else {
                    tree.children(pr.parent)
                        .get(pr.start..pr.end())
                        .unwrap_or(&[])
                        .iter()
                        .any(|b| tree.is_ancestor_or_self(*b, r.parent))
                };
                if !inside {
                    return Err(IndexError::ParentMismatch { object: n.object });
                }
            }
        }

        for (b, list) in &self.by_box {
            for nid in list {
                let Some(n) = self.notifiers.get(*nid) else {
                    return Err(IndexError::StaleBoxEntry { box_id: *b });
                };
                let r = n.range;
                let holds = tree
                    .children(r.parent)
                    .get(r.start..r.end())
                    .is_some_and(|s| s.contains(b));
                if !holds {
                    return Err(IndexError::StaleBoxEntry { box_id: *b });
                }
            }
        }

        for ((object, _), list) in &self.by_attr {
            let positions: Vec<Vec<usize>> =
                list.iter().map(|id| self.doc_position(tree, *id)).collect();
            if positions.windows(2).any(|w| w[0] > w[1]) {
                return Err(IndexError::OccurrenceOrder { object: *object });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/notify/index.rs"]
mod tests;
