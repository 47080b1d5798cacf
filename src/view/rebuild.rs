//! 构建路径，以及单个属性出现的局部重建

use rustc_hash::FxHashSet;

use super::env::{BuildSite, ViewEnv};
use super::root::RootBox;
use crate::boxes::BoxTree;
use crate::core::error::{BuildError, PathError};
use crate::data::{AttrTag, DataAccess, ObjectHandle};
use crate::notify::{NotifierId, NotifierIndex};
use crate::text::TextProps;

/// One step of a build path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildRecord {
    pub object: ObjectHandle,
    /// Where `object` sits in the attribute of the previous record.
    pub index: usize,
    pub tag: AttrTag,
    /// Repeat count on the last record; elsewhere the ordinal of this
    /// display among the repeats inside the same enclosing occurrence.
    pub count: u32,
}

/// Records from the display root down to a changed occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildPath {
    pub records: Vec<BuildRecord>,
}

impl BuildPath {
    pub fn for_notifier(index: &NotifierIndex, target: NotifierId, repeat: u32) -> Option<Self> {
        let chain = index.chain(target);
        let mut records = Vec::with_capacity(chain.len());
        for (depth, id) in chain.iter().enumerate().rev() {
            let n = index.get(*id)?;
            let count = if depth == 0 {
                repeat
            } else {
                index.sibling_ordinal(*id)?
            };
            records.push(BuildRecord {
                object: n.object,
                index: n.index_in_parent,
                tag: n.tag,
                count,
            });
        }
        (!records.is_empty()).then_some(Self { records })
    }

    /// Checks the path against the current data: it starts at `root`,
    /// every object still exists, and each one is still found where the
    /// previous record's attribute showed it.
    pub fn validate(&self, data: &dyn DataAccess, root: ObjectHandle) -> Result<(), PathError> {
        let first = self.records.first().ok_or(PathError::Empty)?;
        if first.object != root {
            return Err(PathError::NotRoot {
                object: first.object,
            });
        }
        for (i, rec) in self.records.iter().enumerate() {
            if !data.contains(rec.object) {
                return Err(PathError::MissingObject { object: rec.object });
            }
            if i == 0 {
                continue;
            }
            let parent = &self.records[i - 1];
            if data.object_at(parent.object, parent.tag, rec.index) != Some(rec.object) {
                return Err(PathError::Moved {
                    object: rec.object,
                    index: rec.index,
                });
            }
        }
        Ok(())
    }
}

/// A queued change notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebuildRequest {
    pub object: ObjectHandle,
    pub tag: AttrTag,
    pub occurrence: u32,
    pub repeat: u32,
}

/// Sent to subscribers after every batch and every materialization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RebuildEvent {
    pub batch: u64,
    pub full_rebuild: bool,
    /// Attribute occurrences rebuilt in place.
    pub rebuilt: usize,
    pub materialized: usize,
    /// Boxes laid out again.
    pub relaid: usize,
}

/// True when some box of `a`'s range holds `b`'s range.
fn covers(index: &NotifierIndex, tree: &BoxTree, a: NotifierId, b: NotifierId) -> bool {
    let (Some(na), Some(nb)) = (index.get(a), index.get(b)) else {
        return false;
    };
    let (ra, rb) = (na.range, nb.range);
    if ra.parent == rb.parent {
        return ra.start < rb.end() && rb.start < ra.end();
    }
    tree.children(ra.parent)
        .get(ra.start..ra.end())
        .unwrap_or(&[])
        .iter()
        .any(|x| tree.is_ancestor_or_self(*x, rb.parent))
}

/// Reduces a batch to disjoint targets. Nested targets fold into their
/// ancestor; overlapping unrelated ones merge to their nearest common
/// notifier. `None` means only a full rebuild covers the batch.
pub(crate) fn coalesce(
    index: &NotifierIndex,
    tree: &BoxTree,
    mut targets: Vec<NotifierId>,
) -> Option<Vec<NotifierId>> {
    loop {
        let mut seen = FxHashSet::default();
        targets.retain(|t| seen.insert(*t));
        targets.retain(|t| !index.chain(*t).iter().skip(1).any(|a| seen.contains(a)));

        let mut overlap = None;
        'scan: for (i, a) in targets.iter().enumerate() {
            for b in &targets[i + 1..] {
                if covers(index, tree, *a, *b) || covers(index, tree, *b, *a) {
                    overlap = Some((*a, *b));
                    break 'scan;
                }
            }
        }
        let Some((a, b)) = overlap else {
            return Some(targets);
        };
        let common = index.common_ancestor(a, b)?;
        tracing::debug!(?a, ?b, ?common, "merging overlapping rebuild targets");
        targets.retain(|t| *t != a && *t != b);
        targets.push(common);
    }
}

impl<D: DataAccess> RootBox<D> {
    /// Discards the boxes and nested notifiers of `target` and shows the
    /// attribute again in the same slot.
    pub(super) fn rebuild_target(&mut self, target: NotifierId) -> Result<(), BuildError> {
        let Some(n) = self.index.get(target).cloned() else {
            return Ok(());
        };
        let range = n.range;
        let depth = n.parent.map_or(0, |p| self.index.chain(p).len());

        let mut keys = self.index.remove_subtree(target);
        let freed = self.tree.remove_range(range.parent, range.start, range.len);
        self.index.forget_boxes(&freed);

        let (fresh, touched, new_len) = {
            let site = BuildSite {
                data: &self.data,
                vc: self.vc.as_ref(),
                settings: &self.settings,
                parent: range.parent,
                at: range.start,
                props: n.recipe.props.clone(),
                width: self.width.unwrap_or(0),
                depth,
            };
            let mut env = ViewEnv::new(&mut self.tree, &mut self.index, site);
            env.redisplay(n.object, n.tag, &n.recipe, n.parent, n.index_in_parent)?;
            let fresh: FxHashSet<NotifierId> = env.created().iter().copied().collect();
            (fresh, env.touched().to_vec(), env.inserted())
        };

        self.index.splice(
            &self.tree,
            range.parent,
            range.start,
            range.len,
            new_len,
            n.parent,
            &fresh,
        );
        keys.extend(touched);
        self.index.reorder(&self.tree, &keys);
        tracing::debug!(
            object = %n.object,
            tag = n.tag.0,
            old = range.len,
            new = new_len,
            freed = freed.len(),
            "attribute rebuilt in place"
        );
        Ok(())
    }

    /// Builds the whole view into fresh structures and swaps them in. On
    /// failure the view is left empty but consistent.
    pub(super) fn full_rebuild(&mut self) -> Result<(), BuildError> {
        let mut tree = BoxTree::new();
        let mut index = NotifierIndex::new();
        let built = {
            let site = BuildSite {
                data: &self.data,
                vc: self.vc.as_ref(),
                settings: &self.settings,
                parent: tree.root(),
                at: 0,
                props: TextProps::default().with_size(self.settings.default_font_size),
                width: self.width.unwrap_or(0),
                depth: 0,
            };
            let mut env = ViewEnv::new(&mut tree, &mut index, site);
            env.display_root(self.root_object, self.root_frag)
        };
        match built {
            Ok(()) => {
                tracing::info!(
                    root = %self.root_object,
                    boxes = tree.len(),
                    notifiers = index.len(),
                    "full rebuild"
                );
                self.tree = tree;
                self.index = index;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(root = %self.root_object, error = %e, "full rebuild failed, view cleared");
                self.tree = BoxTree::new();
                self.index = NotifierIndex::new();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/rebuild.rs"]
mod tests;
