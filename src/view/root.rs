//! 显示会话：数据、视图构造器、盒子树和通知索引由同一个 `&mut` 所有者持有

use std::sync::mpsc;

use rustc_hash::FxHashSet;

use super::constructor::{Frag, ViewConstructor};
use super::env::{BuildSite, ViewEnv};
use super::rebuild::{coalesce, BuildPath, RebuildEvent, RebuildRequest};
use crate::boxes::{BoxId, BoxTree, Constraints, Hit, LayoutCx, LazyState};
use crate::core::error::{BuildError, IndexError, LayoutError, ViewError};
use crate::core::geom::{Point, Rect, Size};
use crate::data::{AttrTag, ChangeEvent, DataAccess, ObjectHandle};
use crate::notify::{BoxRange, NotifierIndex, NotifierKey};
use crate::paint::Painter;
use crate::settings::ViewSettings;
use crate::text::{FontRegistry, Segmenter, TextProps};

pub struct RootBox<D: DataAccess> {
    pub(super) data: D,
    pub(super) vc: Box<dyn ViewConstructor>,
    pub(super) root_object: ObjectHandle,
    pub(super) root_frag: Frag,
    pub(super) tree: BoxTree,
    pub(super) index: NotifierIndex,
    pub(super) segmenter: Segmenter,
    pub(super) settings: ViewSettings,
    pub(super) width: Option<i32>,
    queue: Vec<RebuildRequest>,
    subscribers: Vec<mpsc::Sender<RebuildEvent>>,
    batches: u64,
}

impl<D: DataAccess> RootBox<D> {
    /// Builds the whole view of `root` shown with `frag`.
    pub fn new(
        data: D,
        vc: impl ViewConstructor + 'static,
        root: ObjectHandle,
        frag: Frag,
        segmenter: Segmenter,
        settings: ViewSettings,
    ) -> Result<Self, BuildError> {
        let mut view = Self {
            data,
            vc: Box::new(vc),
            root_object: root,
            root_frag: frag,
            tree: BoxTree::new(),
            index: NotifierIndex::new(),
            segmenter,
            settings,
            width: None,
            queue: Vec::new(),
            subscribers: Vec::new(),
            batches: 0,
        };
        view.full_rebuild()?;
        Ok(view)
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Changes made here reach the view only through `request_rebuild` or
    /// `apply_changes`.
    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    pub fn tree(&self) -> &BoxTree {
        &self.tree
    }

    pub fn index(&self) -> &NotifierIndex {
        &self.index
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Swaps the font registry and reshapes every run against it. Returns
    /// how many boxes were laid out again.
    pub fn replace_registry(
        &mut self,
        registry: impl FontRegistry + 'static,
    ) -> Result<usize, LayoutError> {
        self.segmenter.replace_registry(registry);
        let runs = self.tree.discard_segments();
        tracing::info!(runs, "font registry replaced");
        self.relayout()
    }

    pub fn width(&self) -> Option<i32> {
        self.width
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<RebuildEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn layout(&mut self, width: i32) -> Result<Size, LayoutError> {
        let mut cx = LayoutCx::new(&mut self.segmenter, &self.settings);
        let root = self.tree.root();
        let size = self.tree.layout(&mut cx, root, Constraints::width(width))?;
        self.width = Some(width);
        Ok(size)
    }

    /// Lays out whatever changed since the last layout, at the last width.
    /// Returns how many boxes were laid out again.
    fn relayout(&mut self) -> Result<usize, LayoutError> {
        let Some(width) = self.width else {
            return Ok(0);
        };
        let root = self.tree.root();
        let clean = self
            .tree
            .get(root)
            .is_some_and(|n| !n.dirty && n.constraint == Some(width));
        let mut cx = LayoutCx::new(&mut self.segmenter, &self.settings);
        if clean {
            Ok(self.tree.relayout_dirty(&mut cx)?.len())
        } else {
            self.tree.layout(&mut cx, root, Constraints::width(width))?;
            Ok(self.tree.len())
        }
    }

    fn emit(&mut self, event: &RebuildEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // -- change notifications -------------------------------------------

    /// Queues a rebuild of `repeat` displayed occurrences of `tag` on
    /// `object`, starting at the 1-based `occurrence`. `false` when none of
    /// them is displayed.
    pub fn request_rebuild(
        &mut self,
        object: ObjectHandle,
        tag: AttrTag,
        occurrence: u32,
        repeat: u32,
    ) -> bool {
        if self
            .index
            .occurrences(object, tag, occurrence, repeat)
            .is_empty()
        {
            tracing::debug!(%object, tag = tag.0, occurrence, "change not displayed");
            return false;
        }
        self.queue.push(RebuildRequest {
            object,
            tag,
            occurrence,
            repeat,
        });
        true
    }

    pub fn has_pending_rebuilds(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Queues every event and runs one batch.
    pub fn apply_changes(&mut self, events: &[ChangeEvent]) -> Result<Option<RebuildEvent>, ViewError> {
        for e in events {
            self.request_rebuild(e.object, e.tag, e.occurrence, e.repeat);
        }
        self.flush_rebuilds()
    }

    /// Runs the queued requests as one batch. `Ok(None)` when nothing was
    /// queued.
    pub fn flush_rebuilds(&mut self) -> Result<Option<RebuildEvent>, ViewError> {
        if self.queue.is_empty() {
            return Ok(None);
        }
        let requests = std::mem::take(&mut self.queue);
        self.batches += 1;

        let mut full = false;
        let mut targets = Vec::new();
        'resolve: for req in &requests {
            for target in self
                .index
                .occurrences(req.object, req.tag, req.occurrence, req.repeat)
            {
                let checked = BuildPath::for_notifier(&self.index, target, req.repeat)
                    .map(|path| path.validate(&self.data, self.root_object));
                match checked {
                    Some(Ok(())) => targets.push(target),
                    Some(Err(e)) => {
                        tracing::warn!(object = %req.object, tag = req.tag.0, error = %e, "stale build path");
                        full = true;
                        break 'resolve;
                    }
                    None => {
                        full = true;
                        break 'resolve;
                    }
                }
            }
        }

        let mut rebuilt = 0;
        if !full {
            match coalesce(&self.index, &self.tree, targets) {
                Some(targets) => {
                    tracing::debug!(batch = self.batches, targets = targets.len(), "rebuild batch");
                    for target in targets {
                        if let Err(e) = self.rebuild_target(target) {
                            tracing::warn!(error = %e, "partial rebuild failed");
                            full = true;
                            break;
                        }
                        rebuilt += 1;
                    }
                }
                None => full = true,
            }
        }
        if !full && self.settings.verify_after_rebuild {
            if let Err(e) = self.index.verify(&self.tree) {
                tracing::warn!(error = %e, "index inconsistent after rebuild");
                full = true;
            }
        }

        let mut failure = None;
        if full {
            rebuilt = 0;
            failure = self.full_rebuild().err();
        }
        let relaid = self.relayout()?;
        if let Some(e) = failure {
            return Err(e.into());
        }
        let event = RebuildEvent {
            batch: self.batches,
            full_rebuild: full,
            rebuilt,
            materialized: 0,
            relaid,
        };
        self.emit(&event);
        Ok(Some(event))
    }

    // -- lazy boxes -----------------------------------------------------

    /// Replaces the lazy box `id` by the items it stands for. `Ok(false)`
    /// when it was already materialized or is being materialized.
    pub fn materialize(&mut self, id: BoxId) -> Result<bool, ViewError> {
        let Some(token) = self.tree.begin_materializing(id)? else {
            return Ok(false);
        };
        let (Some(parent), Some(at)) = (self.tree.parent(id), self.tree.index_in_parent(id)) else {
            return Ok(false);
        };
        let owner = self
            .index
            .directly_containing(id)
            .iter()
            .copied()
            .max_by_key(|n| self.index.chain(*n).len());
        let (props, depth) = owner
            .and_then(|n| self.index.get(n).map(|notifier| (notifier, n)))
            .map_or_else(
                || (TextProps::default().with_size(self.settings.default_font_size), 0),
                |(notifier, n)| (notifier.recipe.props.clone(), self.index.chain(n).len()),
            );

        let freed = self.tree.remove_range(parent, at, 1);
        self.index.forget_boxes(&freed);
        let built = {
            let site = BuildSite {
                data: &self.data,
                vc: self.vc.as_ref(),
                settings: &self.settings,
                parent,
                at,
                props,
                width: self.width.unwrap_or(0),
                depth,
            };
            let mut env = ViewEnv::new(&mut self.tree, &mut self.index, site);
            env.display_items(&token, owner).map(|()| {
                let fresh: FxHashSet<_> = env.created().iter().copied().collect();
                (fresh, env.touched().to_vec(), env.inserted())
            })
        };
        self.tree.finish_materializing(id);

        match built {
            Ok((fresh, touched, inserted)) => {
                self.index
                    .splice(&self.tree, parent, at, 1, inserted, owner, &fresh);
                self.index.reorder(&self.tree, &touched);
                tracing::debug!(
                    object = %token.object,
                    items = token.items.len(),
                    boxes = inserted,
                    "lazy box materialized"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "materialization failed");
                self.full_rebuild()?;
                self.relayout()?;
                return Err(e.into());
            }
        }

        let relaid = self.relayout()?;
        let event = RebuildEvent {
            batch: self.batches,
            full_rebuild: false,
            rebuilt: 0,
            materialized: 1,
            relaid,
        };
        self.emit(&event);
        Ok(true)
    }

    /// Materializes every lazy box intersecting `window` (root coordinates),
    /// including the ones that appear while doing so.
    pub fn prepare_to_draw(&mut self, window: Rect) -> Result<usize, ViewError> {
        let mut count = 0;
        loop {
            let pending: Vec<BoxId> = self
                .tree
                .lazy_boxes_in(window)
                .into_iter()
                .filter(|id| self.tree.lazy_state(*id) == Some(LazyState::Placeholder))
                .collect();
            if pending.is_empty() {
                return Ok(count);
            }
            for id in pending {
                if self.materialize(id)? {
                    count += 1;
                }
            }
        }
    }

    /// Height with every lazy box materialized.
    pub fn exact_height(&mut self) -> Result<i32, ViewError> {
        loop {
            let pending = self.tree.lazy_boxes();
            if pending.is_empty() {
                break;
            }
            for id in pending {
                self.materialize(id)?;
            }
        }
        self.relayout()?;
        Ok(self.estimated_size().height)
    }

    /// Size of the current layout, lazy boxes counted at their estimates.
    pub fn estimated_size(&self) -> Size {
        self.tree.get(self.tree.root()).map_or(Size::ZERO, |n| n.size)
    }

    pub fn materializations(&self) -> usize {
        self.tree.materialized_count()
    }

    // -- read-only queries ----------------------------------------------

    pub fn hit_test(&self, point: Point) -> Option<Hit> {
        self.tree.hit_test(point)
    }

    /// The innermost displayed attribute occurrence holding `id`.
    pub fn key_for_box(&self, id: BoxId) -> Option<NotifierKey> {
        self.index.key_for_box(&self.tree, id)
    }

    pub fn range_for(&self, key: NotifierKey) -> Option<BoxRange> {
        self.index.range_for(key)
    }

    pub fn paint(&self, painter: &mut Painter, clip: Rect) {
        self.tree.paint(painter, clip);
    }

    pub fn verify(&self) -> Result<(), IndexError> {
        self.index.verify(&self.tree)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/root.rs"]
mod tests;
