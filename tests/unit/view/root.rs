use std::sync::Arc;

use super::*;
use crate::data::MemoryStore;
use crate::paint::PaintCmd;
use crate::text::{EngineCache, MemoryRegistry};
use crate::view::DeclarativeConstructor;

const NAME: AttrTag = AttrTag(1);
const ITEMS: AttrTag = AttrTag(2);
const ROOT: ObjectHandle = ObjectHandle(1);

const EAGER: &str = r#"{
    "frags": {
        "0": [ { "op": "vec", "tag": 2, "frag": 1 } ],
        "1": [ { "op": "string", "tag": 1 } ]
    }
}"#;

const LAZY: &str = r#"{
    "frags": {
        "0": [ { "op": "lazy_vec", "tag": 2, "frag": 1 } ],
        "1": [ { "op": "string", "tag": 1 } ]
    }
}"#;

fn store(items: &[u64]) -> MemoryStore {
    let mut data = MemoryStore::new();
    data.set_seq(ROOT, ITEMS, items.iter().copied().map(ObjectHandle).collect());
    for id in items {
        data.set_string(ObjectHandle(*id), NAME, &format!("item {id}"));
    }
    data.take_changes();
    data
}

fn open(view: &str, items: &[u64], settings: ViewSettings) -> RootBox<MemoryStore> {
    let vc = DeclarativeConstructor::from_json(view).unwrap();
    let segmenter =
        Segmenter::with_cache(MemoryRegistry::with_defaults(), Arc::new(EngineCache::new()));
    let mut root = RootBox::new(store(items), vc, ROOT, Frag(0), segmenter, settings).unwrap();
    root.layout(200).unwrap();
    root
}

fn eager(items: &[u64]) -> RootBox<MemoryStore> {
    open(EAGER, items, ViewSettings::default())
}

fn lazy(items: &[u64]) -> RootBox<MemoryStore> {
    let settings = ViewSettings {
        lazy_chunk_size: 2,
        estimated_item_height: 24,
        ..ViewSettings::default()
    };
    open(LAZY, items, settings)
}

fn item_texts(view: &RootBox<MemoryStore>) -> Vec<String> {
    let tree = view.tree();
    tree.descendants(tree.root())
        .into_iter()
        .filter_map(|id| tree.kind(id).and_then(|k| k.as_string()))
        .map(|s| s.text.clone())
        .collect()
}

#[test]
fn layout_stacks_one_line_per_item() {
    let mut view = eager(&[10, 11, 12]);
    assert_eq!(view.width(), Some(200));
    assert_eq!(view.estimated_size(), Size::new(200, 3 * 17));
    assert_eq!(view.layout(200).unwrap(), Size::new(200, 51));
    assert_eq!(item_texts(&view), vec!["item 10", "item 11", "item 12"]);
}

#[test]
fn request_rebuild_ignores_what_is_not_displayed() {
    let mut view = eager(&[10]);
    assert!(!view.request_rebuild(ObjectHandle(99), NAME, 1, 1));
    assert!(!view.request_rebuild(ObjectHandle(10), NAME, 0, 1));
    assert!(!view.request_rebuild(ObjectHandle(10), NAME, 2, 1));
    assert!(!view.has_pending_rebuilds());
    assert_eq!(view.flush_rebuilds().unwrap(), None);

    assert!(view.request_rebuild(ObjectHandle(10), NAME, 1, 1));
    assert!(view.has_pending_rebuilds());
}

#[test]
fn changed_string_is_rebuilt_in_place() {
    let mut view = eager(&[10, 11]);
    let rx = view.subscribe();
    let first = view.tree().children(view.tree().root())[0];

    view.data_mut()
        .set_string(ObjectHandle(11), NAME, "renamed");
    let changes = view.data_mut().take_changes();
    let event = view.apply_changes(&changes).unwrap().unwrap();

    assert_eq!(event.batch, 1);
    assert!(!event.full_rebuild);
    assert_eq!(event.rebuilt, 1);
    assert!(event.relaid > 0);
    assert_eq!(rx.try_recv().ok(), Some(event));
    assert_eq!(view.tree().children(view.tree().root())[0], first);
    assert_eq!(item_texts(&view), vec!["item 10", "renamed"]);
    assert_eq!(view.verify(), Ok(()));
}

#[test]
fn grown_sequence_is_rebuilt_from_the_root_attribute() {
    let mut view = eager(&[10, 11]);
    view.data_mut().set_string(ObjectHandle(12), NAME, "item 12");
    view.data_mut().set_seq(
        ROOT,
        ITEMS,
        vec![ObjectHandle(10), ObjectHandle(11), ObjectHandle(12)],
    );
    view.data_mut().take_changes();

    assert!(view.request_rebuild(ROOT, ITEMS, 1, 1));
    assert!(view.request_rebuild(ObjectHandle(10), NAME, 1, 1));
    let event = view.flush_rebuilds().unwrap().unwrap();

    assert!(!event.full_rebuild);
    assert_eq!(event.rebuilt, 1);
    assert_eq!(item_texts(&view), vec!["item 10", "item 11", "item 12"]);
    assert_eq!(view.estimated_size().height, 51);
    assert_eq!(view.verify(), Ok(()));
}

#[test]
fn stale_path_falls_back_to_a_full_rebuild() {
    let mut view = eager(&[10, 11]);
    assert!(view.request_rebuild(ObjectHandle(11), NAME, 1, 1));
    view.data_mut().remove_object(ObjectHandle(11));
    view.data_mut().set_seq(ROOT, ITEMS, vec![ObjectHandle(10)]);

    let event = view.flush_rebuilds().unwrap().unwrap();
    assert!(event.full_rebuild);
    assert_eq!(event.rebuilt, 0);
    assert_eq!(item_texts(&view), vec!["item 10"]);
    assert_eq!(view.estimated_size().height, 17);
    assert_eq!(view.verify(), Ok(()));
}

#[test]
fn hit_maps_back_to_the_attribute() {
    let view = eager(&[10, 11]);
    let hit = view.hit_test(Point::new(9, 20)).unwrap();
    let key = view.key_for_box(hit.box_id).unwrap();
    assert_eq!(
        key,
        NotifierKey {
            object: ObjectHandle(11),
            tag: NAME,
            occurrence: 1,
        }
    );
    assert_eq!(hit.offset, Some(1));

    let range = view.range_for(key).unwrap();
    assert_eq!(range.parent, view.tree().root());
    assert_eq!((range.start, range.len), (1, 1));
    assert!(view.hit_test(Point::new(5, 500)).is_none());
}

#[test]
fn paint_draws_every_visible_item() {
    let view = eager(&[10, 11]);
    let mut painter = Painter::new();
    view.paint(&mut painter, Rect::new(0, 0, 200, 100));
    let runs = painter
        .cmds()
        .iter()
        .filter(|cmd| matches!(cmd, PaintCmd::Glyphs { .. }))
        .count();
    assert_eq!(runs, 2);
    assert_eq!(painter.glyph_count(), 14);
}

#[test]
fn lazy_items_start_as_estimates() {
    let view = lazy(&[10, 11, 12, 13, 14]);
    assert_eq!(view.tree().lazy_boxes().len(), 3);
    assert_eq!(view.estimated_size().height, 48 + 48 + 24);
    assert!(item_texts(&view).is_empty());
    assert_eq!(view.materializations(), 0);
    assert_eq!(view.verify(), Ok(()));
}

#[test]
fn materialize_is_idempotent() {
    let mut view = lazy(&[10, 11, 12, 13, 14]);
    let rx = view.subscribe();
    let first = view.tree().lazy_boxes()[0];

    assert!(view.materialize(first).unwrap());
    assert!(!view.materialize(first).unwrap());
    assert_eq!(view.tree().lazy_state(first), Some(LazyState::Materialized));
    assert_eq!(view.materializations(), 1);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.materialized, 1);
    assert!(rx.try_recv().is_err());

    assert_eq!(item_texts(&view), vec!["item 10", "item 11"]);
    assert_eq!(view.estimated_size().height, 34 + 48 + 24);
    let seq = view.index().occurrences(ROOT, ITEMS, 1, 1)[0];
    assert_eq!(view.index().get(seq).unwrap().range.len, 4);
    assert_eq!(view.verify(), Ok(()));
}

#[test]
fn materializing_a_plain_box_is_an_error() {
    let mut view = eager(&[10]);
    let para = view.tree().children(view.tree().root())[0];
    assert_eq!(
        view.materialize(para),
        Err(ViewError::Build(BuildError::NotLazy(para)))
    );
}

#[test]
fn prepare_to_draw_only_builds_the_window() {
    let mut view = lazy(&[10, 11, 12, 13, 14]);
    let built = view.prepare_to_draw(Rect::new(0, 0, 200, 10)).unwrap();
    assert_eq!(built, 1);
    assert_eq!(view.tree().lazy_boxes().len(), 2);

    let built = view.prepare_to_draw(Rect::new(0, 0, 200, 10)).unwrap();
    assert_eq!(built, 0);
}

#[test]
fn exact_height_materializes_everything() {
    let mut view = lazy(&[10, 11, 12, 13, 14]);
    assert_eq!(view.exact_height().unwrap(), 5 * 17);
    assert!(view.tree().lazy_boxes().is_empty());
    assert_eq!(view.materializations(), 3);
    assert_eq!(item_texts(&view).len(), 5);
    assert_eq!(view.verify(), Ok(()));
}

#[test]
fn rebuild_inside_materialized_items_stays_partial() {
    let mut view = lazy(&[10, 11, 12]);
    let first = view.tree().lazy_boxes()[0];
    view.materialize(first).unwrap();

    view.data_mut()
        .set_string(ObjectHandle(11), NAME, "renamed");
    let changes = view.data_mut().take_changes();
    let event = view.apply_changes(&changes).unwrap().unwrap();

    assert!(!event.full_rebuild);
    assert_eq!(item_texts(&view), vec!["item 10", "renamed"]);
    assert_eq!(view.tree().lazy_boxes().len(), 1);
    assert_eq!(view.verify(), Ok(()));
}

fn engines(view: &RootBox<MemoryStore>) -> Vec<crate::text::EngineKind> {
    let tree = view.tree();
    tree.descendants(tree.root())
        .into_iter()
        .filter_map(|id| tree.kind(id).and_then(|k| k.as_string()))
        .filter_map(|s| s.segment.as_ref().map(|seg| seg.engine()))
        .collect()
}

fn ligature_registry(smart: bool) -> MemoryRegistry {
    use crate::text::{EngineCaps, FontFace, SmartRules, WritingSystem};
    let mut r = MemoryRegistry::new();
    r.register_font(
        crate::text::FontId(0),
        FontFace::new("Serif", EngineCaps::SIMPLE).with_rules(SmartRules::new().ligature("it", 9)),
    );
    r.register_ws(crate::text::WsId(0), WritingSystem::simple("en").with_smart(smart));
    r
}

#[test]
fn replacing_the_registry_reshapes_existing_runs() {
    use crate::text::EngineKind;
    let mut view = eager(&[10, 11]);
    assert_eq!(engines(&view), vec![EngineKind::Simple; 2]);
    let shaped = view.segmenter().stats().shaped;

    view.replace_registry(ligature_registry(true)).unwrap();
    assert_eq!(engines(&view), vec![EngineKind::Smart; 2]);
    assert_eq!(view.segmenter().stats().shaped, shaped + 2);
    // "it" became one glyph, so each line is one character narrower
    let tree = view.tree();
    let first = tree
        .descendants(tree.root())
        .into_iter()
        .find_map(|id| tree.kind(id).and_then(|k| k.as_string()))
        .and_then(|s| s.segment.as_ref())
        .map(|seg| seg.width());
    assert_eq!(first, Some(6 * 8));

    view.replace_registry(ligature_registry(false)).unwrap();
    assert_eq!(engines(&view), vec![EngineKind::Simple; 2]);
    assert_eq!(view.verify(), Ok(()));
}

#[test]
fn replaced_registry_reaches_unsupported_runs() {
    let mut view = eager(&[10]);
    view.replace_registry(MemoryRegistry::new()).unwrap();
    let tree = view.tree();
    let errors = tree
        .descendants(tree.root())
        .into_iter()
        .filter_map(|id| tree.kind(id).and_then(|k| k.as_string()))
        .filter(|s| s.shape_error.is_some())
        .count();
    assert_eq!(errors, 1);
}
