use super::*;
use crate::core::geom::{Point, Size};

fn token(items: Range<usize>) -> LazyToken {
    LazyToken {
        object: ObjectHandle(7),
        tag: AttrTag(3),
        frag: Frag(1),
        items,
    }
}

fn place(tree: &mut BoxTree, id: BoxId, y: i32, height: i32) {
    let node = tree.get_mut(id).unwrap();
    node.origin = Point::new(0, y);
    node.size = Size::new(100, height);
}

#[test]
fn placeholder_moves_through_materializing() {
    let mut tree = BoxTree::new();
    let root = tree.root();
    let lazy = tree
        .insert(root, 0, BoxKind::Lazy(LazyBox::new(token(0..5), 120)))
        .unwrap();
    assert_eq!(tree.lazy_state(lazy), Some(LazyState::Placeholder));

    let got = tree.begin_materializing(lazy).unwrap();
    assert_eq!(got, Some(token(0..5)));
    assert_eq!(tree.lazy_state(lazy), Some(LazyState::Materializing));
    // a second request while building is ignored
    assert_eq!(tree.begin_materializing(lazy), Ok(None));

    tree.remove_range(root, 0, 1);
    tree.finish_materializing(lazy);
    assert_eq!(tree.lazy_state(lazy), Some(LazyState::Materialized));
    assert_eq!(tree.begin_materializing(lazy), Ok(None));
    assert_eq!(tree.materialized_count(), 1);
}

#[test]
fn materializing_other_boxes_is_an_error() {
    let mut tree = BoxTree::new();
    let root = tree.root();
    let pile = tree.insert(root, 0, BoxKind::pile()).unwrap();
    assert_eq!(tree.begin_materializing(pile), Err(BuildError::NotLazy(pile)));
    assert_eq!(tree.lazy_state(pile), None);

    tree.remove_range(root, 0, 1);
    assert_eq!(
        tree.begin_materializing(pile),
        Err(BuildError::UnknownBox(pile))
    );
}

#[test]
fn lazy_boxes_are_listed_in_document_order() {
    let mut tree = BoxTree::new();
    let root = tree.root();
    let group = tree.insert(root, 0, BoxKind::pile()).unwrap();
    let late = tree
        .insert(root, 1, BoxKind::Lazy(LazyBox::new(token(5..10), 50)))
        .unwrap();
    let early = tree
        .insert(group, 0, BoxKind::Lazy(LazyBox::new(token(0..5), 50)))
        .unwrap();
    assert_eq!(tree.lazy_boxes(), vec![early, late]);
}

#[test]
fn window_selects_intersecting_placeholders() {
    let mut tree = BoxTree::new();
    let root = tree.root();
    let a = tree
        .insert(root, 0, BoxKind::Lazy(LazyBox::new(token(0..2), 50)))
        .unwrap();
    let b = tree
        .insert(root, 1, BoxKind::Lazy(LazyBox::new(token(2..4), 50)))
        .unwrap();
    place(&mut tree, a, 0, 50);
    place(&mut tree, b, 50, 50);

    assert_eq!(tree.lazy_boxes_in(Rect::new(0, 0, 100, 10)), vec![a]);
    assert_eq!(tree.lazy_boxes_in(Rect::new(0, 40, 100, 20)), vec![a, b]);
    assert!(tree.lazy_boxes_in(Rect::new(0, 200, 100, 20)).is_empty());
}
