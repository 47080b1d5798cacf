use super::*;
use crate::boxes::LazyState;
use crate::core::error::BuildError;
use crate::data::{MemoryStore, Value};

const NAME: AttrTag = AttrTag(1);
const ITEMS: AttrTag = AttrTag(2);
const COUNT: AttrTag = AttrTag(3);
const SELF_REF: AttrTag = AttrTag(4);

const ROOT: ObjectHandle = ObjectHandle(1);

/// A view constructor written inline by each test.
struct FnView<F>(F);

impl<F> ViewConstructor for FnView<F>
where
    F: Fn(&mut ViewEnv<'_>, ObjectHandle, Frag) -> Result<(), BuildError>,
{
    fn display(
        &self,
        env: &mut ViewEnv<'_>,
        object: ObjectHandle,
        frag: Frag,
    ) -> Result<(), BuildError> {
        (self.0)(env, object, frag)
    }
}

fn view<F>(f: F) -> FnView<F>
where
    F: Fn(&mut ViewEnv<'_>, ObjectHandle, Frag) -> Result<(), BuildError>,
{
    FnView(f)
}

fn build_with(
    data: &MemoryStore,
    vc: &dyn ViewConstructor,
    settings: &ViewSettings,
) -> Result<(BoxTree, NotifierIndex), BuildError> {
    let mut tree = BoxTree::new();
    let mut index = NotifierIndex::new();
    let site = BuildSite {
        data,
        vc,
        settings,
        parent: tree.root(),
        at: 0,
        props: TextProps::default(),
        width: 200,
        depth: 0,
    };
    let mut env = ViewEnv::new(&mut tree, &mut index, site);
    env.display_root(ROOT, Frag(0))?;
    Ok((tree, index))
}

fn build(
    data: &MemoryStore,
    vc: &dyn ViewConstructor,
) -> Result<(BoxTree, NotifierIndex), BuildError> {
    build_with(data, vc, &ViewSettings::default())
}

fn store(name: &str) -> MemoryStore {
    let mut data = MemoryStore::new();
    data.set_string(ROOT, NAME, name);
    data
}

fn texts(tree: &BoxTree, parent: BoxId) -> Vec<(String, &'static str)> {
    tree.children(parent)
        .iter()
        .filter_map(|id| {
            let kind = tree.kind(*id)?;
            kind.as_string().map(|s| (s.text.clone(), kind.name()))
        })
        .collect()
}

#[test]
fn loose_string_gets_its_own_paragraph() {
    let data = store("hello");
    let vc = view(|env, _, _| env.add_string_prop(NAME));
    let (tree, index) = build(&data, &vc).unwrap();

    let root = tree.root();
    let para = tree.children(root)[0];
    assert_eq!(tree.kind(para).map(|k| k.name()), Some("paragraph"));
    assert_eq!(texts(&tree, para), vec![("hello".to_string(), "string")]);

    let n = index.occurrences(ROOT, NAME, 1, 1)[0];
    let range = index.get(n).unwrap().range;
    assert_eq!((range.parent, range.start, range.len), (root, 0, 1));
    assert_eq!(index.verify(&tree), Ok(()));
}

#[test]
fn strings_inside_a_paragraph_join_it() {
    let data = store("b");
    let vc = view(|env, _, _| {
        env.open_paragraph(ParaProps::default())?;
        env.add_literal("a")?;
        env.set_bold(true);
        env.add_string_prop(NAME)?;
        env.close_paragraph()
    });
    let (tree, _) = build(&data, &vc).unwrap();

    let para = tree.children(tree.root())[0];
    assert_eq!(tree.children(tree.root()).len(), 1);
    assert_eq!(
        texts(&tree, para),
        vec![("a".to_string(), "string"), ("b".to_string(), "string")]
    );
    let bold = tree.kind(tree.children(para)[1]).and_then(|k| k.as_string());
    assert!(bold.is_some_and(|s| s.props.bold));
}

#[test]
fn hard_breaks_split_runs() {
    let data = store("ab\r\ncd\nef\u{2029}");
    let vc = view(|env, _, _| env.add_string_prop(NAME));
    let (tree, _) = build(&data, &vc).unwrap();

    let para = tree.children(tree.root())[0];
    assert_eq!(
        texts(&tree, para),
        vec![
            ("ab".to_string(), "string"),
            ("cd".to_string(), "broken string"),
            ("ef".to_string(), "broken string"),
        ]
    );
}

#[test]
fn runs_with_equal_props_merge() {
    let mut data = MemoryStore::new();
    let bold = TextProps {
        bold: true,
        ..TextProps::default()
    };
    let text = TsString::plain("ab")
        .push("cd", None)
        .push("ef", Some(bold));
    data.set(ROOT, NAME, Value::Str(text));
    let vc = view(|env, _, _| env.add_string_prop(NAME));
    let (tree, _) = build(&data, &vc).unwrap();

    let para = tree.children(tree.root())[0];
    assert_eq!(
        texts(&tree, para),
        vec![("abcd".to_string(), "string"), ("ef".to_string(), "string")]
    );
}

#[test]
fn int_attribute_is_shown_in_decimal() {
    let mut data = MemoryStore::new();
    data.set_int(ROOT, COUNT, -42);
    let vc = view(|env, _, _| env.add_int_prop(COUNT));
    let (tree, _) = build(&data, &vc).unwrap();

    let para = tree.children(tree.root())[0];
    assert_eq!(texts(&tree, para), vec![("-42".to_string(), "string")]);
}

#[test]
fn empty_attributes_leave_a_placeholder() {
    let mut data = MemoryStore::new();
    data.insert_object(ROOT);
    let vc = view(|env, _, _| {
        env.add_string_prop(NAME)?;
        env.open_paragraph(ParaProps::default())?;
        env.add_string_prop(NAME)?;
        env.close_paragraph()?;
        env.open_table(Vec::new())?;
        env.add_obj_vec(ITEMS, Frag(1))?;
        env.close_table()
    });
    let (tree, index) = build(&data, &vc).unwrap();

    let kids = tree.children(tree.root());
    let names: Vec<_> = kids
        .iter()
        .filter_map(|id| tree.kind(*id).map(|k| k.name()))
        .collect();
    assert_eq!(names, vec!["pile", "paragraph", "table"]);
    assert_eq!(texts(&tree, kids[1]), vec![(String::new(), "string")]);
    let rows = tree.children(kids[2]);
    assert_eq!(rows.len(), 1);
    assert_eq!(tree.kind(rows[0]).map(|k| k.name()), Some("table row"));

    assert_eq!(index.len(), 3);
    assert!(index.iter().all(|(_, n)| n.range.len == 1));
    assert_eq!(index.verify(&tree), Ok(()));
}

#[test]
fn sequence_items_nest_under_the_sequence() {
    let mut data = MemoryStore::new();
    data.set_seq(ROOT, ITEMS, vec![ObjectHandle(10), ObjectHandle(11)]);
    data.set_string(ObjectHandle(10), NAME, "ten");
    data.set_string(ObjectHandle(11), NAME, "eleven");
    let vc = view(|env, _, frag| match frag.0 {
        0 => env.add_obj_vec(ITEMS, Frag(1)),
        _ => {
            env.open_pile()?;
            env.add_string_prop(NAME)?;
            env.close_pile()
        }
    });
    let (tree, index) = build(&data, &vc).unwrap();

    let items = index.occurrences(ROOT, ITEMS, 1, 1)[0];
    assert_eq!(index.get(items).unwrap().range.len, 2);
    for (i, obj) in [10u64, 11].into_iter().enumerate() {
        let name = index.occurrences(ObjectHandle(obj), NAME, 1, 1)[0];
        let n = index.get(name).unwrap();
        assert_eq!(n.parent, Some(items));
        assert_eq!(n.index_in_parent, i);
        assert_eq!(n.range.parent, tree.children(tree.root())[i]);
    }
    assert_eq!(index.verify(&tree), Ok(()));
}

#[test]
fn missing_items_are_skipped() {
    let mut data = MemoryStore::new();
    data.set_seq(ROOT, ITEMS, vec![ObjectHandle(10), ObjectHandle(99)]);
    data.set_string(ObjectHandle(10), NAME, "ten");
    let vc = view(|env, _, frag| match frag.0 {
        0 => env.add_obj_vec(ITEMS, Frag(1)),
        _ => env.add_string_prop(NAME),
    });
    let (tree, index) = build(&data, &vc).unwrap();

    assert_eq!(tree.children(tree.root()).len(), 1);
    assert_eq!(index.lookup(ObjectHandle(99), NAME).len(), 0);
}

#[test]
fn unclosed_container_in_an_attribute_is_unbalanced() {
    let mut data = MemoryStore::new();
    data.set_obj(ROOT, ITEMS, Some(ObjectHandle(10)));
    data.insert_object(ObjectHandle(10));
    let vc = view(|env, _, frag| match frag.0 {
        0 => env.add_obj_prop(ITEMS, Frag(1)),
        _ => env.open_pile().map(drop),
    });
    let err = build(&data, &vc).unwrap_err();
    assert_eq!(
        err,
        BuildError::Unbalanced {
            expected: "pile",
            found: "end of attribute",
        }
    );
}

#[test]
fn unclosed_container_at_the_root_is_unbalanced() {
    let data = store("x");
    let vc = view(|env, _, _| env.open_row().map(drop));
    let err = build(&data, &vc).unwrap_err();
    assert_eq!(
        err,
        BuildError::Unbalanced {
            expected: "row",
            found: "end of display",
        }
    );
}

#[test]
fn closing_the_wrong_kind_is_unbalanced() {
    let data = store("x");
    let vc = view(|env, _, _| {
        env.open_row()?;
        env.close_pile()
    });
    let err = build(&data, &vc).unwrap_err();
    assert_eq!(
        err,
        BuildError::Unbalanced {
            expected: "pile",
            found: "row",
        }
    );
}

#[test]
fn item_cannot_close_its_enclosing_container() {
    let mut data = MemoryStore::new();
    data.set_obj(ROOT, ITEMS, Some(ObjectHandle(10)));
    data.insert_object(ObjectHandle(10));
    let vc = view(|env, _, frag| match frag.0 {
        0 => {
            env.open_pile()?;
            env.add_obj_prop(ITEMS, Frag(1))?;
            env.close_pile()
        }
        _ => env.close(),
    });
    let err = build(&data, &vc).unwrap_err();
    assert_eq!(
        err,
        BuildError::Unbalanced {
            expected: "an open container",
            found: "close",
        }
    );
}

#[test]
fn self_reference_stops_at_the_depth_limit() {
    let mut data = MemoryStore::new();
    data.set_obj(ROOT, SELF_REF, Some(ROOT));
    let vc = view(|env, _, _| env.add_obj_prop(SELF_REF, Frag(0)));
    let settings = ViewSettings {
        max_build_depth: 4,
        ..ViewSettings::default()
    };
    let err = build_with(&data, &vc, &settings).unwrap_err();
    assert_eq!(
        err,
        BuildError::DepthExceeded {
            object: ROOT,
            depth: 4,
        }
    );
}

#[test]
fn lazy_sequence_is_chunked_with_estimates() {
    let mut data = MemoryStore::new();
    let items: Vec<_> = (10..15).map(ObjectHandle).collect();
    data.set_seq(ROOT, ITEMS, items);
    let vc = view(|env, _, _| env.add_lazy_vec(ITEMS, Frag(1)));
    let settings = ViewSettings {
        lazy_chunk_size: 2,
        estimated_item_height: 24,
        ..ViewSettings::default()
    };
    let (tree, index) = build_with(&data, &vc, &settings).unwrap();

    let lazies = tree.lazy_boxes();
    assert_eq!(lazies.len(), 3);
    let shape: Vec<_> = lazies
        .iter()
        .filter_map(|id| tree.kind(*id).and_then(|k| k.as_lazy()))
        .map(|l| (l.token.items.clone(), l.estimated_height))
        .collect();
    assert_eq!(shape, vec![(0..2, 48), (2..4, 48), (4..5, 24)]);
    assert!(lazies
        .iter()
        .all(|id| tree.lazy_state(*id) == Some(LazyState::Placeholder)));

    let seq = index.occurrences(ROOT, ITEMS, 1, 1)[0];
    assert_eq!(index.get(seq).unwrap().range.len, 3);
}

#[test]
fn formatting_stays_with_the_object_that_set_it() {
    let mut data = MemoryStore::new();
    data.set_seq(ROOT, ITEMS, vec![ObjectHandle(10), ObjectHandle(11)]);
    data.set_string(ObjectHandle(10), NAME, "ten");
    data.set_string(ObjectHandle(11), NAME, "eleven");
    let vc = view(|env, object, frag| match frag.0 {
        0 => {
            env.add_obj_vec(ITEMS, Frag(1))?;
            env.add_literal("tail")
        }
        _ => {
            if object == ObjectHandle(10) {
                env.set_bold(true);
                env.set_size(24);
            }
            env.add_string_prop(NAME)
        }
    });
    let (tree, _) = build(&data, &vc).unwrap();

    let runs: Vec<(String, bool, i32)> = tree
        .descendants(tree.root())
        .into_iter()
        .filter_map(|id| tree.kind(id).and_then(|k| k.as_string()))
        .map(|s| (s.text.clone(), s.props.bold, s.props.size))
        .collect();
    assert_eq!(
        runs,
        vec![
            ("ten".to_string(), true, 24),
            ("eleven".to_string(), false, 16),
            ("tail".to_string(), false, 16),
        ]
    );
}

#[test]
fn every_mandatory_break_splits_a_run() {
    let data = store("ab\u{000B}cd\u{0085}ef\u{000C}gh");
    let vc = view(|env, _, _| env.add_string_prop(NAME));
    let (tree, _) = build(&data, &vc).unwrap();

    let para = tree.children(tree.root())[0];
    assert_eq!(
        texts(&tree, para),
        vec![
            ("ab".to_string(), "string"),
            ("cd".to_string(), "broken string"),
            ("ef".to_string(), "broken string"),
            ("gh".to_string(), "broken string"),
        ]
    );
}
