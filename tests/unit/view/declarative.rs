use super::*;

#[test]
fn parses_ops_with_defaults() {
    let vc = DeclarativeConstructor::from_json(
        r#"{
            "frags": {
                "0": [
                    { "op": "open_paragraph", "align": "center" },
                    { "op": "bold" },
                    { "op": "string", "tag": 3 },
                    { "op": "close" },
                    { "op": "open_table", "columns": [{ "fixed": 40 }, "auto"] },
                    { "op": "open_table_row" },
                    { "op": "open_cell" },
                    { "op": "close" },
                    { "op": "close" },
                    { "op": "close" }
                ]
            },
            "estimates": { "1": 30 }
        }"#,
    )
    .unwrap();

    let ops = &vc.spec().frags[&0];
    assert_eq!(ops.len(), 10);
    assert_eq!(
        ops[0],
        ViewOp::OpenParagraph {
            direction: Direction::Ltr,
            align: Align::Center,
        }
    );
    assert_eq!(ops[1], ViewOp::Bold { on: true });
    assert_eq!(ops[2], ViewOp::String { tag: 3 });
    assert_eq!(
        ops[4],
        ViewOp::OpenTable {
            columns: vec![ColumnWidth::Fixed(40), ColumnWidth::Auto],
        }
    );
    assert_eq!(ops[6], ViewOp::OpenCell { span: 1 });
    assert_eq!(vc.spec().estimates.get(&1), Some(&30));
}

#[test]
fn estimates_come_from_the_fragment() {
    let mut spec = ViewSpec::default();
    spec.estimates.insert(2, 55);
    let vc = DeclarativeConstructor::new(spec);

    assert_eq!(vc.estimate_height(ObjectHandle(1), Frag(2), 100), Some(55));
    assert_eq!(vc.estimate_height(ObjectHandle(1), Frag(3), 100), None);
}

#[test]
fn unknown_op_is_rejected() {
    let err = DeclarativeConstructor::from_json(r#"{ "frags": { "0": [{ "op": "blink" }] } }"#);
    assert!(err.is_err());
}

#[test]
fn empty_document_is_an_empty_spec() {
    let vc = DeclarativeConstructor::from_json("{}").unwrap();
    assert!(vc.spec().frags.is_empty());
    assert!(vc.spec().estimates.is_empty());
}

#[test]
fn spec_survives_serialization() {
    let mut spec = ViewSpec::default();
    spec.frags.insert(
        0,
        vec![
            ViewOp::OpenRow,
            ViewOp::Literal {
                text: "» ".to_string(),
            },
            ViewOp::LazyVec { tag: 2, frag: 1 },
            ViewOp::Close,
        ],
    );
    let json = serde_json::to_string(&spec).unwrap();
    assert!(json.contains(r#""op":"lazy_vec""#));
    let back: ViewSpec = serde_json::from_str(&json).unwrap();
    assert_eq!(back, spec);
}
