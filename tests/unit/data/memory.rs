use super::*;

const DOC: &str = r#"{
    "objects": [
        { "id": 1, "attrs": { "10": { "seq": [2, 3] }, "11": { "str": "Title" } } },
        { "id": 2, "attrs": { "20": { "str": { "runs": [{ "text": "one" }, { "text": " two" }] } } } },
        { "id": 3, "attrs": { "20": { "int": 42 }, "21": { "obj": null } } }
    ]
}"#;

#[test]
fn loads_objects_from_json() {
    let store = MemoryStore::from_json(DOC).unwrap();
    assert_eq!(store.len(), 3);
    assert_eq!(
        store.read_objects(ObjectHandle(1), AttrTag(10)),
        vec![ObjectHandle(2), ObjectHandle(3)]
    );
    assert_eq!(
        store.read_string(ObjectHandle(1), AttrTag(11)).unwrap().text(),
        "Title"
    );
    assert_eq!(
        store.read_string(ObjectHandle(2), AttrTag(20)).unwrap().runs.len(),
        2
    );
    assert_eq!(store.read_int(ObjectHandle(3), AttrTag(20)), Some(42));
    assert!(store.read_objects(ObjectHandle(3), AttrTag(21)).is_empty());
}

#[test]
fn indexed_reads_address_sequence_items() {
    let store = MemoryStore::from_json(DOC).unwrap();
    assert_eq!(
        store.object_at(ObjectHandle(1), AttrTag(10), 1),
        Some(ObjectHandle(3))
    );
    assert_eq!(store.object_at(ObjectHandle(1), AttrTag(10), 2), None);
    assert_eq!(
        store.read_attribute(ObjectHandle(3), AttrTag(20), Some(1)),
        None
    );
}

#[test]
fn setters_record_changes_but_removal_does_not() {
    let mut store = MemoryStore::new();
    store.set_string(ObjectHandle(1), AttrTag(1), "a");
    store.set_seq(ObjectHandle(1), AttrTag(2), vec![ObjectHandle(2)]);
    assert!(!store.remove_object(ObjectHandle(2)));
    assert!(store.remove_object(ObjectHandle(1)));
    assert_eq!(
        store.take_changes(),
        vec![
            ChangeEvent::all(ObjectHandle(1), AttrTag(1)),
            ChangeEvent::all(ObjectHandle(1), AttrTag(2)),
        ]
    );
    assert!(store.take_changes().is_empty());
    assert!(!store.contains(ObjectHandle(1)));
}
