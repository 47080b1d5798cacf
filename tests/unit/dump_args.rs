use super::*;

fn args(list: &[&str]) -> Result<DumpArgs, String> {
    parse_args(list.iter().map(|s| s.to_string()))
}

#[test]
fn document_path_is_required() {
    assert_eq!(args(&[]), Err("missing document path".to_string()));
}

#[test]
fn defaults_apply_without_options() {
    let parsed = args(&["doc.json"]).unwrap();
    assert_eq!(parsed.doc, PathBuf::from("doc.json"));
    assert_eq!(parsed.width, DEFAULT_WIDTH);
    assert!(parsed.settings.is_none());
    assert!(!parsed.exact);
}

#[test]
fn options_are_parsed() {
    let parsed = args(&[
        "--width=320",
        "doc.json",
        "--settings=s.json",
        "--exact",
        "--log-dir=/tmp/logs",
    ])
    .unwrap();
    assert_eq!(parsed.width, 320);
    assert_eq!(parsed.settings, Some(PathBuf::from("s.json")));
    assert_eq!(parsed.log_dir, Some(PathBuf::from("/tmp/logs")));
    assert!(parsed.exact);
}

#[test]
fn bad_arguments_are_rejected() {
    assert!(args(&["doc.json", "--width=wide"]).is_err());
    assert!(args(&["doc.json", "--zoom"]).is_err());
    assert!(args(&["a.json", "b.json"]).is_err());
}

#[test]
fn dump_prints_the_laid_out_tree() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("doc.json");
    std::fs::write(
        &doc,
        r#"{
            "root": 1,
            "objects": [
                { "id": 1, "attrs": { "1": { "str": "hello" } } }
            ],
            "view": { "frags": { "0": [ { "op": "string", "tag": 1 } ] } }
        }"#,
    )
    .unwrap();
    let settings = dir.path().join("settings.json");
    std::fs::write(&settings, "{}").unwrap();

    let text = dump(&DumpArgs {
        doc,
        width: 100,
        settings: Some(settings),
        log_dir: None,
        exact: false,
    })
    .unwrap();
    assert!(text.starts_with("pile @(0,0) 100x17\n"));
    assert!(text.contains("  paragraph @(0,0) 100x17 lines=1\n"));
    assert!(text.contains("\"hello\""));
}
