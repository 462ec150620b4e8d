use super::*;

#[test]
fn canonicalize_posix() {
    assert_eq!(canonicalize("foo.json"), "foo.json");
    assert_eq!(canonicalize("./foo.json"), "foo.json");
    assert_eq!(canonicalize("a/./b/c.json"), "a/b/c.json");
    assert_eq!(canonicalize("a/b/../c.json"), "a/c.json");
    assert_eq!(canonicalize("a//b"), "a/b");
    assert_eq!(canonicalize("/a/../b"), "/b");
    assert_eq!(canonicalize("../a"), "../a");
    assert_eq!(canonicalize("a/../../b"), "../b");
}

#[test]
fn canonicalize_windows() {
    assert_eq!(canonicalize("a\\.\\b\\c.json"), "a\\b\\c.json");
    assert_eq!(canonicalize("a\\b\\..\\c.json"), "a\\c.json");
}

#[test]
fn root_derivation() {
    assert_eq!(derive_root("a/b/c.json"), ("a/b".to_owned(), '/'));
    assert_eq!(derive_root("/c.json"), ("/".to_owned(), '/'));
    assert_eq!(derive_root("c.json"), (".".to_owned(), '/'));
    assert_eq!(derive_root("a\\b\\c.json"), ("a\\b".to_owned(), '\\'));
}

#[test]
fn inline_import_names() {
    assert_eq!(inline_import_name("a/b.json", 0), "a/b_import0.json");
    assert_eq!(inline_import_name("schema", 2), "schema_import2");
    assert_eq!(inline_import_name("a.b/c", 1), "a.b/c_import1");
}

#[test]
fn extension_probing() {
    assert!(has_extension("foo.proto", ".proto"));
    assert!(has_extension("foo.PROTO", ".proto"));
    assert!(!has_extension("foo.json", ".proto"));
    assert!(!has_extension("oto", ".proto"));
    assert_eq!(swap_proto_extension("dir/foo.proto"), "dir/foo.json");
}

#[test]
fn memory_loader_normalizes_names() {
    let mut loader = MemoryLoader::new();
    loader.add("./pkg/a.json", &b"{}"[..]);
    assert_eq!(loader.fetch("pkg/a.json"), Some(Bytes::from_static(b"{}")));
    assert_eq!(loader.fetch("pkg/x/../a.json"), Some(Bytes::from_static(b"{}")));
    assert_eq!(loader.fetch("pkg/b.json"), None);
}

#[test]
fn chain_loader_first_hit_wins() {
    let mut first = MemoryLoader::new();
    first.add("a.json", &b"first"[..]);
    let mut second = MemoryLoader::new();
    second.add("a.json", &b"second"[..]);
    second.add("b.json", &b"only"[..]);

    let mut chain = ChainLoader::new();
    chain.add(first).add(second);

    assert_eq!(chain.fetch("a.json"), Some(Bytes::from_static(b"first")));
    assert_eq!(chain.fetch("b.json"), Some(Bytes::from_static(b"only")));
    assert_eq!(chain.fetch("c.json"), None);
}

#[test]
fn fs_loader_reads_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("schema.json");
    std::fs::write(&path, b"{\"package\":\"pkg\"}").unwrap();

    let loader = FsLoader::new();
    assert_eq!(
        loader.fetch(path.to_str().unwrap()),
        Some(Bytes::from_static(b"{\"package\":\"pkg\"}"))
    );
    assert_eq!(loader.fetch(dir.path().join("missing.json").to_str().unwrap()), None);
}
