use serde_json::Map;

use super::*;

fn namespace() -> NodeKind {
    NodeKind::Namespace(NamespaceNode::default())
}

fn message() -> NodeKind {
    NodeKind::Message(MessageNode {
        options: Map::new(),
        extensions: None,
        group: false,
        syntax: Syntax::Proto2,
    })
}

fn field(id: u32) -> NodeKind {
    NodeKind::Field(FieldNode {
        rule: Rule::Optional,
        id,
        field_type: FieldType::Named("int32".to_owned()),
        key_type: None,
        options: Map::new(),
        oneof: None,
        syntax: Syntax::Proto2,
        extension: None,
    })
}

/// root -> foo -> bar -> Baz { x }, and root -> foo -> Quux.
fn sample() -> (Tree, NodeId, NodeId, NodeId, NodeId, NodeId) {
    let mut tree = Tree::new();
    let root = tree.root();
    let foo = tree.add(root, "foo".to_owned(), namespace());
    let bar = tree.add(foo, "bar".to_owned(), namespace());
    let baz = tree.add(bar, "Baz".to_owned(), message());
    let x = tree.add(baz, "x".to_owned(), field(1));
    let quux = tree.add(foo, "Quux".to_owned(), message());
    (tree, foo, bar, baz, x, quux)
}

#[test]
fn full_names() {
    let (tree, foo, _, baz, x, _) = sample();
    assert_eq!(tree.full_name(tree.root()), "");
    assert_eq!(tree.full_name(foo), "foo");
    assert_eq!(tree.full_name(baz), "foo.bar.Baz");
    assert_eq!(tree.full_name(x), "foo.bar.Baz.x");
}

#[test]
fn resolve_relative_from_scope() {
    let (tree, foo, bar, baz, _, quux) = sample();
    assert_eq!(tree.resolve(bar, "Baz", false), Some(baz));
    assert_eq!(tree.resolve(bar, "bar.Baz", false), Some(baz));
    // Climbs to an ancestor scope.
    assert_eq!(tree.resolve(baz, "Quux", false), Some(quux));
    assert_eq!(tree.resolve(foo, "bar.Baz", false), Some(baz));
    // A message can resolve its own name through its parent scope.
    assert_eq!(tree.resolve(baz, "Baz", false), Some(baz));
}

#[test]
fn resolve_fully_qualified() {
    let (tree, _, _, baz, _, _) = sample();
    assert_eq!(tree.resolve(baz, ".foo.bar.Baz", false), Some(baz));
    assert_eq!(tree.resolve(baz, ".bar.Baz", false), None);
    assert_eq!(tree.resolve(baz, ".", false), None);
}

#[test]
fn resolve_misses() {
    let (tree, _, bar, _, _, _) = sample();
    assert_eq!(tree.resolve(bar, "Missing", false), None);
    assert_eq!(tree.resolve(bar, "bar.Missing.Baz", false), None);
}

#[test]
fn resolve_excludes_non_namespace_hits() {
    let (tree, _, _, baz, x, _) = sample();
    assert_eq!(tree.resolve(baz, "Baz.x", false), Some(x));
    assert_eq!(tree.resolve(baz, "Baz.x", true), None);
}

#[test]
fn field_lookup_by_id() {
    let (tree, _, _, baz, x, _) = sample();
    assert_eq!(tree.field_with_id(baz, 1), Some(x));
    assert_eq!(tree.field_with_id(baz, 2), None);
}
