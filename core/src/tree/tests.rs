//! Tree tests - structure edits, stale handles and deep copies

use super::*;
use crate::errors::LambdaError;

fn sample() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
    let mut tree = Tree::new();
    let root = tree.create("", None);
    let a = tree.add(root, "a", Value::Int(1));
    let b = tree.add(root, "b", None);
    let c = tree.add(root, "c", Value::from("three"));
    (tree, root, a, b, c)
}

/* ===================== Navigation ===================== */

#[test]
fn test_siblings_and_parent() {
    let (tree, root, a, b, c) = sample();

    assert_eq!(tree.parent(b), Some(root));
    assert_eq!(tree.next_sibling(a), Some(b));
    assert_eq!(tree.previous_sibling(c), Some(b));
    assert_eq!(tree.previous_sibling(a), None);
    assert_eq!(tree.next_sibling(c), None);
    assert_eq!(tree.index_of(c), Some(2));
    assert_eq!(tree.child_named(root, "c"), Some(c));
    assert_eq!(tree.child(root, 5), None);
}

#[test]
fn test_root_and_descendants() {
    let (mut tree, root, a, b, c) = sample();
    let deep = tree.add(b, "deep", None);

    assert_eq!(tree.root(deep), Some(root));
    assert!(tree.is_ancestor(root, deep));
    assert!(!tree.is_ancestor(deep, root));
    assert_eq!(tree.descendants(root), vec![a, b, deep, c]);
}

/* ===================== Structure ===================== */

#[test]
fn test_insert_moves_existing_child() {
    let (mut tree, root, a, b, c) = sample();

    tree.insert(root, 0, c).unwrap();
    assert_eq!(tree.children(root), &[c, a, b]);

    // Moving forward inside the same parent accounts for the removed slot
    tree.insert(root, 3, c).unwrap();
    assert_eq!(tree.children(root), &[a, b, c]);
}

#[test]
fn test_insert_beneath_descendant_is_rejected() {
    let (mut tree, root, _a, b, _c) = sample();
    let deep = tree.add(b, "deep", None);

    let err = tree.append(deep, b).unwrap_err();
    assert!(matches!(err, LambdaError::CyclicInsertion { .. }));

    let err = tree.append(root, root).unwrap_err();
    assert!(matches!(err, LambdaError::CyclicInsertion { .. }));
    assert_eq!(tree.parent(b), Some(root));
}

#[test]
fn test_detach_keeps_node_alive() {
    let (mut tree, root, a, b, c) = sample();

    tree.detach(b);

    assert!(tree.is_alive(b));
    assert_eq!(tree.parent(b), None);
    assert_eq!(tree.next_sibling(a), Some(c));
    tree.append(root, b).unwrap();
    assert_eq!(tree.children(root), &[a, c, b]);
}

#[test]
fn test_removed_handles_go_stale() {
    let (mut tree, root, a, b, c) = sample();
    let deep = tree.add(b, "deep", None);
    let before = tree.len();

    tree.remove(b);

    assert_eq!(tree.len(), before - 2);
    assert!(!tree.is_alive(b));
    assert!(!tree.is_alive(deep));
    assert_eq!(tree.parent(b), None);
    assert_eq!(tree.next_sibling(b), None);
    assert_eq!(tree.root(deep), None);
    assert_eq!(tree.children(root), &[a, c]);

    // A reused slot does not revive the old handle
    let fresh = tree.create("fresh", None);
    assert!(tree.is_alive(fresh));
    assert!(!tree.is_alive(b));
    assert!(!tree.is_alive(deep));
}

#[test]
fn test_clear_frees_children() {
    let (mut tree, root, a, _b, _c) = sample();

    tree.clear(root);

    assert_eq!(tree.child_count(root), 0);
    assert!(!tree.is_alive(a));
    assert_eq!(tree.len(), 1);
}

/* ===================== Values ===================== */

#[test]
fn test_nested_node_value_is_owned() {
    let mut tree = Tree::new();
    let holder = tree.create("holder", None);
    let nested = tree.create("", None);
    tree.add(nested, "inner", None);
    tree.set_value(holder, Value::Node(nested));
    assert_eq!(tree.len(), 3);

    tree.set_value(holder, Value::Int(1));
    assert!(!tree.is_alive(nested));
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_take_value_hands_over_nested_node() {
    let mut tree = Tree::new();
    let holder = tree.create("holder", None);
    let nested = tree.create("", None);
    tree.set_value(holder, Value::Node(nested));

    let taken = tree.take_value(holder);

    assert_eq!(taken, Some(Value::Node(nested)));
    assert_eq!(tree.value(holder), None);
    assert!(tree.is_alive(nested));
}

#[test]
fn test_ref_value_does_not_own() {
    let (mut tree, root, a, b, _c) = sample();
    tree.set_value(b, Value::Ref(a));

    tree.remove(b);

    assert!(tree.is_alive(a));
    assert_eq!(tree.parent(a), Some(root));
}

/* ===================== Deep Clone ===================== */

#[test]
fn test_deep_clone_has_new_identities() {
    let (mut tree, root, a, b, _c) = sample();
    tree.add(b, "deep", Value::Ref(a));
    let nested = tree.create("", None);
    tree.add(nested, "inner", None);
    tree.set_value(a, Value::Node(nested));
    let before = tree.len();

    let copy = tree.deep_clone(root);

    assert_eq!(tree.parent(copy), None);
    assert_eq!(tree.len(), before * 2);
    let copied_a = tree.child(copy, 0).unwrap();
    assert_ne!(copied_a, a);
    let Some(Value::Node(copied_nested)) = tree.value(copied_a).cloned() else {
        panic!("Expected nested node value on the copy");
    };
    assert_ne!(copied_nested, nested);
    assert_eq!(tree.name(tree.child(copied_nested, 0).unwrap()), "inner");

    // References keep pointing at the original node
    let copied_b = tree.child(copy, 1).unwrap();
    let copied_deep = tree.child(copied_b, 0).unwrap();
    assert_eq!(tree.value(copied_deep), Some(&Value::Ref(a)));
}
