//! Control flow tests - return, break and continue sentinels and how far
//! they unwind

use std::sync::Arc;

use super::helpers::*;
use crate::convert::format_scalar;
use crate::executor::control::{self, Control, BREAK, RETURN};
use crate::executor::{evaluate, Registry};
use crate::tree::{NodeId, Tree, Value};

/// Item a `for-each` iteration is looking at, as text
fn current_item(tree: &Tree, node: NodeId) -> String {
    let dp = tree
        .parent(node)
        .and_then(|parent| tree.child_named(parent, "_dp"));
    match dp.and_then(|dp| tree.value(dp)) {
        Some(Value::Ref(item)) => tree.name(*item).to_string(),
        Some(value) => format_scalar(value, false).unwrap_or_default(),
        None => "<none>".to_string(),
    }
}

/// Registry where `collect` logs the current item and `signal-at-b` raises
/// `signal` while the current item is `b`
fn loop_registry(log: &Log, signal: Control) -> Registry {
    let mut registry = strict_registry();

    let collected = Arc::clone(log);
    registry.register_fn("collect", move |_ctx, tree, node| {
        collected.lock().unwrap().push(current_item(tree, node));
        Ok(())
    });
    let after = Arc::clone(log);
    registry.register_fn("after", move |_ctx, tree, node| {
        after
            .lock()
            .unwrap()
            .push(format!("after:{}", current_item(tree, node)));
        Ok(())
    });
    registry.register_fn("signal-at-b", move |_ctx, tree, node| {
        if current_item(tree, node) == "b" {
            control::signal(tree, node, signal)?;
        }
        Ok(())
    });
    registry
}

const ITEMS: &str = r#"
_items
  a:1
  b:2
  c:3
"#;

/* ===================== For Each ===================== */

#[test]
fn test_for_each_visits_every_item() {
    let log = new_log();
    let mut ctx = context(loop_registry(&log, Control::None));
    let source = format!("{}for-each:x:/../*/_items/*\n  collect", ITEMS);
    let (mut tree, root) = program(&source);

    evaluate(&mut ctx, &mut tree, root).unwrap();

    assert_eq!(entries(&log), vec!["a", "b", "c"]);
    let for_each = tree.child_named(root, "for-each").unwrap();
    assert_eq!(child_names(&tree, for_each), vec!["collect"]);
}

#[test]
fn test_for_each_over_values() {
    let log = new_log();
    let mut ctx = context(loop_registry(&log, Control::None));
    let source = format!("{}for-each:x:/../*/_items/*?value\n  collect", ITEMS);
    let (mut tree, root) = program(&source);

    evaluate(&mut ctx, &mut tree, root).unwrap();

    assert_eq!(entries(&log), vec!["1", "2", "3"]);
}

#[test]
fn test_for_each_over_nothing_keeps_body() {
    let log = new_log();
    let mut ctx = context(loop_registry(&log, Control::None));
    let (mut tree, root) = program("for-each:x:/../*/_missing/*\n  collect");

    evaluate(&mut ctx, &mut tree, root).unwrap();

    assert!(entries(&log).is_empty());
    let for_each = tree.child_named(root, "for-each").unwrap();
    assert_eq!(child_names(&tree, for_each), vec!["collect"]);
}

#[test]
fn test_break_leaves_the_loop() {
    let log = new_log();
    let mut ctx = context(loop_registry(&log, Control::Break));
    let source = format!(
        "{}for-each:x:/../*/_items/*\n  collect\n  signal-at-b\n  after\nafter",
        ITEMS
    );
    let (mut tree, root) = program(&source);

    evaluate(&mut ctx, &mut tree, root).unwrap();

    assert_eq!(
        entries(&log),
        vec!["a", "after:a", "b", "after:<none>"]
    );
    assert_ne!(tree.name(tree.first_child(root).unwrap()), BREAK);
}

#[test]
fn test_continue_skips_rest_of_iteration() {
    let log = new_log();
    let mut ctx = context(loop_registry(&log, Control::Continue));
    let source = format!(
        "{}for-each:x:/../*/_items/*\n  collect\n  signal-at-b\n  after",
        ITEMS
    );
    let (mut tree, root) = program(&source);

    evaluate(&mut ctx, &mut tree, root).unwrap();

    assert_eq!(
        entries(&log),
        vec!["a", "after:a", "b", "c", "after:c"]
    );
}

#[test]
fn test_return_inside_for_each_stops_the_program() {
    let log = new_log();
    let mut ctx = context(loop_registry(&log, Control::Return));
    let source = format!(
        "{}for-each:x:/../*/_items/*\n  collect\n  signal-at-b\nafter",
        ITEMS
    );
    let (mut tree, root) = program(&source);

    evaluate(&mut ctx, &mut tree, root).unwrap();

    assert_eq!(entries(&log), vec!["a", "b"]);
    assert_ne!(tree.name(tree.first_child(root).unwrap()), RETURN);
}

#[test]
fn test_for_each_body_removing_the_loop_stops_it() {
    let log = new_log();
    let mut registry = loop_registry(&log, Control::None);
    registry.register_fn("remove-parent", |_ctx, tree, node| {
        if let Some(parent) = tree.parent(node) {
            tree.remove(parent);
        }
        Ok(())
    });
    let mut ctx = context(registry);
    let source = format!(
        "{}for-each:x:/../*/_items/*\n  collect\n  remove-parent\n  collect\nafter",
        ITEMS
    );
    let (mut tree, root) = program(&source);
    let for_each = tree.child_named(root, "for-each").unwrap();
    let baseline = tree.len();

    evaluate(&mut ctx, &mut tree, root).unwrap();

    assert_eq!(entries(&log), vec!["a", "after:<none>"]);
    assert!(!tree.is_alive(for_each));
    assert_eq!(child_names(&tree, root), vec!["_items", "after"]);
    // for-each and its three body nodes are gone, nothing else leaked
    assert_eq!(tree.len(), baseline - 4);
}

/* ===================== Return ===================== */

#[test]
fn test_return_unwinds_every_enclosing_mutable_loop() {
    let log = new_log();
    let mut registry = strict_registry();
    record_all(&mut registry, &["inner-never", "outer-never", "after"], &log);
    let mut ctx = context(registry);
    let source = r#"
eval-mutable
  eval-mutable
    return
    inner-never
  outer-never
after
"#;
    let (mut tree, root) = program(source);

    evaluate(&mut ctx, &mut tree, root).unwrap();

    assert!(entries(&log).is_empty());
    assert_eq!(Control::pending(&tree, root), Control::None);
}

#[test]
fn test_return_value_lands_on_mutable_root() {
    let mut ctx = context(strict_registry());
    let (mut tree, root) = program("eval-mutable\n  return:int:5");

    evaluate(&mut ctx, &mut tree, root).unwrap();

    assert_eq!(tree.value(root), Some(&Value::Int(5)));
}

#[test]
fn test_return_nested_node_value_is_copied() {
    let mut ctx = context(strict_registry());
    let source = "_fn:node:\"foo:bar\"\nreturn:x:/../*/_fn?value";
    let (mut tree, root) = program(source);

    evaluate(&mut ctx, &mut tree, root).unwrap();

    let Some(Value::Node(returned)) = tree.value(root) else {
        panic!("Expected node value, got {:?}", tree.value(root));
    };
    let holder = tree.child_named(root, "_fn").unwrap();
    let Some(Value::Node(original)) = tree.value(holder) else {
        panic!("Expected _fn to keep its node");
    };
    assert_ne!(returned, original);
    assert_eq!(child_names(&tree, *returned), vec!["foo"]);
}

/* ===================== Copy Boundary ===================== */

#[test]
fn test_copy_scope_contains_its_signals() {
    let log = new_log();
    let mut registry = strict_registry();
    record_all(&mut registry, &["never", "after"], &log);
    let mut ctx = context(registry);

    for keyword in ["return", "break", "continue"] {
        let source = format!("eval\n  {}\n  never\nafter", keyword);
        let (mut tree, root) = program(&source);

        evaluate(&mut ctx, &mut tree, root).unwrap();

        assert_eq!(child_names(&tree, root), vec!["eval", "after"], "{}", keyword);
    }
    assert_eq!(entries(&log), vec!["after", "after", "after"]);
}

#[test]
fn test_leftover_signal_is_discarded_by_evaluate() {
    let mut ctx = context(strict_registry());
    let (mut tree, root) = program("continue\nnever");

    evaluate(&mut ctx, &mut tree, root).unwrap();

    assert_eq!(child_names(&tree, root), vec!["continue", "never"]);
}
