//! Property tests for the statement loop and the copy scope

use std::sync::Arc;

use proptest::prelude::*;

use super::helpers::*;
use crate::errors::LambdaError;
use crate::executor::{evaluate, run, Registry, UnknownEventPolicy};
use crate::tree::{Tree, Value};

fn name_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("_data"), Just(".callback"), Just(""), Just("run")]
}

/// Registry whose `step` handler logs the integer value of the node
fn step_registry(log: &Log) -> Registry {
    let mut registry = Registry::new(UnknownEventPolicy::Error);
    let steps = Arc::clone(log);
    registry.register_fn("step", move |_ctx, tree, node| {
        let value = tree.value(node).and_then(Value::as_int).unwrap_or(-1);
        steps.lock().unwrap().push(value.to_string());
        Ok(())
    });
    registry
}

proptest! {
    #[test]
    fn prop_skipped_names_are_never_dispatched(names in prop::collection::vec(name_strategy(), 0..16)) {
        let log = new_log();
        let mut registry = Registry::new(UnknownEventPolicy::Error);
        record(&mut registry, "run", &log);
        let mut ctx = context(registry);

        let mut tree = Tree::new();
        let root = tree.create("", None);
        for name in &names {
            tree.add(root, *name, Value::from("payload"));
        }

        evaluate(&mut ctx, &mut tree, root).unwrap();

        let expected = names.iter().filter(|n| **n == "run").count();
        prop_assert_eq!(entries(&log).len(), expected);
    }

    #[test]
    fn prop_offset_runs_suffix_in_order(
        (count, offset) in (0usize..8).prop_flat_map(|count| (Just(count), 0..=count + 2))
    ) {
        // `offset` itself is the last child, so there are count + 1 children
        let log = new_log();
        let mut ctx = context(step_registry(&log));

        let mut tree = Tree::new();
        let root = tree.create("", None);
        for i in 0..count {
            tree.add(root, "step", Value::Int(i as i64));
        }
        tree.add(root, "offset", Value::Int(offset as i64));

        let result = evaluate(&mut ctx, &mut tree, root);

        if offset > count + 1 {
            let is_out_of_range = matches!(result, Err(LambdaError::OffsetOutOfRange { .. }));
            prop_assert!(is_out_of_range);
        } else {
            prop_assert!(result.is_ok());
            let expected: Vec<String> = (offset..count).map(|i| i.to_string()).collect();
            prop_assert_eq!(entries(&log), expected);
        }
    }

    #[test]
    fn prop_copy_scope_is_idempotent(xs in prop::collection::vec(-1000i64..1000, 0..6)) {
        let mut registry = strict_registry();
        registry.register("add-one", add_one);
        let mut ctx = context(registry);

        let mut tree = Tree::new();
        let root = tree.create("", None);
        let block = tree.add(root, "_block", None);
        for x in &xs {
            let call = tree.add(block, "add-one", None);
            tree.add(call, "x", Value::Int(*x));
        }
        let eval = tree.add(root, "eval", None);
        let originals = tree.children(block).to_vec();

        tree.set_value(eval, Value::Expr("/../*/_block".to_string()));
        run(&mut ctx, &mut tree, eval, false).unwrap();
        let after_first = tree.len();
        let first = int_values(&tree, eval, "_result");

        tree.set_value(eval, Value::Expr("/../*/_block".to_string()));
        run(&mut ctx, &mut tree, eval, false).unwrap();

        let expected: Vec<i64> = xs.iter().map(|x| x + 1).collect();
        prop_assert_eq!(&first, &expected);
        prop_assert_eq!(int_values(&tree, eval, "_result"), expected);
        prop_assert_eq!(tree.len(), after_first);
        prop_assert_eq!(tree.children(block), originals.as_slice());
    }
}
