//! Test helpers for executor tests
//!
//! Common utilities for parsing programs, building contexts and registering
//! handlers that record or restructure what they are called on.

use std::sync::{Arc, Mutex};

use crate::convert::to_int;
use crate::errors::{LambdaError, Result};
use crate::executor::{Context, Registry, UnknownEventPolicy};
use crate::expression;
use crate::parser::parse_lambda;
use crate::tree::{NodeId, Tree, Value};

/// Names of dispatched nodes, in dispatch order
pub type Log = Arc<Mutex<Vec<String>>>;

/// Parse lambda source into a fresh tree
pub fn program(source: &str) -> (Tree, NodeId) {
    let mut tree = Tree::new();
    let root = parse_lambda(&mut tree, source).expect("Parse lambda failed");
    (tree, root)
}

/// Registry with the standard keywords and the strict unknown-event policy
pub fn strict_registry() -> Registry {
    Registry::with_stdlib(UnknownEventPolicy::Error)
}

/// Context over `registry` with every other collaborator defaulted
pub fn context(registry: Registry) -> Context {
    Context::builder(Arc::new(registry)).build()
}

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().expect("log poisoned").clone()
}

/// Register a handler for `name` that only records the dispatch
pub fn record(registry: &mut Registry, name: &str, log: &Log) {
    let log = Arc::clone(log);
    registry.register_fn(name, move |_ctx, tree, node| {
        log.lock()
            .expect("log poisoned")
            .push(tree.name(node).to_string());
        Ok(())
    });
}

/// Register recording handlers for several names at once
pub fn record_all(registry: &mut Registry, names: &[&str], log: &Log) {
    for name in names {
        record(registry, name, log);
    }
}

/// `add-one`: reads its `x` child and appends `_result:int:x+1` to the
/// block it runs in
pub fn add_one(ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let Some(x) = tree.child_named(node, "x") else {
        return Err(LambdaError::execution(tree, node, "missing [x]"));
    };
    let Some(value) = expression::single_value(tree, x)? else {
        return Err(LambdaError::execution(tree, x, "[x] has no value"));
    };
    let x = to_int(ctx.converter(), &value).map_err(|e| LambdaError::conversion(tree, node, e))?;

    let Some(block) = tree.parent(node) else {
        return Ok(());
    };
    tree.add(block, "_result", Value::Int(x + 1));
    Ok(())
}

/// `delete-self`: removes the node being dispatched
pub fn delete_self(_ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    tree.remove(node);
    Ok(())
}

/// `replace-with-d`: inserts a `d` node right after itself, then removes
/// itself
pub fn replace_with_d(_ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let (Some(parent), Some(index)) = (tree.parent(node), tree.index_of(node)) else {
        return Ok(());
    };
    let d = tree.create("d", None);
    tree.insert(parent, index + 1, d)?;
    tree.remove(node);
    Ok(())
}

/// `fail`: always raises an execution error
pub fn fail(_ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    Err(LambdaError::execution(tree, node, "deliberate failure"))
}

/// Names of the children of `node`
pub fn child_names(tree: &Tree, node: NodeId) -> Vec<String> {
    tree.children(node)
        .iter()
        .map(|child| tree.name(*child).to_string())
        .collect()
}

/// Integer values of the children of `node` named `name`
pub fn int_values(tree: &Tree, node: NodeId, name: &str) -> Vec<i64> {
    tree.children(node)
        .iter()
        .filter(|child| tree.name(**child) == name)
        .filter_map(|child| tree.value(*child).and_then(Value::as_int))
        .collect()
}
