//! Lambda keywords - `eval`, `eval-mutable`, `return`, `break`, `continue`
//! and `for-each`

use tracing::debug;

use super::own_value;
use crate::errors::Result;
use crate::executor::context::Context;
use crate::executor::control::{self, Control};
use crate::executor::exec_loop::execute_all;
use crate::executor::{run, run_mutable};
use crate::expression::{self, Item};
use crate::tree::{NodeId, Tree, Value};

/// `eval` - execute in copy mode
///
/// When invoked under another name the node's children are always the block.
pub fn eval(ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let force_children = tree.name(node) != "eval";
    run(ctx, tree, node, force_children)
}

/// `eval-mutable` - execute in place
pub fn eval_mutable(ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let force_children = tree.name(node) != "eval-mutable";
    run_mutable(ctx, tree, node, force_children)
}

/// `return` - stop the current scope
///
/// The resolved value becomes the value of the root, clones of the children
/// are appended to it, and a `_return` sentinel is raised.
pub fn return_(_ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let Some(root) = tree.root(node) else {
        return Ok(());
    };

    if tree.value(node).is_some() {
        let value = expression::single_value(tree, node)?;
        let value = value.map(|v| own_value(tree, v));
        tree.set_value(root, value);
    }

    let children = tree.children(node).to_vec();
    for child in children {
        let copy = tree.deep_clone(child);
        tree.append(root, copy)?;
    }

    control::signal(tree, node, Control::Return)
}

/// `break` - leave the innermost `for-each`
pub fn break_(_ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    control::signal(tree, node, Control::Break)
}

/// `continue` - skip to the next item of the innermost `for-each`
pub fn continue_(_ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    control::signal(tree, node, Control::Continue)
}

/// `for-each` - execute the children once per resolved item
///
/// Each iteration runs in place on fresh clones of the body, with the item
/// available as a `_dp` child: nodes by reference, anything else by value.
/// The body is restored once the loop is done. If the body removed the
/// `for-each` node itself, the loop stops and the body is freed.
pub fn for_each(ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let items: Vec<Item> = expression::iterate(tree, node)?.collect();

    let body: Vec<NodeId> = tree.children(node).to_vec();
    for part in &body {
        tree.detach(*part);
    }

    let result = ctx.nested(tree, node, |ctx, tree| iterate_items(ctx, tree, node, items, &body));

    if !tree.is_alive(node) {
        for part in body {
            tree.remove(part);
        }
        return result;
    }
    tree.clear(node);
    for part in body {
        tree.append(node, part)?;
    }
    result
}

fn iterate_items(
    ctx: &mut Context,
    tree: &mut Tree,
    node: NodeId,
    items: Vec<Item>,
    body: &[NodeId],
) -> Result<()> {
    for item in items {
        if !tree.is_alive(node) {
            debug!("for-each node removed, loop stopped");
            break;
        }
        let current = match item {
            Item::Node(id) if tree.is_alive(id) => Value::Ref(id),
            Item::Node(_) => continue,
            Item::Value(value) => own_value(tree, value),
            Item::Name(name) => Value::Str(name),
            Item::Count(count) => Value::Int(count as i64),
        };

        tree.clear(node);
        tree.add(node, "_dp", current);
        for part in body {
            let copy = tree.deep_clone(*part);
            tree.append(node, copy)?;
        }

        match execute_all(ctx, tree, node)? {
            Control::None => {}
            Control::Continue => {
                control::clear(tree, node);
            }
            Control::Break => {
                control::clear(tree, node);
                debug!("for-each stopped by break");
                break;
            }
            // left in place for the enclosing scopes
            Control::Return => break,
        }
    }
    Ok(())
}
