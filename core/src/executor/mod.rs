//! # Lambda Executor
//!
//! Executes lambda blocks: trees of nodes where every node with a plain name
//! is an event dispatched to the handlers registered for that name.
//!
//! ## Core Principles
//!
//! 1. **Everything is a node**: programs, arguments and results live in one
//!    [`Tree`], which handlers may restructure while it runs
//! 2. **Two scopes**: copy mode executes a clone and returns only what the
//!    block created; mutable mode executes the caller's own nodes
//! 3. **Signals, not unwinding**: `return`, `break` and `continue` leave a
//!    sentinel node at the root that every loop checks after each step
//! 4. **Explicit context**: registry, identity and collaborators travel in a
//!    [`Context`], never in global state
//!
//! ## Entry Points
//!
//! - [`run`] / [`run_mutable`] execute a node's block (or the blocks its value
//!   points at) in copy or mutable mode
//! - [`evaluate`] runs a whole program root

pub mod block;
pub mod context;
pub mod control;
pub mod exec_loop;
pub mod registry;
pub mod stdlib;

#[cfg(test)]
mod tests;

use tracing::debug;

pub use block::{execute_block_copy, execute_block_mutable, BlockMode};
pub use context::{Context, ContextBuilder};
pub use control::Control;
pub use exec_loop::execute_all;
pub use registry::{Handler, Registry, UnknownEventPolicy};

use crate::errors::{LambdaError, NodeContext, Result};
use crate::expression::{self, Item};
use crate::parser::parse_lambda;
use crate::tree::{NodeId, Tree, Value};

/* ===================== Public API ===================== */

/// Execute `node` in copy mode
///
/// Without a value, or with `force_children`, the node's own children are the
/// block. Otherwise every source its value resolves to is executed with the
/// node's children as arguments, and the results collect on `node`.
pub fn run(ctx: &mut Context, tree: &mut Tree, node: NodeId, force_children: bool) -> Result<()> {
    execute(BlockMode::Copy, ctx, tree, node, force_children)
}

/// Execute `node` in mutable mode
///
/// Same source rules as [`run`], but blocks execute in place.
pub fn run_mutable(
    ctx: &mut Context,
    tree: &mut Tree,
    node: NodeId,
    force_children: bool,
) -> Result<()> {
    execute(BlockMode::Mutable, ctx, tree, node, force_children)
}

/// Execute a program root in mutable mode
///
/// Any control signal still pending at the root afterwards is discarded.
pub fn evaluate(ctx: &mut Context, tree: &mut Tree, root: NodeId) -> Result<()> {
    run_mutable(ctx, tree, root, true)?;
    let leftover = control::clear(tree, root);
    if leftover.is_active() {
        debug!(?leftover, "discarded signal at program root");
    }
    Ok(())
}

/* ===================== Sources ===================== */

/// A block to execute, and whether the executor has to free it afterwards
struct Source {
    node: NodeId,
    owned: bool,
}

fn execute(
    mode: BlockMode,
    ctx: &mut Context,
    tree: &mut Tree,
    node: NodeId,
    force_children: bool,
) -> Result<()> {
    ctx.nested(tree, node, |ctx, tree| {
        if force_children || tree.value(node).is_none() {
            debug!(name = tree.name(node), ?mode, depth = ctx.depth(), "executing children");
            return run_block(mode, ctx, tree, node, node, &[], true);
        }
        execute_sources(mode, ctx, tree, node)
    })
}

fn execute_sources(mode: BlockMode, ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let items: Vec<Item> = expression::iterate(tree, node)?.collect();

    // Later sources must see the caller's arguments, not what the first
    // source left behind on `node`
    let args: Vec<NodeId> = tree.children(node).to_vec();
    let templates: Vec<NodeId> = args.into_iter().map(|arg| tree.deep_clone(arg)).collect();

    let result = run_sources(mode, ctx, tree, node, items, &templates);

    for template in templates {
        tree.remove(template);
    }
    result
}

fn run_sources(
    mode: BlockMode,
    ctx: &mut Context,
    tree: &mut Tree,
    node: NodeId,
    items: Vec<Item>,
    args: &[NodeId],
) -> Result<()> {
    let mut first = true;
    for item in items {
        if !tree.is_alive(node) {
            debug!("executing node removed, remaining sources skipped");
            break;
        }
        let Some(source) = to_source(tree, node, item)? else {
            continue;
        };
        debug!(name = tree.name(node), ?mode, first, depth = ctx.depth(), "executing source");

        let result = run_block(mode, ctx, tree, source.node, node, args, first);
        if source.owned {
            tree.remove(source.node);
        }
        result?;
        first = false;

        if Control::pending(tree, node).is_active() {
            break;
        }
    }
    Ok(())
}

/// Turn a resolved item into an executable block
///
/// Nodes are executed as they are; strings are parsed into a temporary block.
/// Items pointing at nodes that no longer exist are skipped.
fn to_source(tree: &mut Tree, node: NodeId, item: Item) -> Result<Option<Source>> {
    let not_executable = |tree: &Tree, message: String| LambdaError::NotExecutable {
        message,
        node: NodeContext::capture(tree, node),
    };

    let text = match item {
        Item::Node(id) | Item::Value(Value::Node(id)) | Item::Value(Value::Ref(id)) => {
            if !tree.is_alive(id) {
                return Ok(None);
            }
            return Ok(Some(Source {
                node: id,
                owned: false,
            }));
        }
        Item::Value(Value::Str(text)) | Item::Name(text) => text,
        Item::Value(other) => {
            return Err(not_executable(
                &*tree,
                format!("a value of type '{}' cannot be executed", other.type_name()),
            ))
        }
        Item::Count(_) => {
            return Err(not_executable(&*tree, "a count cannot be executed".to_string()))
        }
    };

    let parsed = parse_lambda(tree, &text)
        .map_err(|e| not_executable(&*tree, format!("text is not valid lambda: {}", e)))?;
    Ok(Some(Source {
        node: parsed,
        owned: true,
    }))
}

fn run_block(
    mode: BlockMode,
    ctx: &mut Context,
    tree: &mut Tree,
    exe: NodeId,
    destination: NodeId,
    args: &[NodeId],
    first: bool,
) -> Result<()> {
    match mode {
        BlockMode::Copy => execute_block_copy(ctx, tree, exe, destination, args, first),
        BlockMode::Mutable => execute_block_mutable(ctx, tree, exe, args).map(|_| ()),
    }
}
