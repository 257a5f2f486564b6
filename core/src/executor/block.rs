//! Block runners
//!
//! A block is executed either on a copy (the caller only sees what the block
//! created) or in place (the block sees and may change the caller's tree).

use std::collections::HashSet;

use tracing::debug;

use super::context::Context;
use super::control::{self, Control};
use super::exec_loop::execute_all;
use crate::errors::Result;
use crate::tree::{NodeId, Tree};

/// How a block is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    Copy,
    Mutable,
}

/// Execute a copy of `exe` and hand the results to `destination`
///
/// Arguments are cloned in front of the copy's children. Children the block
/// created are moved to `destination`, whose old children are cleared on the
/// `first` call only, and the copy's final value replaces its value.
///
/// The copy is a boundary for control signals: none of them reach the
/// caller's tree. If `destination` was removed while the copy ran, the
/// results are freed with the copy.
pub fn execute_block_copy(
    ctx: &mut Context,
    tree: &mut Tree,
    exe: NodeId,
    destination: NodeId,
    args: &[NodeId],
    first: bool,
) -> Result<()> {
    let copy = tree.deep_clone(exe);
    let result = run_copy(ctx, tree, copy, destination, args, first);
    tree.remove(copy);
    result
}

fn run_copy(
    ctx: &mut Context,
    tree: &mut Tree,
    copy: NodeId,
    destination: NodeId,
    args: &[NodeId],
    first: bool,
) -> Result<()> {
    for arg in args.iter().rev() {
        let arg_copy = tree.deep_clone(*arg);
        tree.insert(copy, 0, arg_copy)?;
    }

    let original: HashSet<NodeId> = tree.children(copy).iter().copied().collect();

    let control = execute_all(ctx, tree, copy)?;
    control::strip_return(tree, copy);
    if control != Control::None && control != Control::Return {
        debug!(?control, "signal stopped at copy boundary");
        control::clear(tree, copy);
    }

    // Results have nowhere to go once a handler removed the destination
    if !tree.is_alive(destination) {
        debug!("copy destination removed, results discarded");
        return Ok(());
    }
    if first {
        tree.clear(destination);
    }
    let created: Vec<NodeId> = tree
        .children(copy)
        .iter()
        .copied()
        .filter(|child| !original.contains(child))
        .collect();
    for child in created {
        tree.append(destination, child)?;
    }

    let value = tree.take_value(copy);
    tree.set_value(destination, value);
    Ok(())
}

/// Execute `exe` in place, after appending clones of `args` to it
///
/// A `_return` that ends up as the first child of `exe` is consumed here;
/// signals raised higher up are left for the enclosing loops.
pub fn execute_block_mutable(
    ctx: &mut Context,
    tree: &mut Tree,
    exe: NodeId,
    args: &[NodeId],
) -> Result<Control> {
    for arg in args {
        let arg_copy = tree.deep_clone(*arg);
        tree.append(exe, arg_copy)?;
    }

    let control = execute_all(ctx, tree, exe)?;
    control::strip_return(tree, exe);
    Ok(control)
}
