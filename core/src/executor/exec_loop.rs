//! Statement loop
//!
//! Walks the children of a block and dispatches each one. The tree may be
//! restructured by every handler, so the loop keeps no position other than
//! the current node and re-reads the tree after each step:
//!
//! 1. remember the current node's next sibling as fallback
//! 2. dispatch the node, unless it is data (`_x`), a callback (`.x`),
//!    anonymous, or the `offset` marker
//! 3. stop if a control signal is pending at the root
//! 4. advance to the current node's next sibling, or to the fallback if the
//!    current node was removed and the fallback is still in the tree
//!
//! When the current node removed itself, nodes inserted where it used to be
//! (between its old previous sibling and the fallback) run before the
//! fallback.

use tracing::trace;

use super::context::Context;
use super::control::Control;
use crate::convert::to_int;
use crate::errors::{LambdaError, NodeContext, Result};
use crate::expression;
use crate::tree::{NodeId, Tree};

/// Name of the child that sets where execution starts
pub const OFFSET: &str = "offset";

/// Execute the children of `block`
///
/// Returns the control signal that stopped the loop, if any. Handler errors
/// abort the loop and propagate unchanged.
pub fn execute_all(ctx: &mut Context, tree: &mut Tree, block: NodeId) -> Result<Control> {
    let offset_node = tree.child_named(block, OFFSET);
    let Some(start) = start_position(ctx, tree, block, offset_node)? else {
        return Ok(Control::None);
    };

    let mut current = tree.child(block, start);
    while let Some(node) = current {
        let before = Position::of(tree, node);

        if Some(node) != offset_node && is_executable(tree.name(node)) {
            ctx.raise(tree, node)?;
        } else {
            trace!(name = tree.name(node), "skipping");
        }

        let control = Control::pending(tree, block);
        if control.is_active() {
            return Ok(control);
        }

        current = before.advance(tree, node);
    }

    Ok(Control::None)
}

/// Neighbourhood of a node, recorded before it is dispatched
struct Position {
    parent: Option<NodeId>,
    previous: Option<NodeId>,
    fallback: Option<NodeId>,
}

impl Position {
    fn of(tree: &Tree, node: NodeId) -> Self {
        Self {
            parent: tree.parent(node),
            previous: tree.previous_sibling(node),
            fallback: tree.next_sibling(node),
        }
    }

    /// Node to execute after `node`
    fn advance(&self, tree: &Tree, node: NodeId) -> Option<NodeId> {
        let fallback = self.fallback.filter(|f| tree.parent(*f).is_some());

        if tree.parent(node).is_some() {
            return tree.next_sibling(node).or(fallback);
        }

        // `node` is gone; without a fallback the block is done
        let fallback = fallback?;
        let same_parent = tree.parent(fallback) == self.parent;
        let previous_intact = self
            .previous
            .map(|p| tree.parent(p) == self.parent)
            .unwrap_or(true);
        if !same_parent || !previous_intact {
            return Some(fallback);
        }

        let mut candidate = fallback;
        while let Some(previous) = tree.previous_sibling(candidate) {
            if Some(previous) == self.previous {
                break;
            }
            candidate = previous;
        }
        Some(candidate)
    }
}

/// Whether a node with this name is dispatched
pub fn is_executable(name: &str) -> bool {
    !(name.is_empty() || name.starts_with('_') || name.starts_with('.'))
}

/// Index of the first child to execute, `None` when there is nothing to do
fn start_position(
    ctx: &Context,
    tree: &Tree,
    block: NodeId,
    offset_node: Option<NodeId>,
) -> Result<Option<usize>> {
    let Some(offset_node) = offset_node else {
        return Ok(Some(0));
    };
    let Some(value) = expression::single_value(tree, offset_node)? else {
        return Ok(Some(0));
    };

    let offset = to_int(ctx.converter(), &value)
        .map_err(|e| LambdaError::conversion(tree, offset_node, e))?;
    let count = tree.child_count(block);
    let offset = usize::try_from(offset).map_err(|_| {
        LambdaError::execution(tree, offset_node, format!("[offset] of {} is negative", offset))
    })?;

    if offset == count {
        return Ok(None);
    }
    if offset > count {
        return Err(LambdaError::OffsetOutOfRange {
            offset,
            count,
            node: NodeContext::capture(tree, block),
        });
    }
    Ok(Some(offset))
}
