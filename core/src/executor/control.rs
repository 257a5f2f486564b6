//! Control flow signals
//!
//! `return`, `break` and `continue` do not unwind the native stack. They
//! insert a sentinel node as the first child of the root of the tree being
//! executed, and every statement loop checks for one after each step. The
//! [`Control`] value reports which sentinel stopped a loop.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::tree::{NodeId, Tree};

pub const RETURN: &str = "_return";
pub const BREAK: &str = "_break";
pub const CONTINUE: &str = "_continue";

/// Control flow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Control {
    #[default]
    None,
    Return,
    Break,
    Continue,
}

impl Control {
    /// Control signalled by a node named `name`
    pub fn from_name(name: &str) -> Control {
        match name {
            RETURN => Control::Return,
            BREAK => Control::Break,
            CONTINUE => Control::Continue,
            _ => Control::None,
        }
    }

    /// Name of the sentinel node for this signal
    pub fn sentinel(self) -> Option<&'static str> {
        match self {
            Control::None => None,
            Control::Return => Some(RETURN),
            Control::Break => Some(BREAK),
            Control::Continue => Some(CONTINUE),
        }
    }

    pub fn is_active(self) -> bool {
        self != Control::None
    }

    /// Signal pending at the root of the tree `node` belongs to
    pub fn pending(tree: &Tree, node: NodeId) -> Control {
        tree.root(node)
            .and_then(|root| tree.first_child(root))
            .map(|first| Control::from_name(tree.name(first)))
            .unwrap_or_default()
    }
}

/// Raise `control` by inserting its sentinel at the root of `node`'s tree
pub fn signal(tree: &mut Tree, node: NodeId, control: Control) -> Result<()> {
    let (Some(root), Some(name)) = (tree.root(node), control.sentinel()) else {
        return Ok(());
    };
    let sentinel = tree.create(name, None);
    tree.insert(root, 0, sentinel)
}

/// Remove a pending signal from the root of `node`'s tree
///
/// Returns the signal that was removed.
pub fn clear(tree: &mut Tree, node: NodeId) -> Control {
    let Some(first) = tree.root(node).and_then(|root| tree.first_child(root)) else {
        return Control::None;
    };
    let control = Control::from_name(tree.name(first));
    if control.is_active() {
        tree.remove(first);
    }
    control
}

/// Remove a `_return` sentinel that is the first child of `block`
pub fn strip_return(tree: &mut Tree, block: NodeId) {
    if let Some(first) = tree.first_child(block) {
        if tree.name(first) == RETURN {
            tree.remove(first);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_lands_at_root() {
        let mut tree = Tree::new();
        let root = tree.create("", None);
        let block = tree.add(root, "block", None);
        let inner = tree.add(block, "inner", None);
        tree.add(root, "after", None);

        signal(&mut tree, inner, Control::Break).unwrap();
        assert_eq!(tree.name(tree.first_child(root).unwrap()), BREAK);
        assert_eq!(Control::pending(&tree, inner), Control::Break);

        assert_eq!(clear(&mut tree, inner), Control::Break);
        assert_eq!(Control::pending(&tree, inner), Control::None);
        assert_eq!(tree.child_count(root), 2);
    }

    #[test]
    fn test_strip_return_only_touches_first_child() {
        let mut tree = Tree::new();
        let block = tree.create("", None);
        tree.add(block, "foo", None);
        tree.add(block, RETURN, None);

        strip_return(&mut tree, block);
        assert_eq!(tree.child_count(block), 2);

        signal(&mut tree, block, Control::Return).unwrap();
        strip_return(&mut tree, block);
        assert_eq!(tree.child_count(block), 2);
        assert_eq!(tree.name(tree.first_child(block).unwrap()), "foo");
    }

    #[test]
    fn test_pending_on_removed_node() {
        let mut tree = Tree::new();
        let root = tree.create("", None);
        let node = tree.add(root, "gone", None);
        tree.remove(node);

        assert_eq!(Control::pending(&tree, node), Control::None);
    }
}
