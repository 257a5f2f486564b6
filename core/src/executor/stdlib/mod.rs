//! Standard keywords
//!
//! Handlers for the events every registry built with
//! [`Registry::with_stdlib`](super::Registry::with_stdlib) understands.

pub mod io;
pub mod lambda;
pub mod widgets;

use super::registry::Registry;
use crate::tree::{NodeId, Tree, Value};

/// Register every standard keyword
pub fn register_all(registry: &mut Registry) {
    registry.register("eval", lambda::eval);
    registry.register("eval-mutable", lambda::eval_mutable);
    registry.register("return", lambda::return_);
    registry.register("break", lambda::break_);
    registry.register("continue", lambda::continue_);
    registry.register("for-each", lambda::for_each);

    registry.register("get-widget-property", widgets::get_widget_property);
    registry.register("set-widget-property", widgets::set_widget_property);
    registry.register("delete-widget-property", widgets::delete_widget_property);
    registry.register("list-widget-properties", widgets::list_widget_properties);

    registry.register("load-file", io::load_file);
    registry.register("save-file", io::save_file);
}

/// Copy of `value` that is safe to store on another node
///
/// A nested node value is owned by exactly one node, so it is deep-cloned.
pub(crate) fn own_value(tree: &mut Tree, value: Value) -> Value {
    match value {
        Value::Node(nested) if tree.is_alive(nested) => Value::Node(tree.deep_clone(nested)),
        other => other,
    }
}

/// Snapshot of `node`'s children, for removal once a keyword is done
pub(crate) fn arguments(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    tree.children(node).to_vec()
}

/// Remove the arguments a keyword was called with, and its value
pub(crate) fn remove_arguments(tree: &mut Tree, node: NodeId, args: Vec<NodeId>) {
    for arg in args {
        tree.remove(arg);
    }
    tree.set_value(node, None);
}
