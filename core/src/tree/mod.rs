//! # Node Tree
//!
//! All lambda state lives in a [`Tree`]: an arena of nodes addressed by
//! generational [`NodeId`] handles.
//!
//! Handlers are free to restructure the tree while the interpreter is walking
//! it, so handles must survive deletion of the node they point at. Removing a
//! node frees its slot and bumps the slot generation; every navigation method
//! (`parent`, `next_sibling`, `first_child`, `root`, ...) answers `None` for a
//! stale handle instead of pointing at whatever reused the slot.
//!
//! Accessors that read node data (`name`, `value`, `children`) expect a live
//! handle and panic otherwise, like indexing a `Vec` out of bounds.

pub mod value;

#[cfg(test)]
mod tests;

pub use value::Value;

use crate::errors::{LambdaError, NodeContext, Result};

/* ===================== Handles ===================== */

/// Handle to a node inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    value: Option<Value>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/* ===================== Tree ===================== */

/// Arena owning every node of one logical execution
#[derive(Debug, Default)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached node
    pub fn create(&mut self, name: impl Into<String>, value: impl Into<Option<Value>>) -> NodeId {
        let data = NodeData {
            name: name.into(),
            value: None,
            parent: None,
            children: Vec::new(),
        };

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = Some(data);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                NodeId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.live += 1;

        let value = value.into();
        if value.is_some() {
            self.set_value(id, value);
        }
        id
    }

    /// Create a node and append it to `parent`
    pub fn add(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        value: impl Into<Option<Value>>,
    ) -> NodeId {
        let child = self.create(name, value);
        self.link(parent, None, child);
        child
    }

    /// Number of live nodes in the arena
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
    }

    fn data(&self, id: NodeId) -> &NodeData {
        self.get(id)
            .unwrap_or_else(|| panic!("stale node handle {:?}", id))
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("stale node handle {:?}", id))
    }

    /* ===================== Node Data ===================== */

    pub fn name(&self, id: NodeId) -> &str {
        &self.data(id).name
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.data_mut(id).name = name.into();
    }

    pub fn value(&self, id: NodeId) -> Option<&Value> {
        self.data(id).value.as_ref()
    }

    /// Replace the value of `id`
    ///
    /// A `Value::Node` takes ownership of the nested node (it is detached if it
    /// had a parent). A previously owned nested node is freed.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<Option<Value>>) {
        let value = value.into();
        let incoming = value.as_ref().and_then(|v| match v {
            Value::Node(nested) => Some(*nested),
            _ => None,
        });
        if let Some(nested) = incoming {
            self.detach(nested);
        }

        let old = std::mem::replace(&mut self.data_mut(id).value, value);
        if let Some(Value::Node(old_nested)) = old {
            if incoming != Some(old_nested) {
                self.remove(old_nested);
            }
        }
    }

    /// Move the value out of `id`, leaving it without one
    ///
    /// An owned nested node is handed to the caller rather than freed.
    pub fn take_value(&mut self, id: NodeId) -> Option<Value> {
        self.data_mut(id).value.take()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.data(id).children.len()
    }

    /* ===================== Navigation ===================== */

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.children.first().copied()
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.get(id)?.children.get(index).copied()
    }

    /// First child named `name`
    pub fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.get(id)?
            .children
            .iter()
            .copied()
            .find(|child| self.name(*child) == name)
    }

    /// Position of `id` among its siblings
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.data(parent).children.iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        self.child(parent, index + 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }

    /// Topmost ancestor of `id` (itself when detached)
    pub fn root(&self, id: NodeId) -> Option<NodeId> {
        if !self.is_alive(id) {
            return None;
        }
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        Some(current)
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// All descendants of `id` in pre-order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /* ===================== Structure ===================== */

    /// Append `child` as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let count = self.child_count(parent);
        self.insert(parent, count, child)
    }

    /// Insert `child` at `index` beneath `parent`
    ///
    /// The child is moved if it already has a parent. Indexes past the end
    /// append.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        if child == parent || self.is_ancestor(child, parent) {
            return Err(LambdaError::CyclicInsertion {
                child: NodeContext::capture(self, child),
                parent: NodeContext::capture(self, parent),
            });
        }

        let mut index = index;
        if let Some(old_parent) = self.parent(child) {
            if old_parent == parent {
                if let Some(old_index) = self.index_of(child) {
                    if old_index < index {
                        index -= 1;
                    }
                }
            }
            self.detach(child);
        }

        let index = index.min(self.child_count(parent));
        self.link(parent, Some(index), child);
        Ok(())
    }

    fn link(&mut self, parent: NodeId, index: Option<usize>, child: NodeId) {
        self.data_mut(child).parent = Some(parent);
        let children = &mut self.data_mut(parent).children;
        match index {
            Some(i) => children.insert(i, child),
            None => children.push(child),
        }
    }

    /// Unlink `id` from its parent, keeping it alive
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.data_mut(parent).children.retain(|c| *c != id);
        self.data_mut(id).parent = None;
    }

    /// Unlink `id` and free it together with its whole subtree
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.detach(id);
        self.free_subtree(id);
    }

    /// Remove every child of `id`
    pub fn clear(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.data_mut(id).children);
        for child in children {
            self.data_mut(child).parent = None;
            self.free_subtree(child);
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            let Some(data) = slot.data.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
            self.live -= 1;

            stack.extend(data.children);
            if let Some(Value::Node(nested)) = data.value {
                stack.push(nested);
            }
        }
    }

    /// Deep copy of `id` with new identities, detached
    ///
    /// Owned nested nodes are copied too; `Ref` values keep pointing at the
    /// same node.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let (name, value, children) = {
            let data = self.data(id);
            (data.name.clone(), data.value.clone(), data.children.clone())
        };

        let value = match value {
            Some(Value::Node(nested)) => Some(Value::Node(self.deep_clone(nested))),
            other => other,
        };

        let copy = self.create(name, value);
        for child in children {
            let child_copy = self.deep_clone(child);
            self.link(copy, None, child_copy);
        }
        copy
    }
}
