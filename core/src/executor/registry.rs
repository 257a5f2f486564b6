//! Event registry - maps node names to the handlers that execute them

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::context::Context;
use crate::errors::{LambdaError, NodeContext, Result};
use crate::tree::{NodeId, Tree};

/// Something that can execute a node
///
/// Any `Fn(&mut Context, &mut Tree, NodeId) -> Result<()>` closure is a
/// handler.
pub trait Handler: Send + Sync {
    fn execute(&self, ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()>;
}

impl<F> Handler for F
where
    F: Fn(&mut Context, &mut Tree, NodeId) -> Result<()> + Send + Sync,
{
    fn execute(&self, ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
        self(ctx, tree, node)
    }
}

/// What dispatching a name without handlers does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownEventPolicy {
    /// Fail with [`LambdaError::UnknownEvent`]
    #[default]
    Error,
    /// Do nothing
    Ignore,
}

impl fmt::Display for UnknownEventPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownEventPolicy::Error => f.write_str("error"),
            UnknownEventPolicy::Ignore => f.write_str("ignore"),
        }
    }
}

impl FromStr for UnknownEventPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(UnknownEventPolicy::Error),
            "ignore" => Ok(UnknownEventPolicy::Ignore),
            _ => Err(format!(
                "unknown event policy '{}', expected 'error' or 'ignore'",
                s
            )),
        }
    }
}

/// Name to handler table
///
/// Built once, then shared read-only between contexts through an `Arc`.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<String, Vec<Arc<dyn Handler>>>,
    policy: UnknownEventPolicy,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("Registry")
            .field("events", &names)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Registry {
    pub fn new(policy: UnknownEventPolicy) -> Self {
        Self {
            handlers: HashMap::new(),
            policy,
        }
    }

    /// Registry preloaded with the standard keywords
    pub fn with_stdlib(policy: UnknownEventPolicy) -> Self {
        let mut registry = Self::new(policy);
        super::stdlib::register_all(&mut registry);
        registry
    }

    pub fn policy(&self) -> UnknownEventPolicy {
        self.policy
    }

    /// Add a handler for `name`
    ///
    /// Several handlers may share a name; they run in registration order.
    pub fn register(&mut self, name: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers
            .entry(name.into())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Add a closure handler for `name`
    pub fn register_fn<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut Context, &mut Tree, NodeId) -> Result<()> + Send + Sync + 'static,
    {
        self.register(name, handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered event names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run every handler registered for `name` against `node`
    ///
    /// The first handler error aborts the remaining handlers.
    pub fn dispatch(
        &self,
        ctx: &mut Context,
        tree: &mut Tree,
        name: &str,
        node: NodeId,
    ) -> Result<()> {
        let Some(handlers) = self.handlers.get(name) else {
            return match self.policy {
                UnknownEventPolicy::Error => Err(LambdaError::UnknownEvent {
                    name: name.to_string(),
                    node: NodeContext::capture(tree, node),
                }),
                UnknownEventPolicy::Ignore => {
                    trace!(event = name, "no handler, ignoring");
                    Ok(())
                }
            };
        };

        debug!(event = name, handlers = handlers.len(), "dispatch");
        for handler in handlers {
            // a handler removed the node, later ones have nothing to run on
            if !tree.is_alive(node) {
                break;
            }
            handler.execute(ctx, tree, node)?;
        }
        Ok(())
    }
}
