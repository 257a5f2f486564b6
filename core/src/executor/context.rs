//! Execution context - everything a handler may need besides the tree

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::registry::Registry;
use crate::auth::{Authorizer, PathAuthorizer, Ticket};
use crate::config::Config;
use crate::convert::{DefaultConverter, TypeConverter};
use crate::errors::{LambdaError, NodeContext, Result};
use crate::tree::{NodeId, Tree};
use crate::widgets::{InMemoryWidgets, WidgetStore};

/// State shared by one invocation chain
///
/// Passed explicitly to every handler. The registry and collaborators are
/// shared; the widget store and the depth counter belong to this chain.
pub struct Context {
    registry: Arc<Registry>,
    ticket: Ticket,
    converter: Arc<dyn TypeConverter>,
    authorizer: Arc<dyn Authorizer>,
    widgets: Box<dyn WidgetStore>,
    io_root: PathBuf,
    depth: usize,
    max_depth: usize,
}

impl Context {
    pub fn builder(registry: Arc<Registry>) -> ContextBuilder {
        ContextBuilder::new(registry)
    }

    /// Dispatch `node` to the handlers registered for its name
    pub fn raise(&mut self, tree: &mut Tree, node: NodeId) -> Result<()> {
        let name = tree.name(node).to_string();
        self.raise_as(tree, &name, node)
    }

    /// Dispatch `node` to the handlers registered for `name`
    pub fn raise_as(&mut self, tree: &mut Tree, name: &str, node: NodeId) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        registry.dispatch(self, tree, name, node)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    pub fn set_ticket(&mut self, ticket: Ticket) {
        self.ticket = ticket;
    }

    pub fn converter(&self) -> &dyn TypeConverter {
        self.converter.as_ref()
    }

    pub fn authorizer(&self) -> &dyn Authorizer {
        self.authorizer.as_ref()
    }

    pub fn widgets(&self) -> &dyn WidgetStore {
        self.widgets.as_ref()
    }

    pub fn widgets_mut(&mut self) -> &mut dyn WidgetStore {
        self.widgets.as_mut()
    }

    pub fn io_root(&self) -> &Path {
        &self.io_root
    }

    /// Current nesting of block executions
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Run `f` one level deeper, failing once the maximum depth is reached
    pub(crate) fn nested<T>(
        &mut self,
        tree: &mut Tree,
        node: NodeId,
        f: impl FnOnce(&mut Context, &mut Tree) -> Result<T>,
    ) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(LambdaError::DepthExceeded {
                max: self.max_depth,
                node: NodeContext::capture(tree, node),
            });
        }
        self.depth += 1;
        let result = f(self, tree);
        self.depth -= 1;
        result
    }
}

/// Builder for [`Context`]
///
/// Everything except the registry has a default: a guest ticket, the
/// built-in converter, a [`PathAuthorizer`] with default rules, an empty
/// widget store and the working directory as I/O root.
pub struct ContextBuilder {
    registry: Arc<Registry>,
    ticket: Ticket,
    converter: Arc<dyn TypeConverter>,
    authorizer: Arc<dyn Authorizer>,
    widgets: Box<dyn WidgetStore>,
    io_root: PathBuf,
    max_depth: usize,
}

impl ContextBuilder {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            ticket: Ticket::default(),
            converter: Arc::new(DefaultConverter),
            authorizer: Arc::new(PathAuthorizer::default()),
            widgets: Box::new(InMemoryWidgets::new()),
            io_root: PathBuf::from("."),
            max_depth: 256,
        }
    }

    /// Take authorizer, I/O root and depth limit from `config`
    pub fn config(mut self, config: &Config) -> Self {
        self.authorizer = Arc::new(config.auth.authorizer());
        self.io_root = config.io.root.clone();
        self.max_depth = config.engine.max_depth;
        self
    }

    pub fn ticket(mut self, ticket: Ticket) -> Self {
        self.ticket = ticket;
        self
    }

    pub fn converter(mut self, converter: Arc<dyn TypeConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn widgets(mut self, widgets: impl WidgetStore + 'static) -> Self {
        self.widgets = Box::new(widgets);
        self
    }

    pub fn io_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.io_root = root.into();
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn build(self) -> Context {
        Context {
            registry: self.registry,
            ticket: self.ticket,
            converter: self.converter,
            authorizer: self.authorizer,
            widgets: self.widgets,
            io_root: self.io_root,
            depth: 0,
            max_depth: self.max_depth,
        }
    }
}
