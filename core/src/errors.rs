//! Error types for the lambda engine
//!
//! Every error that can abort an invocation chain is a [`LambdaError`]. Errors
//! raised while a node is being processed carry a [`NodeContext`] snapshot of
//! that node, so they stay attributable after the tree they came from has been
//! discarded.

use std::fmt;

use thiserror::Error;

use crate::parser::ParseError;
use crate::tree::{NodeId, Tree};

/// Broad classification of a [`LambdaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed program structure (bad offset, cycles, non-executable sources)
    Structural,
    /// No handler registered for a name under the strict policy
    Dispatch,
    /// Raised by a handler itself
    Handler,
}

/// Snapshot of the node an error refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContext {
    /// Name of the node
    pub name: String,
    /// The node rendered as lambda text
    pub lambda: String,
}

impl NodeContext {
    /// Capture name and rendered text of `node`
    pub fn capture(tree: &Tree, node: NodeId) -> Self {
        if !tree.is_alive(node) {
            return Self {
                name: "<removed>".to_string(),
                lambda: String::new(),
            };
        }
        Self {
            name: tree.name(node).to_string(),
            lambda: crate::parser::render_node(tree, node),
        }
    }
}

impl fmt::Display for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.name)
    }
}

/// Access was refused by the authorization collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct Denied {
    /// The path that was requested
    pub path: String,
    /// Why access was refused
    pub reason: String,
}

impl Denied {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A value could not be converted to or from its text representation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert '{text}' to {type_name}: {message}")]
pub struct ConversionError {
    pub type_name: String,
    pub text: String,
    pub message: String,
}

impl ConversionError {
    pub fn new(
        type_name: impl Into<String>,
        text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            text: text.into(),
            message: message.into(),
        }
    }
}

/// Main error type for lambda execution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LambdaError {
    /// `[offset]` points past the end of the block
    #[error("[offset] of {offset} is too large for {node}, which has only {count} children")]
    OffsetOutOfRange {
        offset: usize,
        count: usize,
        node: NodeContext,
    },

    /// A node was inserted beneath itself or one of its own descendants
    #[error("cannot insert {child} beneath {parent}, it would become its own ancestor")]
    CyclicInsertion {
        child: NodeContext,
        parent: NodeContext,
    },

    /// A source resolved to something that cannot be executed as a block
    #[error("{node} does not resolve to an executable lambda block: {message}")]
    NotExecutable { message: String, node: NodeContext },

    /// Nested executions went deeper than the configured maximum
    #[error("maximum execution depth of {max} exceeded while executing {node}")]
    DepthExceeded { max: usize, node: NodeContext },

    /// A path expression could not be parsed
    #[error("invalid expression '{expression}' in {node}: {message}")]
    Expression {
        expression: String,
        message: String,
        node: NodeContext,
    },

    /// Lambda source text could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Strict dispatch policy and nobody handles this name
    #[error("no handler registered for [{name}]")]
    UnknownEvent { name: String, node: NodeContext },

    /// Generic failure raised by a handler
    #[error("{message} in {node}")]
    Execution { message: String, node: NodeContext },

    /// Authorization refused a path
    #[error("access denied: {source}")]
    Denied {
        #[source]
        source: Denied,
        node: NodeContext,
    },

    /// A handler failed to convert a value
    #[error("{source} in {node}")]
    Conversion {
        #[source]
        source: ConversionError,
        node: NodeContext,
    },

    /// File system failure inside a handler
    #[error("I/O error on '{path}': {message} in {node}")]
    Io {
        path: String,
        message: String,
        node: NodeContext,
    },
}

impl LambdaError {
    /// Create a handler error for `node`
    pub fn execution(tree: &Tree, node: NodeId, message: impl Into<String>) -> Self {
        LambdaError::Execution {
            message: message.into(),
            node: NodeContext::capture(tree, node),
        }
    }

    /// Attach a refused authorization to `node`
    pub fn denied(tree: &Tree, node: NodeId, source: Denied) -> Self {
        LambdaError::Denied {
            source,
            node: NodeContext::capture(tree, node),
        }
    }

    /// Attach a failed conversion to `node`
    pub fn conversion(tree: &Tree, node: NodeId, source: ConversionError) -> Self {
        LambdaError::Conversion {
            source,
            node: NodeContext::capture(tree, node),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LambdaError::OffsetOutOfRange { .. }
            | LambdaError::CyclicInsertion { .. }
            | LambdaError::NotExecutable { .. }
            | LambdaError::DepthExceeded { .. }
            | LambdaError::Expression { .. }
            | LambdaError::Parse(_) => ErrorKind::Structural,
            LambdaError::UnknownEvent { .. } => ErrorKind::Dispatch,
            LambdaError::Execution { .. }
            | LambdaError::Denied { .. }
            | LambdaError::Conversion { .. }
            | LambdaError::Io { .. } => ErrorKind::Handler,
        }
    }

    /// The node this error refers to, when there is one
    pub fn node(&self) -> Option<&NodeContext> {
        match self {
            LambdaError::OffsetOutOfRange { node, .. }
            | LambdaError::NotExecutable { node, .. }
            | LambdaError::DepthExceeded { node, .. }
            | LambdaError::Expression { node, .. }
            | LambdaError::UnknownEvent { node, .. }
            | LambdaError::Execution { node, .. }
            | LambdaError::Denied { node, .. }
            | LambdaError::Conversion { node, .. }
            | LambdaError::Io { node, .. } => Some(node),
            LambdaError::CyclicInsertion { child, .. } => Some(child),
            LambdaError::Parse(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LambdaError>;
