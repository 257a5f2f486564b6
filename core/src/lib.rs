pub mod auth;
pub mod cli;
pub mod config;
pub mod convert;
pub mod errors;
pub mod executor;
pub mod expression;
pub mod parser;
pub mod tree;
pub mod widgets;

// Re-export main types
pub use errors::{LambdaError, Result};
pub use executor::{evaluate, run, run_mutable, Context, Control, Registry, UnknownEventPolicy};
pub use tree::{NodeId, Tree, Value};
