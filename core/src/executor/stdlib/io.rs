//! File keywords - `load-file` and `save-file`
//!
//! Paths are lambda paths (`/folder/file.hl`) resolved against the
//! context's I/O root. Every path is authorized before it is touched.

use std::path::PathBuf;

use tracing::debug;

use super::{arguments, remove_arguments};
use crate::errors::{LambdaError, NodeContext, Result};
use crate::executor::context::Context;
use crate::expression;
use crate::parser::render_children;
use crate::tree::{NodeId, Tree, Value};

/// `load-file` - read one or more files
///
/// Each file becomes a child named after its path holding the content.
pub fn load_file(ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let paths = expression::strings(tree, node)?;
    let args = arguments(tree, node);

    let mut loaded = Vec::new();
    for path in paths {
        ctx.authorizer()
            .authorize_read(ctx.ticket(), &path)
            .map_err(|denied| LambdaError::denied(tree, node, denied))?;

        let full = resolve(ctx, &path);
        debug!(path = %full.display(), "loading file");
        let content = std::fs::read_to_string(&full).map_err(|e| io_error(tree, node, &path, e))?;
        loaded.push((path, content));
    }

    remove_arguments(tree, node, args);
    for (path, content) in loaded {
        tree.add(node, path, Value::Str(content));
    }
    Ok(())
}

/// `save-file` - write a file
///
/// The content is the resolved value of a `src` child, or the remaining
/// children rendered as lambda text when there is no `src`.
pub fn save_file(ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let Some(path) = expression::strings(tree, node)?.into_iter().next() else {
        return Err(LambdaError::execution(tree, node, "no file path given"));
    };

    ctx.authorizer()
        .authorize_modify(ctx.ticket(), &path)
        .map_err(|denied| LambdaError::denied(tree, node, denied))?;

    let content = match tree.child_named(node, "src") {
        Some(src) => expression::strings(tree, src)?.concat(),
        None => render_children(tree, node),
    };

    let full = resolve(ctx, &path);
    debug!(path = %full.display(), bytes = content.len(), "saving file");
    if let Some(folder) = full.parent() {
        std::fs::create_dir_all(folder).map_err(|e| io_error(tree, node, &path, e))?;
    }
    std::fs::write(&full, content).map_err(|e| io_error(tree, node, &path, e))?;

    let args = arguments(tree, node);
    remove_arguments(tree, node, args);
    Ok(())
}

fn resolve(ctx: &Context, path: &str) -> PathBuf {
    ctx.io_root().join(path.trim_start_matches('/'))
}

fn io_error(tree: &Tree, node: NodeId, path: &str, err: std::io::Error) -> LambdaError {
    LambdaError::Io {
        path: path.to_string(),
        message: err.to_string(),
        node: NodeContext::capture(tree, node),
    }
}
