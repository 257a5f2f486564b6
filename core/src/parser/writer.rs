//! Lambda writer - renders nodes back to lambda source text

use serde::{Deserialize, Serialize};

use crate::convert::format_scalar;
use crate::tree::{NodeId, Tree, Value};

/// Type names the reader recognises in `name:type:value` position
const TYPE_NAMES: &[&str] = &[
    "int", "float", "bool", "byte", "sbyte", "char", "blob", "date", "guid", "node", "string",
    "x",
];

/// Render the children of `id` as lambda source text
pub fn render_children(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    for child in tree.children(id) {
        write_node(tree, *child, 0, &mut out);
    }
    trim_newline(out)
}

/// Render `id` itself, followed by its children
pub fn render_node(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, 0, &mut out);
    trim_newline(out)
}

fn trim_newline(mut out: String) -> String {
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

fn write_node(tree: &Tree, id: NodeId, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }

    let name = tree.name(id);
    let value = tree.value(id);
    if name.is_empty() && value.is_none() {
        out.push_str("\"\"");
    } else {
        out.push_str(&escape_name(name));
    }

    match value {
        None => {}
        Some(Value::Str(s)) => {
            out.push(':');
            out.push_str(&escape_value(s));
        }
        Some(Value::Node(nested)) | Some(Value::Ref(nested)) => {
            out.push_str(":node:");
            let text = if tree.is_alive(*nested) {
                render_children(tree, *nested)
            } else {
                String::new()
            };
            out.push_str(&verbatim(&text));
        }
        Some(other) => {
            out.push(':');
            out.push_str(other.type_name());
            out.push(':');
            let text = format_scalar(other, true).unwrap_or_default();
            out.push_str(&escape_value(&text));
        }
    }
    out.push('\n');

    for child in tree.children(id) {
        write_node(tree, *child, depth + 1, out);
    }
}

fn escape_name(name: &str) -> String {
    let needs_quotes = name.contains(':')
        || name.contains('\n')
        || name.contains('\r')
        || name.starts_with('"')
        || name.starts_with("//")
        || name.starts_with(' ')
        || name.ends_with(' ');
    if needs_quotes {
        quoted(name)
    } else {
        name.to_string()
    }
}

fn escape_value(value: &str) -> String {
    if value.contains('\n') || value.contains('\r') {
        return verbatim(value);
    }

    let looks_typed = TYPE_NAMES.iter().any(|t| {
        value
            .strip_prefix(t)
            .map(|rest| rest.starts_with(':'))
            .unwrap_or(false)
    });
    let needs_quotes = looks_typed
        || value.starts_with('"')
        || value.starts_with("@\"")
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);

    if needs_quotes {
        quoted(value)
    } else {
        value.to_string()
    }
}

fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn verbatim(text: &str) -> String {
    format!("@\"{}\"", text.replace('"', "\"\""))
}

/* ===================== Snapshots ===================== */

/// Owned, serializable copy of a node and its subtree
///
/// Used for JSON output and for structural comparisons in tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

/// Take a snapshot of `id` and its subtree
pub fn snapshot(tree: &Tree, id: NodeId) -> NodeSnapshot {
    let (type_name, value) = match tree.value(id) {
        None => (None, None),
        Some(Value::Str(s)) => (None, Some(s.clone())),
        Some(Value::Node(nested)) | Some(Value::Ref(nested)) => {
            let text = if tree.is_alive(*nested) {
                render_children(tree, *nested)
            } else {
                String::new()
            };
            (Some("node".to_string()), Some(text))
        }
        Some(other) => (
            Some(other.type_name().to_string()),
            format_scalar(other, true),
        ),
    };

    NodeSnapshot {
        name: tree.name(id).to_string(),
        type_name,
        value,
        children: tree
            .children(id)
            .iter()
            .map(|child| snapshot(tree, *child))
            .collect(),
    }
}
