//! Lambda reader - PEST-based parser for lambda source text
//!
//! Turns source text into nodes of a [`Tree`]. The reverse direction lives in
//! [`writer`].

use pest::Parser;
use pest_derive::Parser;

use crate::convert;
use crate::tree::{NodeId, Tree, Value};

pub mod writer;


pub use writer::{render_children, render_node, snapshot, NodeSnapshot};

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/lambda.pest"]
struct LambdaParser;

/* ===================== Error Types ===================== */

/// Source location for error reporting (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    PestError(String, Option<Span>),
    BuildError(String, Option<Span>),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::PestError(_, span) => *span,
            ParseError::BuildError(_, span) => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::PestError(msg, _) => msg,
            ParseError::BuildError(msg, _) => msg,
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let span = match err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => Span {
                line: line.saturating_sub(1),
                col: col.saturating_sub(1),
            },
            pest::error::LineColLocation::Span((line, col), _) => Span {
                line: line.saturating_sub(1),
                col: col.saturating_sub(1),
            },
        };
        ParseError::PestError(err.to_string(), Some(span))
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::PestError(msg, _) => write!(f, "{}", msg),
            ParseError::BuildError(msg, Some(span)) => write!(f, "line {}: {}", span.line + 1, msg),
            ParseError::BuildError(msg, None) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

fn pair_to_span(pair: &pest::iterators::Pair<Rule>) -> Span {
    let (line, col) = pair.as_span().start_pos().line_col();
    Span {
        line: line.saturating_sub(1),
        col: col.saturating_sub(1),
    }
}

/* ===================== Entry Points ===================== */

/// Parse lambda source text into a detached, anonymous root node
///
/// The parsed top-level nodes become the root's children.
pub fn parse_lambda(tree: &mut Tree, source: &str) -> ParseResult<NodeId> {
    let root = tree.create("", None);
    if let Err(err) = parse_into(tree, root, source) {
        tree.remove(root);
        return Err(err);
    }
    Ok(root)
}

/// Parse lambda source text, appending the top-level nodes to `parent`
pub fn parse_into(tree: &mut Tree, parent: NodeId, source: &str) -> ParseResult<()> {
    let document = LambdaParser::parse(Rule::document, source)?
        .next()
        .ok_or_else(|| ParseError::BuildError("empty document".to_string(), None))?;

    // parents[depth] is the node that receives children indented at `depth`
    let mut parents = vec![parent];

    for line in document.into_inner() {
        if line.as_rule() != Rule::line {
            continue;
        }
        let span = pair_to_span(&line);

        let mut indent = 0;
        let mut entry = None;
        for part in line.into_inner() {
            match part.as_rule() {
                Rule::indent => indent = part.as_str().len(),
                Rule::node => entry = Some(part),
                _ => {}
            }
        }

        let Some(entry) = entry else {
            continue;
        };
        if entry.as_str().trim().is_empty() {
            continue;
        }

        if indent % 2 != 0 {
            return Err(ParseError::BuildError(
                "indentation must be a multiple of two spaces".to_string(),
                Some(span),
            ));
        }
        let depth = indent / 2;
        if depth >= parents.len() {
            return Err(ParseError::BuildError(
                "indentation is more than one level deeper than the previous node".to_string(),
                Some(span),
            ));
        }

        let (name, value) = build_node(tree, entry, span)?;
        parents.truncate(depth + 1);
        let node = tree.add(parents[depth], name, value);
        parents.push(node);
    }

    Ok(())
}

/* ===================== Node Builders ===================== */

fn build_node(
    tree: &mut Tree,
    pair: pest::iterators::Pair<Rule>,
    span: Span,
) -> ParseResult<(String, Option<Value>)> {
    let mut name = String::new();
    let mut type_name = None;
    let mut text = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::name => name = read_text(part),
            Rule::type_name => type_name = Some(part.as_str().to_string()),
            Rule::value => text = Some(read_text(part)),
            _ => {}
        }
    }

    let Some(text) = text else {
        return Ok((name, None));
    };

    let value = match type_name.as_deref() {
        None => Value::Str(text),
        Some("node") => {
            let nested = parse_lambda(tree, &text).map_err(|e| {
                ParseError::BuildError(format!("invalid nested lambda: {}", e), Some(span))
            })?;
            Value::Node(nested)
        }
        // Blobs are base64 in source text
        Some(t) => convert::parse_scalar(t, &text, true)
            .map_err(|e| ParseError::BuildError(e.to_string(), Some(span)))?,
    };

    Ok((name, Some(value)))
}

/// Text of a `name` or `value` pair with quoting removed
fn read_text(pair: pest::iterators::Pair<Rule>) -> String {
    let Some(inner) = pair.into_inner().next() else {
        return String::new();
    };

    match inner.as_rule() {
        Rule::quoted => inner
            .into_inner()
            .next()
            .map(|p| unescape(p.as_str()))
            .unwrap_or_default(),
        Rule::verbatim => inner
            .into_inner()
            .next()
            .map(|p| p.as_str().replace("\"\"", "\""))
            .unwrap_or_default(),
        _ => inner.as_str().trim_end().to_string(),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
