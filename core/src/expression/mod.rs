//! # Expressions and the source iterator
//!
//! A node's value may be a literal, a nested node or a path expression. The
//! [`iterate`] function is the single way to read "a value that might be an
//! expression": it resolves the value into a sequence of [`Item`]s without
//! restructuring the tree. The whole result set is resolved up front, so
//! edits made while consuming the items do not change what is yielded.
//!
//! ## Path Expressions
//!
//! Expressions are evaluated relative to the node holding them (the
//! *identity*). Each `/`-prefixed iterator maps the current node set to a new
//! one:
//!
//! | iterator | result |
//! |----------|--------|
//! | `/..`    | root |
//! | `/.`     | parent |
//! | `/*`     | children |
//! | `/**`    | descendants, pre-order |
//! | `/N`     | N-th child |
//! | `/[a,b]` | children `a..b` |
//! | `/#`     | node referenced by the value |
//! | `/-` `/+`| previous / next sibling |
//! | `/=text` | nodes whose value displays as `text` |
//! | `/name`  | nodes in the set named `name` |
//!
//! A trailing `?node` (default), `?value`, `?name` or `?count` picks what is
//! yielded for the final set.

use std::collections::HashSet;

use pest::Parser;
use pest_derive::Parser;

use crate::convert::format_scalar;
use crate::errors::{LambdaError, NodeContext, Result};
use crate::tree::{NodeId, Tree, Value};


#[derive(Parser)]
#[grammar = "expression/expression.pest"]
struct ExpressionParser;

/* ===================== Expression AST ===================== */

/// One iterator of a path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Root,
    Parent,
    Children,
    Descendants,
    Reference,
    Previous,
    Next,
    Index(usize),
    Range(usize, usize),
    ValueEquals(String),
    Named(String),
}

/// What an expression yields for its final node set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultKind {
    #[default]
    Node,
    Value,
    Name,
    Count,
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expression {
    pub steps: Vec<PathStep>,
    pub kind: ResultKind,
}

/// One item produced by resolving a value
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Node(NodeId),
    Value(Value),
    Name(String),
    Count(usize),
}

impl Expression {
    /// Parse expression text
    ///
    /// Errors are returned as plain messages; callers attach node context.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let pair = ExpressionParser::parse(Rule::expression, text)
            .map_err(|e| e.variant.message().into_owned())?
            .next()
            .ok_or_else(|| "empty expression".to_string())?;

        let mut expression = Expression::default();
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::step => {
                    let Some(iterator) = part.into_inner().next() else {
                        continue;
                    };
                    expression.steps.push(build_step(iterator)?);
                }
                Rule::kind => {
                    let name = part
                        .into_inner()
                        .next()
                        .map(|p| p.as_str())
                        .unwrap_or("node");
                    expression.kind = match name {
                        "value" => ResultKind::Value,
                        "name" => ResultKind::Name,
                        "count" => ResultKind::Count,
                        _ => ResultKind::Node,
                    };
                }
                _ => {}
            }
        }
        Ok(expression)
    }

    /// Evaluate against `tree`, starting from `identity`
    pub fn evaluate(&self, tree: &Tree, identity: NodeId) -> Vec<Item> {
        let mut current = if tree.is_alive(identity) {
            vec![identity]
        } else {
            Vec::new()
        };

        for step in &self.steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for node in &current {
                for candidate in apply_step(tree, step, *node) {
                    if seen.insert(candidate) {
                        next.push(candidate);
                    }
                }
            }
            current = next;
        }

        match self.kind {
            ResultKind::Node => current.into_iter().map(Item::Node).collect(),
            ResultKind::Value => current
                .into_iter()
                .filter_map(|n| tree.value(n).cloned())
                .map(Item::Value)
                .collect(),
            ResultKind::Name => current
                .into_iter()
                .map(|n| Item::Name(tree.name(n).to_string()))
                .collect(),
            ResultKind::Count => vec![Item::Count(current.len())],
        }
    }
}

fn build_step(pair: pest::iterators::Pair<Rule>) -> std::result::Result<PathStep, String> {
    let step = match pair.as_rule() {
        Rule::root => PathStep::Root,
        Rule::parent => PathStep::Parent,
        Rule::children => PathStep::Children,
        Rule::descendants => PathStep::Descendants,
        Rule::reference => PathStep::Reference,
        Rule::previous => PathStep::Previous,
        Rule::next => PathStep::Next,
        Rule::index => PathStep::Index(parse_number(pair.as_str())?),
        Rule::range => {
            let mut numbers = pair.into_inner();
            let start = numbers.next().map(|p| p.as_str()).unwrap_or("0");
            let end = numbers.next().map(|p| p.as_str()).unwrap_or("0");
            PathStep::Range(parse_number(start)?, parse_number(end)?)
        }
        Rule::value_eq => PathStep::ValueEquals(
            pair.into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
        ),
        Rule::named => PathStep::Named(pair.as_str().to_string()),
        other => return Err(format!("unexpected iterator {:?}", other)),
    };
    Ok(step)
}

fn parse_number(text: &str) -> std::result::Result<usize, String> {
    text.parse::<usize>()
        .map_err(|e| format!("invalid number '{}': {}", text, e))
}

fn apply_step(tree: &Tree, step: &PathStep, node: NodeId) -> Vec<NodeId> {
    match step {
        PathStep::Root => tree.root(node).into_iter().collect(),
        PathStep::Parent => tree.parent(node).into_iter().collect(),
        PathStep::Children => tree.children(node).to_vec(),
        PathStep::Descendants => tree.descendants(node),
        PathStep::Reference => tree
            .value(node)
            .and_then(Value::as_node)
            .filter(|target| tree.is_alive(*target))
            .into_iter()
            .collect(),
        PathStep::Previous => tree.previous_sibling(node).into_iter().collect(),
        PathStep::Next => tree.next_sibling(node).into_iter().collect(),
        PathStep::Index(i) => tree.child(node, *i).into_iter().collect(),
        PathStep::Range(start, end) => {
            let children = tree.children(node);
            let end = (*end).min(children.len());
            let start = (*start).min(end);
            children[start..end].to_vec()
        }
        PathStep::ValueEquals(text) => {
            let matches = tree
                .value(node)
                .and_then(|v| format_scalar(v, false))
                .map(|shown| shown == *text)
                .unwrap_or(false);
            if matches {
                vec![node]
            } else {
                Vec::new()
            }
        }
        PathStep::Named(name) => {
            if tree.name(node) == name {
                vec![node]
            } else {
                Vec::new()
            }
        }
    }
}

/* ===================== Source Iterator ===================== */

/// Items a value resolved to
///
/// Resolution happens when [`iterate`] is called; iterating again means
/// calling [`iterate`] again.
#[derive(Debug)]
pub struct Items {
    inner: std::vec::IntoIter<Item>,
}

impl Items {
    fn new(items: Vec<Item>) -> Self {
        Self {
            inner: items.into_iter(),
        }
    }
}

impl Iterator for Items {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        self.inner.next()
    }
}

/// Resolve the value of `node`
///
/// - no value: nothing
/// - expression: the expression's result set
/// - nested node or reference: that node
/// - any other literal: the literal itself
pub fn iterate(tree: &Tree, node: NodeId) -> Result<Items> {
    let items = match tree.value(node) {
        None => Vec::new(),
        Some(Value::Expr(text)) => {
            let expression = Expression::parse(text).map_err(|message| LambdaError::Expression {
                expression: text.clone(),
                message,
                node: NodeContext::capture(tree, node),
            })?;
            expression.evaluate(tree, node)
        }
        Some(Value::Node(nested)) | Some(Value::Ref(nested)) => vec![Item::Node(*nested)],
        Some(other) => vec![Item::Value(other.clone())],
    };
    Ok(Items::new(items))
}

/// First resolved item of `node`, as a value
///
/// Node items contribute their own value, names become strings and counts
/// integers.
pub fn single_value(tree: &Tree, node: NodeId) -> Result<Option<Value>> {
    Ok(iterate(tree, node)?.next().and_then(|item| item_value(tree, item)))
}

/// Every resolved item of `node` that has a value
pub fn values(tree: &Tree, node: NodeId) -> Result<Vec<Value>> {
    Ok(iterate(tree, node)?
        .filter_map(|item| item_value(tree, item))
        .collect())
}

/// Every resolved item of `node` in its text form
pub fn strings(tree: &Tree, node: NodeId) -> Result<Vec<String>> {
    Ok(values(tree, node)?
        .iter()
        .filter_map(|v| format_scalar(v, false))
        .collect())
}

fn item_value(tree: &Tree, item: Item) -> Option<Value> {
    match item {
        Item::Node(n) => tree.value(n).cloned(),
        Item::Value(v) => Some(v),
        Item::Name(name) => Some(Value::Str(name)),
        Item::Count(count) => Some(Value::Int(count as i64)),
    }
}
