//! Node value types

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::NodeId;

/// Value carried by a node
///
/// `Node` owns a detached sub-tree living in the same arena (a nested program);
/// it is cloned along with its holder and freed with it. `Ref` points at a node
/// that is owned elsewhere and is never cloned or freed through the value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Byte(u8),
    SByte(i8),
    Char(char),
    Blob(Vec<u8>),
    Date(DateTime<Utc>),
    Guid(Uuid),
    /// Path expression, resolved lazily
    Expr(String),
    Node(NodeId),
    Ref(NodeId),
}

impl Value {
    /// Lambda type name used in source text
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::SByte(_) => "sbyte",
            Value::Char(_) => "char",
            Value::Blob(_) => "blob",
            Value::Date(_) => "date",
            Value::Guid(_) => "guid",
            Value::Expr(_) => "x",
            Value::Node(_) | Value::Ref(_) => "node",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of numeric values, without parsing strings
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Byte(b) => Some(i64::from(*b)),
            Value::SByte(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Node addressed by a `Node` or `Ref` value
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) | Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Value::Expr(_))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
