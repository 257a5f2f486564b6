//! Type conversion between node values and their text form
//!
//! The lambda reader uses these rules for typed literals (`foo:int:5`), and
//! handlers use them to coerce string values to whatever they need.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::{ConversionError, LambdaError, Result};
use crate::tree::{NodeId, Tree, Value};

/// Converts values to and from their text representation
pub trait TypeConverter: Send + Sync {
    /// Build a value of `type_name` from text
    ///
    /// `decode` asks for base64 decoding where the type supports it.
    fn to_native(
        &self,
        type_name: &str,
        text: &str,
        decode: bool,
    ) -> std::result::Result<Value, ConversionError>;

    /// Text form of `value`
    ///
    /// `encode` asks for base64 encoding of blobs.
    fn to_display(&self, tree: &Tree, value: &Value, encode: bool) -> String;

    fn type_name(&self, value: &Value) -> &'static str {
        value.type_name()
    }

    /// Convert the value of `node` to `type_name`
    ///
    /// Honours a `decode` child on the node.
    fn to_native_node(&self, tree: &Tree, type_name: &str, node: NodeId) -> Result<Value> {
        let decode = tree
            .child_named(node, "decode")
            .and_then(|d| tree.value(d))
            .map(|v| matches!(v, Value::Bool(true)) || v.as_str() == Some("true"))
            .unwrap_or(false);

        match tree.value(node) {
            None => Err(LambdaError::conversion(
                tree,
                node,
                ConversionError::new(type_name, "", "node has no value"),
            )),
            Some(Value::Str(text)) => self
                .to_native(type_name, text, decode)
                .map_err(|e| LambdaError::conversion(tree, node, e)),
            Some(Value::Date(date)) if type_name == "blob" => {
                Ok(Value::Blob(date.timestamp_millis().to_be_bytes().to_vec()))
            }
            Some(value @ Value::Node(_)) | Some(value @ Value::Ref(_)) if type_name == "blob" => {
                let text = self.to_display(tree, value, false);
                Ok(Value::Blob(text.into_bytes()))
            }
            Some(value) if value.type_name() == type_name => Ok(value.clone()),
            Some(value) => {
                let text = self.to_display(tree, value, false);
                self.to_native(type_name, &text, decode)
                    .map_err(|e| LambdaError::conversion(tree, node, e))
            }
        }
    }

    /// Build a detached node named `type_name` holding the text form of `value`
    fn to_display_node(&self, tree: &mut Tree, type_name: &str, value: &Value) -> NodeId {
        let text = self.to_display(tree, value, false);
        tree.create(type_name, Value::Str(text))
    }
}

/// Built-in conversion rules
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl TypeConverter for DefaultConverter {
    fn to_native(
        &self,
        type_name: &str,
        text: &str,
        decode: bool,
    ) -> std::result::Result<Value, ConversionError> {
        parse_scalar(type_name, text, decode)
    }

    fn to_display(&self, tree: &Tree, value: &Value, encode: bool) -> String {
        match format_scalar(value, encode) {
            Some(text) => text,
            None => match value.as_node() {
                Some(nested) if tree.is_alive(nested) => {
                    crate::parser::render_children(tree, nested)
                }
                _ => String::new(),
            },
        }
    }
}

/* ===================== Scalar Rules ===================== */

/// Parse text into a scalar value of the given lambda type
///
/// `node` is not handled here since it needs a tree; the reader deals with it.
pub fn parse_scalar(
    type_name: &str,
    text: &str,
    decode: bool,
) -> std::result::Result<Value, ConversionError> {
    let fail = |message: &str| ConversionError::new(type_name, text, message);

    match type_name {
        "" | "string" => Ok(Value::Str(text.to_string())),
        "int" => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| fail(&e.to_string())),
        "float" => text
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| fail(&e.to_string())),
        "bool" => match text.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(fail("expected 'true' or 'false'")),
        },
        "byte" => text
            .trim()
            .parse::<u8>()
            .map(Value::Byte)
            .map_err(|e| fail(&e.to_string())),
        "sbyte" => text
            .trim()
            .parse::<i8>()
            .map(Value::SByte)
            .map_err(|e| fail(&e.to_string())),
        "char" => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(fail("expected exactly one character")),
            }
        }
        "blob" => {
            if decode {
                STANDARD
                    .decode(text.trim())
                    .map(Value::Blob)
                    .map_err(|e| fail(&e.to_string()))
            } else {
                Ok(Value::Blob(text.as_bytes().to_vec()))
            }
        }
        "date" => DateTime::parse_from_rfc3339(text.trim())
            .map(|d| Value::Date(d.with_timezone(&Utc)))
            .map_err(|e| fail(&e.to_string())),
        "guid" => Uuid::parse_str(text.trim())
            .map(Value::Guid)
            .map_err(|e| fail(&e.to_string())),
        "x" => Ok(Value::Expr(text.to_string())),
        _ => Err(fail("unknown type")),
    }
}

/// Text form of a scalar value; `None` for node values
pub fn format_scalar(value: &Value, encode: bool) -> Option<String> {
    let text = match value {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Byte(b) => b.to_string(),
        Value::SByte(b) => b.to_string(),
        Value::Char(c) => c.to_string(),
        Value::Blob(bytes) => {
            if encode {
                STANDARD.encode(bytes)
            } else {
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
        Value::Date(d) => d.to_rfc3339(),
        Value::Guid(g) => g.hyphenated().to_string(),
        Value::Expr(e) => e.clone(),
        Value::Node(_) | Value::Ref(_) => return None,
    };
    Some(text)
}

/* ===================== Coercion ===================== */

/// Coerce a value to an integer, parsing strings
pub fn to_int(converter: &dyn TypeConverter, value: &Value) -> std::result::Result<i64, ConversionError> {
    if let Some(i) = value.as_int() {
        return Ok(i);
    }
    match value {
        Value::Float(f) => {
            let whole = f.is_finite()
                && f.fract() == 0.0
                && *f >= i64::MIN as f64
                && *f < i64::MAX as f64;
            if whole {
                Ok(*f as i64)
            } else {
                Err(ConversionError::new(
                    "int",
                    f.to_string(),
                    "not a whole number in integer range",
                ))
            }
        }
        Value::Str(s) => match converter.to_native("int", s, false)? {
            Value::Int(i) => Ok(i),
            _ => Err(ConversionError::new("int", s.as_str(), "not an integer")),
        },
        other => Err(ConversionError::new(
            "int",
            other.type_name(),
            "value has no integer form",
        )),
    }
}

/// Coerce a value to a boolean; strings other than "false" and empty are true
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Str(s) => !(s.is_empty() || s == "false"),
        Value::Int(i) => *i != 0,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typed_scalars() {
        assert_eq!(parse_scalar("int", "42", false).unwrap(), Value::Int(42));
        assert_eq!(parse_scalar("bool", "true", false).unwrap(), Value::Bool(true));
        assert_eq!(parse_scalar("byte", "255", false).unwrap(), Value::Byte(255));
        assert_eq!(parse_scalar("sbyte", "-3", false).unwrap(), Value::SByte(-3));
        assert_eq!(parse_scalar("char", "q", false).unwrap(), Value::Char('q'));
        assert_eq!(
            parse_scalar("x", "/../*", false).unwrap(),
            Value::Expr("/../*".to_string())
        );
    }

    #[test]
    fn test_byte_out_of_range_fails() {
        let err = parse_scalar("byte", "256", false).unwrap_err();
        assert_eq!(err.type_name, "byte");
        assert_eq!(err.text, "256");
    }

    #[test]
    fn test_char_requires_single_character() {
        assert!(parse_scalar("char", "ab", false).is_err());
        assert!(parse_scalar("char", "", false).is_err());
    }

    #[test]
    fn test_blob_raw_and_base64() {
        assert_eq!(
            parse_scalar("blob", "hi", false).unwrap(),
            Value::Blob(b"hi".to_vec())
        );
        assert_eq!(
            parse_scalar("blob", "aGk=", true).unwrap(),
            Value::Blob(b"hi".to_vec())
        );
        assert!(parse_scalar("blob", "not base64!", true).is_err());
    }

    #[test]
    fn test_blob_display_encoding() {
        let blob = Value::Blob(b"hi".to_vec());
        assert_eq!(format_scalar(&blob, false).unwrap(), "hi");
        assert_eq!(format_scalar(&blob, true).unwrap(), "aGk=");
    }

    #[test]
    fn test_unknown_type_fails() {
        assert!(parse_scalar("widget", "x", false).is_err());
    }

    #[test]
    fn test_to_int_parses_strings() {
        let converter = DefaultConverter;
        assert_eq!(to_int(&converter, &Value::from("7")).unwrap(), 7);
        assert_eq!(to_int(&converter, &Value::Byte(3)).unwrap(), 3);
        assert!(to_int(&converter, &Value::from("seven")).is_err());
    }

    #[test]
    fn test_to_int_rejects_inexact_floats() {
        let converter = DefaultConverter;
        assert_eq!(to_int(&converter, &Value::Float(2.0)).unwrap(), 2);
        assert!(to_int(&converter, &Value::Float(2.5)).is_err());
        assert!(to_int(&converter, &Value::Float(f64::NAN)).is_err());
        assert!(to_int(&converter, &Value::Float(f64::INFINITY)).is_err());
        assert!(to_int(&converter, &Value::Float(1e30)).is_err());
    }

    #[test]
    fn test_to_native_node_honours_decode_child() {
        let converter = DefaultConverter;
        let mut tree = Tree::new();
        let node = tree.create("blob", Value::from("aGk="));
        tree.add(node, "decode", Value::Bool(true));

        let value = converter.to_native_node(&tree, "blob", node).unwrap();
        assert_eq!(value, Value::Blob(b"hi".to_vec()));
    }

    #[test]
    fn test_to_native_node_date_to_blob() {
        let converter = DefaultConverter;
        let mut tree = Tree::new();
        let date = DateTime::parse_from_rfc3339("2016-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let node = tree.create("when", Value::Date(date));

        let Value::Blob(bytes) = converter.to_native_node(&tree, "blob", node).unwrap() else {
            panic!("expected blob");
        };
        assert_eq!(bytes, date.timestamp_millis().to_be_bytes().to_vec());
    }

    #[test]
    fn test_to_native_node_without_value_fails() {
        let converter = DefaultConverter;
        let mut tree = Tree::new();
        let node = tree.create("byte", None);

        let err = converter.to_native_node(&tree, "byte", node).unwrap_err();
        assert!(matches!(err, LambdaError::Conversion { .. }));
    }

    #[test]
    fn test_to_display_node() {
        let converter = DefaultConverter;
        let mut tree = Tree::new();
        let node = converter.to_display_node(&mut tree, "int", &Value::Int(5));
        assert_eq!(tree.name(node), "int");
        assert_eq!(tree.value(node), Some(&Value::from("5")));
    }
}
