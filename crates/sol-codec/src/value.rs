//! Logical values produced and consumed by compiled codecs.

use crate::error::CodecError;

/// A decoded (or to-be-encoded) value.
///
/// `Struct` fields and `Map` entries keep their declaration/wire order; a
/// plain `Vec` of pairs keeps the model small and ordered without pulling in
/// a map type (instruction payloads are tiny).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Any unsigned integer, regardless of wire width.
    Num(u64),
    Text(String),
    Bytes(Vec<u8>),
    Tuple(Vec<Value>),
    Struct(Vec<(String, Value)>),
    /// Enum value: variant name plus its payload (`None` for unit variants).
    Variant {
        tag: String,
        payload: Option<Box<Value>>,
    },
    Option(Option<Box<Value>>),
    Map(Vec<(Value, Value)>),
    /// The value of constant-only nodes.
    Unit,
}

impl Value {
    pub fn some(inner: Value) -> Self {
        Value::Option(Some(Box::new(inner)))
    }

    pub fn none() -> Self {
        Value::Option(None)
    }

    pub fn unit_variant(tag: impl Into<String>) -> Self {
        Value::Variant {
            tag: tag.into(),
            payload: None,
        }
    }

    pub fn variant(tag: impl Into<String>, payload: Value) -> Self {
        Value::Variant {
            tag: tag.into(),
            payload: Some(Box::new(payload)),
        }
    }

    /// Field lookup on a `Struct` value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_num(&self, what: &str) -> Result<u64, CodecError> {
        match self {
            Value::Num(n) => Ok(*n),
            other => Err(CodecError::Value(format!(
                "expected number at `{what}`, got {}",
                other.kind_name()
            ))),
        }
    }

    pub fn as_bytes(&self, what: &str) -> Result<&[u8], CodecError> {
        match self {
            Value::Bytes(b) => Ok(b),
            other => Err(CodecError::Value(format!(
                "expected bytes at `{what}`, got {}",
                other.kind_name()
            ))),
        }
    }

    pub fn as_text(&self, what: &str) -> Result<&str, CodecError> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(CodecError::Value(format!(
                "expected text at `{what}`, got {}",
                other.kind_name()
            ))),
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Tuple(_) => "tuple",
            Value::Struct(_) => "struct",
            Value::Variant { .. } => "variant",
            Value::Option(_) => "option",
            Value::Map(_) => "map",
            Value::Unit => "unit",
        }
    }
}
