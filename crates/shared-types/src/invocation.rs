//! # Invocation Types
//!
//! The decoded request (`InvocationDescriptor`), the untyped argument and
//! result values it carries, and the result returned to the caller.
//!
//! Arguments arrive without static types. `ValueType` is what the overload
//! resolver scores against, so every `Value` variant maps to exactly one
//! `ValueType`.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::codec::NestingGuard;
use crate::errors::ErrorRecord;

/// Runtime type of a `Value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// The null value.
    Null,
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    String,
    /// Raw bytes.
    Bytes,
    /// Ordered sequence of values.
    List,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::List => "list",
        };
        f.write_str(name)
    }
}

/// An untyped argument or result value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// The null value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    List(Vec<Value>),
}

/// Wire shape of `Value`. Variant order must match `Value`.
#[derive(Deserialize)]
#[serde(rename = "Value")]
enum ValueRepr {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let _level = NestingGuard::enter::<D::Error>()?;
        Ok(match ValueRepr::deserialize(deserializer)? {
            ValueRepr::Null => Value::Null,
            ValueRepr::Bool(b) => Value::Bool(b),
            ValueRepr::Int(i) => Value::Int(i),
            ValueRepr::Long(l) => Value::Long(l),
            ValueRepr::Double(d) => Value::Double(d),
            ValueRepr::String(s) => Value::String(s),
            ValueRepr::Bytes(b) => Value::Bytes(b),
            ValueRepr::List(items) => Value::List(items),
        })
    }
}

impl Value {
    /// Runtime type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Bytes(_) => ValueType::Bytes,
            Value::List(_) => ValueType::List,
        }
    }

    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean content.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer content.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Long content, widening from `Int`.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Double content, widening from `Int` and `Long`.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// String content.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Byte content.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// List content.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Render as JSON. Bytes become an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Long(l) => serde_json::Value::from(*l),
            Value::Double(d) => serde_json::Value::from(*d),
            Value::String(s) => serde_json::Value::from(s.as_str()),
            Value::Bytes(b) => serde_json::Value::from(b.clone()),
            Value::List(items) => items.iter().map(Value::to_json).collect(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Decoded request: which operation of which service, with which arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationDescriptor {
    /// Identifier of the target service.
    pub target_service_id: String,
    /// Operation name, possibly overloaded.
    pub operation_name: String,
    /// Ordered arguments.
    pub arguments: Vec<Value>,
}

impl InvocationDescriptor {
    /// Create a descriptor.
    pub fn new(
        target_service_id: impl Into<String>,
        operation_name: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Self {
        Self {
            target_service_id: target_service_id.into(),
            operation_name: operation_name.into(),
            arguments,
        }
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }
}

/// Result of one invocation, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvocationResult {
    /// The operation returned a value.
    Value(Value),
    /// The call failed.
    Error(ErrorRecord),
}

impl InvocationResult {
    /// Returns true for `InvocationResult::Error`.
    pub fn is_error(&self) -> bool {
        matches!(self, InvocationResult::Error(_))
    }

    /// Borrow the error record, if any.
    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            InvocationResult::Error(record) => Some(record),
            InvocationResult::Value(_) => None,
        }
    }

    /// Borrow the value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            InvocationResult::Value(value) => Some(value),
            InvocationResult::Error(_) => None,
        }
    }
}

impl From<Result<Value, ErrorRecord>> for InvocationResult {
    fn from(result: Result<Value, ErrorRecord>) -> Self {
        match result {
            Ok(value) => InvocationResult::Value(value),
            Err(record) => InvocationResult::Error(record),
        }
    }
}
