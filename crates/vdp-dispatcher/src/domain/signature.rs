//! # Operation Signatures
//!
//! Declared parameter types and the structural match cost of an argument
//! list against them.
//!
//! ## Cost Table
//!
//! | Argument → Parameter | Cost |
//! |----------------------|------|
//! | same type | 0 |
//! | `int` → `long`, `long` → `double` | 1 |
//! | `int` → `double` | 2 |
//! | `null` → `string`/`bytes`/`list` | 1 |
//! | anything → `any` | 3 |
//! | anything else | no match |
//!
//! Lower totals are better matches.

use serde::Serialize;
use shared_types::ValueType;
use std::fmt;

/// Cost of an exact match.
pub const EXACT: u32 = 0;
/// Cost of passing `null` to a reference parameter.
pub const NULL_TO_REFERENCE: u32 = 1;
/// Cost of passing any value to an `Any` parameter.
pub const TO_ANY: u32 = 3;

/// Declared type of one operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParamType {
    /// Boolean.
    Bool,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// 64-bit float.
    Double,
    /// String, nullable.
    String,
    /// Byte array, nullable.
    Bytes,
    /// List, nullable.
    List,
    /// Accepts any value, including null.
    Any,
}

impl ParamType {
    /// Returns true if the parameter accepts `null`.
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            ParamType::String | ParamType::Bytes | ParamType::List | ParamType::Any
        )
    }

    /// Cost of passing an argument of type `arg` to this parameter, or `None`
    /// if it is not assignable.
    pub fn match_cost(self, arg: ValueType) -> Option<u32> {
        use ParamType as P;
        use ValueType as V;

        match (arg, self) {
            (_, P::Any) => Some(TO_ANY),
            (V::Bool, P::Bool)
            | (V::Int, P::Int)
            | (V::Long, P::Long)
            | (V::Double, P::Double)
            | (V::String, P::String)
            | (V::Bytes, P::Bytes)
            | (V::List, P::List) => Some(EXACT),
            (V::Int, P::Long) | (V::Long, P::Double) => Some(1),
            (V::Int, P::Double) => Some(2),
            (V::Null, p) if p.is_reference() => Some(NULL_TO_REFERENCE),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::List => "list",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

/// Ordered parameter list of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Signature {
    params: Vec<ParamType>,
}

impl Signature {
    /// Create from parameter types.
    pub fn new(params: impl Into<Vec<ParamType>>) -> Self {
        Self {
            params: params.into(),
        }
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Parameter types in order.
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Total match cost, or `None` if arity differs or any argument is not
    /// assignable.
    pub fn match_cost(&self, args: &[ValueType]) -> Option<u32> {
        if args.len() != self.params.len() {
            return None;
        }
        self.params
            .iter()
            .zip(args)
            .try_fold(0u32, |total, (param, arg)| {
                param.match_cost(*arg).map(|cost| total + cost)
            })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_matches_cost_nothing() {
        assert_eq!(ParamType::String.match_cost(ValueType::String), Some(0));
        assert_eq!(ParamType::Long.match_cost(ValueType::Long), Some(0));
    }

    #[test]
    fn test_widening_costs() {
        assert_eq!(ParamType::Long.match_cost(ValueType::Int), Some(1));
        assert_eq!(ParamType::Double.match_cost(ValueType::Long), Some(1));
        assert_eq!(ParamType::Double.match_cost(ValueType::Int), Some(2));
        assert_eq!(ParamType::Int.match_cost(ValueType::Long), None);
    }

    #[test]
    fn test_null_only_to_references() {
        assert_eq!(ParamType::String.match_cost(ValueType::Null), Some(1));
        assert_eq!(ParamType::Bytes.match_cost(ValueType::Null), Some(1));
        assert_eq!(ParamType::Int.match_cost(ValueType::Null), None);
        assert_eq!(ParamType::Bool.match_cost(ValueType::Null), None);
    }

    #[test]
    fn test_any_accepts_everything() {
        for arg in [ValueType::Null, ValueType::Int, ValueType::List, ValueType::Bytes] {
            assert_eq!(ParamType::Any.match_cost(arg), Some(TO_ANY));
        }
    }

    #[test]
    fn test_signature_cost_sums_arguments() {
        let sig = Signature::new([ParamType::String, ParamType::Long]);
        assert_eq!(sig.match_cost(&[ValueType::String, ValueType::Int]), Some(1));
        assert_eq!(sig.match_cost(&[ValueType::Null, ValueType::Int]), Some(2));
        assert_eq!(sig.match_cost(&[ValueType::Int, ValueType::Int]), None);
    }

    #[test]
    fn test_arity_must_match() {
        let sig = Signature::new([ParamType::Any]);
        assert_eq!(sig.match_cost(&[]), None);
        assert_eq!(sig.match_cost(&[ValueType::Int, ValueType::Int]), None);
        assert_eq!(Signature::new(Vec::new()).match_cost(&[]), Some(0));
    }

    #[test]
    fn test_display() {
        let sig = Signature::new([ParamType::String, ParamType::Bytes]);
        assert_eq!(sig.to_string(), "(string, bytes)");
    }
}
