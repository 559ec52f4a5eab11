// Copyright (c) 2024 Mike Tsao

use super::VarHandle;
use crate::{error::ConfigError, types::Range};
use core::fmt;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// The kinds a variable, an event field or an intermediate result can have.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ValueKind {
    /// Unsigned 8 bits. Configuration files also call it `char`.
    #[strum(to_string = "byte", serialize = "char")]
    Byte,
    /// Signed 32 bits.
    Int,
    /// Signed 64 bits.
    Long,
    /// 32-bit float.
    Float,
    /// An inclusive `lo>hi` span.
    Range,
    /// As a field kind: accepts a value of any kind, unchanged.
    Variable,
    /// As a field kind: holds a live reference to a declared variable.
    #[strum(to_string = "variable-ref")]
    VariableRef,
    #[default]
    #[allow(missing_docs)]
    Invalid,
}
impl ValueKind {
    /// Whether a user variable may be declared with this kind.
    pub fn is_declarable(&self) -> bool {
        matches!(
            self,
            ValueKind::Byte | ValueKind::Int | ValueKind::Long | ValueKind::Float | ValueKind::Range
        )
    }

    /// The value a freshly declared variable or event field of this kind
    /// starts with.
    pub fn zero(&self) -> Value {
        match self {
            ValueKind::Byte => Value::Byte(0),
            ValueKind::Int | ValueKind::Variable => Value::Int(0),
            ValueKind::Long => Value::Long(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Range => Value::Range(Range::default()),
            ValueKind::VariableRef | ValueKind::Invalid => Value::Invalid,
        }
    }
}

/// The four arithmetic operators an expression may use. There is no
/// precedence; they apply strictly left to right.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Operator {
    #[strum(to_string = "/")]
    #[allow(missing_docs)]
    Divide,
    #[strum(to_string = "*")]
    #[allow(missing_docs)]
    Multiply,
    #[strum(to_string = "+")]
    #[allow(missing_docs)]
    Add,
    #[strum(to_string = "-")]
    #[allow(missing_docs)]
    Subtract,
}
impl Operator {
    /// Every character that starts an operator.
    pub const CHARS: [char; 4] = ['/', '*', '+', '-'];

    #[allow(missing_docs)]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '/' => Some(Operator::Divide),
            '*' => Some(Operator::Multiply),
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Subtract),
            _ => None,
        }
    }

    fn apply_int(&self, a: i64, b: i64) -> Option<i64> {
        match self {
            Operator::Divide => (b != 0).then(|| a.wrapping_div(b)),
            Operator::Multiply => Some(a.wrapping_mul(b)),
            Operator::Add => Some(a.wrapping_add(b)),
            Operator::Subtract => Some(a.wrapping_sub(b)),
        }
    }

    fn apply_float(&self, a: f32, b: f32) -> Option<f32> {
        match self {
            Operator::Divide => (b != 0.0).then(|| a / b),
            Operator::Multiply => Some(a * b),
            Operator::Add => Some(a + b),
            Operator::Subtract => Some(a - b),
        }
    }
}

/// A typed value. Variables hold one, event fields hold one, and expressions
/// produce one.
///
/// Arithmetic keeps the kind of the left-hand side and converts the right-hand
/// side to it; floats become integers by truncation, and a range becomes a
/// scalar by taking its low end.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Value {
    #[allow(missing_docs)]
    Byte(u8),
    #[allow(missing_docs)]
    Int(i32),
    #[allow(missing_docs)]
    Long(i64),
    #[allow(missing_docs)]
    Float(f32),
    #[allow(missing_docs)]
    Range(Range),
    /// A live reference to a variable in the store.
    Ref(VarHandle),
    /// The result of a failed evaluation. Never equal to anything.
    #[default]
    Invalid,
}
impl Value {
    #[allow(missing_docs)]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Byte(_) => ValueKind::Byte,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Range(_) => ValueKind::Range,
            Value::Ref(_) => ValueKind::VariableRef,
            Value::Invalid => ValueKind::Invalid,
        }
    }

    #[allow(missing_docs)]
    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Invalid)
    }

    /// The value as an integer, if it is numeric.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            Value::Range(r) => Some(r.lo as i64),
            Value::Ref(_) | Value::Invalid => None,
        }
    }

    /// The value as a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// The variable this value refers to, if it is a reference.
    pub fn as_ref_handle(&self) -> Option<VarHandle> {
        match self {
            Value::Ref(h) => Some(*h),
            _ => None,
        }
    }

    /// Whether this is a plain number (not a range, reference or invalid).
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Byte(_) | Value::Int(_) | Value::Long(_) | Value::Float(_)
        )
    }

    /// Converts the value to the given kind. Conversions that make no sense
    /// (a number to a reference, for example) produce [Value::Invalid].
    pub fn coerce(self, kind: ValueKind) -> Value {
        if self.kind() == kind || kind == ValueKind::Variable {
            return self;
        }
        match (kind, self) {
            (_, Value::Invalid) | (ValueKind::Invalid, _) => Value::Invalid,
            (ValueKind::VariableRef, _) | (_, Value::Ref(_)) => Value::Invalid,
            (ValueKind::Range, Value::Range(r)) => Value::Range(r),
            (ValueKind::Range, v) => v
                .as_i64()
                .map_or(Value::Invalid, |n| Value::Range(Range::new(n as i32, n as i32))),
            (ValueKind::Float, v) => v.as_f64().map_or(Value::Invalid, |f| Value::Float(f as f32)),
            (ValueKind::Byte, v) => v.as_i64().map_or(Value::Invalid, |n| Value::Byte(n as u8)),
            (ValueKind::Int, v) => v.as_i64().map_or(Value::Invalid, |n| Value::Int(n as i32)),
            (ValueKind::Long, v) => v.as_i64().map_or(Value::Invalid, Value::Long),
            (ValueKind::Variable, v) => v,
        }
    }

    /// `self <op> rhs`, in the kind of `self`.
    pub fn apply(self, op: Operator, rhs: Value) -> Value {
        if !rhs.is_valid() {
            return Value::Invalid;
        }
        let result = match self {
            Value::Invalid | Value::Ref(_) => None,
            Value::Float(a) => rhs
                .as_f64()
                .and_then(|b| op.apply_float(a, b as f32))
                .map(Value::Float),
            Value::Range(r) => match rhs {
                Value::Range(q) => op
                    .apply_int(r.lo as i64, q.lo as i64)
                    .zip(op.apply_int(r.hi as i64, q.hi as i64))
                    .map(|(lo, hi)| Value::Range(Range::new(lo as i32, hi as i32))),
                _ => rhs.as_i64().and_then(|b| {
                    op.apply_int(r.lo as i64, b)
                        .zip(op.apply_int(r.hi as i64, b))
                        .map(|(lo, hi)| Value::Range(Range::new(lo as i32, hi as i32)))
                }),
            },
            Value::Byte(a) => rhs
                .as_i64()
                .and_then(|b| op.apply_int(a as i64, b))
                .map(|n| Value::Byte(n as u8)),
            Value::Int(a) => rhs
                .as_i64()
                .and_then(|b| op.apply_int(a as i64, b))
                .map(|n| Value::Int(n as i32)),
            Value::Long(a) => rhs
                .as_i64()
                .and_then(|b| op.apply_int(a, b))
                .map(Value::Long),
        };
        result.unwrap_or(Value::Invalid)
    }

    /// Condition equality. A scalar matches a range when it lies inside it;
    /// two ranges match when both ends agree; scalars compare as floats when
    /// either side is a float and as integers otherwise.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Invalid, _) | (_, Value::Invalid) => false,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Ref(_), _) | (_, Value::Ref(_)) => false,
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Range(r), v) | (v, Value::Range(r)) => v.as_f64().is_some_and(|x| {
                let (lo, hi) = (r.lo.min(r.hi) as f64, r.lo.max(r.hi) as f64);
                lo <= x && x <= hi
            }),
            (Value::Float(_), _) | (_, Value::Float(_)) => self.as_f64() == other.as_f64(),
            _ => self.as_i64() == other.as_i64(),
        }
    }

    /// Parses a configuration literal. Only the characters `0-9`, `.`, `>` and
    /// space are allowed; `>` makes a range, `.` makes a float, and anything
    /// else is an integer (a long if it doesn't fit in 32 bits).
    pub fn parse_literal(text: &str) -> Result<Value, ConfigError> {
        let malformed = || ConfigError::MalformedToken(text.to_string());
        let trimmed = text.trim();
        if trimmed.is_empty()
            || !trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.' || c == ' ' || c == Range::SEPARATOR)
        {
            return Err(malformed());
        }
        if trimmed.contains(Range::SEPARATOR) {
            trimmed
                .parse::<Range>()
                .map(Value::Range)
                .map_err(|_| malformed())
        } else if trimmed.contains('.') {
            trimmed
                .parse::<f32>()
                .map(Value::Float)
                .map_err(|_| malformed())
        } else if let Ok(n) = trimmed.parse::<i32>() {
            Ok(Value::Int(n))
        } else {
            trimmed
                .parse::<i64>()
                .map(Value::Long)
                .map_err(|_| malformed())
        }
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:.2}"),
            Value::Range(r) => write!(f, "{r}"),
            Value::Ref(h) => write!(f, "&{h}"),
            Value::Invalid => f.write_str("invalid"),
        }
    }
}
impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}
impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}
impl From<Range> for Value {
    fn from(value: Range) -> Self {
        Value::Range(value)
    }
}
