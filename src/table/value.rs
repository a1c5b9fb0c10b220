//! Dynamically typed cell values
//!
//! Rows are vectors of [`Value`]. Equality and hashing are structural so a
//! value can serve directly as a group key; float payloads are compared by
//! canonicalized bits (all NaNs collapse into one key, `-0.0 == 0.0`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// A single cell in a row, or one element of a scalar stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    /// Missing value
    Null,
    /// A boolean: true or false
    Bool(bool),
    /// A signed 64-bit integer
    Int(i64),
    /// A 64-bit float; NaN is a value, not an error
    Float(f64),
    /// UTF-8 text
    Text(String),
}

impl Value {
    /// Numeric view of this value. `Bool` coerces to 0/1; `Null` and
    /// `Text` have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Null | Value::Text(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric addition. `Int + Int` stays exact (promoting to `Float`
    /// only on overflow); any float operand promotes; a non-numeric
    /// operand poisons the result to `Float(NaN)`.
    pub fn add(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
                Some(sum) => Value::Int(sum),
                None => Value::Float(*a as f64 + *b as f64),
            },
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Value::Float(a + b),
                _ => Value::Float(f64::NAN),
            },
        }
    }
}

/// Collapse every NaN to one bit pattern and `-0.0` to `0.0` so equal
/// floats hash equally.
fn canon_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => canon_bits(*a) == canon_bits(*b),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Float(v) => canon_bits(*v).hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl PartialOrd for Value {
    /// Numeric variants compare across `Int`/`Float`/`Bool`; text compares
    /// lexically with text only. Everything else is incomparable.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            // Keep ordering consistent with Eq, which treats NaNs as equal.
            (Value::Float(a), Value::Float(b)) if a.is_nan() && b.is_nan() => {
                Some(Ordering::Equal)
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(true) => f.write_str("true"),
            Value::Bool(false) => f.write_str("false"),
            Value::Int(v) => Display::fmt(v, f),
            Value::Float(v) => Display::fmt(v, f),
            Value::Text(s) => Display::fmt(s, f),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}
