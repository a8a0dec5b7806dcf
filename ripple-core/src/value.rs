//! Dynamic Values
//!
//! Graphs are generic over their value type. `Value` is a ready-made dynamic
//! type for graphs that mix numbers, flags and text, such as control loops
//! where a measurement feeds a threshold which feeds an actuator.
//!
//! Float comparison is where most graphs want something other than `==`, so
//! this module also provides equality rules that can be installed per node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A dynamically typed graph value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Vector(Vec<f64>),
}

/// The variant of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Unit,
    Bool,
    Int,
    Float,
    Text,
    Vector,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Unit => "unit",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Vector => "vector",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Unit => ValueKind::Unit,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Vector(_) => ValueKind::Vector,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value. Integers widen to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

/// Element-wise vector equality where NaN equals NaN.
///
/// Vectors of different lengths are never equal.
pub fn vector_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
}

/// Equality rule that treats NaN as equal to NaN, for floats and vectors.
///
/// Plain `==` would report a NaN-producing node as changed on every
/// evaluation, defeating change suppression downstream.
pub fn nan_aware_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::Vector(x), Value::Vector(y)) => vector_eq(x, y),
        _ => a == b,
    }
}

/// Equality rule comparing numbers within an absolute tolerance.
///
/// Non-numeric values fall back to [`nan_aware_eq`]. Ints and floats compare
/// numerically with each other.
pub fn approx_eq(tolerance: f64) -> impl Fn(&Value, &Value) -> bool + Send + 'static {
    move |a: &Value, b: &Value| match (a, b) {
        (Value::Vector(x), Value::Vector(y)) => {
            x.len() == y.len()
                && x.iter().zip(y).all(|(x, y)| within(*x, *y, tolerance))
        }
        _ => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => within(x, y, tolerance),
            _ => nan_aware_eq(a, b),
        },
    }
}

fn within(x: f64, y: f64, tolerance: f64) -> bool {
    (x.is_nan() && y.is_nan()) || (x - y).abs() <= tolerance
}
