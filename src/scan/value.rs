//! Raw scan argument values.
//!
//! Command argument lists are heterogeneous: numbers, tuples of numbers,
//! tuples of region triples, and the odd stray value a user mistyped.
//! [`ScanValue`] carries them losslessly from the command surface to the
//! per-command converters, which alone decide what each value *means*.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw, uninterpreted scan parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScanValue {
    /// Integer parameter (interval counts, point counts).
    Int(i64),
    /// Floating-point parameter (positions, widths, steps).
    Float(f64),
    /// Textual value. Never meaningful to a converter; kept so malformed
    /// input can be reported with its original spelling.
    Text(String),
    /// Tuple of values (explicit positions or region descriptors).
    List(Vec<ScanValue>),
}

impl ScanValue {
    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScanValue::Int(i) => Some(*i as f64),
            ScanValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Whether the value is a plain number.
    pub fn is_number(&self) -> bool {
        matches!(self, ScanValue::Int(_) | ScanValue::Float(_))
    }

    /// Tuple view of the value, if it is a tuple.
    pub fn as_list(&self) -> Option<&[ScanValue]> {
        match self {
            ScanValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for ScanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanValue::Int(i) => write!(f, "{}", i),
            ScanValue::Float(v) => write!(f, "{}", v),
            ScanValue::Text(s) => write!(f, "\"{}\"", s),
            ScanValue::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<i64> for ScanValue {
    fn from(value: i64) -> Self {
        ScanValue::Int(value)
    }
}

impl From<f64> for ScanValue {
    fn from(value: f64) -> Self {
        ScanValue::Float(value)
    }
}

impl From<&str> for ScanValue {
    fn from(value: &str) -> Self {
        ScanValue::Text(value.to_string())
    }
}

impl From<Vec<ScanValue>> for ScanValue {
    fn from(items: Vec<ScanValue>) -> Self {
        ScanValue::List(items)
    }
}
