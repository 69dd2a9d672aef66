//! Module: coerce
//! Responsibility: convert untyped row values into typed entity fields.
//! Does not own: null skipping or column lookup (materializer policy).
//!
//! Invariants:
//! - Dispatch is keyed by destination kind (`FieldKind`), never by source.
//! - Collection destinations append; they never reinitialize.
//! - Every failure names the destination kind and the actual source kind.

mod slot;

#[cfg(test)]
mod tests;

use crate::value::{Value, ValueTag};
use std::fmt;
use thiserror::Error as ThisError;

// re-exports
pub use slot::FieldSlot;

///
/// CoercionError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CoercionError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    Mismatch {
        expected: FieldKind,
        actual: ValueTag,
    },

    #[error("cannot assign negative value {value} to {expected} field")]
    Negative { expected: FieldKind, value: i64 },

    #[error("value {value} is out of range for {expected} field")]
    OutOfRange { expected: FieldKind, value: String },

    #[error("field '{field}' is not settable")]
    Unsettable { field: &'static str },

    #[error("value of kind {actual} cannot identify an entity")]
    Unkeyable { actual: ValueTag },
}

impl CoercionError {
    pub(crate) const fn mismatch(expected: FieldKind, value: &Value) -> Self {
        Self::Mismatch {
            expected,
            actual: value.tag(),
        }
    }
}

///
/// FieldKind
///
/// Destination kind of one mapped field.
/// `bits` is the storage width of numeric destinations.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Bool,
    /// Nested composite assigned directly from an opaque source value.
    Composite(&'static str),
    Float {
        bits: u8,
    },
    Int {
        bits: u8,
    },
    List(Box<Self>),
    Optional(Box<Self>),
    Text,
    Timestamp,
    Uint {
        bits: u8,
    },
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Composite(name) => write!(f, "composite({name})"),
            Self::Float { bits } => write!(f, "float{bits}"),
            Self::Int { bits } => write!(f, "int{bits}"),
            Self::List(elem) => write!(f, "list<{elem}>"),
            Self::Optional(inner) => write!(f, "optional<{inner}>"),
            Self::Text => write!(f, "text"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Uint { bits } => write!(f, "uint{bits}"),
        }
    }
}

/// Convert `value` into the canonical value shape for `kind`.
///
/// Integer results come back as `Value::Int`/`Value::Uint` already range
/// checked for the destination width, floats as `Value::Float`, and list
/// destinations always as `Value::List`.
pub fn coerce(value: Value, kind: &FieldKind) -> Result<Value, CoercionError> {
    match kind {
        FieldKind::Int { bits } => coerce_signed(value, kind, *bits).map(Value::Int),
        FieldKind::Uint { bits } => coerce_unsigned(value, kind, *bits).map(Value::Uint),
        FieldKind::Float { .. } => coerce_float(value, kind).map(Value::Float),
        FieldKind::Text => match value {
            Value::Text(_) => Ok(value),
            other => Err(CoercionError::mismatch(kind.clone(), &other)),
        },
        FieldKind::Bool => match value {
            Value::Bool(_) => Ok(value),
            other => Err(CoercionError::mismatch(kind.clone(), &other)),
        },
        FieldKind::Timestamp => match value {
            Value::Timestamp(_) => Ok(value),
            other => Err(CoercionError::mismatch(kind.clone(), &other)),
        },
        // The exact type check happens in the slot, which knows the Rust type.
        FieldKind::Composite(_) => match value {
            Value::Opaque(_) => Ok(value),
            other => Err(CoercionError::mismatch(kind.clone(), &other)),
        },
        FieldKind::List(elem) => coerce_list(value, elem).map(Value::List),
        FieldKind::Optional(inner) => match value {
            Value::Null => Ok(Value::Null),
            other => coerce(other, inner),
        },
    }
}

// Source elements for a collection destination: lists and blobs spread,
// anything else becomes a single element.
fn coerce_list(value: Value, elem: &FieldKind) -> Result<Vec<Value>, CoercionError> {
    match value {
        Value::List(items) => items.into_iter().map(|item| coerce(item, elem)).collect(),
        Value::Blob(bytes) => bytes
            .into_iter()
            .map(|byte| coerce(Value::Uint(u64::from(byte)), elem))
            .collect(),
        scalar => Ok(vec![coerce(scalar, elem)?]),
    }
}

fn coerce_signed(value: Value, kind: &FieldKind, bits: u8) -> Result<i64, CoercionError> {
    let wide = match value {
        Value::Int(v) => i128::from(v),
        Value::Uint(v) => i128::from(v),
        Value::Float(v) => truncate_float(v, kind)?,
        other => return Err(CoercionError::mismatch(kind.clone(), &other)),
    };

    let (min, max) = signed_bounds(bits);
    if wide < min || wide > max {
        return Err(out_of_range(kind, wide));
    }

    i64::try_from(wide).map_err(|_| out_of_range(kind, wide))
}

fn coerce_unsigned(value: Value, kind: &FieldKind, bits: u8) -> Result<u64, CoercionError> {
    let wide = match value {
        Value::Uint(v) => i128::from(v),
        Value::Int(v) if v < 0 => {
            return Err(CoercionError::Negative {
                expected: kind.clone(),
                value: v,
            });
        }
        Value::Int(v) => i128::from(v),
        Value::Float(v) => truncate_float(v, kind)?,
        other => return Err(CoercionError::mismatch(kind.clone(), &other)),
    };

    if wide < 0 || wide > unsigned_max(bits) {
        return Err(out_of_range(kind, wide));
    }

    u64::try_from(wide).map_err(|_| out_of_range(kind, wide))
}

#[expect(clippy::cast_precision_loss)]
fn coerce_float(value: Value, kind: &FieldKind) -> Result<f64, CoercionError> {
    match value {
        Value::Float(v) => Ok(v),
        Value::Int(v) => Ok(v as f64),
        Value::Uint(v) => Ok(v as f64),
        other => Err(CoercionError::mismatch(kind.clone(), &other)),
    }
}

// Truncate toward zero; non-finite values and values beyond the 128-bit
// integer domain are rejected before the width check.
#[expect(clippy::cast_possible_truncation)]
fn truncate_float(v: f64, kind: &FieldKind) -> Result<i128, CoercionError> {
    const LIMIT: f64 = 1.7e38;

    let truncated = v.trunc();
    if !truncated.is_finite() || truncated.abs() >= LIMIT {
        return Err(CoercionError::OutOfRange {
            expected: kind.clone(),
            value: v.to_string(),
        });
    }

    Ok(truncated as i128)
}

const fn signed_bounds(bits: u8) -> (i128, i128) {
    let shift = bits.saturating_sub(1) as u32;
    (-(1i128 << shift), (1i128 << shift) - 1)
}

const fn unsigned_max(bits: u8) -> i128 {
    (1i128 << bits as u32) - 1
}

fn out_of_range(kind: &FieldKind, value: i128) -> CoercionError {
    CoercionError::OutOfRange {
        expected: kind.clone(),
        value: value.to_string(),
    }
}
