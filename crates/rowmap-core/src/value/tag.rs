use crate::value::Value;
use derive_more::Display;

///
/// ValueTag
///
/// Stable value-variant tag used by coercion diagnostics.
/// Labels are part of error text and should remain fixed.
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ValueTag {
    #[display("blob")]
    Blob,
    #[display("bool")]
    Bool,
    #[display("float")]
    Float,
    #[display("int")]
    Int,
    #[display("list")]
    List,
    #[display("null")]
    Null,
    #[display("opaque")]
    Opaque,
    #[display("text")]
    Text,
    #[display("timestamp")]
    Timestamp,
    #[display("uint")]
    Uint,
}

/// Variant tag for one value.
#[must_use]
pub(super) const fn canonical_tag(value: &Value) -> ValueTag {
    match value {
        Value::Blob(_) => ValueTag::Blob,
        Value::Bool(_) => ValueTag::Bool,
        Value::Float(_) => ValueTag::Float,
        Value::Int(_) => ValueTag::Int,
        Value::List(_) => ValueTag::List,
        Value::Null => ValueTag::Null,
        Value::Opaque(_) => ValueTag::Opaque,
        Value::Text(_) => ValueTag::Text,
        Value::Timestamp(_) => ValueTag::Timestamp,
        Value::Uint(_) => ValueTag::Uint,
    }
}
