use crate::{coerce::CoercionError, value::Value};
use chrono::{DateTime, Utc};

///
/// IdentityKey
///
/// Hashable projection of a primary-key value.
///
/// - Signed and unsigned integers share one domain, so `Int(7)` and
///   `Uint(7)` identify the same entity.
/// - Floats key by bit pattern; `-0.0` folds into `0.0`.
/// - Opaque values cannot identify an entity.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum IdentityKey {
    Blob(Vec<u8>),
    Bool(bool),
    Float(u64),
    Integer(i128),
    List(Vec<Self>),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl IdentityKey {
    /// Project a row value into a key.
    ///
    /// Returns `Ok(None)` for `Null`: the row carries no entity of that type.
    pub fn from_value(value: &Value) -> Result<Option<Self>, CoercionError> {
        let key = match value {
            Value::Null => return Ok(None),
            Value::Blob(bytes) => Self::Blob(bytes.clone()),
            Value::Bool(v) => Self::Bool(*v),
            Value::Float(v) => {
                let v = if *v == 0.0 { 0.0 } else { *v };
                Self::Float(v.to_bits())
            }
            Value::Int(v) => Self::Integer(i128::from(*v)),
            Value::Uint(v) => Self::Integer(i128::from(*v)),
            Value::List(items) => {
                let mut keys = Vec::with_capacity(items.len());
                for item in items {
                    match Self::from_value(item)? {
                        Some(key) => keys.push(key),
                        None => return Ok(None),
                    }
                }

                Self::List(keys)
            }
            Value::Text(v) => Self::Text(v.clone()),
            Value::Timestamp(v) => Self::Timestamp(*v),
            Value::Opaque(_) => {
                return Err(CoercionError::Unkeyable {
                    actual: value.tag(),
                });
            }
        };

        Ok(Some(key))
    }
}
