use crate::{
    coerce::{CoercionError, FieldKind, coerce},
    value::Value,
};
use chrono::{DateTime, Utc};

///
/// FieldSlot
///
/// Typed destination of one mapped column.
///
/// `kind()` describes the destination for the coercion engine; `write()`
/// stores a coerced value. Collection slots append, optional slots
/// allocate on demand and recurse into their inner slot.
///

pub trait FieldSlot: Default {
    fn kind() -> FieldKind;

    fn write(&mut self, value: Value) -> Result<(), CoercionError>;
}

// impl_signed_slot
macro_rules! impl_signed_slot {
    ( $( $type:ty => $bits:expr ),* $(,)? ) => {
        $(
            impl FieldSlot for $type {
                fn kind() -> FieldKind {
                    FieldKind::Int { bits: $bits }
                }

                fn write(&mut self, value: Value) -> Result<(), CoercionError> {
                    let kind = Self::kind();
                    match coerce(value, &kind)? {
                        Value::Int(v) => {
                            *self = <$type>::try_from(v).map_err(|_| CoercionError::OutOfRange {
                                expected: kind,
                                value: v.to_string(),
                            })?;
                            Ok(())
                        }
                        other => Err(CoercionError::mismatch(kind, &other)),
                    }
                }
            }
        )*
    };
}

// impl_unsigned_slot
macro_rules! impl_unsigned_slot {
    ( $( $type:ty => $bits:expr ),* $(,)? ) => {
        $(
            impl FieldSlot for $type {
                fn kind() -> FieldKind {
                    FieldKind::Uint { bits: $bits }
                }

                fn write(&mut self, value: Value) -> Result<(), CoercionError> {
                    let kind = Self::kind();
                    match coerce(value, &kind)? {
                        Value::Uint(v) => {
                            *self = <$type>::try_from(v).map_err(|_| CoercionError::OutOfRange {
                                expected: kind,
                                value: v.to_string(),
                            })?;
                            Ok(())
                        }
                        other => Err(CoercionError::mismatch(kind, &other)),
                    }
                }
            }
        )*
    };
}

impl_signed_slot!(
    i8 => 8,
    i16 => 16,
    i32 => 32,
    i64 => 64,
    isize => 64,
);

impl_unsigned_slot!(
    u8 => 8,
    u16 => 16,
    u32 => 32,
    u64 => 64,
    usize => 64,
);

impl FieldSlot for f64 {
    fn kind() -> FieldKind {
        FieldKind::Float { bits: 64 }
    }

    fn write(&mut self, value: Value) -> Result<(), CoercionError> {
        let kind = Self::kind();
        match coerce(value, &kind)? {
            Value::Float(v) => {
                *self = v;
                Ok(())
            }
            other => Err(CoercionError::mismatch(kind, &other)),
        }
    }
}

impl FieldSlot for f32 {
    fn kind() -> FieldKind {
        FieldKind::Float { bits: 32 }
    }

    #[expect(clippy::cast_possible_truncation)]
    fn write(&mut self, value: Value) -> Result<(), CoercionError> {
        let kind = Self::kind();
        match coerce(value, &kind)? {
            Value::Float(v) => {
                *self = v as Self;
                Ok(())
            }
            other => Err(CoercionError::mismatch(kind, &other)),
        }
    }
}

impl FieldSlot for String {
    fn kind() -> FieldKind {
        FieldKind::Text
    }

    fn write(&mut self, value: Value) -> Result<(), CoercionError> {
        match coerce(value, &FieldKind::Text)? {
            Value::Text(v) => {
                *self = v;
                Ok(())
            }
            other => Err(CoercionError::mismatch(FieldKind::Text, &other)),
        }
    }
}

impl FieldSlot for bool {
    fn kind() -> FieldKind {
        FieldKind::Bool
    }

    fn write(&mut self, value: Value) -> Result<(), CoercionError> {
        match coerce(value, &FieldKind::Bool)? {
            Value::Bool(v) => {
                *self = v;
                Ok(())
            }
            other => Err(CoercionError::mismatch(FieldKind::Bool, &other)),
        }
    }
}

impl FieldSlot for DateTime<Utc> {
    fn kind() -> FieldKind {
        FieldKind::Timestamp
    }

    fn write(&mut self, value: Value) -> Result<(), CoercionError> {
        match coerce(value, &FieldKind::Timestamp)? {
            Value::Timestamp(v) => {
                *self = v;
                Ok(())
            }
            other => Err(CoercionError::mismatch(FieldKind::Timestamp, &other)),
        }
    }
}

impl<T: FieldSlot> FieldSlot for Option<T> {
    fn kind() -> FieldKind {
        FieldKind::Optional(Box::new(T::kind()))
    }

    fn write(&mut self, value: Value) -> Result<(), CoercionError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }

        self.get_or_insert_with(T::default).write(value)
    }
}

impl<T: FieldSlot> FieldSlot for Vec<T> {
    fn kind() -> FieldKind {
        FieldKind::List(Box::new(T::kind()))
    }

    fn write(&mut self, value: Value) -> Result<(), CoercionError> {
        let kind = Self::kind();
        let Value::List(items) = coerce(value, &kind)? else {
            return Err(CoercionError::Mismatch {
                expected: kind,
                actual: crate::value::ValueTag::List,
            });
        };

        self.reserve(items.len());
        for item in items {
            let mut elem = T::default();
            elem.write(item)?;
            self.push(elem);
        }

        Ok(())
    }
}

/// Opt a nested composite into direct assignment from `Value::Opaque`.
///
/// The opaque value must wrap exactly the destination type.
#[macro_export]
macro_rules! impl_composite_slot {
    ($($type:ty),* $(,)?) => {
        $(
            impl $crate::coerce::FieldSlot for $type {
                fn kind() -> $crate::coerce::FieldKind {
                    $crate::coerce::FieldKind::Composite(::std::any::type_name::<$type>())
                }

                fn write(
                    &mut self,
                    value: $crate::value::Value,
                ) -> Result<(), $crate::coerce::CoercionError> {
                    let kind = <Self as $crate::coerce::FieldSlot>::kind();
                    let value = $crate::coerce::coerce(value, &kind)?;
                    match &value {
                        $crate::value::Value::Opaque(opaque) => match opaque.downcast_ref::<$type>() {
                            Some(inner) => {
                                *self = ::std::clone::Clone::clone(inner);
                                Ok(())
                            }
                            None => Err($crate::coerce::CoercionError::Mismatch {
                                expected: kind,
                                actual: value.tag(),
                            }),
                        },
                        _ => Err($crate::coerce::CoercionError::Mismatch {
                            expected: kind,
                            actual: value.tag(),
                        }),
                    }
                }
            }
        )*
    };
}
