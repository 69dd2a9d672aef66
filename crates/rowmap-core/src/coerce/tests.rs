use super::*;
use crate::impl_composite_slot;
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

fn write<T: FieldSlot>(value: impl Into<Value>) -> Result<T, CoercionError> {
    let mut slot = T::default();
    slot.write(value.into())?;

    Ok(slot)
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Money {
    cents: i64,
}

impl_composite_slot!(Money);

//
// numeric
//

#[test]
fn float_to_int_truncates_toward_zero() {
    assert_eq!(write::<i32>(3.9_f64), Ok(3));
    assert_eq!(write::<i32>(-3.9_f64), Ok(-3));
    assert_eq!(write::<u8>(0.99_f64), Ok(0));
}

#[test]
fn non_finite_float_to_int_is_out_of_range() {
    let err = write::<i64>(f64::NAN).unwrap_err();

    assert!(matches!(err, CoercionError::OutOfRange { .. }));
}

#[test]
fn negative_int_into_unsigned_fails() {
    let err = write::<u32>(-1_i64).unwrap_err();

    assert_eq!(
        err,
        CoercionError::Negative {
            expected: FieldKind::Uint { bits: 32 },
            value: -1,
        }
    );
    assert_eq!(
        err.to_string(),
        "cannot assign negative value -1 to uint32 field"
    );
}

#[test]
fn narrowing_is_range_checked() {
    assert_eq!(write::<i8>(127_i64), Ok(127));
    assert!(matches!(
        write::<i8>(128_i64),
        Err(CoercionError::OutOfRange { .. })
    ));
    assert!(matches!(
        write::<u16>(70_000_u64),
        Err(CoercionError::OutOfRange { .. })
    ));
    assert!(matches!(
        write::<i64>(u64::MAX),
        Err(CoercionError::OutOfRange { .. })
    ));
}

#[test]
#[allow(clippy::float_cmp)]
fn int_to_float_widens() {
    assert_eq!(write::<f64>(42_i64), Ok(42.0));
    assert_eq!(write::<f32>(7_u64), Ok(7.0));
}

//
// scalars
//

#[test]
fn kind_mismatch_names_both_sides() {
    let err = write::<String>(5_i64).unwrap_err();

    assert_eq!(err.to_string(), "type mismatch: expected text, got int");
}

#[test]
fn bool_requires_bool() {
    assert_eq!(write::<bool>(true), Ok(true));
    assert!(write::<bool>(1_i64).is_err());
}

#[test]
fn timestamp_requires_exact_kind() {
    let at: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    assert_eq!(write::<DateTime<Utc>>(at), Ok(at));
    let err = write::<DateTime<Utc>>("2024-05-01").unwrap_err();
    assert_eq!(
        err,
        CoercionError::Mismatch {
            expected: FieldKind::Timestamp,
            actual: ValueTag::Text,
        }
    );
}

//
// composites
//

#[test]
fn composite_assigns_exact_opaque_type() {
    let money = Money { cents: 250 };

    assert_eq!(write::<Money>(Value::opaque(money.clone())), Ok(money));
}

#[test]
fn composite_rejects_other_opaque_types() {
    let err = write::<Money>(Value::opaque(250_i64)).unwrap_err();

    assert!(matches!(
        err,
        CoercionError::Mismatch {
            expected: FieldKind::Composite(_),
            actual: ValueTag::Opaque,
        }
    ));
}

//
// optional
//

#[test]
fn optional_allocates_then_recurses() {
    assert_eq!(write::<Option<i32>>(9_i64), Ok(Some(9)));
    assert_eq!(write::<Option<i32>>(Value::Null), Ok(None));
    assert!(write::<Option<i32>>("nine").is_err());
}

#[test]
fn optional_kind_display() {
    assert_eq!(
        <Option<Vec<i64>> as FieldSlot>::kind().to_string(),
        "optional<list<int64>>"
    );
}

//
// collections
//

#[test]
fn scalar_into_collection_appends() {
    let mut slot = vec![1_i64];
    slot.write(Value::Int(2)).unwrap();
    slot.write(Value::Int(3)).unwrap();

    assert_eq!(slot, [1, 2, 3]);
}

#[test]
fn list_into_collection_appends_each_element() {
    let mut slot = vec![String::from("a")];
    slot.write(Value::list(["b", "c"])).unwrap();

    assert_eq!(slot, ["a", "b", "c"]);
}

#[test]
fn blob_spreads_into_bytes() {
    assert_eq!(write::<Vec<u8>>(vec![1_u8, 2, 3]), Ok(vec![1, 2, 3]));
}

#[test]
fn collection_element_failure_is_reported() {
    let err = write::<Vec<u8>>(Value::list([1_i64, 300])).unwrap_err();

    assert!(matches!(err, CoercionError::OutOfRange { .. }));
}

#[test]
fn coerce_list_returns_canonical_list() {
    let kind = FieldKind::List(Box::new(FieldKind::Float { bits: 64 }));

    assert_eq!(
        coerce(Value::Int(2), &kind),
        Ok(Value::List(vec![Value::Float(2.0)]))
    );
}

//
// properties
//

proptest! {
    #[test]
    fn i64_roundtrips_through_i64_slot(v in any::<i64>()) {
        prop_assert_eq!(write::<i64>(v), Ok(v));
    }

    #[test]
    fn i32_slot_accepts_exactly_its_range(v in any::<i64>()) {
        let fits = i32::try_from(v).is_ok();
        prop_assert_eq!(write::<i32>(v).is_ok(), fits);
    }

    #[test]
    fn u16_slot_accepts_exactly_its_range(v in any::<u64>()) {
        let fits = u16::try_from(v).is_ok();
        prop_assert_eq!(write::<u16>(v).is_ok(), fits);
    }

    #[test]
    fn negative_signed_never_fits_unsigned(v in i64::MIN..0) {
        let is_negative = matches!(write::<u64>(v), Err(CoercionError::Negative { .. }));
        prop_assert!(is_negative);
    }

    #[test]
    fn float_truncation_matches_trunc(v in -1.0e9_f64..1.0e9_f64) {
        #[allow(clippy::cast_possible_truncation)]
        let expected = v.trunc() as i64;
        prop_assert_eq!(write::<i64>(v), Ok(expected));
    }
}
