//! Shared fixtures for unit tests.

use crate::{
    model::DescriptorBuilder,
    registry::Registry,
    row::{MemoryRows, Row},
    scan::Mapper,
    traits::Entity,
    value::Value,
};
use rowmap_derive::Entity;
use std::sync::Arc;

///
/// User
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[mapper(name = "user")]
pub(crate) struct User {
    #[mapper(primary_key = "user_id")]
    pub(crate) user_id: i64,
    #[mapper(column = "name")]
    pub(crate) name: String,
}

impl User {
    pub(crate) fn new(user_id: i64, name: &str) -> Self {
        Self {
            user_id,
            name: name.to_string(),
        }
    }
}

///
/// Address
/// one-to-many towards `User`
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[mapper(name = "address")]
pub(crate) struct Address {
    #[mapper(primary_key = "address_id")]
    pub(crate) address_id: i64,
    #[mapper(column = "street")]
    pub(crate) street: String,
    #[mapper(relation)]
    pub(crate) owners: Vec<User>,
}

///
/// Deed
/// one-to-one towards `User`
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[mapper(name = "deed")]
pub(crate) struct Deed {
    #[mapper(primary_key = "address_id")]
    pub(crate) address_id: i64,
    #[mapper(relation)]
    pub(crate) owner: Option<User>,
}

///
/// Person / Home
/// mutually referential pair
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[mapper(name = "person")]
pub(crate) struct Person {
    #[mapper(primary_key = "person_id")]
    pub(crate) person_id: i64,
    #[mapper(relation)]
    pub(crate) home: Option<Box<Home>>,
}

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[mapper(name = "home")]
pub(crate) struct Home {
    #[mapper(primary_key = "home_id")]
    pub(crate) home_id: i64,
    #[mapper(relation)]
    pub(crate) residents: Vec<Person>,
}

///
/// TwoKeys
/// declares a second primary key by hand
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TwoKeys {
    pub(crate) a: i64,
    pub(crate) b: i64,
}

impl Entity for TwoKeys {
    const ENTITY_NAME: &'static str = "two_keys";
    const PATH: &'static str = "test_support::TwoKeys";

    fn describe(builder: &mut DescriptorBuilder<Self>) {
        builder
            .primary_key("a", "a", |e| &mut e.a)
            .primary_key("b", "b", |e| &mut e.b);
    }
}

///
/// Holder
/// relates to a type whose analysis fails
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Holder {
    pub(crate) holder_id: i64,
    pub(crate) broken: Option<TwoKeys>,
}

impl Entity for Holder {
    const ENTITY_NAME: &'static str = "holder";
    const PATH: &'static str = "test_support::Holder";

    fn describe(builder: &mut DescriptorBuilder<Self>) {
        builder
            .primary_key("holder_id", "holder_id", |e| &mut e.holder_id)
            .relation::<TwoKeys, _>("broken", |e| &mut e.broken);
    }
}

///
/// Employee
/// points at its own type through `manager`
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Employee {
    pub(crate) employee_id: i64,
    pub(crate) manager: Option<Box<Employee>>,
}

impl Entity for Employee {
    const ENTITY_NAME: &'static str = "employee";
    const PATH: &'static str = "test_support::Employee";

    fn describe(builder: &mut DescriptorBuilder<Self>) {
        builder
            .primary_key("employee_id", "employee_id", |e| &mut e.employee_id)
            .relation::<Self, _>("manager", |e| &mut e.manager);
    }
}

/// Mapper over a fresh registry, isolated from other tests.
pub(crate) fn mapper() -> Mapper {
    Mapper::with_registry(Arc::new(Registry::new()))
}

/// Row from `(column, value)` pairs.
pub(crate) fn row<const N: usize>(pairs: [(&str, Value); N]) -> Row {
    pairs.into_iter().collect()
}

/// Row source over `rows`.
pub(crate) fn rows<const N: usize>(rows: [Row; N]) -> MemoryRows {
    MemoryRows::new(rows)
}
