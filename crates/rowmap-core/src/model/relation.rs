use crate::traits::Entity;
use std::fmt;

///
/// Cardinality
///
/// Relationship shape, inferred from the field type.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Cardinality {
    One,
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::One => "one_to_one",
            Self::Many => "one_to_many",
        };
        write!(f, "{label}")
    }
}

///
/// RelationSlot
///
/// Field shape that can hold related entities of type `R`.
///
/// Scalar shapes (`R`, `Box<R>`, `Option<R>`, `Option<Box<R>>`) are
/// one-to-one; collection shapes (`Vec<R>`, `Vec<Box<R>>`,
/// `Option<Vec<R>>`, `Option<Vec<Box<R>>>`) are one-to-many. Assembly
/// starts from the node's slot and calls `attach` once per related entity,
/// in first-seen order.
///

pub trait RelationSlot<R: Entity> {
    const CARDINALITY: Cardinality;

    fn attach(&mut self, related: R);
}

impl<R: Entity> RelationSlot<R> for R {
    const CARDINALITY: Cardinality = Cardinality::One;

    fn attach(&mut self, related: R) {
        *self = related;
    }
}

impl<R: Entity> RelationSlot<R> for Box<R> {
    const CARDINALITY: Cardinality = Cardinality::One;

    fn attach(&mut self, related: R) {
        **self = related;
    }
}

impl<R: Entity> RelationSlot<R> for Option<R> {
    const CARDINALITY: Cardinality = Cardinality::One;

    fn attach(&mut self, related: R) {
        *self = Some(related);
    }
}

impl<R: Entity> RelationSlot<R> for Option<Box<R>> {
    const CARDINALITY: Cardinality = Cardinality::One;

    fn attach(&mut self, related: R) {
        *self = Some(Box::new(related));
    }
}

impl<R: Entity> RelationSlot<R> for Vec<R> {
    const CARDINALITY: Cardinality = Cardinality::Many;

    fn attach(&mut self, related: R) {
        self.push(related);
    }
}

impl<R: Entity> RelationSlot<R> for Vec<Box<R>> {
    const CARDINALITY: Cardinality = Cardinality::Many;

    fn attach(&mut self, related: R) {
        self.push(Box::new(related));
    }
}

impl<R: Entity> RelationSlot<R> for Option<Vec<R>> {
    const CARDINALITY: Cardinality = Cardinality::Many;

    fn attach(&mut self, related: R) {
        self.get_or_insert_with(Vec::new).push(related);
    }
}

impl<R: Entity> RelationSlot<R> for Option<Vec<Box<R>>> {
    const CARDINALITY: Cardinality = Cardinality::Many;

    fn attach(&mut self, related: R) {
        self.get_or_insert_with(Vec::new).push(Box::new(related));
    }
}
