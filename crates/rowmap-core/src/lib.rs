//! Core runtime for rowmap: values, row sources, the coercion engine, entity
//! descriptors, the metadata registry, and the scan orchestrators that turn
//! flattened join results into typed entity graphs.
#![warn(unreachable_pub)]

extern crate self as rowmap;

// public exports are one module level down
pub mod coerce;
pub mod error;
pub mod model;
pub mod obs;
pub mod registry;
pub mod row;
pub mod scan;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only mapping vocabulary.
/// No errors, sinks, or registry internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        row::{Row, RowSource},
        scan::Mapper,
        traits::Entity,
        value::Value,
    };
}
