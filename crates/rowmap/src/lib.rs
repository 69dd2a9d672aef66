//! ## Crate layout
//! - `value`: untyped row values and identity keys.
//! - `row`: rows and the row-source boundary (`RowSource`, `MemoryRows`).
//! - `coerce`: the value coercion engine and field slots.
//! - `model`: entity descriptors and the descriptor builder.
//! - `registry`: the process-lifetime descriptor cache.
//! - `scan`: the `Mapper` orchestrators (`map_one`, `map_many`).
//! - `obs`: metrics and trace sinks.
//! - `error`: `MapError`, `SchemaError` and their classification.
//!
//! `#[derive(Entity)]` generates descriptors from `#[mapper(...)]` field
//! attributes; the `prelude` carries the mapping vocabulary.

pub use rowmap_core as core;

pub use rowmap_core::{
    coerce, error, impl_composite_slot, model, obs, registry, row, scan, traits, value,
};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Top-level exports
//

pub use rowmap_core::{
    error::{MapError, SchemaError},
    registry::Registry,
    row::{MemoryRows, Row, RowSource},
    scan::Mapper,
    value::Value,
};
pub use rowmap_derive::Entity;

///
/// Prelude
/// mapping vocabulary plus the derive
///

pub mod prelude {
    pub use rowmap_core::prelude::*;
    pub use rowmap_derive::Entity;
}
