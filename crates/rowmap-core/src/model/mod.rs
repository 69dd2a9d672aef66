//! Runtime mapping model.
//!
//! A `Descriptor` is the precomputed mapping metadata of one entity type:
//! the primary-key column, the column map, and the relationship fields with
//! their cardinality. Descriptors are produced by `DescriptorBuilder` during
//! analysis, are immutable afterwards, and are shared through the registry.
//!
//! In general:
//! - `Entity::describe` declares *what maps where*
//! - `model` holds *what runs* during a scan

mod builder;
mod descriptor;
mod relation;


pub use builder::DescriptorBuilder;
pub use descriptor::{ColumnBinding, Descriptor, KeyBinding, RelationBinding};
pub use relation::{Cardinality, RelationSlot};

pub(crate) use descriptor::RelationHooks;
