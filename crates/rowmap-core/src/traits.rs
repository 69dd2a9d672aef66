use crate::model::DescriptorBuilder;

///
/// Entity
///
/// A composite type the mapper can materialize from rows.
///
/// `describe` is called once per registry, on first use of the type, and
/// declares the primary key, the column map and the relationship fields.
/// Implementations are normally generated by `#[derive(Entity)]`.
///

pub trait Entity: Clone + Default + 'static {
    /// Short name used in diagnostics ("too many rows for entity(name=…)").
    const ENTITY_NAME: &'static str;

    /// Fully-qualified type path (for metrics and tracing).
    const PATH: &'static str;

    fn describe(builder: &mut DescriptorBuilder<Self>);
}
