use crate::{
    coerce::{CoercionError, FieldKind},
    error::{MapError, SchemaError},
    model::Cardinality,
    registry::Analysis,
    row::Row,
    scan::{Assembler, Materialized, NodeId, ScanState},
    traits::Entity,
    value::Value,
};
use std::{any::TypeId, fmt};

///
/// Descriptor
///
/// Immutable mapping metadata for one entity type.
///

pub struct Descriptor<E> {
    pub(crate) entity_name: &'static str,
    pub(crate) path: &'static str,
    pub(crate) key: KeyBinding,
    /// Column map, including the primary-key column. Column names are unique.
    pub(crate) columns: Vec<ColumnBinding<E>>,
    pub(crate) relations: Vec<RelationBinding<E>>,
}

impl<E> Descriptor<E> {
    #[must_use]
    pub const fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    #[must_use]
    pub const fn path(&self) -> &'static str {
        self.path
    }

    #[must_use]
    pub const fn key(&self) -> &KeyBinding {
        &self.key
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnBinding<E>] {
        &self.columns
    }

    #[must_use]
    pub fn relations(&self) -> &[RelationBinding<E>] {
        &self.relations
    }

    /// Look up the binding for one column name.
    #[must_use]
    pub fn column(&self, column: &str) -> Option<&ColumnBinding<E>> {
        self.columns.iter().find(|binding| binding.column == column)
    }

    /// Look up the binding for one relationship field.
    #[must_use]
    pub fn relation(&self, field: &str) -> Option<&RelationBinding<E>> {
        self.relations.iter().find(|binding| binding.field == field)
    }
}

impl<E: Entity> Descriptor<E> {
    /// Write the mapped columns of one row over `entity`.
    ///
    /// Fields whose column is missing or NULL keep their current value.
    pub(crate) fn populate_into(&self, mut entity: E, row: &Row) -> Result<E, MapError> {
        for binding in &self.columns {
            let Some(value) = row.get(binding.column) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            binding
                .write(&mut entity, value.clone())
                .map_err(|source| MapError::Coercion {
                    entity: self.entity_name,
                    column: binding.column,
                    source,
                })?;
        }

        Ok(entity)
    }
}

impl<E> fmt::Debug for Descriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("entity_name", &self.entity_name)
            .field("key", &self.key)
            .field("columns", &self.columns)
            .field("relations", &self.relations)
            .finish_non_exhaustive()
    }
}

///
/// KeyBinding
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyBinding {
    pub column: &'static str,
    pub field: &'static str,
}

///
/// ColumnBinding
///
/// One column → field mapping with its destination kind.
///

pub struct ColumnBinding<E> {
    pub(crate) column: &'static str,
    pub(crate) field: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) writer: ColumnWriter<E>,
}

impl<E> ColumnBinding<E> {
    #[must_use]
    pub const fn column(&self) -> &'static str {
        self.column
    }

    #[must_use]
    pub const fn field(&self) -> &'static str {
        self.field
    }

    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self.writer, ColumnWriter::ReadOnly)
    }

    /// Coerce `value` into this binding's field of `entity`.
    pub fn write(&self, entity: &mut E, value: Value) -> Result<(), CoercionError> {
        match &self.writer {
            ColumnWriter::Settable(write) => write(entity, value),
            ColumnWriter::ReadOnly => Err(CoercionError::Unsettable { field: self.field }),
        }
    }
}

impl<E> fmt::Debug for ColumnBinding<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnBinding")
            .field("column", &self.column)
            .field("field", &self.field)
            .field("kind", &self.kind)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

pub(crate) type ColumnWriteFn<E> =
    Box<dyn Fn(&mut E, Value) -> Result<(), CoercionError> + Send + Sync>;

pub(crate) enum ColumnWriter<E> {
    Settable(ColumnWriteFn<E>),
    ReadOnly,
}

///
/// RelationBinding
///
/// One relationship field: target type, cardinality, and the monomorphized
/// hooks that analyze, materialize and assemble the target.
///

pub struct RelationBinding<E> {
    pub(crate) field: &'static str,
    pub(crate) target: TypeId,
    pub(crate) target_name: &'static str,
    pub(crate) cardinality: Cardinality,
    pub(crate) hooks: RelationHooks<E>,
}

impl<E> RelationBinding<E> {
    #[must_use]
    pub const fn field(&self) -> &'static str {
        self.field
    }

    #[must_use]
    pub const fn target(&self) -> TypeId {
        self.target
    }

    #[must_use]
    pub const fn target_name(&self) -> &'static str {
        self.target_name
    }

    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

impl<E> fmt::Debug for RelationBinding<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationBinding")
            .field("field", &self.field)
            .field("target_name", &self.target_name)
            .field("cardinality", &self.cardinality)
            .finish_non_exhaustive()
    }
}

pub(crate) type AssembleFn<E> = Box<
    dyn Fn(&mut E, &mut Assembler<'_, '_>, &[NodeId]) -> Result<(), MapError> + Send + Sync,
>;

///
/// RelationHooks
///
/// Type-erased entry points into the generic analyzer, materializer and
/// assembler for the relation target.
///

pub(crate) struct RelationHooks<E> {
    pub(crate) analyze: fn(&mut Analysis<'_>) -> Result<(), SchemaError>,
    pub(crate) materialize: fn(&mut ScanState<'_>, &Row) -> Result<Option<Materialized>, MapError>,
    pub(crate) assemble: AssembleFn<E>,
}
