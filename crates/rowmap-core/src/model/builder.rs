use crate::{
    coerce::FieldSlot,
    error::{MapError, SchemaError},
    model::{
        ColumnBinding, Descriptor, KeyBinding, RelationBinding, RelationHooks, RelationSlot,
        descriptor::ColumnWriter,
    },
    registry,
    scan::{self, Assembler, NodeId},
    traits::Entity,
};
use std::any::TypeId;

///
/// DescriptorBuilder
///
/// Collects the mapping declarations of one entity during analysis.
///
/// Declaration errors are latched: the first one wins and is reported by
/// the analyzer once `Entity::describe` returns.
///

pub struct DescriptorBuilder<E> {
    key: Option<KeyBinding>,
    columns: Vec<ColumnBinding<E>>,
    relations: Vec<RelationBinding<E>>,
    error: Option<SchemaError>,
}

impl<E: Entity> DescriptorBuilder<E> {
    pub(crate) const fn new() -> Self {
        Self {
            key: None,
            columns: Vec::new(),
            relations: Vec::new(),
            error: None,
        }
    }

    /// Declare the primary-key column. The key column is also mapped like
    /// any other column.
    pub fn primary_key<S: FieldSlot + 'static>(
        &mut self,
        column: &'static str,
        field: &'static str,
        accessor: fn(&mut E) -> &mut S,
    ) -> &mut Self {
        if let Some(first) = self.key {
            self.fail(SchemaError::DuplicatePrimaryKey {
                entity: E::ENTITY_NAME,
                first: first.column,
                second: column,
            });
            return self;
        }

        self.key = Some(KeyBinding { column, field });
        self.column(column, field, accessor)
    }

    /// Map one column onto a field.
    pub fn column<S: FieldSlot + 'static>(
        &mut self,
        column: &'static str,
        field: &'static str,
        accessor: fn(&mut E) -> &mut S,
    ) -> &mut Self {
        let writer = ColumnWriter::Settable(Box::new(move |entity: &mut E, value| {
            accessor(entity).write(value)
        }));

        self.push_column(ColumnBinding {
            column,
            field,
            kind: S::kind(),
            writer,
        })
    }

    /// Map one column onto a field the mapper must never write.
    ///
    /// NULL values are skipped as usual; any other value fails the scan
    /// with a settability error.
    pub fn read_only<S: FieldSlot>(&mut self, column: &'static str, field: &'static str) -> &mut Self {
        self.push_column(ColumnBinding {
            column,
            field,
            kind: S::kind(),
            writer: ColumnWriter::ReadOnly,
        })
    }

    /// Declare a relationship field. Cardinality follows the field shape.
    pub fn relation<R, S>(&mut self, field: &'static str, accessor: fn(&mut E) -> &mut S) -> &mut Self
    where
        R: Entity,
        S: RelationSlot<R> + 'static,
    {
        // a row carries one key per type, so a direct self-relation would
        // always resolve to the owner itself
        if TypeId::of::<R>() == TypeId::of::<E>() {
            self.fail(SchemaError::SelfRelation {
                entity: E::ENTITY_NAME,
                field,
            });
            return self;
        }

        let assemble = Box::new(
            move |entity: &mut E,
                  assembler: &mut Assembler<'_, '_>,
                  children: &[NodeId]|
                  -> Result<(), MapError> {
                for &child in children {
                    let related = assembler.assemble::<R>(child)?;
                    accessor(entity).attach(related);
                }

                Ok(())
            },
        );

        self.relations.push(RelationBinding {
            field,
            target: TypeId::of::<R>(),
            target_name: R::ENTITY_NAME,
            cardinality: S::CARDINALITY,
            hooks: RelationHooks {
                analyze: registry::visit::<R>,
                materialize: scan::materialize::<R>,
                assemble,
            },
        });

        self
    }

    /// Finish the declaration, surfacing the first latched error.
    pub(crate) fn finish(self) -> Result<Descriptor<E>, SchemaError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let Some(key) = self.key else {
            return Err(SchemaError::MissingPrimaryKey {
                entity: E::ENTITY_NAME,
            });
        };

        Ok(Descriptor {
            entity_name: E::ENTITY_NAME,
            path: E::PATH,
            key,
            columns: self.columns,
            relations: self.relations,
        })
    }

    fn push_column(&mut self, binding: ColumnBinding<E>) -> &mut Self {
        if self.columns.iter().any(|c| c.column == binding.column) {
            self.fail(SchemaError::DuplicateColumn {
                entity: E::ENTITY_NAME,
                column: binding.column,
            });
            return self;
        }

        self.columns.push(binding);
        self
    }

    fn fail(&mut self, err: SchemaError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}
