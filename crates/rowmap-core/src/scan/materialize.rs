//! Module: scan::materialize
//! Responsibility: fold one row into the scan's identity map.
//! Does not own: row iteration, output ordering, or final assembly.
//!
//! Invariants:
//! - An entity's column fields are populated once, from the first row that
//!   carries its key; later rows only add relationship links.
//! - Every row feeds every type reachable through relations.
//! - A one-to-one relation links at most one distinct child per parent.

use crate::{
    error::{MapError, SchemaError},
    model::{Cardinality, Descriptor},
    obs::sink::{MetricsEvent, record},
    registry::Registry,
    row::Row,
    scan::{
        Assembler,
        identity::{IdentityMap, NodeId},
    },
    traits::Entity,
    value::IdentityKey,
};
use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
    sync::Arc,
};

///
/// Materialized
/// Outcome of materializing one entity from one row.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Materialized {
    pub(crate) node: NodeId,
    pub(crate) existed: bool,
}

///
/// DescriptorCache
///
/// Per-scan memo of registry descriptors. The registry lock is taken once
/// per type and scan; materialization and assembly both read through it.
///

pub(crate) struct DescriptorCache<'a> {
    registry: &'a Registry,
    debug: bool,
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    misses: u64,
}

impl<'a> DescriptorCache<'a> {
    pub(crate) fn new(registry: &'a Registry, debug: bool) -> Self {
        Self {
            registry,
            debug,
            entries: HashMap::new(),
            misses: 0,
        }
    }

    pub(crate) fn get<E: Entity>(&mut self) -> Result<Arc<Descriptor<E>>, MapError> {
        let id = TypeId::of::<E>();
        if let Some(cached) = self.entries.get(&id) {
            return Arc::clone(cached)
                .downcast::<Descriptor<E>>()
                .map_err(|_| {
                    SchemaError::DescriptorMismatch {
                        entity: E::ENTITY_NAME,
                    }
                    .into()
                });
        }

        let descriptor = self.registry.descriptor_with::<E>(self.debug)?;
        let erased: Arc<dyn Any + Send + Sync> = descriptor.clone();
        self.entries.insert(id, erased);
        self.misses += 1;

        Ok(descriptor)
    }

    /// Registry lookups taken so far.
    pub(crate) const fn misses(&self) -> u64 {
        self.misses
    }
}

///
/// ScanState
///
/// Everything one orchestrator call owns while rows are consumed.
/// Never shared across calls or threads.
///

pub(crate) struct ScanState<'a> {
    pub(crate) identity: IdentityMap,
    pub(crate) descriptors: DescriptorCache<'a>,
    active: HashSet<NodeId>,
    seed: Option<Box<dyn Any>>,
    pub(crate) created: u64,
    pub(crate) merged: u64,
}

impl<'a> ScanState<'a> {
    pub(crate) fn new(registry: &'a Registry, debug: bool) -> Self {
        Self {
            identity: IdentityMap::new(),
            descriptors: DescriptorCache::new(registry, debug),
            active: HashSet::new(),
            seed: None,
            created: 0,
            merged: 0,
        }
    }

    /// Start the first `E` node created in this scan from `seed` instead of
    /// `E::default()`.
    pub(crate) fn with_seed<E: Entity>(mut self, seed: E) -> Self {
        self.seed = Some(Box::new(seed));
        self
    }

    /// Descriptor for `E`, memoized for the rest of the scan.
    pub(crate) fn descriptor<E: Entity>(&mut self) -> Result<Arc<Descriptor<E>>, MapError> {
        self.descriptors.get::<E>()
    }

    /// Assembler over the merged identity map, sharing the descriptor memo.
    pub(crate) fn assembler(&mut self) -> Assembler<'_, 'a> {
        Assembler::new(&self.identity, &mut self.descriptors)
    }

    fn take_seed<E: Entity>(&mut self) -> E {
        if !self.seed.as_ref().is_some_and(|seed| seed.is::<E>()) {
            return E::default();
        }

        self.seed
            .take()
            .and_then(|seed| seed.downcast::<E>().ok())
            .map_or_else(E::default, |seed| *seed)
    }
}

/// Materialize `E` from `row`: find or create its node, then recurse into
/// every relation against the same row.
///
/// Returns `Ok(None)` when the key column is NULL (no `E` on this row).
pub(crate) fn materialize<E: Entity>(
    state: &mut ScanState<'_>,
    row: &Row,
) -> Result<Option<Materialized>, MapError> {
    let descriptor = state.descriptor::<E>()?;
    let key_column = descriptor.key.column;

    let Some(raw_key) = row.get(key_column) else {
        return Err(MapError::MissingKeyColumn {
            entity: E::ENTITY_NAME,
            column: key_column,
        });
    };
    let key = IdentityKey::from_value(raw_key).map_err(|source| MapError::Coercion {
        entity: E::ENTITY_NAME,
        column: key_column,
        source,
    })?;
    let Some(key) = key else {
        return Ok(None);
    };

    let type_id = TypeId::of::<E>();
    let materialized = match state.identity.find(type_id, &key) {
        Some(node) => {
            state.merged += 1;
            Materialized {
                node,
                existed: true,
            }
        }
        None => {
            let seed = state.take_seed::<E>();
            let instance = descriptor.populate_into(seed, row)?;
            let node = state.identity.insert(
                type_id,
                key,
                Box::new(instance),
                descriptor.relations.len(),
            );
            state.created += 1;
            Materialized {
                node,
                existed: false,
            }
        }
    };
    record(MetricsEvent::EntityMaterialized {
        entity_path: E::PATH,
        created: !materialized.existed,
    });

    // data-level cycle: the node is already being filled further up
    if !state.active.insert(materialized.node) {
        return Ok(Some(materialized));
    }
    let linked = link_relations(state, row, &descriptor, materialized.node);
    state.active.remove(&materialized.node);
    linked?;

    Ok(Some(materialized))
}

fn link_relations<E: Entity>(
    state: &mut ScanState<'_>,
    row: &Row,
    descriptor: &Descriptor<E>,
    node: NodeId,
) -> Result<(), MapError> {
    for (index, relation) in descriptor.relations.iter().enumerate() {
        let Some(child) = (relation.hooks.materialize)(state, row)? else {
            continue;
        };

        match relation.cardinality {
            Cardinality::One => match state.identity.links(node, index).first() {
                Some(&current) if current != child.node => {
                    return Err(MapError::TooManyRows {
                        entity: relation.target_name,
                    });
                }
                Some(_) => {}
                None => {
                    state.identity.link(node, index, child.node);
                }
            },
            Cardinality::Many => {
                state.identity.link(node, index, child.node);
            }
        }
    }

    Ok(())
}
