//! Module: registry::analyze
//! Responsibility: build descriptors for an entity and its relation graph.
//! Does not own: the published cache (see `Registry`).
//!
//! Invariants:
//! - Each type is described at most once per session.
//! - The cycle placeholder (`pending`) never leaves the session.
//! - Publication is all-or-failures: a failed session publishes only the
//!   types that failed, never descriptors that depended on them.

use crate::{
    error::SchemaError,
    model::DescriptorBuilder,
    obs::sink::{MetricsEvent, record},
    registry::{Registry, RegistryEntry},
    traits::Entity,
};
use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
    sync::Arc,
};

///
/// Analysis
///
/// One analysis session, started on a registry cache miss.
///

pub(crate) struct Analysis<'a> {
    registry: &'a Registry,
    debug: bool,
    pending: HashSet<TypeId>,
    staged: HashMap<TypeId, RegistryEntry>,
}

impl<'a> Analysis<'a> {
    pub(crate) fn new(registry: &'a Registry, debug: bool) -> Self {
        Self {
            registry,
            debug,
            pending: HashSet::new(),
            staged: HashMap::new(),
        }
    }

    /// Hand the staged entries to the registry.
    pub(crate) fn commit(self, succeeded: bool) {
        let staged = self
            .staged
            .into_iter()
            .filter(|(_, entry)| succeeded || matches!(entry, RegistryEntry::Failed(_)));

        self.registry.publish(staged);
    }

    fn debug_log(&self, s: impl AsRef<str>) {
        if self.debug {
            println!("[debug] {}", s.as_ref());
        }
    }

    // Known to this session or to the registry; a cached failure is replayed.
    fn resolved(&self, id: TypeId) -> Option<Result<(), SchemaError>> {
        if self.pending.contains(&id) {
            return Some(Ok(()));
        }

        let entry = match self.staged.get(&id) {
            Some(entry) => entry.clone(),
            None => self.registry.lookup(id)?,
        };

        Some(match entry {
            RegistryEntry::Ready(_) => Ok(()),
            RegistryEntry::Failed(err) => Err(err),
        })
    }
}

/// Analyze `E` within `analysis`, recursing into its relation targets.
///
/// Free function so it can be stored as a relation hook.
pub(crate) fn visit<E: Entity>(analysis: &mut Analysis<'_>) -> Result<(), SchemaError> {
    let id = TypeId::of::<E>();
    if let Some(resolved) = analysis.resolved(id) {
        return resolved;
    }

    // placeholder: relations reaching back to `E` stop here
    analysis.pending.insert(id);

    let mut builder = DescriptorBuilder::<E>::new();
    E::describe(&mut builder);

    let outcome = builder.finish().and_then(|descriptor| {
        for relation in &descriptor.relations {
            (relation.hooks.analyze)(analysis).map_err(|source| SchemaError::Relation {
                entity: E::ENTITY_NAME,
                field: relation.field,
                source: Box::new(source),
            })?;
        }

        Ok(descriptor)
    });

    analysis.pending.remove(&id);

    match outcome {
        Ok(descriptor) => {
            analysis.debug_log(format!(
                "analyzed entity(name={}) key={} columns={} relations={}",
                E::ENTITY_NAME,
                descriptor.key.column,
                descriptor.columns.len(),
                descriptor.relations.len(),
            ));
            record(MetricsEvent::DescriptorAnalyzed {
                entity_path: E::PATH,
            });

            analysis
                .staged
                .insert(id, RegistryEntry::Ready(Arc::new(descriptor)));

            Ok(())
        }
        Err(err) => {
            analysis.debug_log(format!(
                "analysis failed for entity(name={}): {err}",
                E::ENTITY_NAME
            ));
            analysis
                .staged
                .insert(id, RegistryEntry::Failed(err.clone()));

            Err(err)
        }
    }
}
