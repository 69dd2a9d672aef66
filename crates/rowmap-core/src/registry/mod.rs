//! Module: registry
//! Responsibility: process-lifetime cache of entity descriptors.
//! Does not own: descriptor construction (see `analyze`).
//!
//! Invariants:
//! - Entries are inserted whole and never evicted or replaced.
//! - A half-built descriptor is never visible outside its analysis session.
//! - A type that failed analysis keeps failing with the same error.

mod analyze;


use crate::{error::SchemaError, model::Descriptor, traits::Entity};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

pub(crate) use analyze::{Analysis, visit};

///
/// GLOBAL_REGISTRY
/// process-wide registry shared by every `Mapper::new()` handle
///

static GLOBAL_REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::new()));

///
/// RegistryEntry
///

#[derive(Clone)]
pub(crate) enum RegistryEntry {
    Ready(Arc<dyn Any + Send + Sync>),
    Failed(SchemaError),
}

///
/// Registry
///
/// Concurrency-safe map from entity type to its descriptor.
///
/// Lazily populated on first use of a type; `register` allows eager
/// population at startup so steady-state scans only ever read.
///

#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<TypeId, RegistryEntry>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Cached outcome for `E`, without triggering analysis.
    #[must_use]
    pub fn get<E: Entity>(&self) -> Option<Result<Arc<Descriptor<E>>, SchemaError>> {
        let entry = self.lookup(TypeId::of::<E>())?;

        Some(match entry {
            RegistryEntry::Ready(any) => any
                .downcast::<Descriptor<E>>()
                .map_err(|_| SchemaError::DescriptorMismatch {
                    entity: E::ENTITY_NAME,
                }),
            RegistryEntry::Failed(err) => Err(err),
        })
    }

    /// Whether `E` has been analyzed successfully.
    #[must_use]
    pub fn contains<E: Entity>(&self) -> bool {
        matches!(
            self.lookup(TypeId::of::<E>()),
            Some(RegistryEntry::Ready(_))
        )
    }

    /// Descriptor for `E`, analyzing it (and everything it relates to) on
    /// first use.
    pub fn descriptor<E: Entity>(&self) -> Result<Arc<Descriptor<E>>, SchemaError> {
        self.descriptor_with::<E>(false)
    }

    /// Analyze `E` eagerly.
    pub fn register<E: Entity>(&self) -> Result<(), SchemaError> {
        self.descriptor::<E>().map(|_| ())
    }

    /// Number of cached entries, failed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub(crate) fn descriptor_with<E: Entity>(
        &self,
        debug: bool,
    ) -> Result<Arc<Descriptor<E>>, SchemaError> {
        if let Some(found) = self.get::<E>() {
            return found;
        }

        let mut analysis = Analysis::new(self, debug);
        let outcome = visit::<E>(&mut analysis);
        analysis.commit(outcome.is_ok());
        outcome?;

        self.get::<E>().unwrap_or(Err(SchemaError::DescriptorMismatch {
            entity: E::ENTITY_NAME,
        }))
    }

    pub(crate) fn lookup(&self, id: TypeId) -> Option<RegistryEntry> {
        self.read().get(&id).cloned()
    }

    /// Publish staged entries. First writer wins.
    pub(crate) fn publish(&self, staged: impl IntoIterator<Item = (TypeId, RegistryEntry)>) {
        let mut entries = self.write();
        for (id, entry) in staged {
            entries.entry(id).or_insert(entry);
        }
    }

    // Entries are only ever inserted whole, so a poisoned lock still guards
    // a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeId, RegistryEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, RegistryEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
