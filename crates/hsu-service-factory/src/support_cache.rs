//! Memoized answers to `support(object_type, service_type)`.
//!
//! The cache has its own lock, independent of the registry store. Callers
//! never hold both at once: the store is scanned and released first, then
//! the result is written here.
//!
//! Each answer is tagged with the store generation it was computed from.
//! The store bumps its generation on every mutation that can change an
//! answer, so entries computed before a late registration are simply
//! ignored instead of served stale.

use std::collections::HashMap;
use parking_lot::RwLock;
use hsu_common::{ObjectType, ServiceType};

#[derive(Debug, Clone, Copy)]
struct CachedAnswer {
    supported: bool,
    generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SupportCache {
    entries: RwLock<HashMap<(ObjectType, ServiceType), CachedAnswer>>,
}

impl SupportCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached answer if it was computed at `generation`.
    pub(crate) fn get(
        &self,
        object_type: &ObjectType,
        service_type: &ServiceType,
        generation: u64,
    ) -> Option<bool> {
        let entries = self.entries.read();
        entries
            .get(&(object_type.clone(), service_type.clone()))
            .filter(|answer| answer.generation == generation)
            .map(|answer| answer.supported)
    }

    /// Stores an answer unless a newer one is already present.
    pub(crate) fn insert(
        &self,
        object_type: ObjectType,
        service_type: ServiceType,
        supported: bool,
        generation: u64,
    ) {
        let mut entries = self.entries.write();
        let answer = CachedAnswer {
            supported,
            generation,
        };
        entries
            .entry((object_type, service_type))
            .and_modify(|existing| {
                if existing.generation <= generation {
                    *existing = answer;
                }
            })
            .or_insert(answer);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }
}
