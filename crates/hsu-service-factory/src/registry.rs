//! Service Registry - implementation ids to factories, with lazy module loading
//!
//! # Architecture
//!
//! The registry maps an implementation id (`Writer.VTK`) to everything known
//! about it: the service type it fulfills, the object types it accepts, the
//! module that owns it and, once available, the factory that builds it.
//!
//! ## The Flow
//!
//! ```text
//! Startup
//! ├── plugin loader enumerates modules
//! │   └── parse_module_descriptors(descriptors)   -> entries with a module, no factory
//! └── statically linked code
//!     └── add_service_factory(factory, id, type)   -> entries with a factory
//!
//! Runtime
//! ├── get_default_implementation_for("Image", "IWriter")
//! │   └── scan: specific match beats generic match
//! └── create("Writer.VTKImage")
//!     ├── factory present? -> build, bind worker, return
//!     └── no factory      -> start owning module (single flight, no lock held)
//!                            module registers its factories re-entrantly
//!                            -> build, bind worker, return
//! ```
//!
//! ## Locking
//!
//! - The store sits behind a `parking_lot::RwLock`. Merge operations check
//!   under an upgradable read and upgrade atomically before mutating.
//! - The support cache has its own lock; the two are never held together.
//! - Factories and module start routines always run with no lock held.
//!
//! ## Fatal vs recoverable
//!
//! Registration and declaration bugs (unknown ids, double registration,
//! conflicting types, ambiguous defaults) panic: the binary was assembled
//! inconsistently and there is nothing to recover. A module that loads but
//! does not deliver its factory returns [`FactoryError`] instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};
use hsu_common::{
    FactoryError, FactoryResult, ImplementationID, MatchTier, ModuleID, ObjectType, ServiceType,
};

use crate::descriptor::ModuleDescriptor;
use crate::module_loads::ModuleLoads;
use crate::service::{FactoryFn, Service, ServiceHandle};
use crate::service_info::{ModuleRef, ObjectMatch, ServiceInfo, ServiceSummary};
use crate::support_cache::SupportCache;
use crate::worker::{InlineWorker, Worker};

/// Snapshot of the registry's instrumentation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    /// Store scans performed by `support` (cache misses).
    pub support_scans: u64,
    /// `support` answers served from the cache.
    pub support_cache_hits: u64,
    /// Modules started by `create`.
    pub module_loads: u64,
    /// Services constructed by `create`.
    pub services_created: u64,
}

#[derive(Debug, Default)]
struct Counters {
    support_scans: AtomicU64,
    support_cache_hits: AtomicU64,
    module_loads: AtomicU64,
    services_created: AtomicU64,
}

#[derive(Default)]
struct Store {
    services: HashMap<ImplementationID, ServiceInfo>,
}

impl Store {
    /// # Panics
    /// Panics on an unknown id.
    fn get(&self, implementation: &ImplementationID) -> &ServiceInfo {
        self.services
            .get(implementation)
            .unwrap_or_else(|| panic!("Unknown service implementation '{}'", implementation))
    }
}

/// Matches for one (object type, service type) query, split by tier.
#[derive(Debug, Default)]
struct Matches {
    specific: Vec<ImplementationID>,
    generic: Vec<ImplementationID>,
}

/// Thread-safe service factory registry.
///
/// Constructed explicitly and shared as `Arc<ServiceRegistry>`; there is no
/// process-wide instance.
///
/// # Example
///
/// ```rust,ignore
/// let registry = Arc::new(ServiceRegistry::new(Arc::new(InlineWorker::default())));
/// registry.add_service_factory(|| Box::new(VtkWriter::default()), "Writer.VTK", "IWriter");
/// registry.add_object_factory("Writer.VTK", "Object");
///
/// let writer = registry.create("Writer.VTK")?;
/// ```
pub struct ServiceRegistry {
    store: RwLock<Store>,
    /// Bumped under the store write lock whenever support answers may change.
    generation: AtomicU64,
    support_cache: SupportCache,
    loads: ModuleLoads,
    worker: Arc<dyn Worker>,
    counters: Counters,
}

impl ServiceRegistry {
    /// Creates an empty registry binding `worker` to every service it builds.
    pub fn new(worker: Arc<dyn Worker>) -> Self {
        debug!("[Factory] Creating service registry (worker: {})", worker.name());
        Self {
            store: RwLock::new(Store::default()),
            generation: AtomicU64::new(0),
            support_cache: SupportCache::new(),
            loads: ModuleLoads::new(),
            worker,
            counters: Counters::default(),
        }
    }

    /// The worker bound to constructed services.
    pub fn default_worker(&self) -> Arc<dyn Worker> {
        Arc::clone(&self.worker)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers the factory of `implementation`.
    ///
    /// Creates the entry if the id is new, or attaches the factory to an
    /// entry previously declared by a module descriptor.
    ///
    /// # Panics
    /// Panics if `implementation` already has a factory, or if it is known
    /// with a different service type.
    pub fn add_service_factory<F>(
        &self,
        factory: F,
        implementation: impl Into<ImplementationID>,
        service_type: impl Into<ServiceType>,
    ) where
        F: Fn() -> Box<dyn Service> + Send + Sync + 'static,
    {
        let implementation = implementation.into();
        let service_type = service_type.into();
        let factory: FactoryFn = Arc::new(factory);

        let store = self.store.upgradable_read();
        let exists = match store.services.get(&implementation) {
            Some(existing) => {
                assert!(
                    existing.factory.is_none(),
                    "A factory is already registered for '{}'",
                    implementation
                );
                assert!(
                    existing.service_type == service_type,
                    "Conflicting service types for '{}': known as '{}', registered as '{}'",
                    implementation,
                    existing.service_type,
                    service_type
                );
                true
            }
            None => false,
        };

        let mut store = RwLockUpgradableReadGuard::upgrade(store);
        if exists {
            if let Some(entry) = store.services.get_mut(&implementation) {
                entry.factory = Some(factory);
            }
            trace!("[Factory] Attached factory to declared '{}'", implementation);
        } else {
            store.services.insert(
                implementation.clone(),
                ServiceInfo::from_factory(service_type.clone(), factory),
            );
            debug!("[Factory] Registered factory '{}' ({})", implementation, service_type);
        }
    }

    /// Declares that `implementation` accepts `object_type`.
    ///
    /// When a module descriptor already fixed the object list this only
    /// checks that `object_type` is one of the declared ones.
    ///
    /// # Panics
    /// Panics if `object_type` is empty, if `implementation` is unknown, or
    /// if its objects were fixed by a module that does not declare
    /// `object_type`.
    pub fn add_object_factory(
        &self,
        implementation: impl Into<ImplementationID>,
        object_type: impl Into<ObjectType>,
    ) {
        let implementation = implementation.into();
        let object_type = object_type.into();
        assert!(
            !object_type.is_empty(),
            "Empty object type registered for '{}'",
            implementation
        );

        let store = self.store.upgradable_read();
        let existing = store.get(&implementation);
        if existing.objects_fixed_by_module {
            assert!(
                existing.objects.contains(&object_type),
                "Object type '{}' is not declared by the module of '{}'",
                object_type,
                implementation
            );
            return;
        }
        if existing.objects.contains(&object_type) {
            return;
        }

        let mut store = RwLockUpgradableReadGuard::upgrade(store);
        if let Some(entry) = store.services.get_mut(&implementation) {
            entry.objects.insert(object_type.clone());
        }
        self.bump_generation();
        trace!("[Factory] '{}' accepts '{}'", implementation, object_type);
    }

    /// Merges module-declared services into the store.
    ///
    /// Unknown ids are inserted. Ids already registered by code must agree on
    /// the service type and their code-declared objects must be among the
    /// module's; the module, description, tags and (if declared) object list
    /// are then taken from the descriptor.
    ///
    /// Ids registered by code but declared by no module are logged as
    /// warnings afterwards.
    ///
    /// # Panics
    /// Panics on a declaration without id or type, a service type conflict,
    /// incompatible objects, or an id declared by two different modules.
    pub fn parse_module_descriptors(&self, descriptors: &[ModuleDescriptor]) {
        for descriptor in descriptors {
            debug!(
                "[Factory] Parsing module '{}' ({} service(s))",
                descriptor.module.id(),
                descriptor.services.len()
            );
            for declaration in &descriptor.services {
                let candidate = declaration.to_service_info(&descriptor.module);
                self.merge_declaration(declaration.implementation.clone(), candidate);
            }
        }

        for implementation in self.undeclared_implementations() {
            warn!(
                "[Factory] '{}' is registered by code but not declared by any module",
                implementation
            );
        }
    }

    fn merge_declaration(&self, implementation: ImplementationID, candidate: ServiceInfo) {
        let store = self.store.upgradable_read();
        if let Some(existing) = store.services.get(&implementation) {
            check_declaration(&implementation, existing, &candidate);
        }

        let mut store = RwLockUpgradableReadGuard::upgrade(store);
        match store.services.get_mut(&implementation) {
            Some(entry) => {
                entry.module = candidate.module;
                entry.description = candidate.description;
                entry.tags = candidate.tags;
                if candidate.objects_fixed_by_module {
                    entry.objects = candidate.objects;
                    entry.objects_fixed_by_module = true;
                }
                trace!("[Factory] Merged declaration of '{}'", implementation);
            }
            None => {
                trace!("[Factory] Declared '{}'", implementation);
                store.services.insert(implementation, candidate);
            }
        }
        self.bump_generation();
    }

    fn undeclared_implementations(&self) -> Vec<ImplementationID> {
        let store = self.store.read();
        let mut ids: Vec<_> = store
            .services
            .iter()
            .filter(|(_, info)| info.module.is_none())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Must be called with the store write lock held (or an upgradable read
    /// about to be upgraded) so scans never see a torn generation.
    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    // =========================================================================
    // Instantiation
    // =========================================================================

    /// Builds a new instance of `implementation`.
    ///
    /// If no factory is registered yet, the owning module is started first
    /// (at most once, whichever thread gets there first) and is expected to
    /// register it.
    ///
    /// # Errors
    /// - [`FactoryError::ModuleDidNotRegister`] if the module started but the
    ///   factory is still missing.
    /// - [`FactoryError::ModuleStartFailed`] if the module's start failed.
    /// - [`FactoryError::ModuleUnavailable`] if the loader dropped the module.
    ///
    /// # Panics
    /// Panics on an unknown id, and when the owning module reports itself
    /// started although this registry never started it and no factory exists.
    pub fn create(&self, implementation: impl Into<ImplementationID>) -> FactoryResult<ServiceHandle> {
        let implementation = implementation.into();

        let (factory, module) = {
            let store = self.store.read();
            let info = store.get(&implementation);
            (info.factory.clone(), info.module.clone())
        };

        let factory = match factory {
            Some(factory) => factory,
            None => self.load_factory(&implementation, module)?,
        };

        let mut service = factory();
        service.bind_worker(Arc::clone(&self.worker));
        self.counters.services_created.fetch_add(1, Ordering::Relaxed);
        trace!("[Factory] Created '{}' on worker '{}'", implementation, self.worker.name());

        Ok(ServiceHandle::new(implementation, service))
    }

    /// Builds a new instance of `implementation`, checking that it is an
    /// implementation of `service_type`.
    ///
    /// # Errors
    /// Same as [`create`](Self::create).
    ///
    /// # Panics
    /// Panics on an unknown id, or when `implementation` is registered with a
    /// different service type.
    pub fn create_typed(
        &self,
        service_type: impl Into<ServiceType>,
        implementation: impl Into<ImplementationID>,
    ) -> FactoryResult<ServiceHandle> {
        let service_type = service_type.into();
        let implementation = implementation.into();
        {
            let store = self.store.read();
            let registered = &store.get(&implementation).service_type;
            assert!(
                registered == &service_type,
                "Conflicting types were defined for '{}': registered as '{}', requested as '{}'",
                implementation,
                registered,
                service_type
            );
        }
        self.create(implementation)
    }

    fn load_factory(
        &self,
        implementation: &ImplementationID,
        module: Option<ModuleRef>,
    ) -> FactoryResult<FactoryFn> {
        let module = module.unwrap_or_else(|| {
            panic!(
                "'{}' has no factory and no owning module: implementation declared nowhere",
                implementation
            )
        });

        let handle = module.handle.upgrade().ok_or_else(|| {
            error!("[Factory] Module '{}' owning '{}' was dropped", module.id, implementation);
            FactoryError::module_unavailable(implementation.clone(), module.id.clone())
        })?;

        let started = self.loads.load_once(&module.id, || {
            assert!(
                !handle.is_started(),
                "Module '{}' is already started but no factory is registered for '{}'",
                module.id,
                implementation
            );
            info!("[Factory] Starting module '{}' for '{}'", module.id, implementation);
            handle.start(self).map_err(|e| {
                error!("[Factory] Module '{}' failed to start: {}", module.id, e);
                FactoryError::module_start_failed(module.id.clone(), e.to_string())
            })
        })?;
        if started {
            self.counters.module_loads.fetch_add(1, Ordering::Relaxed);
        }

        let factory = self.store.read().get(implementation).factory.clone();
        factory.ok_or_else(|| {
            error!(
                "[Factory] Module '{}' did not register a factory for '{}'",
                module.id, implementation
            );
            FactoryError::module_did_not_register(implementation.clone(), module.id.clone())
        })
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    fn collect_matches(&self, object_type: &ObjectType, service_type: &ServiceType) -> Matches {
        let store = self.store.read();
        let mut matches = Matches::default();
        for (id, info) in &store.services {
            if &info.service_type != service_type {
                continue;
            }
            match info.objects.matches(object_type) {
                Some(ObjectMatch::Specific) => matches.specific.push(id.clone()),
                Some(ObjectMatch::Generic) => matches.generic.push(id.clone()),
                None => {}
            }
        }
        matches.specific.sort();
        matches.generic.sort();
        matches
    }

    /// All implementations of `service_type` accepting `object_type`,
    /// specifically or generically, sorted by id.
    pub fn get_implementations_for(
        &self,
        object_type: impl Into<ObjectType>,
        service_type: impl Into<ServiceType>,
    ) -> Vec<ImplementationID> {
        let matches = self.collect_matches(&object_type.into(), &service_type.into());
        let mut ids = matches.specific;
        ids.extend(matches.generic);
        ids.sort();
        ids
    }

    /// Resolves the default implementation without panicking.
    ///
    /// A specific match wins over a generic one. More than one match in
    /// either tier is ambiguous.
    ///
    /// # Panics
    /// Panics if `object_type` is the generic sentinel.
    pub fn resolve_default_implementation(
        &self,
        object_type: impl Into<ObjectType>,
        service_type: impl Into<ServiceType>,
    ) -> FactoryResult<ImplementationID> {
        let object_type = object_type.into();
        let service_type = service_type.into();
        assert!(
            !object_type.is_generic(),
            "'{}' is the generic object marker, not a concrete object type",
            object_type
        );

        let Matches {
            mut specific,
            mut generic,
        } = self.collect_matches(&object_type, &service_type);

        if specific.len() > 1 {
            return Err(FactoryError::ambiguous(object_type, service_type, MatchTier::Specific, specific));
        }
        if generic.len() > 1 {
            return Err(FactoryError::ambiguous(object_type, service_type, MatchTier::Generic, generic));
        }

        specific
            .pop()
            .or_else(|| generic.pop())
            .ok_or_else(|| FactoryError::no_implementation(object_type, service_type))
    }

    /// The implementation of `service_type` to use for `object_type`.
    ///
    /// # Panics
    /// Panics when resolution fails (no match, or an ambiguous tier); use
    /// [`resolve_default_implementation`](Self::resolve_default_implementation)
    /// for queries built from runtime input.
    pub fn get_default_implementation_for(
        &self,
        object_type: impl Into<ObjectType>,
        service_type: impl Into<ServiceType>,
    ) -> ImplementationID {
        self.resolve_default_implementation(object_type, service_type)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    /// Returns true if any implementation of `service_type` accepts
    /// `object_type`. Answers are cached until the store changes.
    pub fn support(
        &self,
        object_type: impl Into<ObjectType>,
        service_type: impl Into<ServiceType>,
    ) -> bool {
        let object_type = object_type.into();
        let service_type = service_type.into();

        let generation = self.generation.load(Ordering::Acquire);
        if let Some(supported) = self.support_cache.get(&object_type, &service_type, generation) {
            self.counters.support_cache_hits.fetch_add(1, Ordering::Relaxed);
            return supported;
        }

        let (supported, generation) = {
            let store = self.store.read();
            let supported = store.services.values().any(|info| {
                info.service_type == service_type && info.objects.matches(&object_type).is_some()
            });
            (supported, self.generation.load(Ordering::Acquire))
        };
        self.counters.support_scans.fetch_add(1, Ordering::Relaxed);

        self.support_cache
            .insert(object_type, service_type, supported, generation);
        supported
    }

    /// Returns true if `implementation` fulfills `service_type` and accepts
    /// `object_type`. An unknown implementation supports nothing.
    pub fn support_implementation(
        &self,
        object_type: impl Into<ObjectType>,
        service_type: impl Into<ServiceType>,
        implementation: impl Into<ImplementationID>,
    ) -> bool {
        let object_type = object_type.into();
        let service_type = service_type.into();
        let store = self.store.read();
        store.services.get(&implementation.into()).map_or(false, |info| {
            info.service_type == service_type && info.objects.matches(&object_type).is_some()
        })
    }

    /// Returns true if `implementation` accepts `object_type`. An unknown
    /// implementation is never valid.
    pub fn check_service_validity(
        &self,
        object_type: impl Into<ObjectType>,
        implementation: impl Into<ImplementationID>,
    ) -> bool {
        let object_type = object_type.into();
        let store = self.store.read();
        store
            .services
            .get(&implementation.into())
            .map_or(false, |info| info.objects.matches(&object_type).is_some())
    }

    // =========================================================================
    // Metadata queries
    // =========================================================================

    /// Object types accepted by `implementation`.
    ///
    /// # Panics
    /// Panics on an unknown implementation id.
    pub fn get_service_objects(&self, implementation: impl Into<ImplementationID>) -> Vec<ObjectType> {
        self.store.read().get(&implementation.into()).objects.objects().to_vec()
    }

    /// # Panics
    /// Panics on an unknown implementation id.
    pub fn get_service_description(&self, implementation: impl Into<ImplementationID>) -> String {
        self.store.read().get(&implementation.into()).description.clone()
    }

    /// # Panics
    /// Panics on an unknown implementation id.
    pub fn get_service_tags(&self, implementation: impl Into<ImplementationID>) -> String {
        self.store.read().get(&implementation.into()).tags.clone()
    }

    /// # Panics
    /// Panics on an unknown implementation id.
    pub fn get_service_type(&self, implementation: impl Into<ImplementationID>) -> ServiceType {
        self.store.read().get(&implementation.into()).service_type.clone()
    }

    /// The module declaring `implementation`, if any.
    ///
    /// # Panics
    /// Panics on an unknown implementation id.
    pub fn module_of(&self, implementation: impl Into<ImplementationID>) -> Option<ModuleID> {
        self.store
            .read()
            .get(&implementation.into())
            .module
            .as_ref()
            .map(|m| m.id.clone())
    }

    /// Returns true once `module` was started successfully by `create`.
    pub fn is_module_loaded(&self, module: &ModuleID) -> bool {
        self.loads.is_loaded(module)
    }

    pub fn has_implementation(&self, implementation: impl Into<ImplementationID>) -> bool {
        self.store.read().services.contains_key(&implementation.into())
    }

    /// Every known implementation id, sorted.
    pub fn get_all_implementation_ids(&self) -> Vec<ImplementationID> {
        let mut ids: Vec<_> = self.store.read().services.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Every implementation of `service_type`, sorted.
    pub fn get_implementations(&self, service_type: impl Into<ServiceType>) -> Vec<ImplementationID> {
        let service_type = service_type.into();
        let mut ids: Vec<_> = self
            .store
            .read()
            .services
            .iter()
            .filter(|(_, info)| info.service_type == service_type)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Owned snapshot of every entry, sorted by id.
    pub fn describe(&self) -> Vec<ServiceSummary> {
        let mut summaries: Vec<_> = self
            .store
            .read()
            .services
            .iter()
            .map(|(id, info)| info.summary(id))
            .collect();
        summaries.sort_by(|a, b| a.implementation.cmp(&b.implementation));
        summaries
    }

    /// Logs every entry at debug level.
    pub fn dump(&self) {
        let summaries = self.describe();
        debug!("[Factory] {} registered implementation(s)", summaries.len());
        for s in summaries {
            debug!(
                "[Factory]   {} : {} objects={:?} module={:?} factory={} fixed={}",
                s.implementation,
                s.service_type,
                s.objects,
                s.module,
                s.has_factory,
                s.objects_fixed_by_module
            );
        }
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            support_scans: self.counters.support_scans.load(Ordering::Relaxed),
            support_cache_hits: self.counters.support_cache_hits.load(Ordering::Relaxed),
            module_loads: self.counters.module_loads.load(Ordering::Relaxed),
            services_created: self.counters.services_created.load(Ordering::Relaxed),
        }
    }

    /// Number of registered implementations.
    pub fn count(&self) -> usize {
        self.store.read().services.len()
    }

    /// Removes every entry, cached answer and load record.
    pub fn clear(&self) {
        {
            let mut store = self.store.write();
            store.services.clear();
            self.bump_generation();
        }
        self.support_cache.clear();
        self.loads.clear();
        info!("[Factory] Cleared service registry");
    }
}

/// Validates a module declaration against an entry that already exists.
fn check_declaration(implementation: &ImplementationID, existing: &ServiceInfo, candidate: &ServiceInfo) {
    assert!(
        existing.service_type == candidate.service_type,
        "Conflicting service types for '{}': known as '{}', declared as '{}'",
        implementation,
        existing.service_type,
        candidate.service_type
    );
    if let (Some(owner), Some(declarer)) = (&existing.module, &candidate.module) {
        assert!(
            owner.id == declarer.id,
            "'{}' is declared by both '{}' and '{}'",
            implementation,
            owner.id,
            declarer.id
        );
    }
    if !candidate.objects.is_empty() {
        assert!(
            existing.objects.is_subset_of(&candidate.objects),
            "Objects registered by code for '{}' ({:?}) are not declared by its module ({:?})",
            implementation,
            existing.objects.objects(),
            candidate.objects.objects()
        );
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(Arc::new(InlineWorker::default()))
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("implementations", &self.count())
            .field("cached_answers", &self.support_cache.len())
            .field("worker", &self.worker.name())
            .finish()
    }
}
