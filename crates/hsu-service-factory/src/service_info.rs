//! Per-implementation metadata held by the registry store.

use std::fmt;
use std::sync::{Arc, Weak};
use serde::Serialize;
use hsu_common::{ImplementationID, ModuleID, ObjectType, ServiceType};
use crate::module_handle::ModuleHandle;
use crate::service::FactoryFn;

/// How an implementation accepts a queried object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectMatch {
    /// The implementation names the object type verbatim.
    Specific,
    /// The implementation accepts any object type.
    Generic,
}

/// Object types an implementation declares, classified once on insertion.
#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectSupport {
    declared: Vec<ObjectType>,
    generic: bool,
}

impl ObjectSupport {
    pub(crate) fn from_objects<I>(objects: I) -> Self
    where
        I: IntoIterator<Item = ObjectType>,
    {
        let mut support = Self::default();
        for object in objects {
            support.insert(object);
        }
        support
    }

    /// Adds an object type; returns false if it was already declared.
    pub(crate) fn insert(&mut self, object: ObjectType) -> bool {
        if self.declared.contains(&object) {
            return false;
        }
        self.generic |= object.is_generic();
        self.declared.push(object);
        true
    }

    pub(crate) fn contains(&self, object: &ObjectType) -> bool {
        self.declared.contains(object)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub(crate) fn objects(&self) -> &[ObjectType] {
        &self.declared
    }

    pub(crate) fn is_subset_of(&self, other: &ObjectSupport) -> bool {
        self.declared.iter().all(|o| other.contains(o))
    }

    /// Classifies `object_type` against the declared objects.
    pub(crate) fn matches(&self, object_type: &ObjectType) -> Option<ObjectMatch> {
        if !object_type.is_generic() && self.declared.contains(object_type) {
            Some(ObjectMatch::Specific)
        } else if self.generic {
            Some(ObjectMatch::Generic)
        } else {
            None
        }
    }
}

/// Weak back-reference to the module that owns an implementation.
#[derive(Clone)]
pub(crate) struct ModuleRef {
    pub(crate) id: ModuleID,
    pub(crate) handle: Weak<dyn ModuleHandle>,
}

impl ModuleRef {
    pub(crate) fn new(handle: &Arc<dyn ModuleHandle>) -> Self {
        Self {
            id: handle.id().clone(),
            handle: Arc::downgrade(handle),
        }
    }
}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRef")
            .field("id", &self.id)
            .field("alive", &(self.handle.strong_count() > 0))
            .finish()
    }
}

/// Everything the registry knows about one implementation.
#[derive(Clone)]
pub(crate) struct ServiceInfo {
    pub(crate) service_type: ServiceType,
    pub(crate) factory: Option<FactoryFn>,
    pub(crate) module: Option<ModuleRef>,
    pub(crate) objects: ObjectSupport,
    pub(crate) objects_fixed_by_module: bool,
    pub(crate) description: String,
    pub(crate) tags: String,
}

impl ServiceInfo {
    /// Entry created by code registration: factory known, module not yet.
    pub(crate) fn from_factory(service_type: ServiceType, factory: FactoryFn) -> Self {
        Self {
            service_type,
            factory: Some(factory),
            module: None,
            objects: ObjectSupport::default(),
            objects_fixed_by_module: false,
            description: String::new(),
            tags: String::new(),
        }
    }

    pub(crate) fn summary(&self, implementation: &ImplementationID) -> ServiceSummary {
        ServiceSummary {
            implementation: implementation.clone(),
            service_type: self.service_type.clone(),
            objects: self.objects.objects().to_vec(),
            module: self.module.as_ref().map(|m| m.id.clone()),
            has_factory: self.factory.is_some(),
            objects_fixed_by_module: self.objects_fixed_by_module,
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }
}

impl fmt::Debug for ServiceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInfo")
            .field("service_type", &self.service_type)
            .field("has_factory", &self.factory.is_some())
            .field("module", &self.module)
            .field("objects", &self.objects.objects())
            .field("objects_fixed_by_module", &self.objects_fixed_by_module)
            .finish()
    }
}

/// Owned snapshot of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub implementation: ImplementationID,
    pub service_type: ServiceType,
    pub objects: Vec<ObjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleID>,
    pub has_factory: bool,
    pub objects_fixed_by_module: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tags: String,
}
