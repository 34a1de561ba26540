//! Module Descriptors - externally declared service metadata.
//!
//! A plugin loader enumerates the services each module declares and hands
//! them to `ServiceRegistry::parse_module_descriptors`. A declaration names
//! the implementation, the service type it fulfills, the object types it
//! accepts and a free-form description and tag list. The factory itself is
//! not part of the declaration: the module supplies it when started.
//!
//! ```text
//! ModuleDescriptor (io_vtk)
//! ├── ServiceDeclaration Writer.VTK      : IWriter [Object]
//! └── ServiceDeclaration Writer.VTKImage : IWriter [Image]
//! ```

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use hsu_common::{ImplementationID, ObjectType, ServiceType};
use crate::module_handle::ModuleHandle;
use crate::service_info::{ModuleRef, ObjectSupport, ServiceInfo};

/// One service declared by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDeclaration {
    /// Implementation identifier (e.g. `Writer.VTK`).
    pub implementation: ImplementationID,

    /// Service type fulfilled (e.g. `IWriter`).
    pub service_type: ServiceType,

    /// Accepted object types; empty means "declared later by code".
    #[serde(default)]
    pub objects: Vec<ObjectType>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: String,
}

impl ServiceDeclaration {
    pub fn new(implementation: impl Into<ImplementationID>, service_type: impl Into<ServiceType>) -> Self {
        Self {
            implementation: implementation.into(),
            service_type: service_type.into(),
            objects: Vec::new(),
            description: String::new(),
            tags: String::new(),
        }
    }

    pub fn with_object(mut self, object: impl Into<ObjectType>) -> Self {
        self.objects.push(object.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Builds the candidate store entry for this declaration.
    ///
    /// # Panics
    /// Panics if the implementation id, the service type or one of the
    /// object types is empty. Such a declaration comes from a broken module
    /// manifest.
    pub(crate) fn to_service_info(&self, module: &Arc<dyn ModuleHandle>) -> ServiceInfo {
        assert!(
            !self.implementation.is_empty(),
            "Module '{}' declares a service without an implementation id",
            module.id()
        );
        assert!(
            !self.service_type.is_empty(),
            "Module '{}' declares '{}' without a service type",
            module.id(),
            self.implementation
        );

        assert!(
            self.objects.iter().all(|o| !o.is_empty()),
            "Module '{}' declares an empty object type for '{}'",
            module.id(),
            self.implementation
        );

        let objects = ObjectSupport::from_objects(self.objects.iter().cloned());
        ServiceInfo {
            service_type: self.service_type.clone(),
            factory: None,
            module: Some(ModuleRef::new(module)),
            objects_fixed_by_module: !objects.is_empty(),
            objects,
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// All services declared by one module.
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub module: Arc<dyn ModuleHandle>,
    pub services: Vec<ServiceDeclaration>,
}

impl ModuleDescriptor {
    pub fn new(module: Arc<dyn ModuleHandle>) -> Self {
        Self {
            module,
            services: Vec::new(),
        }
    }

    pub fn with_service(mut self, declaration: ServiceDeclaration) -> Self {
        self.services.push(declaration);
        self
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("module", self.module.id())
            .field("services", &self.services)
            .finish()
    }
}
