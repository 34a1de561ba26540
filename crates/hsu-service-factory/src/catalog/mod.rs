//! Service catalog - YAML declaration of modules and their services.
//!
//! ```yaml
//! modules:
//!   - id: io_vtk
//!     services:
//!       - implementation: Writer.VTK
//!         service_type: IWriter
//!         objects: [Object]
//!         description: Generic VTK writer
//!         tags: io,vtk
//!       - implementation: Writer.VTKImage
//!         service_type: IWriter
//!         objects: [Image]
//!   - id: io_dicom
//!     enabled: false
//!     services: []
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use tracing::debug;
use hsu_common::ModuleID;

use crate::descriptor::{ModuleDescriptor, ServiceDeclaration};
use crate::module_handle::ModuleHandle;

pub mod validation;

/// Top-level catalog structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceCatalog {
    #[serde(default)]
    pub modules: Vec<ModuleDeclaration>,
}

/// One module and the services it declares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDeclaration {
    pub id: ModuleID,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub services: Vec<ServiceDeclaration>,
}

impl ServiceCatalog {
    /// Load a catalog from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read catalog file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load a catalog from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let catalog: ServiceCatalog = serde_yaml::from_str(content)
            .context("Failed to parse YAML service catalog")?;

        catalog.validate()?;
        Ok(catalog)
    }

    /// Validate the catalog
    pub fn validate(&self) -> Result<()> {
        validation::validate_catalog(self)
    }

    /// Enabled modules only
    pub fn enabled_modules(&self) -> Vec<&ModuleDeclaration> {
        self.modules.iter().filter(|m| m.enabled).collect()
    }

    /// Number of services declared by enabled modules
    pub fn service_count(&self) -> usize {
        self.enabled_modules().iter().map(|m| m.services.len()).sum()
    }

    /// Builds registry descriptors for every enabled module.
    ///
    /// `resolve` maps a module id to the handle owned by the plugin loader.
    /// A module the loader does not know is an error.
    pub fn module_descriptors<F>(&self, mut resolve: F) -> Result<Vec<ModuleDescriptor>>
    where
        F: FnMut(&ModuleID) -> Option<Arc<dyn ModuleHandle>>,
    {
        self.enabled_modules()
            .into_iter()
            .map(|declaration| {
                let module = resolve(&declaration.id)
                    .ok_or_else(|| anyhow!("Module '{}' is not known to the loader", declaration.id))?;
                debug!(
                    "[Catalog] Module '{}' declares {} service(s)",
                    declaration.id,
                    declaration.services.len()
                );
                Ok(ModuleDescriptor {
                    module,
                    services: declaration.services.clone(),
                })
            })
            .collect()
    }
}

fn default_enabled() -> bool {
    true
}
