use super::*;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};

/// Validate the complete catalog
pub fn validate_catalog(catalog: &ServiceCatalog) -> Result<()> {
    let mut module_ids = HashSet::new();
    let mut owners: HashMap<&str, &str> = HashMap::new();

    for module in &catalog.modules {
        validate_module_id(&module.id)?;
        if !module_ids.insert(module.id.as_str()) {
            return Err(anyhow!("Duplicate module ID: {}", module.id));
        }

        for service in &module.services {
            validate_service(&module.id, service)?;

            if let Some(owner) = owners.insert(service.implementation.as_str(), module.id.as_str()) {
                return Err(anyhow!(
                    "Implementation '{}' is declared by both '{}' and '{}'",
                    service.implementation,
                    owner,
                    module.id
                ));
            }
        }
    }

    Ok(())
}

fn validate_module_id(id: &ModuleID) -> Result<()> {
    if id.is_empty() {
        return Err(anyhow!("Module ID cannot be empty"));
    }

    if id.as_str().chars().any(char::is_whitespace) {
        return Err(anyhow!("Module ID cannot contain whitespace: '{}'", id));
    }

    Ok(())
}

/// Validate a single service declaration
fn validate_service(module: &ModuleID, service: &ServiceDeclaration) -> Result<()> {
    if service.implementation.is_empty() {
        return Err(anyhow!("Module '{}' declares a service without an implementation", module));
    }

    if service.service_type.is_empty() {
        return Err(anyhow!(
            "Service '{}' in module '{}' has no service type",
            service.implementation,
            module
        ));
    }

    if service.objects.iter().any(|o| o.is_empty()) {
        return Err(anyhow!(
            "Service '{}' in module '{}' declares an empty object type",
            service.implementation,
            module
        ));
    }

    Ok(())
}
