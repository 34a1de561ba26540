// E2E Test Framework for the HSU Service Factory

pub mod assertions;
pub mod plugin;
pub mod recording;

pub use plugin::PluginModule;
pub use recording::{RecordingService, RecordingWorker};

use std::sync::Arc;
use hsu_service_factory::{ModuleDescriptor, ServiceRegistry, Worker};

/// Build a registry bound to `worker` and declare every module in `modules`.
pub fn registry_with_modules(worker: Arc<dyn Worker>, modules: &[Arc<PluginModule>]) -> ServiceRegistry {
    let registry = ServiceRegistry::new(worker);
    let descriptors: Vec<ModuleDescriptor> = modules.iter().map(PluginModule::descriptor).collect();
    registry.parse_module_descriptors(&descriptors);
    registry
}
