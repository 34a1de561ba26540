//! Custom assertions for E2E tests

use hsu_service_factory::ServiceHandle;

use crate::plugin::PluginModule;
use crate::recording::RecordingService;

/// Assert that a module was started exactly once
pub fn assert_started_once(module: &PluginModule) -> Result<(), String> {
    match module.start_calls() {
        1 => Ok(()),
        n => Err(format!("Module was started {} time(s), expected exactly once", n)),
    }
}

/// Assert that a module was never started
pub fn assert_not_started(module: &PluginModule) -> Result<(), String> {
    match module.start_calls() {
        0 => Ok(()),
        n => Err(format!("Module was started {} time(s), expected never", n)),
    }
}

/// Assert that a handle wraps a recording service built by `implementation`
/// and bound to the worker named `worker`
pub fn assert_built_by(handle: &ServiceHandle, implementation: &str, worker: &str) -> Result<(), String> {
    let service = handle
        .downcast_ref::<RecordingService>()
        .ok_or_else(|| format!("'{}' is not a RecordingService", handle.implementation()))?;
    if service.label() != implementation {
        return Err(format!("Built by '{}', expected '{}'", service.label(), implementation));
    }

    match handle.worker() {
        Some(bound) if bound.name() == worker => Ok(()),
        Some(bound) => Err(format!("Bound to worker '{}', expected '{}'", bound.name(), worker)),
        None => Err(format!("'{}' has no worker bound", implementation)),
    }
}
