//! Services produced by the registry and the factories that build them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use hsu_common::ImplementationID;
use crate::worker::Worker;

/// A constructed service instance.
///
/// # Rust Learning Note
///
/// `as_any` gives callers a way back to the concrete type: the registry
/// only knows services as `dyn Service`, but a consumer that asked for a
/// `Writer.VTK` wants its `VtkWriter` back. `Any::downcast_ref` does that
/// check at runtime.
pub trait Service: Send + Sync + 'static {
    /// Binds the execution context this service must run on.
    ///
    /// Called exactly once by the registry, before the service is returned
    /// from `create`.
    fn bind_worker(&mut self, worker: Arc<dyn Worker>);

    /// Returns the worker bound to this service, if any.
    fn worker(&self) -> Option<Arc<dyn Worker>>;

    fn as_any(&self) -> &dyn Any;
}

/// Type-erased factory stored in the registry.
///
/// Kept behind an `Arc` so a caller can clone it out of the store and run it
/// with no registry lock held.
pub type FactoryFn = Arc<dyn Fn() -> Box<dyn Service> + Send + Sync>;

/// Handle returned by `ServiceRegistry::create`.
#[derive(Clone)]
pub struct ServiceHandle {
    implementation: ImplementationID,
    service: Arc<dyn Service>,
}

impl ServiceHandle {
    pub(crate) fn new(implementation: ImplementationID, service: Box<dyn Service>) -> Self {
        Self {
            implementation,
            service: Arc::from(service),
        }
    }

    /// The implementation id this service was created from.
    pub fn implementation(&self) -> &ImplementationID {
        &self.implementation
    }

    /// The worker the registry bound to this service.
    pub fn worker(&self) -> Option<Arc<dyn Worker>> {
        self.service.worker()
    }

    pub fn service(&self) -> &Arc<dyn Service> {
        &self.service
    }

    /// Downcasts to the concrete service type.
    pub fn downcast_ref<T: Service>(&self) -> Option<&T> {
        self.service.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("implementation", &self.implementation)
            .field("worker", &self.worker().map(|w| w.name().to_string()))
            .finish()
    }
}
