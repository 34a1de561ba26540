//! Module Handle - the plugin loader's view of a loadable unit.
//!
//! # Lifecycle
//!
//! 1. The plugin loader discovers a module and owns its handle.
//! 2. The module's declarations are fed to `ServiceRegistry::parse_module_descriptors`;
//!    the registry keeps only a weak reference to the handle.
//! 3. The first `create()` of an implementation whose factory is missing
//!    calls `start()`, which registers the module's factories through the
//!    registry passed in.
//!
//! A module that registers its factories statically (before any `create`)
//! never needs to be started by the registry.

use hsu_common::{ModuleID, Result};
use crate::registry::ServiceRegistry;

/// A loadable plugin unit owning one or more service factories.
pub trait ModuleHandle: Send + Sync {
    /// Returns the module's unique identifier.
    fn id(&self) -> &ModuleID;

    /// Returns true once the module has been started.
    fn is_started(&self) -> bool;

    /// Starts the module.
    ///
    /// Implementations register their factories on `registry` from inside
    /// this call. The registry holds no lock while `start` runs, so calling
    /// back into it is expected.
    fn start(&self, registry: &ServiceRegistry) -> Result<()>;
}
