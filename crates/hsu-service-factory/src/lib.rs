//! # HSU Service Factory
//!
//! Registry mapping service implementation ids to the factories that build
//! them.
//!
//! This crate provides:
//! - `ServiceRegistry` - registration, resolution and instantiation
//! - Lazy module loading: a module is started the first time one of its
//!   implementations is created without a registered factory
//! - Specific vs generic object-type matching for default resolution
//! - A cached `support` query
//! - Module descriptors and a YAML service catalog to declare services
//! - Workers: execution contexts bound to every constructed service

pub mod catalog;
pub mod descriptor;
pub mod module_handle;
pub mod registry;
pub mod service;
pub mod service_info;
pub mod worker;

mod module_loads;
mod support_cache;


// Re-export main types
pub use catalog::{ModuleDeclaration, ServiceCatalog};
pub use descriptor::{ModuleDescriptor, ServiceDeclaration};
pub use module_handle::ModuleHandle;
pub use registry::{RegistryStats, ServiceRegistry};
pub use service::{FactoryFn, Service, ServiceHandle};
pub use service_info::{ObjectMatch, ServiceSummary};
pub use worker::{InlineWorker, Task, TokioWorker, Worker};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
