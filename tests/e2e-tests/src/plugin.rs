//! Plugin module double
//!
//! Stands in for a dynamically loaded library: it declares services up front
//! and registers their factories only when the registry starts it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hsu_common::{Error, ModuleID, Result};
use hsu_service_factory::{ModuleDeclaration, ModuleDescriptor, ModuleHandle, ServiceDeclaration, ServiceRegistry};

use crate::recording::RecordingService;

type StartHook = Box<dyn Fn(&ServiceRegistry) + Send + Sync>;

pub struct PluginModule {
    id: ModuleID,
    services: Vec<ServiceDeclaration>,
    registers_factories: bool,
    fail_start: bool,
    start_delay: Option<Duration>,
    start_hook: Option<StartHook>,
    started: AtomicBool,
    start_calls: AtomicUsize,
}

impl PluginModule {
    pub fn new(id: &str) -> Self {
        Self {
            id: ModuleID::from(id),
            services: Vec::new(),
            registers_factories: true,
            fail_start: false,
            start_delay: None,
            start_hook: None,
            started: AtomicBool::new(false),
            start_calls: AtomicUsize::new(0),
        }
    }

    /// Module providing every service of a catalog declaration.
    pub fn from_declaration(declaration: &ModuleDeclaration) -> Arc<Self> {
        let mut module = Self::new(declaration.id.as_str());
        module.services = declaration.services.clone();
        module.build()
    }

    pub fn with_service(mut self, implementation: &str, service_type: &str, objects: &[&str]) -> Self {
        let mut declaration = ServiceDeclaration::new(implementation, service_type);
        for object in objects {
            declaration = declaration.with_object(*object);
        }
        self.services.push(declaration);
        self
    }

    /// Start succeeds but registers nothing.
    pub fn without_registration(mut self) -> Self {
        self.registers_factories = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Make start slow enough for concurrent callers to pile up.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// Run `hook` inside start, before factories are registered.
    pub fn with_start_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ServiceRegistry) + Send + Sync + 'static,
    {
        self.start_hook = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn descriptor(self: &Arc<Self>) -> ModuleDescriptor {
        let mut descriptor = ModuleDescriptor::new(Arc::clone(self) as Arc<dyn ModuleHandle>);
        for service in &self.services {
            descriptor = descriptor.with_service(service.clone());
        }
        descriptor
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }
}

impl ModuleHandle for PluginModule {
    fn id(&self) -> &ModuleID {
        &self.id
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn start(&self, registry: &ServiceRegistry) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.start_delay {
            thread::sleep(delay);
        }
        if self.fail_start {
            return Err(Error::Internal(format!("module '{}' could not be loaded", self.id)));
        }
        if let Some(hook) = &self.start_hook {
            hook(registry);
        }

        if self.registers_factories {
            for service in &self.services {
                registry.add_service_factory(
                    RecordingService::factory(service.implementation.as_str()),
                    service.implementation.clone(),
                    service.service_type.clone(),
                );
                for object in &service.objects {
                    registry.add_object_factory(service.implementation.clone(), object.clone());
                }
            }
        }

        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }
}
