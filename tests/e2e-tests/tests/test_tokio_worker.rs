//! Test Scenario 4: Tokio Worker Binding
//!
//! Services created by a registry bound to a Tokio runtime post their work
//! onto that runtime.

use std::sync::Arc;

use e2e_tests::{registry_with_modules, PluginModule};
use hsu_service_factory::{TokioWorker, Worker};
use tokio::sync::oneshot;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_services_post_to_tokio_runtime() {
    let vtk = PluginModule::new("io_vtk")
        .with_service("Writer.VTK", "IWriter", &["Object"])
        .build();
    let worker: Arc<dyn Worker> = Arc::new(TokioWorker::current("tokio-io"));
    let registry = registry_with_modules(worker, &[Arc::clone(&vtk)]);

    let handle = registry.create("Writer.VTK").unwrap();
    let bound = handle.worker().unwrap();
    assert_eq!(bound.name(), "tokio-io");

    let (tx, rx) = oneshot::channel();
    bound.post(Box::new(move || {
        let _ = tx.send(std::thread::current().name().map(str::to_string));
    }));

    let thread_name = rx.await.unwrap();
    assert!(thread_name.is_some());
    assert_eq!(vtk.start_calls(), 1);
}

#[tokio::test]
async fn test_every_service_shares_the_registry_worker() {
    let vtk = PluginModule::new("io_vtk")
        .with_service("Writer.VTK", "IWriter", &["Object"])
        .with_service("Reader.VTK", "IReader", &["Object"])
        .build();
    let worker: Arc<dyn Worker> = Arc::new(TokioWorker::current("tokio-io"));
    let registry = registry_with_modules(Arc::clone(&worker), &[Arc::clone(&vtk)]);

    let writer = registry.create("Writer.VTK").unwrap();
    let reader = registry.create("Reader.VTK").unwrap();

    assert!(Arc::ptr_eq(&writer.worker().unwrap(), &worker));
    assert!(Arc::ptr_eq(&reader.worker().unwrap(), &registry.default_worker()));
}
