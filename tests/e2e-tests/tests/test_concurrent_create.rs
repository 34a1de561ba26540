//! Test Scenario 2: Concurrent First Create
//!
//! Many threads racing to create services of a module that is not loaded yet
//! must all succeed, and the module must be started exactly once.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use e2e_tests::assertions::{assert_built_by, assert_started_once};
use e2e_tests::{registry_with_modules, PluginModule, RecordingWorker};

const THREADS: usize = 8;

#[test]
fn test_concurrent_first_create_starts_module_once() {
    let vtk = PluginModule::new("io_vtk")
        .with_service("Writer.VTK", "IWriter", &["Object"])
        .with_service("Writer.VTKImage", "IWriter", &["Image"])
        .with_start_delay(Duration::from_millis(50))
        .build();
    let registry = Arc::new(registry_with_modules(RecordingWorker::new("main"), &[Arc::clone(&vtk)]));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let implementation = if i % 2 == 0 { "Writer.VTK" } else { "Writer.VTKImage" };
                barrier.wait();
                let handle = registry.create(implementation).unwrap();
                assert_built_by(&handle, implementation, "main").unwrap();
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_started_once(&vtk).unwrap();
    let stats = registry.stats();
    assert_eq!(stats.module_loads, 1);
    assert_eq!(stats.services_created, THREADS as u64);
}

#[test]
fn test_support_queries_race_with_late_registration() {
    let registry = Arc::new(registry_with_modules(RecordingWorker::new("main"), &[]));
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let readers: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..100 {
                    registry.support("Mesh", "IWriter");
                }
            })
        })
        .collect();

    barrier.wait();
    registry.add_service_factory(
        e2e_tests::RecordingService::factory("Writer.Late"),
        "Writer.Late",
        "IWriter",
    );
    registry.add_object_factory("Writer.Late", "Mesh");

    for reader in readers {
        reader.join().unwrap();
    }

    // Whatever the readers cached, the registration must now be visible.
    assert!(registry.support("Mesh", "IWriter"));
    assert!(registry.create("Writer.Late").is_ok());
}
