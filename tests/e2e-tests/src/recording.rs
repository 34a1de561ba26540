//! Services and workers that record what happened to them

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hsu_service_factory::{Service, Task, Worker};

/// Service built by plugin factories. Remembers which implementation built
/// it and the worker it was bound to.
pub struct RecordingService {
    label: String,
    worker: Option<Arc<dyn Worker>>,
}

impl RecordingService {
    /// Factory closure producing services labelled `label`.
    pub fn factory(label: impl Into<String>) -> impl Fn() -> Box<dyn Service> + Send + Sync + 'static {
        let label = label.into();
        move || {
            Box::new(RecordingService {
                label: label.clone(),
                worker: None,
            }) as Box<dyn Service>
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Service for RecordingService {
    fn bind_worker(&mut self, worker: Arc<dyn Worker>) {
        self.worker = Some(worker);
    }

    fn worker(&self) -> Option<Arc<dyn Worker>> {
        self.worker.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Worker running tasks inline while counting them.
pub struct RecordingWorker {
    name: String,
    posted: AtomicUsize,
}

impl RecordingWorker {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            posted: AtomicUsize::new(0),
        })
    }

    pub fn posted(&self) -> usize {
        self.posted.load(Ordering::SeqCst)
    }
}

impl Worker for RecordingWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn post(&self, task: Task) {
        self.posted.fetch_add(1, Ordering::SeqCst);
        task();
    }
}
