//! Single-flight module loading.
//!
//! Each module gets a one-shot cell. The first `create()` that needs the
//! module runs its start routine inside the cell's initializer; concurrent
//! callers for any implementation of the same module block on the cell and
//! observe the same outcome, so a module is started at most once.
//!
//! A failed start leaves the cell empty and a later `create()` may try again.
//!
//! # Rust Learning Note
//!
//! `OnceCell::get_or_try_init` blocks other threads while one initializer
//! runs, but re-entering the *same* cell from the initializing thread would
//! deadlock. A thread-local stack of modules currently starting on this
//! thread turns that case into a clear panic.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use hsu_common::{FactoryResult, ModuleID};

/// A module starting on this thread, scoped to the `ModuleLoads` that
/// started it (two registries may host modules with the same id).
type StartingKey = (usize, ModuleID);

thread_local! {
    static STARTING: RefCell<Vec<StartingKey>> = RefCell::new(Vec::new());
}

/// Marks a module as starting on the current thread until dropped.
struct StartingGuard;

impl StartingGuard {
    fn enter(key: StartingKey) -> Self {
        STARTING.with(|starting| starting.borrow_mut().push(key));
        StartingGuard
    }
}

impl Drop for StartingGuard {
    fn drop(&mut self) {
        STARTING.with(|starting| {
            starting.borrow_mut().pop();
        });
    }
}

fn is_starting_on_this_thread(key: &StartingKey) -> bool {
    STARTING.with(|starting| starting.borrow().contains(key))
}

#[derive(Debug, Default)]
pub(crate) struct ModuleLoads {
    cells: Mutex<HashMap<ModuleID, Arc<OnceCell<()>>>>,
}

impl ModuleLoads {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns true once `module` has been started successfully through
    /// this registry.
    pub(crate) fn is_loaded(&self, module: &ModuleID) -> bool {
        self.cells
            .lock()
            .get(module)
            .map_or(false, |cell| cell.get().is_some())
    }

    /// Runs `start` for `module` unless it already ran successfully.
    ///
    /// Returns `Ok(true)` if this call performed the start, `Ok(false)` if
    /// another call did (possibly while this one was waiting).
    ///
    /// # Panics
    /// Panics if the current thread is already inside `start` for the same
    /// module.
    pub(crate) fn load_once<F>(&self, module: &ModuleID, start: F) -> FactoryResult<bool>
    where
        F: FnOnce() -> FactoryResult<()>,
    {
        let cell = {
            let mut cells = self.cells.lock();
            Arc::clone(cells.entry(module.clone()).or_default())
        };

        if cell.get().is_some() {
            return Ok(false);
        }

        let key = (self.instance_key(), module.clone());
        assert!(
            !is_starting_on_this_thread(&key),
            "Module '{}' requested one of its own services while starting",
            module
        );

        let mut performed = false;
        cell.get_or_try_init(|| {
            let _guard = StartingGuard::enter(key);
            performed = true;
            start()
        })?;
        Ok(performed)
    }

    /// Identifies this instance while it is borrowed by a running start.
    fn instance_key(&self) -> usize {
        self as *const Self as usize
    }

    pub(crate) fn clear(&self) {
        self.cells.lock().clear();
    }
}
