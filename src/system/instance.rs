// src/system/instance.rs
//! Process-wide `System` slot for the application boundary.
//!
//! Library code takes a `&System` or `&mut System` explicitly. This module
//! only exists so the outermost layer can reach the one instance without
//! threading it through every call. At most one instance exists per process;
//! it lives on the thread that created it and is reachable only there.

use super::System;
use crate::config::SystemConfig;
use crate::display::driver::PlatformDriver;
use crate::error::{Result, SystemError};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

static ACTIVE: AtomicBool = AtomicBool::new(false);

thread_local! {
    static INSTANCE: RefCell<Option<System>> = const { RefCell::new(None) };
    // Set when a guard is released while `with_instance` holds the slot.
    static RELEASE_PENDING: Cell<bool> = const { Cell::new(false) };
}

/// Creates the process-wide `System`.
///
/// Fails with `AlreadyCreated` while another instance is live, including one
/// owned by a different thread. Once the returned guard is disposed or
/// dropped a new instance may be created.
pub fn create_system(config: SystemConfig, driver: Box<dyn PlatformDriver>) -> Result<SystemGuard> {
    if ACTIVE
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return Err(SystemError::AlreadyCreated);
    }
    let system = match System::new(config, driver) {
        Ok(system) => system,
        Err(e) => {
            ACTIVE.store(false, Ordering::Release);
            return Err(e);
        }
    };
    INSTANCE.with(|slot| *slot.borrow_mut() = Some(system));
    info!("System: global instance created");
    Ok(SystemGuard {
        released: false,
        _thread_bound: PhantomData,
    })
}

/// Runs `f` against the live instance.
///
/// Fails with `NoInstance` before creation, after disposal or from another
/// thread, and with `InstanceBusy` when called from inside another
/// `with_instance`.
///
/// A guard released inside `f` takes effect once `f` returns.
pub fn with_instance<R>(f: impl FnOnce(&mut System) -> R) -> Result<R> {
    let result = INSTANCE.with(|slot| {
        let mut slot = slot.try_borrow_mut().map_err(|_| SystemError::InstanceBusy)?;
        let system = slot.as_mut().ok_or(SystemError::NoInstance)?;
        Ok(f(system))
    });
    if RELEASE_PENDING.with(|pending| pending.replace(false)) {
        if let Err(e) = release_instance() {
            warn!("System: deferred release of the global instance failed: {}", e);
        }
    }
    result
}

/// Empties the slot and disposes the instance, or defers both while the slot
/// is borrowed.
fn release_instance() -> Result<()> {
    let taken = INSTANCE.with(|slot| slot.try_borrow_mut().map(|mut slot| slot.take()));
    let Ok(system) = taken else {
        debug!("System: global instance in use, release deferred");
        RELEASE_PENDING.with(|pending| pending.set(true));
        return Ok(());
    };
    ACTIVE.store(false, Ordering::Release);
    info!("System: global instance released");
    match system {
        Some(mut system) => system.dispose(),
        None => Ok(()),
    }
}

/// Whether a live instance is reachable from this thread.
pub fn instance_exists() -> bool {
    INSTANCE.with(|slot| {
        slot.try_borrow()
            .map(|system| system.is_some())
            .unwrap_or(true)
    })
}

/// Scoped ownership of the process-wide instance.
///
/// Disposal runs when the guard is dropped, so early returns and `?` still
/// release native resources. Call `dispose` to observe disposal errors.
#[must_use = "dropping the guard disposes the System"]
pub struct SystemGuard {
    released: bool,
    _thread_bound: PhantomData<Rc<()>>,
}

impl SystemGuard {
    /// Disposes the instance and frees the slot.
    ///
    /// Called from inside `with_instance`, disposal is deferred until the
    /// closure returns and its errors are only logged.
    pub fn dispose(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        release_instance()
    }
}

impl Drop for SystemGuard {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("System: releasing the global instance failed: {}", e);
        }
    }
}
