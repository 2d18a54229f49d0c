//! Opt-in, scoped access to one manager for hosts that cannot pass the
//! instance around (inline toolbar scripts and the like).
//!
//! Nothing is installed implicitly. The host installs its session's
//! manager and keeps the returned guard alive for as long as the accessor
//! should resolve; dropping the guard restores whatever was installed before.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use thiserror::Error;

use super::manager::ComponentManager;

thread_local! {
    static INSTALLED: RefCell<Option<Weak<RefCell<ComponentManager>>>> = const { RefCell::new(None) };
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAccessError {
    #[error("no component manager is installed")]
    NotInstalled,
    #[error("the installed component manager is already borrowed")]
    Busy,
}

/// Keeps a manager installed; uninstalls it on drop.
#[must_use = "the manager is uninstalled as soon as the guard is dropped"]
#[derive(Debug)]
pub struct GlobalGuard {
    previous: Option<Weak<RefCell<ComponentManager>>>,
}

impl Drop for GlobalGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        INSTALLED.with(|installed| *installed.borrow_mut() = previous);
    }
}

/// Make `manager` reachable through [`with_global`] on this thread.
///
/// Only a weak handle is kept: the accessor never extends the session's
/// lifetime.
pub fn install_global(manager: &Rc<RefCell<ComponentManager>>) -> GlobalGuard {
    let previous = INSTALLED.with(|installed| installed.borrow_mut().replace(Rc::downgrade(manager)));
    GlobalGuard { previous }
}

/// Run `f` against the installed manager.
///
/// Fails with [`GlobalAccessError::Busy`] when called while the manager is
/// already borrowed, e.g. from inside one of its own change listeners.
pub fn with_global<R>(f: impl FnOnce(&mut ComponentManager) -> R) -> Result<R, GlobalAccessError> {
    let manager = INSTALLED
        .with(|installed| installed.borrow().as_ref().and_then(Weak::upgrade))
        .ok_or(GlobalAccessError::NotInstalled)?;
    let mut manager = manager
        .try_borrow_mut()
        .map_err(|_| GlobalAccessError::Busy)?;
    Ok(f(&mut manager))
}
