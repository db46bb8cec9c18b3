//! Per-component mutual exclusion for package actions.
//!
//! At most one action (install, uninstall, ...) may be in flight for a
//! component. [`ComponentLocks::lock`] registers the action and returns a
//! guard; dropping the guard removes the registration.
//!
//! # Example
//!
//! ```
//! use artifact_core::lock::{ComponentLocks, LockError};
//!
//! let locks = ComponentLocks::new();
//! let guard = locks.lock("agent", "install").unwrap();
//! assert!(matches!(locks.lock("agent", "uninstall"), Err(LockError::InProgress { .. })));
//! drop(guard);
//! assert!(locks.lock("agent", "uninstall").is_ok());
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tracing::debug;

/// Lock acquisition failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// A different action is already running for the component.
    #[error("{component}: {running} already in progress, cannot {requested}")]
    InProgress {
        /// Component name.
        component: String,
        /// Registered action.
        running: String,
        /// Rejected action.
        requested: String,
    },
}

/// Registry of in-flight actions, keyed by component name.
///
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct ComponentLocks {
    in_flight: Arc<DashMap<String, String>>,
}

impl ComponentLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` for `component`.
    ///
    /// Registering the action already in flight succeeds again; each guard
    /// removes the registration when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InProgress`] if a different action is registered.
    pub fn lock(&self, component: &str, action: &str) -> Result<ComponentLockGuard, LockError> {
        match self.in_flight.entry(component.to_string()) {
            Entry::Occupied(entry) if entry.get() != action => {
                return Err(LockError::InProgress {
                    component: component.to_string(),
                    running: entry.get().clone(),
                    requested: action.to_string(),
                });
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(entry) => {
                entry.insert(action.to_string());
            }
        }
        debug!(component, action, "component locked");
        Ok(ComponentLockGuard {
            in_flight: Arc::clone(&self.in_flight),
            component: component.to_string(),
        })
    }

    /// Action currently registered for `component`.
    #[must_use]
    pub fn current_action(&self, component: &str) -> Option<String> {
        self.in_flight.get(component).map(|entry| entry.value().clone())
    }
}

/// Releases a component on drop.
#[derive(Debug)]
#[must_use = "the component is unlocked when the guard is dropped"]
pub struct ComponentLockGuard {
    in_flight: Arc<DashMap<String, String>>,
    component: String,
}

impl ComponentLockGuard {
    /// The locked component.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }
}

impl Drop for ComponentLockGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.component);
        debug!(component = %self.component, "component unlocked");
    }
}
