// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The single mutation point of a device state.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`StateObservers`] - Callbacks notified after every applied patch
//! - [`StateUpdater`] - Applies patches and notifies observers

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::StateError;

use super::{DeviceState, StateChange};

/// Unique identifier for a subscription.
///
/// Returned when registering an observer; pass it to
/// [`StateObservers::unsubscribe`] to remove the observer again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Type alias for state observers.
type StateCallback = Arc<dyn Fn(&DeviceState) + Send + Sync>;

/// Registry of callbacks notified with the new state after each patch.
///
/// Uses `parking_lot::RwLock` so observers can be added from another task
/// while the device keeps processing.
pub struct StateObservers {
    next_id: AtomicU64,
    callbacks: RwLock<HashMap<SubscriptionId, StateCallback>>,
}

impl StateObservers {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Registers an observer.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Removes an observer.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.write().remove(&id).is_some()
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Returns `true` if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }

    /// Calls every observer once with the given state.
    pub fn notify(&self, state: &DeviceState) {
        // Clone the callbacks so an observer may subscribe without deadlocking.
        let callbacks: Vec<StateCallback> = self.callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback(state);
        }
    }
}

impl Default for StateObservers {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateObservers")
            .field("count", &self.len())
            .finish()
    }
}

/// Applies patches to one device state.
///
/// The update function sees the current state and returns either a patch or
/// `None` for "no change". A patch is applied to a scratch copy and only
/// committed if it fits the state tree, so observers never see a half
/// applied patch.
pub struct StateUpdater<'a> {
    state: &'a mut DeviceState,
    observers: &'a StateObservers,
}

impl<'a> StateUpdater<'a> {
    pub(crate) fn new(state: &'a mut DeviceState, observers: &'a StateObservers) -> Self {
        Self { state, observers }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        self.state
    }

    /// Runs `f` once and applies the patch it returns.
    ///
    /// Returns `true` if a patch was applied, in which case every observer
    /// has been notified exactly once. Returns `false` when `f` returned
    /// `None` or the patch did not fit the state; observers are not called.
    pub fn update<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&DeviceState) -> Option<StateChange>,
    {
        let Some(change) = f(self.state) else {
            return false;
        };

        match self.commit(&change, || {}) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Rejected state patch");
                false
            }
        }
    }

    /// Applies a patch, running `effect` between validation and commit.
    ///
    /// `effect` only runs once the patch is known to fit, and observers are
    /// notified after it returns. Command handlers use this to publish the
    /// command built from the same snapshot that is committed.
    pub(crate) fn commit<E>(&mut self, change: &StateChange, effect: E) -> Result<(), StateError>
    where
        E: FnOnce(),
    {
        let mut next = self.state.clone();
        next.apply(change)?;
        effect();
        *self.state = next;

        tracing::trace!(changes = change.change_count(), "Applied state patch");
        self.observers.notify(self.state);
        Ok(())
    }
}
