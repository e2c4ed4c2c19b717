//! Per-pin read-resource exposure
//!
//! The [`ReadHub`] is the capability-scoped factory behind the "one
//! readable resource per registered pin" contract: registration exposes a
//! drain callback keyed by pin id, unregistration withdraws it, and the
//! exposure mechanism (a device node, an RPC endpoint, a test harness)
//! resolves a pin to its callback through [`ReadHub::read`]. Nothing here
//! knows how the resource is addressed externally, only which pins
//! currently have one.

use super::drain::{DrainPage, DrainWait};
use crate::error::{EdgeTraceError, Result};
use crate::types::PinId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Drain callback bound to one pin's pipeline
///
/// The caller's [`DrainWait`] flows through so a blocked read can be
/// bounded or cancelled end to end.
pub type DrainFn = Arc<dyn Fn(&DrainWait) -> DrainPage + Send + Sync>;

/// Registry of live drain callbacks, keyed by pin id
#[derive(Default)]
pub struct ReadHub {
    entries: Mutex<HashMap<PinId, DrainFn>>,
}

impl ReadHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    // The map operations below cannot leave the table inconsistent, so a
    // poisoned lock is recovered rather than propagated.
    fn entries(&self) -> MutexGuard<'_, HashMap<PinId, DrainFn>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Expose a read resource for `pin`
    ///
    /// Fails with [`EdgeTraceError::AlreadyRegistered`] if the pin already
    /// has one.
    pub fn expose(&self, pin: PinId, callback: DrainFn) -> Result<()> {
        let mut entries = self.entries();
        if entries.contains_key(&pin) {
            return Err(EdgeTraceError::AlreadyRegistered(pin));
        }
        entries.insert(pin, callback);
        Ok(())
    }

    /// Withdraw `pin`'s read resource; returns whether one existed
    pub fn withdraw(&self, pin: PinId) -> bool {
        self.entries().remove(&pin).is_some()
    }

    /// Invoke `pin`'s drain callback, or `None` if the pin is not exposed
    ///
    /// The callback runs outside the hub lock, so a slow drain never
    /// blocks exposure or withdrawal of other pins. `wait` bounds how long
    /// the drain may block on the pin's queue lock.
    pub fn read(&self, pin: PinId, wait: &DrainWait) -> Option<DrainPage> {
        let callback = self.entries().get(&pin).cloned()?;
        Some(callback(wait))
    }

    /// Number of currently exposed pins
    pub fn exposed_count(&self) -> usize {
        self.entries().len()
    }
}
