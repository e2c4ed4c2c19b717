//! Simulated GPIO chip for testing and demos
//!
//! [`MockGpioBackend`] implements [`GpioBackend`] with no hardware behind
//! it: tests acquire pins, attach triggers, and then inject edges with
//! [`MockGpioBackend::fire_edge`] or [`MockGpioBackend::pulse_train`]. The
//! chip tracks every outstanding handle and trigger, so lifecycle tests can
//! assert that registration and unregistration leave nothing behind, and it
//! can be told to fail the next acquire or attach for a pin to exercise the
//! registry's unwinding paths.
//!
//! [`EdgePump`] feeds edges through a bounded channel into a dispatcher
//! thread, which is how the stress tests run a producer context
//! concurrently with drains. Edges pushed while the channel is full are
//! dropped and counted, never blocked on.
//!
//! # Enabling
//!
//! Available with the `mock-gpio` feature (on by default):
//!
//! ```bash
//! cargo test --features mock-gpio
//! ```

use super::chip::{EdgeHandler, GpioBackend};
use crate::clock::ManualClock;
use crate::error::{EdgeTraceError, Result};
use crate::types::{Edge, EdgePolicy, PinHandle, PinId, TriggerId};
use crossbeam_channel::{bounded, Sender};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

/// An acquired pin's chip-side bookkeeping
struct AcquiredPin {
    pin: PinId,
    input_mode: bool,
}

/// An installed trigger's chip-side bookkeeping
struct Trigger {
    pin: PinId,
    policy: EdgePolicy,
    handler: EdgeHandler,
}

#[derive(Default)]
struct ChipInner {
    next_id: u64,
    acquired: HashMap<u64, AcquiredPin>,
    busy_pins: HashSet<PinId>,
    triggers: HashMap<u64, Trigger>,
    fail_acquire: HashSet<PinId>,
    fail_attach: HashSet<PinId>,
}

/// A GPIO chip with no hardware behind it
#[derive(Default)]
pub struct MockGpioBackend {
    inner: Mutex<ChipInner>,
}

impl MockGpioBackend {
    /// Create a chip with no pins acquired
    pub fn new() -> Self {
        Self::default()
    }

    // Bookkeeping updates are completed before any handler runs, so a
    // poisoned lock is recovered rather than propagated.
    fn inner(&self) -> MutexGuard<'_, ChipInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `acquire` of `pin` fail (one-shot)
    pub fn fail_next_acquire(&self, pin: PinId) {
        self.inner().fail_acquire.insert(pin);
    }

    /// Make the next `attach` on `pin` fail (one-shot)
    pub fn fail_next_attach(&self, pin: PinId) {
        self.inner().fail_attach.insert(pin);
    }

    /// Number of pins currently acquired
    pub fn acquired_count(&self) -> usize {
        self.inner().acquired.len()
    }

    /// Number of triggers currently installed
    pub fn attached_count(&self) -> usize {
        self.inner().triggers.len()
    }

    /// Deliver one edge on `pin` to its trigger, if one is installed and
    /// its policy matches
    ///
    /// The handler runs on the calling thread, outside the chip lock:
    /// the mock equivalent of a handler running in trigger context.
    /// Returns whether a handler fired.
    pub fn fire_edge(&self, pin: PinId, edge: Edge) -> bool {
        let handler = {
            let inner = self.inner();
            inner
                .triggers
                .values()
                .find(|t| t.pin == pin && t.policy.matches(edge))
                .map(|t| t.handler.clone())
        };
        match handler {
            Some(handler) => {
                handler(edge);
                true
            }
            None => false,
        }
    }

    /// Fire a train of alternating edges on `pin`, advancing `clock` by
    /// each interval first
    ///
    /// Starts with a rising edge. `intervals[i]` becomes the measured gap
    /// before edge `i`.
    pub fn pulse_train(&self, pin: PinId, clock: &ManualClock, intervals: &[u64]) {
        let mut edge = Edge::Rising;
        for &interval in intervals {
            clock.advance(interval);
            self.fire_edge(pin, edge);
            edge = edge.toggled();
        }
    }
}

impl GpioBackend for MockGpioBackend {
    fn acquire(&self, pin: PinId) -> Result<PinHandle> {
        let mut inner = self.inner();
        if inner.fail_acquire.remove(&pin) {
            return Err(EdgeTraceError::AcquireFailed {
                pin,
                reason: "injected failure".into(),
            });
        }
        if !inner.busy_pins.insert(pin) {
            return Err(EdgeTraceError::AcquireFailed {
                pin,
                reason: "pin is busy".into(),
            });
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.acquired.insert(
            id,
            AcquiredPin {
                pin,
                input_mode: false,
            },
        );
        Ok(PinHandle(id))
    }

    fn set_input_mode(&self, handle: PinHandle) -> Result<()> {
        let mut inner = self.inner();
        match inner.acquired.get_mut(&handle.0) {
            Some(acquired) => {
                acquired.input_mode = true;
                Ok(())
            }
            None => Err(EdgeTraceError::Config(format!(
                "set_input_mode on unknown handle {}",
                handle.0
            ))),
        }
    }

    fn attach(
        &self,
        handle: PinHandle,
        policy: EdgePolicy,
        handler: EdgeHandler,
    ) -> Result<TriggerId> {
        let mut inner = self.inner();
        let (pin, input_mode) = match inner.acquired.get(&handle.0) {
            Some(acquired) => (acquired.pin, acquired.input_mode),
            None => {
                return Err(EdgeTraceError::Config(format!(
                    "attach on unknown handle {}",
                    handle.0
                )))
            }
        };
        if inner.fail_attach.remove(&pin) {
            return Err(EdgeTraceError::AttachFailed {
                pin,
                reason: "injected failure".into(),
            });
        }
        if !input_mode {
            return Err(EdgeTraceError::AttachFailed {
                pin,
                reason: "pin is not in input mode".into(),
            });
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.triggers.insert(
            id,
            Trigger {
                pin,
                policy,
                handler,
            },
        );
        Ok(TriggerId(id))
    }

    fn detach(&self, trigger: TriggerId) {
        self.inner().triggers.remove(&trigger.0);
    }

    fn release(&self, handle: PinHandle) {
        let mut inner = self.inner();
        if let Some(acquired) = inner.acquired.remove(&handle.0) {
            inner.busy_pins.remove(&acquired.pin);
        }
    }
}

/// Feeds edges to a [`MockGpioBackend`] from a dedicated dispatcher thread
///
/// Pushing is non-blocking: edges that do not fit in the bounded channel
/// are dropped and counted, mirroring how a saturated producer context
/// sheds load. All edges pushed through one pump are dispatched serially,
/// which is exactly the per-line ordering a real trigger guarantees.
pub struct EdgePump {
    tx: Option<Sender<(PinId, Edge)>>,
    worker: Option<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl EdgePump {
    /// Spawn a dispatcher over `chip` with room for `capacity` queued edges
    pub fn spawn(chip: Arc<MockGpioBackend>, capacity: usize) -> Self {
        let (tx, rx) = bounded::<(PinId, Edge)>(capacity);
        let worker = std::thread::spawn(move || {
            for (pin, edge) in rx {
                chip.fire_edge(pin, edge);
            }
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue one edge for dispatch; returns false (and counts) if the
    /// channel is full or the pump is closed
    pub fn push(&self, pin: PinId, edge: Edge) -> bool {
        let sent = self
            .tx
            .as_ref()
            .is_some_and(|tx| tx.try_send((pin, edge)).is_ok());
        if !sent {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        sent
    }

    /// Edges dropped because the channel was full
    pub fn dropped_edges(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Dispatch everything queued, then stop the dispatcher thread
    pub fn close(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for EdgePump {
    fn drop(&mut self) {
        self.close();
    }
}
