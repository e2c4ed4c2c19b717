//! Pin registration and pipeline lifecycle
//!
//! The [`PinRegistry`] owns every per-pin pipeline: a bounded slot table
//! keyed by validated pin id, where each live slot holds the pin's state,
//! its chip handle, and its installed trigger. Registration acquires the
//! chip resources in order (acquire, input mode, attach, expose) and
//! unwinds the acquired prefix in reverse on any failure, so a failed
//! `register` never leaks. Unregistration detaches the trigger strictly
//! before tearing anything down: the quiescence point after which no
//! producer invocation for that pin can still start.
//!
//! Registration and unregistration of any pin are serialized by the slot
//! table lock, which is also held across the chip calls; two callers can
//! never race a pin through partial setup and teardown.

use super::chip::{CaptureStats, EdgeHandler, GpioBackend, StatsSnapshot};
use super::drain::{self, DrainPage, DrainWait};
use super::hub::{DrainFn, ReadHub};
use super::producer;
use super::queue::BoundedRecordQueue;
use crate::clock::MonotonicClock;
use crate::config::CaptureConfig;
use crate::error::{EdgeTraceError, Result};
use crate::types::{ActiveBuffer, EdgePolicy, PinHandle, PinId, TriggerId};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-pin capture state, shared between the producer handler and drains
///
/// The active buffer belongs to the producer path; the queue is the only
/// state both sides touch, under the pin's queue lock. `last_event_micros`
/// starts at the registration timestamp, so the first interval a pin ever
/// reports measures registration-to-first-edge rather than edge-to-edge.
/// That is an explicit contract, not a bug.
pub struct PinState {
    pub(crate) pin: PinId,
    pub(crate) record_capacity: usize,
    pub(crate) last_event_micros: AtomicU64,
    pub(crate) active: Mutex<ActiveBuffer>,
    pub(crate) queue: Mutex<BoundedRecordQueue>,
}

impl PinState {
    pub(crate) fn new(
        pin: PinId,
        record_capacity: usize,
        queue_capacity: usize,
        registered_at_micros: u64,
    ) -> Result<Self> {
        Ok(Self {
            pin,
            record_capacity,
            last_event_micros: AtomicU64::new(registered_at_micros),
            active: Mutex::new(ActiveBuffer::new(record_capacity)?),
            queue: Mutex::new(BoundedRecordQueue::new(queue_capacity)),
        })
    }

    /// The pin this state belongs to
    pub fn pin(&self) -> PinId {
        self.pin
    }
}

/// One live slot in the registry table
struct PinSlot {
    state: Arc<PinState>,
    handle: PinHandle,
    trigger: TriggerId,
}

/// Maps pin ids to live capture pipelines and owns their whole lifecycle
pub struct PinRegistry {
    config: CaptureConfig,
    chip: Arc<dyn GpioBackend>,
    clock: Arc<dyn MonotonicClock>,
    hub: Arc<ReadHub>,
    stats: Arc<CaptureStats>,
    slots: Mutex<Vec<Option<PinSlot>>>,
}

impl PinRegistry {
    /// Create a registry over `chip` with `config.max_pins` slots
    pub fn new(
        config: CaptureConfig,
        chip: Arc<dyn GpioBackend>,
        clock: Arc<dyn MonotonicClock>,
    ) -> Result<Self> {
        config.validate()?;
        let slots = (0..config.max_pins).map(|_| None).collect();
        Ok(Self {
            config,
            chip,
            clock,
            hub: Arc::new(ReadHub::new()),
            stats: Arc::new(CaptureStats::new()),
            slots: Mutex::new(slots),
        })
    }

    // Slot-table mutations are completed before any fallible call returns,
    // so a poisoned lock is recovered rather than propagated.
    fn lock_slots(&self) -> MutexGuard<'_, Vec<Option<PinSlot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Range-validate a pin id; the single gate shared by register,
    /// unregister, and drain
    fn gate(&self, pin: PinId) -> Result<usize> {
        let idx = pin.index();
        if idx >= self.config.max_pins {
            return Err(EdgeTraceError::OutOfRange {
                pin,
                max: self.config.max_pins,
            });
        }
        Ok(idx)
    }

    /// Register `pin`: acquire it from the chip, install the edge trigger,
    /// and expose its read resource
    ///
    /// Fails with [`EdgeTraceError::OutOfRange`] or
    /// [`EdgeTraceError::AlreadyRegistered`] before touching the chip. Any
    /// later failure unwinds the already-acquired sub-resources in reverse
    /// order before returning.
    pub fn register(&self, pin: PinId) -> Result<()> {
        let idx = self.gate(pin)?;
        let mut slots = self.lock_slots();
        if slots[idx].is_some() {
            return Err(EdgeTraceError::AlreadyRegistered(pin));
        }

        let handle = self.chip.acquire(pin)?;
        if let Err(e) = self.chip.set_input_mode(handle) {
            self.chip.release(handle);
            return Err(e);
        }

        let state = match PinState::new(
            pin,
            self.config.record_capacity,
            self.config.queue_capacity,
            self.clock.now_micros(),
        ) {
            Ok(state) => Arc::new(state),
            Err(e) => {
                self.chip.release(handle);
                return Err(e);
            }
        };

        let handler: EdgeHandler = {
            let state = state.clone();
            let clock = self.clock.clone();
            let stats = self.stats.clone();
            Arc::new(move |_edge| producer::on_edge(&state, clock.as_ref(), &stats))
        };
        // Every edge is a measurement boundary, so the trigger always
        // reports both transitions.
        let trigger = match self.chip.attach(handle, EdgePolicy::Both, handler) {
            Ok(trigger) => trigger,
            Err(e) => {
                self.chip.release(handle);
                return Err(e);
            }
        };

        let drain_fn: DrainFn = {
            let state = state.clone();
            let stats = self.stats.clone();
            let page_bytes = self.config.drain_page_bytes;
            Arc::new(move |wait| drain::drain_page(&state, page_bytes, &stats, wait))
        };
        if let Err(e) = self.hub.expose(pin, drain_fn) {
            self.chip.detach(trigger);
            self.chip.release(handle);
            return Err(e);
        }

        slots[idx] = Some(PinSlot {
            state,
            handle,
            trigger,
        });
        tracing::info!(pin = %pin, "registered pin");
        Ok(())
    }

    /// Unregister `pin`, releasing every resource its pipeline owns
    ///
    /// Safe to call while edges are still firing: the trigger is detached
    /// before anything else, and the handler's own reference keeps the
    /// state alive until any in-flight invocation returns.
    pub fn unregister(&self, pin: PinId) -> Result<()> {
        let idx = self.gate(pin)?;
        let mut slots = self.lock_slots();
        let slot = slots[idx]
            .take()
            .ok_or(EdgeTraceError::NotRegistered(pin))?;
        self.teardown(pin, slot);
        Ok(())
    }

    fn teardown(&self, pin: PinId, slot: PinSlot) {
        // Detach first: the quiescence point. No new producer invocation
        // for this pin starts after detach returns.
        self.chip.detach(slot.trigger);
        self.hub.withdraw(pin);
        self.chip.release(slot.handle);
        // Dropping the slot frees the active buffer and every queued
        // record exactly once.
        tracing::info!(pin = %pin, "unregistered pin");
    }

    /// Unregister every currently-registered pin
    pub fn shutdown(&self) {
        let mut slots = self.lock_slots();
        let mut torn_down = 0usize;
        for idx in 0..slots.len() {
            if let Some(slot) = slots[idx].take() {
                self.teardown(PinId(idx as u32), slot);
                torn_down += 1;
            }
        }
        if torn_down > 0 {
            tracing::info!(pins = torn_down, "capture shutdown complete");
        }
    }

    /// Drain one page from `pin`'s queue, waiting for the lock if needed
    ///
    /// An unregistered (or out-of-range) pin yields [`DrainPage::Empty`],
    /// not an error: to a consumer, a pin with no pipeline and a pin with
    /// no data look the same.
    pub fn drain(&self, pin: PinId) -> DrainPage {
        self.drain_with(pin, &DrainWait::new())
    }

    /// Drain one page from `pin`'s queue within the limits of `wait`
    ///
    /// A timed-out or cancelled wait yields [`DrainPage::Busy`] with the
    /// pin's state unchanged; the caller retries. Unregistered pins yield
    /// [`DrainPage::Empty`] as with [`PinRegistry::drain`].
    pub fn drain_with(&self, pin: PinId, wait: &DrainWait) -> DrainPage {
        self.hub.read(pin, wait).unwrap_or(DrainPage::Empty)
    }

    /// The hub holding this registry's exposed read resources
    pub fn hub(&self) -> &Arc<ReadHub> {
        &self.hub
    }

    /// Snapshot of the pipeline counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether `pin` currently has a live pipeline
    pub fn is_registered(&self, pin: PinId) -> bool {
        self.gate(pin)
            .map(|idx| self.lock_slots()[idx].is_some())
            .unwrap_or(false)
    }

    /// Currently-registered pins, in id order
    pub fn registered_pins(&self) -> Vec<PinId> {
        self.lock_slots()
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|_| PinId(idx as u32)))
            .collect()
    }

    /// Number of currently-registered pins
    pub fn registered_count(&self) -> usize {
        self.lock_slots().iter().filter(|s| s.is_some()).count()
    }

    /// The configuration this registry was built with
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

impl Drop for PinRegistry {
    fn drop(&mut self) {
        // A dropped registry must not leak chip handles or exposed
        // resources.
        self.shutdown();
    }
}
