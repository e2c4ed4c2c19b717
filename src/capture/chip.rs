//! GPIO chip collaborator contract and capture statistics
//!
//! [`GpioBackend`] is the seam between the capture pipeline and whatever
//! actually owns the pins: a character-device chip driver in production, a
//! simulated chip in tests (see [`crate::capture::MockGpioBackend`]).
//! Implementations must be `Send + Sync`; edge handlers may be invoked from
//! any thread, but one pin's edges are delivered strictly serially.
//!
//! [`CaptureStats`] is the pipeline's observability channel. The producer
//! path runs in a latency-sensitive handler context where errors have no
//! caller to propagate to, so every locally-recovered loss (overflow
//! eviction, contended rotation, failed allocation) lands in a counter here
//! instead.

use crate::error::Result;
use crate::types::{Edge, EdgePolicy, PinHandle, PinId, TriggerId};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Callback invoked once per observed edge on an attached pin
pub type EdgeHandler = Arc<dyn Fn(Edge) + Send + Sync>;

/// Interface to the hardware that owns physical pins and edge triggers
///
/// The contract follows the lifecycle the registry enforces: `acquire` then
/// `set_input_mode` then `attach`; teardown is `detach` then `release`.
/// After `detach` returns, no new invocation of the trigger's handler
/// starts; that is the quiescence point unregistration relies on.
pub trait GpioBackend: Send + Sync {
    /// Take ownership of a physical pin
    fn acquire(&self, pin: PinId) -> Result<PinHandle>;

    /// Put an acquired pin into input mode
    fn set_input_mode(&self, handle: PinHandle) -> Result<()>;

    /// Install an edge trigger; `handler` fires once per matching edge
    fn attach(&self, handle: PinHandle, policy: EdgePolicy, handler: EdgeHandler)
        -> Result<TriggerId>;

    /// Remove an edge trigger; no handler invocation starts after this returns
    fn detach(&self, trigger: TriggerId);

    /// Return a pin to the chip
    fn release(&self, handle: PinHandle);
}

/// Pipeline counters, updated lock-free from producer and consumer contexts
///
/// All counters are monotonic; read them via [`CaptureStats::snapshot`].
#[derive(Debug, Default)]
pub struct CaptureStats {
    edges_seen: AtomicU64,
    records_completed: AtomicU64,
    records_evicted: AtomicU64,
    rotation_drops: AtomicU64,
    contended_events: AtomicU64,
    alloc_failures: AtomicU64,
    alloc_reported: AtomicBool,
    records_drained: AtomicU64,
    drains_empty: AtomicU64,
    pages_truncated: AtomicU64,
}

impl CaptureStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_edge(&self) {
        self.edges_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rotation(&self) {
        self.records_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.records_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rotation_drop(&self) {
        self.rotation_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_contended_event(&self) {
        self.contended_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed producer-side allocation; returns true only for the
    /// first failure so the caller can report it once
    pub(crate) fn record_alloc_failure(&self) -> bool {
        self.alloc_failures.fetch_add(1, Ordering::Relaxed);
        !self.alloc_reported.swap(true, Ordering::Relaxed)
    }

    pub(crate) fn record_drain(&self) {
        self.records_drained.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_empty_drain(&self) {
        self.drains_empty.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_truncation(&self) {
        self.pages_truncated.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            edges_seen: self.edges_seen.load(Ordering::Relaxed),
            records_completed: self.records_completed.load(Ordering::Relaxed),
            records_evicted: self.records_evicted.load(Ordering::Relaxed),
            rotation_drops: self.rotation_drops.load(Ordering::Relaxed),
            contended_events: self.contended_events.load(Ordering::Relaxed),
            alloc_failures: self.alloc_failures.load(Ordering::Relaxed),
            records_drained: self.records_drained.load(Ordering::Relaxed),
            drains_empty: self.drains_empty.load(Ordering::Relaxed),
            pages_truncated: self.pages_truncated.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`CaptureStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Edges delivered to the producer across all pins
    pub edges_seen: u64,
    /// Records that completed a rotation into a queue
    pub records_completed: u64,
    /// Records evicted by queue overflow (oldest-first)
    pub records_evicted: u64,
    /// Rotations dropped because the queue lock was contended
    pub rotation_drops: u64,
    /// Single events dropped because the active buffer was contended
    pub contended_events: u64,
    /// Producer-side allocation failures (rotation dropped, pipeline intact)
    pub alloc_failures: u64,
    /// Records popped and serialized by drains
    pub records_drained: u64,
    /// Drains that found the queue empty
    pub drains_empty: u64,
    /// Drained pages cut short by the page-size bound
    pub pages_truncated: u64,
}

impl StatsSnapshot {
    /// Records lost to the defined overflow policies (eviction plus
    /// contended rotations)
    pub fn records_lost(&self) -> u64 {
        self.records_evicted + self.rotation_drops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = CaptureStats::new();
        stats.record_edge();
        stats.record_edge();
        stats.record_rotation();
        stats.record_eviction();
        stats.record_rotation_drop();

        let snap = stats.snapshot();
        assert_eq!(snap.edges_seen, 2);
        assert_eq!(snap.records_completed, 1);
        assert_eq!(snap.records_lost(), 2);
    }

    #[test]
    fn test_alloc_failure_reported_once() {
        let stats = CaptureStats::new();
        assert!(stats.record_alloc_failure());
        assert!(!stats.record_alloc_failure());
        assert!(!stats.record_alloc_failure());
        assert_eq!(stats.snapshot().alloc_failures, 3);
    }
}
