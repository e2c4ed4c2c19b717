//! The per-edge producer path
//!
//! [`on_edge`] runs once per observed edge, in whatever context the GPIO
//! backend delivers its callbacks from. That context is latency-sensitive:
//! the function never blocks, never allocates except at a rotation
//! boundary, and recovers every failure locally, since there is no caller
//! to propagate an error to. Losses are counted in [`CaptureStats`] and, for
//! allocation failure, reported through `tracing` exactly once.
//!
//! One pin's edges are delivered strictly serially (a line cannot fire two
//! edges at once), so the attempt-only locks below are uncontended in
//! steady state. Contention only appears when a consumer is mid-drain on
//! the queue, in which case the rotation is dropped and counted as an
//! overflow-equivalent loss rather than stalling the handler.

use super::chip::CaptureStats;
use super::registry::PinState;
use crate::clock::MonotonicClock;
use crate::types::ActiveBuffer;
use std::sync::atomic::Ordering;

/// Record one edge on `state`'s pin: measure the interval since the
/// previous edge, append it, and rotate a full buffer into the queue.
///
/// The first invocation after registration measures against the
/// registration timestamp, not a prior edge; that first interval is a
/// documented artifact of the contract, not a true inter-edge measurement.
pub(crate) fn on_edge(state: &PinState, clock: &dyn MonotonicClock, stats: &CaptureStats) {
    stats.record_edge();

    let now = clock.now_micros();
    let prev = state.last_event_micros.swap(now, Ordering::Relaxed);
    let interval = now.saturating_sub(prev);

    // Steady-state this lock is uncontended; losing the attempt means
    // teardown or a racing context owns the buffer, and this single event
    // is dropped.
    let Ok(mut active) = state.active.try_lock() else {
        stats.record_contended_event();
        return;
    };
    active.push(interval);
    if !active.is_full() {
        return;
    }

    // Rotation: allocate the replacement before freezing, so a failed
    // allocation leaves the pin with its (cleared) buffer and the pipeline
    // intact. The filled measurements are lost, the process is not.
    let fresh = match ActiveBuffer::new(state.record_capacity) {
        Ok(buf) => buf,
        Err(_) => {
            if stats.record_alloc_failure() {
                tracing::error!(
                    pin = %state.pin,
                    "active buffer allocation failed, dropping current measurements"
                );
            }
            active.reset();
            return;
        }
    };
    let record = active.complete(fresh);
    drop(active);

    match state.queue.try_lock() {
        Ok(mut queue) => {
            let evicted = queue.append(record);
            drop(queue);
            stats.record_rotation();
            if evicted.is_some() {
                stats.record_eviction();
            }
            // `evicted` is freed here, outside the lock.
        }
        Err(_) => {
            stats.record_rotation_drop();
        }
    }
}
