//! Core data types for edgetrace
//!
//! This module contains the fundamental data structures used throughout the
//! capture pipeline: pin identifiers, edge descriptions, the opaque handles
//! returned by the GPIO collaborator, and the interval containers.
//!
//! # Main Types
//!
//! - [`PinId`] - Identifier for a digital input line
//! - [`Edge`] / [`EdgePolicy`] - Which transitions a trigger reports
//! - [`ActiveBuffer`] - The mutable, currently-filling interval sequence
//! - [`TimingRecord`] - An immutable, fully-formed batch of intervals
//!
//! # Ownership
//!
//! An [`ActiveBuffer`] is owned exclusively by its pin's producer path while
//! it fills; [`ActiveBuffer::complete`] freezes it into a [`TimingRecord`]
//! which is then owned by exactly one structure at a time (the queue while
//! buffered, the drain caller while serialized). Records are never cloned
//! and never partially written.

use crate::error::{EdgeTraceError, Result};
use std::fmt;
use std::str::FromStr;

/// Identifier for a digital input line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinId(pub u32);

impl PinId {
    /// The pin id as a slot index into the registry's bounded table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PinId {
    type Err = EdgeTraceError;

    /// Parse a pin id from control-plane input (e.g. a command argument).
    ///
    /// Accepts a trimmed ASCII decimal number; anything else fails with
    /// [`EdgeTraceError::InputParseFailed`] carrying the offending input.
    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EdgeTraceError::InputParseFailed(input.to_string()));
        }
        trimmed
            .parse::<u32>()
            .map(PinId)
            .map_err(|_| EdgeTraceError::InputParseFailed(input.to_string()))
    }
}

/// A single observed transition on a digital input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Low-to-high transition
    Rising,
    /// High-to-low transition
    Falling,
}

impl Edge {
    /// The opposite transition
    pub fn toggled(self) -> Edge {
        match self {
            Edge::Rising => Edge::Falling,
            Edge::Falling => Edge::Rising,
        }
    }
}

/// Which transitions an edge trigger reports
///
/// The capture pipeline always attaches with [`EdgePolicy::Both`] (every
/// edge is a measurement boundary); the narrower variants exist only for
/// the collaborator contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePolicy {
    /// Report rising and falling edges
    #[default]
    Both,
    /// Report only rising edges
    Rising,
    /// Report only falling edges
    Falling,
}

impl EdgePolicy {
    /// Whether a trigger with this policy reports the given edge
    pub fn matches(self, edge: Edge) -> bool {
        match self {
            EdgePolicy::Both => true,
            EdgePolicy::Rising => edge == Edge::Rising,
            EdgePolicy::Falling => edge == Edge::Falling,
        }
    }
}

/// Opaque handle to an acquired physical pin, issued by the GPIO chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinHandle(pub u64);

/// Opaque handle to an installed edge trigger, issued by the GPIO chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerId(pub u64);

/// An immutable, fully-formed batch of inter-edge intervals (microseconds)
///
/// Created when an [`ActiveBuffer`] reaches its fixed capacity; destroyed
/// when drained and serialized, evicted by overflow, or when its owning pin
/// is unregistered. Intervals are in strict chronological order.
#[derive(Debug, PartialEq, Eq)]
pub struct TimingRecord {
    intervals: Box<[u64]>,
}

impl TimingRecord {
    /// Build a record from an interval sequence (e.g. for replay or tests)
    pub fn new(intervals: Vec<u64>) -> Self {
        Self {
            intervals: intervals.into_boxed_slice(),
        }
    }

    /// The intervals, oldest first
    pub fn intervals(&self) -> &[u64] {
        &self.intervals
    }

    /// Number of intervals in this record
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the record holds no intervals
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

/// The mutable, currently-filling interval sequence for one pin
///
/// Bounded by the configured record capacity. Construction is fallible so
/// memory exhaustion during a producer rotation surfaces as
/// [`EdgeTraceError::AllocationFailed`] instead of aborting the process.
#[derive(Debug)]
pub struct ActiveBuffer {
    intervals: Vec<u64>,
    capacity: usize,
}

impl ActiveBuffer {
    /// Allocate an empty buffer for `capacity` intervals
    pub fn new(capacity: usize) -> Result<Self> {
        let mut intervals = Vec::new();
        intervals
            .try_reserve_exact(capacity)
            .map_err(|e| EdgeTraceError::AllocationFailed(e.to_string()))?;
        Ok(Self { intervals, capacity })
    }

    /// Append one interval; ignored if the buffer is already full
    pub fn push(&mut self, interval: u64) {
        if self.intervals.len() < self.capacity {
            self.intervals.push(interval);
        }
    }

    /// Whether the buffer has reached its fixed capacity
    pub fn is_full(&self) -> bool {
        self.intervals.len() == self.capacity
    }

    /// Number of intervals currently buffered
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the buffer holds no intervals
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Discard all buffered intervals, keeping the storage
    pub fn reset(&mut self) {
        self.intervals.clear();
    }

    /// Freeze this buffer into a [`TimingRecord`], swapping in `fresh`
    ///
    /// The caller allocates the replacement first so that a failed
    /// allocation never leaves the pin without a buffer.
    pub fn complete(&mut self, fresh: ActiveBuffer) -> TimingRecord {
        debug_assert!(self.is_full());
        debug_assert_eq!(fresh.capacity, self.capacity);
        let filled = std::mem::replace(self, fresh);
        TimingRecord {
            intervals: filled.intervals.into_boxed_slice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_id_parse() {
        assert_eq!("4".parse::<PinId>().unwrap(), PinId(4));
        assert_eq!("  17 \n".parse::<PinId>().unwrap(), PinId(17));
    }

    #[test]
    fn test_pin_id_parse_rejects_junk() {
        for input in ["", "   ", "four", "4x", "-1", "4 5"] {
            let err = input.parse::<PinId>().unwrap_err();
            assert!(
                matches!(err, EdgeTraceError::InputParseFailed(_)),
                "{input:?} should fail to parse"
            );
        }
    }

    #[test]
    fn test_edge_policy_matches() {
        assert!(EdgePolicy::Both.matches(Edge::Rising));
        assert!(EdgePolicy::Both.matches(Edge::Falling));
        assert!(EdgePolicy::Rising.matches(Edge::Rising));
        assert!(!EdgePolicy::Rising.matches(Edge::Falling));
        assert!(!EdgePolicy::Falling.matches(Edge::Rising));
    }

    #[test]
    fn test_active_buffer_fills_and_completes() {
        let mut buf = ActiveBuffer::new(3).unwrap();
        assert!(buf.is_empty());

        buf.push(100);
        buf.push(150);
        assert!(!buf.is_full());
        buf.push(200);
        assert!(buf.is_full());

        let fresh = ActiveBuffer::new(3).unwrap();
        let record = buf.complete(fresh);
        assert_eq!(record.intervals(), &[100, 150, 200]);
        assert_eq!(record.len(), 3);

        // The swapped-in buffer continues producing from empty
        assert!(buf.is_empty());
        assert_eq!(buf.capacity, 3);
    }

    #[test]
    fn test_active_buffer_push_past_capacity_is_ignored() {
        let mut buf = ActiveBuffer::new(2).unwrap();
        buf.push(1);
        buf.push(2);
        buf.push(3);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_active_buffer_reset() {
        let mut buf = ActiveBuffer::new(2).unwrap();
        buf.push(1);
        buf.reset();
        assert!(buf.is_empty());
        buf.push(9);
        buf.push(10);
        assert!(buf.is_full());
    }
}
