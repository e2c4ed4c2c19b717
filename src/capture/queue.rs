//! Bounded per-pin FIFO of completed timing records
//!
//! Each registered pin owns one [`BoundedRecordQueue`], shared between that
//! pin's producer (append) and its consumers (pop) under the pin lock. The
//! queue itself is not synchronized; callers hold the lock across the
//! pointer-manipulation critical section only, with serialization and
//! freeing happening outside it.
//!
//! Overflow is an explicit, lossy policy: the producer always wins, and the
//! slowest consumer silently loses its oldest unread record. `append`
//! returns the evicted record instead of dropping it so the caller can free
//! it after releasing the lock.

use crate::types::TimingRecord;
use std::collections::VecDeque;

/// Fixed-capacity FIFO of [`TimingRecord`]s with drop-oldest eviction
#[derive(Debug)]
pub struct BoundedRecordQueue {
    records: VecDeque<TimingRecord>,
    capacity: usize,
}

impl BoundedRecordQueue {
    /// Create an empty queue retaining at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a record to the tail, evicting the head if the queue is full
    ///
    /// Returns the evicted record, if any, for the caller to free outside
    /// the lock. Since each append grows the queue by exactly one, evicting
    /// at most one record per append keeps `len() <= capacity` invariant.
    pub fn append(&mut self, record: TimingRecord) -> Option<TimingRecord> {
        let evicted = if self.records.len() == self.capacity {
            self.records.pop_front()
        } else {
            None
        };
        self.records.push_back(record);
        evicted
    }

    /// Remove and return the oldest record, or `None` if the queue is empty
    pub fn pop_front(&mut self) -> Option<TimingRecord> {
        self.records.pop_front()
    }

    /// Number of records currently queued
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are queued
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records this queue retains
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: u64) -> TimingRecord {
        TimingRecord::new(vec![tag, tag + 1])
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = BoundedRecordQueue::new(8);
        for i in 0..5 {
            assert!(queue.append(record(i)).is_none());
        }
        assert_eq!(queue.len(), 5);

        for i in 0..5 {
            let popped = queue.pop_front().unwrap();
            assert_eq!(popped.intervals()[0], i);
        }
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_overflow_evicts_oldest_exactly_once() {
        let capacity = 4;
        let mut queue = BoundedRecordQueue::new(capacity);
        let mut evicted = Vec::new();

        for i in 0..(capacity as u64 + 3) {
            if let Some(old) = queue.append(record(i)) {
                evicted.push(old.intervals()[0]);
            }
            assert!(queue.len() <= capacity);
        }

        // The three oldest were evicted, in order
        assert_eq!(evicted, vec![0, 1, 2]);

        // Exactly the most recent `capacity` records remain, oldest first
        let remaining: Vec<u64> = std::iter::from_fn(|| queue.pop_front())
            .map(|r| r.intervals()[0])
            .collect();
        assert_eq!(remaining, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_pop_empty_is_none() {
        let mut queue = BoundedRecordQueue::new(2);
        assert!(queue.is_empty());
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_capacity_one() {
        let mut queue = BoundedRecordQueue::new(1);
        assert!(queue.append(record(0)).is_none());
        let evicted = queue.append(record(1)).unwrap();
        assert_eq!(evicted.intervals()[0], 0);
        assert_eq!(queue.pop_front().unwrap().intervals()[0], 1);
    }

    // Property-based checks of the FIFO and overflow laws
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_len_never_exceeds_capacity(
            capacity in 1usize..16,
            tags in prop::collection::vec(0u64..1000, 0..64)
        ) {
            let mut queue = BoundedRecordQueue::new(capacity);
            for &tag in &tags {
                queue.append(record(tag));
                prop_assert!(queue.len() <= capacity);
            }
        }

        #[test]
        fn prop_queue_holds_most_recent_in_order(
            capacity in 1usize..16,
            tags in prop::collection::vec(0u64..1000, 0..64)
        ) {
            let mut queue = BoundedRecordQueue::new(capacity);
            for &tag in &tags {
                queue.append(record(tag));
            }

            let drained: Vec<u64> = std::iter::from_fn(|| queue.pop_front())
                .map(|r| r.intervals()[0])
                .collect();
            let start = tags.len().saturating_sub(capacity);
            prop_assert_eq!(drained, tags[start..].to_vec());
        }

        #[test]
        fn prop_every_record_popped_or_evicted_once(
            capacity in 1usize..8,
            count in 0usize..40
        ) {
            let mut queue = BoundedRecordQueue::new(capacity);
            let mut seen = Vec::new();
            for i in 0..count as u64 {
                if let Some(old) = queue.append(record(i)) {
                    seen.push(old.intervals()[0]);
                }
            }
            while let Some(r) = queue.pop_front() {
                seen.push(r.intervals()[0]);
            }

            // Eviction order then drain order together cover every record
            // exactly once.
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..count as u64).collect::<Vec<_>>());
        }
    }
}
