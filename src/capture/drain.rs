//! Consumer-side record drain and serialization
//!
//! A drain pops the oldest completed record under the pin lock, releases
//! the lock, and only then renders the intervals; the critical section is
//! a pointer swap, never formatting work. The serialized form is the page
//! the exposed read resource hands back to its caller: ASCII decimal
//! microseconds, one interval per line.
//!
//! The consumer's lock acquisition may block while a producer rotation or
//! another drain holds the pin lock. A [`DrainWait`] bounds that wait with
//! a timeout, and a [`CancelToken`] aborts it from another context; either
//! way the aborted drain surfaces as [`DrainPage::Busy`] with the queue
//! untouched (no partial pop), and the caller simply retries.
//!
//! A popped record is never re-queued: once a drain returns data, no later
//! drain repeats it. If the rendering would exceed the page bound the
//! record is cut at a line boundary and the remainder discarded. This is a
//! documented truncation policy, so the record capacity should be chosen
//! to keep a full record within one page under the expected numeric range.

use super::chip::CaptureStats;
use super::queue::BoundedRecordQueue;
use super::registry::PinState;
use crate::types::TimingRecord;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

/// Result of one drain request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainPage {
    /// No record was available; poll again later
    Empty,
    /// The queue lock could not be taken within the wait's limits; retry
    Busy,
    /// One record, serialized
    Data {
        /// Serialized intervals, newline-terminated decimal per line
        bytes: Vec<u8>,
        /// Whether the record was cut at the page bound
        truncated: bool,
    },
}

impl DrainPage {
    /// The serialized bytes, if this drain produced data
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            DrainPage::Data { bytes, .. } => Some(bytes),
            _ => None,
        }
    }
}

/// Aborts a blocked drain from another context
///
/// Clones share one flag: cancelling any clone makes every drain waiting
/// with that token give up and return [`DrainPage::Busy`]. Cancellation
/// aborts the wait only; a drain that takes the lock without waiting
/// completes normally.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort every drain currently waiting with this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether `cancel` has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// How long one drain may wait for the pin's queue lock
///
/// The default waits until the lock is free. Callers that must not block
/// indefinitely bound the wait with [`DrainWait::timeout`], hand out a
/// [`CancelToken`] via [`DrainWait::cancel_token`], or both. An expired or
/// cancelled wait surfaces as [`DrainPage::Busy`] and leaves the pin's
/// state unchanged.
#[derive(Debug, Clone, Default)]
pub struct DrainWait {
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl DrainWait {
    /// Wait until the lock is free
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up after `timeout`
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Give up when `token` is cancelled
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_unbounded(&self) -> bool {
        self.timeout.is_none() && self.cancel.is_none()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// Acquire the queue lock within the limits of `wait`
///
/// `None` means the wait was cancelled or timed out, or the lock was
/// poisoned; the caller surfaces all three as the retry condition.
fn lock_queue<'a>(
    queue: &'a Mutex<BoundedRecordQueue>,
    wait: &DrainWait,
) -> Option<MutexGuard<'a, BoundedRecordQueue>> {
    if wait.is_unbounded() {
        return queue.lock().ok();
    }
    let deadline = wait.timeout.map(|timeout| Instant::now() + timeout);
    loop {
        match queue.try_lock() {
            Ok(guard) => return Some(guard),
            Err(TryLockError::Poisoned(_)) => return None,
            Err(TryLockError::WouldBlock) => {}
        }
        if wait.is_cancelled() {
            return None;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return None;
        }
        // Holders only ever swap pointers, so the lock frees quickly.
        thread::yield_now();
    }
}

/// Pop and serialize the oldest record for `state`'s pin
pub(crate) fn drain_page(
    state: &PinState,
    page_bytes: usize,
    stats: &CaptureStats,
    wait: &DrainWait,
) -> DrainPage {
    let record = {
        let mut queue = match lock_queue(&state.queue, wait) {
            Some(guard) => guard,
            None => return DrainPage::Busy,
        };
        queue.pop_front()
    };

    let Some(record) = record else {
        stats.record_empty_drain();
        return DrainPage::Empty;
    };

    let (bytes, truncated) = serialize_record(&record, page_bytes);
    stats.record_drain();
    if truncated {
        stats.record_truncation();
        tracing::debug!(
            pin = %state.pin,
            intervals = record.len(),
            page_bytes,
            "drained record truncated at page bound"
        );
    }
    DrainPage::Data { bytes, truncated }
}

/// Render a record as newline-separated decimal microseconds, stopping
/// before the first interval that would push the output past `page_bytes`
///
/// Returns the bytes and whether the record was truncated. Intervals past
/// the cut are discarded with the record.
pub fn serialize_record(record: &TimingRecord, page_bytes: usize) -> (Vec<u8>, bool) {
    let mut out = Vec::with_capacity(page_bytes.min(record.len() * 8));
    let mut line = String::with_capacity(24);

    for &interval in record.intervals() {
        line.clear();
        // Writing to a String cannot fail.
        let _ = writeln!(line, "{interval}");
        if out.len() + line.len() > page_bytes {
            return (out, true);
        }
        out.extend_from_slice(line.as_bytes());
    }
    (out, false)
}
