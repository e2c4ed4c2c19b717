//! # edgetrace: GPIO edge-interval capture
//!
//! Captures the time intervals between edge events on digital input lines
//! and buffers them, per pin, for a slower consumer to drain and analyze
//! (protocol decoding, signal characterization). Many pins run
//! concurrently, each registered and unregistered independently at runtime.
//!
//! ## Architecture
//!
//! - **Producer**: a latency-sensitive per-edge handler computes each
//!   inter-edge interval and batches intervals into fixed-size immutable
//!   records; it never blocks, shedding load through defined, counted
//!   overflow policies instead
//! - **Buffering**: each pin keeps a bounded FIFO of completed records;
//!   when full, the oldest record is evicted (producer always wins)
//! - **Consumer**: drains pop the oldest record and serialize it to a
//!   page-bounded text form through a per-pin exposed read resource
//! - **Lifecycle**: a registry validates pin ids, acquires chip resources
//!   in order, and unwinds them in reverse on failure or unregistration
//!
//! The chip that owns physical pins sits behind the
//! [`capture::GpioBackend`] trait; the `mock-gpio` feature (on by default)
//! provides a simulated chip so the whole pipeline runs without hardware.
//!
//! ## Example
//!
//! ```ignore
//! use edgetrace_rs::{
//!     capture::{MockGpioBackend, PinRegistry},
//!     clock::ManualClock,
//!     config::CaptureConfig,
//!     types::PinId,
//! };
//! use std::sync::Arc;
//!
//! let chip = Arc::new(MockGpioBackend::new());
//! let clock = Arc::new(ManualClock::new());
//! let registry = PinRegistry::new(CaptureConfig::default(), chip.clone(), clock.clone())?;
//!
//! registry.register(PinId(4))?;
//! chip.pulse_train(PinId(4), &clock, &[100, 150, 150, 150]);
//!
//! while let Some(page) = registry.drain(PinId(4)).bytes() {
//!     println!("{}", String::from_utf8_lossy(page));
//! }
//! registry.shutdown();
//! ```

pub mod capture;
pub mod clock;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use capture::{
    BoundedRecordQueue, CancelToken, CaptureStats, DrainPage, DrainWait, GpioBackend, PinRegistry,
    ReadHub, StatsSnapshot,
};
pub use clock::{ManualClock, MonotonicClock, SystemClock};
pub use config::CaptureConfig;
pub use error::{EdgeTraceError, Result};
pub use types::{ActiveBuffer, Edge, EdgePolicy, PinId, TimingRecord};

#[cfg(feature = "mock-gpio")]
pub use capture::{EdgePump, MockGpioBackend};
