//! The edge-timing capture pipeline
//!
//! Everything between a hardware edge and a drained page lives here. Each
//! registered pin owns an independent pipeline; pins never contend with
//! each other.
//!
//! # Architecture
//!
//! ```text
//! edge trigger ──► producer::on_edge ──► ActiveBuffer ──full──► BoundedRecordQueue
//!    (chip)         interval compute                              │ (pin lock)
//!                                                                 ▼
//!                                          ReadHub ──► drain::drain_page ──► page
//! ```
//!
//! - [`GpioBackend`] - Collaborator trait over the chip that owns pins and
//!   edge triggers
//! - [`MockGpioBackend`] / [`EdgePump`] - Simulated chip for tests and
//!   demos (feature `mock-gpio`)
//! - [`BoundedRecordQueue`] - Per-pin FIFO with drop-oldest eviction
//! - [`ReadHub`] - Registry of per-pin drain callbacks (the exposed read
//!   resources)
//! - [`PinRegistry`] - Lifecycle owner: register, unregister, shutdown
//! - [`DrainWait`] / [`CancelToken`] - Bound or abort a blocked drain
//! - [`CaptureStats`] - Lock-free counters for every defined loss policy
//!
//! # Concurrency
//!
//! The producer path runs in the chip's trigger context and never blocks:
//! it uses attempt-only locks and sheds load (counted) on contention. The
//! consumer path may block briefly on the pin's queue lock, whose critical
//! section is a pointer swap; a consumer that must not block indefinitely
//! passes a [`DrainWait`] with a timeout or cancel token and retries on
//! [`DrainPage::Busy`]. Serialization always happens outside locks.

pub mod chip;
pub mod drain;
pub mod hub;
#[cfg(feature = "mock-gpio")]
pub mod mock_chip;
pub mod producer;
pub mod queue;
pub mod registry;

pub use chip::{CaptureStats, EdgeHandler, GpioBackend, StatsSnapshot};
pub use drain::{serialize_record, CancelToken, DrainPage, DrainWait};
pub use hub::{DrainFn, ReadHub};
pub use queue::BoundedRecordQueue;
pub use registry::{PinRegistry, PinState};

#[cfg(feature = "mock-gpio")]
pub use mock_chip::{EdgePump, MockGpioBackend};
