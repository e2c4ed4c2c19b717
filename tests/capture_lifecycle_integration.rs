//! Integration tests for pin lifecycle management
//!
//! These tests validate the complete register/unregister workflow against
//! the simulated chip:
//! - Resource accounting (nothing leaks across a full lifecycle)
//! - Registration invariants (range, uniqueness)
//! - Failure-path unwinding
//! - Shutdown and drop behavior

#![cfg(feature = "mock-gpio")]

use edgetrace_rs::{
    capture::{DrainPage, MockGpioBackend, PinRegistry},
    clock::ManualClock,
    config::CaptureConfig,
    error::EdgeTraceError,
    types::PinId,
};
use std::sync::Arc;

fn test_config() -> CaptureConfig {
    CaptureConfig {
        max_pins: 16,
        record_capacity: 2,
        queue_capacity: 4,
        ..CaptureConfig::default()
    }
}

fn setup() -> (PinRegistry, Arc<MockGpioBackend>, Arc<ManualClock>) {
    let chip = Arc::new(MockGpioBackend::new());
    let clock = Arc::new(ManualClock::new());
    let registry = PinRegistry::new(test_config(), chip.clone(), clock.clone()).unwrap();
    (registry, chip, clock)
}

#[test]
fn test_full_lifecycle_leaks_nothing() {
    let (registry, chip, clock) = setup();

    // Register every even pin, feed some data, then unregister them all.
    let pins: Vec<PinId> = (0..16).step_by(2).map(PinId).collect();
    for &pin in &pins {
        registry.register(pin).unwrap();
    }
    assert_eq!(chip.acquired_count(), pins.len());
    assert_eq!(chip.attached_count(), pins.len());
    assert_eq!(registry.hub().exposed_count(), pins.len());

    for &pin in &pins {
        chip.pulse_train(pin, &clock, &[50, 50, 50]);
    }

    for &pin in &pins {
        registry.unregister(pin).unwrap();
    }
    assert_eq!(chip.acquired_count(), 0);
    assert_eq!(chip.attached_count(), 0);
    assert_eq!(registry.hub().exposed_count(), 0);
    assert_eq!(registry.registered_count(), 0);
}

#[test]
fn test_duplicate_register_fails_second_call() {
    let (registry, _chip, _clock) = setup();

    registry.register(PinId(5)).unwrap();
    assert!(matches!(
        registry.register(PinId(5)),
        Err(EdgeTraceError::AlreadyRegistered(PinId(5)))
    ));

    // After unregistering, the id is reusable.
    registry.unregister(PinId(5)).unwrap();
    registry.register(PinId(5)).unwrap();
}

#[test]
fn test_unregister_of_never_registered_pin_fails() {
    let (registry, _chip, _clock) = setup();
    assert!(matches!(
        registry.unregister(PinId(9)),
        Err(EdgeTraceError::NotRegistered(PinId(9)))
    ));
}

#[test]
fn test_unregister_twice_fails_second_call() {
    let (registry, _chip, _clock) = setup();
    registry.register(PinId(1)).unwrap();
    registry.unregister(PinId(1)).unwrap();
    assert!(matches!(
        registry.unregister(PinId(1)),
        Err(EdgeTraceError::NotRegistered(PinId(1)))
    ));
}

#[test]
fn test_out_of_range_boundary() {
    let (registry, _chip, _clock) = setup();

    // max_pins = 16: the last valid id succeeds, the first invalid fails.
    registry.register(PinId(15)).unwrap();
    assert!(matches!(
        registry.register(PinId(16)),
        Err(EdgeTraceError::OutOfRange { pin: PinId(16), max: 16 })
    ));
    assert!(matches!(
        registry.register(PinId(1000)),
        Err(EdgeTraceError::OutOfRange { .. })
    ));
    assert!(matches!(
        registry.unregister(PinId(16)),
        Err(EdgeTraceError::OutOfRange { .. })
    ));
}

#[test]
fn test_failed_acquire_unwinds_cleanly() {
    let (registry, chip, _clock) = setup();

    chip.fail_next_acquire(PinId(3));
    assert!(matches!(
        registry.register(PinId(3)),
        Err(EdgeTraceError::AcquireFailed { .. })
    ));

    assert_eq!(chip.acquired_count(), 0);
    assert_eq!(chip.attached_count(), 0);
    assert_eq!(registry.hub().exposed_count(), 0);
    assert!(!registry.is_registered(PinId(3)));

    // The registry is fully usable for that pin afterwards.
    registry.register(PinId(3)).unwrap();
}

#[test]
fn test_failed_attach_releases_the_acquired_pin() {
    let (registry, chip, _clock) = setup();

    chip.fail_next_attach(PinId(7));
    assert!(matches!(
        registry.register(PinId(7)),
        Err(EdgeTraceError::AttachFailed { .. })
    ));

    // The acquire that preceded the failed attach was unwound.
    assert_eq!(chip.acquired_count(), 0);
    assert_eq!(registry.hub().exposed_count(), 0);

    registry.register(PinId(7)).unwrap();
    assert_eq!(chip.acquired_count(), 1);
    assert_eq!(chip.attached_count(), 1);
}

#[test]
fn test_unregister_discards_buffered_records() {
    let (registry, chip, clock) = setup();

    registry.register(PinId(2)).unwrap();
    chip.pulse_train(PinId(2), &clock, &[10, 10, 10, 10]);

    registry.unregister(PinId(2)).unwrap();

    // A fresh registration starts with an empty pipeline; the old queue
    // contents are gone.
    registry.register(PinId(2)).unwrap();
    assert_eq!(registry.drain(PinId(2)), DrainPage::Empty);
}

#[test]
fn test_unregistered_pin_stops_capturing() {
    let (registry, chip, clock) = setup();

    registry.register(PinId(4)).unwrap();
    registry.unregister(PinId(4)).unwrap();

    // The trigger is gone, so edges no longer reach any handler.
    assert!(!chip.fire_edge(PinId(4), edgetrace_rs::types::Edge::Rising));
    clock.advance(100);
    assert_eq!(registry.stats().edges_seen, 0);
}

#[test]
fn test_shutdown_unregisters_every_pin() {
    let (registry, chip, _clock) = setup();

    for pin in [0, 3, 9, 15] {
        registry.register(PinId(pin)).unwrap();
    }
    registry.shutdown();

    assert_eq!(registry.registered_count(), 0);
    assert_eq!(chip.acquired_count(), 0);
    assert_eq!(chip.attached_count(), 0);

    // Shutdown is idempotent and the registry remains usable.
    registry.shutdown();
    registry.register(PinId(3)).unwrap();
}

#[test]
fn test_dropping_registry_releases_chip_resources() {
    let chip = Arc::new(MockGpioBackend::new());
    let clock = Arc::new(ManualClock::new());
    {
        let registry = PinRegistry::new(test_config(), chip.clone(), clock.clone()).unwrap();
        registry.register(PinId(1)).unwrap();
        registry.register(PinId(2)).unwrap();
    }
    assert_eq!(chip.acquired_count(), 0);
    assert_eq!(chip.attached_count(), 0);
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let chip = Arc::new(MockGpioBackend::new());
    let clock = Arc::new(ManualClock::new());
    let config = CaptureConfig {
        queue_capacity: 0,
        ..CaptureConfig::default()
    };
    assert!(matches!(
        PinRegistry::new(config, chip, clock),
        Err(EdgeTraceError::Config(_))
    ));
}
