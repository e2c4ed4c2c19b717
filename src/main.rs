//! edgetrace control-plane demo
//!
//! Registers capture pipelines for the requested pins on the simulated
//! chip, replays edge bursts through them, drains every completed record
//! to stdout, and tears the registry down. Useful for eyeballing the
//! pipeline end to end without hardware:
//!
//! ```bash
//! edgetrace 4 17              # capture pins 4 and 17 with defaults
//! edgetrace --config et.toml 4
//! ```

use anyhow::Context;
use edgetrace_rs::{
    capture::{DrainPage, MockGpioBackend, PinRegistry},
    clock::ManualClock,
    config::CaptureConfig,
    types::PinId,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,edgetrace_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (config_path, pins) = parse_args(std::env::args().skip(1))?;
    let config = match &config_path {
        Some(path) => {
            CaptureConfig::load(path).with_context(|| format!("loading config {path:?}"))?
        }
        None => CaptureConfig::default(),
    };

    let chip = Arc::new(MockGpioBackend::new());
    let clock = Arc::new(ManualClock::new());
    let registry = PinRegistry::new(config.clone(), chip.clone(), clock.clone())?;

    for &pin in &pins {
        registry.register(pin)?;
    }
    tracing::info!(pins = pins.len(), "capture pipelines registered");

    // Replay one burst per pin: enough edges to complete two records, with
    // a pin-specific base interval so the outputs are distinguishable.
    for (i, &pin) in pins.iter().enumerate() {
        let base = 100 * (i as u64 + 1);
        let intervals: Vec<u64> = (0..config.record_capacity * 2)
            .map(|n| base + (n as u64 % 4) * 25)
            .collect();
        chip.pulse_train(pin, &clock, &intervals);
    }

    for &pin in &pins {
        loop {
            match registry.drain(pin) {
                DrainPage::Data { bytes, truncated } => {
                    println!("pin {pin}:");
                    print!("{}", String::from_utf8_lossy(&bytes));
                    if truncated {
                        tracing::warn!(pin = %pin, "drained page was truncated");
                    }
                }
                DrainPage::Busy => continue,
                DrainPage::Empty => break,
            }
        }
    }

    let stats = registry.stats();
    tracing::info!(
        edges = stats.edges_seen,
        records = stats.records_completed,
        drained = stats.records_drained,
        lost = stats.records_lost(),
        "capture session summary"
    );

    registry.shutdown();
    Ok(())
}

/// Parse `[--config PATH] PIN...`; defaults to pin 4 when no pins given
fn parse_args(
    args: impl Iterator<Item = String>,
) -> anyhow::Result<(Option<PathBuf>, Vec<PinId>)> {
    let mut config_path = None;
    let mut pins = Vec::new();
    let mut args = args;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args
                .next()
                .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
            config_path = Some(PathBuf::from(path));
        } else {
            pins.push(arg.parse::<PinId>()?);
        }
    }
    if pins.is_empty() {
        pins.push(PinId(4));
    }
    Ok((config_path, pins))
}
