//! Configuration for the capture pipeline
//!
//! A [`CaptureConfig`] fixes the dimensions of every per-pin pipeline at
//! construction time: how many pins the registry supports, how many
//! intervals a record holds, how many records a pin may buffer, and how
//! large a drained page may grow. All fields have sensible defaults and can
//! be loaded from a TOML file.
//!
//! # Example
//!
//! ```ignore
//! use edgetrace_rs::config::CaptureConfig;
//!
//! let config = CaptureConfig::load("edgetrace.toml".as_ref())?;
//! let registry = PinRegistry::new(config, chip, clock)?;
//! ```

use crate::error::{EdgeTraceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default maximum number of concurrently registered pins
pub const DEFAULT_MAX_PINS: usize = 64;

/// Default number of intervals per record
pub const DEFAULT_RECORD_CAPACITY: usize = 32;

/// Default number of completed records retained per pin
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Default upper bound on one drained page, in bytes
pub const DEFAULT_DRAIN_PAGE_BYTES: usize = 4096;

/// Longest serialized interval: 20 digits of u64::MAX plus a newline
const MAX_INTERVAL_LINE_BYTES: usize = 21;

/// Dimensions of the capture pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum number of concurrently registered pins; pin ids are
    /// validated against `0..max_pins`
    pub max_pins: usize,

    /// Fixed number of intervals per [`crate::types::TimingRecord`]
    pub record_capacity: usize,

    /// Fixed number of completed records each pin's queue retains before
    /// evicting the oldest
    pub queue_capacity: usize,

    /// Upper bound on the serialized form of one drained record; a record
    /// whose rendering exceeds this is truncated at a line boundary
    pub drain_page_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_pins: DEFAULT_MAX_PINS,
            record_capacity: DEFAULT_RECORD_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_page_bytes: DEFAULT_DRAIN_PAGE_BYTES,
        }
    }
}

impl CaptureConfig {
    /// Check that every dimension is usable
    ///
    /// Rejects zero capacities and a drain page too small to hold even one
    /// serialized interval (which would truncate every record to nothing).
    pub fn validate(&self) -> Result<()> {
        if self.max_pins == 0 {
            return Err(EdgeTraceError::Config("max_pins must be at least 1".into()));
        }
        if self.record_capacity == 0 {
            return Err(EdgeTraceError::Config(
                "record_capacity must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(EdgeTraceError::Config(
                "queue_capacity must be at least 1".into(),
            ));
        }
        if self.drain_page_bytes < MAX_INTERVAL_LINE_BYTES {
            return Err(EdgeTraceError::Config(format!(
                "drain_page_bytes must be at least {MAX_INTERVAL_LINE_BYTES}"
            )));
        }
        Ok(())
    }

    /// Load and validate a configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| EdgeTraceError::Config(format!("failed to parse {path:?}: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
