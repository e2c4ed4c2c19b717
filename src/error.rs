//! Error handling for edgetrace
//!
//! This module defines the crate error type and a Result alias used
//! throughout the capture pipeline. Registration-time failures carry enough
//! context to tell the caller which pin and which sub-resource failed;
//! producer-context failures are never surfaced through this type (they are
//! recovered locally and counted, see [`crate::capture::CaptureStats`]).

use crate::types::PinId;
use thiserror::Error;

/// Main error type for edgetrace operations
#[derive(Error, Debug)]
pub enum EdgeTraceError {
    /// Pin id beyond the configured maximum pin count
    #[error("pin {pin} is out of range (supported pins: 0..{max})")]
    OutOfRange {
        /// The rejected pin id
        pin: PinId,
        /// Configured maximum pin count
        max: usize,
    },

    /// A live pipeline already exists for this pin
    #[error("pin {0} is already registered")]
    AlreadyRegistered(PinId),

    /// No live pipeline exists for this pin
    #[error("pin {0} is not registered")]
    NotRegistered(PinId),

    /// The physical pin could not be acquired from the chip
    #[error("failed to acquire pin {pin}: {reason}")]
    AcquireFailed {
        /// The pin that could not be acquired
        pin: PinId,
        /// Chip-reported reason
        reason: String,
    },

    /// The edge trigger could not be installed
    #[error("failed to attach edge trigger on pin {pin}: {reason}")]
    AttachFailed {
        /// The pin whose trigger failed
        pin: PinId,
        /// Chip-reported reason
        reason: String,
    },

    /// Memory exhaustion during registration or a producer rotation
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    /// Malformed pin id input at the control-plane boundary
    #[error("malformed pin id input: {0:?}")]
    InputParseFailed(String),

    /// Errors related to configuration loading/validation
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for edgetrace operations
pub type Result<T> = std::result::Result<T, EdgeTraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EdgeTraceError::OutOfRange {
            pin: PinId(99),
            max: 64,
        };
        assert_eq!(err.to_string(), "pin 99 is out of range (supported pins: 0..64)");
    }

    #[test]
    fn test_registration_errors_name_the_pin() {
        assert!(EdgeTraceError::AlreadyRegistered(PinId(3))
            .to_string()
            .contains("pin 3"));
        assert!(EdgeTraceError::NotRegistered(PinId(7))
            .to_string()
            .contains("pin 7"));
    }

    #[test]
    fn test_input_parse_error_quotes_input() {
        let err = EdgeTraceError::InputParseFailed("4x".to_string());
        assert!(err.to_string().contains("\"4x\""));
    }
}
