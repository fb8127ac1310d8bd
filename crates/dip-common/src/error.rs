//! Error types for DIP control and tuning
//!
//! Construction-time problems (bad parameters, bad gains) are hard errors.
//! Runtime divergence inside an optimization run is not an error at all; it
//! becomes a sentinel cost. `NumericalInstability` exists for callers that
//! drive a single simulation and want the failure propagated.

use thiserror::Error;

/// Result type alias using DipError
pub type Result<T> = std::result::Result<T, DipError>;

/// Unified error type for DIP operations
#[derive(Debug, Error)]
pub enum DipError {
    // Invalid or missing parameters (boundary layer, max force, thresholds, bounds)
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Gain constraint violations
    #[error("Gain validation error: {0}")]
    GainValidation(#[from] GainValidationError),

    // Non-finite input to a pure math function
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // Plant or integrator reported ill-conditioning
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    // Registry lock not acquired in time
    #[error("Controller registry lock not acquired within {timeout_ms}ms")]
    FactoryTimeout { timeout_ms: u64 },

    #[error("Unknown controller type: {0}")]
    UnknownController(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Gain constraint violations, always naming the controller and the gain
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GainValidationError {
    #[error("{controller} expects {expected} gains, got {actual}")]
    WrongCount {
        controller: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{controller}: gain {name} (index {index}) must be finite, got {value}")]
    NonFinite {
        controller: &'static str,
        name: &'static str,
        index: usize,
        value: f64,
    },

    #[error("{controller}: gain {name} (index {index}) must be strictly positive, got {value}")]
    NotPositive {
        controller: &'static str,
        name: &'static str,
        index: usize,
        value: f64,
    },

    #[error("{controller}: gain {name} (index {index}) must be non-negative, got {value}")]
    Negative {
        controller: &'static str,
        name: &'static str,
        index: usize,
        value: f64,
    },

    #[error("{controller}: finite-time convergence requires K1 > K2, got K1={k1}, K2={k2}")]
    OrderingViolated {
        controller: &'static str,
        k1: f64,
        k2: f64,
    },
}

impl GainValidationError {
    /// Index of the offending gain, when a single gain is at fault
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::NonFinite { index, .. }
            | Self::NotPositive { index, .. }
            | Self::Negative { index, .. } => Some(*index),
            Self::OrderingViolated { .. } => Some(1),
            Self::WrongCount { .. } => None,
        }
    }
}

// Implement From for common external error types
impl From<serde_json::Error> for DipError {
    fn from(err: serde_json::Error) -> Self {
        DipError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for DipError {
    fn from(err: std::io::Error) -> Self {
        DipError::Io(err.to_string())
    }
}

impl From<anyhow::Error> for DipError {
    fn from(err: anyhow::Error) -> Self {
        DipError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DipError::GainValidation(GainValidationError::NotPositive {
            controller: "classical_smc",
            name: "k1",
            index: 0,
            value: 0.0,
        });
        let msg = err.to_string();
        assert!(msg.contains("classical_smc"));
        assert!(msg.contains("k1"));
        assert!(msg.contains("index 0"));
    }

    #[test]
    fn test_ordering_error() {
        let err = GainValidationError::OrderingViolated {
            controller: "sta_smc",
            k1: 5.0,
            k2: 5.0,
        };
        assert!(err.to_string().contains("K1 > K2"));
        assert_eq!(err.index(), Some(1));
    }

    #[test]
    fn test_timeout_error() {
        let err = DipError::FactoryTimeout { timeout_ms: 10_000 };
        assert!(err.to_string().contains("10000ms"));
    }
}
