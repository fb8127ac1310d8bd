//! Hybrid controller mode state machine
//!
//! Two modes with hysteresis on `|s|`:
//!
//! ```text
//!              |s| > aggressive
//!   Adaptive ─────────────────────▶ Aggressive
//!       ▲                               │
//!       └───────────────────────────────┘
//!              |s| < conservative
//! ```
//!
//! Between the two thresholds the current mode is kept. There is no terminal
//! state.

use serde::{Deserialize, Serialize};

use dip_common::{DipError, Result};

/// Active sub-law of the hybrid controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HybridMode {
    /// Adaptive first-order law, used near the surface
    #[default]
    Adaptive,
    /// Super-twisting law, used far from the surface
    Aggressive,
}

impl HybridMode {
    /// Numeric encoding for telemetry
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Adaptive => 0.0,
            Self::Aggressive => 1.0,
        }
    }
}

impl std::fmt::Display for HybridMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adaptive => write!(f, "adaptive"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Hysteresis band on `|s|`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeThresholds {
    aggressive: f64,
    conservative: f64,
}

impl ModeThresholds {
    /// Requires `0 < conservative < aggressive`
    pub fn new(aggressive: f64, conservative: f64) -> Result<Self> {
        if !(aggressive.is_finite() && conservative.is_finite())
            || conservative <= 0.0
            || conservative >= aggressive
        {
            return Err(DipError::Configuration(format!(
                "mode thresholds must satisfy 0 < s_conservative_threshold ({}) < s_aggressive_threshold ({})",
                conservative, aggressive
            )));
        }
        Ok(Self {
            aggressive,
            conservative,
        })
    }

    pub fn aggressive(&self) -> f64 {
        self.aggressive
    }

    pub fn conservative(&self) -> f64 {
        self.conservative
    }
}

/// Mode for the next step given the current mode and `|s|`
pub fn next_mode(current: HybridMode, abs_s: f64, thresholds: &ModeThresholds) -> HybridMode {
    if abs_s > thresholds.aggressive {
        HybridMode::Aggressive
    } else if abs_s < thresholds.conservative {
        HybridMode::Adaptive
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> ModeThresholds {
        ModeThresholds::new(1.0, 0.1).unwrap()
    }

    #[test]
    fn test_transitions() {
        let t = thresholds();
        assert_eq!(next_mode(HybridMode::Adaptive, 1.5, &t), HybridMode::Aggressive);
        assert_eq!(next_mode(HybridMode::Aggressive, 0.05, &t), HybridMode::Adaptive);
        assert_eq!(next_mode(HybridMode::Aggressive, 1.5, &t), HybridMode::Aggressive);
        assert_eq!(next_mode(HybridMode::Adaptive, 0.05, &t), HybridMode::Adaptive);
    }

    #[test]
    fn test_hysteresis_band_keeps_mode() {
        let t = thresholds();
        for abs_s in [0.1, 0.5, 1.0] {
            assert_eq!(next_mode(HybridMode::Adaptive, abs_s, &t), HybridMode::Adaptive);
            assert_eq!(next_mode(HybridMode::Aggressive, abs_s, &t), HybridMode::Aggressive);
        }
    }

    #[test]
    fn test_sequence() {
        let t = thresholds();
        let samples = [0.0, 0.5, 1.2, 0.8, 0.3, 0.09, 0.5];
        let expected = [
            HybridMode::Adaptive,
            HybridMode::Adaptive,
            HybridMode::Aggressive,
            HybridMode::Aggressive,
            HybridMode::Aggressive,
            HybridMode::Adaptive,
            HybridMode::Adaptive,
        ];
        let mut mode = HybridMode::default();
        for (abs_s, want) in samples.iter().zip(expected) {
            mode = next_mode(mode, *abs_s, &t);
            assert_eq!(mode, want, "|s| = {abs_s}");
        }
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(ModeThresholds::new(1.0, 1.0).is_err());
        assert!(ModeThresholds::new(0.1, 1.0).is_err());
        assert!(ModeThresholds::new(1.0, 0.0).is_err());
        assert!(ModeThresholds::new(f64::NAN, 0.1).is_err());
    }

    #[test]
    fn test_mode_encoding() {
        assert_eq!(HybridMode::Adaptive.as_f64(), 0.0);
        assert_eq!(HybridMode::Aggressive.as_f64(), 1.0);
        assert_eq!(HybridMode::Aggressive.to_string(), "aggressive");
    }
}
