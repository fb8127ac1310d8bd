//! HistoryLog - append-only controller telemetry
//!
//! Owned by the caller of `compute_control` and passed by mutable reference,
//! so one log can span a whole closed-loop run. Series are keyed by name;
//! [`keys`] lists the names written by the built-in controllers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Telemetry series names
pub mod keys {
    /// Sliding variable
    pub const SLIDING: &str = "s";
    /// Effective boundary layer width
    pub const EPSILON_EFF: &str = "epsilon_eff";
    /// Equivalent (model-based) control
    pub const U_EQ: &str = "u_eq";
    /// Robust (switching + damping) control
    pub const U_ROBUST: &str = "u_robust";
    /// Control before saturation
    pub const U_TOTAL: &str = "u_total";
    /// Saturated control sent to the plant
    pub const U: &str = "u";
    /// Super-twisting integral term
    pub const INTEGRAL: &str = "z";
    /// Adaptive switching gain
    pub const ADAPTIVE_GAIN: &str = "k_adaptive";
    /// Hybrid first adaptive gain
    pub const K1: &str = "k1";
    /// Hybrid second adaptive gain
    pub const K2: &str = "k2";
    /// Hybrid mode, 0 = adaptive, 1 = aggressive
    pub const MODE: &str = "mode";
}

/// Append-only telemetry log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    series: BTreeMap<String, Vec<f64>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample to a series, creating it on first use
    pub fn record(&mut self, key: &str, value: f64) {
        match self.series.get_mut(key) {
            Some(values) => values.push(value),
            None => {
                self.series.insert(key.to_string(), vec![value]);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.series.get(key).map(Vec::as_slice)
    }

    /// Most recent sample of a series
    pub fn last(&self, key: &str) -> Option<f64> {
        self.series.get(key).and_then(|v| v.last().copied())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.series.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Number of samples in the longest series
    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
