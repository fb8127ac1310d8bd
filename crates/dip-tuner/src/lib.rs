//! DIP Tuner
//!
//! Configuration and output records for the `dip-tuner` binary.

pub mod config;
pub mod record;

pub use config::{ControllerEntry, SimulationSettings, SwarmSettings, TunerConfig};
pub use record::{EvaluationRecord, TuningRecord};

/// Tuner version
pub const TUNER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config/dip.toml";
