//! Sliding-mode control laws

pub mod adaptive;
pub mod classical;
pub mod hybrid;
pub mod mode;
pub mod super_twisting;

pub use adaptive::{AdaptiveConfig, AdaptiveSmc, AdaptiveState, ADAPTATION_RATE_WARN};
pub use classical::{ClassicalConfig, ClassicalSmc, ClassicalState};
pub use hybrid::{HybridConfig, HybridSmc, HybridState};
pub use mode::{next_mode, HybridMode, ModeThresholds};
pub use super_twisting::{SuperTwistingConfig, SuperTwistingSmc, SuperTwistingState};
