//! # DIP Common
//!
//! Shared types, collaborator interfaces and errors for sliding-mode control
//! of the double inverted pendulum.
//!
//! ## Core Types
//!
//! - [`StateVector`]: `[x, θ1, θ2, ẋ, θ̇1, θ̇2]` plant state
//! - [`HistoryLog`]: append-only per-run controller telemetry
//! - [`Trajectory`]: one closed-loop run as produced by a simulator
//! - [`GainBounds`]: per-dimension search box for gain tuning
//!
//! ## Collaborators
//!
//! - [`DynamicsModel`]: state derivative of the plant under a control force
//! - [`PlantModel`]: `M(q)`, `C(q, q̇)`, `G(q)` for model-based control terms

pub mod error;
pub mod plant;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{DipError, GainValidationError, Result};
pub use plant::{DynamicsModel, DynamicsResult, PhysicsMatrices, PlantModel};
pub use types::{
    bounds::GainBounds,
    history::{keys, HistoryLog},
    state::{StateVector, STATE_DIM},
    trajectory::{FailureReason, SimulationFailure, Trajectory},
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Regularization added to boundary-layer denominators
pub const BOUNDARY_EPS: f64 = 1e-10;

/// Multiple of `max_force` the equivalent control is clipped to
pub const EQUIVALENT_CONTROL_LIMIT_FACTOR: f64 = 10.0;
