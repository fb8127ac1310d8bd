//! Plant interfaces consumed by controllers and simulators
//!
//! The equations of motion live outside the control core. Controllers only
//! see the plant through [`PlantModel`] (for the optional equivalent-control
//! term) and simulators through [`DynamicsModel`].

use nalgebra::{Matrix3, Vector3};

use crate::types::state::{StateVector, STATE_DIM};

/// Outcome of one dynamics evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsResult {
    /// `[ẋ, θ̇1, θ̇2, ẍ, θ̈1, θ̈2]`
    pub state_derivative: [f64; STATE_DIM],
    /// False when the model could not produce a trustworthy derivative
    pub success: bool,
}

impl DynamicsResult {
    pub fn ok(state_derivative: [f64; STATE_DIM]) -> Self {
        Self {
            state_derivative,
            success: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            state_derivative: [0.0; STATE_DIM],
            success: false,
        }
    }
}

/// Plant dynamics as seen by an integrator.
///
/// Implementations must report ill-conditioning through
/// `DynamicsResult::success` instead of returning non-finite derivatives.
pub trait DynamicsModel: Send + Sync {
    /// Evaluate the state derivative under the given cart force
    fn step(&self, state: &StateVector, control: f64) -> DynamicsResult;
}

/// Lagrangian matrices `M(q) q̈ + C(q, q̇) q̇ + G(q) = B u`, with `B = [1, 0, 0]ᵀ`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsMatrices {
    pub inertia: Matrix3<f64>,
    pub coriolis: Matrix3<f64>,
    pub gravity: Vector3<f64>,
}

/// Plant model exposing its physics matrices for model-based control
pub trait PlantModel: Send + Sync {
    fn physics_matrices(&self, state: &StateVector) -> PhysicsMatrices;
}
