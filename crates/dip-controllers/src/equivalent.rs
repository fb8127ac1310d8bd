//! Model-based equivalent control
//!
//! Setting `ṡ = 0` on `M q̈ + C q̇ + G = B u` with `L = [0, k1, k2]` gives
//!
//! ```text
//! u_eq = (L·M⁻¹·(C·q̇ + G) − (k1·λ1·θ̇1 + k2·λ2·θ̇2)) / (L·M⁻¹·B)
//! ```
//!
//! The term is dropped (0) when `M` is not invertible or the control
//! effectiveness `L·M⁻¹·B` is too small, and it is clipped to
//! `±10·max_force` so it cannot pre-saturate the actuator on its own.

use std::sync::Arc;

use nalgebra::Vector3;
use tracing::trace;

use dip_common::{PlantModel, StateVector, EQUIVALENT_CONTROL_LIMIT_FACTOR};

use crate::surface::SlidingSurface;

/// Smallest `|L·M⁻¹·B|` for which the equivalent control is computed
pub const MIN_CONTROL_EFFECTIVENESS: f64 = 1e-6;

/// Equivalent control term bound to a plant model
#[derive(Clone)]
pub struct EquivalentControl {
    plant: Arc<dyn PlantModel>,
    limit: f64,
}

impl EquivalentControl {
    pub fn new(plant: Arc<dyn PlantModel>, max_force: f64) -> Self {
        Self {
            plant,
            limit: EQUIVALENT_CONTROL_LIMIT_FACTOR * max_force,
        }
    }

    /// Equivalent control for `surface` at `state`, already clipped
    pub fn compute(&self, surface: &SlidingSurface, state: &StateVector) -> f64 {
        let pm = self.plant.physics_matrices(state);
        let Some(m_inv) = pm.inertia.try_inverse() else {
            trace!("inertia matrix not invertible, equivalent control dropped");
            return 0.0;
        };

        let l = Vector3::from(surface.acceleration_row());
        let b = Vector3::new(1.0, 0.0, 0.0);
        let l_minv = l.transpose() * m_inv;

        let effectiveness = (l_minv * b)[(0, 0)];
        if !effectiveness.is_finite() || effectiveness.abs() < MIN_CONTROL_EFFECTIVENESS {
            trace!(effectiveness, "control effectiveness too small, equivalent control dropped");
            return 0.0;
        }

        let q_dot = Vector3::from(state.velocities());
        let drift = pm.coriolis * q_dot + pm.gravity;
        let numerator = (l_minv * drift)[(0, 0)] - surface.derivative_terms(state);

        let u_eq = numerator / effectiveness;
        if !u_eq.is_finite() {
            return 0.0;
        }
        u_eq.clamp(-self.limit, self.limit)
    }
}

impl std::fmt::Debug for EquivalentControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EquivalentControl")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}
