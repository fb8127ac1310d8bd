//! Nonlinear double inverted pendulum on a cart
//!
//! Generalized coordinates `q = [x, θ1, θ2]` with both angles absolute and
//! measured from upright. A positive angle leans the link toward −x, so a
//! positive cart force accelerates both links toward larger angles.
//!
//! ```text
//! M(q) q̈ + C(q, q̇) q̇ + G(q) = [u, 0, 0]ᵀ
//!
//! h1 = m1·lc1 + m2·l1     h2 = m2·lc2     h3 = m2·l1·lc2
//! j1 = m1·lc1² + m2·l1² + I1              j2 = m2·lc2² + I2
//!
//!     ⎡ m0+m1+m2    −h1·cos θ1        −h2·cos θ2      ⎤
//! M = ⎢ −h1·cos θ1   j1                h3·cos(θ1−θ2)  ⎥
//!     ⎣ −h2·cos θ2   h3·cos(θ1−θ2)     j2             ⎦
//!
//!     ⎡ b0   h1·sin θ1·θ̇1          h2·sin θ2·θ̇2      ⎤
//! C = ⎢ 0    b1                     h3·sin(θ1−θ2)·θ̇2 ⎥
//!     ⎣ 0    −h3·sin(θ1−θ2)·θ̇1     b2               ⎦
//!
//! G = [0, −h1·g·sin θ1, −h2·g·sin θ2]ᵀ
//! ```

use nalgebra::{Matrix3, Vector3};
use tracing::trace;

use dip_common::{
    DynamicsModel, DynamicsResult, PhysicsMatrices, PlantModel, Result, StateVector,
};

use crate::params::PendulumParams;

/// Reference DIP plant
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleInvertedPendulum {
    params: PendulumParams,
    h1: f64,
    h2: f64,
    h3: f64,
    j1: f64,
    j2: f64,
    total_mass: f64,
}

impl DoubleInvertedPendulum {
    pub fn new(params: PendulumParams) -> Result<Self> {
        params.validate()?;
        let p = &params;
        Ok(Self {
            h1: p.pendulum1_mass * p.pendulum1_com + p.pendulum2_mass * p.pendulum1_length,
            h2: p.pendulum2_mass * p.pendulum2_com,
            h3: p.pendulum2_mass * p.pendulum1_length * p.pendulum2_com,
            j1: p.pendulum1_mass * p.pendulum1_com.powi(2)
                + p.pendulum2_mass * p.pendulum1_length.powi(2)
                + p.pendulum1_inertia,
            j2: p.pendulum2_mass * p.pendulum2_com.powi(2) + p.pendulum2_inertia,
            total_mass: p.cart_mass + p.pendulum1_mass + p.pendulum2_mass,
            params,
        })
    }

    pub fn params(&self) -> &PendulumParams {
        &self.params
    }

    /// Kinetic plus potential energy, zero potential at the pivot height
    pub fn energy(&self, state: &StateVector) -> f64 {
        let pm = self.physics_matrices(state);
        let q_dot = Vector3::from(state.velocities());
        let kinetic = 0.5 * q_dot.dot(&(pm.inertia * q_dot));
        let potential = self.params.gravity
            * (self.h1 * state.theta1().cos() + self.h2 * state.theta2().cos());
        kinetic + potential
    }
}

impl PlantModel for DoubleInvertedPendulum {
    fn physics_matrices(&self, state: &StateVector) -> PhysicsMatrices {
        let (s1, c1) = state.theta1().sin_cos();
        let (s2, c2) = state.theta2().sin_cos();
        let (s12, c12) = (state.theta1() - state.theta2()).sin_cos();
        let (t1d, t2d) = (state.theta1_dot(), state.theta2_dot());
        let p = &self.params;

        #[rustfmt::skip]
        let inertia = Matrix3::new(
            self.total_mass,   -self.h1 * c1,    -self.h2 * c2,
            -self.h1 * c1,     self.j1,          self.h3 * c12,
            -self.h2 * c2,     self.h3 * c12,    self.j2,
        );
        #[rustfmt::skip]
        let coriolis = Matrix3::new(
            p.cart_friction,   self.h1 * s1 * t1d,          self.h2 * s2 * t2d,
            0.0,               p.joint1_friction,           self.h3 * s12 * t2d,
            0.0,               -self.h3 * s12 * t1d,        p.joint2_friction,
        );
        let gravity = Vector3::new(0.0, -self.h1 * p.gravity * s1, -self.h2 * p.gravity * s2);

        PhysicsMatrices {
            inertia,
            coriolis,
            gravity,
        }
    }
}

impl DynamicsModel for DoubleInvertedPendulum {
    fn step(&self, state: &StateVector, control: f64) -> DynamicsResult {
        if !state.is_finite() || !control.is_finite() {
            return DynamicsResult::failed();
        }
        let pm = self.physics_matrices(state);
        let q_dot = Vector3::from(state.velocities());
        let rhs = Vector3::new(control, 0.0, 0.0) - pm.coriolis * q_dot - pm.gravity;

        let Some(chol) = pm.inertia.cholesky() else {
            trace!(%state, "inertia matrix is not positive definite");
            return DynamicsResult::failed();
        };
        let q_ddot = chol.solve(&rhs);
        if q_ddot.iter().any(|v| !v.is_finite()) {
            return DynamicsResult::failed();
        }

        let [xd, t1d, t2d] = state.velocities();
        DynamicsResult::ok([xd, t1d, t2d, q_ddot[0], q_ddot[1], q_ddot[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::Integrator;

    fn plant() -> DoubleInvertedPendulum {
        DoubleInvertedPendulum::new(PendulumParams::default()).unwrap()
    }

    #[test]
    fn test_upright_is_equilibrium() {
        let result = plant().step(&StateVector::upright(), 0.0);
        assert!(result.success);
        assert!(result.state_derivative.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_tilt_falls_further() {
        let result = plant().step(&StateVector::new([0.0, 0.1, 0.0, 0.0, 0.0, 0.0]), 0.0);
        assert!(result.success);
        assert!(result.state_derivative[4] > 0.0);
    }

    #[test]
    fn test_positive_force_effectiveness() {
        // L·M⁻¹·B > 0 for positive surface gains
        let p = plant();
        let d = p.step(&StateVector::upright(), 1.0).state_derivative;
        assert!(d[3] > 0.0);
        assert!(d[4] > 0.0);
        assert!(d[5] > 0.0);
    }

    #[test]
    fn test_inertia_symmetric_positive_definite() {
        let pm = plant().physics_matrices(&StateVector::new([0.3, 0.7, -1.2, 0.0, 2.0, -1.0]));
        assert_eq!(pm.inertia, pm.inertia.transpose());
        assert!(pm.inertia.cholesky().is_some());
    }

    #[test]
    fn test_non_finite_input_fails() {
        let p = plant();
        assert!(!p.step(&StateVector::upright(), f64::NAN).success);
        assert!(!p.step(&StateVector::new([f64::INFINITY; 6]), 0.0).success);
    }

    #[test]
    fn test_energy_conserved_without_friction() {
        let params = PendulumParams {
            cart_friction: 0.0,
            joint1_friction: 0.0,
            joint2_friction: 0.0,
            ..PendulumParams::default()
        };
        let p = DoubleInvertedPendulum::new(params).unwrap();
        let mut state = StateVector::new([0.0, 0.1, -0.05, 0.0, 0.0, 0.0]);
        let e0 = p.energy(&state);
        for _ in 0..1000 {
            state = Integrator::Rk4.step(&p, &state, 0.0, 1e-3).unwrap();
        }
        assert!((p.energy(&state) - e0).abs() < 1e-6);
    }
}
