//! Common control-law interface and the closed set of controller variants
//!
//! Each variant implements [`ControlLaw`] with its own state type.
//! [`Controller`] and [`ControllerState`] wrap the four variants so callers
//! (simulators, the optimizer) can hold any controller behind one type that is
//! selected once, at construction, by the registry.

use dip_common::{DipError, HistoryLog, Result, StateVector};

use crate::kind::ControllerKind;
use crate::smc::adaptive::{AdaptiveSmc, AdaptiveState};
use crate::smc::classical::{ClassicalSmc, ClassicalState};
use crate::smc::hybrid::{HybridSmc, HybridState};
use crate::smc::super_twisting::{SuperTwistingSmc, SuperTwistingState};

/// A sliding-mode control law
pub trait ControlLaw {
    /// Mutable per-run state threaded through `compute_control`
    type State: Clone + std::fmt::Debug + PartialEq;

    const KIND: ControllerKind;

    /// Compute the saturated control and the next controller state.
    ///
    /// The returned force always satisfies `|u| ≤ max_force`. Non-finite
    /// state input fails with `InvalidState` before any telemetry is written.
    fn compute_control(
        &self,
        state: &StateVector,
        controller_state: &Self::State,
        history: &mut HistoryLog,
    ) -> Result<(f64, Self::State)>;

    /// Initial controller state
    fn reset(&self) -> Self::State;

    /// Copy of the gain vector
    fn gains(&self) -> Vec<f64>;

    fn max_force(&self) -> f64;

    fn n_gains(&self) -> usize {
        Self::KIND.n_gains()
    }
}

/// Any of the four controller variants
#[derive(Debug, Clone)]
pub enum Controller {
    Classical(ClassicalSmc),
    SuperTwisting(SuperTwistingSmc),
    Adaptive(AdaptiveSmc),
    Hybrid(HybridSmc),
}

/// State matching a [`Controller`] variant
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    Classical(ClassicalState),
    SuperTwisting(SuperTwistingState),
    Adaptive(AdaptiveState),
    Hybrid(HybridState),
}

impl ControllerState {
    pub fn kind(&self) -> ControllerKind {
        match self {
            Self::Classical(_) => ControllerKind::Classical,
            Self::SuperTwisting(_) => ControllerKind::SuperTwisting,
            Self::Adaptive(_) => ControllerKind::Adaptive,
            Self::Hybrid(_) => ControllerKind::Hybrid,
        }
    }

    /// Last applied control
    pub fn last_u(&self) -> f64 {
        match self {
            Self::Classical(s) => s.last_u,
            Self::SuperTwisting(s) => s.last_u,
            Self::Adaptive(s) => s.last_u,
            Self::Hybrid(s) => s.last_u,
        }
    }
}

impl Controller {
    pub fn kind(&self) -> ControllerKind {
        match self {
            Self::Classical(_) => ControllerKind::Classical,
            Self::SuperTwisting(_) => ControllerKind::SuperTwisting,
            Self::Adaptive(_) => ControllerKind::Adaptive,
            Self::Hybrid(_) => ControllerKind::Hybrid,
        }
    }

    /// Dispatch to the variant's control law.
    ///
    /// Fails with `Configuration` if `controller_state` belongs to another
    /// variant.
    pub fn compute_control(
        &self,
        state: &StateVector,
        controller_state: &ControllerState,
        history: &mut HistoryLog,
    ) -> Result<(f64, ControllerState)> {
        match (self, controller_state) {
            (Self::Classical(c), ControllerState::Classical(cs)) => c
                .compute_control(state, cs, history)
                .map(|(u, next)| (u, ControllerState::Classical(next))),
            (Self::SuperTwisting(c), ControllerState::SuperTwisting(cs)) => c
                .compute_control(state, cs, history)
                .map(|(u, next)| (u, ControllerState::SuperTwisting(next))),
            (Self::Adaptive(c), ControllerState::Adaptive(cs)) => c
                .compute_control(state, cs, history)
                .map(|(u, next)| (u, ControllerState::Adaptive(next))),
            (Self::Hybrid(c), ControllerState::Hybrid(cs)) => c
                .compute_control(state, cs, history)
                .map(|(u, next)| (u, ControllerState::Hybrid(next))),
            (controller, cs) => Err(DipError::Configuration(format!(
                "controller state for {} passed to {} controller",
                cs.kind(),
                controller.kind()
            ))),
        }
    }

    pub fn reset(&self) -> ControllerState {
        match self {
            Self::Classical(c) => ControllerState::Classical(c.reset()),
            Self::SuperTwisting(c) => ControllerState::SuperTwisting(c.reset()),
            Self::Adaptive(c) => ControllerState::Adaptive(c.reset()),
            Self::Hybrid(c) => ControllerState::Hybrid(c.reset()),
        }
    }

    pub fn gains(&self) -> Vec<f64> {
        match self {
            Self::Classical(c) => c.gains(),
            Self::SuperTwisting(c) => c.gains(),
            Self::Adaptive(c) => c.gains(),
            Self::Hybrid(c) => c.gains(),
        }
    }

    pub fn n_gains(&self) -> usize {
        self.kind().n_gains()
    }

    pub fn max_force(&self) -> f64 {
        match self {
            Self::Classical(c) => c.max_force(),
            Self::SuperTwisting(c) => c.max_force(),
            Self::Adaptive(c) => c.max_force(),
            Self::Hybrid(c) => c.max_force(),
        }
    }

    /// Step used by the integral and adaptation laws; `None` for the
    /// memoryless classical law.
    pub fn control_period(&self) -> Option<f64> {
        match self {
            Self::Classical(_) => None,
            Self::SuperTwisting(c) => Some(c.config().dt()),
            Self::Adaptive(c) => Some(c.config().dt()),
            Self::Hybrid(c) => Some(c.config().dt()),
        }
    }

    /// Copy of this controller integrating over `dt`.
    ///
    /// Fails with `Configuration` when `dt` is not positive or breaks a
    /// step-dependent bound of the variant.
    pub fn with_control_period(&self, dt: f64) -> Result<Self> {
        Ok(match self {
            Self::Classical(c) => Self::Classical(c.clone()),
            Self::SuperTwisting(c) => Self::SuperTwisting(c.with_dt(dt)?),
            Self::Adaptive(c) => Self::Adaptive(c.with_dt(dt)?),
            Self::Hybrid(c) => Self::Hybrid(c.with_dt(dt)?),
        })
    }
}

impl From<ClassicalSmc> for Controller {
    fn from(c: ClassicalSmc) -> Self {
        Self::Classical(c)
    }
}

impl From<SuperTwistingSmc> for Controller {
    fn from(c: SuperTwistingSmc) -> Self {
        Self::SuperTwisting(c)
    }
}

impl From<AdaptiveSmc> for Controller {
    fn from(c: AdaptiveSmc) -> Self {
        Self::Adaptive(c)
    }
}

impl From<HybridSmc> for Controller {
    fn from(c: HybridSmc) -> Self {
        Self::Hybrid(c)
    }
}
