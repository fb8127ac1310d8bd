//! # DIP Controllers
//!
//! Sliding-mode controllers for the double inverted pendulum.
//!
//! ## Building blocks
//!
//! - [`SlidingSurface`]: linear surface on the pendulum angle errors
//! - [`switching`]: boundary-layer switching law (`linear` / `tanh`)
//! - [`EquivalentControl`]: optional model-based feed-forward
//!
//! ## Variants
//!
//! | tag | gains |
//! |---|---|
//! | `classical_smc` | `[k1, k2, λ1, λ2, K, kd]` |
//! | `sta_smc` | `[K1, K2, k1, k2, λ1, λ2]` |
//! | `adaptive_smc` | `[k1, k2, λ1, λ2, γ]` |
//! | `hybrid_adaptive_sta_smc` | `[c1, λ1, c2, λ2]` |
//!
//! Controllers are built through a [`ControllerRegistry`] and driven through
//! the [`Controller`] enum:
//!
//! ```
//! use dip_common::{HistoryLog, StateVector};
//! use dip_controllers::ControllerRegistry;
//!
//! let registry = ControllerRegistry::new();
//! let controller = registry.create("classical_smc", None, None).unwrap();
//! let mut history = HistoryLog::new();
//! let state = StateVector::new([0.0, 0.05, 0.03, 0.0, 0.0, 0.0]);
//! let (u, _next) = controller
//!     .compute_control(&state, &controller.reset(), &mut history)
//!     .unwrap();
//! assert!(u.abs() <= controller.max_force());
//! ```

pub mod controller;
pub mod equivalent;
pub mod factory;
pub mod kind;
pub mod settings;
pub mod smc;
pub mod surface;
pub mod switching;
pub mod validation;

pub use controller::{ControlLaw, Controller, ControllerState};
pub use equivalent::EquivalentControl;
pub use factory::{ControllerMetadata, ControllerRegistry, REGISTRY_LOCK_TIMEOUT};
pub use kind::ControllerKind;
pub use settings::ControllerSettings;
pub use smc::{
    AdaptiveSmc, AdaptiveState, ClassicalSmc, ClassicalState, HybridMode, HybridSmc, HybridState,
    ModeThresholds, SuperTwistingSmc, SuperTwistingState,
};
pub use surface::SlidingSurface;
pub use switching::{switching, SwitchingMethod};
pub use validation::{validate_gains, GainConstraint};
