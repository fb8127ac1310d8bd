//! Controller registry
//!
//! Maps controller kinds to construction metadata and builds [`Controller`]
//! instances. The registry is an explicit object handed to its users, never a
//! global. All access goes through one mutex acquired with a bounded wait.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use dip_common::{DipError, GainBounds, PlantModel, Result};

use crate::controller::Controller;
use crate::kind::ControllerKind;
use crate::settings::ControllerSettings;
use crate::smc::{
    AdaptiveConfig, AdaptiveSmc, ClassicalConfig, ClassicalSmc, HybridConfig, HybridSmc,
    SuperTwistingConfig, SuperTwistingSmc,
};
use crate::validation::validate_gains;

/// Default bound on registry lock acquisition
pub const REGISTRY_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Construction metadata for one controller kind
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerMetadata {
    pub kind: ControllerKind,
    pub description: String,
    pub default_gains: Vec<f64>,
    /// PSO search box, one `(lo, hi)` pair per gain
    pub default_bounds: Vec<(f64, f64)>,
    /// Settings that must be present, finite and > 0
    pub required_parameters: Vec<&'static str>,
}

impl ControllerMetadata {
    pub fn n_gains(&self) -> usize {
        self.kind.n_gains()
    }

    pub fn gain_names(&self) -> &'static [&'static str] {
        self.kind.gain_names()
    }

    /// Check the defaults against the kind's gain rules
    pub fn validate(&self) -> Result<()> {
        validate_gains(self.kind, &self.default_gains)?;
        let bounds = GainBounds::from_pairs(&self.default_bounds)?;
        self.kind.validate_bounds(&bounds)
    }

    fn builtin(kind: ControllerKind) -> Self {
        let (description, default_gains, default_bounds, required_parameters): (
            &str,
            Vec<f64>,
            Vec<(f64, f64)>,
            Vec<&'static str>,
        ) = match kind {
            ControllerKind::Classical => (
                "Classical SMC with boundary-layer switching and optional equivalent control",
                vec![77.62, 44.45, 17.31, 14.25, 18.66, 9.76],
                vec![
                    (1.0, 100.0),
                    (1.0, 100.0),
                    (1.0, 20.0),
                    (1.0, 20.0),
                    (5.0, 150.0),
                    (0.0, 10.0),
                ],
                vec!["max_force", "boundary_layer"],
            ),
            ControllerKind::SuperTwisting => (
                "Super-twisting second-order SMC with anti-windup integral",
                vec![25.0, 10.0, 15.0, 12.0, 20.0, 15.0],
                vec![
                    (2.0, 100.0),
                    (1.0, 99.0),
                    (1.0, 100.0),
                    (1.0, 100.0),
                    (1.0, 20.0),
                    (1.0, 20.0),
                ],
                vec!["max_force", "boundary_layer", "dt"],
            ),
            ControllerKind::Adaptive => (
                "Adaptive SMC with leaky gain adaptation and dead zone",
                vec![10.0, 8.0, 5.0, 4.0, 1.0],
                vec![
                    (1.0, 100.0),
                    (1.0, 100.0),
                    (1.0, 20.0),
                    (1.0, 20.0),
                    (0.1, 10.0),
                ],
                vec!["max_force", "boundary_layer", "dt", "k_max"],
            ),
            ControllerKind::Hybrid => (
                "Hybrid adaptive / super-twisting SMC with hysteretic mode switching",
                vec![5.0, 5.0, 5.0, 0.5],
                vec![(1.0, 50.0), (0.5, 20.0), (1.0, 50.0), (0.1, 20.0)],
                vec![
                    "max_force",
                    "boundary_layer",
                    "dt",
                    "k1_max",
                    "k2_max",
                    "u_int_max",
                    "s_aggressive_threshold",
                    "s_conservative_threshold",
                ],
            ),
        };
        Self {
            kind,
            description: description.to_string(),
            default_gains,
            default_bounds,
            required_parameters,
        }
    }
}

/// Thread-safe controller registry
pub struct ControllerRegistry {
    entries: Mutex<BTreeMap<ControllerKind, ControllerMetadata>>,
    lock_timeout: Duration,
    plant: Option<Arc<dyn PlantModel>>,
}

impl ControllerRegistry {
    /// Registry populated with the four built-in kinds
    pub fn new() -> Self {
        let entries = ControllerKind::ALL
            .into_iter()
            .map(|kind| (kind, ControllerMetadata::builtin(kind)))
            .collect();
        Self {
            entries: Mutex::new(entries),
            lock_timeout: REGISTRY_LOCK_TIMEOUT,
            plant: None,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Plant model handed to controllers that use equivalent control
    pub fn with_plant(mut self, plant: Arc<dyn PlantModel>) -> Self {
        self.plant = Some(plant);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<ControllerKind, ControllerMetadata>>> {
        self.entries
            .try_lock_for(self.lock_timeout)
            .ok_or(DipError::FactoryTimeout {
                timeout_ms: self.lock_timeout.as_millis() as u64,
            })
    }

    /// Registered type tags, sorted
    pub fn list_types(&self) -> Result<Vec<&'static str>> {
        let entries = self.lock()?;
        let mut tags: Vec<&'static str> = entries.keys().map(|k| k.tag()).collect();
        tags.sort_unstable();
        Ok(tags)
    }

    pub fn metadata(&self, tag: &str) -> Result<ControllerMetadata> {
        let kind: ControllerKind = tag.parse()?;
        self.metadata_for(kind)
    }

    fn metadata_for(&self, kind: ControllerKind) -> Result<ControllerMetadata> {
        self.lock()?
            .get(&kind)
            .cloned()
            .ok_or_else(|| DipError::UnknownController(kind.tag().to_string()))
    }

    /// Insert or replace the metadata for a kind
    pub fn register(&self, metadata: ControllerMetadata) -> Result<()> {
        metadata.validate()?;
        debug!(kind = %metadata.kind, "registering controller metadata");
        self.lock()?.insert(metadata.kind, metadata);
        Ok(())
    }

    pub fn default_gains(&self, tag: &str) -> Result<Vec<f64>> {
        Ok(self.metadata(tag)?.default_gains)
    }

    /// Default PSO search box for a kind
    pub fn default_bounds(&self, tag: &str) -> Result<GainBounds> {
        GainBounds::from_pairs(&self.metadata(tag)?.default_bounds)
    }

    /// Clamp `gains` into `bounds` and enforce the kind's ordering rules
    pub fn repair_gains(&self, tag: &str, gains: &mut [f64], bounds: &GainBounds) -> Result<()> {
        let kind: ControllerKind = tag.parse()?;
        kind.validate_bounds(bounds)?;
        kind.repair_gains(gains, bounds);
        Ok(())
    }

    /// Build a controller from a type tag.
    ///
    /// Gains are taken from `gains`, else `settings.gains`, else the
    /// registered defaults.
    #[instrument(level = "trace", skip(self, gains, settings))]
    pub fn create(
        &self,
        tag: &str,
        gains: Option<&[f64]>,
        settings: Option<&ControllerSettings>,
    ) -> Result<Controller> {
        let kind: ControllerKind = tag.parse()?;
        self.create_kind(kind, gains, settings)
    }

    pub fn create_kind(
        &self,
        kind: ControllerKind,
        gains: Option<&[f64]>,
        settings: Option<&ControllerSettings>,
    ) -> Result<Controller> {
        let metadata = self.metadata_for(kind)?;
        let defaults = ControllerSettings::default();
        let settings = settings.unwrap_or(&defaults);
        settings.require(&metadata.required_parameters)?;

        let gains = gains
            .or(settings.gains.as_deref())
            .unwrap_or(metadata.default_gains.as_slice());
        let plant = self.plant.clone();

        let controller = match kind {
            ControllerKind::Classical => {
                ClassicalSmc::new(ClassicalConfig::from_settings(gains, settings)?, plant)?.into()
            }
            ControllerKind::SuperTwisting => SuperTwistingSmc::new(
                SuperTwistingConfig::from_settings(gains, settings)?,
                plant,
            )?
            .into(),
            ControllerKind::Adaptive => {
                AdaptiveSmc::new(AdaptiveConfig::from_settings(gains, settings)?)?.into()
            }
            ControllerKind::Hybrid => {
                HybridSmc::new(HybridConfig::from_settings(gains, settings)?, plant)?.into()
            }
        };
        Ok(controller)
    }
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("lock_timeout", &self.lock_timeout)
            .field("has_plant", &self.plant.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dip_common::GainValidationError;
    use std::thread;

    #[test]
    fn test_list_types_sorted() {
        let registry = ControllerRegistry::new();
        assert_eq!(
            registry.list_types().unwrap(),
            vec!["adaptive_smc", "classical_smc", "hybrid_adaptive_sta_smc", "sta_smc"]
        );
    }

    #[test]
    fn test_builtin_metadata_is_valid() {
        let registry = ControllerRegistry::new();
        for kind in ControllerKind::ALL {
            let metadata = registry.metadata(kind.tag()).unwrap();
            metadata.validate().unwrap();
            assert_eq!(metadata.default_gains.len(), metadata.n_gains());
            assert!(registry.create(kind.tag(), None, None).is_ok());
        }
    }

    #[test]
    fn test_gain_resolution_order() {
        let registry = ControllerRegistry::new();
        let explicit = [10.0, 10.0, 2.0, 2.0, 20.0, 1.0];
        let from_settings = vec![20.0, 20.0, 3.0, 3.0, 30.0, 2.0];
        let settings = ControllerSettings {
            gains: Some(from_settings.clone()),
            ..ControllerSettings::default()
        };

        let c = registry
            .create("classical_smc", Some(&explicit), Some(&settings))
            .unwrap();
        assert_eq!(c.gains(), explicit.to_vec());

        let c = registry.create("classical_smc", None, Some(&settings)).unwrap();
        assert_eq!(c.gains(), from_settings);

        let c = registry.create("classical_smc", None, None).unwrap();
        assert_eq!(c.gains(), registry.default_gains("classical_smc").unwrap());
    }

    #[test]
    fn test_invalid_gains_name_the_violation() {
        let registry = ControllerRegistry::new();
        let err = registry
            .create("sta", Some(&[5.0, 5.0, 1.0, 1.0, 1.0, 1.0]), None)
            .unwrap_err();
        assert!(matches!(
            err,
            DipError::GainValidation(GainValidationError::OrderingViolated { .. })
        ));

        let err = registry.create("adaptive", Some(&[1.0; 6]), None).unwrap_err();
        assert!(matches!(
            err,
            DipError::GainValidation(GainValidationError::WrongCount { expected: 5, actual: 6, .. })
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let registry = ControllerRegistry::new();
        assert!(matches!(
            registry.create("lqr", None, None),
            Err(DipError::UnknownController(_))
        ));
    }

    #[test]
    fn test_missing_required_parameter() {
        let registry = ControllerRegistry::new();
        let settings = ControllerSettings {
            dt: 0.0,
            ..ControllerSettings::default()
        };
        assert!(matches!(
            registry.create("sta_smc", None, Some(&settings)),
            Err(DipError::Configuration(_))
        ));
    }

    #[test]
    fn test_register_overrides_defaults() {
        let registry = ControllerRegistry::new();
        let mut metadata = registry.metadata("hybrid").unwrap();
        metadata.default_gains = vec![2.0, 2.0, 2.0, 2.0];
        registry.register(metadata).unwrap();
        assert_eq!(registry.default_gains("hybrid").unwrap(), vec![2.0; 4]);

        let mut bad = registry.metadata("sta").unwrap();
        bad.default_gains = vec![1.0, 2.0, 1.0, 1.0, 1.0, 1.0];
        assert!(registry.register(bad).is_err());
    }

    #[test]
    fn test_repair_gains() {
        let registry = ControllerRegistry::new();
        let bounds = registry.default_bounds("sta_smc").unwrap();
        let mut gains = vec![10.0, 50.0, 5.0, 5.0, 5.0, 5.0];
        registry.repair_gains("sta_smc", &mut gains, &bounds).unwrap();
        assert!(registry.create("sta_smc", Some(&gains), None).is_ok());
    }

    #[test]
    fn test_lock_timeout() {
        let registry = ControllerRegistry::new().with_lock_timeout(Duration::from_millis(20));
        let guard = registry.entries.lock();
        let result = thread::scope(|scope| scope.spawn(|| registry.list_types()).join().unwrap());
        drop(guard);
        assert!(matches!(result, Err(DipError::FactoryTimeout { timeout_ms: 20 })));
        assert!(registry.list_types().is_ok());
    }

    #[test]
    fn test_concurrent_creates() {
        let registry = Arc::new(ControllerRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let kind = ControllerKind::ALL[i % 4];
                    (0..50)
                        .map(|_| registry.create_kind(kind, None, None).map(|c| c.kind()))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let kinds = handle.join().unwrap().unwrap();
            assert!(kinds.iter().all(|k| *k == ControllerKind::ALL[i % 4]));
        }
    }
}
