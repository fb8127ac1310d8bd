//! Tuned gain files
//!
//! A tuned controller is stored as a flat JSON object:
//!
//! ```json
//! { "controller": "classical_smc", "gains": [77.62, 44.45, 17.31, 14.25, 18.66, 9.76], "cost": 0.42 }
//! ```
//!
//! Extra fields written by other tools are ignored on load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use dip_common::Result;
use dip_controllers::{Controller, ControllerKind, ControllerRegistry, ControllerSettings};

use crate::pso::TuningResult;

/// Persistable best gains of a tuning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunedGains {
    pub controller: ControllerKind,
    pub gains: Vec<f64>,
    pub cost: f64,
}

impl From<&TuningResult> for TunedGains {
    fn from(result: &TuningResult) -> Self {
        Self {
            controller: result.controller,
            gains: result.best_gains.clone(),
            cost: result.best_cost,
        }
    }
}

impl TunedGains {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), controller = %self.controller, "saved tuned gains");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Rebuild the tuned controller through the registry
    pub fn into_controller(
        &self,
        registry: &ControllerRegistry,
        settings: Option<&ControllerSettings>,
    ) -> Result<Controller> {
        registry.create_kind(self.controller, Some(&self.gains), settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_layout() {
        let tuned = TunedGains {
            controller: ControllerKind::SuperTwisting,
            gains: vec![8.0, 4.0, 5.0, 3.0, 2.0, 1.5],
            cost: 0.25,
        };
        let value: serde_json::Value = serde_json::from_str(&tuned.to_json().unwrap()).unwrap();
        assert_eq!(value["controller"], "sta_smc");
        assert_eq!(value["gains"].as_array().unwrap().len(), 6);

        let back = TunedGains::from_json(&tuned.to_json().unwrap()).unwrap();
        assert_eq!(back, tuned);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let json = r#"{"run_id": "x", "controller": "adaptive_smc", "gains": [10, 8, 5, 4, 1], "cost": 1.5}"#;
        let tuned = TunedGains::from_json(json).unwrap();
        assert_eq!(tuned.controller, ControllerKind::Adaptive);
        let controller = tuned.into_controller(&ControllerRegistry::new(), None).unwrap();
        assert_eq!(controller.gains(), vec![10.0, 8.0, 5.0, 4.0, 1.0]);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("dip-tuned-{}.json", std::process::id()));
        let tuned = TunedGains {
            controller: ControllerKind::Hybrid,
            gains: vec![5.0, 5.0, 5.0, 0.5],
            cost: 3.0,
        };
        tuned.save(&path).unwrap();
        let loaded = TunedGains::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, tuned);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            TunedGains::from_json("{\"controller\": 3}"),
            Err(dip_common::DipError::Serialization(_))
        ));
    }
}
