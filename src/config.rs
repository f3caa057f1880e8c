use std::{fs, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{damper::DamperParams, error::DamperError};

/// Settings for the headless demo run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub ticks_per_second: u32,
    pub duration_secs: f32,
    /// Peak amplitude of the tracking jitter added to the hand path, in meters
    pub jitter_amplitude: f32,
    pub seed: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 90,
            duration_secs: 5.0,
            jitter_amplitude: 0.004,
            seed: 7,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DamperConfig {
    pub damper: DamperParams,
    pub simulation: SimulationConfig,
}

impl DamperConfig {
    pub fn from_json(input: &str) -> Result<DamperConfig, DamperError> {
        let config: DamperConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<DamperConfig, DamperError> {
        let path = path.as_ref();
        debug!("Loading damper config from {}", path.display());
        let input = fs::read_to_string(path)?;
        Self::from_json(&input)
    }

    pub fn validate(&self) -> Result<(), DamperError> {
        self.damper.validate()?;
        let sim = &self.simulation;
        if sim.ticks_per_second == 0 {
            return Err(DamperError::InvalidParameter {
                name: "simulation.ticks_per_second",
                value: 0.0,
                reason: "must be > 0",
            });
        }
        if !(sim.duration_secs.is_finite() && sim.duration_secs >= 0.0) {
            return Err(DamperError::InvalidParameter {
                name: "simulation.duration_secs",
                value: sim.duration_secs,
                reason: "must be finite and >= 0",
            });
        }
        if !(sim.jitter_amplitude.is_finite() && sim.jitter_amplitude >= 0.0) {
            return Err(DamperError::InvalidParameter {
                name: "simulation.jitter_amplitude",
                value: sim.jitter_amplitude,
                reason: "must be finite and >= 0",
            });
        }
        Ok(())
    }
}
