use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::DamperError;

pub const DEFAULT_DRAG_SCALE: f32 = 1.0;
pub const DEFAULT_MIN_FOLLOW_FACTOR: f32 = 0.05;
pub const DEFAULT_ROTATION_FOLLOW_FACTOR: f32 = 0.1;

/// Operator tuning ranges. Values outside are accepted but logged.
pub const RECOMMENDED_DRAG_SCALE: (f32, f32) = (0.01, 5.0);
pub const RECOMMENDED_MIN_FOLLOW_FACTOR: (f32, f32) = (0.001, 0.5);

/// How fast the virtual rotation catches up with the target rotation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RotationRate {
    /// Fixed slerp factor applied every tick regardless of elapsed time.
    /// Catch-up speed therefore depends on the tick rate.
    PerTick(f32),
    /// Exponential catch-up rate in 1/s, factor is `1 - exp(-rate * dt)`
    PerSecond(f32),
}

impl RotationRate {
    /// Slerp factor for a tick of `dt` seconds
    pub fn factor(&self, dt: f32) -> f32 {
        match *self {
            RotationRate::PerTick(factor) => factor,
            RotationRate::PerSecond(rate) => 1.0 - (-rate * dt).exp(),
        }
    }
}

impl Default for RotationRate {
    fn default() -> Self {
        RotationRate::PerTick(DEFAULT_ROTATION_FOLLOW_FACTOR)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct DamperParams {
    /// Quadratic drag coefficient. Zero disables drag entirely
    pub drag_scale: f32,
    /// Floor for the per-tick position follow factor
    pub min_follow_factor: f32,
    pub rotation: RotationRate,
}

impl Default for DamperParams {
    fn default() -> Self {
        Self {
            drag_scale: DEFAULT_DRAG_SCALE,
            min_follow_factor: DEFAULT_MIN_FOLLOW_FACTOR,
            rotation: RotationRate::default(),
        }
    }
}

impl DamperParams {
    pub fn new(drag_scale: f32, min_follow_factor: f32) -> DamperParams {
        Self {
            drag_scale,
            min_follow_factor,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: RotationRate) -> DamperParams {
        self.rotation = rotation;
        self
    }

    /// Rejects values the update rule cannot work with and warns about values
    /// outside the usual tuning ranges.
    pub fn validate(&self) -> Result<(), DamperError> {
        if !self.drag_scale.is_finite() || self.drag_scale < 0.0 {
            return Err(DamperError::InvalidParameter {
                name: "drag_scale",
                value: self.drag_scale,
                reason: "must be finite and >= 0",
            });
        }
        if !(self.min_follow_factor > 0.0 && self.min_follow_factor < 1.0) {
            return Err(DamperError::InvalidParameter {
                name: "min_follow_factor",
                value: self.min_follow_factor,
                reason: "must lie in (0, 1)",
            });
        }
        match self.rotation {
            RotationRate::PerTick(factor) if !(factor > 0.0 && factor <= 1.0) => {
                return Err(DamperError::InvalidParameter {
                    name: "rotation.per_tick",
                    value: factor,
                    reason: "must lie in (0, 1]",
                });
            }
            RotationRate::PerSecond(rate) if !(rate.is_finite() && rate > 0.0) => {
                return Err(DamperError::InvalidParameter {
                    name: "rotation.per_second",
                    value: rate,
                    reason: "must be finite and > 0",
                });
            }
            _ => {}
        }

        // Zero drag is a legitimate "follow directly" setting, don't nag about it
        if self.drag_scale != 0.0 && !in_range(self.drag_scale, RECOMMENDED_DRAG_SCALE) {
            warn!(
                "drag_scale {} outside recommended range {:?}",
                self.drag_scale, RECOMMENDED_DRAG_SCALE
            );
        }
        if !in_range(self.min_follow_factor, RECOMMENDED_MIN_FOLLOW_FACTOR) {
            warn!(
                "min_follow_factor {} outside recommended range {:?}",
                self.min_follow_factor, RECOMMENDED_MIN_FOLLOW_FACTOR
            );
        }
        Ok(())
    }
}

fn in_range(value: f32, (min, max): (f32, f32)) -> bool {
    value >= min && value <= max
}
