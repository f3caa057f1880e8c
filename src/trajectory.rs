use std::f32::consts::PI;

use glam::{Quat, Vec3};
use noise::{NoiseFn, Perlin};

use crate::pose::Pose;

const REST_POSITION: Vec3 = Vec3::new(0.0, 1.2, -0.3);
const DRIFT_AMPLITUDE: f32 = 0.05;
const DRIFT_FREQUENCY: f32 = 0.5;
const PUNCH_PERIOD_SECS: f32 = 2.0;
const PUNCH_DURATION_SECS: f32 = 0.25;
const PUNCH_REACH: f32 = 0.4;
const ROLL_AMPLITUDE: f32 = 0.3;
const ROLL_FREQUENCY: f32 = 0.8;
// Noise samples per second, high enough to decorrelate consecutive ticks
const JITTER_SCALE: f64 = 37.0;

/// Scripted hand motion with tracking jitter on top: slow drift, a fast
/// punch stroke every couple of seconds and a gentle wrist roll.
pub struct HandTrajectory {
    perlin: Perlin,
    jitter_amplitude: f32,
}

impl HandTrajectory {
    pub fn new(seed: u32, jitter_amplitude: f32) -> HandTrajectory {
        Self {
            perlin: Perlin::new(seed),
            jitter_amplitude,
        }
    }

    /// Jitter free motion at time `t` seconds
    pub fn clean_pose(&self, t: f32) -> Pose {
        let drift = Vec3::new(DRIFT_AMPLITUDE * (DRIFT_FREQUENCY * t).sin(), 0.0, 0.0);

        let phase = t.rem_euclid(PUNCH_PERIOD_SECS);
        let reach = if phase < PUNCH_DURATION_SECS {
            PUNCH_REACH * (PI * phase / PUNCH_DURATION_SECS).sin()
        } else {
            0.0
        };
        let punch = Vec3::new(0.0, 0.0, -reach);

        let roll = Quat::from_rotation_z(ROLL_AMPLITUDE * (ROLL_FREQUENCY * t).sin());
        Pose::new(REST_POSITION + drift + punch, roll)
    }

    /// Tracked pose at time `t` seconds, clean motion plus jitter
    pub fn sample(&self, t: f32) -> Pose {
        let mut pose = self.clean_pose(t);
        if self.jitter_amplitude > 0.0 {
            pose.position += self.jitter_amplitude * self.jitter(t);
        }
        pose
    }

    fn jitter(&self, t: f32) -> Vec3 {
        let ft = t as f64 * JITTER_SCALE;
        // [-1; 1] per axis, separate noise rows so the axes are uncorrelated
        Vec3::new(
            self.perlin.get([ft, 0.5]) as f32,
            self.perlin.get([ft, 10.5]) as f32,
            self.perlin.get([ft, 20.5]) as f32,
        )
    }
}
