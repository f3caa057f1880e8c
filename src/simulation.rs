use std::time::Duration;

use hecs::{Entity, World};
use log::{info, warn};
use serde::Serialize;

use crate::{
    config::DamperConfig,
    damper::DamperParams,
    ecs::{
        Damper, Transform, set_anchor_pose, spawn_damped_proxy, spawn_hand_anchor,
        system_damped_follow,
    },
    error::DamperError,
    metrics::{FollowMetrics, MetricsSummary},
    pose::Pose,
    trajectory::HandTrajectory,
};

/// Upper bound for the metrics averaging window, about 12 minutes at 90 Hz.
/// Shorter runs average over all of their ticks.
const MAX_METRICS_WINDOW: u64 = 1 << 16;

#[derive(Serialize, Debug, Clone)]
pub struct SimulationReport {
    pub params: DamperParams,
    pub ticks_per_second: u32,
    pub duration_secs: f32,
    pub metrics: MetricsSummary,
    pub final_target: Pose,
    pub final_virtual: Option<Pose>,
}

/// Runs a hand anchor along a jittery trajectory with a damped proxy chasing
/// it, in fixed steps and without rendering
pub struct HeadlessSimulation {
    world: World,
    anchor: Entity,
    proxy: Entity,
    trajectory: HandTrajectory,
    params: DamperParams,
    ticks_per_second: u32,
    duration_secs: f32,
    metrics: FollowMetrics,
    last_target: Pose,
}

impl HeadlessSimulation {
    pub fn new(config: &DamperConfig) -> Result<Self, DamperError> {
        let sim = &config.simulation;
        let trajectory = HandTrajectory::new(sim.seed, sim.jitter_amplitude);
        let start = trajectory.sample(0.0);

        let mut world = World::new();
        let anchor = spawn_hand_anchor(&mut world, start);
        let proxy = spawn_damped_proxy(&mut world, Some(anchor), config.damper)?;

        let window =
            total_ticks(sim.ticks_per_second, sim.duration_secs).clamp(1, MAX_METRICS_WINDOW);
        Ok(Self {
            world,
            anchor,
            proxy,
            trajectory,
            params: config.damper,
            ticks_per_second: sim.ticks_per_second,
            duration_secs: sim.duration_secs,
            metrics: FollowMetrics::new(window as usize),
            last_target: start,
        })
    }

    pub fn run(&mut self) -> SimulationReport {
        info!(
            "Starting headless damper simulation: {} ticks/s for {:.1}s",
            self.ticks_per_second, self.duration_secs
        );
        let tick_duration =
            Duration::from_nanos(1_000_000_000 / self.ticks_per_second.max(1) as u64);
        let mut elapsed = Duration::ZERO;

        for _ in 0..total_ticks(self.ticks_per_second, self.duration_secs) {
            elapsed += tick_duration;
            self.tick(tick_duration.as_secs_f32(), elapsed.as_secs_f32());
        }

        let report = self.report();
        info!(
            "Simulation done after {} ticks, avg lag {:.4} m",
            report.metrics.ticks, report.metrics.avg_lag
        );
        report
    }

    pub fn tick(&mut self, dt: f32, t: f32) {
        let target = self.trajectory.sample(t);
        if !set_anchor_pose(&mut self.world, self.anchor, target) {
            warn!("Hand anchor {:?} is gone", self.anchor);
        }
        self.last_target = target;

        system_damped_follow(&mut self.world, dt);

        let filtered = self.proxy_pose();
        let follow_factor = self
            .world
            .get::<&Damper>(self.proxy)
            .ok()
            .and_then(|damper| damper.0.last_follow_factor());
        if let Some(filtered) = filtered {
            self.metrics
                .record(target.position, filtered.position, follow_factor);
        }
    }

    pub fn proxy_pose(&self) -> Option<Pose> {
        self.world
            .get::<&Transform>(self.proxy)
            .ok()
            .map(|transform| transform.pose())
    }

    pub fn world(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn anchor(&self) -> Entity {
        self.anchor
    }

    pub fn report(&self) -> SimulationReport {
        let final_virtual = self
            .world
            .get::<&Damper>(self.proxy)
            .ok()
            .and_then(|damper| damper.0.virtual_pose());
        SimulationReport {
            params: self.params,
            ticks_per_second: self.ticks_per_second,
            duration_secs: self.duration_secs,
            metrics: self.metrics.summary(),
            final_target: self.last_target,
            final_virtual,
        }
    }
}

fn total_ticks(ticks_per_second: u32, duration_secs: f32) -> u64 {
    (duration_secs * ticks_per_second as f32).round().max(0.0) as u64
}
