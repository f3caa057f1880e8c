//! Speed dependent pose damper
//!
//! Keeps a virtual pose that chases a target pose. Position follows with a
//! factor derived from quadratic drag on the speed needed to close the gap in
//! one tick, so slow motion is tracked almost instantly while fast motion
//! lags. Rotation follows with a speed independent slerp rate.

mod params;

use glam::Vec3;
use log::{debug, error, trace};

use crate::{
    error::DamperError,
    pose::{Pose, PoseSource},
};

pub use params::{
    DEFAULT_DRAG_SCALE, DEFAULT_MIN_FOLLOW_FACTOR, DEFAULT_ROTATION_FOLLOW_FACTOR, DamperParams,
    RECOMMENDED_DRAG_SCALE, RECOMMENDED_MIN_FOLLOW_FACTOR, RotationRate,
};

/// The mutable part of the filter: the current virtual pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    pub virtual_pose: Pose,
}

impl FilterState {
    /// Seeded from the target so the first tick starts with zero error
    pub fn seeded(target: Pose) -> FilterState {
        Self {
            virtual_pose: target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FollowerStatus {
    Uninitialized,
    Active(FilterState),
    /// Terminal until [`DampedFollower::enable`] is called
    Disabled,
}

/// `1 / (1 + k * v^2)`. Lies in `(0, 1]` for finite `v`, tends to 0 as `v` grows.
pub fn raw_follow_factor(speed: f32, drag_scale: f32) -> f32 {
    if drag_scale == 0.0 {
        // 0 * inf would poison the factor with NaN
        return 1.0;
    }
    let resistance = drag_scale * speed * speed;
    1.0 / (1.0 + resistance)
}

/// Position follow factor for closing `displacement` within `dt`, clamped
/// into `[min_follow_factor, 1]`.
///
/// `dt` must be positive.
pub fn follow_factor(displacement: Vec3, dt: f32, params: &DamperParams) -> f32 {
    debug_assert!(dt > 0.0);
    let relative_speed = displacement.length() / dt;
    // Overflow to inf gives 1/inf = 0, NaN falls through max() to the floor as well
    raw_follow_factor(relative_speed, params.drag_scale)
        .max(params.min_follow_factor)
        .min(1.0)
}

fn is_degenerate_dt(dt: f32) -> bool {
    !(dt.is_finite() && dt > 0.0)
}

/// Advance `state` one tick towards `target`, returning the new state and the
/// applied position follow factor. Degenerate ticks leave the state untouched.
fn step_with_factor(
    state: FilterState,
    target: &Pose,
    dt: f32,
    params: &DamperParams,
) -> (FilterState, Option<f32>) {
    if is_degenerate_dt(dt) {
        return (state, None);
    }
    let current = state.virtual_pose;
    let displacement = target.position - current.position;
    let alpha = follow_factor(displacement, dt, params);

    let position = current.position.lerp(target.position, alpha);
    let rotation = current
        .rotation
        .slerp(target.rotation, params.rotation.factor(dt));

    (
        FilterState {
            virtual_pose: Pose { position, rotation },
        },
        Some(alpha),
    )
}

/// Pure form of the per-tick update
pub fn step(state: FilterState, target: &Pose, dt: f32, params: &DamperParams) -> FilterState {
    step_with_factor(state, target, dt, params).0
}

/// Stateful follower wrapping [`step`] with the init / disable lifecycle
#[derive(Debug, Clone)]
pub struct DampedFollower {
    params: DamperParams,
    status: FollowerStatus,
    last_follow_factor: Option<f32>,
}

impl DampedFollower {
    pub fn new(params: DamperParams) -> Result<DampedFollower, DamperError> {
        params.validate()?;
        Ok(Self::with_valid_params(params))
    }

    fn with_valid_params(params: DamperParams) -> DampedFollower {
        Self {
            params,
            status: FollowerStatus::Uninitialized,
            last_follow_factor: None,
        }
    }

    /// Seed the virtual pose from `source`.
    ///
    /// Without a source (or with one that can't produce a pose) the follower
    /// reports a configuration error once and disables itself.
    pub fn initialize<S>(&mut self, source: Option<&S>) -> Result<Pose, DamperError>
    where
        S: PoseSource + ?Sized,
    {
        match self.status {
            FollowerStatus::Disabled => return Err(DamperError::MissingTargetSource),
            FollowerStatus::Active(state) => return Ok(state.virtual_pose),
            FollowerStatus::Uninitialized => {}
        }

        match source.and_then(|s| s.current_pose()) {
            Some(target) => {
                debug!("Damped follower seeded at {:?}", target.position);
                self.status = FollowerStatus::Active(FilterState::seeded(target));
                self.last_follow_factor = None;
                Ok(target)
            }
            None => {
                let err = DamperError::MissingTargetSource;
                error!("{err}. Disabling damped follower");
                self.status = FollowerStatus::Disabled;
                Err(err)
            }
        }
    }

    /// Read the target from `source` and advance one tick
    pub fn tick<S>(&mut self, source: Option<&S>, dt: f32) -> Option<Pose>
    where
        S: PoseSource + ?Sized,
    {
        let target = source.and_then(|s| s.current_pose());
        self.advance(target.as_ref(), dt)
    }

    /// Advance one tick towards `target`.
    ///
    /// Returns `None` while the follower is not active. An unavailable target
    /// or a zero `dt` keeps the previous virtual pose.
    pub fn advance(&mut self, target: Option<&Pose>, dt: f32) -> Option<Pose> {
        let FollowerStatus::Active(state) = self.status else {
            return None;
        };
        let Some(target) = target else {
            trace!("Target pose unavailable, skipping tick");
            return Some(state.virtual_pose);
        };
        if is_degenerate_dt(dt) {
            trace!("Degenerate dt {dt}, skipping tick");
            return Some(state.virtual_pose);
        }

        let (next, alpha) = step_with_factor(state, target, dt, &self.params);
        self.status = FollowerStatus::Active(next);
        self.last_follow_factor = alpha;
        Some(next.virtual_pose)
    }

    /// Re-enable a disabled follower. It has to be initialized again.
    pub fn enable(&mut self) {
        if self.status == FollowerStatus::Disabled {
            debug!("Re-enabling damped follower");
            self.status = FollowerStatus::Uninitialized;
        }
    }

    /// Move the virtual pose to `pose` without filtering, e.g. after the host
    /// recentered the tracking space. No-op unless active.
    pub fn snap_to(&mut self, pose: Pose) {
        if let FollowerStatus::Active(_) = self.status {
            self.status = FollowerStatus::Active(FilterState::seeded(pose));
        }
    }

    pub fn params(&self) -> &DamperParams {
        &self.params
    }

    /// Replace parameters while running. Invalid parameters are rejected and
    /// the current ones kept.
    pub fn set_params(&mut self, params: DamperParams) -> Result<(), DamperError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn status(&self) -> FollowerStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, FollowerStatus::Active(_))
    }

    pub fn virtual_pose(&self) -> Option<Pose> {
        match self.status {
            FollowerStatus::Active(state) => Some(state.virtual_pose),
            _ => None,
        }
    }

    /// Position follow factor applied on the last non-degenerate tick
    pub fn last_follow_factor(&self) -> Option<f32> {
        self.last_follow_factor
    }
}

impl Default for DampedFollower {
    fn default() -> Self {
        Self::with_valid_params(DamperParams::default())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Mutex, Once},
        thread::{self, ThreadId},
    };

    use glam::{Quat, Vec3};

    use super::*;

    const EPS: f32 = 1e-6;

    // Error records per test thread, tests run concurrently against one global logger
    static ERRORS: Mutex<Vec<ThreadId>> = Mutex::new(Vec::new());

    struct ErrorCapture;

    impl log::Log for ErrorCapture {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() == log::Level::Error
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                ERRORS.lock().unwrap().push(thread::current().id());
            }
        }

        fn flush(&self) {}
    }

    fn install_error_capture() {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| {
            log::set_logger(&ErrorCapture).unwrap();
            log::set_max_level(log::LevelFilter::Error);
        });
    }

    fn errors_logged_here() -> usize {
        let id = thread::current().id();
        ERRORS.lock().unwrap().iter().filter(|t| **t == id).count()
    }

    fn active_at(position: Vec3) -> DampedFollower {
        let mut follower = DampedFollower::default();
        follower
            .initialize(Some(&Pose::from_position(position)))
            .unwrap();
        follower
    }

    #[test]
    fn test_fast_jump_is_clamped_to_min_follow_factor() {
        let mut follower = active_at(Vec3::ZERO);
        let target = Pose::from_position(Vec3::new(10.0, 0.0, 0.0));
        let pose = follower.advance(Some(&target), 1.0).unwrap();

        assert!((pose.position - Vec3::new(0.5, 0.0, 0.0)).length() < EPS);
        assert_eq!(follower.last_follow_factor(), Some(0.05));
    }

    #[test]
    fn test_slow_motion_is_tracked_almost_instantly() {
        let mut follower = active_at(Vec3::ZERO);
        let target = Pose::from_position(Vec3::new(0.01, 0.0, 0.0));
        let pose = follower.advance(Some(&target), 1.0).unwrap();

        assert!((pose.position.x - 0.009999).abs() < 1e-6);
        assert_eq!(pose.position.y, 0.0);
        assert_eq!(pose.position.z, 0.0);
        let alpha = follower.last_follow_factor().unwrap();
        assert!((alpha - 0.9999).abs() < 1e-5);
    }

    #[test]
    fn test_zero_dt_leaves_state_untouched() {
        let mut follower = active_at(Vec3::new(1.0, 2.0, 3.0));
        let before = follower.status();
        let target = Pose::new(Vec3::new(-5.0, 0.0, 9.0), Quat::from_rotation_y(1.0));

        let pose = follower.advance(Some(&target), 0.0).unwrap();

        assert_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.rotation, Quat::IDENTITY);
        assert_eq!(follower.status(), before);
        assert_eq!(follower.last_follow_factor(), None);
    }

    #[test]
    fn test_pure_step_zero_dt_is_identity() {
        let state = FilterState::seeded(Pose::from_position(Vec3::ONE));
        let target = Pose::from_position(Vec3::new(4.0, 4.0, 4.0));
        assert_eq!(step(state, &target, 0.0, &DamperParams::default()), state);
        assert_eq!(step(state, &target, -0.1, &DamperParams::default()), state);
        assert_eq!(step(state, &target, f32::NAN, &DamperParams::default()), state);
    }

    #[test]
    fn test_first_tick_after_init_does_not_move() {
        let start = Pose::new(Vec3::new(0.3, 1.2, -0.4), Quat::from_rotation_z(0.5));
        let mut follower = DampedFollower::default();
        assert_eq!(follower.initialize(Some(&start)).unwrap(), start);

        let pose = follower.advance(Some(&start), 1.0 / 90.0).unwrap();
        assert_eq!(pose.position, start.position);
        assert!(pose.rotation.angle_between(start.rotation) < 5e-3);
        assert_eq!(follower.last_follow_factor(), Some(1.0));
    }

    #[test]
    fn test_follow_factor_stays_within_bounds() {
        let params = DamperParams::new(1.0, 0.05);
        for drag_scale in [0.0, 0.01, 0.5, 1.0, 5.0, 100.0] {
            for distance in [0.0, 1e-4, 0.01, 0.3, 2.0, 1e3, 1e20, f32::MAX] {
                let raw = raw_follow_factor(distance, drag_scale);
                assert!(raw >= 0.0 && raw <= 1.0, "raw {raw} for v={distance}");
                if distance < 1e3 {
                    assert!(raw > 0.0);
                }

                let params = DamperParams {
                    drag_scale,
                    ..params
                };
                let alpha = follow_factor(Vec3::new(distance, 0.0, 0.0), 1.0, &params);
                assert!(alpha >= params.min_follow_factor && alpha <= 1.0);
            }
        }
    }

    #[test]
    fn test_zero_drag_follows_directly() {
        let mut follower = DampedFollower::new(DamperParams::new(0.0, 0.05)).unwrap();
        follower.initialize(Some(&Pose::IDENTITY)).unwrap();
        let target = Pose::from_position(Vec3::new(100.0, -3.0, 7.0));
        let pose = follower.advance(Some(&target), 1.0 / 60.0).unwrap();
        assert_eq!(pose.position, target.position);
    }

    #[test]
    fn test_more_drag_means_less_follow() {
        let displacement = Vec3::new(0.0, 0.2, 0.1);
        let dt = 1.0 / 72.0;
        let mut previous = f32::INFINITY;
        for drag_scale in [0.0, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0] {
            let params = DamperParams::new(drag_scale, 0.001);
            let alpha = follow_factor(displacement, dt, &params);
            assert!(alpha <= previous);
            previous = alpha;
        }
    }

    #[test]
    fn test_converges_without_overshoot() {
        let mut follower = active_at(Vec3::ZERO);
        let target = Pose::new(Vec3::new(3.0, -1.0, 0.5), Quat::from_rotation_x(1.2));
        let mut last_distance = f32::INFINITY;
        let mut last_angle = f32::INFINITY;
        for _ in 0..200 {
            let pose = follower.advance(Some(&target), 1.0 / 90.0).unwrap();
            let distance = (target.position - pose.position).length();
            let angle = pose.rotation.angle_between(target.rotation);
            assert!(distance <= last_distance + EPS);
            assert!(angle <= last_angle + 5e-3);
            // Still on the segment between start and target
            assert!(pose.position.x <= target.position.x + EPS);
            assert!(pose.position.x >= 0.0);
            last_distance = distance;
            last_angle = angle;
        }
        assert!(last_distance < 1e-3);
        assert!(last_angle < 1e-2);
    }

    #[test]
    fn test_rotation_is_not_affected_by_speed() {
        let rotation = Quat::from_rotation_y(1.0);
        let mut slow = active_at(Vec3::ZERO);
        let mut fast = active_at(Vec3::ZERO);

        let slow_pose = slow
            .advance(Some(&Pose::new(Vec3::ZERO, rotation)), 0.1)
            .unwrap();
        let fast_pose = fast
            .advance(Some(&Pose::new(Vec3::splat(50.0), rotation)), 0.1)
            .unwrap();

        assert_eq!(slow_pose.rotation, fast_pose.rotation);
        // 0.1 of the way there
        assert!((slow_pose.rotation.angle_between(Quat::IDENTITY) - 0.1).abs() < 1e-4);
        assert!(slow_pose.rotation.is_normalized());
    }

    #[test]
    fn test_missing_source_disables_follower() {
        let mut follower = DampedFollower::default();
        let result = follower.initialize::<Pose>(None);
        assert!(matches!(result, Err(DamperError::MissingTargetSource)));
        assert_eq!(follower.status(), FollowerStatus::Disabled);

        // Further ticks don't execute
        assert!(follower.advance(Some(&Pose::IDENTITY), 0.1).is_none());
        assert!(follower.tick(Some(&Pose::IDENTITY), 0.1).is_none());
        assert!(follower.initialize(Some(&Pose::IDENTITY)).is_err());
    }

    #[test]
    fn test_missing_source_is_reported_once() {
        install_error_capture();
        let before = errors_logged_here();
        let mut follower = DampedFollower::default();

        let _ = follower.initialize::<Pose>(None);
        let _ = follower.initialize::<Pose>(None);
        let _ = follower.initialize(Some(&Pose::IDENTITY));
        follower.advance(Some(&Pose::IDENTITY), 0.1);

        assert_eq!(errors_logged_here() - before, 1);
    }

    #[test]
    fn test_invalid_params_are_rejected_at_construction() {
        let result = DampedFollower::new(DamperParams::new(f32::INFINITY, 0.0));
        assert!(matches!(result, Err(DamperError::InvalidParameter { .. })));
        assert!(DampedFollower::new(DamperParams::new(1.0, 1.0)).is_err());
        assert!(DampedFollower::new(DamperParams::new(0.5, 0.2)).is_ok());
    }

    #[test]
    fn test_unavailable_source_at_init_disables_follower() {
        let mut follower = DampedFollower::default();
        let revoked: Option<Pose> = None;
        assert!(follower.initialize(Some(&revoked)).is_err());
        assert!(!follower.is_active());
    }

    #[test]
    fn test_enable_after_disable_allows_init() {
        let mut follower = DampedFollower::default();
        let _ = follower.initialize::<Pose>(None);
        follower.enable();
        assert_eq!(follower.status(), FollowerStatus::Uninitialized);
        assert!(follower.initialize(Some(&Pose::IDENTITY)).is_ok());
        assert!(follower.is_active());
    }

    #[test]
    fn test_revoked_source_is_noop_tick() {
        let mut follower = active_at(Vec3::ZERO);
        let target = Pose::from_position(Vec3::new(0.02, 0.0, 0.0));
        let moved = follower.tick(Some(&target), 0.1).unwrap();

        let revoked: Option<Pose> = None;
        assert_eq!(follower.tick(Some(&revoked), 0.1), Some(moved));
        assert_eq!(follower.tick::<Pose>(None, 0.1), Some(moved));
    }

    #[test]
    fn test_uninitialized_follower_does_not_tick() {
        let mut follower = DampedFollower::default();
        assert!(follower.advance(Some(&Pose::IDENTITY), 0.1).is_none());
        assert!(follower.virtual_pose().is_none());
    }

    #[test]
    fn test_snap_to_skips_filtering() {
        let mut follower = active_at(Vec3::ZERO);
        let recentered = Pose::from_position(Vec3::new(100.0, 0.0, 0.0));
        follower.snap_to(recentered);
        assert_eq!(follower.virtual_pose(), Some(recentered));
    }

    #[test]
    fn test_invalid_params_are_rejected_while_running() {
        let mut follower = active_at(Vec3::ZERO);
        assert!(follower.set_params(DamperParams::new(1.0, 0.0)).is_err());
        assert_eq!(follower.params(), &DamperParams::default());
        assert!(follower.set_params(DamperParams::new(2.0, 0.1)).is_ok());
        assert_eq!(follower.params().drag_scale, 2.0);
    }
}
