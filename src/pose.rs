use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position and attitude in world space
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Pose {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Pose {
        Self::new(position, Quat::IDENTITY)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Anything the follower can read a target pose from.
///
/// Returning `None` means the source is currently unavailable, e.g. the
/// tracked anchor was torn down by the host.
pub trait PoseSource {
    fn current_pose(&self) -> Option<Pose>;
}

impl PoseSource for Pose {
    fn current_pose(&self) -> Option<Pose> {
        Some(*self)
    }
}

impl PoseSource for Option<Pose> {
    fn current_pose(&self) -> Option<Pose> {
        *self
    }
}
