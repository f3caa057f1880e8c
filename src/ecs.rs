//! hecs embedding of the damper
//!
//! A damped proxy entity carries its own `Transform`, a `Damper` and a
//! `TargetAnchor` pointing at the entity whose transform is tracked.

use glam::{Mat4, Vec3};
use hecs::{Entity, World};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    damper::{DampedFollower, DamperParams, FollowerStatus},
    error::DamperError,
    pose::{Pose, PoseSource},
};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Transform(pub Mat4);

impl Transform {
    pub fn from_pose(pose: Pose) -> Transform {
        Self(Mat4::from_rotation_translation(pose.rotation, pose.position))
    }

    pub fn pose(&self) -> Pose {
        let (_scale, rotation, translation) = self.0.to_scale_rotation_translation();
        Pose::new(translation, rotation)
    }

    /// Replace rotation and translation, keep the scale
    pub fn set_pose(&mut self, pose: Pose) {
        let scale = Vec3::new(
            self.0.x_axis.truncate().length(),
            self.0.y_axis.truncate().length(),
            self.0.z_axis.truncate().length(),
        );
        self.0 = Mat4::from_scale_rotation_translation(scale, pose.rotation, pose.position);
    }
}

impl PoseSource for Transform {
    fn current_pose(&self) -> Option<Pose> {
        Some(self.pose())
    }
}

/// Marks an entity driven directly by tracking input
pub struct HandAnchor;

/// Entity whose transform a damper follows. `None` means unassigned.
pub struct TargetAnchor(pub Option<Entity>);

pub struct Damper(pub DampedFollower);

pub fn spawn_hand_anchor(world: &mut World, pose: Pose) -> Entity {
    world.spawn((HandAnchor, Transform::from_pose(pose)))
}

pub fn spawn_damped_proxy(
    world: &mut World,
    anchor: Option<Entity>,
    params: DamperParams,
) -> Result<Entity, DamperError> {
    let follower = DampedFollower::new(params)?;
    let start = anchor
        .and_then(|anchor| anchor_pose(world, anchor))
        .unwrap_or_default();
    let entity = world.spawn((
        Transform::from_pose(start),
        TargetAnchor(anchor),
        Damper(follower),
    ));
    debug!("Spawned damped proxy {entity:?} following {anchor:?}");
    Ok(entity)
}

/// Pose of `anchor`, `None` if it was despawned or has no transform
pub fn anchor_pose(world: &World, anchor: Entity) -> Option<Pose> {
    world
        .get::<&Transform>(anchor)
        .ok()
        .and_then(|transform| transform.current_pose())
}

pub fn set_anchor_pose(world: &mut World, anchor: Entity, pose: Pose) -> bool {
    match world.get::<&mut Transform>(anchor) {
        Ok(mut transform) => {
            transform.set_pose(pose);
            true
        }
        Err(_) => false,
    }
}

/// Initialize fresh dampers, advance active ones and write the virtual pose
/// back into the proxy transform. Meant to run after anchors were updated.
pub fn system_damped_follow(world: &mut World, dt: f32) {
    // Resolve anchors first, the proxies are mutated in the second pass
    let world_ref: &World = world;
    let targets: Vec<(Entity, Option<Pose>)> = world_ref
        .query::<(&TargetAnchor, &Damper)>()
        .iter()
        .map(|(entity, (anchor, _))| {
            let target = anchor.0.and_then(|anchor| anchor_pose(world_ref, anchor));
            (entity, target)
        })
        .collect();

    for (entity, target) in targets {
        let Ok((damper, transform)) = world.query_one_mut::<(&mut Damper, &mut Transform)>(entity)
        else {
            continue;
        };
        let follower = &mut damper.0;
        if follower.status() == FollowerStatus::Uninitialized
            && follower.initialize(target.as_ref()).is_err()
        {
            continue;
        }
        if let Some(pose) = follower.advance(target.as_ref(), dt) {
            transform.set_pose(pose);
        }
    }
}
