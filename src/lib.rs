//! Speed dependent damping of tracked hand poses
//!
//! [`damper::DampedFollower`] keeps a virtual pose that chases a jittery
//! target: slow motion is tracked almost instantly, fast motion lags behind
//! under quadratic drag. [`ecs`] wires it into a hecs world and
//! [`simulation`] drives it headless.

pub mod config;
pub mod damper;
pub mod ecs;
pub mod error;
pub mod metrics;
pub mod pose;
pub mod simulation;
pub mod trajectory;

pub use damper::{DampedFollower, DamperParams, FilterState, FollowerStatus, RotationRate};
pub use error::DamperError;
pub use pose::{Pose, PoseSource};
