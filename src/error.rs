use thiserror::Error;

#[derive(Debug, Error)]
pub enum DamperError {
    /// No target pose source was available when the follower was initialized
    #[error("no target pose source assigned to damped follower")]
    MissingTargetSource,
    #[error("invalid damper parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        reason: &'static str,
    },
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    Json(#[from] serde_json::Error),
}
