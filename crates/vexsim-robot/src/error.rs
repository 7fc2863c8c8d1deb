//! Error types for robot construction and manipulation.

use thiserror::Error;
use vexsim_physics::PhysicsError;

/// Errors that can occur while building the robot or spawning pieces.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RobotError {
    /// The physics facade rejected an operation.
    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),

    /// Configuration values out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for robot operations.
pub type Result<T> = std::result::Result<T, RobotError>;
