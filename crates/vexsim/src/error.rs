//! Error types for session setup and configuration.

use thiserror::Error;
use vexsim_physics::PhysicsError;
use vexsim_robot::RobotError;

/// Errors that can occur while loading configuration or setting up a session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Physics world or field construction failed.
    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),

    /// Robot construction or robot configuration failed.
    #[error("Robot error: {0}")]
    Robot(#[from] RobotError),

    /// Configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be serialized.
    #[error("Config serialize error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Configuration values out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading a configuration file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
