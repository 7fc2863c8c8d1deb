//! Error types for the physics facade.

use thiserror::Error;

/// Errors that can occur while building or driving the physics world.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// The world failed to initialize and is running inert.
    #[error("Physics world is not initialized")]
    NotInitialized,

    /// Settings rejected during world setup.
    #[error("Invalid physics settings: {0}")]
    InvalidSettings(String),

    /// Body handle does not refer to a live body.
    #[error("Rigid body not found: {0:?}")]
    UnknownBody(crate::BodyHandle),

    /// Body exists but carries no collider.
    #[error("Rigid body has no collider: {0:?}")]
    NoCollider(crate::BodyHandle),

    /// Joint handle does not refer to a live joint.
    #[error("Joint not found: {0:?}")]
    UnknownJoint(crate::JointHandle),

    /// Failed to create collision shape.
    #[error("Failed to create collision shape for {name}: {reason}")]
    CollisionShape {
        /// Shape name.
        name: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Result type for physics operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;
