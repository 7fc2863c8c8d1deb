//! The narrow physics contract the robot and session code are written against.

use nalgebra::{Isometry3, Vector3};
use rapier3d::dynamics::{ImpulseJointHandle, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use crate::colliders::Geometry;
use crate::error::Result;
use crate::filter::FilterData;
use crate::joints::{MotorState, RevoluteMotorDesc};

/// Stable handle to a rigid body owned by the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) RigidBodyHandle);

/// Stable handle to a joint owned by the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle(pub(crate) ImpulseJointHandle);

/// Surface properties of a collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Coulomb friction coefficient.
    pub friction: f32,
    /// Restitution (0 = no bounce).
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

/// Whether a body moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves.
    Static,
    /// Fully simulated.
    Dynamic,
}

/// Rigid body creation parameters.
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    /// Static or dynamic.
    pub kind: BodyKind,
    /// Initial world pose.
    pub pose: Isometry3<f32>,
    /// Linear velocity damping.
    pub linear_damping: f32,
    /// Angular velocity damping.
    pub angular_damping: f32,
}

impl BodyDesc {
    /// A static body at `pose`.
    pub fn fixed(pose: Isometry3<f32>) -> Self {
        Self {
            kind: BodyKind::Static,
            pose,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    /// An undamped dynamic body at `pose`.
    pub fn dynamic(pose: Isometry3<f32>) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            ..Self::fixed(pose)
        }
    }

    /// Set linear and angular damping.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }
}

/// Collider creation parameters.
#[derive(Debug, Clone)]
pub struct ColliderDesc {
    /// Shape of the collider.
    pub geometry: Geometry,
    /// Surface material; the world default when `None`.
    pub material: Option<Material>,
    /// Mass density (kg/m³), used to derive mass and inertia.
    pub density: f32,
    /// Collision category and mask.
    pub filter: FilterData,
    /// Trigger volume: reports intersections, never responds.
    pub sensor: bool,
}

impl ColliderDesc {
    /// A solid collider with unit density and the default material.
    pub fn new(geometry: Geometry, filter: FilterData) -> Self {
        Self {
            geometry,
            material: None,
            density: 1.0,
            filter,
            sensor: false,
        }
    }

    /// Set density.
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Override the material.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    /// Turn the collider into a trigger volume.
    pub fn as_sensor(mut self) -> Self {
        self.sensor = true;
        self
    }
}

/// Operations the simulation needs from a physics engine.
///
/// Bodies and joints are owned by the implementor; callers only ever hold
/// handles, which go stale (and fail lookups) once the object is removed.
pub trait PhysicsFacade {
    /// Create a rigid body.
    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle>;

    /// Attach a collider to a body.
    fn attach_collider(&mut self, body: BodyHandle, desc: &ColliderDesc) -> Result<()>;

    /// Remove a body, its colliders and every joint attached to it.
    fn remove_body(&mut self, body: BodyHandle) -> Result<()>;

    /// Set the collision filter of every collider on a body.
    fn set_filter(&mut self, body: BodyHandle, filter: FilterData) -> Result<()>;

    /// Collision filter of the body's first collider.
    fn filter(&self, body: BodyHandle) -> Option<FilterData>;

    /// Create a velocity-driven revolute joint.
    fn create_revolute_motor(
        &mut self,
        body1: BodyHandle,
        body2: BodyHandle,
        desc: &RevoluteMotorDesc,
    ) -> Result<JointHandle>;

    /// Re-target a revolute drive.
    fn set_motor(&mut self, joint: JointHandle, target_velocity: f32, max_torque: f32)
        -> Result<()>;

    /// Current drive parameters of a revolute joint.
    fn motor(&self, joint: JointHandle) -> Option<MotorState>;

    /// Create a rigid, zero-offset attachment between two bodies.
    fn create_fixed_joint(&mut self, body1: BodyHandle, body2: BodyHandle) -> Result<JointHandle>;

    /// Destroy a joint.
    fn remove_joint(&mut self, joint: JointHandle) -> Result<()>;

    /// World pose of a body.
    fn pose(&self, body: BodyHandle) -> Option<Isometry3<f32>>;

    /// Teleport a body.
    fn set_pose(&mut self, body: BodyHandle, pose: Isometry3<f32>) -> Result<()>;

    /// Linear velocity of a body.
    fn linvel(&self, body: BodyHandle) -> Option<Vector3<f32>>;

    /// Angular velocity of a body.
    fn angvel(&self, body: BodyHandle) -> Option<Vector3<f32>>;

    /// Set the linear velocity of a body.
    fn set_linvel(&mut self, body: BodyHandle, linvel: Vector3<f32>) -> Result<()>;

    /// Set the angular velocity of a body.
    fn set_angvel(&mut self, body: BodyHandle, angvel: Vector3<f32>) -> Result<()>;

    /// Advance the world by exactly `dt` seconds, blocking until done.
    fn step(&mut self, dt: f32);
}
