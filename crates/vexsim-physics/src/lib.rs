#![warn(missing_docs)]

//! Physics facade for the vexsim robot simulator, backed by Rapier3d.
//!
//! This crate owns the simulation world and exposes the small set of
//! operations the robot and session code need: creating bodies, colliders
//! and joints, teleporting bodies, reading poses, and stepping at a fixed
//! increment.
//!
//! # Features
//!
//! - Handle-based ownership: the world owns every body and joint
//! - Category/mask collision filtering installed as Rapier physics hooks
//! - Velocity-driven revolute motors and rigid attachment joints
//! - Touch notifications for pairs that pass the filter
//! - Optional `parallel` feature running the solver on a rayon pool
//!
//! # Example
//!
//! ```ignore
//! use vexsim_physics::{ActorKind, BodyDesc, ColliderDesc, Geometry, PhysicsFacade,
//!     PhysicsSettings, PhysicsWorld};
//!
//! let mut world = PhysicsWorld::new(PhysicsSettings::default())?;
//! let ball = world.create_body(&BodyDesc::dynamic(Isometry3::translation(0.0, 1.0, 0.0)))?;
//! world.attach_collider(ball, &ColliderDesc::new(Geometry::Sphere { radius: 0.07 },
//!     ActorKind::Piece.filter()))?;
//!
//! world.step(1.0 / 60.0);
//! let pose = world.pose(ball);
//! ```

mod colliders;
mod error;
mod events;
mod facade;
mod filter;
mod joints;
mod world;

pub use colliders::{mesh_to_collider, ColliderStrategy, FieldMesh, Geometry};
pub use error::{PhysicsError, Result};
pub use events::ContactEvent;
pub use facade::{
    BodyDesc, BodyHandle, BodyKind, ColliderDesc, JointHandle, Material, PhysicsFacade,
};
pub use filter::{filter_pair, ActorKind, Category, FilterData, PairFilter};
pub use joints::{MotorState, RevoluteMotorDesc};
pub use world::{PhysicsSettings, PhysicsWorld};
