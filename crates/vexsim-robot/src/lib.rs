#![warn(missing_docs)]

//! Robot-side simulation logic for vexsim.
//!
//! A skid-steer [`Drivetrain`] (box chassis on eight motorized wheels), the
//! [`Pieces`] arena of spawnable game pieces, and the [`Manipulator`]
//! that intakes free pieces onto the chassis and ejects them in LIFO order.
//!
//! Everything here is generic over [`vexsim_physics::PhysicsFacade`]; the
//! robot holds body and joint handles only, the physics world owns the
//! objects.
//!
//! # Example
//!
//! ```ignore
//! let mut world = PhysicsWorld::new(PhysicsSettings::default())?;
//! let mut drivetrain = Drivetrain::build(&mut world, DrivetrainConfig::default());
//! let mut pieces = Pieces::new(PieceConfig::default());
//! let mut manipulator = Manipulator::new(ManipulatorConfig::default())?;
//!
//! let front = drivetrain.front_reference_point(&world);
//! pieces.spawn(&mut world, PieceColor::Red, front + Vector3::new(0.0, 0.0, 0.1))?;
//! manipulator.intake(&mut world, &drivetrain, &mut pieces);
//!
//! drivetrain.set_input(1.0, 1.0);
//! drivetrain.update(&mut world, 1.0 / 60.0);
//! world.step(1.0 / 60.0);
//! ```

mod drivetrain;
mod error;
mod manipulation;
mod piece;
#[cfg(test)]
mod testing;

pub use drivetrain::{
    wheel_layout, Drivetrain, DrivetrainConfig, Side, WheelMount, WHEELS_PER_SIDE, WHEEL_COUNT,
};
pub use error::{Result, RobotError};
pub use manipulation::{nearest_free, HeldPiece, Manipulator, ManipulatorConfig, MAX_HELD};
pub use piece::{Piece, PieceColor, PieceConfig, PieceId, Pieces};
