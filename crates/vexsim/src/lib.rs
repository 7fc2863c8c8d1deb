#![warn(missing_docs)]

//! Interactive wheeled-robot simulation.
//!
//! A [`Session`] owns a physics world, the static field, a skid-steer robot
//! with an intake, and the game pieces it manipulates. Each real-time frame
//! the caller passes an [`InputSnapshot`] and the elapsed wall time; the
//! session applies discrete actions, drains the elapsed time in fixed
//! physics steps, and hands a [`RenderFrame`] to a [`Renderer`].
//!
//! # Example
//!
//! ```ignore
//! use vexsim::{Buttons, InputSnapshot, NullRenderer, Session, SimConfig};
//!
//! let mut session = Session::new(SimConfig::default())?;
//! let spawn = InputSnapshot {
//!     pressed: Buttons { spawn_a: true, ..Default::default() },
//!     ..Default::default()
//! };
//! session.frame(&spawn, 1.0 / 60.0, &mut NullRenderer);
//! session.frame(&InputSnapshot::drive(1.0, 1.0), 1.0 / 60.0, &mut NullRenderer);
//! ```

mod camera;
mod config;
mod error;
mod field;
mod frame;
mod input;
mod render;
mod session;

pub use camera::{CameraConfig, OrbitCamera};
pub use config::SimConfig;
pub use error::{Result, SessionError};
pub use field::{Field, FieldConfig, ObstacleConfig};
pub use frame::{FixedStepTarget, FrameConfig, FrameController};
pub use input::{Buttons, CameraInput, DriveKeys, EdgeDetector, InputSnapshot};
pub use render::{DrawItem, MeshSet, NullRenderer, RecordingRenderer, RenderFrame, Renderer};
pub use session::{FrameOutcome, Session, SessionStats};

pub use vexsim_physics as physics;
pub use vexsim_robot as robot;
