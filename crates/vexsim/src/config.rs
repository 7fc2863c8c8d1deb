//! Session configuration, loaded from TOML.
//!
//! Every section is optional; missing sections and keys take their
//! defaults.
//!
//! ```toml
//! [physics]
//! timestep = 0.008333
//!
//! [manipulator]
//! intake_range = 0.5
//!
//! [[field.obstacles]]
//! center = [1.0, 0.15, 0.0]
//! half_extents = [0.1, 0.15, 0.6]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use vexsim_physics::PhysicsSettings;
use vexsim_robot::{DrivetrainConfig, ManipulatorConfig, PieceConfig};

use crate::camera::CameraConfig;
use crate::error::Result;
use crate::field::FieldConfig;
use crate::frame::FrameConfig;

/// Complete session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Physics world settings, including the fixed timestep.
    pub physics: PhysicsSettings,
    /// Chassis and wheel parameters.
    pub drivetrain: DrivetrainConfig,
    /// Intake/outtake tuning.
    pub manipulator: ManipulatorConfig,
    /// Piece parameters.
    pub pieces: PieceConfig,
    /// Frame loop tuning.
    pub frame: FrameConfig,
    /// Static field layout.
    pub field: FieldConfig,
    /// Camera placement and controls.
    pub camera: CameraConfig,
}

impl SimConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded config");
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.physics.validate()?;
        self.drivetrain.validate()?;
        self.manipulator.validate()?;
        self.pieces.validate()?;
        self.frame.validate()?;
        self.field.validate()?;
        self.camera.validate()?;
        Ok(())
    }
}
