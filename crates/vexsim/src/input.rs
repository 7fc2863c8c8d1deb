//! Per-frame input snapshot and button edge detection.
//!
//! The session never polls a window system. Whatever backend drives it
//! fills an [`InputSnapshot`] once per frame; discrete actions in the
//! snapshot are rising edges, so holding a button fires once.

use serde::{Deserialize, Serialize};

/// Level state of the discrete action buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Buttons {
    /// Spawn a red piece.
    pub spawn_a: bool,
    /// Spawn a blue piece.
    pub spawn_b: bool,
    /// Intake the nearest piece.
    pub intake: bool,
    /// Eject the last held piece.
    pub outtake: bool,
}

impl Buttons {
    /// True when no button is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Turns held buttons into one-frame presses.
#[derive(Debug, Clone, Default)]
pub struct EdgeDetector {
    previous: Buttons,
}

impl EdgeDetector {
    /// Feed the current level state, returning the buttons that went down
    /// since the previous call.
    pub fn update(&mut self, levels: Buttons) -> Buttons {
        let prev = std::mem::replace(&mut self.previous, levels);
        Buttons {
            spawn_a: levels.spawn_a && !prev.spawn_a,
            spawn_b: levels.spawn_b && !prev.spawn_b,
            intake: levels.intake && !prev.intake,
            outtake: levels.outtake && !prev.outtake,
        }
    }
}

/// Four drive keys, one forward/backward pair per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveKeys {
    /// Left side forward.
    pub left_forward: bool,
    /// Left side backward.
    pub left_backward: bool,
    /// Right side forward.
    pub right_forward: bool,
    /// Right side backward.
    pub right_backward: bool,
}

impl DriveKeys {
    /// Left/right channel values in [-1, 1].
    pub fn channels(&self) -> (f32, f32) {
        let axis = |fwd: bool, back: bool| f32::from(u8::from(fwd)) - f32::from(u8::from(back));
        (
            axis(self.left_forward, self.left_backward),
            axis(self.right_forward, self.right_backward),
        )
    }
}

/// Camera control deltas for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraInput {
    /// Horizontal orbit drag (pixels).
    pub orbit_dx: f32,
    /// Vertical orbit drag (pixels).
    pub orbit_dy: f32,
    /// Zoom direction, positive moves closer.
    pub zoom: f32,
    /// Target pan as (right, up, forward), each in [-1, 1].
    pub pan: [f32; 3],
}

/// Everything the session reads from the user in one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSnapshot {
    /// Left drive channel in [-1, 1]; clamped by the drivetrain.
    pub left: f32,
    /// Right drive channel in [-1, 1]; clamped by the drivetrain.
    pub right: f32,
    /// Discrete actions that fire this frame.
    pub pressed: Buttons,
    /// Camera control.
    pub camera: CameraInput,
}

impl InputSnapshot {
    /// Snapshot with only drive channels set.
    pub fn drive(left: f32, right: f32) -> Self {
        Self {
            left,
            right,
            ..Default::default()
        }
    }

    /// Snapshot from raw key levels, edge-detecting the action buttons.
    pub fn from_levels(
        drive: DriveKeys,
        buttons: Buttons,
        edges: &mut EdgeDetector,
        camera: CameraInput,
    ) -> Self {
        let (left, right) = drive.channels();
        Self {
            left,
            right,
            pressed: edges.update(buttons),
            camera,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_fires_once_per_press() {
        let mut edges = EdgeDetector::default();
        let held = Buttons {
            intake: true,
            ..Default::default()
        };

        assert!(edges.update(held).intake);
        assert!(!edges.update(held).intake);
        assert!(!edges.update(held).intake);
        assert!(edges.update(Buttons::default()).is_empty());
        assert!(edges.update(held).intake);
    }

    #[test]
    fn test_edges_are_independent() {
        let mut edges = EdgeDetector::default();
        edges.update(Buttons {
            spawn_a: true,
            ..Default::default()
        });
        let pressed = edges.update(Buttons {
            spawn_a: true,
            outtake: true,
            ..Default::default()
        });
        assert_eq!(
            pressed,
            Buttons {
                outtake: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_drive_keys() {
        let keys = DriveKeys {
            left_forward: true,
            right_forward: true,
            right_backward: true,
            ..Default::default()
        };
        assert_eq!(keys.channels(), (1.0, 0.0));
        assert_eq!(DriveKeys::default().channels(), (0.0, 0.0));
    }

    #[test]
    fn test_from_levels() {
        let mut edges = EdgeDetector::default();
        let buttons = Buttons {
            spawn_b: true,
            ..Default::default()
        };
        let keys = DriveKeys {
            left_backward: true,
            ..Default::default()
        };

        let first = InputSnapshot::from_levels(keys, buttons, &mut edges, CameraInput::default());
        assert_eq!((first.left, first.right), (-1.0, 0.0));
        assert!(first.pressed.spawn_b);

        let second = InputSnapshot::from_levels(keys, buttons, &mut edges, CameraInput::default());
        assert!(second.pressed.is_empty());
    }
}
