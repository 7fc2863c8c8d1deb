//! Timed input scripts for headless runs.
//!
//! A script is a JSON array of events, each tied to a frame number:
//!
//! ```json
//! [
//!   { "frame": 0, "press": ["spawn_a"] },
//!   { "frame": 5, "drive": [1.0, 1.0] },
//!   { "frame": 90, "drive": [0.0, 0.0], "press": ["intake"] }
//! ]
//! ```
//!
//! Drive values hold until changed. Presses and camera input last one frame.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use vexsim::{Buttons, CameraInput, InputSnapshot};

/// A discrete action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SpawnA,
    SpawnB,
    Intake,
    Outtake,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEvent {
    pub frame: u64,
    #[serde(default)]
    pub drive: Option<[f32; 2]>,
    #[serde(default)]
    pub press: Vec<Action>,
    #[serde(default)]
    pub camera: Option<CameraInput>,
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    events: Vec<ScriptEvent>,
}

impl Script {
    pub fn parse(text: &str) -> Result<Self> {
        let mut events: Vec<ScriptEvent> =
            serde_json::from_str(text).context("Invalid input script")?;
        events.sort_by_key(|e| e.frame);
        Ok(Self { events })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::parse(&text)
    }

    /// Frame of the last event, if any.
    pub fn last_frame(&self) -> Option<u64> {
        self.events.last().map(|e| e.frame)
    }

    pub fn player(&self) -> ScriptPlayer<'_> {
        ScriptPlayer {
            events: &self.events,
            cursor: 0,
            drive: [0.0, 0.0],
        }
    }
}

/// Replays a script frame by frame.
#[derive(Debug)]
pub struct ScriptPlayer<'a> {
    events: &'a [ScriptEvent],
    cursor: usize,
    drive: [f32; 2],
}

impl ScriptPlayer<'_> {
    /// Input for `frame`. Frames must be requested in increasing order.
    pub fn input(&mut self, frame: u64) -> InputSnapshot {
        let mut pressed = Buttons::default();
        let mut camera = CameraInput::default();

        while let Some(event) = self.events.get(self.cursor) {
            if event.frame > frame {
                break;
            }
            self.cursor += 1;
            if let Some(drive) = event.drive {
                self.drive = drive;
            }
            // Events for frames already passed only update the drive
            if event.frame < frame {
                continue;
            }
            for action in &event.press {
                match action {
                    Action::SpawnA => pressed.spawn_a = true,
                    Action::SpawnB => pressed.spawn_b = true,
                    Action::Intake => pressed.intake = true,
                    Action::Outtake => pressed.outtake = true,
                }
            }
            if let Some(input) = event.camera {
                camera = input;
            }
        }

        InputSnapshot {
            left: self.drive[0],
            right: self.drive[1],
            pressed,
            camera,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"[
        { "frame": 5, "drive": [1.0, 1.0] },
        { "frame": 0, "press": ["spawn_a", "intake"] },
        { "frame": 8, "drive": [0.0, -1.0], "press": ["outtake"] }
    ]"#;

    #[test]
    fn test_parse_sorts_events() {
        let script = Script::parse(SCRIPT).unwrap();
        assert_eq!(script.last_frame(), Some(8));
    }

    #[test]
    fn test_presses_last_one_frame() {
        let script = Script::parse(SCRIPT).unwrap();
        let mut player = script.player();

        let first = player.input(0);
        assert!(first.pressed.spawn_a && first.pressed.intake);
        assert!(player.input(1).pressed.is_empty());
    }

    #[test]
    fn test_drive_holds() {
        let script = Script::parse(SCRIPT).unwrap();
        let mut player = script.player();

        assert_eq!(player.input(4).left, 0.0);
        assert_eq!(player.input(5).left, 1.0);
        assert_eq!(player.input(7).right, 1.0);
        let last = player.input(8);
        assert_eq!((last.left, last.right), (0.0, -1.0));
        assert!(last.pressed.outtake);
    }

    #[test]
    fn test_skipped_frames_keep_drive() {
        let script = Script::parse(SCRIPT).unwrap();
        let mut player = script.player();

        let late = player.input(20);
        assert_eq!((late.left, late.right), (0.0, -1.0));
        assert!(late.pressed.is_empty());
    }

    #[test]
    fn test_invalid_script() {
        assert!(Script::parse(r#"[{ "frame": 0, "press": ["jump"] }]"#).is_err());
        assert!(Script::parse("{}").is_err());
    }
}
