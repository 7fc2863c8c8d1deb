//! Fixed-step time accumulation.
//!
//! Real frame time is clamped, accumulated, and drained in constant
//! physics increments. Leftover time carries over to the next frame.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Frame loop tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Upper bound on the real time consumed by one frame (s).
    pub max_frame_delta: f32,
    /// Uniform scale applied to the robot's render model.
    pub robot_scale: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_delta: 0.1,
            robot_scale: 0.01,
        }
    }
}

impl FrameConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_frame_delta.is_finite() && self.max_frame_delta > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "max frame delta must be positive, got {}",
                self.max_frame_delta
            )));
        }
        if !(self.robot_scale.is_finite() && self.robot_scale > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "robot scale must be positive, got {}",
                self.robot_scale
            )));
        }
        Ok(())
    }
}

/// Something advanced in fixed increments.
///
/// Each increment calls [`update_actuators`](Self::update_actuators) and
/// then [`step_physics`](Self::step_physics) with the same `dt`.
pub trait FixedStepTarget {
    /// Push actuator setpoints for the coming step.
    fn update_actuators(&mut self, dt: f32);

    /// Advance the simulation by exactly `dt`.
    fn step_physics(&mut self, dt: f32);
}

/// Clamps, accumulates and drains frame time.
#[derive(Debug, Clone)]
pub struct FrameController {
    step: f32,
    max_frame_delta: f32,
    accumulator: f32,
}

impl FrameController {
    /// Create a controller draining in increments of `step` seconds.
    pub fn new(step: f32, max_frame_delta: f32) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "fixed step must be positive, got {step}"
            )));
        }
        if !(max_frame_delta.is_finite() && max_frame_delta > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "max frame delta must be positive, got {max_frame_delta}"
            )));
        }
        Ok(Self {
            step,
            max_frame_delta,
            accumulator: 0.0,
        })
    }

    /// Clamp a real frame delta to `[0, max_frame_delta]`.
    pub fn clamp_delta(&self, real_dt: f32) -> f32 {
        if real_dt.is_nan() {
            0.0
        } else {
            real_dt.clamp(0.0, self.max_frame_delta)
        }
    }

    /// Consume `real_dt` seconds, running as many whole steps as fit.
    ///
    /// Returns the number of steps taken.
    pub fn advance<T: FixedStepTarget + ?Sized>(&mut self, real_dt: f32, target: &mut T) -> u32 {
        self.accumulator += self.clamp_delta(real_dt);

        let mut steps = 0;
        while self.accumulator >= self.step {
            target.update_actuators(self.step);
            target.step_physics(self.step);
            self.accumulator -= self.step;
            steps += 1;
        }
        steps
    }

    /// Fixed step size (s).
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Largest real delta accepted per frame (s).
    pub fn max_frame_delta(&self) -> f32 {
        self.max_frame_delta
    }

    /// Time not yet consumed by a step (s).
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Fraction of a step left in the accumulator, in `[0, 1)`.
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }
}
