//! Orbit camera around a movable target point.

use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};
use crate::input::CameraInput;

/// Camera parameters. Angles are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Initial look-at target.
    pub target: [f32; 3],
    /// Initial distance from the target (m).
    pub distance: f32,
    /// Initial yaw.
    pub yaw: f32,
    /// Initial pitch.
    pub pitch: f32,
    /// Lowest pitch.
    pub min_pitch: f32,
    /// Highest pitch.
    pub max_pitch: f32,
    /// Closest distance (m).
    pub min_distance: f32,
    /// Farthest distance (m).
    pub max_distance: f32,
    /// Degrees of orbit per pixel of drag.
    pub orbit_speed: f32,
    /// Target pan speed (m/s).
    pub pan_speed: f32,
    /// Zoom speed (m/s).
    pub zoom_speed: f32,
    /// Vertical field of view.
    pub fov: f32,
    /// Near clip plane (m).
    pub near: f32,
    /// Far clip plane (m).
    pub far: f32,
    /// Viewport width over height.
    pub aspect: f32,
    /// Flip clip-space Y for APIs whose framebuffer Y points down.
    pub flip_y: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            target: [0.0, 0.5, 0.0],
            distance: 3.0,
            yaw: -90.0,
            pitch: 30.0,
            min_pitch: -89.0,
            max_pitch: 89.0,
            min_distance: 1.0,
            max_distance: 50.0,
            orbit_speed: 0.3,
            pan_speed: 5.0,
            zoom_speed: 20.0,
            fov: 60.0,
            near: 0.1,
            far: 200.0,
            aspect: 16.0 / 9.0,
            flip_y: true,
        }
    }
}

impl CameraConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_pitch <= self.max_pitch && self.min_pitch > -90.0 && self.max_pitch < 90.0) {
            return Err(SessionError::InvalidConfig(format!(
                "camera pitch range must lie within (-90, 90), got [{}, {}]",
                self.min_pitch, self.max_pitch
            )));
        }
        if !(self.min_distance > 0.0 && self.min_distance <= self.max_distance) {
            return Err(SessionError::InvalidConfig(format!(
                "camera distance range invalid: [{}, {}]",
                self.min_distance, self.max_distance
            )));
        }
        if !(self.fov > 0.0 && self.fov < 180.0 && self.near > 0.0 && self.far > self.near) {
            return Err(SessionError::InvalidConfig(
                "camera projection requires 0 < fov < 180 and 0 < near < far".to_string(),
            ));
        }
        if !(self.aspect.is_finite() && self.aspect > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "camera aspect must be positive, got {}",
                self.aspect
            )));
        }
        Ok(())
    }
}

/// Camera orbiting a target at a given yaw, pitch and distance.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    config: CameraConfig,
    target: Point3<f32>,
    distance: f32,
    yaw: f32,
    pitch: f32,
}

impl OrbitCamera {
    /// Camera at the configured initial placement.
    pub fn new(config: CameraConfig) -> Self {
        let [x, y, z] = config.target;
        Self {
            target: Point3::new(x, y, z),
            distance: config.distance.clamp(config.min_distance, config.max_distance),
            yaw: config.yaw,
            pitch: config.pitch.clamp(config.min_pitch, config.max_pitch),
            config,
        }
    }

    /// Apply one frame of camera control.
    pub fn apply(&mut self, input: &CameraInput, dt: f32) {
        self.orbit(input.orbit_dx, input.orbit_dy);
        self.zoom(input.zoom * self.config.zoom_speed * dt);
        let [right, up, forward] = input.pan;
        let speed = self.config.pan_speed * dt;
        self.pan(right * speed, up * speed, forward * speed);
    }

    /// Orbit by a drag of `dx`, `dy` pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.config.orbit_speed;
        self.pitch = (self.pitch + dy * self.config.orbit_speed)
            .clamp(self.config.min_pitch, self.config.max_pitch);
    }

    /// Move `amount` meters toward the target.
    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance - amount)
            .clamp(self.config.min_distance, self.config.max_distance);
    }

    /// Move the target in the camera's ground-plane frame.
    pub fn pan(&mut self, right: f32, up: f32, forward: f32) {
        let yaw = self.yaw.to_radians();
        let ahead = Vector3::new(-yaw.cos(), 0.0, -yaw.sin());
        let side = ahead.cross(&Vector3::y()).normalize();
        self.target += side * right + Vector3::y() * up + ahead * forward;
    }

    /// Eye position in world space.
    pub fn eye(&self) -> Point3<f32> {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        let offset = Vector3::new(
            self.distance * pitch.cos() * yaw.cos(),
            self.distance * pitch.sin(),
            self.distance * pitch.cos() * yaw.sin(),
        );
        self.target + offset
    }

    /// World-to-view transform.
    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye(), &self.target, &Vector3::y())
    }

    /// Perspective projection.
    pub fn projection(&self) -> Matrix4<f32> {
        let mut proj = Perspective3::new(
            self.config.aspect,
            self.config.fov.to_radians(),
            self.config.near,
            self.config.far,
        )
        .to_homogeneous();
        if self.config.flip_y {
            proj[(1, 1)] *= -1.0;
        }
        proj
    }

    /// Projection times view.
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection() * self.view()
    }

    /// Current look-at target.
    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    /// Current distance from the target.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Current yaw and pitch in degrees.
    pub fn angles(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    /// Set the viewport aspect ratio, ignoring degenerate sizes.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.aspect = width as f32 / height as f32;
        }
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_eye() {
        let camera = OrbitCamera::default();
        let eye = camera.eye();
        // Yaw -90 puts the eye on the -Z side, pitch 30 lifts it
        assert_relative_eq!(eye.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(eye.y, 0.5 + 1.5, epsilon = 1e-5);
        assert_relative_eq!(eye.z, -3.0 * 30f32.to_radians().cos(), epsilon = 1e-5);
    }

    #[test]
    fn test_view_looks_at_target() {
        let camera = OrbitCamera::default();
        let target = camera.view().transform_point(&camera.target());
        assert_relative_eq!(target.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(target.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(target.z, -3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_pitch_and_distance_clamp() {
        let mut camera = OrbitCamera::default();
        camera.orbit(0.0, 10_000.0);
        assert_eq!(camera.angles().1, 89.0);
        camera.orbit(0.0, -10_000.0);
        assert_eq!(camera.angles().1, -89.0);

        camera.zoom(100.0);
        assert_eq!(camera.distance(), 1.0);
        camera.zoom(-100.0);
        assert_eq!(camera.distance(), 50.0);
    }

    #[test]
    fn test_pan_moves_target() {
        let mut camera = OrbitCamera::default();
        let start = camera.target();
        camera.apply(
            &CameraInput {
                pan: [0.0, 1.0, 0.0],
                ..Default::default()
            },
            0.1,
        );
        assert_relative_eq!(camera.target().y - start.y, 0.5, epsilon = 1e-5);

        // Yaw -90 looks toward +Z
        let start = camera.target();
        camera.pan(0.0, 0.0, 1.0);
        assert_relative_eq!(camera.target().z - start.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_projection_flip() {
        let flipped = OrbitCamera::default().projection();
        let plain = OrbitCamera::new(CameraConfig {
            flip_y: false,
            ..Default::default()
        })
        .projection();
        assert_relative_eq!(flipped[(1, 1)], -plain[(1, 1)]);
        assert!(plain[(1, 1)] > 0.0);
    }

    #[test]
    fn test_invalid_config() {
        let config = CameraConfig {
            near: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(CameraConfig::default().validate().is_ok());
    }
}
