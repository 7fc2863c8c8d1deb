//! Skid-steer drivetrain: a box chassis on eight motorized wheels.
//!
//! The wheels sit four per side, each tied to the chassis by a revolute
//! joint about the chassis X axis. All joints on one side share the side's
//! velocity setpoint. The chassis faces +Z in its local frame.

use nalgebra::{Isometry3, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};
use vexsim_physics::{
    ActorKind, BodyDesc, BodyHandle, ColliderDesc, Geometry, JointHandle, Material,
    PhysicsFacade, RevoluteMotorDesc,
};

use crate::error::{RobotError, Result};

/// Number of wheels on the robot.
pub const WHEEL_COUNT: usize = 8;

/// Number of wheels on each side.
pub const WHEELS_PER_SIDE: usize = WHEEL_COUNT / 2;

/// Which velocity channel drives a wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Left channel, the -X column of wheels.
    Left,
    /// Right channel, the +X column of wheels.
    Right,
}

/// Where a wheel is mounted, in chassis coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelMount {
    /// Drive channel.
    pub side: Side,
    /// Axle center relative to the chassis center (m).
    pub offset: Vector3<f32>,
}

/// Drivetrain dimensions and drive limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivetrainConfig {
    /// Track width, wheel column to wheel column (m).
    pub width: f32,
    /// Chassis length along the forward axis (m).
    pub length: f32,
    /// Chassis box half height (m).
    pub chassis_half_height: f32,
    /// Wheel radius (m).
    pub wheel_radius: f32,
    /// Wheel width (m).
    pub wheel_width: f32,
    /// Vertical offset of the axles below the chassis center (m, negative is down).
    pub wheel_drop: f32,
    /// Chassis density (kg/m³).
    pub chassis_density: f32,
    /// Wheel density (kg/m³).
    pub wheel_density: f32,
    /// Drive torque limit per wheel (Nm).
    pub drive_torque: f32,
    /// Wheel angular velocity at full input (rad/s).
    pub max_wheel_speed: f32,
    /// Chassis linear damping.
    pub linear_damping: f32,
    /// Chassis angular damping.
    pub angular_damping: f32,
    /// Wheel friction; low so the robot can skid-steer.
    pub wheel_friction: f32,
    /// Distance of the front reference point ahead of the front face (m).
    pub front_clearance: f32,
    /// Initial chassis position (m).
    pub start_position: [f32; 3],
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            width: 0.35,
            length: 0.35,
            chassis_half_height: 0.15,
            wheel_radius: 0.055,
            wheel_width: 0.025,
            wheel_drop: -0.20,
            chassis_density: 50.0,
            wheel_density: 10.0,
            drive_torque: 500.0,
            max_wheel_speed: 20.0,
            linear_damping: 0.5,
            angular_damping: 0.05,
            wheel_friction: 0.2,
            front_clearance: 0.05,
            start_position: [0.0, 0.5, 0.0],
        }
    }
}

impl DrivetrainConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("width", self.width),
            ("length", self.length),
            ("chassis_half_height", self.chassis_half_height),
            ("wheel_radius", self.wheel_radius),
            ("wheel_width", self.wheel_width),
            ("chassis_density", self.chassis_density),
            ("wheel_density", self.wheel_density),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RobotError::InvalidConfig(format!(
                    "drivetrain {name} must be positive, got {value}"
                )));
            }
        }
        if !(self.drive_torque >= 0.0 && self.max_wheel_speed >= 0.0) {
            return Err(RobotError::InvalidConfig(
                "drive torque and wheel speed must be non-negative".to_string(),
            ));
        }
        if self.start_position.iter().any(|v| !v.is_finite()) {
            return Err(RobotError::InvalidConfig(format!(
                "start position must be finite, got {:?}",
                self.start_position
            )));
        }
        Ok(())
    }

    /// Half the chassis length.
    pub fn half_length(&self) -> f32 {
        self.length / 2.0
    }
}

/// Wheel mounting points: the four left wheels first, then the four right
/// wheels, each column running back to front.
pub fn wheel_layout(config: &DrivetrainConfig) -> [WheelMount; WHEEL_COUNT] {
    let x_offset = config.width / 2.0;
    let z_spacing = config.length / (WHEELS_PER_SIDE - 1) as f32;
    let z_start = -config.length / 2.0;

    std::array::from_fn(|i| {
        let (side, sign) = if i < WHEELS_PER_SIDE {
            (Side::Left, -1.0)
        } else {
            (Side::Right, 1.0)
        };
        let row = (i % WHEELS_PER_SIDE) as f32;
        WheelMount {
            side,
            offset: Vector3::new(sign * x_offset, config.wheel_drop, z_start + row * z_spacing),
        }
    })
}

/// Bodies and joints of a successfully built drivetrain.
#[derive(Debug, Clone)]
struct Rig {
    chassis: BodyHandle,
    wheels: [BodyHandle; WHEEL_COUNT],
    joints: [JointHandle; WHEEL_COUNT],
}

/// The robot's chassis, wheels and drive joints.
///
/// A drivetrain whose construction failed is inert: inputs are stored but
/// ignored, poses read as identity.
#[derive(Debug, Clone)]
pub struct Drivetrain {
    config: DrivetrainConfig,
    layout: [WheelMount; WHEEL_COUNT],
    rig: Option<Rig>,
    left: f32,
    right: f32,
}

impl Drivetrain {
    /// Build the drivetrain, degrading to an inert one on failure.
    ///
    /// The failure is reported once here.
    pub fn build<P: PhysicsFacade + ?Sized>(physics: &mut P, config: DrivetrainConfig) -> Self {
        match Self::try_build(physics, config.clone()) {
            Ok(drivetrain) => drivetrain,
            Err(e) => {
                tracing::error!(error = %e, "drivetrain setup failed, robot is inert");
                Self {
                    layout: wheel_layout(&config),
                    config,
                    rig: None,
                    left: 0.0,
                    right: 0.0,
                }
            }
        }
    }

    /// Build the drivetrain, removing any partially created bodies on failure.
    pub fn try_build<P: PhysicsFacade + ?Sized>(
        physics: &mut P,
        config: DrivetrainConfig,
    ) -> Result<Self> {
        config.validate()?;
        let layout = wheel_layout(&config);

        let mut created = Vec::with_capacity(WHEEL_COUNT + 1);
        let rig = match assemble(physics, &config, &layout, &mut created) {
            Ok(rig) => rig,
            Err(e) => {
                for body in created {
                    if let Err(err) = physics.remove_body(body) {
                        tracing::warn!(?body, error = %err, "removing partial drivetrain body failed");
                    }
                }
                return Err(e);
            }
        };

        let [x, y, z] = config.start_position;
        tracing::info!(x, y, z, wheels = WHEEL_COUNT, "drivetrain initialized");
        Ok(Self {
            config,
            layout,
            rig: Some(rig),
            left: 0.0,
            right: 0.0,
        })
    }

    /// Set the left/right drive channels, clamped to [-1, 1].
    pub fn set_input(&mut self, left: f32, right: f32) {
        self.left = clamp_input(left);
        self.right = clamp_input(right);
    }

    /// Current (clamped) left/right inputs.
    pub fn input(&self) -> (f32, f32) {
        (self.left, self.right)
    }

    /// Push the current inputs to the wheel drives.
    ///
    /// Re-asserts the torque limit every call. Does not advance physics.
    pub fn update<P: PhysicsFacade + ?Sized>(&mut self, physics: &mut P, _dt: f32) {
        let Some(rig) = &self.rig else {
            return;
        };
        let setpoints = self.setpoints();
        for (joint, velocity) in rig.joints.iter().zip(setpoints) {
            if let Err(e) = physics.set_motor(*joint, velocity, self.config.drive_torque) {
                tracing::debug!(?joint, error = %e, "wheel drive update failed");
            }
        }
    }

    /// Wheel velocity targets (rad/s) for the current input, in layout order.
    pub fn setpoints(&self) -> [f32; WHEEL_COUNT] {
        std::array::from_fn(|i| {
            let input = match self.layout[i].side {
                Side::Left => self.left,
                Side::Right => self.right,
            };
            input * self.config.max_wheel_speed
        })
    }

    /// Measured wheel spin (rad/s) about the chassis X axis, in layout order.
    ///
    /// Relative to the chassis, so it is comparable with [`setpoints`](Self::setpoints).
    /// All zero when inert.
    pub fn wheel_velocities<P: PhysicsFacade + ?Sized>(&self, physics: &P) -> [f32; WHEEL_COUNT] {
        let Some(rig) = &self.rig else {
            return [0.0; WHEEL_COUNT];
        };
        let (Some(pose), Some(chassis_spin)) =
            (physics.pose(rig.chassis), physics.angvel(rig.chassis))
        else {
            return [0.0; WHEEL_COUNT];
        };
        let axis = pose.rotation * Vector3::x();
        std::array::from_fn(|i| {
            physics
                .angvel(rig.wheels[i])
                .map_or(0.0, |spin| (spin - chassis_spin).dot(&axis))
        })
    }

    /// Chassis world pose, `None` when inert.
    pub fn chassis_pose<P: PhysicsFacade + ?Sized>(&self, physics: &P) -> Option<Isometry3<f32>> {
        physics.pose(self.rig.as_ref()?.chassis)
    }

    /// Chassis model matrix with a uniform visual scale, identity when inert.
    pub fn pose_matrix<P: PhysicsFacade + ?Sized>(&self, physics: &P, scale: f32) -> Matrix4<f32> {
        match self.chassis_pose(physics) {
            Some(pose) => pose.to_homogeneous() * Matrix4::new_scaling(scale),
            None => Matrix4::identity(),
        }
    }

    /// World-space point just ahead of the chassis front face.
    ///
    /// Anchor for spawning and intake; the origin when inert.
    pub fn front_reference_point<P: PhysicsFacade + ?Sized>(&self, physics: &P) -> Point3<f32> {
        let local = Point3::new(0.0, 0.0, self.config.half_length() + self.config.front_clearance);
        match self.chassis_pose(physics) {
            Some(pose) => pose * local,
            None => Point3::origin(),
        }
    }

    /// World-space forward (+Z local) direction of the chassis.
    pub fn forward_axis<P: PhysicsFacade + ?Sized>(&self, physics: &P) -> Vector3<f32> {
        match self.chassis_pose(physics) {
            Some(pose) => pose.rotation * Vector3::z(),
            None => Vector3::z(),
        }
    }

    /// Chassis body, `None` when inert.
    pub fn chassis(&self) -> Option<BodyHandle> {
        self.rig.as_ref().map(|r| r.chassis)
    }

    /// Wheel bodies in layout order, empty when inert.
    pub fn wheels(&self) -> &[BodyHandle] {
        self.rig.as_ref().map_or(&[], |r| &r.wheels[..])
    }

    /// Wheel drive joints in layout order, empty when inert.
    pub fn joints(&self) -> &[JointHandle] {
        self.rig.as_ref().map_or(&[], |r| &r.joints[..])
    }

    /// Wheel mounting layout.
    pub fn layout(&self) -> &[WheelMount; WHEEL_COUNT] {
        &self.layout
    }

    /// Configuration the drivetrain was built with.
    pub fn config(&self) -> &DrivetrainConfig {
        &self.config
    }

    /// True when construction failed.
    pub fn is_inert(&self) -> bool {
        self.rig.is_none()
    }
}

fn clamp_input(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

fn assemble<P: PhysicsFacade + ?Sized>(
    physics: &mut P,
    config: &DrivetrainConfig,
    layout: &[WheelMount; WHEEL_COUNT],
    created: &mut Vec<BodyHandle>,
) -> Result<Rig> {
    let [x, y, z] = config.start_position;
    let chassis_pose = Isometry3::translation(x, y, z);

    // Plain box; mesh hulls make the chassis unstable
    let chassis = physics.create_body(
        &BodyDesc::dynamic(chassis_pose).with_damping(config.linear_damping, config.angular_damping),
    )?;
    created.push(chassis);
    physics.attach_collider(
        chassis,
        &ColliderDesc::new(
            Geometry::Box {
                half_extents: Vector3::new(
                    config.width / 2.0,
                    config.chassis_half_height,
                    config.length / 2.0,
                ),
            },
            ActorKind::Chassis.filter(),
        )
        .with_density(config.chassis_density),
    )?;

    let wheel_material = Material {
        friction: config.wheel_friction,
        restitution: 0.0,
    };
    let mut wheels = Vec::with_capacity(WHEEL_COUNT);
    let mut joints = Vec::with_capacity(WHEEL_COUNT);
    for mount in layout {
        let wheel = physics.create_body(&BodyDesc::dynamic(
            chassis_pose * Isometry3::translation(mount.offset.x, mount.offset.y, mount.offset.z),
        ))?;
        created.push(wheel);
        physics.attach_collider(
            wheel,
            &ColliderDesc::new(
                Geometry::CapsuleX {
                    half_length: config.wheel_width / 2.0,
                    radius: config.wheel_radius,
                },
                ActorKind::Wheel.filter(),
            )
            .with_density(config.wheel_density)
            .with_material(wheel_material),
        )?;

        let joint = physics.create_revolute_motor(
            chassis,
            wheel,
            &RevoluteMotorDesc {
                anchor1: mount.offset.into(),
                anchor2: Point3::origin(),
                axis: Vector3::x_axis(),
                target_velocity: 0.0,
                max_torque: config.drive_torque,
            },
        )?;
        wheels.push(wheel);
        joints.push(joint);
    }

    Ok(Rig {
        chassis,
        wheels: wheels
            .try_into()
            .map_err(|_| RobotError::InvalidConfig("wheel count mismatch".to_string()))?,
        joints: joints
            .try_into()
            .map_err(|_| RobotError::InvalidConfig("joint count mismatch".to_string()))?,
    })
}
