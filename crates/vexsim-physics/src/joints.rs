//! Joint construction for Rapier.

use nalgebra::{Point3, UnitVector3};
use rapier3d::dynamics::{GenericJoint, GenericJointBuilder, JointAxesMask, JointAxis, MotorModel};

/// Motor damping used for velocity drives.
pub const DEFAULT_MOTOR_DAMPING: f32 = 100.0;

/// The single free axis of a revolute joint.
pub const REVOLUTE_AXIS: JointAxis = JointAxis::AngX;

/// Velocity-driven revolute joint between two bodies.
#[derive(Debug, Clone, Copy)]
pub struct RevoluteMotorDesc {
    /// Anchor on the first body, in its local frame.
    pub anchor1: Point3<f32>,
    /// Anchor on the second body, in its local frame.
    pub anchor2: Point3<f32>,
    /// Rotation axis, shared by both local frames.
    pub axis: UnitVector3<f32>,
    /// Drive velocity target (rad/s).
    pub target_velocity: f32,
    /// Drive torque limit (Nm).
    pub max_torque: f32,
}

/// Snapshot of a joint motor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorState {
    /// Drive velocity target (rad/s).
    pub target_velocity: f32,
    /// Drive torque limit (Nm).
    pub max_torque: f32,
}

/// Rigid joint locking all six axes with coincident anchors.
pub fn create_fixed_joint() -> GenericJoint {
    GenericJointBuilder::new(JointAxesMask::LOCKED_FIXED_AXES)
        .local_anchor1(Point3::origin())
        .local_anchor2(Point3::origin())
        .build()
}

/// Revolute joint with its velocity drive enabled.
pub fn create_revolute_motor(desc: &RevoluteMotorDesc) -> GenericJoint {
    GenericJointBuilder::new(JointAxesMask::LOCKED_REVOLUTE_AXES)
        .local_anchor1(desc.anchor1)
        .local_anchor2(desc.anchor2)
        .local_axis1(desc.axis)
        .local_axis2(desc.axis)
        .motor_model(REVOLUTE_AXIS, MotorModel::AccelerationBased)
        .motor_velocity(REVOLUTE_AXIS, desc.target_velocity, DEFAULT_MOTOR_DAMPING)
        .motor_max_force(REVOLUTE_AXIS, desc.max_torque)
        .build()
}

/// Re-target the velocity drive of a revolute joint.
pub fn set_revolute_motor(joint: &mut GenericJoint, target_velocity: f32, max_torque: f32) {
    joint
        .set_motor_velocity(REVOLUTE_AXIS, target_velocity, DEFAULT_MOTOR_DAMPING)
        .set_motor_max_force(REVOLUTE_AXIS, max_torque);
}

/// Read back the velocity drive of a revolute joint.
pub fn revolute_motor_state(joint: &GenericJoint) -> Option<MotorState> {
    joint.motor(REVOLUTE_AXIS).map(|m| MotorState {
        target_velocity: m.target_vel,
        max_torque: m.max_force,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_revolute_motor() {
        let desc = RevoluteMotorDesc {
            anchor1: Point3::new(0.175, -0.2, 0.0),
            anchor2: Point3::origin(),
            axis: Vector3::x_axis(),
            target_velocity: 4.0,
            max_torque: 500.0,
        };
        let mut joint = create_revolute_motor(&desc);

        let state = revolute_motor_state(&joint).unwrap();
        assert!((state.target_velocity - 4.0).abs() < 1e-6);
        assert!((state.max_torque - 500.0).abs() < 1e-6);
        assert!((joint.local_anchor1() - desc.anchor1).norm() < 1e-6);

        set_revolute_motor(&mut joint, -20.0, 250.0);
        let state = revolute_motor_state(&joint).unwrap();
        assert!((state.target_velocity + 20.0).abs() < 1e-6);
        assert!((state.max_torque - 250.0).abs() < 1e-6);
    }

    #[test]
    fn test_fixed_joint_locks_everything() {
        let joint = create_fixed_joint();
        assert_eq!(joint.locked_axes, JointAxesMask::LOCKED_FIXED_AXES);
        assert!(joint.local_anchor1().coords.norm() < 1e-6);
        assert!(joint.local_anchor2().coords.norm() < 1e-6);
    }
}
