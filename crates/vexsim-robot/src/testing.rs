//! Test facade that delegates to a real world and injects failures.

use nalgebra::{Isometry3, Vector3};
use vexsim_physics::{
    BodyDesc, BodyHandle, ColliderDesc, FilterData, JointHandle, MotorState, PhysicsError,
    PhysicsFacade, PhysicsSettings, PhysicsWorld, Result, RevoluteMotorDesc,
};

/// A real world with switchable faults.
pub struct FaultyWorld {
    pub world: PhysicsWorld,
    /// Refuse every fixed joint.
    pub fail_fixed_joints: bool,
    /// Revolute motors created before the next one fails.
    pub revolute_budget: Option<usize>,
    /// Refuse `set_filter` with exactly this value.
    pub reject_filter: Option<FilterData>,
}

impl FaultyWorld {
    pub fn new() -> Self {
        Self {
            world: PhysicsWorld::new(PhysicsSettings::default()).unwrap(),
            fail_fixed_joints: false,
            revolute_budget: None,
            reject_filter: None,
        }
    }
}

impl PhysicsFacade for FaultyWorld {
    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle> {
        self.world.create_body(desc)
    }
    fn attach_collider(&mut self, body: BodyHandle, desc: &ColliderDesc) -> Result<()> {
        self.world.attach_collider(body, desc)
    }
    fn remove_body(&mut self, body: BodyHandle) -> Result<()> {
        self.world.remove_body(body)
    }
    fn set_filter(&mut self, body: BodyHandle, filter: FilterData) -> Result<()> {
        if self.reject_filter == Some(filter) {
            return Err(PhysicsError::NoCollider(body));
        }
        self.world.set_filter(body, filter)
    }
    fn filter(&self, body: BodyHandle) -> Option<FilterData> {
        self.world.filter(body)
    }
    fn create_revolute_motor(
        &mut self,
        body1: BodyHandle,
        body2: BodyHandle,
        desc: &RevoluteMotorDesc,
    ) -> Result<JointHandle> {
        match self.revolute_budget.as_mut() {
            Some(0) => return Err(PhysicsError::NotInitialized),
            Some(left) => *left -= 1,
            None => {}
        }
        self.world.create_revolute_motor(body1, body2, desc)
    }
    fn set_motor(&mut self, joint: JointHandle, target_velocity: f32, max_torque: f32) -> Result<()> {
        self.world.set_motor(joint, target_velocity, max_torque)
    }
    fn motor(&self, joint: JointHandle) -> Option<MotorState> {
        self.world.motor(joint)
    }
    fn create_fixed_joint(&mut self, body1: BodyHandle, body2: BodyHandle) -> Result<JointHandle> {
        if self.fail_fixed_joints {
            return Err(PhysicsError::NotInitialized);
        }
        self.world.create_fixed_joint(body1, body2)
    }
    fn remove_joint(&mut self, joint: JointHandle) -> Result<()> {
        self.world.remove_joint(joint)
    }
    fn pose(&self, body: BodyHandle) -> Option<Isometry3<f32>> {
        self.world.pose(body)
    }
    fn set_pose(&mut self, body: BodyHandle, pose: Isometry3<f32>) -> Result<()> {
        self.world.set_pose(body, pose)
    }
    fn linvel(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.world.linvel(body)
    }
    fn angvel(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.world.angvel(body)
    }
    fn set_linvel(&mut self, body: BodyHandle, linvel: Vector3<f32>) -> Result<()> {
        self.world.set_linvel(body, linvel)
    }
    fn set_angvel(&mut self, body: BodyHandle, angvel: Vector3<f32>) -> Result<()> {
        self.world.set_angvel(body, angvel)
    }
    fn step(&mut self, dt: f32) {
        self.world.step(dt)
    }
}
