//! Physics world management using Rapier3d.

use nalgebra::{Isometry3, Vector3};
use rapier3d::dynamics::{
    CCDSolver, ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet,
    RigidBodyBuilder, RigidBodySet,
};
use rapier3d::geometry::{BroadPhaseMultiSap, ColliderBuilder, ColliderSet, NarrowPhase};
use rapier3d::pipeline::{ActiveEvents, ActiveHooks, PhysicsPipeline};
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};
use crate::events::{ContactEvent, ContactLog};
use crate::facade::{BodyDesc, BodyHandle, BodyKind, ColliderDesc, JointHandle, Material, PhysicsFacade};
use crate::filter::{FilterData, FilterHooks};
use crate::joints::{
    create_fixed_joint, create_revolute_motor, revolute_motor_state, set_revolute_motor,
    MotorState, RevoluteMotorDesc,
};

/// Physics world configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Gravity vector (m/s²).
    pub gravity: [f32; 3],
    /// Fixed simulation step (s).
    pub timestep: f32,
    /// Worker threads for the solver; only used with the `parallel` feature.
    pub worker_threads: usize,
    /// Material used by colliders that do not override it.
    pub material: Material,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            timestep: 1.0 / 60.0,
            worker_threads: 2,
            material: Material::default(),
        }
    }
}

impl PhysicsSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(PhysicsError::InvalidSettings(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(PhysicsError::InvalidSettings(format!(
                "timestep must be positive, got {}",
                self.timestep
            )));
        }
        if !(self.material.friction >= 0.0 && self.material.restitution >= 0.0) {
            return Err(PhysicsError::InvalidSettings(
                "material friction and restitution must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rapier state, present once the world initialized successfully.
struct Engine {
    pipeline: PhysicsPipeline,
    gravity: Vector3<f32>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    hooks: FilterHooks,
    contacts: ContactLog,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl Engine {
    fn new(settings: &PhysicsSettings) -> Self {
        let [gx, gy, gz] = settings.gravity;
        let integration_params = IntegrationParameters {
            dt: settings.timestep,
            ..Default::default()
        };

        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector3::new(gx, gy, gz),
            integration_params,
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            hooks: FilterHooks,
            contacts: ContactLog::default(),
            #[cfg(feature = "parallel")]
            pool: build_pool(settings.worker_threads),
        }
    }

    fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt;

        #[cfg(feature = "parallel")]
        {
            if let Some(pool) = self.pool.take() {
                pool.install(|| self.run_pipeline());
                self.pool = Some(pool);
                return;
            }
        }

        self.run_pipeline();
    }

    fn run_pipeline(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &self.hooks,
            &self.contacts,
        );
    }

    fn body(&self, handle: BodyHandle) -> Result<&rapier3d::dynamics::RigidBody> {
        self.bodies
            .get(handle.0)
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut rapier3d::dynamics::RigidBody> {
        self.bodies
            .get_mut(handle.0)
            .ok_or(PhysicsError::UnknownBody(handle))
    }
}

#[cfg(feature = "parallel")]
fn build_pool(threads: usize) -> Option<rayon::ThreadPool> {
    if threads == 0 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!(threads, error = %e, "solver thread pool unavailable, stepping on the caller thread");
            None
        }
    }
}

/// Physics simulation world.
///
/// Owns every body, collider and joint; callers refer to them through
/// [`BodyHandle`] and [`JointHandle`]. A world whose setup failed stays
/// inert: queries return `None`, mutations fail with
/// [`PhysicsError::NotInitialized`] and stepping does nothing.
pub struct PhysicsWorld {
    settings: PhysicsSettings,
    engine: Option<Box<Engine>>,
    steps: u64,
    time: f64,
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("initialized", &self.is_initialized())
            .field("steps", &self.steps)
            .field("bodies", &self.body_count())
            .field("joints", &self.joint_count())
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Create a world, failing on invalid settings.
    pub fn new(settings: PhysicsSettings) -> Result<Self> {
        settings.validate()?;
        let engine = Engine::new(&settings);
        tracing::info!(
            gravity = ?settings.gravity,
            timestep = settings.timestep,
            "physics world initialized"
        );
        Ok(Self {
            settings,
            engine: Some(Box::new(engine)),
            steps: 0,
            time: 0.0,
        })
    }

    /// Create a world, degrading to an inert world on failure.
    ///
    /// The failure is logged once here and never retried.
    pub fn initialize(settings: PhysicsSettings) -> Self {
        match Self::new(settings.clone()) {
            Ok(world) => world,
            Err(e) => {
                tracing::error!(error = %e, "physics world setup failed, simulation is inert");
                Self {
                    settings,
                    engine: None,
                    steps: 0,
                    time: 0.0,
                }
            }
        }
    }

    /// Whether setup succeeded.
    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Settings the world was created with.
    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// Default material for new colliders.
    pub fn default_material(&self) -> Material {
        self.settings.material
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of live rigid bodies.
    pub fn body_count(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.bodies.len())
    }

    /// Number of live joints.
    pub fn joint_count(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.impulse_joints.len())
    }

    /// Set gravity vector.
    pub fn set_gravity(&mut self, x: f32, y: f32, z: f32) {
        self.settings.gravity = [x, y, z];
        if let Some(engine) = self.engine.as_mut() {
            engine.gravity = Vector3::new(x, y, z);
        }
    }

    /// Take the touch notifications emitted since the last call.
    pub fn drain_contact_events(&mut self) -> Vec<ContactEvent> {
        self.engine
            .as_ref()
            .map(|e| e.contacts.drain())
            .unwrap_or_default()
    }

    fn engine(&self) -> Result<&Engine> {
        self.engine.as_deref().ok_or(PhysicsError::NotInitialized)
    }

    fn engine_mut(&mut self) -> Result<&mut Engine> {
        self.engine.as_deref_mut().ok_or(PhysicsError::NotInitialized)
    }
}

impl PhysicsFacade for PhysicsWorld {
    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle> {
        let engine = self.engine_mut()?;
        let builder = match desc.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let body = builder
            .position(desc.pose)
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .build();
        Ok(BodyHandle(engine.bodies.insert(body)))
    }

    fn attach_collider(&mut self, body: BodyHandle, desc: &ColliderDesc) -> Result<()> {
        let material = desc.material.unwrap_or(self.settings.material);
        let engine = self.engine_mut()?;
        engine.body(body)?;

        let collider = ColliderBuilder::new(desc.geometry.to_shape())
            .density(desc.density)
            .friction(material.friction)
            .restitution(material.restitution)
            .sensor(desc.sensor)
            .user_data(desc.filter.to_user_data())
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS | ActiveHooks::FILTER_INTERSECTION_PAIR)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        engine
            .colliders
            .insert_with_parent(collider, body.0, &mut engine.bodies);
        Ok(())
    }

    fn remove_body(&mut self, body: BodyHandle) -> Result<()> {
        let engine = self.engine_mut()?;
        engine
            .bodies
            .remove(
                body.0,
                &mut engine.islands,
                &mut engine.colliders,
                &mut engine.impulse_joints,
                &mut engine.multibody_joints,
                true,
            )
            .map(|_| ())
            .ok_or(PhysicsError::UnknownBody(body))
    }

    fn set_filter(&mut self, body: BodyHandle, filter: FilterData) -> Result<()> {
        let engine = self.engine_mut()?;
        let rb = engine
            .bodies
            .get(body.0)
            .ok_or(PhysicsError::UnknownBody(body))?;
        if rb.colliders().is_empty() {
            return Err(PhysicsError::NoCollider(body));
        }
        for handle in rb.colliders() {
            if let Some(collider) = engine.colliders.get_mut(*handle) {
                collider.user_data = filter.to_user_data();
            }
        }
        Ok(())
    }

    fn filter(&self, body: BodyHandle) -> Option<FilterData> {
        let engine = self.engine.as_deref()?;
        let handle = *engine.bodies.get(body.0)?.colliders().first()?;
        engine
            .colliders
            .get(handle)
            .map(|c| FilterData::from_user_data(c.user_data))
    }

    fn create_revolute_motor(
        &mut self,
        body1: BodyHandle,
        body2: BodyHandle,
        desc: &RevoluteMotorDesc,
    ) -> Result<JointHandle> {
        let engine = self.engine_mut()?;
        engine.body(body1)?;
        engine.body(body2)?;
        let joint = create_revolute_motor(desc);
        Ok(JointHandle(
            engine.impulse_joints.insert(body1.0, body2.0, joint, true),
        ))
    }

    fn set_motor(
        &mut self,
        joint: JointHandle,
        target_velocity: f32,
        max_torque: f32,
    ) -> Result<()> {
        let engine = self.engine_mut()?;
        let impulse_joint = engine
            .impulse_joints
            .get_mut(joint.0, true)
            .ok_or(PhysicsError::UnknownJoint(joint))?;
        set_revolute_motor(&mut impulse_joint.data, target_velocity, max_torque);
        Ok(())
    }

    fn motor(&self, joint: JointHandle) -> Option<MotorState> {
        let engine = self.engine.as_deref()?;
        revolute_motor_state(&engine.impulse_joints.get(joint.0)?.data)
    }

    fn create_fixed_joint(&mut self, body1: BodyHandle, body2: BodyHandle) -> Result<JointHandle> {
        let engine = self.engine_mut()?;
        engine.body(body1)?;
        engine.body(body2)?;
        Ok(JointHandle(engine.impulse_joints.insert(
            body1.0,
            body2.0,
            create_fixed_joint(),
            true,
        )))
    }

    fn remove_joint(&mut self, joint: JointHandle) -> Result<()> {
        let engine = self.engine_mut()?;
        engine
            .impulse_joints
            .remove(joint.0, true)
            .map(|_| ())
            .ok_or(PhysicsError::UnknownJoint(joint))
    }

    fn pose(&self, body: BodyHandle) -> Option<Isometry3<f32>> {
        self.engine().ok()?.body(body).ok().map(|b| *b.position())
    }

    fn set_pose(&mut self, body: BodyHandle, pose: Isometry3<f32>) -> Result<()> {
        self.engine_mut()?.body_mut(body)?.set_position(pose, true);
        Ok(())
    }

    fn linvel(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.engine().ok()?.body(body).ok().map(|b| *b.linvel())
    }

    fn angvel(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.engine().ok()?.body(body).ok().map(|b| *b.angvel())
    }

    fn set_linvel(&mut self, body: BodyHandle, linvel: Vector3<f32>) -> Result<()> {
        self.engine_mut()?.body_mut(body)?.set_linvel(linvel, true);
        Ok(())
    }

    fn set_angvel(&mut self, body: BodyHandle, angvel: Vector3<f32>) -> Result<()> {
        self.engine_mut()?.body_mut(body)?.set_angvel(angvel, true);
        Ok(())
    }

    fn step(&mut self, dt: f32) {
        let Some(engine) = self.engine.as_deref_mut() else {
            return;
        };
        engine.step(dt);
        self.steps += 1;
        self.time += f64::from(dt);
    }
}
