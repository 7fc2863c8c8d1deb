//! The simulation session: owns the world and runs one frame at a time.

use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};
use vexsim_physics::{FieldMesh, PhysicsFacade, PhysicsWorld};
use vexsim_robot::{Drivetrain, Manipulator, PieceColor, PieceId, Pieces};

use crate::camera::OrbitCamera;
use crate::config::SimConfig;
use crate::error::Result;
use crate::field::Field;
use crate::frame::{FixedStepTarget, FrameController};
use crate::input::InputSnapshot;
use crate::render::{DrawItem, MeshSet, RenderFrame, Renderer};

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Frames run.
    pub frames: u64,
    /// Physics steps taken.
    pub steps: u64,
    /// Simulated time (s).
    pub sim_time: f64,
    /// Pieces spawned so far.
    pub spawned: u64,
    /// Pieces currently on the field or held.
    pub pieces: usize,
    /// Pieces currently held.
    pub held: usize,
    /// Contact start events observed.
    pub contacts: u64,
}

/// What happened during one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// Physics steps run.
    pub steps: u32,
    /// Pieces spawned this frame.
    pub spawned: Vec<PieceId>,
    /// Piece attached by intake.
    pub intaken: Option<PieceId>,
    /// Piece released by outtake.
    pub ejected: Option<PieceId>,
}

/// Borrowed drivetrain and world, advanced together by the frame controller.
struct Stepper<'a> {
    drivetrain: &'a mut Drivetrain,
    physics: &'a mut PhysicsWorld,
}

impl FixedStepTarget for Stepper<'_> {
    fn update_actuators(&mut self, dt: f32) {
        self.drivetrain.update(&mut *self.physics, dt);
    }

    fn step_physics(&mut self, dt: f32) {
        self.physics.step(dt);
    }
}

/// An interactive robot simulation.
///
/// All bodies, joints and pieces are owned here and only mutated from
/// [`frame`](Self::frame) or the discrete action methods, between physics
/// steps.
#[derive(Debug)]
pub struct Session {
    config: SimConfig,
    physics: PhysicsWorld,
    field: Field,
    drivetrain: Drivetrain,
    pieces: Pieces,
    manipulator: Manipulator,
    camera: OrbitCamera,
    frames: FrameController,
    stats: SessionStats,
}

impl Session {
    /// Validate `config` and build the world, field and robot.
    ///
    /// Configuration errors are returned. Failures while building physics
    /// objects are logged once and leave the affected part inert.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let mut physics = PhysicsWorld::initialize(config.physics.clone());
        let field = Field::build(&mut physics, &config.field).unwrap_or_else(|e| {
            tracing::error!(error = %e, "field setup failed, continuing without it");
            Field::default()
        });
        let drivetrain = Drivetrain::build(&mut physics, config.drivetrain.clone());
        let pieces = Pieces::new(config.pieces.clone());
        let manipulator = Manipulator::new(config.manipulator.clone())?;
        let camera = OrbitCamera::new(config.camera.clone());
        let frames = FrameController::new(config.physics.timestep, config.frame.max_frame_delta)?;

        tracing::info!(
            timestep = config.physics.timestep,
            robot_inert = drivetrain.is_inert(),
            "session started"
        );
        Ok(Self {
            config,
            physics,
            field,
            drivetrain,
            pieces,
            manipulator,
            camera,
            frames,
            stats: SessionStats::default(),
        })
    }

    /// Run one real-time frame and hand the result to `renderer`.
    ///
    /// Order: drive input, discrete actions, fixed-step drain, camera,
    /// render.
    pub fn frame(
        &mut self,
        input: &InputSnapshot,
        real_dt: f32,
        renderer: &mut dyn Renderer,
    ) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();

        self.drivetrain.set_input(input.left, input.right);

        // Discrete actions apply immediately, before this frame's steps
        if input.pressed.spawn_a {
            outcome.spawned.extend(self.spawn_piece(PieceColor::Red));
        }
        if input.pressed.spawn_b {
            outcome.spawned.extend(self.spawn_piece(PieceColor::Blue));
        }
        if input.pressed.intake {
            outcome.intaken = self.intake();
        }
        if input.pressed.outtake {
            outcome.ejected = self.outtake();
        }

        let mut stepper = Stepper {
            drivetrain: &mut self.drivetrain,
            physics: &mut self.physics,
        };
        outcome.steps = self.frames.advance(real_dt, &mut stepper);

        let contacts = self
            .physics
            .drain_contact_events()
            .into_iter()
            .filter(|c| c.started)
            .count();

        let dt = self.frames.clamp_delta(real_dt);
        self.camera.apply(&input.camera, dt);

        renderer.render(&self.render_frame());

        self.stats.frames += 1;
        self.stats.steps = self.physics.steps();
        self.stats.sim_time = self.physics.time();
        self.stats.contacts += contacts as u64;
        self.refresh_counts();
        outcome
    }

    /// Spawn a piece above the front reference point.
    pub fn spawn_piece(&mut self, color: PieceColor) -> Option<PieceId> {
        let position = self.drivetrain.front_reference_point(&self.physics)
            + Vector3::y() * self.pieces.config().spawn_lift;
        self.spawn_piece_at(color, position)
    }

    /// Spawn a piece at an explicit position.
    pub fn spawn_piece_at(&mut self, color: PieceColor, position: Point3<f32>) -> Option<PieceId> {
        let id = match self.pieces.spawn(&mut self.physics, color, position) {
            Ok(id) => id?,
            Err(e) => {
                tracing::warn!(color = color.name(), error = %e, "piece spawn failed");
                return None;
            }
        };
        self.stats.spawned += 1;
        self.refresh_counts();
        Some(id)
    }

    /// Remove a free piece.
    pub fn despawn_piece(&mut self, id: PieceId) -> bool {
        let removed = self.pieces.despawn(&mut self.physics, id);
        self.refresh_counts();
        removed
    }

    /// Attach the nearest free piece in range.
    pub fn intake(&mut self) -> Option<PieceId> {
        let id = self
            .manipulator
            .intake(&mut self.physics, &self.drivetrain, &mut self.pieces);
        self.refresh_counts();
        id
    }

    /// Eject the last attached piece.
    pub fn outtake(&mut self) -> Option<PieceId> {
        let id = self
            .manipulator
            .outtake(&mut self.physics, &self.drivetrain, &mut self.pieces);
        self.refresh_counts();
        id
    }

    /// Add an imported static collision mesh to the field.
    pub fn add_field_mesh(&mut self, mesh: &FieldMesh, scale: f32, name: &str) -> Result<()> {
        self.field.add_mesh(&mut self.physics, mesh, scale, name)?;
        Ok(())
    }

    /// Draw list for the current state.
    pub fn render_frame(&self) -> RenderFrame {
        let mut draws = Vec::with_capacity(2 + self.pieces.len());
        draws.push(DrawItem {
            mesh: MeshSet::Field,
            model: Matrix4::identity(),
        });
        if !self.drivetrain.is_inert() {
            draws.push(DrawItem {
                mesh: MeshSet::Robot,
                model: self
                    .drivetrain
                    .pose_matrix(&self.physics, self.config.frame.robot_scale),
            });
        }
        for (_, piece) in self.pieces.iter() {
            let Some(pose) = self.physics.pose(piece.body()) else {
                continue;
            };
            draws.push(DrawItem {
                mesh: MeshSet::for_piece(piece.color()),
                model: pose.to_homogeneous(),
            });
        }
        RenderFrame {
            view_projection: self.camera.view_projection(),
            draws,
        }
    }

    fn refresh_counts(&mut self) {
        self.stats.pieces = self.pieces.len();
        self.stats.held = self.manipulator.held_count();
    }

    /// Running counters.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Effective configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The physics world.
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// The static field.
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// The robot drivetrain.
    pub fn drivetrain(&self) -> &Drivetrain {
        &self.drivetrain
    }

    /// Every piece.
    pub fn pieces(&self) -> &Pieces {
        &self.pieces
    }

    /// The intake/outtake mechanism.
    pub fn manipulator(&self) -> &Manipulator {
        &self.manipulator
    }

    /// The camera.
    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Mutable camera, for viewport changes.
    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    /// The fixed-step controller.
    pub fn frame_controller(&self) -> &FrameController {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Buttons;
    use crate::render::{NullRenderer, RecordingRenderer};
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn pressed(buttons: Buttons) -> InputSnapshot {
        InputSnapshot {
            pressed: buttons,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_session() {
        let session = Session::new(SimConfig::default()).unwrap();
        assert!(session.physics().is_initialized());
        assert!(!session.drivetrain().is_inert());
        assert!(session.field().ground().is_some());
        assert_eq!(session.stats(), SessionStats::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SimConfig::default();
        config.frame.max_frame_delta = 0.0;
        assert!(Session::new(config).is_err());
    }

    #[test]
    fn test_spawn_above_front_point() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        let front = session.drivetrain().front_reference_point(session.physics());

        let outcome = session.frame(
            &pressed(Buttons {
                spawn_a: true,
                spawn_b: true,
                ..Default::default()
            }),
            0.0,
            &mut NullRenderer,
        );

        assert_eq!(outcome.spawned.len(), 2);
        assert_eq!(outcome.steps, 0);
        let pos = session.pieces().position(session.physics(), outcome.spawned[0]).unwrap();
        assert_relative_eq!(pos, front + Vector3::new(0.0, 0.3, 0.0), epsilon = 1e-5);
        assert_eq!(session.stats().spawned, 2);
        assert_eq!(session.stats().pieces, 2);
    }

    #[test]
    fn test_actions_apply_before_steps() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        let front = session.drivetrain().front_reference_point(session.physics());
        let id = session
            .spawn_piece_at(PieceColor::Red, front + Vector3::new(0.0, 0.0, 0.1))
            .unwrap();

        let outcome = session.frame(
            &pressed(Buttons {
                intake: true,
                ..Default::default()
            }),
            DT,
            &mut NullRenderer,
        );

        assert_eq!(outcome.intaken, Some(id));
        assert_eq!(outcome.steps, 1);
        assert_eq!(session.stats().held, 1);
    }

    #[test]
    fn test_render_frame_contents() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        session.spawn_piece(PieceColor::Red).unwrap();
        session.spawn_piece(PieceColor::Blue).unwrap();
        session.spawn_piece(PieceColor::Blue).unwrap();

        let mut renderer = RecordingRenderer::default();
        session.frame(&InputSnapshot::default(), DT, &mut renderer);

        let frame = renderer.last().unwrap();
        assert_eq!(frame.items(MeshSet::Field).count(), 1);
        assert_eq!(frame.items(MeshSet::Robot).count(), 1);
        assert_eq!(frame.items(MeshSet::PieceA).count(), 1);
        assert_eq!(frame.items(MeshSet::PieceB).count(), 2);
        assert_eq!(frame.view_projection, session.camera().view_projection());

        let robot = frame.items(MeshSet::Robot).next().unwrap();
        assert_relative_eq!(robot.model[(0, 0)].abs() + robot.model[(0, 2)].abs(), 0.01, epsilon = 1e-3);
    }

    #[test]
    fn test_stats_track_steps() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        for _ in 0..10 {
            session.frame(&InputSnapshot::drive(1.0, 1.0), DT * 2.0, &mut NullRenderer);
        }
        let stats = session.stats();
        assert_eq!(stats.frames, 10);
        assert_eq!(stats.steps, 20);
        assert_relative_eq!(stats.sim_time, 20.0 * f64::from(DT), epsilon = 1e-6);
    }

    #[test]
    fn test_despawn_held_piece_refused() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        let front = session.drivetrain().front_reference_point(session.physics());
        let id = session
            .spawn_piece_at(PieceColor::Blue, front + Vector3::new(0.0, 0.0, 0.05))
            .unwrap();
        session.intake().unwrap();

        assert!(!session.despawn_piece(id));
        session.outtake().unwrap();
        assert!(session.despawn_piece(id));
        assert_eq!(session.stats().pieces, 0);
    }
}
