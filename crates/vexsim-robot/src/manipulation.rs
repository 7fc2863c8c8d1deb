//! Intake/outtake: attaching free pieces to the chassis and ejecting them.
//!
//! Held pieces form a stack. Intake pushes the nearest free piece in range,
//! outtake pops the most recently attached one. While held, a piece is
//! welded to the chassis center by a fixed joint and opts out of every
//! contact.

use nalgebra::{Isometry3, Point3, Translation3, Vector3};
use serde::{Deserialize, Serialize};
use vexsim_physics::{ActorKind, BodyHandle, FilterData, JointHandle, PhysicsFacade};

use crate::drivetrain::Drivetrain;
use crate::error::{RobotError, Result};
use crate::piece::{PieceId, Pieces};

/// Hard upper bound on the number of held pieces.
pub const MAX_HELD: usize = 8;

/// Manipulator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManipulatorConfig {
    /// Maximum held pieces, at most [`MAX_HELD`].
    pub capacity: usize,
    /// Maximum distance from the front reference point to a piece for
    /// intake (m). Inclusive.
    pub intake_range: f32,
    /// Distance ahead of the chassis front face at which pieces are ejected (m).
    pub eject_clearance: f32,
    /// Forward speed given to an ejected piece (m/s).
    pub eject_speed: f32,
}

impl Default for ManipulatorConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_HELD,
            intake_range: 0.35,
            eject_clearance: 0.15,
            eject_speed: 1.0,
        }
    }
}

impl ManipulatorConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.capacity > MAX_HELD {
            return Err(RobotError::InvalidConfig(format!(
                "manipulator capacity must be in 1..={MAX_HELD}, got {}",
                self.capacity
            )));
        }
        if !(self.intake_range >= 0.0 && self.eject_clearance >= 0.0 && self.eject_speed >= 0.0) {
            return Err(RobotError::InvalidConfig(
                "intake range, eject clearance and eject speed must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// A piece attached to the chassis and the joint holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldPiece {
    /// The attached piece.
    pub piece: PieceId,
    /// Fixed joint between chassis and piece.
    pub joint: JointHandle,
}

/// The robot's intake/outtake mechanism.
#[derive(Debug, Clone, Default)]
pub struct Manipulator {
    config: ManipulatorConfig,
    held: Vec<HeldPiece>,
}

impl Manipulator {
    /// Create an empty manipulator.
    pub fn new(config: ManipulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            held: Vec::with_capacity(MAX_HELD),
        })
    }

    /// Manipulator tuning.
    pub fn config(&self) -> &ManipulatorConfig {
        &self.config
    }

    /// Attach the nearest free piece within range of the front reference point.
    ///
    /// Returns the attached piece, or `None` when full, nothing is in range,
    /// the drivetrain is inert, or the piece could not be attached. A failed
    /// attachment puts the piece back where it was, moving as it was.
    pub fn intake<P: PhysicsFacade + ?Sized>(
        &mut self,
        physics: &mut P,
        drivetrain: &Drivetrain,
        pieces: &mut Pieces,
    ) -> Option<PieceId> {
        if self.is_full() {
            tracing::debug!(held = self.held.len(), "intake ignored, manipulator full");
            return None;
        }
        let (Some(chassis), Some(chassis_pose)) =
            (drivetrain.chassis(), drivetrain.chassis_pose(physics))
        else {
            tracing::debug!("intake ignored, drivetrain inert");
            return None;
        };

        let front = drivetrain.front_reference_point(physics);
        let Some((id, distance)) = nearest_free(physics, pieces, front) else {
            tracing::debug!("intake ignored, no free piece");
            return None;
        };
        if distance > self.config.intake_range {
            tracing::debug!(distance, range = self.config.intake_range, "intake ignored, out of range");
            return None;
        }
        let body = pieces.get(id)?.body();

        // Joint first: if it fails nothing has been touched yet
        let joint = match physics.create_fixed_joint(chassis, body) {
            Ok(joint) => joint,
            Err(e) => {
                tracing::warn!(?id, error = %e, "attachment joint creation failed");
                return None;
            }
        };
        let before = (physics.pose(body), physics.linvel(body), physics.angvel(body));
        // Zero offset from the chassis center, chassis orientation
        if let Err(e) = place_body(physics, body, chassis_pose, Vector3::zeros(), FilterData::NONE) {
            tracing::warn!(?id, error = %e, "attaching piece failed");
            if let Err(e) = physics.remove_joint(joint) {
                tracing::warn!(?id, error = %e, "removing attachment joint failed");
            }
            if let (Some(pose), Some(linvel), Some(angvel)) = before {
                if let Err(e) = set_motion(physics, body, pose, linvel, angvel) {
                    tracing::warn!(?id, error = %e, "restoring piece motion failed");
                }
            }
            if let Err(e) = physics.set_filter(body, ActorKind::Piece.filter()) {
                tracing::warn!(?id, error = %e, "restoring piece filter failed");
            }
            return None;
        }

        self.held.push(HeldPiece { piece: id, joint });
        if let Some(piece) = pieces.get_mut(id) {
            piece.set_held(true);
        }
        tracing::info!(?id, distance, held = self.held.len(), "piece intaken");
        Some(id)
    }

    /// Eject the most recently attached piece ahead of the chassis.
    ///
    /// Returns the released piece, or `None` when nothing is held.
    pub fn outtake<P: PhysicsFacade + ?Sized>(
        &mut self,
        physics: &mut P,
        drivetrain: &Drivetrain,
        pieces: &mut Pieces,
    ) -> Option<PieceId> {
        if self.held.is_empty() {
            tracing::debug!("outtake ignored, nothing held");
            return None;
        }
        let Some(chassis_pose) = drivetrain.chassis_pose(physics) else {
            tracing::debug!("outtake ignored, drivetrain inert");
            return None;
        };
        let record = self.held.pop()?;

        if let Err(e) = physics.remove_joint(record.joint) {
            tracing::warn!(piece = ?record.piece, error = %e, "attachment joint already gone");
        }

        let forward = chassis_pose.rotation * Vector3::z();
        let reach = drivetrain.config().half_length() + self.config.eject_clearance;
        let mut position = chassis_pose.translation.vector + forward * reach;
        position.y = chassis_pose.translation.vector.y;
        let eject = Isometry3::from_parts(Translation3::from(position), chassis_pose.rotation);

        if let Some(piece) = pieces.get_mut(record.piece) {
            if let Err(e) = place_body(
                physics,
                piece.body(),
                eject,
                forward * self.config.eject_speed,
                ActorKind::Piece.filter(),
            ) {
                tracing::warn!(piece = ?record.piece, error = %e, "ejecting piece failed");
            }
            piece.set_held(false);
        }
        tracing::info!(piece = ?record.piece, held = self.held.len(), "piece ejected");
        Some(record.piece)
    }

    /// Number of held pieces.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// True when another intake would be refused.
    pub fn is_full(&self) -> bool {
        self.held.len() >= self.config.capacity
    }

    /// True when `id` is held.
    pub fn has_piece(&self, id: PieceId) -> bool {
        self.held.iter().any(|h| h.piece == id)
    }

    /// Held pieces, oldest first; the last one is ejected next.
    pub fn held(&self) -> &[HeldPiece] {
        &self.held
    }

    /// True when every piece is either free or referenced by exactly one
    /// held record, and the stack is within capacity.
    pub fn check_invariants(&self, pieces: &Pieces) -> bool {
        if self.held.len() > self.config.capacity {
            return false;
        }
        let records_valid = self.held.iter().all(|h| {
            pieces.get(h.piece).is_some_and(|p| p.is_held())
                && self.held.iter().filter(|o| o.piece == h.piece).count() == 1
        });
        let pieces_valid = pieces
            .iter()
            .all(|(id, piece)| piece.is_held() == self.has_piece(id));
        records_valid && pieces_valid
    }
}

/// Nearest free piece to `point` and its distance.
///
/// Ties keep the first piece in arena order.
pub fn nearest_free<P: PhysicsFacade + ?Sized>(
    physics: &P,
    pieces: &Pieces,
    point: Point3<f32>,
) -> Option<(PieceId, f32)> {
    let mut best: Option<(PieceId, f32)> = None;
    for (id, piece) in pieces.free() {
        let Some(pose) = physics.pose(piece.body()) else {
            continue;
        };
        let distance = (Point3::from(pose.translation.vector) - point).norm();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((id, distance));
        }
    }
    best
}

fn place_body<P: PhysicsFacade + ?Sized>(
    physics: &mut P,
    body: BodyHandle,
    pose: Isometry3<f32>,
    linvel: Vector3<f32>,
    filter: FilterData,
) -> vexsim_physics::Result<()> {
    set_motion(physics, body, pose, linvel, Vector3::zeros())?;
    physics.set_filter(body, filter)
}

fn set_motion<P: PhysicsFacade + ?Sized>(
    physics: &mut P,
    body: BodyHandle,
    pose: Isometry3<f32>,
    linvel: Vector3<f32>,
    angvel: Vector3<f32>,
) -> vexsim_physics::Result<()> {
    physics.set_pose(body, pose)?;
    physics.set_linvel(body, linvel)?;
    physics.set_angvel(body, angvel)
}
