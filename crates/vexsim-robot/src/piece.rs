//! Game pieces: spawnable spheres the robot can pick up.

use nalgebra::{Isometry3, Point3};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use vexsim_physics::{ActorKind, BodyDesc, BodyHandle, ColliderDesc, Geometry, PhysicsFacade};

use crate::error::{RobotError, Result};

new_key_type! {
    /// Stable identifier of a piece.
    pub struct PieceId;
}

/// Piece identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    /// Red alliance piece.
    Red,
    /// Blue alliance piece.
    Blue,
}

impl PieceColor {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            PieceColor::Red => "red",
            PieceColor::Blue => "blue",
        }
    }
}

/// Piece parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceConfig {
    /// Sphere radius (m).
    pub radius: f32,
    /// Density (kg/m³).
    pub density: f32,
    /// Linear damping, so pieces settle on the field.
    pub linear_damping: f32,
    /// Angular damping.
    pub angular_damping: f32,
    /// Height above the front reference point at which pieces spawn (m).
    pub spawn_lift: f32,
    /// Maximum number of pieces alive at once.
    pub max_pieces: usize,
}

impl Default for PieceConfig {
    fn default() -> Self {
        Self {
            radius: 0.07,
            density: 1.0,
            linear_damping: 2.0,
            angular_damping: 1.0,
            spawn_lift: 0.3,
            max_pieces: 64,
        }
    }
}

impl PieceConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.radius > 0.0 && self.density > 0.0) {
            return Err(RobotError::InvalidConfig(format!(
                "piece radius and density must be positive (radius {}, density {})",
                self.radius, self.density
            )));
        }
        if self.linear_damping < 0.0 || self.angular_damping < 0.0 {
            return Err(RobotError::InvalidConfig(
                "piece damping must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// A game piece and its physics body.
#[derive(Debug, Clone)]
pub struct Piece {
    body: BodyHandle,
    color: PieceColor,
    held: bool,
}

impl Piece {
    /// Physics body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Piece identity.
    pub fn color(&self) -> PieceColor {
        self.color
    }

    /// True while attached to the robot.
    pub fn is_held(&self) -> bool {
        self.held
    }

    pub(crate) fn set_held(&mut self, held: bool) {
        self.held = held;
    }
}

/// Arena owning every piece in the session.
#[derive(Debug, Default)]
pub struct Pieces {
    config: PieceConfig,
    arena: SlotMap<PieceId, Piece>,
}

impl Pieces {
    /// Create an empty arena.
    pub fn new(config: PieceConfig) -> Self {
        Self {
            config,
            arena: SlotMap::with_key(),
        }
    }

    /// Piece parameters.
    pub fn config(&self) -> &PieceConfig {
        &self.config
    }

    /// Spawn a piece at `position`.
    ///
    /// Returns `Ok(None)` when the arena is already at `max_pieces`.
    pub fn spawn<P: PhysicsFacade + ?Sized>(
        &mut self,
        physics: &mut P,
        color: PieceColor,
        position: Point3<f32>,
    ) -> Result<Option<PieceId>> {
        if self.arena.len() >= self.config.max_pieces {
            tracing::warn!(
                max = self.config.max_pieces,
                "piece limit reached, ignoring spawn"
            );
            return Ok(None);
        }

        let body = physics.create_body(
            &BodyDesc::dynamic(Isometry3::translation(position.x, position.y, position.z))
                .with_damping(self.config.linear_damping, self.config.angular_damping),
        )?;
        let collider = ColliderDesc::new(
            Geometry::Sphere {
                radius: self.config.radius,
            },
            ActorKind::Piece.filter(),
        )
        .with_density(self.config.density);
        if let Err(e) = physics.attach_collider(body, &collider) {
            let _ = physics.remove_body(body);
            return Err(e.into());
        }

        let id = self.arena.insert(Piece {
            body,
            color,
            held: false,
        });
        tracing::info!(
            color = color.name(),
            x = position.x,
            y = position.y,
            z = position.z,
            "spawned piece"
        );
        Ok(Some(id))
    }

    /// Remove a free piece and its body.
    ///
    /// Held pieces stay put; eject them first. Returns whether a piece was
    /// removed.
    pub fn despawn<P: PhysicsFacade + ?Sized>(&mut self, physics: &mut P, id: PieceId) -> bool {
        match self.arena.get(id) {
            Some(piece) if !piece.held => {}
            Some(_) => {
                tracing::debug!(?id, "refusing to despawn a held piece");
                return false;
            }
            None => return false,
        }
        if let Some(piece) = self.arena.remove(id) {
            if let Err(e) = physics.remove_body(piece.body) {
                tracing::warn!(?id, error = %e, "piece body already gone");
            }
        }
        true
    }

    /// Look up a piece.
    pub fn get(&self, id: PieceId) -> Option<&Piece> {
        self.arena.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.arena.get_mut(id)
    }

    /// Iterate over every piece.
    pub fn iter(&self) -> impl Iterator<Item = (PieceId, &Piece)> {
        self.arena.iter()
    }

    /// Iterate over pieces that are not held.
    pub fn free(&self) -> impl Iterator<Item = (PieceId, &Piece)> {
        self.arena.iter().filter(|(_, p)| !p.held)
    }

    /// Number of pieces alive.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// True when no piece exists.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// World position of a piece.
    pub fn position<P: PhysicsFacade + ?Sized>(
        &self,
        physics: &P,
        id: PieceId,
    ) -> Option<Point3<f32>> {
        let body = self.arena.get(id)?.body;
        physics.pose(body).map(|pose| pose.translation.vector.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vexsim_physics::{PhysicsSettings, PhysicsWorld};

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(PhysicsSettings::default()).unwrap()
    }

    #[test]
    fn test_spawn_piece() {
        let mut world = world();
        let mut pieces = Pieces::new(PieceConfig::default());

        let id = pieces
            .spawn(&mut world, PieceColor::Red, Point3::new(0.0, 1.0, 0.2))
            .unwrap()
            .unwrap();

        let piece = pieces.get(id).unwrap();
        assert_eq!(piece.color(), PieceColor::Red);
        assert!(!piece.is_held());
        assert_eq!(world.filter(piece.body()), Some(ActorKind::Piece.filter()));

        let pos = pieces.position(&world, id).unwrap();
        assert!((pos - Point3::new(0.0, 1.0, 0.2)).norm() < 1e-6);
    }

    #[test]
    fn test_spawn_limit() {
        let mut world = world();
        let mut pieces = Pieces::new(PieceConfig {
            max_pieces: 2,
            ..Default::default()
        });

        for _ in 0..2 {
            assert!(pieces
                .spawn(&mut world, PieceColor::Blue, Point3::origin())
                .unwrap()
                .is_some());
        }
        assert_eq!(
            pieces.spawn(&mut world, PieceColor::Blue, Point3::origin()),
            Ok(None)
        );
        assert_eq!(pieces.len(), 2);
        assert_eq!(world.body_count(), 2);
    }

    #[test]
    fn test_despawn() {
        let mut world = world();
        let mut pieces = Pieces::new(PieceConfig::default());
        let id = pieces
            .spawn(&mut world, PieceColor::Red, Point3::origin())
            .unwrap()
            .unwrap();

        pieces.get_mut(id).unwrap().set_held(true);
        assert!(!pieces.despawn(&mut world, id));

        pieces.get_mut(id).unwrap().set_held(false);
        assert!(pieces.despawn(&mut world, id));
        assert!(pieces.is_empty());
        assert_eq!(world.body_count(), 0);
        assert!(!pieces.despawn(&mut world, id));
    }

    #[test]
    fn test_spawn_on_inert_world() {
        let mut world = PhysicsWorld::initialize(PhysicsSettings {
            timestep: -1.0,
            ..Default::default()
        });
        let mut pieces = Pieces::new(PieceConfig::default());
        assert!(pieces
            .spawn(&mut world, PieceColor::Red, Point3::origin())
            .is_err());
        assert!(pieces.is_empty());
    }
}
