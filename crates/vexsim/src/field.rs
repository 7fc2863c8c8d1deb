//! Static field geometry: ground, obstacles and imported collision meshes.

use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use vexsim_physics::{
    mesh_to_collider, ActorKind, BodyDesc, BodyHandle, ColliderDesc, ColliderStrategy, FieldMesh,
    Geometry, PhysicsFacade,
};

use crate::error::{Result, SessionError};

/// A static box on the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleConfig {
    /// Box center (m).
    pub center: [f32; 3],
    /// Box half extents (m).
    pub half_extents: [f32; 3],
    /// Rotation about the vertical axis (degrees).
    #[serde(default)]
    pub yaw: f32,
}

/// Field layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Add an infinite ground plane at y = 0.
    pub ground: bool,
    /// Static box obstacles.
    pub obstacles: Vec<ObstacleConfig>,
    /// Collision shape strategy for imported field meshes.
    pub mesh_strategy: ColliderStrategy,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            ground: true,
            obstacles: Vec::new(),
            mesh_strategy: ColliderStrategy::TriMesh,
        }
    }
}

impl FieldConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        for (i, obstacle) in self.obstacles.iter().enumerate() {
            if obstacle.half_extents.iter().any(|h| !(h.is_finite() && *h > 0.0)) {
                return Err(SessionError::InvalidConfig(format!(
                    "obstacle {i} half extents must be positive, got {:?}",
                    obstacle.half_extents
                )));
            }
            if obstacle.center.iter().any(|c| !c.is_finite()) || !obstacle.yaw.is_finite() {
                return Err(SessionError::InvalidConfig(format!(
                    "obstacle {i} placement must be finite"
                )));
            }
        }
        Ok(())
    }
}

/// Static bodies making up the field.
#[derive(Debug, Clone, Default)]
pub struct Field {
    ground: Option<BodyHandle>,
    obstacles: Vec<BodyHandle>,
    meshes: Vec<BodyHandle>,
    mesh_strategy: ColliderStrategy,
}

impl Field {
    /// Create the ground plane and obstacles.
    pub fn build<P: PhysicsFacade + ?Sized>(physics: &mut P, config: &FieldConfig) -> Result<Self> {
        let mut field = Self {
            mesh_strategy: config.mesh_strategy,
            ..Default::default()
        };

        if config.ground {
            let body = physics.create_body(&BodyDesc::fixed(Isometry3::identity()))?;
            physics.attach_collider(
                body,
                &ColliderDesc::new(
                    Geometry::HalfSpace {
                        normal: Vector3::y_axis(),
                    },
                    ActorKind::Ground.filter(),
                ),
            )?;
            field.ground = Some(body);
        }

        for obstacle in &config.obstacles {
            let [x, y, z] = obstacle.center;
            let [hx, hy, hz] = obstacle.half_extents;
            let pose = Isometry3::from_parts(
                Vector3::new(x, y, z).into(),
                UnitQuaternion::from_axis_angle(&Vector3::y_axis(), obstacle.yaw.to_radians()),
            );
            let body = physics.create_body(&BodyDesc::fixed(pose))?;
            physics.attach_collider(
                body,
                &ColliderDesc::new(
                    Geometry::Box {
                        half_extents: Vector3::new(hx, hy, hz),
                    },
                    ActorKind::Obstacle.filter(),
                ),
            )?;
            field.obstacles.push(body);
        }

        tracing::info!(
            ground = config.ground,
            obstacles = field.obstacles.len(),
            "field built"
        );
        Ok(field)
    }

    /// Add a static collision mesh in the ground category.
    pub fn add_mesh<P: PhysicsFacade + ?Sized>(
        &mut self,
        physics: &mut P,
        mesh: &FieldMesh,
        scale: f32,
        name: &str,
    ) -> Result<BodyHandle> {
        let shape = mesh_to_collider(mesh, Vector3::repeat(scale), self.mesh_strategy, name)?;
        let body = physics.create_body(&BodyDesc::fixed(Isometry3::identity()))?;
        if let Err(e) = physics.attach_collider(
            body,
            &ColliderDesc::new(Geometry::Shape(shape), ActorKind::Ground.filter()),
        ) {
            let _ = physics.remove_body(body);
            return Err(e.into());
        }
        tracing::info!(
            name,
            triangles = mesh.indices.len() / 3,
            strategy = ?self.mesh_strategy,
            "field mesh added"
        );
        self.meshes.push(body);
        Ok(body)
    }

    /// Ground plane body, if any.
    pub fn ground(&self) -> Option<BodyHandle> {
        self.ground
    }

    /// Obstacle bodies.
    pub fn obstacles(&self) -> &[BodyHandle] {
        &self.obstacles
    }

    /// Imported mesh bodies.
    pub fn meshes(&self) -> &[BodyHandle] {
        &self.meshes
    }
}
