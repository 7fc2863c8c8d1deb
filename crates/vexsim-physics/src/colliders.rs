//! Collision shape generation.
//!
//! Primitive shapes for robot parts and pieces, plus conversion of field
//! triangle meshes into static collision geometry.

use nalgebra::{Point3, UnitVector3, Vector3};
use parry3d::shape::{ConvexPolyhedron, SharedShape, TriMesh};
use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;

/// Triangle mesh in world units (meters).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]`.
    pub vertices: Vec<f32>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]`.
    pub indices: Vec<u32>,
}

/// Strategy for generating collision shapes from a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderStrategy {
    /// Triangle mesh (exact, static bodies only).
    #[default]
    TriMesh,
    /// Convex hull (fast, approximate).
    ConvexHull,
    /// Axis-aligned bounding box (fastest, rough).
    Aabb,
}

/// Collision geometry attached to a body.
#[derive(Clone)]
pub enum Geometry {
    /// Sphere of the given radius.
    Sphere {
        /// Radius in meters.
        radius: f32,
    },
    /// Box given by its half extents.
    Box {
        /// Half extents in meters.
        half_extents: Vector3<f32>,
    },
    /// Capsule whose segment lies along the local X axis.
    CapsuleX {
        /// Half length of the inner segment.
        half_length: f32,
        /// Radius of the capsule.
        radius: f32,
    },
    /// Infinite plane with outward normal.
    HalfSpace {
        /// Outward normal.
        normal: UnitVector3<f32>,
    },
    /// Prebuilt shape, typically from [`mesh_to_collider`].
    Shape(SharedShape),
}

impl Geometry {
    /// Build the parry shape.
    pub fn to_shape(&self) -> SharedShape {
        match self {
            Geometry::Sphere { radius } => SharedShape::ball(*radius),
            Geometry::Box { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Geometry::CapsuleX {
                half_length,
                radius,
            } => SharedShape::capsule_x(*half_length, *radius),
            Geometry::HalfSpace { normal } => SharedShape::halfspace(*normal),
            Geometry::Shape(shape) => shape.clone(),
        }
    }
}

impl std::fmt::Debug for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Geometry::Sphere { radius } => f.debug_struct("Sphere").field("radius", radius).finish(),
            Geometry::Box { half_extents } => f
                .debug_struct("Box")
                .field("half_extents", half_extents)
                .finish(),
            Geometry::CapsuleX {
                half_length,
                radius,
            } => f
                .debug_struct("CapsuleX")
                .field("half_length", half_length)
                .field("radius", radius)
                .finish(),
            Geometry::HalfSpace { normal } => {
                f.debug_struct("HalfSpace").field("normal", normal).finish()
            }
            Geometry::Shape(shape) => write!(f, "Shape({:?})", shape.shape_type()),
        }
    }
}

/// Generate a collision shape from a field mesh.
///
/// # Arguments
///
/// * `mesh` - The triangle mesh to convert
/// * `scale` - Per-axis scale applied to every vertex
/// * `strategy` - The collision shape strategy to use
/// * `name` - Name for error messages
pub fn mesh_to_collider(
    mesh: &FieldMesh,
    scale: Vector3<f32>,
    strategy: ColliderStrategy,
    name: &str,
) -> Result<SharedShape, PhysicsError> {
    if mesh.vertices.is_empty() || mesh.indices.is_empty() {
        return Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: "Empty mesh".to_string(),
        });
    }
    if mesh.vertices.len() % 3 != 0 || mesh.indices.len() % 3 != 0 {
        return Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: "Vertex or index buffer is not a multiple of 3".to_string(),
        });
    }

    let points = scaled_points(mesh, scale);
    if let Some(bad) = mesh.indices.iter().find(|&&i| i as usize >= points.len()) {
        return Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: format!("Index {bad} out of range for {} vertices", points.len()),
        });
    }

    match strategy {
        ColliderStrategy::TriMesh => create_trimesh(mesh, points, name),
        ColliderStrategy::ConvexHull => create_convex_hull(points),
        ColliderStrategy::Aabb => Ok(create_aabb(&points)),
    }
}

fn scaled_points(mesh: &FieldMesh, scale: Vector3<f32>) -> Vec<Point3<f32>> {
    mesh.vertices
        .chunks(3)
        .map(|v| Point3::new(v[0] * scale.x, v[1] * scale.y, v[2] * scale.z))
        .collect()
}

fn create_trimesh(
    mesh: &FieldMesh,
    points: Vec<Point3<f32>>,
    name: &str,
) -> Result<SharedShape, PhysicsError> {
    let indices: Vec<[u32; 3]> = mesh
        .indices
        .chunks(3)
        .map(|i| [i[0], i[1], i[2]])
        .collect();

    match TriMesh::new(points, indices) {
        Ok(trimesh) => Ok(SharedShape::new(trimesh)),
        Err(e) => Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: format!("Failed to create trimesh: {:?}", e),
        }),
    }
}

/// Thinnest half extent a generated box may have.
const MIN_HALF_EXTENT: f32 = 0.005;

fn create_convex_hull(points: Vec<Point3<f32>>) -> Result<SharedShape, PhysicsError> {
    // parry accepts coplanar input and returns a zero-volume hull
    let (min, max) = bounds(&points);
    let flat = (max - min).iter().any(|extent| *extent < 2.0 * MIN_HALF_EXTENT);
    if points.len() < 4 || flat {
        return Ok(create_aabb(&points));
    }
    match ConvexPolyhedron::from_convex_hull(&points) {
        Some(hull) => Ok(SharedShape::new(hull)),
        None => Ok(create_aabb(&points)),
    }
}

fn bounds(points: &[Point3<f32>]) -> (Vector3<f32>, Vector3<f32>) {
    let mut min = Vector3::repeat(f32::INFINITY);
    let mut max = Vector3::repeat(f32::NEG_INFINITY);
    for p in points {
        min = min.inf(&p.coords);
        max = max.sup(&p.coords);
    }
    (min, max)
}

fn create_aabb(points: &[Point3<f32>]) -> SharedShape {
    let (min, max) = bounds(points);
    // Keep flat meshes collidable
    let half_extents = ((max - min) / 2.0).map(|h| h.max(MIN_HALF_EXTENT));
    SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_quad() -> FieldMesh {
        // 2m x 2m floor tile at y = 0
        FieldMesh {
            vertices: vec![
                -1.0, 0.0, -1.0, 1.0, 0.0, -1.0, 1.0, 0.0, 1.0, -1.0, 0.0, 1.0,
            ],
            indices: vec![0, 2, 1, 0, 3, 2],
        }
    }

    fn unit_cube() -> FieldMesh {
        let s = 0.5;
        FieldMesh {
            vertices: vec![
                -s, -s, s, s, -s, s, s, s, s, -s, s, s, //
                -s, -s, -s, -s, s, -s, s, s, -s, s, -s, -s,
            ],
            indices: vec![
                0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7, 3, 2, 6, 3, 6, 5, 0, 7, 1, 0, 4, 7, 1, 7, 6,
                1, 6, 2, 0, 3, 5, 0, 5, 4,
            ],
        }
    }

    #[test]
    fn test_trimesh() {
        let shape = mesh_to_collider(
            &field_quad(),
            Vector3::repeat(1.0),
            ColliderStrategy::TriMesh,
            "field",
        )
        .unwrap();
        assert!(shape.as_trimesh().is_some());
    }

    #[test]
    fn test_convex_hull() {
        let shape = mesh_to_collider(
            &unit_cube(),
            Vector3::repeat(1.0),
            ColliderStrategy::ConvexHull,
            "cube",
        )
        .unwrap();
        assert!(shape.as_convex_polyhedron().is_some());
    }

    #[test]
    fn test_flat_hull_falls_back_to_box() {
        let shape = mesh_to_collider(
            &field_quad(),
            Vector3::repeat(1.0),
            ColliderStrategy::ConvexHull,
            "field",
        )
        .unwrap();
        let cuboid = shape.as_cuboid().unwrap();
        assert!((cuboid.half_extents.x - 1.0).abs() < 1e-6);
        assert!((cuboid.half_extents.y - MIN_HALF_EXTENT).abs() < 1e-6);
        assert!((cuboid.half_extents.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_thin_slab_hull_falls_back_to_box() {
        // Cube squashed to 1 mm on Y
        let mut mesh = unit_cube();
        for v in mesh.vertices.chunks_mut(3) {
            v[1] *= 0.001;
        }
        let shape =
            mesh_to_collider(&mesh, Vector3::repeat(1.0), ColliderStrategy::ConvexHull, "slab")
                .unwrap();
        assert!(shape.as_convex_polyhedron().is_none());
        assert!(shape.as_cuboid().is_some());
    }

    #[test]
    fn test_aabb_scaled() {
        let shape = mesh_to_collider(
            &unit_cube(),
            Vector3::new(2.0, 1.0, 4.0),
            ColliderStrategy::Aabb,
            "cube",
        )
        .unwrap();
        let cuboid = shape.as_cuboid().unwrap();
        assert!((cuboid.half_extents.x - 1.0).abs() < 1e-6);
        assert!((cuboid.half_extents.y - 0.5).abs() < 1e-6);
        assert!((cuboid.half_extents.z - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_meshes() {
        let empty = FieldMesh::default();
        assert!(matches!(
            mesh_to_collider(&empty, Vector3::repeat(1.0), ColliderStrategy::TriMesh, "empty"),
            Err(PhysicsError::CollisionShape { .. })
        ));

        let mut broken = field_quad();
        broken.indices[0] = 42;
        assert!(mesh_to_collider(&broken, Vector3::repeat(1.0), ColliderStrategy::TriMesh, "broken")
            .is_err());
    }
}
