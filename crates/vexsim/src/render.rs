//! Render handoff: what to draw each frame and where.
//!
//! The session knows nothing about meshes or GPUs. It produces a
//! [`RenderFrame`] listing mesh-set identifiers with their model
//! transforms, and hands it to a [`Renderer`].

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use vexsim_robot::PieceColor;

/// Identifies a group of meshes loaded by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshSet {
    /// Static field geometry.
    Field,
    /// The robot model.
    Robot,
    /// Red piece.
    PieceA,
    /// Blue piece.
    PieceB,
}

impl MeshSet {
    /// Mesh set used to draw a piece of `color`.
    pub fn for_piece(color: PieceColor) -> Self {
        match color {
            PieceColor::Red => MeshSet::PieceA,
            PieceColor::Blue => MeshSet::PieceB,
        }
    }
}

/// One mesh set drawn with one model transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawItem {
    /// What to draw.
    pub mesh: MeshSet,
    /// Model-to-world transform.
    pub model: Matrix4<f32>,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    /// Camera projection times view.
    pub view_projection: Matrix4<f32>,
    /// Draw list, field first, then robot, then pieces.
    pub draws: Vec<DrawItem>,
}

impl RenderFrame {
    /// Draw items using `mesh`.
    pub fn items(&self, mesh: MeshSet) -> impl Iterator<Item = &DrawItem> {
        self.draws.iter().filter(move |d| d.mesh == mesh)
    }
}

/// Consumer of render frames. Never feeds back into the simulation.
pub trait Renderer {
    /// Draw one frame.
    fn render(&mut self, frame: &RenderFrame);
}

impl<F: FnMut(&RenderFrame)> Renderer for F {
    fn render(&mut self, frame: &RenderFrame) {
        self(frame)
    }
}

/// Renderer that discards every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _frame: &RenderFrame) {}
}

/// Renderer that keeps the most recent frame, for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    last: Option<RenderFrame>,
    frames: u64,
}

impl RecordingRenderer {
    /// Most recently rendered frame.
    pub fn last(&self) -> Option<&RenderFrame> {
        self.last.as_ref()
    }

    /// Number of frames rendered.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, frame: &RenderFrame) {
        self.last = Some(frame.clone());
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> RenderFrame {
        RenderFrame {
            view_projection: Matrix4::identity(),
            draws: vec![
                DrawItem {
                    mesh: MeshSet::Field,
                    model: Matrix4::identity(),
                },
                DrawItem {
                    mesh: MeshSet::PieceA,
                    model: Matrix4::new_translation(&nalgebra::Vector3::new(1.0, 0.0, 0.0)),
                },
            ],
        }
    }

    #[test]
    fn test_piece_mesh_sets() {
        assert_eq!(MeshSet::for_piece(PieceColor::Red), MeshSet::PieceA);
        assert_eq!(MeshSet::for_piece(PieceColor::Blue), MeshSet::PieceB);
    }

    #[test]
    fn test_closure_renderer() {
        let mut count = 0;
        let mut renderer = |frame: &RenderFrame| count += frame.draws.len();
        renderer.render(&frame());
        renderer.render(&frame());
        assert_eq!(count, 4);
    }

    #[test]
    fn test_recording_renderer() {
        let mut renderer = RecordingRenderer::default();
        assert!(renderer.last().is_none());
        renderer.render(&frame());
        assert_eq!(renderer.frames(), 1);
        assert_eq!(renderer.last().unwrap().items(MeshSet::PieceA).count(), 1);
        assert_eq!(renderer.last().unwrap().items(MeshSet::Robot).count(), 0);
    }
}
