//! Via-point attraction edge.

use crate::core::Point2D;
use crate::optim::{CostEdge, CostFamily, VertexArena, VertexId};

/// Pulls one pose toward a waypoint of the global plan.
pub struct ViaPointEdge {
    vertices: [VertexId; 1],
    via_point: Point2D,
    weight: f32,
}

impl ViaPointEdge {
    /// Edge pulling `pose` toward `via_point`.
    pub fn new(pose: VertexId, via_point: Point2D, weight: f32) -> Self {
        Self {
            vertices: [pose],
            via_point,
            weight,
        }
    }
}

impl CostEdge for ViaPointEdge {
    fn family(&self) -> CostFamily {
        CostFamily::ViaPoint
    }

    fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    fn dimension(&self) -> usize {
        1
    }

    fn weight(&self, _row: usize) -> f32 {
        self.weight
    }

    fn compute(&self, arena: &VertexArena, residual: &mut [f32]) {
        let p = arena.pose(self.vertices[0]);
        residual[0] = (Point2D::new(p.x, p.y) - self.via_point).norm();
    }
}
