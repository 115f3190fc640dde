//! Obstacle separation edges.

use crate::core::{Obstacle, Point2D};
use crate::optim::{CostEdge, CostFamily, VertexArena, VertexId};

use super::penalties::penalty_below;

/// Minimum separation from one obstacle at one pose.
///
/// The obstacle is borrowed from the caller for the duration of the
/// solve; dynamic obstacles are evaluated at the pose's predicted time
/// along its constant-velocity model. The nonlinear form divides the
/// violation by the remaining clearance so the cost blows up as contact
/// approaches instead of growing linearly.
pub struct ObstacleEdge<'a> {
    vertices: [VertexId; 1],
    obstacle: &'a Obstacle,
    time_from_start: f32,
    min_dist: f32,
    epsilon: f32,
    nonlinear: f32,
    weight: f32,
}

impl<'a> ObstacleEdge<'a> {
    /// Edge between one pose and one obstacle; `time_from_start` places
    /// dynamic obstacles along their constant-velocity prediction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pose: VertexId,
        obstacle: &'a Obstacle,
        time_from_start: f32,
        min_dist: f32,
        epsilon: f32,
        use_nonlinear: bool,
        weight: f32,
    ) -> Self {
        Self {
            vertices: [pose],
            obstacle,
            time_from_start,
            min_dist,
            epsilon,
            nonlinear: if use_nonlinear { 1.0 } else { 0.0 },
            weight,
        }
    }
}

impl CostEdge for ObstacleEdge<'_> {
    fn family(&self) -> CostFamily {
        CostFamily::Obstacle
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
        let q = Point2D::new(p.x, p.y);
        let dist = if self.obstacle.is_dynamic() {
            self.obstacle.distance_at_time(q, self.time_from_start)
        } else {
            self.obstacle.distance(q)
        };
        let violation = penalty_below(dist, self.min_dist, self.epsilon);
        residual[0] = if self.nonlinear > 0.0 && violation > 0.0 {
            violation / (dist + 0.05)
        } else {
            violation
        };
    }
}
