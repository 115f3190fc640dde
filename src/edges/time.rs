//! Time-optimality edge.

use crate::optim::{CostEdge, CostFamily, VertexArena, VertexId};

/// Pulls one time gap toward zero so the trajectory contracts in time.
///
/// With `cap` set the pull only acts above `epsilon`, leaving short gaps
/// alone instead of fighting the velocity and acceleration bounds.
pub struct TimeOptimalEdge {
    vertices: [VertexId; 1],
    weight: f32,
    epsilon: f32,
    cap: bool,
}

impl TimeOptimalEdge {
    /// Edge on a single time-gap vertex.
    pub fn new(dt: VertexId, weight: f32, epsilon: f32, cap: bool) -> Self {
        Self {
            vertices: [dt],
            weight,
            epsilon,
            cap,
        }
    }
}

impl CostEdge for TimeOptimalEdge {
    fn family(&self) -> CostFamily {
        CostFamily::Time
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
        let dt = arena.time_diff(self.vertices[0]);
        residual[0] = if self.cap {
            (dt - self.epsilon).max(0.0)
        } else {
            dt
        };
    }

    fn jacobian(&self, arena: &VertexArena, _slot: usize, out: &mut [f32]) -> bool {
        let dt = arena.time_diff(self.vertices[0]);
        out[0] = if self.cap && dt <= self.epsilon {
            0.0
        } else {
            1.0
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uncapped_returns_dt() {
        let mut arena = VertexArena::new();
        let t = arena.add_time_diff(0.3, false);
        let edge = TimeOptimalEdge::new(t, 1.0, 0.1, false);
        let mut r = [0.0f32; 1];
        edge.compute(&arena, &mut r);
        assert_relative_eq!(r[0], 0.3);
    }

    #[test]
    fn test_capped_ignores_short_gaps() {
        let mut arena = VertexArena::new();
        let t = arena.add_time_diff(0.05, false);
        let edge = TimeOptimalEdge::new(t, 1.0, 0.1, true);
        let mut r = [0.0f32; 1];
        edge.compute(&arena, &mut r);
        assert_relative_eq!(r[0], 0.0);
    }
}
