//! Velocity limit edges.
//!
//! Velocities are not state variables; each edge recovers them from two
//! consecutive poses and the time gap between them, then penalizes limit
//! violations with the shared epsilon-margin penalties.

use crate::core::Point2D;
use crate::optim::{CostEdge, CostFamily, VertexArena, VertexId};

use super::penalties::penalty_interval;

/// Translational and rotational velocity limits over one transition.
///
/// Forward speed is signed by the projection of the chord onto the start
/// heading, so backward motion is bounded by its own (usually tighter)
/// limit.
pub struct VelocityEdge {
    vertices: [VertexId; 3],
    max_vel_x: f32,
    max_vel_x_backwards: f32,
    max_vel_theta: f32,
    penalty_epsilon: f32,
    weight_x: f32,
    weight_theta: f32,
}

impl VelocityEdge {
    /// Edge over one band segment.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        p1: VertexId,
        p2: VertexId,
        dt: VertexId,
        max_vel_x: f32,
        max_vel_x_backwards: f32,
        max_vel_theta: f32,
        penalty_epsilon: f32,
        weight_x: f32,
        weight_theta: f32,
    ) -> Self {
        Self {
            vertices: [p1, p2, dt],
            max_vel_x,
            max_vel_x_backwards,
            max_vel_theta,
            penalty_epsilon,
            weight_x,
            weight_theta,
        }
    }
}

impl CostEdge for VelocityEdge {
    fn family(&self) -> CostFamily {
        CostFamily::Velocity
    }

    fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    fn dimension(&self) -> usize {
        2
    }

    fn weight(&self, row: usize) -> f32 {
        if row == 0 {
            self.weight_x
        } else {
            self.weight_theta
        }
    }

    fn compute(&self, arena: &VertexArena, residual: &mut [f32]) {
        let p1 = arena.pose(self.vertices[0]);
        let p2 = arena.pose(self.vertices[1]);
        let dt = arena.time_diff(self.vertices[2]).max(1e-4);
        let delta = Point2D::new(p2.x - p1.x, p2.y - p1.y);
        let sign = if delta.dot(p1.heading_vector()) >= 0.0 {
            1.0
        } else {
            -1.0
        };
        let v = sign * delta.norm() / dt;
        let omega = p1.heading_diff(p2) / dt;
        residual[0] = penalty_interval(
            v,
            -self.max_vel_x_backwards,
            self.max_vel_x,
            self.penalty_epsilon,
        )
        .abs();
        residual[1] = penalty_interval(
            omega,
            -self.max_vel_theta,
            self.max_vel_theta,
            self.penalty_epsilon,
        )
        .abs();
    }
}

/// Attraction toward a nominal walking speed.
///
/// Unlike [`VelocityEdge`] this is a two-sided quadratic pull rather
/// than a bound: humans are expected to keep walking at their preferred
/// pace, and both dawdling and sprinting are surprising predictions.
pub struct NominalSpeedEdge {
    vertices: [VertexId; 3],
    nominal_vel: f32,
    weight: f32,
}

impl NominalSpeedEdge {
    /// Edge holding one segment near `nominal_vel`.
    pub fn new(p1: VertexId, p2: VertexId, dt: VertexId, nominal_vel: f32, weight: f32) -> Self {
        Self {
            vertices: [p1, p2, dt],
            nominal_vel,
            weight,
        }
    }
}

impl CostEdge for NominalSpeedEdge {
    fn family(&self) -> CostFamily {
        CostFamily::Velocity
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
        let p1 = arena.pose(self.vertices[0]);
        let p2 = arena.pose(self.vertices[1]);
        let dt = arena.time_diff(self.vertices[2]).max(1e-4);
        let v = Point2D::new(p2.x - p1.x, p2.y - p1.y).norm() / dt;
        residual[0] = v - self.nominal_vel;
    }

    fn jacobian(&self, arena: &VertexArena, slot: usize, out: &mut [f32]) -> bool {
        let p1 = arena.pose(self.vertices[0]);
        let p2 = arena.pose(self.vertices[1]);
        let dt = arena.time_diff(self.vertices[2]).max(1e-4);
        let delta = Point2D::new(p2.x - p1.x, p2.y - p1.y);
        let dist = delta.norm();
        if dist < 1e-6 {
            return false;
        }
        match slot {
            0 => {
                out[0] = -delta.x / (dist * dt);
                out[1] = -delta.y / (dist * dt);
                out[2] = 0.0;
            }
            1 => {
                out[0] = delta.x / (dist * dt);
                out[1] = delta.y / (dist * dt);
                out[2] = 0.0;
            }
            _ => out[0] = -dist / (dt * dt),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Pose2D;
    use approx::assert_relative_eq;

    fn velocity_arena(dx: f32, dt: f32) -> (VertexArena, [VertexId; 3]) {
        let mut arena = VertexArena::new();
        let a = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let b = arena.add_pose(Pose2D::new(dx, 0.0, 0.0), false);
        let t = arena.add_time_diff(dt, false);
        (arena, [a, b, t])
    }

    #[test]
    fn test_within_limits_is_free() {
        let (arena, [a, b, t]) = velocity_arena(0.1, 0.5);
        let edge = VelocityEdge::new(a, b, t, 0.4, 0.2, 0.3, 0.1, 2.0, 1.0);
        let mut r = [0.0f32; 2];
        edge.compute(&arena, &mut r);
        assert_relative_eq!(r[0], 0.0);
        assert_relative_eq!(r[1], 0.0);
    }

    #[test]
    fn test_overspeed_penalized() {
        // 1.0 m in 0.5 s = 2.0 m/s against a 0.4 m/s limit
        let (arena, [a, b, t]) = velocity_arena(1.0, 0.5);
        let edge = VelocityEdge::new(a, b, t, 0.4, 0.2, 0.3, 0.1, 2.0, 1.0);
        let mut r = [0.0f32; 2];
        edge.compute(&arena, &mut r);
        assert_relative_eq!(r[0], 1.7, epsilon = 1e-5);
    }

    #[test]
    fn test_backward_limit_tighter() {
        let (arena, [a, b, t]) = velocity_arena(-0.15, 0.5);
        let edge = VelocityEdge::new(a, b, t, 0.4, 0.2, 0.3, 0.1, 2.0, 1.0);
        let mut r = [0.0f32; 2];
        edge.compute(&arena, &mut r);
        // v = -0.3, lower bound -0.2 + eps 0.1 -> violation 0.2
        assert_relative_eq!(r[0], 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_nominal_speed_residual() {
        let (arena, [a, b, t]) = velocity_arena(0.6, 0.5);
        let edge = NominalSpeedEdge::new(a, b, t, 1.0, 1.0);
        let mut r = [0.0f32; 1];
        edge.compute(&arena, &mut r);
        assert_relative_eq!(r[0], 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_nominal_speed_jacobian_matches_numeric() {
        let (mut arena, [a, b, t]) = velocity_arena(0.6, 0.5);
        let edge = NominalSpeedEdge::new(a, b, t, 1.0, 1.0);
        let mut analytic = [0.0f32; 3];
        assert!(edge.jacobian(&arena, 1, &mut analytic));
        let mut lo = [0.0f32; 1];
        let mut hi = [0.0f32; 1];
        for dof in 0..2 {
            arena.nudge(b, dof, 1e-3);
            edge.compute(&arena, &mut hi);
            arena.nudge(b, dof, -2e-3);
            edge.compute(&arena, &mut lo);
            arena.nudge(b, dof, 1e-3);
            let numeric = (hi[0] - lo[0]) / 2e-3;
            assert_relative_eq!(analytic[dof], numeric, epsilon = 1e-3);
        }
    }
}
