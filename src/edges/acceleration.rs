//! Acceleration limit edges.
//!
//! Interior edges span three poses and two time gaps; the boundary
//! variants compare the first or last transition against a measured
//! start velocity or a requested goal velocity instead.

use crate::core::{Point2D, Pose2D, Velocity};
use crate::optim::{CostEdge, CostFamily, VertexArena, VertexId};

use super::penalties::penalty_interval;

fn transition_velocity(p1: Pose2D, p2: Pose2D, dt: f32) -> (f32, f32) {
    let delta = Point2D::new(p2.x - p1.x, p2.y - p1.y);
    let sign = if delta.dot(p1.heading_vector()) >= 0.0 {
        1.0
    } else {
        -1.0
    };
    (sign * delta.norm() / dt, p1.heading_diff(p2) / dt)
}

/// Acceleration limits across two consecutive transitions.
pub struct AccelerationEdge {
    vertices: [VertexId; 5],
    acc_lim_x: f32,
    acc_lim_theta: f32,
    penalty_epsilon: f32,
    weight_x: f32,
    weight_theta: f32,
}

impl AccelerationEdge {
    /// Edge over three consecutive poses and their two time gaps.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        p1: VertexId,
        p2: VertexId,
        p3: VertexId,
        dt1: VertexId,
        dt2: VertexId,
        acc_lim_x: f32,
        acc_lim_theta: f32,
        penalty_epsilon: f32,
        weight_x: f32,
        weight_theta: f32,
    ) -> Self {
        Self {
            vertices: [p1, p2, p3, dt1, dt2],
            acc_lim_x,
            acc_lim_theta,
            penalty_epsilon,
            weight_x,
            weight_theta,
        }
    }
}

impl CostEdge for AccelerationEdge {
    fn family(&self) -> CostFamily {
        CostFamily::Acceleration
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
        let p3 = arena.pose(self.vertices[2]);
        let dt1 = arena.time_diff(self.vertices[3]).max(1e-4);
        let dt2 = arena.time_diff(self.vertices[4]).max(1e-4);
        let (v1, w1) = transition_velocity(p1, p2, dt1);
        let (v2, w2) = transition_velocity(p2, p3, dt2);
        let dt_mid = 0.5 * (dt1 + dt2);
        let acc = (v2 - v1) / dt_mid;
        let acc_rot = (w2 - w1) / dt_mid;
        residual[0] =
            penalty_interval(acc, -self.acc_lim_x, self.acc_lim_x, self.penalty_epsilon).abs();
        residual[1] = penalty_interval(
            acc_rot,
            -self.acc_lim_theta,
            self.acc_lim_theta,
            self.penalty_epsilon,
        )
        .abs();
    }
}

/// Acceleration limit between a fixed boundary velocity and the adjacent
/// transition. `from_boundary` selects the start form (boundary first)
/// or the goal form (boundary last).
pub struct BoundaryAccelerationEdge {
    vertices: [VertexId; 3],
    boundary_vel: Velocity,
    from_boundary: bool,
    acc_lim_x: f32,
    acc_lim_theta: f32,
    penalty_epsilon: f32,
    weight_x: f32,
    weight_theta: f32,
}

impl BoundaryAccelerationEdge {
    /// Pin the transition from a commanded start velocity into the band.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        p1: VertexId,
        p2: VertexId,
        dt: VertexId,
        start_vel: Velocity,
        acc_lim_x: f32,
        acc_lim_theta: f32,
        penalty_epsilon: f32,
        weight_x: f32,
        weight_theta: f32,
    ) -> Self {
        Self {
            vertices: [p1, p2, dt],
            boundary_vel: start_vel,
            from_boundary: true,
            acc_lim_x,
            acc_lim_theta,
            penalty_epsilon,
            weight_x,
            weight_theta,
        }
    }

    /// Pin the transition from the band into a commanded goal velocity.
    #[allow(clippy::too_many_arguments)]
    pub fn goal(
        p1: VertexId,
        p2: VertexId,
        dt: VertexId,
        goal_vel: Velocity,
        acc_lim_x: f32,
        acc_lim_theta: f32,
        penalty_epsilon: f32,
        weight_x: f32,
        weight_theta: f32,
    ) -> Self {
        Self {
            vertices: [p1, p2, dt],
            boundary_vel: goal_vel,
            from_boundary: false,
            acc_lim_x,
            acc_lim_theta,
            penalty_epsilon,
            weight_x,
            weight_theta,
        }
    }
}

impl CostEdge for BoundaryAccelerationEdge {
    fn family(&self) -> CostFamily {
        CostFamily::Acceleration
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
        let (v, w) = transition_velocity(p1, p2, dt);
        let (acc, acc_rot) = if self.from_boundary {
            (
                (v - self.boundary_vel.linear) / dt,
                (w - self.boundary_vel.angular) / dt,
            )
        } else {
            (
                (self.boundary_vel.linear - v) / dt,
                (self.boundary_vel.angular - w) / dt,
            )
        };
        residual[0] =
            penalty_interval(acc, -self.acc_lim_x, self.acc_lim_x, self.penalty_epsilon).abs();
        residual[1] = penalty_interval(
            acc_rot,
            -self.acc_lim_theta,
            self.acc_lim_theta,
            self.penalty_epsilon,
        )
        .abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_velocity_is_free() {
        let mut arena = VertexArena::new();
        let a = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let b = arena.add_pose(Pose2D::new(0.1, 0.0, 0.0), false);
        let c = arena.add_pose(Pose2D::new(0.2, 0.0, 0.0), false);
        let t1 = arena.add_time_diff(0.3, false);
        let t2 = arena.add_time_diff(0.3, false);
        let edge = AccelerationEdge::new(a, b, c, t1, t2, 0.5, 0.5, 0.1, 1.0, 1.0);
        let mut r = [0.0f32; 2];
        edge.compute(&arena, &mut r);
        assert_relative_eq!(r[0], 0.0);
        assert_relative_eq!(r[1], 0.0);
    }

    #[test]
    fn test_hard_braking_penalized() {
        let mut arena = VertexArena::new();
        let a = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let b = arena.add_pose(Pose2D::new(0.3, 0.0, 0.0), false);
        let c = arena.add_pose(Pose2D::new(0.31, 0.0, 0.0), false);
        let t1 = arena.add_time_diff(0.3, false);
        let t2 = arena.add_time_diff(0.3, false);
        // v drops from 1.0 to ~0.03 over 0.3 s: |acc| >> 0.5
        let edge = AccelerationEdge::new(a, b, c, t1, t2, 0.5, 0.5, 0.1, 1.0, 1.0);
        let mut r = [0.0f32; 2];
        edge.compute(&arena, &mut r);
        assert!(r[0] > 1.0);
    }

    #[test]
    fn test_start_edge_limits_launch() {
        let mut arena = VertexArena::new();
        let a = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), true);
        let b = arena.add_pose(Pose2D::new(0.3, 0.0, 0.0), false);
        let t = arena.add_time_diff(0.3, false);
        // From standstill to 1.0 m/s in 0.3 s is 3.3 m/s^2
        let edge = BoundaryAccelerationEdge::start(
            a,
            b,
            t,
            Velocity::ZERO,
            0.5,
            0.5,
            0.1,
            1.0,
            1.0,
        );
        let mut r = [0.0f32; 2];
        edge.compute(&arena, &mut r);
        assert!(r[0] > 2.0);
    }
}
