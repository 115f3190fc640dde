//! Kinematic compliance edges.

use crate::core::Point2D;
use crate::optim::{CostEdge, CostFamily, VertexArena, VertexId};

use super::penalties::penalty_below;

/// Differential-drive kinematics between two consecutive poses.
///
/// Row 0 is the nonholonomic constraint: the chord between the poses
/// must agree with the averaged heading direction. Row 1 penalizes
/// driving against the preferred forward direction.
pub struct DiffDriveKinematicsEdge {
    vertices: [VertexId; 2],
    weight_nh: f32,
    weight_forward: f32,
}

impl DiffDriveKinematicsEdge {
    /// Edge between two consecutive poses.
    pub fn new(p1: VertexId, p2: VertexId, weight_nh: f32, weight_forward: f32) -> Self {
        Self {
            vertices: [p1, p2],
            weight_nh,
            weight_forward,
        }
    }
}

impl CostEdge for DiffDriveKinematicsEdge {
    fn family(&self) -> CostFamily {
        CostFamily::Kinematics
    }

    fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    fn dimension(&self) -> usize {
        2
    }

    fn weight(&self, row: usize) -> f32 {
        if row == 0 {
            self.weight_nh
        } else {
            self.weight_forward
        }
    }

    fn compute(&self, arena: &VertexArena, residual: &mut [f32]) {
        let p1 = arena.pose(self.vertices[0]);
        let p2 = arena.pose(self.vertices[1]);
        let dx = p2.x - p1.x;
        let dy = p2.y - p1.y;
        let (s1, c1) = p1.theta.sin_cos();
        let (s2, c2) = p2.theta.sin_cos();
        // Chord direction must match the arc spanned by both headings
        residual[0] = ((c1 + c2) * dy - (s1 + s2) * dx).abs();
        // Negative projection onto the start heading means reversing
        let forward = dx * c1 + dy * s1;
        residual[1] = if forward < 0.0 { -forward } else { 0.0 };
    }
}

/// Car-like kinematics: the nonholonomic row plus a minimum turning
/// radius bound derived from chord length and heading change.
pub struct CarlikeKinematicsEdge {
    vertices: [VertexId; 2],
    min_turning_radius: f32,
    weight_nh: f32,
    weight_radius: f32,
}

impl CarlikeKinematicsEdge {
    /// Edge between two consecutive poses.
    pub fn new(
        p1: VertexId,
        p2: VertexId,
        min_turning_radius: f32,
        weight_nh: f32,
        weight_radius: f32,
    ) -> Self {
        Self {
            vertices: [p1, p2],
            min_turning_radius,
            weight_nh,
            weight_radius,
        }
    }
}

impl CostEdge for CarlikeKinematicsEdge {
    fn family(&self) -> CostFamily {
        CostFamily::Kinematics
    }

    fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    fn dimension(&self) -> usize {
        2
    }

    fn weight(&self, row: usize) -> f32 {
        if row == 0 {
            self.weight_nh
        } else {
            self.weight_radius
        }
    }

    fn compute(&self, arena: &VertexArena, residual: &mut [f32]) {
        let p1 = arena.pose(self.vertices[0]);
        let p2 = arena.pose(self.vertices[1]);
        let dx = p2.x - p1.x;
        let dy = p2.y - p1.y;
        let (s1, c1) = p1.theta.sin_cos();
        let (s2, c2) = p2.theta.sin_cos();
        residual[0] = ((c1 + c2) * dy - (s1 + s2) * dx).abs();
        let dtheta = p1.heading_diff(p2);
        if dtheta.abs() < 1e-6 {
            // Straight segment, radius unbounded
            residual[1] = 0.0;
        } else {
            let chord = Point2D::new(dx, dy).norm();
            let radius = chord / (2.0 * (dtheta / 2.0).sin().abs());
            residual[1] = penalty_below(radius, self.min_turning_radius, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Pose2D;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_motion_satisfies_kinematics() {
        let mut arena = VertexArena::new();
        let a = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let b = arena.add_pose(Pose2D::new(1.0, 0.0, 0.0), false);
        let edge = DiffDriveKinematicsEdge::new(a, b, 1000.0, 1.0);
        let mut r = [0.0f32; 2];
        edge.compute(&arena, &mut r);
        assert_relative_eq!(r[0], 0.0);
        assert_relative_eq!(r[1], 0.0);
    }

    #[test]
    fn test_sideways_motion_violates_kinematics() {
        let mut arena = VertexArena::new();
        let a = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let b = arena.add_pose(Pose2D::new(0.0, 1.0, 0.0), false);
        let edge = DiffDriveKinematicsEdge::new(a, b, 1000.0, 1.0);
        let mut r = [0.0f32; 2];
        edge.compute(&arena, &mut r);
        assert!(r[0] > 1.0);
    }

    #[test]
    fn test_reverse_motion_penalized() {
        let mut arena = VertexArena::new();
        let a = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let b = arena.add_pose(Pose2D::new(-0.5, 0.0, 0.0), false);
        let edge = DiffDriveKinematicsEdge::new(a, b, 1000.0, 1.0);
        let mut r = [0.0f32; 2];
        edge.compute(&arena, &mut r);
        assert_relative_eq!(r[1], 0.5);
    }

    #[test]
    fn test_tight_turn_violates_min_radius() {
        let mut arena = VertexArena::new();
        let a = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        // 90 degree heading change over a short chord: radius ~0.07 m
        let b = arena.add_pose(Pose2D::new(0.1, 0.1, std::f32::consts::FRAC_PI_2), false);
        let edge = CarlikeKinematicsEdge::new(a, b, 0.5, 1000.0, 1.0);
        let mut r = [0.0f32; 2];
        edge.compute(&arena, &mut r);
        assert!(r[1] > 0.0);
    }
}
