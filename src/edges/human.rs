//! Human-aware safety edges.
//!
//! These couple a robot pose vertex with a human pose vertex at the same
//! trajectory index. Predicted velocities change slowly between outer
//! iterations, so the time-to-collision variants capture them at graph
//! build time as constants instead of differentiating through four
//! poses and two time gaps.

use crate::core::{normalize_angle, Point2D};
use crate::optim::{CostEdge, CostFamily, VertexArena, VertexId};

use super::penalties::penalty_below;

/// Minimum center distance between two agents, shifted by the sum of
/// their footprint radii. Used both robot-human and human-human.
pub struct AgentSafetyEdge {
    vertices: [VertexId; 2],
    radius_sum: f32,
    min_dist: f32,
    epsilon: f32,
    weight: f32,
}

impl AgentSafetyEdge {
    /// Separation edge between two agents' poses at matched times.
    pub fn new(
        a: VertexId,
        b: VertexId,
        radius_sum: f32,
        min_dist: f32,
        epsilon: f32,
        weight: f32,
    ) -> Self {
        Self {
            vertices: [a, b],
            radius_sum,
            min_dist,
            epsilon,
            weight,
        }
    }
}

impl CostEdge for AgentSafetyEdge {
    fn family(&self) -> CostFamily {
        CostFamily::HumanSafety
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
        let a = arena.pose(self.vertices[0]);
        let b = arena.pose(self.vertices[1]);
        let dist = a.distance(b) - self.radius_sum;
        residual[0] = penalty_below(dist, self.min_dist, self.epsilon);
    }
}

/// Time to collision of two disks under a constant relative velocity:
/// the smallest positive root of `|p + t v| = r`, or `None` when the
/// agents never come within `r` of each other.
pub fn time_to_collision(rel_pos: Point2D, rel_vel: Point2D, radius: f32) -> Option<f32> {
    let c = rel_pos.dot(rel_pos) - radius * radius;
    if c <= 0.0 {
        // Already in contact
        return Some(0.0);
    }
    let a = rel_vel.dot(rel_vel);
    if a < 1e-9 {
        return None;
    }
    let b = rel_pos.dot(rel_vel);
    if b >= 0.0 {
        // Separating
        return None;
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    Some((-b - disc.sqrt()) / a)
}

/// Which form of the time-to-collision penalty an edge applies.
enum TtcKind {
    /// Penalize only when already on a collision course.
    Immediate,
    /// Also consider roots within a fixed look-ahead horizon.
    Horizon(f32),
}

/// Time-to-collision penalty between a robot pose and a human pose.
///
/// Velocities are captured at build time; only the relative position is
/// differentiated. The residual ramps from zero at the threshold up to
/// one at immediate contact, optionally reshaped by an exponential so
/// near collisions dominate.
pub struct TtcEdge {
    vertices: [VertexId; 2],
    robot_vel: Point2D,
    human_vel: Point2D,
    radius_sum: f32,
    threshold: f32,
    kind: TtcKind,
    scale_alpha: Option<f32>,
    weight: f32,
}

impl TtcEdge {
    /// Immediate collision-course form, bounded by `ttc_threshold`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        robot: VertexId,
        human: VertexId,
        robot_vel: Point2D,
        human_vel: Point2D,
        radius_sum: f32,
        threshold: f32,
        scale_alpha: Option<f32>,
        weight: f32,
    ) -> Self {
        Self {
            vertices: [robot, human],
            robot_vel,
            human_vel,
            radius_sum,
            threshold,
            kind: TtcKind::Immediate,
            scale_alpha,
            weight,
        }
    }

    /// Look-ahead form: roots anywhere within `timer` seconds count.
    #[allow(clippy::too_many_arguments)]
    pub fn with_horizon(
        robot: VertexId,
        human: VertexId,
        robot_vel: Point2D,
        human_vel: Point2D,
        radius_sum: f32,
        threshold: f32,
        timer: f32,
        scale_alpha: Option<f32>,
        weight: f32,
    ) -> Self {
        Self {
            vertices: [robot, human],
            robot_vel,
            human_vel,
            radius_sum,
            threshold,
            kind: TtcKind::Horizon(timer),
            scale_alpha,
            weight,
        }
    }
}

impl CostEdge for TtcEdge {
    fn family(&self) -> CostFamily {
        CostFamily::HumanTtc
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
        let pr = arena.pose(self.vertices[0]);
        let ph = arena.pose(self.vertices[1]);
        let rel_pos = Point2D::new(ph.x - pr.x, ph.y - pr.y);
        let rel_vel = self.human_vel - self.robot_vel;
        let ttc = time_to_collision(rel_pos, rel_vel, self.radius_sum);
        residual[0] = match (ttc, &self.kind) {
            (Some(t), TtcKind::Immediate) if t < self.threshold => self.shape(t),
            (Some(t), TtcKind::Horizon(timer)) if t < self.threshold.min(*timer) => self.shape(t),
            _ => 0.0,
        };
    }
}

impl TtcEdge {
    fn shape(&self, ttc: f32) -> f32 {
        let base = (self.threshold - ttc) / self.threshold;
        match self.scale_alpha {
            Some(alpha) => base * (-alpha * ttc / self.threshold).exp(),
            None => base,
        }
    }
}

/// Closest-approach penalty: when the relative motion brings the agents
/// to their nearest point within `time_threshold` seconds, the
/// separation at that point is held above the contact radius.
pub struct ClosestApproachEdge {
    vertices: [VertexId; 2],
    robot_vel: Point2D,
    human_vel: Point2D,
    radius_sum: f32,
    time_threshold: f32,
    epsilon: f32,
    weight: f32,
}

impl ClosestApproachEdge {
    /// Edge on the predicted distance at closest approach.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        robot: VertexId,
        human: VertexId,
        robot_vel: Point2D,
        human_vel: Point2D,
        radius_sum: f32,
        time_threshold: f32,
        epsilon: f32,
        weight: f32,
    ) -> Self {
        Self {
            vertices: [robot, human],
            robot_vel,
            human_vel,
            radius_sum,
            time_threshold,
            epsilon,
            weight,
        }
    }
}

impl CostEdge for ClosestApproachEdge {
    fn family(&self) -> CostFamily {
        CostFamily::HumanTtc
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
        let pr = arena.pose(self.vertices[0]);
        let ph = arena.pose(self.vertices[1]);
        let rel_pos = Point2D::new(ph.x - pr.x, ph.y - pr.y);
        let rel_vel = self.human_vel - self.robot_vel;
        let speed_sq = rel_vel.dot(rel_vel);
        if speed_sq < 1e-9 {
            residual[0] = 0.0;
            return;
        }
        let t_star = (-rel_pos.dot(rel_vel) / speed_sq).max(0.0);
        if t_star >= self.time_threshold {
            residual[0] = 0.0;
            return;
        }
        let closest = rel_pos + rel_vel.scaled(t_star);
        residual[0] = penalty_below(closest.norm(), self.radius_sum, self.epsilon);
    }
}

/// Penalizes robot motion directed at a human, fading with distance.
pub struct DirectionEdge {
    vertices: [VertexId; 3],
    threshold: f32,
    weight: f32,
}

impl DirectionEdge {
    /// Edge over two consecutive robot poses and a human pose.
    pub fn new(
        robot1: VertexId,
        robot2: VertexId,
        human: VertexId,
        threshold: f32,
        weight: f32,
    ) -> Self {
        Self {
            vertices: [robot1, robot2, human],
            threshold,
            weight,
        }
    }
}

impl CostEdge for DirectionEdge {
    fn family(&self) -> CostFamily {
        CostFamily::HumanDirection
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
        let ph = arena.pose(self.vertices[2]);
        let motion = Point2D::new(p2.x - p1.x, p2.y - p1.y);
        let to_human = Point2D::new(ph.x - p1.x, ph.y - p1.y);
        let dist = to_human.norm();
        let speed = motion.norm();
        if speed < 1e-6 || dist < 1e-6 {
            residual[0] = 0.0;
            return;
        }
        // Cosine of the angle between the motion and the human bearing
        let closing = motion.dot(to_human) / (speed * dist);
        let excess = closing - self.threshold;
        residual[0] = if excess > 0.0 {
            excess / (1.0 + dist)
        } else {
            0.0
        };
    }
}

/// Discourages approaching a human from outside their field of view.
///
/// Active only when the robot is closer than `dist_threshold` and the
/// bearing from the human's heading to the robot exceeds half the field
/// of view. The penalty scales with both the bearing excess and the
/// remaining distance, so it relaxes as the robot enters view or backs
/// off.
pub struct VisibilityEdge {
    vertices: [VertexId; 2],
    fov: f32,
    dist_threshold: f32,
    weight: f32,
}

impl VisibilityEdge {
    /// Edge between a robot pose and the human it may surprise.
    pub fn new(
        robot: VertexId,
        human: VertexId,
        fov: f32,
        dist_threshold: f32,
        weight: f32,
    ) -> Self {
        Self {
            vertices: [robot, human],
            fov,
            dist_threshold,
            weight,
        }
    }
}

impl CostEdge for VisibilityEdge {
    fn family(&self) -> CostFamily {
        CostFamily::HumanVisibility
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
        let pr = arena.pose(self.vertices[0]);
        let ph = arena.pose(self.vertices[1]);
        let to_robot = Point2D::new(pr.x - ph.x, pr.y - ph.y);
        let dist = to_robot.norm();
        if dist >= self.dist_threshold || dist < 1e-6 {
            residual[0] = 0.0;
            return;
        }
        let bearing = normalize_angle(to_robot.angle() - ph.theta).abs();
        let excess = bearing - 0.5 * self.fov;
        residual[0] = if excess > 0.0 {
            excess * (self.dist_threshold - dist) / self.dist_threshold
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Pose2D;
    use approx::assert_relative_eq;

    #[test]
    fn test_safety_edge_respects_radii() {
        let mut arena = VertexArena::new();
        let r = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let h = arena.add_pose(Pose2D::new(1.0, 0.0, 0.0), false);
        // Center distance 1.0, radii 0.2 + 0.3, margin 0.6 + eps 0.1
        let edge = AgentSafetyEdge::new(r, h, 0.5, 0.6, 0.1, 20.0);
        let mut res = [0.0f32; 1];
        edge.compute(&arena, &mut res);
        assert_relative_eq!(res[0], 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_ttc_head_on() {
        // 2 m apart, closing at 1 m/s, contact radius 0.5: ttc = 1.5 s
        let ttc = time_to_collision(Point2D::new(2.0, 0.0), Point2D::new(-1.0, 0.0), 0.5);
        assert_relative_eq!(ttc.unwrap(), 1.5, epsilon = 1e-5);
    }

    #[test]
    fn test_ttc_separating_is_none() {
        let ttc = time_to_collision(Point2D::new(2.0, 0.0), Point2D::new(1.0, 0.0), 0.5);
        assert!(ttc.is_none());
    }

    #[test]
    fn test_ttc_near_miss_is_none() {
        // Passes 1 m to the side of a 0.5 m contact radius
        let ttc = time_to_collision(Point2D::new(2.0, 1.0), Point2D::new(-1.0, 0.0), 0.5);
        assert!(ttc.is_none());
    }

    #[test]
    fn test_ttc_edge_penalizes_collision_course() {
        let mut arena = VertexArena::new();
        let r = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let h = arena.add_pose(Pose2D::new(2.0, 0.0, std::f32::consts::PI), false);
        let edge = TtcEdge::new(
            r,
            h,
            Point2D::new(0.5, 0.0),
            Point2D::new(-0.5, 0.0),
            0.5,
            5.0,
            None,
            20.0,
        );
        let mut res = [0.0f32; 1];
        edge.compute(&arena, &mut res);
        // ttc = 1.5 s against a 5 s threshold
        assert_relative_eq!(res[0], 0.7, epsilon = 1e-5);
    }

    #[test]
    fn test_closest_approach_penalizes_near_miss() {
        let mut arena = VertexArena::new();
        let r = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let h = arena.add_pose(Pose2D::new(2.0, 0.2, std::f32::consts::PI), false);
        // Near miss at 0.2 m lateral offset against a 0.4 m contact radius
        let edge = ClosestApproachEdge::new(
            r,
            h,
            Point2D::new(1.0, 0.0),
            Point2D::new(-1.0, 0.0),
            0.4,
            5.0,
            0.0,
            20.0,
        );
        let mut res = [0.0f32; 1];
        edge.compute(&arena, &mut res);
        assert_relative_eq!(res[0], 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_direction_edge_penalizes_heading_at_human() {
        let mut arena = VertexArena::new();
        let p1 = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let p2 = arena.add_pose(Pose2D::new(0.2, 0.0, 0.0), false);
        let toward = arena.add_pose(Pose2D::new(1.0, 0.0, 0.0), false);
        let aside = arena.add_pose(Pose2D::new(0.0, 1.0, 0.0), false);
        let mut res = [0.0f32; 1];
        DirectionEdge::new(p1, p2, toward, 0.45, 1.0).compute(&arena, &mut res);
        assert!(res[0] > 0.0);
        DirectionEdge::new(p1, p2, aside, 0.45, 1.0).compute(&arena, &mut res);
        assert_relative_eq!(res[0], 0.0);
    }

    #[test]
    fn test_visibility_edge_only_behind() {
        let mut arena = VertexArena::new();
        // Human faces +x; one robot in front, one behind at the same range
        let h = arena.add_pose(Pose2D::new(0.0, 0.0, 0.0), false);
        let front = arena.add_pose(Pose2D::new(1.0, 0.0, 0.0), false);
        let behind = arena.add_pose(Pose2D::new(-1.0, 0.0, 0.0), false);
        let fov = 2.0;
        let mut res = [0.0f32; 1];
        VisibilityEdge::new(front, h, fov, 2.0, 1.0).compute(&arena, &mut res);
        assert_relative_eq!(res[0], 0.0);
        VisibilityEdge::new(behind, h, fov, 2.0, 1.0).compute(&arena, &mut res);
        assert!(res[0] > 0.0);
    }
}
