//! SE(2) pose type.
//!
//! Planning frame follows ROS REP-103: X forward, Y left, CCW-positive
//! heading in radians.

use serde::{Deserialize, Serialize};

use super::math::{angle_diff, normalize_angle};
use super::point::Point2D;

/// A 2D pose: position in meters plus heading in radians.
///
/// Heading is kept normalized to [-π, π). Poses are the mutable
/// optimization variables of the elastic band; keep this type `Copy`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters.
    pub x: f32,
    /// Y position in meters.
    pub y: f32,
    /// Heading in radians [-π, π), CCW positive from the X axis.
    pub theta: f32,
}

impl Pose2D {
    /// Create a pose, normalizing the heading.
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Identity pose at the origin.
    #[inline]
    pub const fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }
    }

    /// Build a pose from a position and heading.
    #[inline]
    pub fn from_position(position: Point2D, theta: f32) -> Self {
        Self::new(position.x, position.y, theta)
    }

    /// Position component.
    #[inline]
    pub fn position(self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Unit vector along the heading.
    #[inline]
    pub fn heading_vector(self) -> Point2D {
        Point2D::new(self.theta.cos(), self.theta.sin())
    }

    /// Euclidean distance between positions, ignoring heading.
    #[inline]
    pub fn distance(self, other: Pose2D) -> f32 {
        self.position().distance(other.position())
    }

    /// Shortest signed heading difference `other.theta - self.theta`.
    #[inline]
    pub fn heading_diff(self, other: Pose2D) -> f32 {
        angle_diff(self.theta, other.theta)
    }

    /// Interpolate between poses; heading takes the shortest arc.
    #[inline]
    pub fn lerp(self, other: Pose2D, t: f32) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.theta + angle_diff(self.theta, other.theta) * t,
        )
    }

    /// Approximate equality within position and heading tolerances.
    #[inline]
    pub fn approx_eq(self, other: Pose2D, pos_eps: f32, angle_eps: f32) -> bool {
        (self.x - other.x).abs() <= pos_eps
            && (self.y - other.y).abs() <= pos_eps
            && angle_diff(self.theta, other.theta).abs() <= angle_eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_new_normalizes_heading() {
        let pose = Pose2D::new(0.0, 0.0, 3.0 * PI);
        assert!(pose.theta.abs() - PI < 1e-5);
    }

    #[test]
    fn test_heading_vector() {
        let pose = Pose2D::new(0.0, 0.0, FRAC_PI_2);
        let h = pose.heading_vector();
        assert_relative_eq!(h.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(h.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_lerp_heading_shortest_arc() {
        let a = Pose2D::new(0.0, 0.0, PI - 0.1);
        let b = Pose2D::new(1.0, 0.0, -PI + 0.1);
        let mid = a.lerp(b, 0.5);
        // The midpoint heading stays near ±π instead of swinging through zero
        assert!(mid.theta.abs() > 3.0);
        assert_relative_eq!(mid.x, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_approx_eq() {
        let a = Pose2D::new(1.0, 2.0, 0.5);
        let b = Pose2D::new(1.001, 2.001, 0.501);
        assert!(a.approx_eq(b, 0.01, 0.01));
        assert!(!a.approx_eq(b, 1e-4, 1e-4));
    }
}
