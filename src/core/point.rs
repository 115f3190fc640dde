//! 2D point type used for positions, via-points and obstacle geometry.

use serde::{Deserialize, Serialize};

/// A point in the planning frame, in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate in meters.
    pub x: f32,
    /// Y coordinate in meters.
    pub y: f32,
}

impl Point2D {
    /// Origin point.
    pub const ZERO: Point2D = Point2D { x: 0.0, y: 0.0 };

    /// Create a new point.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Dot product with another point treated as a vector.
    #[inline]
    pub fn dot(self, other: Point2D) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product).
    #[inline]
    pub fn cross(self, other: Point2D) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Euclidean norm.
    #[inline]
    pub fn norm(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Squared Euclidean norm.
    #[inline]
    pub fn norm_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Point2D) -> f32 {
        (other - self).norm()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    #[inline]
    pub fn normalized(self) -> Point2D {
        let n = self.norm();
        if n > f32::EPSILON {
            Point2D::new(self.x / n, self.y / n)
        } else {
            Point2D::ZERO
        }
    }

    /// Scale by a scalar.
    #[inline]
    pub fn scaled(self, s: f32) -> Point2D {
        Point2D::new(self.x * s, self.y * s)
    }

    /// Angle of the vector from the origin, in radians.
    #[inline]
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Linear interpolation toward another point.
    #[inline]
    pub fn lerp(self, other: Point2D, t: f32) -> Point2D {
        Point2D::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }
}

impl std::ops::Add for Point2D {
    type Output = Point2D;
    #[inline]
    fn add(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point2D {
    type Output = Point2D;
    #[inline]
    fn sub(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Distance from `point` to the segment `(a, b)`.
pub fn point_to_segment_distance(point: Point2D, a: Point2D, b: Point2D) -> f32 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f32::EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab.scaled(t))
}

/// Check whether segments `(p1, p2)` and `(q1, q2)` intersect.
pub fn segments_intersect(p1: Point2D, p2: Point2D, q1: Point2D, q2: Point2D) -> bool {
    let d1 = (p2 - p1).cross(q1 - p1);
    let d2 = (p2 - p1).cross(q2 - p1);
    let d3 = (q2 - q1).cross(p1 - q1);
    let d4 = (q2 - q1).cross(p2 - q1);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    // Collinear touching cases
    let on_segment = |a: Point2D, b: Point2D, p: Point2D| {
        p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
    };
    (d1 == 0.0 && on_segment(p1, p2, q1))
        || (d2 == 0.0 && on_segment(p1, p2, q2))
        || (d3 == 0.0 && on_segment(q1, q2, p1))
        || (d4 == 0.0 && on_segment(q1, q2, p2))
}
