//! Obstacle geometry used read-only by the cost edges.
//!
//! Obstacles are owned by the caller and referenced by the planner for the
//! duration of a planning cycle; they are never copied into optimization
//! state. A predicted-dynamic obstacle carries a constant velocity used to
//! project its position forward in time.

use serde::{Deserialize, Serialize};

use super::point::{point_to_segment_distance, segments_intersect, Point2D};

/// Obstacle shape in the planning frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ObstacleShape {
    /// A point obstacle (e.g. a pole or a converted costmap cell).
    Point(Point2D),
    /// A line segment obstacle (e.g. a wall section).
    Line(Point2D, Point2D),
    /// A closed polygon obstacle; vertices in order, implicitly closed.
    Polygon(Vec<Point2D>),
}

/// A static or predicted-dynamic obstacle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Obstacle {
    /// Geometry of the obstacle.
    pub shape: ObstacleShape,
    /// Constant velocity for predicted-dynamic obstacles.
    pub velocity: Option<Point2D>,
}

impl Obstacle {
    /// Create a static point obstacle.
    pub fn point(x: f32, y: f32) -> Self {
        Self {
            shape: ObstacleShape::Point(Point2D::new(x, y)),
            velocity: None,
        }
    }

    /// Create a static line obstacle.
    pub fn line(start: Point2D, end: Point2D) -> Self {
        Self {
            shape: ObstacleShape::Line(start, end),
            velocity: None,
        }
    }

    /// Create a static polygon obstacle.
    pub fn polygon(vertices: Vec<Point2D>) -> Self {
        Self {
            shape: ObstacleShape::Polygon(vertices),
            velocity: None,
        }
    }

    /// Attach a constant velocity, making this a dynamic obstacle.
    pub fn with_velocity(mut self, velocity: Point2D) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// True if the obstacle carries a velocity prediction.
    pub fn is_dynamic(&self) -> bool {
        self.velocity.is_some()
    }

    /// Representative center of the obstacle (used for homotopy signatures
    /// and exploration keypoints).
    pub fn centroid(&self) -> Point2D {
        match &self.shape {
            ObstacleShape::Point(p) => *p,
            ObstacleShape::Line(a, b) => a.lerp(*b, 0.5),
            ObstacleShape::Polygon(vs) => {
                if vs.is_empty() {
                    return Point2D::ZERO;
                }
                let mut sum = Point2D::ZERO;
                for v in vs {
                    sum = sum + *v;
                }
                sum.scaled(1.0 / vs.len() as f32)
            }
        }
    }

    /// Minimum distance from `point` to the obstacle boundary.
    pub fn distance(&self, point: Point2D) -> f32 {
        match &self.shape {
            ObstacleShape::Point(p) => point.distance(*p),
            ObstacleShape::Line(a, b) => point_to_segment_distance(point, *a, *b),
            ObstacleShape::Polygon(vs) => match vs.len() {
                0 => f32::INFINITY,
                1 => point.distance(vs[0]),
                _ => {
                    let mut min = f32::INFINITY;
                    for i in 0..vs.len() {
                        let j = (i + 1) % vs.len();
                        min = min.min(point_to_segment_distance(point, vs[i], vs[j]));
                    }
                    min
                }
            },
        }
    }

    /// True when the segment `(a, b)` crosses the obstacle boundary.
    ///
    /// Catches thin line and polygon obstacles that a sampled distance
    /// check can step over.
    pub fn crosses_segment(&self, a: Point2D, b: Point2D) -> bool {
        match &self.shape {
            ObstacleShape::Point(_) => false,
            ObstacleShape::Line(p, q) => segments_intersect(a, b, *p, *q),
            ObstacleShape::Polygon(vs) => match vs.len() {
                0 | 1 => false,
                _ => (0..vs.len())
                    .any(|i| segments_intersect(a, b, vs[i], vs[(i + 1) % vs.len()])),
            },
        }
    }

    /// Minimum distance from `point` to the obstacle projected `dt` seconds
    /// into the future along its predicted velocity.
    pub fn distance_at_time(&self, point: Point2D, dt: f32) -> f32 {
        match self.velocity {
            Some(v) => {
                let shifted = point - v.scaled(dt);
                self.distance(shifted)
            }
            None => self.distance(point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_obstacle_distance() {
        let obs = Obstacle::point(1.0, 0.0);
        assert_relative_eq!(obs.distance(Point2D::new(0.0, 0.0)), 1.0);
        assert!(!obs.is_dynamic());
    }

    #[test]
    fn test_line_obstacle_distance() {
        let obs = Obstacle::line(Point2D::new(0.0, 1.0), Point2D::new(2.0, 1.0));
        assert_relative_eq!(obs.distance(Point2D::new(1.0, 0.0)), 1.0);
    }

    #[test]
    fn test_polygon_centroid() {
        let obs = Obstacle::polygon(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(2.0, 0.0),
            Point2D::new(2.0, 2.0),
            Point2D::new(0.0, 2.0),
        ]);
        let c = obs.centroid();
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.y, 1.0);
    }

    #[test]
    fn test_segment_crossing() {
        let wall = Obstacle::line(Point2D::new(1.0, -1.0), Point2D::new(1.0, 1.0));
        assert!(wall.crosses_segment(Point2D::new(0.0, 0.0), Point2D::new(2.0, 0.0)));
        assert!(!wall.crosses_segment(Point2D::new(0.0, 2.0), Point2D::new(2.0, 2.0)));
        // Points have no extent to cross
        let pole = Obstacle::point(1.0, 0.0);
        assert!(!pole.crosses_segment(Point2D::new(0.0, 0.0), Point2D::new(2.0, 0.0)));
    }

    #[test]
    fn test_dynamic_obstacle_projection() {
        // Obstacle moving +x at 1 m/s, starting at the origin
        let obs = Obstacle::point(0.0, 0.0).with_velocity(Point2D::new(1.0, 0.0));
        let p = Point2D::new(2.0, 0.0);
        assert_relative_eq!(obs.distance_at_time(p, 0.0), 2.0);
        assert_relative_eq!(obs.distance_at_time(p, 2.0), 0.0, epsilon = 1e-6);
    }
}
