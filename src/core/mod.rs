//! Core value types: poses, points, velocities, obstacles.

mod math;
mod obstacle;
mod point;
mod pose;
mod velocity;

pub use math::{angle_diff, average_angle, normalize_angle};
pub use obstacle::{Obstacle, ObstacleShape};
pub use point::{point_to_segment_distance, segments_intersect, Point2D};
pub use pose::Pose2D;
pub use velocity::Velocity;
