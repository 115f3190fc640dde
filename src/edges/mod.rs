//! Cost edge library.
//!
//! Every soft constraint of the planner is one of these edge types.
//! They are constructed fresh for each optimization call by the graph
//! builder in [`crate::planner`] and consumed by
//! [`crate::optim::GraphOptimizer`].

mod acceleration;
mod human;
mod kinematics;
mod obstacle;
mod penalties;
mod time;
mod velocity;
mod via_point;

pub use acceleration::{AccelerationEdge, BoundaryAccelerationEdge};
pub use human::{
    time_to_collision, AgentSafetyEdge, ClosestApproachEdge, DirectionEdge, TtcEdge,
    VisibilityEdge,
};
pub use kinematics::{CarlikeKinematicsEdge, DiffDriveKinematicsEdge};
pub use obstacle::ObstacleEdge;
pub use penalties::{penalty_below, penalty_interval};
pub use time::TimeOptimalEdge;
pub use velocity::{NominalSpeedEdge, VelocityEdge};
pub use via_point::ViaPointEdge;
