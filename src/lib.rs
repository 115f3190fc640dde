//! # TEB Planner
//!
//! Human-aware local trajectory planning for mobile robots, built on
//! timed elastic bands.
//!
//! ## Overview
//!
//! The planner refines a coarse global plan into a time-parameterized
//! local trajectory and a velocity command, every control tick:
//!
//! - **Timed Elastic Band** - alternating sequence of poses and time
//!   gaps, resized online toward a reference temporal resolution
//! - **Cost graph** - soft constraints (kinematics, velocity and
//!   acceleration limits, obstacle separation, human safety) expressed
//!   as weighted least-squares edges over a vertex arena
//! - **Sparse solver** - Levenberg-Marquardt over block-assembled
//!   normal equations with finite-difference Jacobians
//! - **Homotopy-class exploration** - candidates for topologically
//!   distinct corridors, optimized in parallel and selected under a
//!   hysteresis rule
//! - **Multi-agent coordination** - one elastic band per tracked human,
//!   coupled to the robot's band by safety, time-to-collision,
//!   direction, and visibility edges
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use teb_planner::{HumanPlanMap, Pose2D, TebConfig, TebPlanner};
//!
//! let mut planner = TebPlanner::new(TebConfig::default());
//! planner.set_obstacles(obstacles);
//!
//! let plan = vec![Pose2D::new(0.0, 0.0, 0.0), Pose2D::new(3.0, 0.5, 0.0)];
//! planner.plan(&plan, None, false, &HumanPlanMap::new())?;
//! let cmd = planner.velocity_command()?;
//! println!("v = {:.2} m/s, omega = {:.2} rad/s", cmd.linear, cmd.angular);
//! ```
//!
//! ## Coordinate System
//!
//! Uses ROS REP-103 convention:
//! - X: Forward (positive ahead of robot)
//! - Y: Left (positive to robot's left)
//! - Theta: Rotation in radians, CCW positive from +X axis

#![warn(missing_docs)]

// Geometry and agent primitives
pub mod core;

// Unified configuration
pub mod config;

// The trajectory representation
pub mod teb;

// Vertex arena, cost edge trait, solver
pub mod optim;

// Cost edge library
pub mod edges;

// Topological exploration and candidate selection
pub mod homotopy;

// Planning front end
pub mod planner;

mod error;

// Re-export commonly used types
pub use crate::core::{Obstacle, ObstacleShape, Point2D, Pose2D, Velocity};

pub use config::{ConfigError, PlanningMode, TebConfig};

pub use error::PlanError;

pub use homotopy::HSignature;

pub use optim::{CostBreakdown, CostFamily, SolveError, SolveReport};

pub use planner::{
    AgentPlan, CircularFootprint, CollisionModel, HumanId, HumanPlanMap, TebPlanner,
};

pub use teb::{TimedElasticBand, TrajectoryPoint};
