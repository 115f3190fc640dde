//! Test utilities for planner integration tests.
//!
//! This module provides helpers for creating reference plans, obstacle
//! layouts, and planner configurations.

#![allow(dead_code)]

use teb_planner::{AgentPlan, HumanPlanMap, Obstacle, Pose2D, TebConfig, Velocity};

/// Route planner logs through the test harness (`RUST_LOG=debug` to see
/// candidate selection).
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create a straight reference plan along the x axis.
pub fn straight_plan(length: f32, n: usize) -> Vec<Pose2D> {
    (0..n)
        .map(|i| Pose2D::new(length * i as f32 / (n - 1) as f32, 0.0, 0.0))
        .collect()
}

/// A deterministic single-threaded configuration for reproducible runs.
pub fn deterministic_config() -> TebConfig {
    let mut cfg = TebConfig::default();
    cfg.hcp.enable_multithreading = false;
    cfg.hcp.selection_cost_hysteresis = 0.9;
    cfg.trajectory.feasibility_check_no_poses = 0;
    cfg
}

/// One human walking from `start` to `goal` at roughly 1 m/s.
pub fn walking_human(start: Pose2D, goal: Pose2D) -> AgentPlan {
    AgentPlan {
        plan: vec![start, goal],
        start_velocity: Some(Velocity {
            linear: 1.0,
            angular: 0.0,
        }),
        goal_velocity: None,
    }
}

/// Human plan map with a single entry.
pub fn one_human(id: u64, plan: AgentPlan) -> HumanPlanMap {
    let mut humans = HumanPlanMap::new();
    humans.insert(id, plan);
    humans
}

/// A point obstacle wall segment perpendicular to the x axis.
pub fn wall(x: f32, y0: f32, y1: f32, spacing: f32) -> Vec<Obstacle> {
    let n = ((y1 - y0) / spacing).ceil() as usize;
    (0..=n)
        .map(|i| Obstacle::point(x, y0 + i as f32 * spacing))
        .collect()
}
