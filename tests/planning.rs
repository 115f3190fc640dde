//! End-to-end planning integration tests.
//!
//! These run the full candidate pipeline: seeding, exploration,
//! deduplication, parallel optimization, and selection.

mod common;

use common::{deterministic_config, init_logs, one_human, straight_plan, walking_human};
use teb_planner::{
    CircularFootprint, HumanPlanMap, Obstacle, Point2D, Pose2D, TebConfig, TebPlanner, Velocity,
};

// ============================================================================
// Full-cycle planning
// ============================================================================

#[test]
fn test_plan_cycle_produces_velocity_command() {
    init_logs();
    let mut planner = TebPlanner::new(deterministic_config()).with_roadmap_seed(11);
    planner.set_obstacles(vec![Obstacle::point(1.5, 0.4)]);

    planner
        .plan(&straight_plan(3.0, 8), None, false, &HumanPlanMap::new())
        .unwrap();

    let cmd = planner.velocity_command().unwrap();
    println!("command: v = {:.3}, omega = {:.3}", cmd.linear, cmd.angular);
    assert!(cmd.linear.abs() <= planner.config().robot.max_vel_x + 0.2);
    assert!(cmd.angular.abs() <= planner.config().robot.max_vel_theta + 0.2);
}

#[test]
fn test_trajectory_time_gaps_stay_positive() {
    init_logs();
    let mut planner = TebPlanner::new(deterministic_config()).with_roadmap_seed(11);
    planner
        .plan(&straight_plan(4.0, 10), None, false, &HumanPlanMap::new())
        .unwrap();

    let trajectory = planner.full_trajectory().unwrap();
    assert!(trajectory.len() >= planner.config().trajectory.min_samples);
    for pair in trajectory.windows(2) {
        assert!(pair[1].time_from_start > pair[0].time_from_start);
    }
}

#[test]
fn test_replan_with_moving_goal_succeeds() {
    init_logs();
    let mut planner = TebPlanner::new(deterministic_config()).with_roadmap_seed(11);
    for step in 0..5 {
        let shift = step as f32 * 0.1;
        let plan: Vec<Pose2D> = straight_plan(3.0, 8)
            .into_iter()
            .map(|p| Pose2D::new(p.x + shift, p.y, p.theta))
            .collect();
        planner.plan(&plan, None, false, &HumanPlanMap::new()).unwrap();
    }
}

// ============================================================================
// Homotopy-class behavior
// ============================================================================

#[test]
fn test_hot_start_keeps_homotopy_class() {
    init_logs();
    let mut cfg = deterministic_config();
    cfg.hcp.simple_exploration = true;
    let mut planner = TebPlanner::new(cfg);
    planner.set_obstacles(vec![Obstacle::point(2.0, 0.1)]);

    planner
        .plan(&straight_plan(4.0, 10), None, false, &HumanPlanMap::new())
        .unwrap();
    let first = planner.best_signature().unwrap();

    // Same goal, robot advanced slightly: the class must not flip
    let advanced: Vec<Pose2D> = straight_plan(4.0, 10)
        .into_iter()
        .map(|p| Pose2D::new(p.x.max(0.05), p.y, p.theta))
        .collect();
    planner
        .plan(&advanced, None, false, &HumanPlanMap::new())
        .unwrap();
    let second = planner.best_signature().unwrap();

    assert!(first.equivalent(&second, 0.1));
}

#[test]
fn test_exploration_survives_blocking_obstacle() {
    init_logs();
    let mut cfg = deterministic_config();
    cfg.hcp.simple_exploration = true;
    let mut planner = TebPlanner::new(cfg);
    // Obstacle dead ahead on the reference line
    planner.set_obstacles(vec![Obstacle::point(2.0, 0.0)]);

    planner
        .plan(&straight_plan(4.0, 10), None, false, &HumanPlanMap::new())
        .unwrap();

    // The selected trajectory must clear the obstacle
    let footprint = CircularFootprint { radius: 0.15 };
    assert!(planner.is_trajectory_feasible(&footprint, None).unwrap());
}

#[test]
fn test_restricted_via_points_reach_cold_start() {
    init_logs();
    let mut cfg = deterministic_config();
    cfg.hcp.viapoints_all_candidates = false;
    let mut planner = TebPlanner::new(cfg).with_roadmap_seed(7);
    planner.set_via_points(vec![Point2D::new(1.0, 0.5)]);

    // First cycle ever: the reference-topology candidate must still be
    // pulled toward the via point
    planner
        .plan(&straight_plan(3.0, 8), None, false, &HumanPlanMap::new())
        .unwrap();
    let deflection = planner
        .full_trajectory()
        .unwrap()
        .iter()
        .map(|tp| tp.pose.y.abs())
        .fold(0.0f32, f32::max);
    println!("max deflection toward via point: {deflection:.4}");
    assert!(deflection > 0.01);
}

#[test]
fn test_reported_cost_matches_winner_via_set() {
    init_logs();
    let mut cfg = deterministic_config();
    cfg.hcp.simple_exploration = true;
    cfg.hcp.viapoints_all_candidates = false;
    let mut planner = TebPlanner::new(cfg);
    planner.set_obstacles(vec![Obstacle::point(2.0, 0.0)]);

    // Lock the selection onto a detour class first
    planner
        .plan(&straight_plan(4.0, 10), None, false, &HumanPlanMap::new())
        .unwrap();

    // A via point on the blocked straight line: the detour winner was
    // optimized without it, so the reported costs must not charge it
    planner.set_via_points(vec![Point2D::new(1.0, 0.0)]);
    let costs = planner
        .plan(&straight_plan(4.0, 10), None, false, &HumanPlanMap::new())
        .unwrap();
    assert_eq!(costs.via_point, 0.0);
}

// ============================================================================
// Human-aware behavior
// ============================================================================

#[test]
fn test_head_on_human_raises_interaction_cost() {
    init_logs();
    let mut cfg = deterministic_config();
    cfg.optim.use_human_robot_safety_c = true;
    let plan = straight_plan(4.0, 10);

    let mut alone = TebPlanner::new(cfg.clone()).with_roadmap_seed(3);
    let base = alone.plan(&plan, None, false, &HumanPlanMap::new()).unwrap();

    let humans = one_human(
        1,
        walking_human(
            Pose2D::new(4.0, 0.0, std::f32::consts::PI),
            Pose2D::new(0.0, 0.0, std::f32::consts::PI),
        ),
    );
    let mut crowded = TebPlanner::new(cfg).with_roadmap_seed(3);
    let costs = crowded.plan(&plan, None, false, &humans).unwrap();

    println!(
        "interaction cost: safety = {:.3}, ttc = {:.3}",
        costs.human_safety, costs.human_ttc
    );
    assert!(costs.human_safety + costs.human_ttc > 0.0);
    assert!(costs.total() > base.total());
}

#[test]
fn test_crossing_human_trajectory_exposed() {
    init_logs();
    let cfg = deterministic_config();
    let mut planner = TebPlanner::new(cfg).with_roadmap_seed(5);
    let humans = one_human(
        9,
        walking_human(
            Pose2D::new(2.0, 2.0, -std::f32::consts::FRAC_PI_2),
            Pose2D::new(2.0, -2.0, -std::f32::consts::FRAC_PI_2),
        ),
    );

    planner
        .plan(&straight_plan(4.0, 10), None, false, &humans)
        .unwrap();

    let human_traj = planner.full_human_trajectory(9).unwrap();
    assert!(human_traj.len() >= 2);
    // Prediction runs toward the human's goal
    assert!(human_traj.last().unwrap().pose.y < human_traj[0].pose.y);
}

#[test]
fn test_start_velocity_respected_in_first_command() {
    init_logs();
    let mut planner = TebPlanner::new(deterministic_config()).with_roadmap_seed(2);
    let moving = Velocity {
        linear: 0.3,
        angular: 0.0,
    };
    planner
        .plan(&straight_plan(3.0, 8), Some(moving), false, &HumanPlanMap::new())
        .unwrap();
    let cmd = planner.velocity_command().unwrap();
    // Bounded launch: the first segment cannot demand a full stop or a
    // jump far beyond the acceleration limit from 0.3 m/s
    assert!(cmd.linear > 0.0);
}

// ============================================================================
// State management
// ============================================================================

#[test]
fn test_clear_then_replan() {
    init_logs();
    let mut planner = TebPlanner::new(deterministic_config()).with_roadmap_seed(1);
    planner
        .plan(&straight_plan(2.0, 5), None, false, &HumanPlanMap::new())
        .unwrap();
    planner.clear();
    assert!(planner.velocity_command().is_err());
    planner
        .plan(&straight_plan(2.0, 5), None, false, &HumanPlanMap::new())
        .unwrap();
    assert!(planner.velocity_command().is_ok());
}

#[test]
fn test_reconfiguration_applies_next_cycle() {
    init_logs();
    let mut planner = TebPlanner::new(deterministic_config()).with_roadmap_seed(1);
    planner
        .plan(&straight_plan(3.0, 8), None, false, &HumanPlanMap::new())
        .unwrap();

    let mut cfg = TebConfig::default();
    cfg.hcp.enable_multithreading = false;
    cfg.robot.max_vel_x = 0.2;
    planner.set_config(cfg);
    planner
        .plan(&straight_plan(3.0, 8), None, false, &HumanPlanMap::new())
        .unwrap();
    assert!((planner.config().robot.max_vel_x - 0.2).abs() < 1e-6);
}
