//! Planner configuration.
//!
//! Grouped by concern the same way the parameters are exposed to the
//! caller: trajectory discretization, robot limits, human limits and
//! safety thresholds, goal tolerances, obstacle handling, optimizer
//! weights, and homotopy-class exploration. All parameters can be loaded
//! from a TOML file; missing fields fall back to their defaults.
//!
//! The planner clones a snapshot of this struct at the start of every
//! planning cycle, so reconfiguration between cycles never races a solve.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid TOML or has wrong field types.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which agents the planner considers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningMode {
    /// Plan for the robot only; human inputs are ignored.
    RobotOnly,
    /// Plan for the robot plus one elastic band per tracked human, with
    /// cross-agent safety edges.
    HumanAware,
}

impl Default for PlanningMode {
    fn default() -> Self {
        PlanningMode::HumanAware
    }
}

/// Trajectory discretization parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// Enable automatic resizing of the trajectory toward `dt_ref`.
    #[serde(default = "default_true")]
    pub autosize: bool,

    /// Desired temporal resolution of the trajectory (seconds).
    #[serde(default = "default_dt_ref")]
    pub dt_ref: f32,

    /// Hysteresis band around `dt_ref` for resizing, as a fraction.
    #[serde(default = "default_dt_hysteresis")]
    pub dt_hysteresis: f32,

    /// Minimum number of robot trajectory samples (hard floor, > 2).
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Minimum number of samples for human trajectories.
    #[serde(default = "default_min_samples")]
    pub human_min_samples: usize,

    /// Maximum cumulative length of the reference plan considered for
    /// optimization (meters; <= 0 disables the limit).
    #[serde(default = "default_lookahead")]
    pub max_global_plan_lookahead_dist: f32,

    /// Reinitialize (cold start) when a new goal moves farther than this
    /// from the previous goal (meters).
    #[serde(default = "default_force_reinit")]
    pub force_reinit_new_goal_dist: f32,

    /// Number of leading poses checked by the feasibility test.
    #[serde(default = "default_feasibility_poses")]
    pub feasibility_check_no_poses: usize,

    /// Allow temporarily shrinking the horizon when the selected
    /// trajectory turns out infeasible.
    #[serde(default = "default_true")]
    pub shrink_horizon_backup: bool,

    /// Fraction of the lookahead kept when the horizon shrinks.
    #[serde(default = "default_horizon_reduction")]
    pub horizon_reduction_amount: f32,

    /// Initial-plan poses closer than this to the start are skipped when
    /// seeding the band (meters).
    #[serde(default = "default_init_skip_dist")]
    pub init_skip_dist: f32,

    /// Seed two-point trajectories driving backwards when the goal lies
    /// behind the start orientation.
    #[serde(default)]
    pub allow_init_with_backwards_motion: bool,
}

fn default_true() -> bool {
    true
}
fn default_dt_ref() -> f32 {
    0.3
}
fn default_dt_hysteresis() -> f32 {
    0.1
}
fn default_min_samples() -> usize {
    3
}
fn default_lookahead() -> f32 {
    1.0
}
fn default_force_reinit() -> f32 {
    1.0
}
fn default_feasibility_poses() -> usize {
    5
}
fn default_horizon_reduction() -> f32 {
    0.5
}
fn default_init_skip_dist() -> f32 {
    0.4
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            autosize: true,
            dt_ref: default_dt_ref(),
            dt_hysteresis: default_dt_hysteresis(),
            min_samples: default_min_samples(),
            human_min_samples: default_min_samples(),
            max_global_plan_lookahead_dist: default_lookahead(),
            force_reinit_new_goal_dist: default_force_reinit(),
            feasibility_check_no_poses: default_feasibility_poses(),
            shrink_horizon_backup: true,
            horizon_reduction_amount: default_horizon_reduction(),
            init_skip_dist: default_init_skip_dist(),
            allow_init_with_backwards_motion: false,
        }
    }
}

/// Robot kinematic and dynamic limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Maximum forward translational velocity (m/s).
    #[serde(default = "default_max_vel_x")]
    pub max_vel_x: f32,

    /// Maximum backwards translational velocity (m/s, positive value).
    #[serde(default = "default_max_vel_x_backwards")]
    pub max_vel_x_backwards: f32,

    /// Maximum angular velocity (rad/s).
    #[serde(default = "default_max_vel_theta")]
    pub max_vel_theta: f32,

    /// Maximum translational acceleration (m/s²).
    #[serde(default = "default_acc_lim_x")]
    pub acc_lim_x: f32,

    /// Maximum angular acceleration (rad/s²).
    #[serde(default = "default_acc_lim_theta")]
    pub acc_lim_theta: f32,

    /// Minimum turning radius for car-like robots (zero = diff-drive).
    #[serde(default)]
    pub min_turning_radius: f32,

    /// Distance between drive shaft and steering axle (car-like only).
    #[serde(default = "default_wheelbase")]
    pub wheelbase: f32,

    /// Robot body radius used for agent-agent clearance (meters).
    #[serde(default = "default_robot_radius")]
    pub radius: f32,
}

fn default_max_vel_x() -> f32 {
    0.4
}
fn default_max_vel_x_backwards() -> f32 {
    0.2
}
fn default_max_vel_theta() -> f32 {
    0.3
}
fn default_acc_lim_x() -> f32 {
    0.5
}
fn default_acc_lim_theta() -> f32 {
    0.5
}
fn default_wheelbase() -> f32 {
    1.0
}
fn default_robot_radius() -> f32 {
    0.25
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            max_vel_x: default_max_vel_x(),
            max_vel_x_backwards: default_max_vel_x_backwards(),
            max_vel_theta: default_max_vel_theta(),
            acc_lim_x: default_acc_lim_x(),
            acc_lim_theta: default_acc_lim_theta(),
            min_turning_radius: 0.0,
            wheelbase: default_wheelbase(),
            radius: default_robot_radius(),
        }
    }
}

/// Human kinematic limits and safety thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HumanConfig {
    /// Human body radius (meters).
    #[serde(default = "default_human_radius")]
    pub radius: f32,

    /// Minimum desired human-robot clearance (meters).
    #[serde(default = "default_min_agent_dist")]
    pub min_human_robot_dist: f32,

    /// Minimum desired human-human clearance (meters).
    #[serde(default = "default_min_agent_dist")]
    pub min_human_human_dist: f32,

    /// Maximum human walking speed (m/s).
    #[serde(default = "default_human_max_vel_x")]
    pub max_vel_x: f32,

    /// Nominal (preferred) human walking speed (m/s).
    #[serde(default = "default_human_nominal_vel_x")]
    pub nominal_vel_x: f32,

    /// Maximum human backwards speed (m/s).
    #[serde(default)]
    pub max_vel_x_backwards: f32,

    /// Maximum human angular velocity (rad/s).
    #[serde(default = "default_human_max_vel_theta")]
    pub max_vel_theta: f32,

    /// Maximum human translational acceleration (m/s²).
    #[serde(default = "default_human_acc_lim_x")]
    pub acc_lim_x: f32,

    /// Maximum human angular acceleration (rad/s²).
    #[serde(default = "default_human_acc_lim_theta")]
    pub acc_lim_theta: f32,

    /// Time-to-collision threshold below which the TTC edge activates (s).
    #[serde(default = "default_ttc_threshold")]
    pub ttc_threshold: f32,

    /// Threshold for the TTC-plus variant (s).
    #[serde(default = "default_ttc_threshold")]
    pub ttcplus_threshold: f32,

    /// Time-of-closest-approach window for the TTC-closest variant (s).
    #[serde(default = "default_ttclosest_threshold")]
    pub ttclosest_threshold: f32,

    /// Forward-projection horizon for the TTC-plus variant (s).
    #[serde(default = "default_ttcplus_timer")]
    pub ttcplus_timer: f32,

    /// Scalar-product threshold above which the relative-direction edge
    /// penalizes motion toward a human.
    #[serde(default = "default_dir_cost_threshold")]
    pub dir_cost_threshold: f32,

    /// Clearance the visibility edge enforces when the robot approaches a
    /// human from outside their field of view (meters).
    #[serde(default = "default_visibility_threshold")]
    pub visibility_cost_threshold: f32,

    /// Human field of view (radians, full angle).
    #[serde(default = "default_fov")]
    pub fov: f32,
}

fn default_human_radius() -> f32 {
    0.2
}
fn default_min_agent_dist() -> f32 {
    0.6
}
fn default_human_max_vel_x() -> f32 {
    1.1
}
fn default_human_nominal_vel_x() -> f32 {
    0.8
}
fn default_human_max_vel_theta() -> f32 {
    1.1
}
fn default_human_acc_lim_x() -> f32 {
    0.6
}
fn default_human_acc_lim_theta() -> f32 {
    0.8
}
fn default_ttc_threshold() -> f32 {
    5.0
}
fn default_ttclosest_threshold() -> f32 {
    0.5
}
fn default_ttcplus_timer() -> f32 {
    5.0
}
fn default_dir_cost_threshold() -> f32 {
    0.5
}
fn default_visibility_threshold() -> f32 {
    1.0
}
fn default_fov() -> f32 {
    2.0
}

impl Default for HumanConfig {
    fn default() -> Self {
        Self {
            radius: default_human_radius(),
            min_human_robot_dist: default_min_agent_dist(),
            min_human_human_dist: default_min_agent_dist(),
            max_vel_x: default_human_max_vel_x(),
            nominal_vel_x: default_human_nominal_vel_x(),
            max_vel_x_backwards: 0.0,
            max_vel_theta: default_human_max_vel_theta(),
            acc_lim_x: default_human_acc_lim_x(),
            acc_lim_theta: default_human_acc_lim_theta(),
            ttc_threshold: default_ttc_threshold(),
            ttcplus_threshold: default_ttc_threshold(),
            ttclosest_threshold: default_ttclosest_threshold(),
            ttcplus_timer: default_ttcplus_timer(),
            dir_cost_threshold: default_dir_cost_threshold(),
            visibility_cost_threshold: default_visibility_threshold(),
            fov: default_fov(),
        }
    }
}

/// Goal tolerance parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoalToleranceConfig {
    /// Allowed final Euclidean distance to the goal (meters).
    #[serde(default = "default_xy_goal_tolerance")]
    pub xy_goal_tolerance: f32,

    /// Allowed final orientation error (radians).
    #[serde(default = "default_yaw_goal_tolerance")]
    pub yaw_goal_tolerance: f32,

    /// Allow a nonzero velocity at the goal pose.
    #[serde(default)]
    pub free_goal_vel: bool,
}

fn default_xy_goal_tolerance() -> f32 {
    0.2
}
fn default_yaw_goal_tolerance() -> f32 {
    0.2
}

impl Default for GoalToleranceConfig {
    fn default() -> Self {
        Self {
            xy_goal_tolerance: default_xy_goal_tolerance(),
            yaw_goal_tolerance: default_yaw_goal_tolerance(),
            free_goal_vel: false,
        }
    }
}

/// Obstacle handling parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObstacleConfig {
    /// Minimum desired separation from obstacles (meters).
    #[serde(default = "default_min_obstacle_dist")]
    pub min_obstacle_dist: f32,

    /// Use the nonlinear (steepening) obstacle penalty instead of the
    /// linear one.
    #[serde(default = "default_true")]
    pub use_nonlinear_obstacle_penalty: bool,

    /// Extra multiplier on obstacle residuals.
    #[serde(default = "default_one")]
    pub obstacle_cost_mult: f32,

    /// Number of neighboring poses (on each side of the closest pose) that
    /// also receive an obstacle edge.
    #[serde(default = "default_obstacle_poses_affected")]
    pub obstacle_poses_affected: usize,
}

fn default_min_obstacle_dist() -> f32 {
    0.5
}
fn default_one() -> f32 {
    1.0
}
fn default_obstacle_poses_affected() -> usize {
    25
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            min_obstacle_dist: default_min_obstacle_dist(),
            use_nonlinear_obstacle_penalty: true,
            obstacle_cost_mult: 1.0,
            obstacle_poses_affected: default_obstacle_poses_affected(),
        }
    }
}

/// Optimizer iteration counts, penalty margins and edge weights.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Solver iterations per outer-loop round.
    #[serde(default = "default_inner_iterations")]
    pub no_inner_iterations: usize,

    /// Outer-loop rounds (each resizes, then re-optimizes).
    #[serde(default = "default_outer_iterations")]
    pub no_outer_iterations: usize,

    /// Master switch for the optimizer.
    #[serde(default = "default_true")]
    pub optimization_activate: bool,

    /// Safety margin added to penalty bounds (hard-constraint softening).
    #[serde(default = "default_penalty_epsilon")]
    pub penalty_epsilon: f32,

    /// Free region of the time penalty (seconds).
    #[serde(default = "default_penalty_epsilon")]
    pub time_penalty_epsilon: f32,

    /// Cap the per-segment time penalty instead of penalizing total time
    /// linearly.
    #[serde(default = "default_true")]
    pub cap_optimaltime_penalty: bool,

    /// Weight: robot translational velocity limit.
    #[serde(default = "default_one")]
    pub weight_max_vel_x: f32,
    /// Weight: robot angular velocity limit.
    #[serde(default = "default_one")]
    pub weight_max_vel_theta: f32,
    /// Weight: robot translational acceleration limit.
    #[serde(default = "default_one")]
    pub weight_acc_lim_x: f32,
    /// Weight: robot angular acceleration limit.
    #[serde(default = "default_one")]
    pub weight_acc_lim_theta: f32,
    /// Weight: nonholonomic kinematics constraint.
    #[serde(default = "default_weight_kinematics_nh")]
    pub weight_kinematics_nh: f32,
    /// Weight: forward drive preference.
    #[serde(default = "default_one")]
    pub weight_kinematics_forward_drive: f32,
    /// Weight: minimum turning radius (car-like robots).
    #[serde(default = "default_one")]
    pub weight_kinematics_turning_radius: f32,
    /// Weight: transition time contraction.
    #[serde(default = "default_one")]
    pub weight_optimaltime: f32,
    /// Weight: obstacle separation.
    #[serde(default = "default_weight_obstacle")]
    pub weight_obstacle: f32,
    /// Weight: dynamic obstacle separation.
    #[serde(default = "default_weight_obstacle")]
    pub weight_dynamic_obstacle: f32,
    /// Weight: via-point attraction.
    #[serde(default = "default_one")]
    pub weight_viapoint: f32,

    /// Weight: human translational velocity limit.
    #[serde(default = "default_two")]
    pub weight_max_human_vel_x: f32,
    /// Weight: human nominal speed attraction.
    #[serde(default = "default_two")]
    pub weight_nominal_human_vel_x: f32,
    /// Weight: human angular velocity limit.
    #[serde(default = "default_two")]
    pub weight_max_human_vel_theta: f32,
    /// Weight: human translational acceleration limit.
    #[serde(default = "default_one")]
    pub weight_human_acc_lim_x: f32,
    /// Weight: human angular acceleration limit.
    #[serde(default = "default_one")]
    pub weight_human_acc_lim_theta: f32,
    /// Weight: human transition time contraction.
    #[serde(default = "default_one")]
    pub weight_human_optimaltime: f32,
    /// Weight: human via-point attraction.
    #[serde(default = "default_one")]
    pub weight_human_viapoint: f32,

    /// Weight: human-robot minimum distance.
    #[serde(default = "default_weight_safety")]
    pub weight_human_robot_safety: f32,
    /// Weight: human-human minimum distance.
    #[serde(default = "default_weight_safety")]
    pub weight_human_human_safety: f32,
    /// Weight: human-robot time-to-collision.
    #[serde(default = "default_weight_safety")]
    pub weight_human_robot_ttc: f32,
    /// Weight: human-robot TTC-plus variant.
    #[serde(default = "default_weight_safety")]
    pub weight_human_robot_ttcplus: f32,
    /// Weight: human-robot TTC-closest variant.
    #[serde(default = "default_weight_ttclosest")]
    pub weight_human_robot_ttclosest: f32,
    /// Weight: relative direction penalty.
    #[serde(default = "default_weight_safety")]
    pub weight_human_robot_dir: f32,
    /// Weight: visibility penalty.
    #[serde(default = "default_weight_safety")]
    pub weight_human_robot_visibility: f32,

    /// Exponential scaling factor of the TTC residual.
    #[serde(default = "default_one")]
    pub human_robot_ttc_scale_alpha: f32,
    /// Exponential scaling factor of the TTC-plus residual.
    #[serde(default = "default_one")]
    pub human_robot_ttcplus_scale_alpha: f32,

    /// Enable the human-robot minimum-distance edge.
    #[serde(default)]
    pub use_human_robot_safety_c: bool,
    /// Enable the human-human minimum-distance edge.
    #[serde(default = "default_true")]
    pub use_human_human_safety_c: bool,
    /// Enable the TTC edge.
    #[serde(default = "default_true")]
    pub use_human_robot_ttc_c: bool,
    /// Enable the TTC-plus edge.
    #[serde(default)]
    pub use_human_robot_ttcplus_c: bool,
    /// Enable the TTC-closest edge.
    #[serde(default = "default_true")]
    pub use_human_robot_ttclosest_c: bool,
    /// Scale the TTC residual exponentially with remaining time.
    #[serde(default = "default_true")]
    pub scale_human_robot_ttc_c: bool,
    /// Scale the TTC-plus residual exponentially with remaining time.
    #[serde(default = "default_true")]
    pub scale_human_robot_ttcplus_c: bool,
    /// Enable the relative-direction edge.
    #[serde(default = "default_true")]
    pub use_human_robot_dir_c: bool,
    /// Enable the visibility edge.
    #[serde(default = "default_true")]
    pub use_human_robot_visi_c: bool,
}

fn default_inner_iterations() -> usize {
    8
}
fn default_outer_iterations() -> usize {
    4
}
fn default_penalty_epsilon() -> f32 {
    0.1
}
fn default_weight_kinematics_nh() -> f32 {
    1000.0
}
fn default_weight_obstacle() -> f32 {
    10.0
}
fn default_two() -> f32 {
    2.0
}
fn default_weight_safety() -> f32 {
    20.0
}
fn default_weight_ttclosest() -> f32 {
    10.0
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            no_inner_iterations: default_inner_iterations(),
            no_outer_iterations: default_outer_iterations(),
            optimization_activate: true,
            penalty_epsilon: default_penalty_epsilon(),
            time_penalty_epsilon: default_penalty_epsilon(),
            cap_optimaltime_penalty: true,
            weight_max_vel_x: 1.0,
            weight_max_vel_theta: 1.0,
            weight_acc_lim_x: 1.0,
            weight_acc_lim_theta: 1.0,
            weight_kinematics_nh: default_weight_kinematics_nh(),
            weight_kinematics_forward_drive: 1.0,
            weight_kinematics_turning_radius: 1.0,
            weight_optimaltime: 1.0,
            weight_obstacle: default_weight_obstacle(),
            weight_dynamic_obstacle: default_weight_obstacle(),
            weight_viapoint: 1.0,
            weight_max_human_vel_x: 2.0,
            weight_nominal_human_vel_x: 2.0,
            weight_max_human_vel_theta: 2.0,
            weight_human_acc_lim_x: 1.0,
            weight_human_acc_lim_theta: 1.0,
            weight_human_optimaltime: 1.0,
            weight_human_viapoint: 1.0,
            weight_human_robot_safety: default_weight_safety(),
            weight_human_human_safety: default_weight_safety(),
            weight_human_robot_ttc: default_weight_safety(),
            weight_human_robot_ttcplus: default_weight_safety(),
            weight_human_robot_ttclosest: default_weight_ttclosest(),
            weight_human_robot_dir: default_weight_safety(),
            weight_human_robot_visibility: default_weight_safety(),
            human_robot_ttc_scale_alpha: 1.0,
            human_robot_ttcplus_scale_alpha: 1.0,
            use_human_robot_safety_c: false,
            use_human_human_safety_c: true,
            use_human_robot_ttc_c: true,
            use_human_robot_ttcplus_c: false,
            use_human_robot_ttclosest_c: true,
            scale_human_robot_ttc_c: true,
            scale_human_robot_ttcplus_c: true,
            use_human_robot_dir_c: true,
            use_human_robot_visi_c: true,
        }
    }
}

/// Homotopy-class exploration parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HomotopyConfig {
    /// Enable parallel planning in distinctive topologies.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Optimize candidates on a worker pool instead of sequentially.
    #[serde(default = "default_true")]
    pub enable_multithreading: bool,

    /// Use the simple left/right exploration instead of roadmap sampling.
    #[serde(default)]
    pub simple_exploration: bool,

    /// Maximum number of alternative classes kept per cycle.
    #[serde(default = "default_max_classes")]
    pub max_number_classes: usize,

    /// A new candidate is selected only if its cost is below the previous
    /// best's cost times this factor.
    #[serde(default = "default_one")]
    pub selection_cost_hysteresis: f32,

    /// Extra scaling of obstacle cost terms during selection only.
    #[serde(default = "default_obst_cost_scale")]
    pub selection_obst_cost_scale: f32,

    /// Extra scaling of via-point cost terms during selection only.
    #[serde(default = "default_one")]
    pub selection_viapoint_cost_scale: f32,

    /// Replace the time cost by the total transition time for selection.
    #[serde(default)]
    pub selection_alternative_time_cost: bool,

    /// Number of roadmap samples when `simple_exploration` is off.
    #[serde(default = "default_roadmap_samples")]
    pub roadmap_graph_no_samples: usize,

    /// Width of the sampling corridor between start and goal (meters).
    #[serde(default = "default_roadmap_width")]
    pub roadmap_graph_area_width: f32,

    /// Prescaler applied to H-signature contributions (0.2 < H <= 1).
    #[serde(default = "default_one")]
    pub h_signature_prescaler: f32,

    /// Two H-signatures are equal when both real and imaginary parts
    /// differ by less than this.
    #[serde(default = "default_h_signature_threshold")]
    pub h_signature_threshold: f32,

    /// Lateral keypoint offset (beyond `min_obstacle_dist`) for the simple
    /// left/right exploration.
    #[serde(default = "default_keypoint_offset")]
    pub obstacle_keypoint_offset: f32,

    /// Normalized scalar product between obstacle heading and goal heading
    /// required for an obstacle to be explored.
    #[serde(default = "default_heading_threshold")]
    pub obstacle_heading_threshold: f32,

    /// Attach via-points to all candidates instead of only the one that
    /// shares the reference plan's topology.
    #[serde(default = "default_true")]
    pub viapoints_all_candidates: bool,

    /// Worker threads for parallel candidate optimization (0 = available
    /// parallelism).
    #[serde(default)]
    pub max_threads: usize,
}

fn default_max_classes() -> usize {
    5
}
fn default_obst_cost_scale() -> f32 {
    100.0
}
fn default_roadmap_samples() -> usize {
    15
}
fn default_roadmap_width() -> f32 {
    6.0
}
fn default_h_signature_threshold() -> f32 {
    0.1
}
fn default_keypoint_offset() -> f32 {
    0.1
}
fn default_heading_threshold() -> f32 {
    0.45
}

impl Default for HomotopyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_multithreading: true,
            simple_exploration: false,
            max_number_classes: default_max_classes(),
            selection_cost_hysteresis: 1.0,
            selection_obst_cost_scale: default_obst_cost_scale(),
            selection_viapoint_cost_scale: 1.0,
            selection_alternative_time_cost: false,
            roadmap_graph_no_samples: default_roadmap_samples(),
            roadmap_graph_area_width: default_roadmap_width(),
            h_signature_prescaler: 1.0,
            h_signature_threshold: default_h_signature_threshold(),
            obstacle_keypoint_offset: default_keypoint_offset(),
            obstacle_heading_threshold: default_heading_threshold(),
            viapoints_all_candidates: true,
            max_threads: 0,
        }
    }
}

/// Complete planner configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TebConfig {
    /// Which agents are planned for.
    #[serde(default)]
    pub planning_mode: PlanningMode,
    /// Trajectory discretization.
    #[serde(default)]
    pub trajectory: TrajectoryConfig,
    /// Robot limits.
    #[serde(default)]
    pub robot: RobotConfig,
    /// Human limits and safety thresholds.
    #[serde(default)]
    pub human: HumanConfig,
    /// Goal tolerances.
    #[serde(default)]
    pub goal_tolerance: GoalToleranceConfig,
    /// Obstacle handling.
    #[serde(default)]
    pub obstacles: ObstacleConfig,
    /// Optimizer iteration counts and weights.
    #[serde(default)]
    pub optim: OptimizationConfig,
    /// Homotopy-class exploration.
    #[serde(default)]
    pub hcp: HomotopyConfig,
}

impl TebConfig {
    /// Load configuration from a TOML file; missing fields use defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: TebConfig = toml::from_str(&text)?;
        config.check();
        Ok(config)
    }

    /// Warn about inconsistent parameter combinations.
    ///
    /// Mirrors the usual operator mistakes; never fails, only logs.
    pub fn check(&self) {
        if self.trajectory.min_samples < 3 {
            log::warn!(
                "trajectory.min_samples = {} is below 3; the band needs at \
                 least start, one interior pose and goal",
                self.trajectory.min_samples
            );
        }
        if self.trajectory.dt_hysteresis >= 0.5 {
            log::warn!(
                "trajectory.dt_hysteresis = {} is large; autosize may oscillate",
                self.trajectory.dt_hysteresis
            );
        }
        if self.optim.penalty_epsilon >= self.robot.max_vel_x {
            log::warn!(
                "optim.penalty_epsilon {} >= robot.max_vel_x {}; the velocity \
                 penalty is active everywhere",
                self.optim.penalty_epsilon,
                self.robot.max_vel_x
            );
        }
        if self.hcp.selection_cost_hysteresis > 1.0 {
            log::warn!(
                "hcp.selection_cost_hysteresis {} > 1.0 makes class switching \
                 easier than keeping the current class",
                self.hcp.selection_cost_hysteresis
            );
        }
        if !(0.2..=1.0).contains(&self.hcp.h_signature_prescaler) {
            log::warn!(
                "hcp.h_signature_prescaler {} outside (0.2, 1.0]; obstacles \
                 may become indistinguishable",
                self.hcp.h_signature_prescaler
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_values() {
        let cfg = TebConfig::default();
        assert_eq!(cfg.planning_mode, PlanningMode::HumanAware);
        assert_eq!(cfg.trajectory.min_samples, 3);
        assert!((cfg.trajectory.dt_ref - 0.3).abs() < 1e-6);
        assert!((cfg.robot.max_vel_x - 0.4).abs() < 1e-6);
        assert!((cfg.human.ttc_threshold - 5.0).abs() < 1e-6);
        assert_eq!(cfg.optim.no_inner_iterations, 8);
        assert_eq!(cfg.optim.no_outer_iterations, 4);
        assert_eq!(cfg.hcp.max_number_classes, 5);
    }

    #[test]
    fn test_parse_partial_toml() {
        let text = r#"
            planning_mode = "robot_only"

            [robot]
            max_vel_x = 0.8

            [hcp]
            selection_cost_hysteresis = 0.9
        "#;
        let cfg: TebConfig = toml::from_str(text).unwrap();
        assert_eq!(cfg.planning_mode, PlanningMode::RobotOnly);
        assert!((cfg.robot.max_vel_x - 0.8).abs() < 1e-6);
        assert!((cfg.hcp.selection_cost_hysteresis - 0.9).abs() < 1e-6);
        // Untouched sections keep defaults
        assert!((cfg.human.radius - 0.2).abs() < 1e-6);
        assert_eq!(cfg.optim.no_inner_iterations, 8);
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = TebConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: TebConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.trajectory.min_samples, cfg.trajectory.min_samples);
        assert!((back.optim.weight_kinematics_nh - cfg.optim.weight_kinematics_nh).abs() < 1e-6);
    }
}
