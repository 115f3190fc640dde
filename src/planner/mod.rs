//! Planning front end: multi-agent coordination, candidate pipeline,
//! velocity command extraction.
//!
//! One [`TebPlanner`] owns the persistent state between cycles (agent
//! bands, previous best homotopy class). Each `plan` call snapshots the
//! configuration, reconciles agents with the caller's inputs, spawns and
//! optimizes homotopy candidates, and adopts the winner.

mod agents;

pub use agents::{Agent, AgentPlan, AgentSet, HumanId, HumanPlanMap};

use log::{debug, trace, warn};

use crate::config::{PlanningMode, TebConfig};
use crate::core::{Obstacle, Point2D, Pose2D, Velocity};
use crate::edges::{
    AccelerationEdge, AgentSafetyEdge, BoundaryAccelerationEdge, CarlikeKinematicsEdge,
    ClosestApproachEdge, DiffDriveKinematicsEdge, DirectionEdge, NominalSpeedEdge, ObstacleEdge,
    TimeOptimalEdge, TtcEdge, VelocityEdge, ViaPointEdge, VisibilityEdge,
};
use crate::error::PlanError;
use crate::homotopy::{
    dedup_candidates, keypoint_exploration, optimize_candidates, select_candidate, Candidate,
    HSignature, RoadmapSampler,
};
use crate::optim::{CostBreakdown, GraphOptimizer, SolveError, VertexArena, VertexId};
use crate::teb::{TimedElasticBand, TrajectoryPoint};

/// Footprint collision test supplied by the caller.
pub trait CollisionModel {
    /// True when the footprint placed at `pose` intersects any obstacle.
    fn in_collision(&self, pose: Pose2D, obstacles: &[Obstacle]) -> bool;
}

/// Disk footprint centered on the robot.
pub struct CircularFootprint {
    /// Footprint radius in meters.
    pub radius: f32,
}

impl CollisionModel for CircularFootprint {
    fn in_collision(&self, pose: Pose2D, obstacles: &[Obstacle]) -> bool {
        obstacles
            .iter()
            .any(|obs| obs.distance(pose.position()) < self.radius)
    }
}

/// Human-aware elastic band planner.
pub struct TebPlanner {
    config: TebConfig,
    agents: AgentSet,
    obstacles: Vec<Obstacle>,
    via_points: Vec<Point2D>,
    best_signature: Option<HSignature>,
    best_cost: Option<f32>,
    solved: bool,
    horizon_reduction: bool,
    roadmap_seed: Option<u64>,
}

impl TebPlanner {
    /// Planner with no trajectory yet; the first `plan` cold-starts.
    pub fn new(config: TebConfig) -> Self {
        config.check();
        Self {
            config,
            agents: AgentSet::default(),
            obstacles: Vec::new(),
            via_points: Vec::new(),
            best_signature: None,
            best_cost: None,
            solved: false,
            horizon_reduction: false,
            roadmap_seed: None,
        }
    }

    /// Deterministic roadmap sampling for tests.
    #[doc(hidden)]
    pub fn with_roadmap_seed(mut self, seed: u64) -> Self {
        self.roadmap_seed = Some(seed);
        self
    }

    /// Currently active configuration.
    pub fn config(&self) -> &TebConfig {
        &self.config
    }

    /// Replace the configuration; takes effect from the next cycle.
    pub fn set_config(&mut self, config: TebConfig) {
        config.check();
        self.config = config;
    }

    /// Obstacles for the upcoming cycle, also used by feasibility and
    /// cost queries until replaced.
    pub fn set_obstacles(&mut self, obstacles: Vec<Obstacle>) {
        self.obstacles = obstacles;
    }

    /// Waypoints the robot band is attracted to.
    pub fn set_via_points(&mut self, via_points: Vec<Point2D>) {
        self.via_points = via_points;
    }

    /// Plan along a reference path.
    ///
    /// Returns the selected candidate's cost breakdown, or
    /// [`PlanError::NoFeasibleCandidate`] when every candidate failed,
    /// in which case the previous trajectory is retained for the next
    /// cycle's hot start.
    pub fn plan(
        &mut self,
        initial_plan: &[Pose2D],
        start_velocity: Option<Velocity>,
        free_goal_velocity: bool,
        human_plans: &HumanPlanMap,
    ) -> Result<CostBreakdown, PlanError> {
        if initial_plan.len() < 2 {
            return Err(PlanError::InvalidPlan("fewer than two poses"));
        }
        // Snapshot: reconfiguration never lands mid-cycle
        let cfg = self.config.clone();

        let lookahead = cfg.trajectory.max_global_plan_lookahead_dist;
        let reference = truncate_plan(initial_plan, lookahead);
        match self.plan_cycle(&reference, start_velocity, free_goal_velocity, human_plans, &cfg) {
            Ok(costs) => {
                self.horizon_reduction = false;
                Ok(costs)
            }
            Err(PlanError::NoFeasibleCandidate) if cfg.trajectory.shrink_horizon_backup => {
                self.horizon_reduction = true;
                let span = plan_length(&reference);
                let shrunk = truncate_plan(
                    &reference,
                    span * (1.0 - cfg.trajectory.horizon_reduction_amount),
                );
                warn!(
                    "no feasible candidate, retrying with horizon shrunk to {:.2} m",
                    plan_length(&shrunk)
                );
                self.plan_cycle(&shrunk, start_velocity, free_goal_velocity, human_plans, &cfg)
            }
            Err(e) => Err(e),
        }
    }

    /// Plan between two poses, with a straight-line reference.
    pub fn plan_between(
        &mut self,
        start: Pose2D,
        goal: Pose2D,
        start_velocity: Option<Velocity>,
        free_goal_velocity: bool,
        human_plans: &HumanPlanMap,
    ) -> Result<CostBreakdown, PlanError> {
        self.plan(&[start, goal], start_velocity, free_goal_velocity, human_plans)
    }

    fn plan_cycle(
        &mut self,
        reference: &[Pose2D],
        start_velocity: Option<Velocity>,
        free_goal_velocity: bool,
        human_plans: &HumanPlanMap,
        cfg: &TebConfig,
    ) -> Result<CostBreakdown, PlanError> {
        let start_vel = start_velocity.unwrap_or(Velocity::ZERO);
        self.agents.update_robot(reference, start_vel, cfg);
        self.agents.robot.goal_velocity =
            if free_goal_velocity || cfg.goal_tolerance.free_goal_vel {
                None
            } else {
                Some(Velocity::ZERO)
            };
        if cfg.planning_mode == PlanningMode::HumanAware {
            self.agents.sync_humans(human_plans, cfg);
        } else {
            self.agents.humans.clear();
        }
        if self.agents.robot.teb.len() < 2 {
            return Err(PlanError::InvalidPlan("reference plan collapsed"));
        }

        let mut pool = self.spawn_candidates(reference, cfg);
        dedup_candidates(
            &mut pool,
            cfg.hcp.h_signature_threshold,
            cfg.hcp.max_number_classes.max(1),
        );

        let obstacles = &self.obstacles;
        let via_points = &self.via_points;
        let threads = if cfg.hcp.enable_multithreading {
            cfg.hcp.max_threads
        } else {
            1
        };
        optimize_candidates(&mut pool, threads, |cand| {
            let with_via = cfg.hcp.viapoints_all_candidates || cand.follows_reference;
            let via = if with_via { via_points.as_slice() } else { &[] };
            match optimize_agents(&mut cand.agents, obstacles, via, cfg) {
                Ok(costs) => {
                    cand.cost = if cfg.hcp.selection_alternative_time_cost {
                        cand.agents.robot.teb.total_time()
                    } else {
                        costs.selection_total(
                            cfg.hcp.selection_obst_cost_scale,
                            cfg.hcp.selection_viapoint_cost_scale,
                        )
                    };
                    cand.signature =
                        signature_of(&cand.agents.robot.teb, obstacles, cfg.hcp.h_signature_prescaler);
                }
                Err(e) => debug!("candidate discarded: {e}"),
            }
        });

        let selected = select_candidate(
            &pool,
            self.best_signature.as_ref(),
            self.best_cost,
            cfg.hcp.selection_cost_hysteresis,
            cfg.hcp.h_signature_threshold,
        )
        .ok_or(PlanError::NoFeasibleCandidate)
        .inspect_err(|_| {
            self.solved = false;
            warn!("all homotopy candidates failed this cycle");
        })?;

        let winner = pool.swap_remove(selected);
        debug!(
            "selected candidate with cost {:.3} ({} classes explored)",
            winner.cost,
            pool.len() + 1
        );
        let winner_via: &[Point2D] =
            if cfg.hcp.viapoints_all_candidates || winner.follows_reference {
                via_points
            } else {
                &[]
            };
        self.agents = winner.agents;
        self.best_signature = Some(winner.signature);
        self.best_cost = Some(winner.cost);
        self.solved = true;

        // Reported costs match the graph the winner was optimized on
        let (graph, _) = build_graph(&self.agents, obstacles, winner_via, cfg);
        Ok(graph.cost_breakdown())
    }

    /// Seed and explore the candidate pool for this cycle.
    ///
    /// Marks every candidate that shares the reference plan's homotopy
    /// class; the restricted via-point mode attaches only to those.
    fn spawn_candidates(&self, reference: &[Pose2D], cfg: &TebConfig) -> Vec<Candidate> {
        let obstacles = &self.obstacles;
        let prescaler = cfg.hcp.h_signature_prescaler;
        let threshold = cfg.hcp.h_signature_threshold;
        let reference_path: Vec<Point2D> = reference.iter().map(|p| p.position()).collect();
        let reference_sig = HSignature::of_path(&reference_path, obstacles, prescaler);
        let mut pool = Vec::new();

        // Hot-started seed: the bands as reconciled from the last cycle
        let hot = self.best_signature.is_some();
        let hot_sig = signature_of(&self.agents.robot.teb, obstacles, prescaler);
        let mut seed = Candidate::new(self.agents.clone(), hot_sig, hot);
        seed.follows_reference = hot_sig.equivalent(&reference_sig, threshold);
        pool.push(seed);

        // Fresh seed straight from the reference plan
        let mut fresh = self.agents.clone();
        fresh.robot.teb.init_from_plan(
            reference,
            cfg.trajectory.dt_ref,
            cfg.trajectory.min_samples,
            cfg.trajectory.init_skip_dist,
        );
        let sig = signature_of(&fresh.robot.teb, obstacles, prescaler);
        let mut fresh_cand = Candidate::new(fresh, sig, false);
        fresh_cand.follows_reference = true;
        pool.push(fresh_cand);

        if !cfg.hcp.enabled {
            return pool;
        }
        let (Some(start), Some(goal)) = (reference.first(), reference.last()) else {
            return pool;
        };
        let paths = if cfg.hcp.simple_exploration {
            keypoint_exploration(
                start.position(),
                goal.position(),
                obstacles,
                cfg.hcp.roadmap_graph_area_width,
                cfg.obstacles.min_obstacle_dist + cfg.hcp.obstacle_keypoint_offset,
                cfg.hcp.obstacle_heading_threshold,
            )
        } else {
            let mut sampler = match self.roadmap_seed {
                Some(seed) => RoadmapSampler::with_seed(seed),
                None => RoadmapSampler::new(),
            };
            sampler.explore(
                start.position(),
                goal.position(),
                obstacles,
                cfg.hcp.roadmap_graph_no_samples,
                cfg.hcp.roadmap_graph_area_width,
                cfg.obstacles.min_obstacle_dist,
                cfg.hcp.max_number_classes * 4,
            )
        };
        trace!("exploration generated {} raw paths", paths.len());
        for path in paths {
            let plan = plan_from_points(&path, *start, *goal);
            let mut agents = self.agents.clone();
            if !agents.robot.teb.init_from_plan(
                &plan,
                cfg.trajectory.dt_ref,
                cfg.trajectory.min_samples,
                cfg.trajectory.init_skip_dist,
            ) {
                continue;
            }
            let sig = signature_of(&agents.robot.teb, obstacles, prescaler);
            let mut cand = Candidate::new(agents, sig, false);
            cand.follows_reference = sig.equivalent(&reference_sig, threshold);
            pool.push(cand);
        }
        pool
    }

    /// Velocity command from the first solved segment.
    ///
    /// Finite differences: linear along the start heading, angular from
    /// the heading change. For a car-like robot (positive
    /// `min_turning_radius`) the angular component is converted to a
    /// steering angle using the configured wheelbase.
    pub fn velocity_command(&self) -> Result<Velocity, PlanError> {
        if !self.solved || self.agents.robot.teb.len() < 2 {
            return Err(PlanError::NoPlanAvailable);
        }
        let teb = &self.agents.robot.teb;
        let p0 = teb.pose(0);
        let p1 = teb.pose(1);
        let dt = teb.time_diff(0).max(1e-4);
        let delta = p1.position() - p0.position();
        let linear = delta.dot(p0.heading_vector()) / dt;
        let mut angular = p0.heading_diff(p1) / dt;
        if self.config.robot.min_turning_radius > 0.0 {
            angular = if linear.abs() < 1e-4 {
                0.0
            } else {
                (self.config.robot.wheelbase * angular / linear).atan()
            };
        }
        Ok(Velocity { linear, angular })
    }

    /// Whether `current` is within the configured goal tolerances of the
    /// planned goal.
    pub fn is_goal_reached(&self, current: Pose2D) -> bool {
        let Some(goal) = self.agents.robot.teb.goal() else {
            return false;
        };
        current.distance(goal) <= self.config.goal_tolerance.xy_goal_tolerance
            && current.heading_diff(goal).abs() <= self.config.goal_tolerance.yaw_goal_tolerance
    }

    /// Check the selected trajectory against a collision model.
    ///
    /// At most `look_ahead` poses are tested; `None` falls back to
    /// `trajectory.feasibility_check_no_poses` (0 meaning the whole
    /// band). Returns `true` when every tested pose is collision free.
    pub fn is_trajectory_feasible(
        &self,
        model: &dyn CollisionModel,
        look_ahead: Option<usize>,
    ) -> Result<bool, PlanError> {
        if !self.solved || self.agents.robot.teb.is_empty() {
            return Err(PlanError::NoPlanAvailable);
        }
        let teb = &self.agents.robot.teb;
        let configured = self.config.trajectory.feasibility_check_no_poses;
        let count = look_ahead
            .unwrap_or(if configured == 0 { teb.len() } else { configured })
            .min(teb.len());
        for i in 0..count {
            if model.in_collision(teb.pose(i), &self.obstacles) {
                debug!("trajectory infeasible at pose {i}");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Advisory: whether the caller should hand in a shorter plan.
    ///
    /// Reports the recommendation recorded by the last cycle instead of
    /// re-deriving one from the plan shape.
    pub fn is_horizon_reduction_appropriate(&self, initial_plan: &[Pose2D]) -> bool {
        self.horizon_reduction && initial_plan.len() >= 2
    }

    /// Recompute the current graph's cost without optimizing.
    ///
    /// With `alternative_time` the time family is replaced with the
    /// band's total transition time, the same substitution
    /// `selection_alternative_time_cost` applies during selection.
    pub fn compute_current_cost(
        &self,
        obstacle_cost_scale: f32,
        viapoint_cost_scale: f32,
        alternative_time: bool,
    ) -> Result<CostBreakdown, PlanError> {
        if self.agents.robot.teb.len() < 2 {
            return Err(PlanError::NoPlanAvailable);
        }
        let (graph, _) = build_graph(&self.agents, &self.obstacles, &self.via_points, &self.config);
        let mut costs = graph.cost_breakdown();
        costs.obstacle *= obstacle_cost_scale;
        costs.via_point *= viapoint_cost_scale;
        if alternative_time {
            costs.time = self.agents.robot.teb.total_time();
        }
        Ok(costs)
    }

    /// Full timed robot trajectory for visualization.
    pub fn full_trajectory(&self) -> Result<Vec<TrajectoryPoint>, PlanError> {
        if self.agents.robot.teb.is_empty() {
            return Err(PlanError::NoPlanAvailable);
        }
        Ok(self.agents.robot.teb.timed_points())
    }

    /// Full timed trajectory of one tracked human.
    pub fn full_human_trajectory(&self, id: HumanId) -> Result<Vec<TrajectoryPoint>, PlanError> {
        self.agents
            .humans
            .get(&id)
            .map(|agent| agent.teb.timed_points())
            .ok_or(PlanError::NoPlanAvailable)
    }

    /// H-signature of the currently selected candidate, if any.
    pub fn best_signature(&self) -> Option<HSignature> {
        self.best_signature
    }

    /// Reset all internal state, forcing a cold start next cycle.
    pub fn clear(&mut self) {
        self.agents.clear();
        self.best_signature = None;
        self.best_cost = None;
        self.solved = false;
        self.horizon_reduction = false;
    }
}

/// H-signature of a band's spatial path.
fn signature_of(teb: &TimedElasticBand, obstacles: &[Obstacle], prescaler: f32) -> HSignature {
    let path: Vec<Point2D> = teb.poses().iter().map(|p| p.position()).collect();
    HSignature::of_path(&path, obstacles, prescaler)
}

/// Cumulative arc length of a plan.
fn plan_length(plan: &[Pose2D]) -> f32 {
    plan.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Cut a plan after `max_dist` of arc length (0 keeps everything). The
/// result always has at least two poses when the input does.
fn truncate_plan(plan: &[Pose2D], max_dist: f32) -> Vec<Pose2D> {
    if max_dist <= 0.0 || plan.len() < 2 {
        return plan.to_vec();
    }
    let mut out = vec![plan[0]];
    let mut dist = 0.0;
    for w in plan.windows(2) {
        dist += w[0].distance(w[1]);
        out.push(w[1]);
        if dist >= max_dist {
            break;
        }
    }
    out
}

/// Turn an exploration polyline into a pose plan: interior waypoints
/// face along the line of travel, endpoints keep their given headings.
fn plan_from_points(path: &[Point2D], start: Pose2D, goal: Pose2D) -> Vec<Pose2D> {
    let mut plan = Vec::with_capacity(path.len());
    plan.push(start);
    for k in 1..path.len().saturating_sub(1) {
        let heading = (path[k + 1] - path[k]).angle();
        plan.push(Pose2D::from_position(path[k], heading));
    }
    plan.push(goal);
    plan
}

/// World-frame velocity vector of a band at sample `i`, by finite
/// difference over the adjacent segment.
fn world_velocity(teb: &TimedElasticBand, i: usize) -> Point2D {
    if teb.len() < 2 {
        return Point2D::new(0.0, 0.0);
    }
    let j = i.min(teb.len() - 2);
    let a = teb.pose(j);
    let b = teb.pose(j + 1);
    let dt = teb.time_diff(j).max(1e-4);
    Point2D::new((b.x - a.x) / dt, (b.y - a.y) / dt)
}

/// Index of the human sample closest in time to `t`.
fn nearest_time_index(teb: &TimedElasticBand, t: f32) -> usize {
    let mut best = 0;
    let mut best_diff = f32::INFINITY;
    for j in 0..teb.len() {
        let diff = (teb.time_at(j) - t).abs();
        if diff < best_diff {
            best_diff = diff;
            best = j;
        }
    }
    best
}

/// Vertex handles of one agent's band within the shared arena.
struct BandLayout {
    poses: Vec<VertexId>,
    dts: Vec<VertexId>,
}

struct GraphLayout {
    robot: BandLayout,
    humans: Vec<(HumanId, BandLayout)>,
}

/// Run the outer autosize-and-solve loop on one candidate's agents.
fn optimize_agents(
    agents: &mut AgentSet,
    obstacles: &[Obstacle],
    via_points: &[Point2D],
    cfg: &TebConfig,
) -> Result<CostBreakdown, SolveError> {
    for _ in 0..cfg.optim.no_outer_iterations.max(1) {
        if cfg.trajectory.autosize {
            agents.robot.teb.autosize(
                cfg.trajectory.dt_ref,
                cfg.trajectory.dt_hysteresis,
                cfg.trajectory.min_samples,
            );
            for agent in agents.humans.values_mut() {
                agent.teb.autosize(
                    cfg.trajectory.dt_ref,
                    cfg.trajectory.dt_hysteresis,
                    cfg.trajectory.human_min_samples,
                );
            }
        }
        let (mut graph, layout) = build_graph(agents, obstacles, via_points, cfg);
        if cfg.optim.optimization_activate {
            graph.optimize(cfg.optim.no_inner_iterations)?;
        }
        write_back(graph.arena(), &layout, agents);
    }
    let (graph, _) = build_graph(agents, obstacles, via_points, cfg);
    Ok(graph.cost_breakdown())
}

/// Copy solved vertex values back into the agent bands.
fn write_back(arena: &VertexArena, layout: &GraphLayout, agents: &mut AgentSet) {
    let copy_band = |band: &BandLayout, teb: &mut TimedElasticBand| {
        for (i, &id) in band.poses.iter().enumerate() {
            teb.set_pose(i, arena.pose(id));
        }
        for (i, &id) in band.dts.iter().enumerate() {
            teb.set_time_diff(i, arena.time_diff(id));
        }
    };
    copy_band(&layout.robot, &mut agents.robot.teb);
    for (id, band) in &layout.humans {
        if let Some(agent) = agents.humans.get_mut(id) {
            copy_band(band, &mut agent.teb);
        }
    }
}

/// Add one band's vertices to the arena.
fn add_band(arena: &mut VertexArena, teb: &TimedElasticBand) -> BandLayout {
    let poses = (0..teb.len())
        .map(|i| arena.add_pose(teb.pose(i), teb.is_fixed(i)))
        .collect();
    let dts = (0..teb.len().saturating_sub(1))
        .map(|i| arena.add_time_diff(teb.time_diff(i), false))
        .collect();
    BandLayout { poses, dts }
}

/// Velocity, acceleration, and time weights of one band.
struct BandLimits {
    max_vel_x: f32,
    max_vel_x_backwards: f32,
    max_vel_theta: f32,
    acc_lim_x: f32,
    acc_lim_theta: f32,
    weight_vel_x: f32,
    weight_vel_theta: f32,
    weight_acc_x: f32,
    weight_acc_theta: f32,
    weight_time: f32,
}

fn add_band_edges<'a>(
    graph: &mut GraphOptimizer<'a>,
    band: &BandLayout,
    teb: &TimedElasticBand,
    agent: &Agent,
    limits: &BandLimits,
    obstacles: &'a [Obstacle],
    cfg: &TebConfig,
) {
    let n = band.poses.len();
    if n < 2 {
        return;
    }
    let eps = cfg.optim.penalty_epsilon;

    for i in 0..n - 1 {
        let (p1, p2, dt) = (band.poses[i], band.poses[i + 1], band.dts[i]);
        graph.add_edge(Box::new(VelocityEdge::new(
            p1,
            p2,
            dt,
            limits.max_vel_x,
            limits.max_vel_x_backwards,
            limits.max_vel_theta,
            eps,
            limits.weight_vel_x,
            limits.weight_vel_theta,
        )));
        graph.add_edge(Box::new(TimeOptimalEdge::new(
            dt,
            limits.weight_time,
            cfg.optim.time_penalty_epsilon,
            cfg.optim.cap_optimaltime_penalty,
        )));
    }

    graph.add_edge(Box::new(BoundaryAccelerationEdge::start(
        band.poses[0],
        band.poses[1],
        band.dts[0],
        agent.start_velocity,
        limits.acc_lim_x,
        limits.acc_lim_theta,
        eps,
        limits.weight_acc_x,
        limits.weight_acc_theta,
    )));
    for i in 0..n.saturating_sub(2) {
        graph.add_edge(Box::new(AccelerationEdge::new(
            band.poses[i],
            band.poses[i + 1],
            band.poses[i + 2],
            band.dts[i],
            band.dts[i + 1],
            limits.acc_lim_x,
            limits.acc_lim_theta,
            eps,
            limits.weight_acc_x,
            limits.weight_acc_theta,
        )));
    }
    if let Some(goal_vel) = agent.goal_velocity {
        graph.add_edge(Box::new(BoundaryAccelerationEdge::goal(
            band.poses[n - 2],
            band.poses[n - 1],
            band.dts[n - 2],
            goal_vel,
            limits.acc_lim_x,
            limits.acc_lim_theta,
            eps,
            limits.weight_acc_x,
            limits.weight_acc_theta,
        )));
    }

    add_obstacle_edges(graph, band, teb, obstacles, cfg);
}

/// Attach obstacle edges around the pose nearest to each obstacle.
fn add_obstacle_edges<'a>(
    graph: &mut GraphOptimizer<'a>,
    band: &BandLayout,
    teb: &TimedElasticBand,
    obstacles: &'a [Obstacle],
    cfg: &TebConfig,
) {
    let n = band.poses.len();
    if n < 3 {
        return;
    }
    let window = cfg.obstacles.obstacle_poses_affected.max(1) / 2;
    for obs in obstacles {
        let center = obs.centroid();
        let mut nearest = 0;
        let mut best = f32::INFINITY;
        for i in 0..n {
            let d = teb.pose(i).position().distance(center);
            if d < best {
                best = d;
                nearest = i;
            }
        }
        let lo = nearest.saturating_sub(window).max(1);
        let hi = (nearest + window + 1).min(n - 1);
        let weight = cfg.obstacles.obstacle_cost_mult
            * if obs.is_dynamic() {
                cfg.optim.weight_dynamic_obstacle
            } else {
                cfg.optim.weight_obstacle
            };
        for i in lo..hi {
            graph.add_edge(Box::new(ObstacleEdge::new(
                band.poses[i],
                obs,
                teb.time_at(i),
                cfg.obstacles.min_obstacle_dist,
                cfg.optim.penalty_epsilon,
                cfg.obstacles.use_nonlinear_obstacle_penalty,
                weight,
            )));
        }
    }
}

/// Pull each via point's nearest interior pose toward it.
fn add_via_edges(
    graph: &mut GraphOptimizer<'_>,
    band: &BandLayout,
    teb: &TimedElasticBand,
    via_points: &[Point2D],
    weight: f32,
) {
    let n = band.poses.len();
    if n < 3 || weight <= 0.0 {
        return;
    }
    for vp in via_points {
        let mut nearest = 1;
        let mut best = f32::INFINITY;
        for i in 1..n - 1 {
            let d = teb.pose(i).position().distance(*vp);
            if d < best {
                best = d;
                nearest = i;
            }
        }
        graph.add_edge(Box::new(ViaPointEdge::new(band.poses[nearest], *vp, weight)));
    }
}

/// Build the full candidate graph: per-band edges, via points, and
/// cross-agent interaction edges at time-matched samples.
fn build_graph<'a>(
    agents: &AgentSet,
    obstacles: &'a [Obstacle],
    via_points: &[Point2D],
    cfg: &TebConfig,
) -> (GraphOptimizer<'a>, GraphLayout) {
    let mut arena = VertexArena::new();
    let robot_band = add_band(&mut arena, &agents.robot.teb);
    let human_bands: Vec<(HumanId, BandLayout)> = agents
        .humans
        .iter()
        .map(|(&id, agent)| (id, add_band(&mut arena, &agent.teb)))
        .collect();
    let layout = GraphLayout {
        robot: robot_band,
        humans: human_bands,
    };

    let mut graph = GraphOptimizer::new(arena);
    let eps = cfg.optim.penalty_epsilon;

    // Robot kinematics
    let n = layout.robot.poses.len();
    for i in 0..n.saturating_sub(1) {
        let (p1, p2) = (layout.robot.poses[i], layout.robot.poses[i + 1]);
        if cfg.robot.min_turning_radius > 0.0 {
            graph.add_edge(Box::new(CarlikeKinematicsEdge::new(
                p1,
                p2,
                cfg.robot.min_turning_radius,
                cfg.optim.weight_kinematics_nh,
                cfg.optim.weight_kinematics_turning_radius,
            )));
        } else {
            graph.add_edge(Box::new(DiffDriveKinematicsEdge::new(
                p1,
                p2,
                cfg.optim.weight_kinematics_nh,
                cfg.optim.weight_kinematics_forward_drive,
            )));
        }
    }
    let robot_limits = BandLimits {
        max_vel_x: cfg.robot.max_vel_x,
        max_vel_x_backwards: cfg.robot.max_vel_x_backwards,
        max_vel_theta: cfg.robot.max_vel_theta,
        acc_lim_x: cfg.robot.acc_lim_x,
        acc_lim_theta: cfg.robot.acc_lim_theta,
        weight_vel_x: cfg.optim.weight_max_vel_x,
        weight_vel_theta: cfg.optim.weight_max_vel_theta,
        weight_acc_x: cfg.optim.weight_acc_lim_x,
        weight_acc_theta: cfg.optim.weight_acc_lim_theta,
        weight_time: cfg.optim.weight_optimaltime,
    };
    add_band_edges(
        &mut graph,
        &layout.robot,
        &agents.robot.teb,
        &agents.robot,
        &robot_limits,
        obstacles,
        cfg,
    );

    add_via_edges(
        &mut graph,
        &layout.robot,
        &agents.robot.teb,
        via_points,
        cfg.optim.weight_viapoint,
    );

    // Human bands
    let human_limits = BandLimits {
        max_vel_x: cfg.human.max_vel_x,
        max_vel_x_backwards: cfg.human.max_vel_x_backwards,
        max_vel_theta: cfg.human.max_vel_theta,
        acc_lim_x: cfg.human.acc_lim_x,
        acc_lim_theta: cfg.human.acc_lim_theta,
        weight_vel_x: cfg.optim.weight_max_human_vel_x,
        weight_vel_theta: cfg.optim.weight_max_human_vel_theta,
        weight_acc_x: cfg.optim.weight_human_acc_lim_x,
        weight_acc_theta: cfg.optim.weight_human_acc_lim_theta,
        weight_time: cfg.optim.weight_human_optimaltime,
    };
    for (id, band) in &layout.humans {
        let agent = &agents.humans[id];
        for i in 0..band.poses.len().saturating_sub(1) {
            graph.add_edge(Box::new(DiffDriveKinematicsEdge::new(
                band.poses[i],
                band.poses[i + 1],
                cfg.optim.weight_kinematics_nh,
                cfg.optim.weight_kinematics_forward_drive,
            )));
            if cfg.optim.weight_nominal_human_vel_x > 0.0 {
                graph.add_edge(Box::new(NominalSpeedEdge::new(
                    band.poses[i],
                    band.poses[i + 1],
                    band.dts[i],
                    cfg.human.nominal_vel_x,
                    cfg.optim.weight_nominal_human_vel_x,
                )));
            }
        }
        add_band_edges(&mut graph, band, &agent.teb, agent, &human_limits, obstacles, cfg);
        add_via_edges(
            &mut graph,
            band,
            &agent.teb,
            &agent.via_points,
            cfg.optim.weight_human_viapoint,
        );
    }

    // Cross-agent interaction edges at time-matched samples
    let robot_teb = &agents.robot.teb;
    let contact = cfg.robot.radius + cfg.human.radius;
    for (id, band) in &layout.humans {
        let human_teb = &agents.humans[id].teb;
        if human_teb.is_empty() {
            continue;
        }
        for i in 1..n {
            let j = nearest_time_index(human_teb, robot_teb.time_at(i));
            let (rp, hp) = (layout.robot.poses[i], band.poses[j]);
            if cfg.optim.use_human_robot_safety_c {
                graph.add_edge(Box::new(AgentSafetyEdge::new(
                    rp,
                    hp,
                    contact,
                    cfg.human.min_human_robot_dist,
                    eps,
                    cfg.optim.weight_human_robot_safety,
                )));
            }
            let robot_vel = world_velocity(robot_teb, i);
            let human_vel = world_velocity(human_teb, j);
            if cfg.optim.use_human_robot_ttc_c {
                let alpha = cfg
                    .optim
                    .scale_human_robot_ttc_c
                    .then_some(cfg.optim.human_robot_ttc_scale_alpha);
                graph.add_edge(Box::new(TtcEdge::new(
                    rp,
                    hp,
                    robot_vel,
                    human_vel,
                    contact,
                    cfg.human.ttc_threshold,
                    alpha,
                    cfg.optim.weight_human_robot_ttc,
                )));
            }
            if cfg.optim.use_human_robot_ttcplus_c {
                let alpha = cfg
                    .optim
                    .scale_human_robot_ttcplus_c
                    .then_some(cfg.optim.human_robot_ttcplus_scale_alpha);
                graph.add_edge(Box::new(TtcEdge::with_horizon(
                    rp,
                    hp,
                    robot_vel,
                    human_vel,
                    contact,
                    cfg.human.ttcplus_threshold,
                    cfg.human.ttcplus_timer,
                    alpha,
                    cfg.optim.weight_human_robot_ttcplus,
                )));
            }
            if cfg.optim.use_human_robot_ttclosest_c {
                graph.add_edge(Box::new(ClosestApproachEdge::new(
                    rp,
                    hp,
                    robot_vel,
                    human_vel,
                    contact,
                    cfg.human.ttclosest_threshold,
                    eps,
                    cfg.optim.weight_human_robot_ttclosest,
                )));
            }
            if cfg.optim.use_human_robot_dir_c && i + 1 < n {
                graph.add_edge(Box::new(DirectionEdge::new(
                    layout.robot.poses[i],
                    layout.robot.poses[i + 1],
                    hp,
                    cfg.human.dir_cost_threshold,
                    cfg.optim.weight_human_robot_dir,
                )));
            }
            if cfg.optim.use_human_robot_visi_c {
                graph.add_edge(Box::new(VisibilityEdge::new(
                    rp,
                    hp,
                    cfg.human.fov,
                    cfg.human.visibility_cost_threshold,
                    cfg.optim.weight_human_robot_visibility,
                )));
            }
        }
    }

    // Human-human separation
    if cfg.optim.use_human_human_safety_c {
        for (a_idx, (id_a, band_a)) in layout.humans.iter().enumerate() {
            for (id_b, band_b) in layout.humans.iter().skip(a_idx + 1) {
                let teb_a = &agents.humans[id_a].teb;
                let teb_b = &agents.humans[id_b].teb;
                for i in 1..band_a.poses.len() {
                    let j = nearest_time_index(teb_b, teb_a.time_at(i));
                    graph.add_edge(Box::new(AgentSafetyEdge::new(
                        band_a.poses[i],
                        band_b.poses[j],
                        2.0 * cfg.human.radius,
                        cfg.human.min_human_human_dist,
                        eps,
                        cfg.optim.weight_human_human_safety,
                    )));
                }
            }
        }
    }

    (graph, layout)
}


#[cfg(test)]
impl TebPlanner {
    /// Install a band directly, bypassing the planning pipeline.
    fn adopt_test_band(&mut self, teb: TimedElasticBand) {
        self.agents.robot.teb = teb;
        self.solved = true;
    }
}
