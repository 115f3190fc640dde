//! Agent bookkeeping for the multi-agent coordinator.
//!
//! The robot and every observed human each carry their own elastic band.
//! Human bands persist across cycles under a stable id so they hot-start
//! exactly like the robot's; ids absent from the current input are
//! dropped together with their interaction edges.

use std::collections::BTreeMap;

use log::{debug, trace};

use crate::config::TebConfig;
use crate::core::{Point2D, Pose2D, Velocity};
use crate::teb::TimedElasticBand;

/// Stable identifier assigned to a tracked human by the perception
/// layer.
pub type HumanId = u64;

/// Per-human input for one planning cycle.
#[derive(Clone, Debug, Default)]
pub struct AgentPlan {
    /// Predicted path, at least start and goal.
    pub plan: Vec<Pose2D>,
    /// Measured velocity at the start of the prediction.
    pub start_velocity: Option<Velocity>,
    /// Expected velocity at the end of the prediction.
    pub goal_velocity: Option<Velocity>,
}

/// Human-id keyed plan input. Ordered map so candidate graphs enumerate
/// humans in a deterministic order.
pub type HumanPlanMap = BTreeMap<HumanId, AgentPlan>;

/// One agent's trajectory plus its boundary conditions.
#[derive(Clone, Debug, Default)]
pub struct Agent {
    /// The elastic band being optimized.
    pub teb: TimedElasticBand,
    /// Velocity at the first band pose.
    pub start_velocity: Velocity,
    /// Velocity required at the goal; `None` leaves it free.
    pub goal_velocity: Option<Velocity>,
    /// Waypoints the band is pulled toward. Empty for the robot, whose
    /// via points live on the planner; filled from the interior of the
    /// predicted plan for humans.
    pub via_points: Vec<Point2D>,
}

/// The robot and all currently tracked humans.
#[derive(Clone, Debug, Default)]
pub struct AgentSet {
    /// The robot's band and boundary conditions.
    pub robot: Agent,
    /// Tracked human bands, keyed by perception id.
    pub humans: BTreeMap<HumanId, Agent>,
}

impl AgentSet {
    /// Hot-start or reinitialize the robot band from a reference plan.
    ///
    /// The band is rebuilt from scratch when empty or when the goal has
    /// jumped further than the force-reinit distance; otherwise poses
    /// already passed are pruned and the goal is updated in place,
    /// preserving the optimized interior.
    pub fn update_robot(&mut self, plan: &[Pose2D], start_velocity: Velocity, cfg: &TebConfig) {
        self.robot.start_velocity = start_velocity;
        let (Some(&start), Some(&goal)) = (plan.first(), plan.last()) else {
            return;
        };
        let reinit = match self.robot.teb.goal() {
            Some(prev_goal) => {
                prev_goal.distance(goal) > cfg.trajectory.force_reinit_new_goal_dist
            }
            None => true,
        };
        if reinit {
            debug!("initializing robot band from plan ({} poses)", plan.len());
            if plan.len() == 2 {
                self.robot.teb.init_between(
                    start,
                    goal,
                    cfg.trajectory.dt_ref,
                    cfg.trajectory.min_samples,
                    cfg.robot.max_vel_x,
                    cfg.trajectory.allow_init_with_backwards_motion,
                );
            } else {
                self.robot.teb.init_from_plan(
                    plan,
                    cfg.trajectory.dt_ref,
                    cfg.trajectory.min_samples,
                    cfg.trajectory.init_skip_dist,
                );
            }
        } else {
            trace!("hot-starting robot band");
            self.robot.teb.prune_passed(start, cfg.trajectory.min_samples);
            self.robot.teb.set_goal(goal);
        }
    }

    /// Reconcile tracked humans with this cycle's input mapping.
    pub fn sync_humans(&mut self, plans: &HumanPlanMap, cfg: &TebConfig) {
        self.humans.retain(|id, _| {
            let keep = plans.contains_key(id);
            if !keep {
                debug!("dropping stale human {id}");
            }
            keep
        });

        for (&id, input) in plans {
            let (Some(&start), Some(&goal)) = (input.plan.first(), input.plan.last()) else {
                continue;
            };
            let agent = self.humans.entry(id).or_default();
            agent.start_velocity = input.start_velocity.unwrap_or(Velocity::ZERO);
            agent.goal_velocity = input.goal_velocity;
            agent.via_points = input
                .plan
                .get(1..input.plan.len().saturating_sub(1))
                .unwrap_or(&[])
                .iter()
                .map(|p| p.position())
                .collect();
            let reinit = match agent.teb.goal() {
                Some(prev_goal) => {
                    prev_goal.distance(goal) > cfg.trajectory.force_reinit_new_goal_dist
                }
                None => true,
            };
            if reinit {
                debug!("initializing band for human {id}");
                if input.plan.len() == 2 {
                    agent.teb.init_between(
                        start,
                        goal,
                        cfg.trajectory.dt_ref,
                        cfg.trajectory.human_min_samples,
                        cfg.human.max_vel_x,
                        false,
                    );
                } else {
                    agent.teb.init_from_plan(
                        &input.plan,
                        cfg.trajectory.dt_ref,
                        cfg.trajectory.human_min_samples,
                        cfg.trajectory.init_skip_dist,
                    );
                }
            } else {
                agent.teb.prune_passed(start, cfg.trajectory.human_min_samples);
                agent.teb.set_goal(goal);
            }
        }
    }

    /// Drop all trajectories, forcing a cold start next cycle.
    pub fn clear(&mut self) {
        self.robot.teb.clear();
        self.robot.start_velocity = Velocity::ZERO;
        self.robot.goal_velocity = None;
        self.humans.clear();
    }
}
