//! Homotopy-class exploration and candidate selection.
//!
//! Each planning cycle keeps a pool of candidate trajectories, one per
//! topologically distinct way around the obstacles. Candidates are
//! seeded from the previous best (hot start) and the reference plan,
//! expanded by either keypoint or roadmap exploration, deduplicated by
//! H-signature, optimized independently, and finally selected under a
//! hysteresis rule that makes class switches deliberate.

mod h_signature;
mod roadmap;

pub use h_signature::HSignature;
pub use roadmap::RoadmapSampler;

use crossbeam_channel::unbounded;
use log::debug;

use crate::core::{Obstacle, Point2D};
use crate::planner::AgentSet;

/// One homotopy-class candidate: a full set of agent trajectories plus
/// its topological signature and post-optimization selection cost.
pub struct Candidate {
    /// All agent bands for this candidate.
    pub agents: AgentSet,
    /// Signature of the robot band's spatial path.
    pub signature: HSignature,
    /// Selection cost, `INFINITY` until the candidate has been solved.
    pub cost: f32,
    /// Candidate carried over from the previous cycle's best.
    pub hot_started: bool,
    /// Candidate sharing the reference plan's homotopy class.
    pub follows_reference: bool,
}

impl Candidate {
    /// A candidate starts unsolved, with infinite cost.
    pub fn new(agents: AgentSet, signature: HSignature, hot_started: bool) -> Self {
        Self {
            agents,
            signature,
            cost: f32::INFINITY,
            hot_started,
            follows_reference: false,
        }
    }

    /// Whether optimization produced a finite selection cost.
    pub fn solved(&self) -> bool {
        self.cost.is_finite()
    }
}

/// Keypoint exploration: one left and one right detour around each
/// relevant obstacle.
///
/// An obstacle is relevant when its centroid projects onto the
/// start-goal chord and sits within half the corridor width of it.
/// Dynamic obstacles must additionally be heading toward the goal side,
/// gated by `heading_threshold` on the normalized scalar product; an
/// obstacle walking away opens no new corridor worth exploring.
pub fn keypoint_exploration(
    start: Point2D,
    goal: Point2D,
    obstacles: &[Obstacle],
    area_width: f32,
    offset: f32,
    heading_threshold: f32,
) -> Vec<Vec<Point2D>> {
    let chord = goal - start;
    let length = chord.norm();
    if length < 1e-6 {
        return Vec::new();
    }
    let dir = chord.scaled(1.0 / length);
    let normal = Point2D::new(-dir.y, dir.x);

    let mut paths = Vec::new();
    for obs in obstacles {
        let center = obs.centroid();
        let rel = center - start;
        let along = rel.dot(dir);
        if along <= 0.0 || along >= length {
            continue;
        }
        if rel.dot(normal).abs() > 0.5 * area_width {
            continue;
        }
        if let Some(vel) = obs.velocity {
            let speed = vel.norm();
            if speed > 1e-3 {
                let to_goal = (goal - center).normalized();
                if vel.scaled(1.0 / speed).dot(to_goal) < heading_threshold {
                    continue;
                }
            }
        }
        for side in [1.0f32, -1.0] {
            let keypoint = center + normal.scaled(side * offset);
            paths.push(vec![start, keypoint, goal]);
        }
    }
    paths
}

/// Drop candidates that share a homotopy class, preferring hot-started
/// continuity and then lower preliminary cost, and cap the pool size.
pub fn dedup_candidates(candidates: &mut Vec<Candidate>, threshold: f32, max_classes: usize) {
    let mut kept: Vec<Candidate> = Vec::new();
    for cand in candidates.drain(..) {
        match kept
            .iter_mut()
            .find(|k| k.signature.equivalent(&cand.signature, threshold))
        {
            Some(existing) => {
                let follows = existing.follows_reference || cand.follows_reference;
                let replace = if existing.hot_started != cand.hot_started {
                    cand.hot_started
                } else {
                    cand.cost < existing.cost
                };
                if replace {
                    *existing = cand;
                }
                existing.follows_reference = follows;
            }
            None => kept.push(cand),
        }
    }
    if kept.len() > max_classes {
        // Hot-started candidates survive the cap first, then cheap ones
        kept.sort_by(|a, b| {
            b.hot_started
                .cmp(&a.hot_started)
                .then(a.cost.partial_cmp(&b.cost).unwrap_or(std::cmp::Ordering::Equal))
        });
        kept.truncate(max_classes);
    }
    debug!("candidate pool deduplicated to {} classes", kept.len());
    *candidates = kept;
}

/// Run `solve` once per candidate, spreading candidates over a scoped
/// worker pool. Each worker owns its candidate exclusively for the
/// duration of the call; `solve` only reads shared state.
pub fn optimize_candidates<F>(candidates: &mut [Candidate], max_threads: usize, solve: F)
where
    F: Fn(&mut Candidate) + Sync,
{
    let threads = if max_threads == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        max_threads
    };
    let workers = threads.min(candidates.len());
    if workers <= 1 {
        for cand in candidates.iter_mut() {
            solve(cand);
        }
        return;
    }

    let (tx, rx) = unbounded::<&mut Candidate>();
    for cand in candidates.iter_mut() {
        // Receivers outlive the loop, send cannot fail here
        let _ = tx.send(cand);
    }
    drop(tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let solve = &solve;
            scope.spawn(move || {
                for cand in rx.iter() {
                    solve(cand);
                }
            });
        }
    });
}

/// Pick the winning candidate index.
///
/// The previous cycle's class is kept unless some other candidate beats
/// the previous cost scaled by `hysteresis` (a factor below one), so a
/// marginal improvement never flips the robot between corridors.
pub fn select_candidate(
    candidates: &[Candidate],
    prev_signature: Option<&HSignature>,
    prev_cost: Option<f32>,
    hysteresis: f32,
    threshold: f32,
) -> Option<usize> {
    let best = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.solved())
        .min_by(|(_, a), (_, b)| {
            a.cost
                .partial_cmp(&b.cost)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)?;

    let prev_idx = prev_signature.and_then(|sig| {
        candidates
            .iter()
            .position(|c| c.solved() && c.signature.equivalent(sig, threshold))
    });

    match prev_idx {
        Some(prev) if prev != best => {
            let reference = prev_cost.unwrap_or(candidates[prev].cost);
            if candidates[best].cost < reference * hysteresis {
                debug!(
                    "switching homotopy class: {:.3} beats {:.3} with hysteresis {:.2}",
                    candidates[best].cost, reference, hysteresis
                );
                Some(best)
            } else {
                Some(prev)
            }
        }
        _ => Some(best),
    }
}
