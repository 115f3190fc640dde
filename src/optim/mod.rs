//! Graph optimization: vertex arena, cost edge trait, sparse solver.
//!
//! The optimization state is an arena of pose and time-diff vertices;
//! edges reference vertices by index (never by pointer), so candidate
//! graphs can be moved freely across worker threads and resized without
//! pointer surgery. Edges are rebuilt from scratch for every optimization
//! call and never persisted.

mod linear;
mod solver;

pub use solver::{CostBreakdown, GraphOptimizer, SolveError, SolveReport};

use crate::core::Pose2D;

/// Maximum residual dimension of any edge type.
pub const MAX_EDGE_DIM: usize = 3;

/// Handle to a vertex in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexId {
    /// An SE(2) pose vertex (3 degrees of freedom).
    Pose(usize),
    /// A time-gap vertex (1 degree of freedom, kept strictly positive).
    TimeDiff(usize),
}

#[derive(Clone, Debug)]
struct PoseVertex {
    value: Pose2D,
    fixed: bool,
}

#[derive(Clone, Debug)]
struct TimeDiffVertex {
    value: f32,
    fixed: bool,
}

/// Arena of optimization variables for one candidate graph.
#[derive(Clone, Debug, Default)]
pub struct VertexArena {
    poses: Vec<PoseVertex>,
    dts: Vec<TimeDiffVertex>,
}

impl VertexArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pose vertex; `fixed` pins it (excluded from the solve).
    pub fn add_pose(&mut self, value: Pose2D, fixed: bool) -> VertexId {
        self.poses.push(PoseVertex { value, fixed });
        VertexId::Pose(self.poses.len() - 1)
    }

    /// Add a time-diff vertex.
    pub fn add_time_diff(&mut self, value: f32, fixed: bool) -> VertexId {
        self.dts.push(TimeDiffVertex {
            value: value.max(f32::EPSILON),
            fixed,
        });
        VertexId::TimeDiff(self.dts.len() - 1)
    }

    /// Pose value of a pose vertex. Panics on a time-diff handle.
    #[inline]
    pub fn pose(&self, id: VertexId) -> Pose2D {
        match id {
            VertexId::Pose(i) => self.poses[i].value,
            VertexId::TimeDiff(_) => panic!("expected pose vertex"),
        }
    }

    /// Value of a time-diff vertex. Panics on a pose handle.
    #[inline]
    pub fn time_diff(&self, id: VertexId) -> f32 {
        match id {
            VertexId::TimeDiff(i) => self.dts[i].value,
            VertexId::Pose(_) => panic!("expected time-diff vertex"),
        }
    }

    /// Degrees of freedom of a vertex.
    #[inline]
    pub fn dof(&self, id: VertexId) -> usize {
        match id {
            VertexId::Pose(_) => 3,
            VertexId::TimeDiff(_) => 1,
        }
    }

    /// Whether a vertex is pinned.
    #[inline]
    pub fn is_fixed(&self, id: VertexId) -> bool {
        match id {
            VertexId::Pose(i) => self.poses[i].fixed,
            VertexId::TimeDiff(i) => self.dts[i].fixed,
        }
    }

    /// Number of pose vertices.
    pub fn pose_count(&self) -> usize {
        self.poses.len()
    }

    /// Number of time-diff vertices.
    pub fn time_diff_count(&self) -> usize {
        self.dts.len()
    }

    /// Perturb one degree of freedom; used by the finite-difference
    /// Jacobian. Heading is not re-normalized here (the perturbation is
    /// infinitesimal).
    pub(crate) fn nudge(&mut self, id: VertexId, dof: usize, delta: f32) {
        match id {
            VertexId::Pose(i) => match dof {
                0 => self.poses[i].value.x += delta,
                1 => self.poses[i].value.y += delta,
                _ => self.poses[i].value.theta += delta,
            },
            VertexId::TimeDiff(i) => self.dts[i].value += delta,
        }
    }

    /// Apply a solver update to one vertex.
    pub(crate) fn apply_update(&mut self, id: VertexId, delta: &[f32]) {
        match id {
            VertexId::Pose(i) => {
                let p = &mut self.poses[i].value;
                *p = Pose2D::new(p.x + delta[0], p.y + delta[1], p.theta + delta[2]);
            }
            VertexId::TimeDiff(i) => {
                let dt = &mut self.dts[i].value;
                // Time gaps must stay strictly positive
                *dt = (*dt + delta[0]).max(1e-4);
            }
        }
    }
}

/// Cost families reported in the per-candidate cost breakdown and scaled
/// independently during candidate selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CostFamily {
    /// Nonholonomic / drive-direction / turning-radius terms.
    Kinematics,
    /// Velocity limit terms.
    Velocity,
    /// Acceleration limit terms.
    Acceleration,
    /// Transition time terms.
    Time,
    /// Static and dynamic obstacle separation terms.
    Obstacle,
    /// Via-point attraction terms.
    ViaPoint,
    /// Human-robot and human-human minimum distance terms.
    HumanSafety,
    /// Time-to-collision terms (all variants).
    HumanTtc,
    /// Relative-direction terms.
    HumanDirection,
    /// Visibility terms.
    HumanVisibility,
}

/// A polymorphic cost term over 1-5 vertices.
///
/// The residual is driven toward zero by the solver; weights act as
/// per-row information values. Implementations may provide an analytic
/// Jacobian block; the solver falls back to central differences.
pub trait CostEdge: Send + Sync {
    /// Cost family for reporting and selection scaling.
    fn family(&self) -> CostFamily;

    /// Vertices this edge connects.
    fn vertices(&self) -> &[VertexId];

    /// Residual dimension (<= [`MAX_EDGE_DIM`]).
    fn dimension(&self) -> usize;

    /// Weight of residual row `row`.
    fn weight(&self, row: usize) -> f32;

    /// Compute the residual into `residual[..self.dimension()]`.
    fn compute(&self, arena: &VertexArena, residual: &mut [f32]);

    /// Analytic Jacobian of the residual with respect to vertex `slot`,
    /// row-major `dimension() x dof`. Return `false` to request the
    /// finite-difference fallback.
    fn jacobian(&self, _arena: &VertexArena, _slot: usize, _out: &mut [f32]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_handles() {
        let mut arena = VertexArena::new();
        let p = arena.add_pose(Pose2D::new(1.0, 2.0, 0.5), false);
        let t = arena.add_time_diff(0.3, false);

        assert_eq!(arena.pose(p).x, 1.0);
        assert_eq!(arena.time_diff(t), 0.3);
        assert_eq!(arena.dof(p), 3);
        assert_eq!(arena.dof(t), 1);
        assert!(!arena.is_fixed(p));
    }

    #[test]
    fn test_apply_update_keeps_dt_positive() {
        let mut arena = VertexArena::new();
        let t = arena.add_time_diff(0.1, false);
        arena.apply_update(t, &[-5.0]);
        assert!(arena.time_diff(t) > 0.0);
    }

    #[test]
    fn test_nudge_pose() {
        let mut arena = VertexArena::new();
        let p = arena.add_pose(Pose2D::identity(), false);
        arena.nudge(p, 1, 0.5);
        assert_eq!(arena.pose(p).y, 0.5);
    }
}
