//! Levenberg-Marquardt solve over the block-sparse cost graph.
//!
//! Each iteration assembles the damped normal equations from per-edge
//! residual/Jacobian blocks and solves for a state update. Damping adapts
//! to step quality: accepted steps decrease lambda, rejected ones (cost
//! increased) are reverted and increase it. Given identical graph state
//! and edge set the solve is fully deterministic.

use thiserror::Error;

use super::linear::cholesky_solve;
use super::{CostEdge, CostFamily, VertexArena, VertexId, MAX_EDGE_DIM};

/// Finite-difference step for numeric Jacobians.
const DIFF_STEP: f32 = 1e-4;

/// Failure of an individual candidate solve. Not fatal to the planning
/// call; the candidate is discarded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    /// The normal-equations matrix stayed singular even under maximum
    /// damping.
    #[error("normal equations are singular or ill-conditioned")]
    IllConditioned,
}

/// Outcome of a graph solve.
#[derive(Clone, Copy, Debug)]
pub struct SolveReport {
    /// Iterations actually performed.
    pub iterations: usize,
    /// Weighted squared cost before the first iteration.
    pub initial_cost: f32,
    /// Weighted squared cost after the last accepted step.
    pub final_cost: f32,
    /// True if the update norm fell below the convergence threshold.
    pub converged: bool,
}

/// Per-family cost totals of one graph, used for candidate ranking and
/// the caller-visible cost report.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CostBreakdown {
    /// Kinematics terms.
    pub kinematics: f32,
    /// Velocity limit terms.
    pub velocity: f32,
    /// Acceleration limit terms.
    pub acceleration: f32,
    /// Transition time terms.
    pub time: f32,
    /// Obstacle separation terms.
    pub obstacle: f32,
    /// Via-point terms.
    pub via_point: f32,
    /// Agent-agent minimum distance terms.
    pub human_safety: f32,
    /// Time-to-collision terms.
    pub human_ttc: f32,
    /// Relative-direction terms.
    pub human_direction: f32,
    /// Visibility terms.
    pub human_visibility: f32,
}

impl CostBreakdown {
    fn add(&mut self, family: CostFamily, cost: f32) {
        match family {
            CostFamily::Kinematics => self.kinematics += cost,
            CostFamily::Velocity => self.velocity += cost,
            CostFamily::Acceleration => self.acceleration += cost,
            CostFamily::Time => self.time += cost,
            CostFamily::Obstacle => self.obstacle += cost,
            CostFamily::ViaPoint => self.via_point += cost,
            CostFamily::HumanSafety => self.human_safety += cost,
            CostFamily::HumanTtc => self.human_ttc += cost,
            CostFamily::HumanDirection => self.human_direction += cost,
            CostFamily::HumanVisibility => self.human_visibility += cost,
        }
    }

    /// Plain sum of all families.
    pub fn total(&self) -> f32 {
        self.kinematics
            + self.velocity
            + self.acceleration
            + self.time
            + self.obstacle
            + self.via_point
            + self.human_safety
            + self.human_ttc
            + self.human_direction
            + self.human_visibility
    }

    /// Sum with obstacle and via-point families scaled, used only for
    /// candidate selection.
    pub fn selection_total(&self, obstacle_scale: f32, viapoint_scale: f32) -> f32 {
        self.total() - self.obstacle - self.via_point
            + self.obstacle * obstacle_scale
            + self.via_point * viapoint_scale
    }
}

/// One candidate's optimization graph: the vertex arena plus its edges.
pub struct GraphOptimizer<'a> {
    arena: VertexArena,
    edges: Vec<Box<dyn CostEdge + 'a>>,
}

impl<'a> GraphOptimizer<'a> {
    /// Create an optimizer over a pre-populated arena.
    pub fn new(arena: VertexArena) -> Self {
        Self {
            arena,
            edges: Vec::new(),
        }
    }

    /// The vertex arena.
    pub fn arena(&self) -> &VertexArena {
        &self.arena
    }

    /// Add a cost edge.
    pub fn add_edge(&mut self, edge: Box<dyn CostEdge + 'a>) {
        self.edges.push(edge);
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Current weighted squared cost of the whole graph.
    pub fn total_cost(&self) -> f32 {
        graph_cost(&self.arena, &self.edges)
    }

    /// Current cost split by family.
    pub fn cost_breakdown(&self) -> CostBreakdown {
        let mut breakdown = CostBreakdown::default();
        let mut residual = [0.0f32; MAX_EDGE_DIM];
        for edge in &self.edges {
            let d = edge.dimension();
            edge.compute(&self.arena, &mut residual[..d]);
            let mut cost = 0.0;
            for (row, &r) in residual[..d].iter().enumerate() {
                cost += edge.weight(row) * r * r;
            }
            breakdown.add(edge.family(), cost);
        }
        breakdown
    }

    /// Run up to `iterations` damped Gauss-Newton steps.
    pub fn optimize(&mut self, iterations: usize) -> Result<SolveReport, SolveError> {
        let columns = assign_columns(&self.arena);
        let n = columns.total;
        let initial_cost = self.total_cost();
        let mut report = SolveReport {
            iterations: 0,
            initial_cost,
            final_cost: initial_cost,
            converged: true,
        };
        if n == 0 || self.edges.is_empty() {
            return Ok(report);
        }

        let mut cost = initial_cost;
        let mut lambda = 1e-3f32;
        const LAMBDA_FACTOR: f32 = 10.0;
        const MIN_LAMBDA: f32 = 1e-7;
        const MAX_LAMBDA: f32 = 1e7;

        let mut h = vec![0.0f32; n * n];
        let mut b = vec![0.0f32; n];
        let mut damped = vec![0.0f32; n * n];
        let mut dx = vec![0.0f32; n];

        report.converged = false;
        for iter in 0..iterations {
            report.iterations = iter + 1;
            h.iter_mut().for_each(|v| *v = 0.0);
            b.iter_mut().for_each(|v| *v = 0.0);
            assemble_normal_equations(&mut self.arena, &self.edges, &columns, &mut h, &mut b);

            // Solve with increasing damping until the factorization succeeds
            let mut solved = false;
            while lambda <= MAX_LAMBDA {
                damped.copy_from_slice(&h);
                for i in 0..n {
                    // Marquardt scaling plus a small absolute floor so
                    // momentarily unconstrained dofs stay factorizable
                    let d = h[i * n + i].max(1e-8);
                    damped[i * n + i] += lambda * d + 1e-6;
                }
                dx.copy_from_slice(&b);
                if cholesky_solve(&mut damped, &mut dx, n) {
                    solved = true;
                    break;
                }
                lambda *= LAMBDA_FACTOR;
            }
            if !solved {
                log::debug!("solve abandoned: singular system at iteration {iter}");
                return Err(SolveError::IllConditioned);
            }

            let backup = self.arena.clone();
            apply_update(&mut self.arena, &columns, &dx);
            let new_cost = graph_cost(&self.arena, &self.edges);

            if new_cost.is_finite() && new_cost <= cost {
                cost = new_cost;
                lambda = (lambda / LAMBDA_FACTOR).max(MIN_LAMBDA);
                let step = dx.iter().fold(0.0f32, |m, v| m.max(v.abs()));
                if step < 1e-5 {
                    report.converged = true;
                    break;
                }
            } else {
                // Rejected step: revert and damp harder
                self.arena = backup;
                lambda *= LAMBDA_FACTOR;
                if lambda > MAX_LAMBDA {
                    log::trace!("solver stuck at maximum damping after {iter} iterations");
                    break;
                }
            }
        }

        report.final_cost = cost;
        report.converged |= cost <= initial_cost;
        Ok(report)
    }
}

/// Column layout of the free variables.
struct ColumnLayout {
    pose_cols: Vec<Option<usize>>,
    dt_cols: Vec<Option<usize>>,
    total: usize,
}

impl ColumnLayout {
    fn column(&self, id: VertexId) -> Option<usize> {
        match id {
            VertexId::Pose(i) => self.pose_cols[i],
            VertexId::TimeDiff(i) => self.dt_cols[i],
        }
    }
}

fn assign_columns(arena: &VertexArena) -> ColumnLayout {
    let mut next = 0usize;
    let mut pose_cols = Vec::with_capacity(arena.pose_count());
    for i in 0..arena.pose_count() {
        if arena.is_fixed(VertexId::Pose(i)) {
            pose_cols.push(None);
        } else {
            pose_cols.push(Some(next));
            next += 3;
        }
    }
    let mut dt_cols = Vec::with_capacity(arena.time_diff_count());
    for i in 0..arena.time_diff_count() {
        if arena.is_fixed(VertexId::TimeDiff(i)) {
            dt_cols.push(None);
        } else {
            dt_cols.push(Some(next));
            next += 1;
        }
    }
    ColumnLayout {
        pose_cols,
        dt_cols,
        total: next,
    }
}

fn graph_cost(arena: &VertexArena, edges: &[Box<dyn CostEdge + '_>]) -> f32 {
    let mut residual = [0.0f32; MAX_EDGE_DIM];
    let mut cost = 0.0;
    for edge in edges {
        let d = edge.dimension();
        edge.compute(arena, &mut residual[..d]);
        for (row, &r) in residual[..d].iter().enumerate() {
            cost += edge.weight(row) * r * r;
        }
    }
    cost
}

fn apply_update(arena: &mut VertexArena, columns: &ColumnLayout, dx: &[f32]) {
    for i in 0..arena.pose_count() {
        if let Some(c) = columns.pose_cols[i] {
            arena.apply_update(VertexId::Pose(i), &dx[c..c + 3]);
        }
    }
    for i in 0..arena.time_diff_count() {
        if let Some(c) = columns.dt_cols[i] {
            arena.apply_update(VertexId::TimeDiff(i), &dx[c..c + 1]);
        }
    }
}

/// Accumulate `J^T W J` and `-J^T W r` over all edges.
///
/// The arena is mutated transiently by the finite-difference Jacobian and
/// restored before returning from each edge.
fn assemble_normal_equations(
    arena: &mut VertexArena,
    edges: &[Box<dyn CostEdge + '_>],
    columns: &ColumnLayout,
    h: &mut [f32],
    b: &mut [f32],
) {
    let n = b.len();
    let mut residual = [0.0f32; MAX_EDGE_DIM];
    // Jacobian blocks per vertex slot, row-major dim x dof
    let mut jac: Vec<Vec<f32>> = Vec::new();

    for edge in edges {
        let d = edge.dimension();
        let verts = edge.vertices().to_vec();
        edge.compute(arena, &mut residual[..d]);

        jac.clear();
        for (slot, &vid) in verts.iter().enumerate() {
            let dof = arena.dof(vid);
            let mut block = vec![0.0f32; d * dof];
            if arena.is_fixed(vid) {
                jac.push(block);
                continue;
            }
            if !edge.jacobian(arena, slot, &mut block) {
                numeric_jacobian(arena, edge.as_ref(), vid, d, dof, &mut block);
            }
            jac.push(block);
        }

        for (si, &vi) in verts.iter().enumerate() {
            let Some(ci) = columns.column(vi) else {
                continue;
            };
            let dof_i = arena.dof(vi);
            let ji = &jac[si];

            // Gradient contribution
            for a in 0..dof_i {
                let mut g = 0.0;
                for row in 0..d {
                    g += edge.weight(row) * ji[row * dof_i + a] * residual[row];
                }
                b[ci + a] -= g;
            }

            // Hessian blocks (both off-diagonal halves filled explicitly)
            for (sj, &vj) in verts.iter().enumerate() {
                let Some(cj) = columns.column(vj) else {
                    continue;
                };
                let dof_j = arena.dof(vj);
                let jj = &jac[sj];
                for a in 0..dof_i {
                    for bq in 0..dof_j {
                        let mut v = 0.0;
                        for row in 0..d {
                            v += edge.weight(row) * ji[row * dof_i + a] * jj[row * dof_j + bq];
                        }
                        h[(ci + a) * n + (cj + bq)] += v;
                    }
                }
            }
        }
    }
}

fn numeric_jacobian(
    arena: &mut VertexArena,
    edge: &dyn CostEdge,
    vid: VertexId,
    dim: usize,
    dof: usize,
    out: &mut [f32],
) {
    let mut plus = [0.0f32; MAX_EDGE_DIM];
    let mut minus = [0.0f32; MAX_EDGE_DIM];
    for k in 0..dof {
        arena.nudge(vid, k, DIFF_STEP);
        edge.compute(arena, &mut plus[..dim]);
        arena.nudge(vid, k, -2.0 * DIFF_STEP);
        edge.compute(arena, &mut minus[..dim]);
        arena.nudge(vid, k, DIFF_STEP);
        for row in 0..dim {
            out[row * dof + k] = (plus[row] - minus[row]) / (2.0 * DIFF_STEP);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Pose2D;
    use approx::assert_relative_eq;

    /// Pulls a pose toward a target point; dim 2.
    struct AttractEdge {
        verts: [VertexId; 1],
        target: (f32, f32),
        weight: f32,
    }

    impl CostEdge for AttractEdge {
        fn family(&self) -> CostFamily {
            CostFamily::ViaPoint
        }
        fn vertices(&self) -> &[VertexId] {
            &self.verts
        }
        fn dimension(&self) -> usize {
            2
        }
        fn weight(&self, _row: usize) -> f32 {
            self.weight
        }
        fn compute(&self, arena: &VertexArena, residual: &mut [f32]) {
            let p = arena.pose(self.verts[0]);
            residual[0] = p.x - self.target.0;
            residual[1] = p.y - self.target.1;
        }
    }

    #[test]
    fn test_single_vertex_converges_to_target() {
        let mut arena = VertexArena::new();
        let v = arena.add_pose(Pose2D::identity(), false);
        let mut opt = GraphOptimizer::new(arena);
        opt.add_edge(Box::new(AttractEdge {
            verts: [v],
            target: (2.0, -1.0),
            weight: 1.0,
        }));

        let report = opt.optimize(20).unwrap();
        assert!(report.final_cost < report.initial_cost);
        let p = opt.arena().pose(v);
        assert_relative_eq!(p.x, 2.0, epsilon = 1e-2);
        assert_relative_eq!(p.y, -1.0, epsilon = 1e-2);
    }

    #[test]
    fn test_fixed_vertex_does_not_move() {
        let mut arena = VertexArena::new();
        let v = arena.add_pose(Pose2D::identity(), true);
        let mut opt = GraphOptimizer::new(arena);
        opt.add_edge(Box::new(AttractEdge {
            verts: [v],
            target: (5.0, 5.0),
            weight: 1.0,
        }));

        opt.optimize(10).unwrap();
        let p = opt.arena().pose(v);
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn test_two_vertices_split_difference() {
        // Two free poses pulled to opposite targets plus a coupling edge
        struct CoupleEdge {
            verts: [VertexId; 2],
            weight: f32,
        }
        impl CostEdge for CoupleEdge {
            fn family(&self) -> CostFamily {
                CostFamily::Kinematics
            }
            fn vertices(&self) -> &[VertexId] {
                &self.verts
            }
            fn dimension(&self) -> usize {
                2
            }
            fn weight(&self, _row: usize) -> f32 {
                self.weight
            }
            fn compute(&self, arena: &VertexArena, residual: &mut [f32]) {
                let a = arena.pose(self.verts[0]);
                let b = arena.pose(self.verts[1]);
                residual[0] = b.x - a.x;
                residual[1] = b.y - a.y;
            }
        }

        let mut arena = VertexArena::new();
        let a = arena.add_pose(Pose2D::identity(), false);
        let b = arena.add_pose(Pose2D::new(4.0, 0.0, 0.0), false);
        let mut opt = GraphOptimizer::new(arena);
        opt.add_edge(Box::new(AttractEdge {
            verts: [a],
            target: (0.0, 0.0),
            weight: 1.0,
        }));
        opt.add_edge(Box::new(AttractEdge {
            verts: [b],
            target: (4.0, 0.0),
            weight: 1.0,
        }));
        opt.add_edge(Box::new(CoupleEdge {
            verts: [a, b],
            weight: 1.0,
        }));

        let report = opt.optimize(30).unwrap();
        assert!(report.final_cost < report.initial_cost);
        // The coupling pulls the poses toward each other symmetrically
        let pa = opt.arena().pose(a);
        let pb = opt.arena().pose(b);
        assert!(pa.x > 0.5 && pb.x < 3.5);
        assert_relative_eq!(pa.x + pb.x, 4.0, epsilon = 1e-2);
    }

    #[test]
    fn test_cost_breakdown_families() {
        let mut arena = VertexArena::new();
        let v = arena.add_pose(Pose2D::identity(), false);
        let mut opt = GraphOptimizer::new(arena);
        opt.add_edge(Box::new(AttractEdge {
            verts: [v],
            target: (1.0, 0.0),
            weight: 2.0,
        }));
        let breakdown = opt.cost_breakdown();
        assert_relative_eq!(breakdown.via_point, 2.0);
        assert_relative_eq!(breakdown.total(), 2.0);
        assert_relative_eq!(breakdown.selection_total(1.0, 10.0), 20.0);
    }
}
