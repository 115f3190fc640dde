//! Planner error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::optim::SolveError;

/// Errors surfaced across the planning boundary.
///
/// Candidate-level solve failures stay internal to a planning call; only
/// the call-level outcomes below reach the caller.
#[derive(Error, Debug)]
pub enum PlanError {
    /// Every candidate failed to produce a usable trajectory this
    /// cycle. The previous trajectory is retained for the next hot
    /// start.
    #[error("no homotopy candidate produced a feasible trajectory")]
    NoFeasibleCandidate,

    /// A query that needs a solved trajectory was made before any
    /// successful planning call.
    #[error("no trajectory available, plan has not succeeded yet")]
    NoPlanAvailable,

    /// The reference plan is unusable (fewer than two poses).
    #[error("invalid reference plan: {0}")]
    InvalidPlan(&'static str),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A solver failure escaping candidate isolation.
    #[error(transparent)]
    Solve(#[from] SolveError),
}
