//! One-sided smooth penalty helpers.
//!
//! The optimizer enforces bounds through these instead of hard
//! constraints: the residual is zero inside the feasible region and grows
//! linearly outside it, shifted inward by a configurable epsilon margin.
//! This keeps the whole problem an unconstrained weighted least-squares
//! problem.

/// Penalty for `value` falling below `bound`, with safety margin
/// `epsilon`. Zero when `value >= bound + epsilon`.
#[inline]
pub fn penalty_below(value: f32, bound: f32, epsilon: f32) -> f32 {
    let limit = bound + epsilon;
    if value >= limit {
        0.0
    } else {
        limit - value
    }
}

/// Penalty for `value` leaving `[lower, upper]`, with the margin pulled
/// inward by `epsilon`. Signed: negative below the interval, positive
/// above, zero inside.
#[inline]
pub fn penalty_interval(value: f32, lower: f32, upper: f32, epsilon: f32) -> f32 {
    let lo = lower + epsilon;
    let hi = upper - epsilon;
    if value < lo {
        value - lo
    } else if value > hi {
        value - hi
    } else {
        0.0
    }
}
