//! Topological path classification.
//!
//! Two candidate trajectories belong to the same homotopy class when one
//! can be deformed into the other without crossing an obstacle. The
//! invariant used here accumulates, per obstacle, the continuous winding
//! angle of the path around the obstacle centroid and folds each
//! contribution into a complex number whose phase depends on where the
//! obstacle sits along the start-goal chord. Paths passing on opposite
//! sides of an obstacle between start and goal differ by roughly 2 pi in
//! that obstacle's winding, which separates their signatures well beyond
//! the equivalence threshold.

use crate::core::{normalize_angle, Obstacle, Point2D};

/// Complex-valued homotopy invariant of one candidate path.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HSignature {
    /// Real part of the accumulated invariant.
    pub re: f32,
    /// Imaginary part of the accumulated invariant.
    pub im: f32,
}

impl HSignature {
    /// Compute the signature of `path` with respect to `obstacles`.
    ///
    /// Obstacles far outside the band spanned by the path contribute
    /// near-identical winding for all candidates and cancel out in the
    /// comparison; they are still summed for simplicity.
    pub fn of_path(path: &[Point2D], obstacles: &[Obstacle], prescaler: f32) -> Self {
        let mut sig = Self::default();
        let (Some(start), Some(goal)) = (path.first(), path.last()) else {
            return sig;
        };
        let chord = *goal - *start;
        let chord_len_sq = chord.dot(chord).max(1e-9);
        for obs in obstacles {
            let center = obs.centroid();
            let winding = winding_angle(path, &center);
            // Phase from the obstacle's station along the chord keeps
            // contributions of different obstacles from cancelling
            let t = ((center - *start).dot(chord) / chord_len_sq).clamp(0.0, 1.0);
            let phase = std::f32::consts::PI * t;
            sig.re += prescaler * winding * phase.cos();
            sig.im += prescaler * winding * phase.sin();
        }
        sig
    }

    /// Equivalence test: both components within `threshold`.
    pub fn equivalent(&self, other: &Self, threshold: f32) -> bool {
        (self.re - other.re).abs() < threshold && (self.im - other.im).abs() < threshold
    }
}

/// Continuous angle swept by the path around `center`.
fn winding_angle(path: &[Point2D], center: &Point2D) -> f32 {
    let mut total = 0.0;
    for pair in path.windows(2) {
        let a = (pair[0] - *center).angle();
        let b = (pair[1] - *center).angle();
        total += normalize_angle(b - a);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn detour(side: f32) -> Vec<Point2D> {
        vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(2.0, side),
            Point2D::new(4.0, 0.0),
        ]
    }

    #[test]
    fn test_opposite_sides_differ() {
        let obstacles = vec![Obstacle::point(2.0, 0.0)];
        let left = HSignature::of_path(&detour(1.0), &obstacles, 1.0);
        let right = HSignature::of_path(&detour(-1.0), &obstacles, 1.0);
        assert!(!left.equivalent(&right, 0.1));
    }

    #[test]
    fn test_noisy_same_side_equivalent() {
        let obstacles = vec![Obstacle::point(2.0, 0.0)];
        let a = HSignature::of_path(&detour(1.0), &obstacles, 1.0);
        let b = HSignature::of_path(&detour(1.001), &obstacles, 1.0);
        assert!(a.equivalent(&b, 0.1));
    }

    #[test]
    fn test_empty_path_is_zero() {
        let obstacles = vec![Obstacle::point(2.0, 0.0)];
        let sig = HSignature::of_path(&[], &obstacles, 1.0);
        assert_relative_eq!(sig.re, 0.0);
        assert_relative_eq!(sig.im, 0.0);
    }

    #[test]
    fn test_no_obstacles_all_equivalent() {
        let a = HSignature::of_path(&detour(1.0), &[], 1.0);
        let b = HSignature::of_path(&detour(-1.0), &[], 1.0);
        assert!(a.equivalent(&b, 0.1));
    }
}
