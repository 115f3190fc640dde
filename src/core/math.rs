//! Angle and interval helpers shared across the planner.

use std::f32::consts::{PI, TAU};

/// Normalize an angle to [-π, π).
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a >= PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}

/// Shortest signed angular difference `to - from`, normalized to [-π, π).
#[inline]
pub fn angle_diff(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Average of two headings, taken along the shortest arc.
#[inline]
pub fn average_angle(a: f32, b: f32) -> f32 {
    normalize_angle(a + 0.5 * angle_diff(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_normalize_angle_range() {
        assert_relative_eq!(normalize_angle(0.0), 0.0);
        assert_relative_eq!(normalize_angle(TAU), 0.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(3.0 * PI).abs(), PI, epsilon = 1e-5);
        assert_relative_eq!(normalize_angle(-TAU - 0.1), -0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_angle_diff_wraps() {
        // Crossing the ±π boundary takes the short way around
        let d = angle_diff(PI - 0.1, -PI + 0.1);
        assert_relative_eq!(d, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_average_angle() {
        assert_relative_eq!(average_angle(0.0, FRAC_PI_2), FRAC_PI_2 / 2.0, epsilon = 1e-6);
        // Average across the boundary stays near ±π, not zero
        let avg = average_angle(PI - 0.1, -PI + 0.1);
        assert!(avg.abs() > 3.0);
    }
}
