//! Velocity command type for differential-drive agents.

use serde::{Deserialize, Serialize};

/// A differential-drive velocity: translational and rotational components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    /// Translational velocity in m/s (negative = backwards).
    pub linear: f32,
    /// Rotational velocity in rad/s (CCW positive).
    pub angular: f32,
}

impl Velocity {
    /// Zero velocity.
    pub const ZERO: Velocity = Velocity {
        linear: 0.0,
        angular: 0.0,
    };

    /// Create a new velocity.
    #[inline]
    pub const fn new(linear: f32, angular: f32) -> Self {
        Self { linear, angular }
    }
}
