//! Clamped linear interpolation helpers.

use serde::{Deserialize, Serialize};

/// Linearly interpolate between `a` and `b`.
///
/// `t` is clamped to `[0, 1]`, so values outside the range never extrapolate.
#[inline]
#[must_use]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

/// Pair of values a parameter moves between as its driver goes from 0 to 1.
///
/// `high` may be smaller than `low` (fog end distance shrinks as smoke thickens).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LerpRange {
    /// Value at `t = 0`
    pub low: f32,
    /// Value at `t = 1`
    pub high: f32,
}

impl LerpRange {
    /// Create a new range
    #[must_use]
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Value at `t`, clamped to the range
    #[must_use]
    pub fn at(&self, t: f32) -> f32 {
        lerp(self.low, self.high, t)
    }
}
