//! Linear RGB colour used for ambient haze.

use serde::{Deserialize, Serialize};

use super::interp::lerp;

/// Linear RGB colour, components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const GREY: Color = Color::rgb(0.5, 0.5, 0.5);

    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Component-wise interpolation towards `other`, `t` clamped to `[0, 1]`
    #[must_use]
    pub fn lerp(self, other: Color, t: f32) -> Color {
        Color {
            r: lerp(self.r, other.r, t),
            g: lerp(self.g, other.g, t),
            b: lerp(self.b, other.b, t),
        }
    }
}
