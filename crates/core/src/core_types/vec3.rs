//! Vector type alias for scene positions and offsets.

use nalgebra::Vector3;

/// 3D vector type for positions, bounding box corners and effect anchors.
///
/// This is a simple alias for `nalgebra::Vector3<f32>`. The scene is z-up:
/// vertical offsets such as the top-surface fallback are applied along `z`.
pub type Vec3 = Vector3<f32>;
