//! Core types and utilities

pub mod color;
pub mod interp;
pub mod target;
pub mod vec3;

pub use color::Color;
pub use interp::{lerp, LerpRange};
pub use target::{FlammableTarget, IgnitionState, TargetId, TargetRuntimeState};
pub use vec3::Vec3;
