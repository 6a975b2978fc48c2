//! Fire Ignition Core Library
//!
//! Models fire propagation across a set of flammable scene objects. Objects
//! accumulate ignition pressure from discrete sparks and continuous heat,
//! run through a delayed ignition sequence once a threshold is crossed, burn
//! for a bounded time and are then removed from the scene (unless they are
//! permanent structures). Every completed ignition feeds a global smoke level
//! that drives ambient haze and depth-of-field parameters.
//!
//! ## Layout
//!
//! - [`ignition`] - the ignition authority: per-target state, the ignition
//!   sequence and the global smoke aggregate
//! - [`propagation`] - heat propagators around active fires and stochastic
//!   spark sources
//! - [`scene`] - collaborator traits for the host scene, plus an in-memory
//!   sandbox implementation
//! - [`simulation`] - the `FireSystem` orchestrator that owns the clock
//!
//! Rendering, physics and post-processing live in the host; this crate only
//! asks for them through the [`scene`] traits.

// Core types and utilities
pub mod core_types;
pub mod error;
pub mod schedule;

pub mod ignition;
pub mod propagation;
pub mod scene;
pub mod simulation;

// Re-export core types
pub use core_types::{Color, FlammableTarget, IgnitionState, TargetId, TargetRuntimeState, Vec3};
pub use error::IgnitionError;

pub use ignition::{GlobalFireState, IgnitionAuthority, IgnitionConfig, IgnitionEvent, SmokeConfig};
pub use propagation::{HeatPropagator, HeatSpreadConfig, SparkAttempt, SparkSourceConfig, StochasticSparkSource};
pub use scene::{
    Aabb, EffectHandle, EffectKind, Environment, HazeSettings, SandboxScene, SceneGeometry,
    SceneHooks, SceneObjects, SpatialQuery, VisualEffects,
};
pub use simulation::{FireConfig, FireStats, FireSystem, FireSystemBuilder, ObserverFocusConfig};
