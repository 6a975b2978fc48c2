//! Target identity and per-target ignition state
//!
//! Scene objects are referred to by a stable integer [`TargetId`] handed out
//! by the host. The ignition authority keys all of its per-target records on
//! this id, so no references into the host scene are ever held.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle for a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u32);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Declared flammable object
///
/// The heat threshold is optional here so that scene manifests missing it can
/// be deserialized and then rejected at registration, instead of silently
/// picking a default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlammableTarget {
    pub target: TargetId,
    /// Accumulated heat required to force-ignite (must be > 0)
    #[serde(default)]
    pub heat_threshold: Option<f32>,
}

impl FlammableTarget {
    /// Declare a flammable target with a heat threshold
    #[must_use]
    pub fn new(target: TargetId, heat_threshold: f32) -> Self {
        Self {
            target,
            heat_threshold: Some(heat_threshold),
        }
    }
}

/// Ignition progression of a single target
///
/// Transitions only move forward: `Unburnt -> Igniting -> Burning -> Extinguished`.
/// Permanent structures stop at `Burning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IgnitionState {
    #[default]
    Unburnt,
    /// Marked, waiting for the ignition delay to elapse
    Igniting,
    /// Fire visual spawned
    Burning,
    /// Burnt out and removed from the scene
    Extinguished,
}

impl IgnitionState {
    /// Whether the presence marker is attached.
    ///
    /// Any state past `Unburnt` blocks all further stimuli.
    #[inline]
    #[must_use]
    pub fn is_marked(self) -> bool {
        !matches!(self, IgnitionState::Unburnt)
    }
}

/// Runtime state created lazily on the first stimulus a target receives
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetRuntimeState {
    pub(crate) spark_count: u32,
    pub(crate) heat_level: f32,
    pub(crate) ignition_state: IgnitionState,
}

impl TargetRuntimeState {
    /// Sparks received since the last reset
    #[must_use]
    pub fn spark_count(&self) -> u32 {
        self.spark_count
    }

    /// Accumulated continuous heat
    #[must_use]
    pub fn heat_level(&self) -> f32 {
        self.heat_level
    }

    #[must_use]
    pub fn ignition_state(&self) -> IgnitionState {
        self.ignition_state
    }

    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.ignition_state.is_marked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unburnt_is_unmarked() {
        assert!(!IgnitionState::Unburnt.is_marked());
        assert!(IgnitionState::Igniting.is_marked());
        assert!(IgnitionState::Burning.is_marked());
        assert!(IgnitionState::Extinguished.is_marked());
    }

    #[test]
    fn test_default_runtime_state() {
        let state = TargetRuntimeState::default();
        assert_eq!(state.spark_count(), 0);
        assert_eq!(state.heat_level(), 0.0);
        assert_eq!(state.ignition_state(), IgnitionState::Unburnt);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(TargetId(42).to_string(), "target#42");
    }
}
