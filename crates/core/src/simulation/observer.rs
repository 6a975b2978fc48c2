//! Observer-driven focus distance
//!
//! When both an observer position and a blur centre are known, the focus
//! distance follows how far the observer is from the centre: close in means
//! a short focus distance (blurry), far away means a long one (clear).
//! This runs every step and overrides the smoke-derived focus distance.

use serde::{Deserialize, Serialize};

use crate::core_types::{lerp, Vec3};
use crate::error::{ensure_non_negative, ensure_positive, IgnitionError};
use crate::scene::Environment;

/// Observer focus tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverFocusConfig {
    /// Point the blur is measured from; tracking is off when `None`
    pub blur_center: Option<Vec3>,
    /// Focus distance with the observer at the centre
    pub min_focus_distance: f32,
    /// Focus distance with the observer at or beyond `blur_range`
    pub max_focus_distance: f32,
    pub blur_range: f32,
}

impl Default for ObserverFocusConfig {
    fn default() -> Self {
        Self {
            blur_center: None,
            min_focus_distance: 1.0,
            max_focus_distance: 20.0,
            blur_range: 50.0,
        }
    }
}

impl ObserverFocusConfig {
    /// Check value ranges
    ///
    /// # Errors
    /// Returns `InvalidConfig` for negative focus distances or a non-positive range.
    pub fn validate(&self) -> Result<(), IgnitionError> {
        ensure_non_negative("observer.min_focus_distance", self.min_focus_distance)?;
        ensure_non_negative("observer.max_focus_distance", self.max_focus_distance)?;
        ensure_positive("observer.blur_range", self.blur_range)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ObserverFocus {
    config: ObserverFocusConfig,
    observer: Option<Vec3>,
}

impl ObserverFocus {
    pub(crate) fn new(config: ObserverFocusConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    pub(crate) fn set_observer(&mut self, observer: Option<Vec3>) {
        self.observer = observer;
    }

    pub(crate) fn focus_distance(&self) -> Option<f32> {
        let center = self.config.blur_center?;
        let observer = self.observer?;
        let t = ((observer - center).norm() / self.config.blur_range).clamp(0.0, 1.0);
        Some(lerp(
            self.config.min_focus_distance,
            self.config.max_focus_distance,
            t,
        ))
    }

    /// Push the tracked focus distance, if tracking is active
    pub(crate) fn apply(&self, environment: &mut dyn Environment) -> Option<f32> {
        let distance = self.focus_distance()?;
        environment.set_focus_distance(distance);
        Some(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inactive_without_center_or_observer() {
        let mut focus = ObserverFocus::new(ObserverFocusConfig::default());
        focus.set_observer(Some(Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(focus.focus_distance(), None);

        let focus = ObserverFocus::new(ObserverFocusConfig {
            blur_center: Some(Vec3::zeros()),
            ..Default::default()
        });
        assert_eq!(focus.focus_distance(), None);
    }

    #[test]
    fn test_focus_follows_distance() {
        let mut focus = ObserverFocus::new(ObserverFocusConfig {
            blur_center: Some(Vec3::zeros()),
            ..Default::default()
        });

        focus.set_observer(Some(Vec3::zeros()));
        assert_relative_eq!(focus.focus_distance().unwrap(), 1.0);

        focus.set_observer(Some(Vec3::new(25.0, 0.0, 0.0)));
        assert_relative_eq!(focus.focus_distance().unwrap(), 10.5);

        focus.set_observer(Some(Vec3::new(0.0, 400.0, 0.0)));
        assert_relative_eq!(focus.focus_distance().unwrap(), 20.0);
    }
}
