//! Global fire count and smoke escalation
//!
//! Every completed ignition bumps a process-wide fire counter. Once the
//! counter reaches the activation threshold, each further ignition thickens
//! the smoke by a fixed step up to a cap, and the smoke level is mapped onto
//! haze and depth-of-field parameters by clamped linear interpolation.
//!
//! Smoke never thins: there is no path that lowers it when fires go out.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core_types::{Color, LerpRange};
use crate::error::{ensure_non_negative, ensure_positive, IgnitionError};
use crate::scene::{Environment, HazeSettings};

/// Smoke escalation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeConfig {
    /// Fire count at which smoke starts to accumulate
    pub activation_fire_threshold: u32,
    /// Smoke added per ignition once active
    pub intensity_increase: f32,
    /// Upper bound of the smoke level
    pub max_level: f32,
    pub haze_density: LerpRange,
    /// Haze colour at zero smoke
    pub haze_color_clear: Color,
    /// Haze colour at full smoke
    pub haze_color_dense: Color,
    pub haze_start_distance: LerpRange,
    pub haze_end_distance: LerpRange,
    pub focus_distance: LerpRange,
    pub aperture: LerpRange,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            activation_fire_threshold: 5,
            intensity_increase: 0.1,
            max_level: 1.0,
            haze_density: LerpRange::new(0.0, 0.05),
            haze_color_clear: Color::WHITE,
            haze_color_dense: Color::GREY,
            haze_start_distance: LerpRange::new(0.0, 10.0),
            haze_end_distance: LerpRange::new(60.0, 40.0),
            focus_distance: LerpRange::new(2.0, 20.0),
            aperture: LerpRange::new(5.0, 32.0),
        }
    }
}

impl SmokeConfig {
    /// Check value ranges
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a negative increase or a non-positive cap.
    pub fn validate(&self) -> Result<(), IgnitionError> {
        ensure_non_negative("smoke.intensity_increase", self.intensity_increase)?;
        ensure_positive("smoke.max_level", self.max_level)?;
        Ok(())
    }

    /// Haze pushed before any fire has started: disabled, dense colour, clear distances
    #[must_use]
    pub fn initial_haze(&self) -> HazeSettings {
        HazeSettings {
            enabled: false,
            density: self.haze_density.low,
            color: self.haze_color_dense,
            start_distance: self.haze_start_distance.low,
            end_distance: self.haze_end_distance.low,
        }
    }
}

/// Environment parameters derived from a smoke level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphereParams {
    pub haze: HazeSettings,
    pub focus_distance: f32,
    pub aperture: f32,
}

impl AtmosphereParams {
    /// Interpolate every parameter at `smoke_level`
    #[must_use]
    pub fn from_smoke(smoke_level: f32, config: &SmokeConfig) -> Self {
        Self {
            haze: HazeSettings {
                enabled: true,
                density: config.haze_density.at(smoke_level),
                color: config
                    .haze_color_clear
                    .lerp(config.haze_color_dense, smoke_level),
                start_distance: config.haze_start_distance.at(smoke_level),
                end_distance: config.haze_end_distance.at(smoke_level),
            },
            focus_distance: config.focus_distance.at(smoke_level),
            aperture: config.aperture.at(smoke_level),
        }
    }

    /// Push to the environment collaborator
    pub fn apply(&self, environment: &mut dyn Environment) {
        environment.set_ambient_haze(&self.haze);
        environment.set_focus(self.focus_distance, self.aperture);
    }
}

/// Process-wide fire aggregate, owned by the ignition authority
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalFireState {
    fire_count: u32,
    smoke_level: f32,
    haze_enabled: bool,
}

impl GlobalFireState {
    /// Total ignitions completed so far
    #[must_use]
    pub fn fire_count(&self) -> u32 {
        self.fire_count
    }

    /// Current smoke level in `[0, max_level]`
    #[must_use]
    pub fn smoke_level(&self) -> f32 {
        self.smoke_level
    }

    /// Whether ambient haze has been switched on
    #[must_use]
    pub fn haze_enabled(&self) -> bool {
        self.haze_enabled
    }

    /// Record one completed ignition and escalate smoke if active.
    ///
    /// Returns `true` when the smoke level was recomputed and pushed.
    pub(crate) fn escalate(&mut self, config: &SmokeConfig, environment: &mut dyn Environment) -> bool {
        self.fire_count += 1;
        if self.fire_count < config.activation_fire_threshold {
            return false;
        }

        self.smoke_level = (self.smoke_level + config.intensity_increase).min(config.max_level);

        if !self.haze_enabled {
            self.haze_enabled = true;
            info!(fire_count = self.fire_count, "Smoke threshold reached, enabling ambient haze");
        }

        AtmosphereParams::from_smoke(self.smoke_level, config).apply(environment);
        debug!(
            fire_count = self.fire_count,
            smoke_level = self.smoke_level,
            "Smoke escalated"
        );
        true
    }
}
