//! Heat propagation around an active fire
//!
//! Every `spread_interval` seconds the propagator collects the scene objects
//! within `spread_radius` of the fire anchor and heats each registered,
//! unmarked one at `heat_per_second` for the time elapsed since its last scan.
//! Elapsed time is measured on the simulated clock from the moment the fire
//! started, so spread timing does not depend on the step size.
//!
//! The rate is flat inside the radius: there is no distance falloff term.
//! Overlapping fires therefore add up linearly.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core_types::{TargetId, Vec3};
use crate::error::{ensure_non_negative, ensure_positive, IgnitionError};
use crate::ignition::IgnitionAuthority;
use crate::scene::SceneHooks;

/// Heat spread tuning shared by all propagators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatSpreadConfig {
    /// Radius around the fire anchor that receives heat
    pub spread_radius: f32,
    /// Seconds between scans
    pub spread_interval: f32,
    /// Heat applied per second of exposure
    pub heat_per_second: f32,
}

impl Default for HeatSpreadConfig {
    fn default() -> Self {
        Self {
            spread_radius: 3.0,
            spread_interval: 1.0,
            heat_per_second: 25.0,
        }
    }
}

impl HeatSpreadConfig {
    /// Check value ranges
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a negative radius or rate, or a non-positive interval.
    pub fn validate(&self) -> Result<(), IgnitionError> {
        ensure_non_negative("heat.spread_radius", self.spread_radius)?;
        ensure_positive("heat.spread_interval", self.spread_interval)?;
        ensure_non_negative("heat.heat_per_second", self.heat_per_second)?;
        Ok(())
    }
}

/// Periodic heat source attached to one burning target
#[derive(Debug, Clone, PartialEq)]
pub struct HeatPropagator {
    source: TargetId,
    anchor: Vec3,
    last_scan: f64,
}

impl HeatPropagator {
    /// Create a propagator for the fire that started burning on `source` at `anchor` at time `started_at`
    #[must_use]
    pub fn new(source: TargetId, anchor: Vec3, started_at: f64) -> Self {
        Self {
            source,
            anchor,
            last_scan: started_at,
        }
    }

    /// Target the fire is burning on
    #[must_use]
    pub fn source(&self) -> TargetId {
        self.source
    }

    /// Fire anchor the radius is measured from
    #[must_use]
    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Time of the last scan (the fire's start time before the first one)
    #[must_use]
    pub fn last_scan(&self) -> f64 {
        self.last_scan
    }

    /// Advance the clock to `now`; scans and heats once the interval has elapsed.
    ///
    /// Returns the number of targets heated (zero on steps without a scan).
    pub fn tick(
        &mut self,
        now: f64,
        config: &HeatSpreadConfig,
        authority: &mut IgnitionAuthority,
        hooks: &SceneHooks,
    ) -> usize {
        let elapsed = (now - self.last_scan) as f32;
        if elapsed < config.spread_interval {
            return 0;
        }
        self.last_scan = now;

        let mut heated = 0;
        for target in hooks
            .spatial
            .query_within_radius(self.anchor, config.spread_radius)
        {
            if authority.is_flammable(target) && !authority.is_marked(target) {
                authority.add_heat(target, config.heat_per_second, elapsed, hooks);
                heated += 1;
            }
        }

        trace!(source = %self.source, heated, "Heat scan");
        heated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::IgnitionState;
    use crate::ignition::{IgnitionConfig, SmokeConfig};
    use crate::scene::SandboxScene;

    fn scene_with_neighbours() -> (IgnitionAuthority, SandboxScene, SceneHooks) {
        let scene = SandboxScene::new(2.0);
        let mut authority =
            IgnitionAuthority::new(IgnitionConfig::default(), SmokeConfig::default()).unwrap();

        // Source fire at origin, one neighbour close, one at the edge, one far away
        for (id, x) in [(0, 0.0), (1, 1.5), (2, 2.9), (3, 8.0)] {
            scene.add_object(TargetId(id), Vec3::new(x, 0.0, 0.0));
            authority.register_flammable(TargetId(id), 100.0).unwrap();
        }
        let hooks = SceneHooks::from_scene(&scene);
        (authority, scene, hooks)
    }

    #[test]
    fn test_no_scan_before_interval() {
        let (mut authority, _scene, hooks) = scene_with_neighbours();
        let config = HeatSpreadConfig::default();
        let mut propagator = HeatPropagator::new(TargetId(0), Vec3::zeros(), 0.0);

        assert_eq!(propagator.tick(0.5, &config, &mut authority, &hooks), 0);
        assert!(authority.runtime_state(TargetId(1)).is_none());
    }

    #[test]
    fn test_flat_rate_inside_radius() {
        let (mut authority, _scene, hooks) = scene_with_neighbours();
        let config = HeatSpreadConfig::default();
        authority.force_ignite(TargetId(0), &hooks);
        let mut propagator = HeatPropagator::new(TargetId(0), Vec3::zeros(), 0.0);

        propagator.tick(0.5, &config, &mut authority, &hooks);
        let heated = propagator.tick(1.0, &config, &mut authority, &hooks);
        assert_eq!(heated, 2);

        // Near and edge neighbours get identical heat, no falloff
        let near = authority.runtime_state(TargetId(1)).unwrap().heat_level();
        let edge = authority.runtime_state(TargetId(2)).unwrap().heat_level();
        assert_eq!(near, 25.0);
        assert_eq!(edge, near);
        assert!(authority.runtime_state(TargetId(3)).is_none());
    }

    #[test]
    fn test_four_scans_ignite_neighbour() {
        let (mut authority, _scene, hooks) = scene_with_neighbours();
        let config = HeatSpreadConfig::default();
        authority.force_ignite(TargetId(0), &hooks);
        let mut propagator = HeatPropagator::new(TargetId(0), Vec3::zeros(), 0.0);

        for now in [1.0, 2.0, 3.0] {
            propagator.tick(now, &config, &mut authority, &hooks);
        }
        assert_eq!(authority.ignition_state(TargetId(1)), Some(IgnitionState::Unburnt));

        propagator.tick(4.0, &config, &mut authority, &hooks);
        assert_eq!(authority.ignition_state(TargetId(1)), Some(IgnitionState::Igniting));
        assert_eq!(authority.ignition_state(TargetId(2)), Some(IgnitionState::Igniting));

        // Marked neighbours are skipped from now on
        assert_eq!(propagator.tick(5.0, &config, &mut authority, &hooks), 0);
    }

    #[test]
    fn test_elapsed_counts_from_fire_start() {
        let (mut authority, _scene, hooks) = scene_with_neighbours();
        let config = HeatSpreadConfig::default();
        authority.force_ignite(TargetId(0), &hooks);

        // Fire started at 2.75; the step that spawned it ended at 3.0
        let mut propagator = HeatPropagator::new(TargetId(0), Vec3::zeros(), 2.75);
        assert_eq!(propagator.tick(3.0, &config, &mut authority, &hooks), 0);
        assert_eq!(propagator.tick(3.5, &config, &mut authority, &hooks), 0);
        assert!(authority.runtime_state(TargetId(1)).is_none());

        // Late scan applies the full time since the fire started
        assert_eq!(propagator.tick(4.0, &config, &mut authority, &hooks), 2);
        assert_eq!(authority.runtime_state(TargetId(1)).unwrap().heat_level(), 31.25);
        assert_eq!(propagator.last_scan(), 4.0);
    }

    #[test]
    fn test_validate() {
        assert!(HeatSpreadConfig::default().validate().is_ok());
        let config = HeatSpreadConfig {
            spread_interval: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
