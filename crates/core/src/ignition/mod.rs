//! Ignition authority
//!
//! The single owner of per-target ignition state and of the global fire
//! aggregate. Three stimulus entry points feed it:
//!
//! - [`IgnitionAuthority::try_spark`] - discrete sparks, ignition after a fixed count
//! - [`IgnitionAuthority::add_heat`] - continuous heat, ignition at a per-target threshold
//! - [`IgnitionAuthority::force_ignite`] - immediate ignition
//!
//! All three share one guard: a target that is unregistered, gone from the
//! scene, or already marked is silently ignored. The marker is attached
//! synchronously when the ignition sequence begins, so two stimuli landing in
//! the same step can never ignite a target twice.
//!
//! # Ignition sequence
//!
//! ```text
//! Unburnt --mark--> Igniting --ignition_delay--> Burning --fire_duration--> Extinguished
//!                                                   |
//!                                                   +-- permanent structures stay here
//! ```
//!
//! Each delay is a wake on a [`Scheduler`] carrying only the target id and
//! the state it advances to. A wake whose target has left the scene is
//! dropped without side effects.

pub mod smoke;

pub use smoke::{AtmosphereParams, GlobalFireState, SmokeConfig};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core_types::{FlammableTarget, IgnitionState, TargetId, TargetRuntimeState, Vec3};
use crate::error::{ensure_non_negative, IgnitionError};
use crate::scene::{EffectHandle, EffectKind, SceneHooks, DEFAULT_TOP_FALLBACK_OFFSET};
use crate::schedule::Scheduler;

/// Ignition sequence tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnitionConfig {
    /// Sparks needed to start the ignition sequence
    pub sparks_before_ignition: u32,
    /// Seconds between the marker and the fire visual
    pub ignition_delay: f32,
    /// Seconds a non-permanent target burns before removal
    pub fire_duration: f32,
    /// Lifetime of the spark visual spawned per spark
    pub spark_visual_duration: f32,
    /// Vertical offset for effect anchors on objects without bounds
    pub top_fallback_offset: f32,
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            sparks_before_ignition: 5,
            ignition_delay: 1.0,
            fire_duration: 20.0,
            spark_visual_duration: 2.5,
            top_fallback_offset: DEFAULT_TOP_FALLBACK_OFFSET,
        }
    }
}

impl IgnitionConfig {
    /// Check value ranges
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a zero spark count or a negative/non-finite duration.
    pub fn validate(&self) -> Result<(), IgnitionError> {
        if self.sparks_before_ignition == 0 {
            return Err(IgnitionError::invalid_config(
                "ignition.sparks_before_ignition",
                "must be at least 1",
            ));
        }
        ensure_non_negative("ignition.ignition_delay", self.ignition_delay)?;
        ensure_non_negative("ignition.fire_duration", self.fire_duration)?;
        ensure_non_negative("ignition.spark_visual_duration", self.spark_visual_duration)?;
        if !self.top_fallback_offset.is_finite() {
            return Err(IgnitionError::invalid_config(
                "ignition.top_fallback_offset",
                "must be finite",
            ));
        }
        Ok(())
    }
}

/// Transition reported by [`IgnitionAuthority::advance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IgnitionEvent {
    /// Fire visual spawned at `anchor`; the target is now burning
    Ignited { target: TargetId, anchor: Vec3, at: f64 },
    /// Burn finished and the target was removed from the scene
    Extinguished { target: TargetId, at: f64 },
}

impl IgnitionEvent {
    #[must_use]
    pub fn target(&self) -> TargetId {
        match *self {
            IgnitionEvent::Ignited { target, .. } | IgnitionEvent::Extinguished { target, .. } => target,
        }
    }

    /// Simulated time the transition was due
    #[must_use]
    pub fn at(&self) -> f64 {
        match *self {
            IgnitionEvent::Ignited { at, .. } | IgnitionEvent::Extinguished { at, .. } => at,
        }
    }
}

/// Resumption context for a suspended ignition sequence
#[derive(Debug, Clone, Copy)]
struct IgnitionWake {
    target: TargetId,
    next: IgnitionState,
}

#[derive(Debug, Clone)]
struct TargetRecord {
    heat_threshold: f32,
    runtime: Option<TargetRuntimeState>,
    fire_effect: Option<EffectHandle>,
}

impl TargetRecord {
    fn is_marked(&self) -> bool {
        self.runtime.is_some_and(|runtime| runtime.is_marked())
    }
}

/// Owner of per-target ignition state and the global smoke aggregate
#[derive(Debug)]
pub struct IgnitionAuthority {
    config: IgnitionConfig,
    smoke: SmokeConfig,
    targets: FxHashMap<TargetId, TargetRecord>,
    permanent: FxHashSet<TargetId>,
    fire_state: GlobalFireState,
    wakes: Scheduler<IgnitionWake>,
    now: f64,
}

impl IgnitionAuthority {
    /// Create an authority with no registered targets
    ///
    /// # Errors
    /// Returns `InvalidConfig` if either configuration fails validation.
    pub fn new(config: IgnitionConfig, smoke: SmokeConfig) -> Result<Self, IgnitionError> {
        config.validate()?;
        smoke.validate()?;
        Ok(Self {
            config,
            smoke,
            targets: FxHashMap::default(),
            permanent: FxHashSet::default(),
            fire_state: GlobalFireState::default(),
            wakes: Scheduler::new(),
            now: 0.0,
        })
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a flammable target with its heat threshold
    ///
    /// # Errors
    /// Returns `InvalidHeatThreshold` if the threshold is not finite and positive.
    pub fn register_flammable(&mut self, target: TargetId, heat_threshold: f32) -> Result<(), IgnitionError> {
        self.register(&FlammableTarget::new(target, heat_threshold))
    }

    /// Register a declared flammable target
    ///
    /// Re-registering an existing target updates its threshold and keeps its
    /// runtime state.
    ///
    /// # Errors
    /// Returns `MissingHeatThreshold` or `InvalidHeatThreshold`.
    pub fn register(&mut self, declaration: &FlammableTarget) -> Result<(), IgnitionError> {
        let target = declaration.target;
        let heat_threshold = declaration
            .heat_threshold
            .ok_or(IgnitionError::MissingHeatThreshold(target))?;
        if !(heat_threshold.is_finite() && heat_threshold > 0.0) {
            return Err(IgnitionError::InvalidHeatThreshold {
                target,
                value: heat_threshold,
            });
        }

        self.targets
            .entry(target)
            .and_modify(|record| record.heat_threshold = heat_threshold)
            .or_insert(TargetRecord {
                heat_threshold,
                runtime: None,
                fire_effect: None,
            });
        Ok(())
    }

    /// Exempt a target from removal once it burns
    pub fn register_permanent(&mut self, target: TargetId) {
        self.permanent.insert(target);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &IgnitionConfig {
        &self.config
    }

    #[must_use]
    pub fn smoke_config(&self) -> &SmokeConfig {
        &self.smoke
    }

    #[must_use]
    pub fn is_flammable(&self, target: TargetId) -> bool {
        self.targets.contains_key(&target)
    }

    #[must_use]
    pub fn is_permanent(&self, target: TargetId) -> bool {
        self.permanent.contains(&target)
    }

    /// Whether the presence marker is attached
    #[must_use]
    pub fn is_marked(&self, target: TargetId) -> bool {
        self.targets.get(&target).is_some_and(TargetRecord::is_marked)
    }

    /// Runtime state, `None` until the target receives its first stimulus
    #[must_use]
    pub fn runtime_state(&self, target: TargetId) -> Option<&TargetRuntimeState> {
        self.targets.get(&target)?.runtime.as_ref()
    }

    /// Ignition state of a registered target (`Unburnt` before any stimulus)
    #[must_use]
    pub fn ignition_state(&self, target: TargetId) -> Option<IgnitionState> {
        self.targets
            .get(&target)
            .map(|record| record.runtime.map_or(IgnitionState::Unburnt, |r| r.ignition_state))
    }

    /// Ignition state of every registered target
    pub fn states(&self) -> impl Iterator<Item = (TargetId, IgnitionState)> + '_ {
        self.targets.iter().map(|(&target, record)| {
            (
                target,
                record.runtime.map_or(IgnitionState::Unburnt, |r| r.ignition_state),
            )
        })
    }

    #[must_use]
    pub fn fire_state(&self) -> &GlobalFireState {
        &self.fire_state
    }

    /// Suspended sequences still waiting on a wake
    #[must_use]
    pub fn pending_wakes(&self) -> usize {
        self.wakes.len()
    }

    /// Current simulated time as last seen by [`IgnitionAuthority::advance`]
    #[must_use]
    pub fn now(&self) -> f64 {
        self.now
    }

    // ------------------------------------------------------------------
    // Stimuli
    // ------------------------------------------------------------------

    fn accepts_stimulus(&self, target: TargetId, hooks: &SceneHooks) -> bool {
        self.targets
            .get(&target)
            .is_some_and(|record| !record.is_marked() && hooks.objects.contains(target))
    }

    /// Apply one discrete spark.
    ///
    /// Spawns a spark visual on top of the target and starts the ignition
    /// sequence once `sparks_before_ignition` sparks have landed.
    pub fn try_spark(&mut self, target: TargetId, hooks: &mut SceneHooks) {
        if !self.accepts_stimulus(target, hooks) {
            trace!(%target, "Spark ignored");
            return;
        }

        let Some(record) = self.targets.get_mut(&target) else {
            return;
        };
        let runtime = record.runtime.get_or_insert_with(TargetRuntimeState::default);
        runtime.spark_count += 1;
        let spark_count = runtime.spark_count;

        if let Some(anchor) = hooks
            .geometry
            .top_surface_point(target, self.config.top_fallback_offset)
        {
            hooks
                .effects
                .spawn_transient(EffectKind::Spark, anchor, self.config.spark_visual_duration);
        }

        trace!(%target, spark_count, "Spark landed");
        if spark_count >= self.config.sparks_before_ignition {
            self.begin_sequence(target);
        }
    }

    /// Start the ignition sequence immediately, bypassing the spark counter
    pub fn force_ignite(&mut self, target: TargetId, hooks: &SceneHooks) {
        if !self.accepts_stimulus(target, hooks) {
            trace!(%target, "Forced ignition ignored");
            return;
        }
        self.begin_sequence(target);
    }

    /// Accumulate `rate_per_second * elapsed` heat.
    ///
    /// The caller supplies `elapsed`, the time since its previous call. When
    /// the accumulated heat reaches the target's threshold it is reset and
    /// the target is force-ignited.
    pub fn add_heat(&mut self, target: TargetId, rate_per_second: f32, elapsed: f32, hooks: &SceneHooks) {
        if !self.accepts_stimulus(target, hooks) {
            trace!(%target, "Heat ignored");
            return;
        }

        let Some(record) = self.targets.get_mut(&target) else {
            return;
        };
        let runtime = record.runtime.get_or_insert_with(TargetRuntimeState::default);
        runtime.heat_level += (rate_per_second * elapsed).max(0.0);

        if runtime.heat_level >= record.heat_threshold {
            runtime.heat_level = 0.0;
            debug!(%target, "Heat threshold reached");
            self.force_ignite(target, hooks);
        }
    }

    /// Attach the marker and schedule the fire visual
    fn begin_sequence(&mut self, target: TargetId) {
        let Some(record) = self.targets.get_mut(&target) else {
            return;
        };
        let runtime = record.runtime.get_or_insert_with(TargetRuntimeState::default);
        runtime.ignition_state = IgnitionState::Igniting;
        runtime.spark_count = 0;

        let due = self.now + f64::from(self.config.ignition_delay);
        self.wakes.schedule(
            due,
            IgnitionWake {
                target,
                next: IgnitionState::Burning,
            },
        );
        debug!(%target, due, "Ignition sequence started");
    }

    // ------------------------------------------------------------------
    // Scheduled resumptions
    // ------------------------------------------------------------------

    /// Move the clock to `now` and run every wake that has come due.
    ///
    /// Wakes chain off their own due time, so a burn always lasts exactly
    /// `fire_duration` of simulated time regardless of step size.
    pub fn advance(&mut self, now: f64, hooks: &mut SceneHooks) -> Vec<IgnitionEvent> {
        self.now = self.now.max(now);

        let mut events = Vec::new();
        while let Some((due, wake)) = self.wakes.pop_due(self.now) {
            match wake.next {
                IgnitionState::Burning => self.kindle(wake.target, due, hooks, &mut events),
                IgnitionState::Extinguished => self.burn_out(wake.target, due, hooks, &mut events),
                IgnitionState::Unburnt | IgnitionState::Igniting => {}
            }
        }
        events
    }

    fn kindle(&mut self, target: TargetId, at: f64, hooks: &mut SceneHooks, events: &mut Vec<IgnitionEvent>) {
        if !hooks.objects.contains(target) {
            debug!(%target, "Target left the scene before igniting");
            return;
        }
        // No geometry to anchor the fire on: handled like a target that left the scene
        let Some(anchor) = hooks
            .geometry
            .top_surface_point(target, self.config.top_fallback_offset)
        else {
            debug!(%target, "Target has no position to anchor a fire, dropping ignition");
            return;
        };
        let Some(record) = self.targets.get_mut(&target) else {
            return;
        };

        record.fire_effect = Some(hooks.effects.spawn_persistent(EffectKind::Fire, anchor));
        if let Some(runtime) = record.runtime.as_mut() {
            runtime.ignition_state = IgnitionState::Burning;
        }

        self.fire_state.escalate(&self.smoke, hooks.environment.as_mut());

        let permanent = self.permanent.contains(&target);
        debug!(%target, at, permanent, "Target ignited");
        events.push(IgnitionEvent::Ignited { target, anchor, at });

        if !permanent {
            self.wakes.schedule(
                at + f64::from(self.config.fire_duration),
                IgnitionWake {
                    target,
                    next: IgnitionState::Extinguished,
                },
            );
        }
    }

    fn burn_out(&mut self, target: TargetId, at: f64, hooks: &mut SceneHooks, events: &mut Vec<IgnitionEvent>) {
        if !hooks.objects.contains(target) {
            debug!(%target, "Target left the scene while burning");
            return;
        }
        let Some(record) = self.targets.get_mut(&target) else {
            return;
        };

        if let Some(handle) = record.fire_effect.take() {
            hooks.effects.stop_and_remove(handle);
        }
        if let Some(runtime) = record.runtime.as_mut() {
            runtime.ignition_state = IgnitionState::Extinguished;
        }
        hooks.objects.remove(target);

        debug!(%target, at, "Target burnt out");
        events.push(IgnitionEvent::Extinguished { target, at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SandboxScene;
    use approx::assert_relative_eq;

    fn setup(count: u32) -> (IgnitionAuthority, SandboxScene, SceneHooks) {
        let scene = SandboxScene::new(2.0);
        let mut authority =
            IgnitionAuthority::new(IgnitionConfig::default(), SmokeConfig::default()).unwrap();
        for i in 0..count {
            let id = TargetId(i);
            scene.add_object(id, Vec3::new(i as f32 * 10.0, 0.0, 0.0));
            authority.register_flammable(id, 100.0).unwrap();
        }
        let hooks = SceneHooks::from_scene(&scene);
        (authority, scene, hooks)
    }

    #[test]
    fn test_five_sparks_ignite() {
        let (mut authority, scene, mut hooks) = setup(1);
        let target = TargetId(0);

        for _ in 0..4 {
            authority.try_spark(target, &mut hooks);
        }
        assert_eq!(authority.ignition_state(target), Some(IgnitionState::Unburnt));
        assert_eq!(authority.runtime_state(target).unwrap().spark_count(), 4);

        authority.try_spark(target, &mut hooks);
        assert_eq!(authority.ignition_state(target), Some(IgnitionState::Igniting));
        assert_eq!(authority.runtime_state(target).unwrap().spark_count(), 0);

        // Sixth spark is ignored: no counter change, no new spark visual
        authority.try_spark(target, &mut hooks);
        assert_eq!(authority.runtime_state(target).unwrap().spark_count(), 0);
        assert_eq!(scene.transient_count(EffectKind::Spark), 5);
        assert_eq!(authority.pending_wakes(), 1);
    }

    #[test]
    fn test_spark_visual_at_fallback_anchor() {
        let (mut authority, scene, mut hooks) = setup(1);
        authority.try_spark(TargetId(0), &mut hooks);

        let effects = scene.transient_effects();
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].position, Vec3::new(0.0, 0.0, 0.5));
        assert_relative_eq!(effects[0].duration, 2.5);
    }

    #[test]
    fn test_heat_accumulates_rate_times_elapsed() {
        let (mut authority, _scene, hooks) = setup(1);
        let target = TargetId(0);

        for expected in [25.0, 50.0, 75.0] {
            authority.add_heat(target, 25.0, 1.0, &hooks);
            assert_relative_eq!(authority.runtime_state(target).unwrap().heat_level(), expected);
            assert_eq!(authority.ignition_state(target), Some(IgnitionState::Unburnt));
        }

        authority.add_heat(target, 25.0, 1.0, &hooks);
        assert_eq!(authority.runtime_state(target).unwrap().heat_level(), 0.0);
        assert_eq!(authority.ignition_state(target), Some(IgnitionState::Igniting));
    }

    #[test]
    fn test_unregistered_target_ignored() {
        let (mut authority, scene, mut hooks) = setup(0);
        let stray = TargetId(99);
        scene.add_object(stray, Vec3::zeros());

        authority.try_spark(stray, &mut hooks);
        authority.add_heat(stray, 1000.0, 1.0, &hooks);
        authority.force_ignite(stray, &hooks);

        assert_eq!(authority.ignition_state(stray), None);
        assert_eq!(authority.pending_wakes(), 0);
        assert_eq!(scene.transient_count(EffectKind::Spark), 0);
    }

    #[test]
    fn test_mixed_stimuli_ignite_once() {
        let (mut authority, _scene, mut hooks) = setup(1);
        let target = TargetId(0);

        authority.add_heat(target, 60.0, 1.0, &hooks);
        for _ in 0..3 {
            authority.try_spark(target, &mut hooks);
        }
        authority.force_ignite(target, &hooks);
        authority.add_heat(target, 60.0, 1.0, &hooks);
        for _ in 0..10 {
            authority.try_spark(target, &mut hooks);
        }
        authority.force_ignite(target, &hooks);

        assert_eq!(authority.pending_wakes(), 1);
    }

    #[test]
    fn test_sequence_burns_and_removes() {
        let (mut authority, scene, mut hooks) = setup(1);
        let target = TargetId(0);

        authority.force_ignite(target, &hooks);
        assert!(authority.advance(0.5, &mut hooks).is_empty());

        let events = authority.advance(1.0, &mut hooks);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], IgnitionEvent::Ignited { at, .. } if at == 1.0));
        assert_eq!(authority.ignition_state(target), Some(IgnitionState::Burning));
        assert_eq!(authority.fire_state().fire_count(), 1);
        assert_eq!(scene.active_persistent(EffectKind::Fire).len(), 1);

        assert!(authority.advance(20.9, &mut hooks).is_empty());
        let events = authority.advance(21.0, &mut hooks);
        assert_eq!(events, vec![IgnitionEvent::Extinguished { target, at: 21.0 }]);
        assert_eq!(authority.ignition_state(target), Some(IgnitionState::Extinguished));
        assert_eq!(scene.removed(), vec![target]);
        assert!(scene.active_persistent(EffectKind::Fire).is_empty());
    }

    #[test]
    fn test_permanent_target_never_removed() {
        let (mut authority, scene, mut hooks) = setup(1);
        let target = TargetId(0);
        authority.register_permanent(target);

        authority.force_ignite(target, &hooks);
        authority.advance(1.0, &mut hooks);
        authority.advance(10_000.0, &mut hooks);

        assert_eq!(authority.ignition_state(target), Some(IgnitionState::Burning));
        assert!(scene.removed().is_empty());
        assert_eq!(authority.pending_wakes(), 0);
    }

    #[test]
    fn test_orphaned_wake_has_no_side_effects() {
        let (mut authority, scene, mut hooks) = setup(1);
        let target = TargetId(0);

        authority.force_ignite(target, &hooks);
        scene.destroy(target);

        let events = authority.advance(5.0, &mut hooks);
        assert!(events.is_empty());
        assert_eq!(authority.fire_state().fire_count(), 0);
        assert!(scene.active_persistent(EffectKind::Fire).is_empty());
        assert_eq!(authority.pending_wakes(), 0);
    }

    #[test]
    fn test_ignition_without_anchor_is_dropped() {
        struct NoGeometry;

        impl crate::scene::SceneGeometry for NoGeometry {
            fn bounds(&self, _target: TargetId) -> Option<crate::scene::Aabb> {
                None
            }

            fn position(&self, _target: TargetId) -> Option<Vec3> {
                None
            }
        }

        let scene = SandboxScene::default();
        let target = TargetId(0);
        scene.add_object(target, Vec3::zeros());
        let mut authority =
            IgnitionAuthority::new(IgnitionConfig::default(), SmokeConfig::default()).unwrap();
        authority.register_flammable(target, 100.0).unwrap();
        let mut hooks = SceneHooks::new(
            Box::new(scene.clone()),
            Box::new(NoGeometry),
            Box::new(scene.clone()),
            Box::new(scene.clone()),
            Box::new(scene.clone()),
        );

        authority.force_ignite(target, &hooks);
        assert!(authority.advance(5.0, &mut hooks).is_empty());

        assert_eq!(authority.fire_state().fire_count(), 0);
        assert_eq!(authority.pending_wakes(), 0);
        assert!(scene.active_persistent(EffectKind::Fire).is_empty());
        assert!(scene.removed().is_empty());
    }

    #[test]
    fn test_target_removed_while_burning() {
        let (mut authority, scene, mut hooks) = setup(1);
        let target = TargetId(0);

        authority.force_ignite(target, &hooks);
        authority.advance(1.0, &mut hooks);
        scene.destroy(target);

        assert!(authority.advance(30.0, &mut hooks).is_empty());
        assert!(scene.removed().is_empty());
        assert_eq!(authority.ignition_state(target), Some(IgnitionState::Burning));
    }

    #[test]
    fn test_registration_rejects_bad_thresholds() {
        let (mut authority, _scene, _hooks) = setup(0);

        assert_eq!(
            authority.register(&FlammableTarget {
                target: TargetId(1),
                heat_threshold: None,
            }),
            Err(IgnitionError::MissingHeatThreshold(TargetId(1)))
        );
        assert!(matches!(
            authority.register_flammable(TargetId(2), 0.0),
            Err(IgnitionError::InvalidHeatThreshold { .. })
        ));
        assert!(authority.register_flammable(TargetId(3), f32::NAN).is_err());
        assert!(!authority.is_flammable(TargetId(1)));
        assert!(!authority.is_flammable(TargetId(2)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = IgnitionConfig {
            sparks_before_ignition: 0,
            ..Default::default()
        };
        assert!(IgnitionAuthority::new(config, SmokeConfig::default()).is_err());

        let config = IgnitionConfig {
            fire_duration: -1.0,
            ..Default::default()
        };
        assert!(IgnitionAuthority::new(config, SmokeConfig::default()).is_err());
    }
}
