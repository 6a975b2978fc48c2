//! Fire system orchestration
//!
//! `FireSystem` owns the simulated clock and everything that advances with it:
//! - the ignition authority (per-target state and smoke)
//! - one heat propagator per burning target
//! - any number of stochastic spark sources
//! - observer focus tracking
//!
//! Each [`FireSystem::step`] runs, in order: due ignition wakes, spark
//! sources, heat propagators, wakes made due by those stimuli, and finally
//! observer focus. All mutation happens on the caller's thread; hosts running
//! several threads must serialize access to the whole system.

mod observer;

pub use observer::ObserverFocusConfig;
use observer::ObserverFocus;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core_types::{FlammableTarget, IgnitionState, TargetId, Vec3};
use crate::error::IgnitionError;
use crate::ignition::{IgnitionAuthority, IgnitionConfig, IgnitionEvent, SmokeConfig};
use crate::propagation::{HeatPropagator, HeatSpreadConfig, SparkSourceConfig, StochasticSparkSource};
use crate::scene::{Environment, SceneGeometry, SceneHooks, SceneObjects, SpatialQuery, VisualEffects};

/// Complete fire system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireConfig {
    pub ignition: IgnitionConfig,
    pub smoke: SmokeConfig,
    pub heat: HeatSpreadConfig,
    pub observer: ObserverFocusConfig,
}

impl FireConfig {
    /// Validate every section
    ///
    /// # Errors
    /// Returns the first `InvalidConfig` found.
    pub fn validate(&self) -> Result<(), IgnitionError> {
        self.ignition.validate()?;
        self.smoke.validate()?;
        self.heat.validate()?;
        self.observer.validate()?;
        Ok(())
    }
}

/// Snapshot of the fire system for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FireStats {
    pub time: f64,
    pub unburnt: usize,
    pub igniting: usize,
    pub burning: usize,
    pub extinguished: usize,
    pub fire_count: u32,
    pub smoke_level: f32,
    pub active_heat_sources: usize,
    /// Emissions by spark sources that reached a candidate
    pub spark_emissions: u32,
    /// Emissions that force-ignited their candidate instead of sparking it
    pub forced_ignitions: u32,
}

/// Assembles a [`FireSystem`], checking collaborators and configuration up front
pub struct FireSystemBuilder {
    config: FireConfig,
    spatial: Option<Box<dyn SpatialQuery>>,
    geometry: Option<Box<dyn SceneGeometry>>,
    effects: Option<Box<dyn VisualEffects>>,
    environment: Option<Box<dyn Environment>>,
    objects: Option<Box<dyn SceneObjects>>,
    flammables: Vec<FlammableTarget>,
    permanent: Vec<TargetId>,
    spark_sources: Vec<SparkSourceConfig>,
}

impl FireSystemBuilder {
    #[must_use]
    pub fn new(config: FireConfig) -> Self {
        Self {
            config,
            spatial: None,
            geometry: None,
            effects: None,
            environment: None,
            objects: None,
            flammables: Vec::new(),
            permanent: Vec::new(),
            spark_sources: Vec::new(),
        }
    }

    pub fn spatial(mut self, spatial: impl SpatialQuery + 'static) -> Self {
        self.spatial = Some(Box::new(spatial));
        self
    }

    pub fn geometry(mut self, geometry: impl SceneGeometry + 'static) -> Self {
        self.geometry = Some(Box::new(geometry));
        self
    }

    pub fn effects(mut self, effects: impl VisualEffects + 'static) -> Self {
        self.effects = Some(Box::new(effects));
        self
    }

    pub fn environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Some(Box::new(environment));
        self
    }

    pub fn objects(mut self, objects: impl SceneObjects + 'static) -> Self {
        self.objects = Some(Box::new(objects));
        self
    }

    /// Use one shared scene handle for every collaborator
    pub fn scene<S>(self, scene: &S) -> Self
    where
        S: SpatialQuery + SceneGeometry + VisualEffects + Environment + SceneObjects + Clone + 'static,
    {
        self.spatial(scene.clone())
            .geometry(scene.clone())
            .effects(scene.clone())
            .environment(scene.clone())
            .objects(scene.clone())
    }

    pub fn flammable(mut self, target: TargetId, heat_threshold: f32) -> Self {
        self.flammables.push(FlammableTarget::new(target, heat_threshold));
        self
    }

    /// Add declared flammable targets (for example from a deserialized manifest)
    pub fn flammables(mut self, declarations: impl IntoIterator<Item = FlammableTarget>) -> Self {
        self.flammables.extend(declarations);
        self
    }

    pub fn permanent(mut self, target: TargetId) -> Self {
        self.permanent.push(target);
        self
    }

    pub fn spark_source(mut self, config: SparkSourceConfig) -> Self {
        self.spark_sources.push(config);
        self
    }

    /// Validate and assemble the system
    ///
    /// # Errors
    /// - `MissingCollaborator` if any scene collaborator was not supplied
    /// - `InvalidConfig` for out-of-range configuration
    /// - `MissingHeatThreshold` / `InvalidHeatThreshold` for bad flammable declarations
    pub fn build(self) -> Result<FireSystem, IgnitionError> {
        let mut hooks = SceneHooks::new(
            self.spatial
                .ok_or(IgnitionError::MissingCollaborator("spatial query"))?,
            self.geometry
                .ok_or(IgnitionError::MissingCollaborator("scene geometry"))?,
            self.effects
                .ok_or(IgnitionError::MissingCollaborator("visual effects"))?,
            self.environment
                .ok_or(IgnitionError::MissingCollaborator("environment"))?,
            self.objects
                .ok_or(IgnitionError::MissingCollaborator("scene objects"))?,
        );

        let config = self.config;
        config.validate()?;

        let mut authority = IgnitionAuthority::new(config.ignition.clone(), config.smoke.clone())?;
        for declaration in &self.flammables {
            authority.register(declaration)?;
        }
        for &target in &self.permanent {
            authority.register_permanent(target);
        }

        let spark_sources = self
            .spark_sources
            .into_iter()
            .map(|source| StochasticSparkSource::new(source, 0.0))
            .collect::<Result<Vec<_>, _>>()?;

        hooks
            .environment
            .set_ambient_haze(&config.smoke.initial_haze());

        info!(
            flammables = self.flammables.len(),
            permanent = self.permanent.len(),
            spark_sources = spark_sources.len(),
            "Fire system initialized"
        );

        Ok(FireSystem {
            observer: ObserverFocus::new(config.observer.clone()),
            config,
            hooks,
            authority,
            propagators: Vec::new(),
            spark_sources,
            spark_emissions: 0,
            forced_ignitions: 0,
            time: 0.0,
        })
    }
}

/// Scene fire simulation driven by a discrete clock
pub struct FireSystem {
    config: FireConfig,
    hooks: SceneHooks,
    authority: IgnitionAuthority,
    propagators: Vec<HeatPropagator>,
    spark_sources: Vec<StochasticSparkSource>,
    spark_emissions: u32,
    forced_ignitions: u32,
    observer: ObserverFocus,
    time: f64,
}

impl FireSystem {
    /// Start assembling a fire system
    #[must_use]
    pub fn builder(config: FireConfig) -> FireSystemBuilder {
        FireSystemBuilder::new(config)
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Returns the ignition transitions that happened during the step.
    pub fn step(&mut self, dt: f32) -> Vec<IgnitionEvent> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.time += f64::from(dt);

        let mut events = Vec::new();
        self.run_wakes(&mut events);
        self.prune_orphans();

        for source in &mut self.spark_sources {
            for attempt in source.tick(self.time, &mut self.authority, &mut self.hooks) {
                self.spark_emissions += 1;
                if attempt.forced {
                    self.forced_ignitions += 1;
                }
            }
        }

        for propagator in &mut self.propagators {
            propagator.tick(self.time, &self.config.heat, &mut self.authority, &self.hooks);
        }

        // Stimuli above may have scheduled wakes that are already due
        self.run_wakes(&mut events);

        self.observer.apply(self.hooks.environment.as_mut());
        events
    }

    fn run_wakes(&mut self, events: &mut Vec<IgnitionEvent>) {
        let new_events = self.authority.advance(self.time, &mut self.hooks);
        for event in &new_events {
            match *event {
                IgnitionEvent::Ignited { target, anchor, at } => {
                    self.propagators.push(HeatPropagator::new(target, anchor, at));
                }
                IgnitionEvent::Extinguished { target, .. } => {
                    self.propagators.retain(|p| p.source() != target);
                    for source in &mut self.spark_sources {
                        if source.host() == Some(target) {
                            source.disable();
                        }
                    }
                }
            }
        }
        events.extend(new_events);
    }

    /// Drop heat sources and hosted emitters whose object left the scene externally
    fn prune_orphans(&mut self) {
        let objects = &self.hooks.objects;
        let before = self.propagators.len();
        self.propagators.retain(|p| objects.contains(p.source()));
        if self.propagators.len() != before {
            debug!(dropped = before - self.propagators.len(), "Dropped orphaned heat sources");
        }

        for source in &mut self.spark_sources {
            if source.host().is_some_and(|host| !objects.contains(host)) {
                source.disable();
            }
        }
    }

    // ------------------------------------------------------------------
    // External stimuli
    // ------------------------------------------------------------------

    /// Spark a target from outside the system (for example a lightning strike)
    pub fn try_spark(&mut self, target: TargetId) {
        self.authority.try_spark(target, &mut self.hooks);
    }

    pub fn force_ignite(&mut self, target: TargetId) {
        self.authority.force_ignite(target, &self.hooks);
    }

    /// Apply heat from an external source; `elapsed` is the time since that source's last call
    pub fn add_heat(&mut self, target: TargetId, rate_per_second: f32, elapsed: f32) {
        self.authority
            .add_heat(target, rate_per_second, elapsed, &self.hooks);
    }

    /// Update (or clear) the observer position used for focus tracking
    pub fn set_observer(&mut self, observer: Option<Vec3>) {
        self.observer.set_observer(observer);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Simulated seconds since the system was built
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[must_use]
    pub fn config(&self) -> &FireConfig {
        &self.config
    }

    #[must_use]
    pub fn authority(&self) -> &IgnitionAuthority {
        &self.authority
    }

    #[must_use]
    pub fn heat_propagators(&self) -> &[HeatPropagator] {
        &self.propagators
    }

    #[must_use]
    pub fn spark_sources(&self) -> &[StochasticSparkSource] {
        &self.spark_sources
    }

    #[must_use]
    pub fn stats(&self) -> FireStats {
        let mut stats = FireStats {
            time: self.time,
            fire_count: self.authority.fire_state().fire_count(),
            smoke_level: self.authority.fire_state().smoke_level(),
            active_heat_sources: self.propagators.len(),
            spark_emissions: self.spark_emissions,
            forced_ignitions: self.forced_ignitions,
            ..FireStats::default()
        };
        for (_, state) in self.authority.states() {
            match state {
                IgnitionState::Unburnt => stats.unburnt += 1,
                IgnitionState::Igniting => stats.igniting += 1,
                IgnitionState::Burning => stats.burning += 1,
                IgnitionState::Extinguished => stats.extinguished += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SandboxScene;

    #[test]
    fn test_missing_collaborator_rejected() {
        let scene = SandboxScene::default();
        let result = FireSystem::builder(FireConfig::default())
            .spatial(scene.clone())
            .geometry(scene.clone())
            .environment(scene.clone())
            .objects(scene)
            .build();

        assert!(matches!(
            result,
            Err(IgnitionError::MissingCollaborator("visual effects"))
        ));
    }

    #[test]
    fn test_missing_threshold_rejected() {
        let scene = SandboxScene::default();
        let result = FireSystem::builder(FireConfig::default())
            .scene(&scene)
            .flammables([FlammableTarget {
                target: TargetId(4),
                heat_threshold: None,
            }])
            .build();

        assert!(matches!(
            result,
            Err(IgnitionError::MissingHeatThreshold(TargetId(4)))
        ));
    }

    #[test]
    fn test_build_pushes_initial_haze() {
        let scene = SandboxScene::default();
        let system = FireSystem::builder(FireConfig::default())
            .scene(&scene)
            .build()
            .unwrap();

        let haze = scene.haze().unwrap();
        assert!(!haze.enabled);
        assert_eq!(haze.end_distance, 60.0);
        assert_eq!(system.stats(), FireStats::default());
    }

    #[test]
    fn test_observer_focus_applied_each_step() {
        let scene = SandboxScene::default();
        let config = FireConfig {
            observer: ObserverFocusConfig {
                blur_center: Some(Vec3::zeros()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut system = FireSystem::builder(config).scene(&scene).build().unwrap();

        system.step(0.1);
        assert_eq!(scene.focus_distance(), None);

        system.set_observer(Some(Vec3::new(50.0, 0.0, 0.0)));
        system.step(0.1);
        assert_eq!(scene.focus_distance(), Some(20.0));
    }

    #[test]
    fn test_stats_count_states() {
        let scene = SandboxScene::default();
        for i in 0..3 {
            scene.add_object(TargetId(i), Vec3::new(i as f32 * 20.0, 0.0, 0.0));
        }
        let mut system = FireSystem::builder(FireConfig::default())
            .scene(&scene)
            .flammable(TargetId(0), 100.0)
            .flammable(TargetId(1), 100.0)
            .flammable(TargetId(2), 100.0)
            .build()
            .unwrap();

        system.force_ignite(TargetId(0));
        system.step(1.0);
        system.force_ignite(TargetId(1));

        let stats = system.stats();
        assert_eq!(stats.unburnt, 1);
        assert_eq!(stats.igniting, 1);
        assert_eq!(stats.burning, 1);
        assert_eq!(stats.fire_count, 1);
        assert_eq!(stats.active_heat_sources, 1);
    }

    #[test]
    fn test_stats_count_spark_emissions() {
        let scene = SandboxScene::default();
        scene.add_object(TargetId(0), Vec3::zeros());
        scene.add_object(TargetId(1), Vec3::new(50.0, 0.0, 0.0));
        let mut system = FireSystem::builder(FireConfig::default())
            .scene(&scene)
            .flammable(TargetId(0), 100.0)
            .flammable(TargetId(1), 100.0)
            .spark_source(SparkSourceConfig {
                min_delay: 1.0,
                max_delay: 1.0,
                random_ignition_chance: 1.0,
                spark_cooldown: 0.0,
                light_targets: vec![TargetId(0), TargetId(1)],
                seed: Some(5),
                ..Default::default()
            })
            .build()
            .unwrap();

        system.step(1.0);
        let stats = system.stats();
        assert_eq!(stats.spark_emissions, 1);
        assert_eq!(stats.forced_ignitions, 1);
        assert_eq!(stats.igniting, 1);
    }
}
