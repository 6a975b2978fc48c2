//! Stochastic spark emitter
//!
//! Wakes after a random delay drawn uniformly from `[min_delay, max_delay]`.
//! If its cooldown gate is open it picks one candidate uniformly from the
//! light and heavy pools, shows a spark on it and either sparks it or (with
//! probability `random_ignition_chance`) force-ignites it, then closes the
//! gate for `spark_cooldown` seconds. Wakes that find the gate closed are
//! skipped outright; nothing queues up behind the gate.
//!
//! A pick that lands on a burning or vanished candidate is wasted but leaves
//! the gate open.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core_types::TargetId;
use crate::error::{ensure_non_negative, ensure_positive, ensure_probability, IgnitionError};
use crate::ignition::IgnitionAuthority;
use crate::scene::{EffectKind, SceneHooks};
use crate::schedule::Scheduler;

/// Spark emitter tuning and candidate pools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparkSourceConfig {
    /// Shortest wait between emission attempts (seconds)
    pub min_delay: f32,
    /// Longest wait between emission attempts (seconds)
    pub max_delay: f32,
    /// Probability an emission force-ignites instead of sparking
    pub random_ignition_chance: f32,
    /// Seconds the gate stays closed after an emission
    pub spark_cooldown: f32,
    /// Lifetime of the emitter's own spark visual
    pub spark_visual_duration: f32,
    pub light_targets: Vec<TargetId>,
    pub heavy_targets: Vec<TargetId>,
    /// Object the emitter is mounted on; it shuts off when that object burns out
    pub host: Option<TargetId>,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SparkSourceConfig {
    fn default() -> Self {
        Self {
            min_delay: 0.5,
            max_delay: 2.0,
            random_ignition_chance: 0.1,
            spark_cooldown: 2.5,
            spark_visual_duration: 2.5,
            light_targets: Vec::new(),
            heavy_targets: Vec::new(),
            host: None,
            seed: None,
        }
    }
}

impl SparkSourceConfig {
    /// Check value ranges
    ///
    /// # Errors
    /// Returns `InvalidConfig` for negative delays, `min_delay > max_delay`,
    /// a zero `max_delay`, or a chance outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), IgnitionError> {
        ensure_non_negative("spark.min_delay", self.min_delay)?;
        ensure_positive("spark.max_delay", self.max_delay)?;
        if self.min_delay > self.max_delay {
            return Err(IgnitionError::invalid_config(
                "spark.min_delay",
                format!("must not exceed max_delay ({} > {})", self.min_delay, self.max_delay),
            ));
        }
        ensure_probability("spark.random_ignition_chance", self.random_ignition_chance)?;
        ensure_non_negative("spark.spark_cooldown", self.spark_cooldown)?;
        ensure_non_negative("spark.spark_visual_duration", self.spark_visual_duration)?;
        Ok(())
    }

    fn pool_len(&self) -> usize {
        self.light_targets.len() + self.heavy_targets.len()
    }

    /// Index into the concatenation of the light and heavy pools
    fn pool_get(&self, index: usize) -> Option<TargetId> {
        let light = self.light_targets.len();
        if index < light {
            self.light_targets.get(index).copied()
        } else {
            self.heavy_targets.get(index - light).copied()
        }
    }
}

/// One emission that reached the ignition authority
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparkAttempt {
    pub target: TargetId,
    /// `true` for a forced ignition, `false` for a plain spark
    pub forced: bool,
    pub at: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SparkWake {
    Emit,
    ReopenGate,
}

/// Random spark emitter gated by a single cooldown flag
#[derive(Debug)]
pub struct StochasticSparkSource {
    config: SparkSourceConfig,
    rng: StdRng,
    can_ignite: bool,
    enabled: bool,
    wakes: Scheduler<SparkWake>,
}

impl StochasticSparkSource {
    /// Create a source whose first emission is scheduled relative to `start`
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the configuration fails validation.
    pub fn new(config: SparkSourceConfig, start: f64) -> Result<Self, IgnitionError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let mut source = Self {
            config,
            rng,
            can_ignite: true,
            enabled: true,
            wakes: Scheduler::new(),
        };
        let first = start + source.draw_delay();
        source.wakes.schedule(first, SparkWake::Emit);
        Ok(source)
    }

    #[must_use]
    pub fn config(&self) -> &SparkSourceConfig {
        &self.config
    }

    /// Object this source is mounted on, if any
    #[must_use]
    pub fn host(&self) -> Option<TargetId> {
        self.config.host
    }

    /// Whether the cooldown gate is open
    #[must_use]
    pub fn is_gate_open(&self) -> bool {
        self.can_ignite
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stop emitting for good (the host object burnt out)
    pub fn disable(&mut self) {
        if self.enabled {
            debug!(host = ?self.config.host, "Spark source disabled");
        }
        self.enabled = false;
    }

    fn draw_delay(&mut self) -> f64 {
        f64::from(
            self.rng
                .random_range(self.config.min_delay..=self.config.max_delay),
        )
    }

    /// Run every wake due at or before `now`
    pub fn tick(
        &mut self,
        now: f64,
        authority: &mut IgnitionAuthority,
        hooks: &mut SceneHooks,
    ) -> Vec<SparkAttempt> {
        let mut attempts = Vec::new();
        while let Some((due, wake)) = self.wakes.pop_due(now) {
            match wake {
                SparkWake::ReopenGate => self.can_ignite = true,
                SparkWake::Emit => {
                    if !self.enabled {
                        continue;
                    }
                    if let Some(attempt) = self.emit(due, authority, hooks) {
                        attempts.push(attempt);
                    }
                    let next = due + self.draw_delay();
                    self.wakes.schedule(next, SparkWake::Emit);
                }
            }
        }
        attempts
    }

    fn emit(
        &mut self,
        at: f64,
        authority: &mut IgnitionAuthority,
        hooks: &mut SceneHooks,
    ) -> Option<SparkAttempt> {
        if !self.can_ignite {
            trace!(at, "Spark source cooling down");
            return None;
        }

        let pool_len = self.config.pool_len();
        if pool_len == 0 {
            return None;
        }
        let target = self.config.pool_get(self.rng.random_range(0..pool_len))?;
        if !hooks.objects.contains(target) || authority.is_marked(target) {
            trace!(%target, "Spark candidate unavailable");
            return None;
        }

        if let Some(anchor) = hooks
            .geometry
            .top_surface_point(target, authority.config().top_fallback_offset)
        {
            hooks
                .effects
                .spawn_transient(EffectKind::Spark, anchor, self.config.spark_visual_duration);
        }

        let forced = self
            .rng
            .random_bool(f64::from(self.config.random_ignition_chance));
        if forced {
            authority.force_ignite(target, hooks);
        } else {
            authority.try_spark(target, hooks);
        }

        self.can_ignite = false;
        self.wakes
            .schedule(at + f64::from(self.config.spark_cooldown), SparkWake::ReopenGate);

        debug!(%target, forced, at, "Spark emitted");
        Some(SparkAttempt { target, forced, at })
    }
}
