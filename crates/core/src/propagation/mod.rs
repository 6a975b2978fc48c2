//! Stimulus sources feeding the ignition authority
//!
//! - [`HeatPropagator`] - one per burning target, applies flat-rate heat to
//!   everything flammable within a radius on a fixed interval
//! - [`StochasticSparkSource`] - throws sparks (or the occasional forced
//!   ignition) at random candidates, one at a time behind a cooldown
//!
//! Neither keeps any state about individual targets; they only own their
//! timers and call into [`IgnitionAuthority`](crate::ignition::IgnitionAuthority).

pub mod heat;
pub mod spark;

pub use heat::{HeatPropagator, HeatSpreadConfig};
pub use spark::{SparkAttempt, SparkSourceConfig, StochasticSparkSource};
