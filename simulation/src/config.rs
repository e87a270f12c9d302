//! Tunables of the tick engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 0x00C0_10A1;

/// Configuration of a [`crate::Simulation`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated milliseconds covered by one tick.
    pub tick_interval_ms: u64,
    /// Seed of the simulation RNG.
    pub rng_seed: u64,
    /// Whether a fresh world is seeded with resources and wildlife.
    pub generate_world: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            rng_seed: DEFAULT_SEED,
            generate_world: true,
        }
    }
}

impl SimulationConfig {
    /// Length of one tick. Never zero.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
