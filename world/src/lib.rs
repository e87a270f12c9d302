#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Colony Wars.
//!
//! The [`World`] owns one keyed [`Table`] per entity kind plus the monotonic
//! id counters. Player intent enters through [`apply`]; the tick systems
//! mutate the tables directly through the helpers in [`entities`] and
//! [`routing`], which keep colony population in step with the ant table.

use std::{collections::BTreeMap, time::Duration};

use colony_wars_core::{TableName, Timestamp};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub mod balance;
mod commands;
pub mod entities;
pub mod generation;
pub mod query;
pub mod records;
pub mod routing;
pub mod snapshot;
pub mod store;

pub use commands::{
    apply, attack_target, build_chamber, command_ants, create_colony, create_player,
    deposit_resources, dig_tunnel, feed_larva, lay_pheromone, nuptial_flight, respawn_as_queen,
    spawn_larva, toggle_colony_ai,
};
pub use records::{
    Ant, Battle, Cargo, Chamber, Colony, DiscoveredResource, ExploredTerritory, FoundingStage,
    Larva, Obstacle, PendingFounding, Pheromone, Player, Predator, Prey, ResourceNode,
    StashReason, StashedOrder, TaskTimer, ThreatAlert, TimerKind, Tunnel,
};
pub use snapshot::WorldSnapshot;
pub use store::{Row, Table};

/// Random number generator driving every stochastic gameplay decision.
pub type SimRng = ChaCha8Rng;

/// Creates the simulation RNG from a seed.
#[must_use]
pub fn seeded_rng(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Time information handed to each tick system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickContext {
    /// Simulated time at the end of the tick.
    pub now: Timestamp,
    /// Simulated time covered by the tick.
    pub dt: Duration,
}

impl TickContext {
    /// Creates a tick context.
    #[must_use]
    pub const fn new(now: Timestamp, dt: Duration) -> Self {
        Self { now, dt }
    }

    /// Tick length in seconds.
    #[must_use]
    pub fn dt_secs(&self) -> f32 {
        self.dt.as_secs_f32()
    }
}

/// Next identifier to hand out per table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdCounters(BTreeMap<TableName, u32>);

impl IdCounters {
    /// Allocates the next identifier for the table. Identifiers start at one.
    pub fn next(&mut self, table: TableName) -> u32 {
        let counter = self.0.entry(table).or_insert(1);
        let id = *counter;
        *counter = counter.saturating_add(1);
        id
    }

    /// Identifier the next allocation for the table will return.
    #[must_use]
    pub fn peek(&self, table: TableName) -> u32 {
        self.0.get(&table).copied().unwrap_or(1)
    }

    /// Ensures future allocations for the table exceed `id`.
    pub fn observe(&mut self, table: TableName, id: u32) {
        let counter = self.0.entry(table).or_insert(1);
        if *counter <= id {
            *counter = id.saturating_add(1);
        }
    }

    /// Raises every counter to at least the matching counter in `other`.
    pub fn merge_max(&mut self, other: &IdCounters) {
        for (table, value) in &other.0 {
            let counter = self.0.entry(*table).or_insert(1);
            *counter = (*counter).max(*value);
        }
    }
}

/// Represents the authoritative Colony Wars world state.
#[derive(Clone, Debug, Default)]
pub struct World {
    /// Registered players.
    pub players: Table<Player>,
    /// Colonies.
    pub colonies: Table<Colony>,
    /// Ants.
    pub ants: Table<Ant>,
    /// Tunnels.
    pub tunnels: Table<Tunnel>,
    /// Chambers.
    pub chambers: Table<Chamber>,
    /// Resource nodes.
    pub resources: Table<ResourceNode>,
    /// Pheromone markers.
    pub pheromones: Table<Pheromone>,
    /// Battle records.
    pub battles: Table<Battle>,
    /// Explored map cells.
    pub territories: Table<ExploredTerritory>,
    /// Discovered resource facts.
    pub discoveries: Table<DiscoveredResource>,
    /// Terrain obstacles.
    pub obstacles: Table<Obstacle>,
    /// Prey animals.
    pub prey: Table<Prey>,
    /// Predators.
    pub predators: Table<Predator>,
    /// Larvae.
    pub larvae: Table<Larva>,
    counters: IdCounters,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next identifier for the table.
    pub fn next_id(&mut self, table: TableName) -> u32 {
        self.counters.next(table)
    }

    /// Current id counters.
    #[must_use]
    pub fn counters(&self) -> &IdCounters {
        &self.counters
    }

    pub(crate) fn counters_mut(&mut self) -> &mut IdCounters {
        &mut self.counters
    }

    /// Returns the tables changed since the last call and clears their flags.
    pub fn take_dirty_tables(&mut self) -> Vec<TableName> {
        let flags = [
            self.players.take_dirty(),
            self.colonies.take_dirty(),
            self.ants.take_dirty(),
            self.tunnels.take_dirty(),
            self.chambers.take_dirty(),
            self.resources.take_dirty(),
            self.pheromones.take_dirty(),
            self.battles.take_dirty(),
            self.territories.take_dirty(),
            self.discoveries.take_dirty(),
            self.obstacles.take_dirty(),
            self.prey.take_dirty(),
            self.predators.take_dirty(),
            self.larvae.take_dirty(),
        ];
        TableName::ALL
            .into_iter()
            .zip(flags)
            .filter_map(|(table, dirty)| dirty.then_some(table))
            .collect()
    }
}
