//! Persisted form of the world and the identity filtering applied to it.
//!
//! The document shape is `{ "data": { "<Table>": [...] }, "nextId": {...} }`.
//! Loading keeps only the caller's players and colonies plus rows that depend
//! on those colonies; shared tables load unfiltered. Saving merges the
//! caller's rows into whatever other identities already stored.

use std::collections::BTreeSet;

use colony_wars_core::{ColonyId, PlayerId, TableName};
use serde::{Deserialize, Serialize};

use crate::{
    store::{Row, Table},
    Ant, Battle, Chamber, Colony, DiscoveredResource, ExploredTerritory, IdCounters, Larva,
    Obstacle, Pheromone, Player, Predator, Prey, ResourceNode, Tunnel, World,
};

/// Every table of the world as plain row vectors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotData {
    /// Player rows.
    #[serde(default)]
    pub player: Vec<Player>,
    /// Colony rows.
    #[serde(default)]
    pub colony: Vec<Colony>,
    /// Ant rows.
    #[serde(default)]
    pub ant: Vec<Ant>,
    /// Tunnel rows.
    #[serde(default)]
    pub tunnel: Vec<Tunnel>,
    /// Chamber rows.
    #[serde(default)]
    pub chamber: Vec<Chamber>,
    /// Resource node rows.
    #[serde(default)]
    pub resource_node: Vec<ResourceNode>,
    /// Pheromone rows.
    #[serde(default)]
    pub pheromone: Vec<Pheromone>,
    /// Battle rows.
    #[serde(default)]
    pub battle: Vec<Battle>,
    /// Explored territory rows.
    #[serde(default)]
    pub explored_territory: Vec<ExploredTerritory>,
    /// Discovered resource rows.
    #[serde(default)]
    pub discovered_resource: Vec<DiscoveredResource>,
    /// Obstacle rows.
    #[serde(default)]
    pub obstacle: Vec<Obstacle>,
    /// Prey rows.
    #[serde(default)]
    pub prey: Vec<Prey>,
    /// Predator rows.
    #[serde(default)]
    pub predator: Vec<Predator>,
    /// Larva rows.
    #[serde(default)]
    pub larva: Vec<Larva>,
}

/// Serializable image of the whole world.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Table contents.
    pub data: SnapshotData,
    /// Next identifier per table.
    #[serde(rename = "nextId", default)]
    pub next_id: IdCounters,
}

impl WorldSnapshot {
    /// Captures the current world.
    #[must_use]
    pub fn capture(world: &World) -> Self {
        Self {
            data: SnapshotData {
                player: world.players.to_vec(),
                colony: world.colonies.to_vec(),
                ant: world.ants.to_vec(),
                tunnel: world.tunnels.to_vec(),
                chamber: world.chambers.to_vec(),
                resource_node: world.resources.to_vec(),
                pheromone: world.pheromones.to_vec(),
                battle: world.battles.to_vec(),
                explored_territory: world.territories.to_vec(),
                discovered_resource: world.discoveries.to_vec(),
                obstacle: world.obstacles.to_vec(),
                prey: world.prey.to_vec(),
                predator: world.predators.to_vec(),
                larva: world.larvae.to_vec(),
            },
            next_id: world.counters().clone(),
        }
    }

    /// Rebuilds a world from the snapshot.
    ///
    /// Counters are raised past every stored id so that ids are never reused
    /// even if the stored counters lag behind the rows.
    #[must_use]
    pub fn restore(self) -> World {
        let data = self.data;
        let mut world = World {
            players: Table::from_rows(data.player),
            colonies: Table::from_rows(data.colony),
            ants: Table::from_rows(data.ant),
            tunnels: Table::from_rows(data.tunnel),
            chambers: Table::from_rows(data.chamber),
            resources: Table::from_rows(data.resource_node),
            pheromones: Table::from_rows(data.pheromone),
            battles: Table::from_rows(data.battle),
            territories: Table::from_rows(data.explored_territory),
            discoveries: Table::from_rows(data.discovered_resource),
            obstacles: Table::from_rows(data.obstacle),
            prey: Table::from_rows(data.prey),
            predators: Table::from_rows(data.predator),
            larvae: Table::from_rows(data.larva),
            ..World::default()
        };
        world.counters_mut().merge_max(&self.next_id);

        let observed: Vec<(TableName, u32)> = [
            max_key(&world.colonies, |id| id.get()),
            max_key(&world.ants, |id| id.get()),
            max_key(&world.tunnels, |id| id.get()),
            max_key(&world.chambers, |id| id.get()),
            max_key(&world.resources, |id| id.get()),
            max_key(&world.pheromones, |id| id.get()),
            max_key(&world.battles, |id| id.get()),
            max_key(&world.territories, |id| id.get()),
            max_key(&world.discoveries, |id| id.get()),
            max_key(&world.obstacles, |id| id.get()),
            max_key(&world.prey, |id| id.get()),
            max_key(&world.predators, |id| id.get()),
            max_key(&world.larvae, |id| id.get()),
        ]
        .into_iter()
        .flatten()
        .collect();
        for (table, id) in observed {
            world.counters_mut().observe(table, id);
        }
        world
    }

    /// Keeps only what `identity` may see: its player and colonies, rows
    /// depending on those colonies, and every shared table.
    #[must_use]
    pub fn filter_for(mut self, identity: &PlayerId) -> Self {
        let data = &mut self.data;
        data.player.retain(|player| &player.identity == identity);
        data.colony.retain(|colony| &colony.owner == identity);
        let kept: BTreeSet<ColonyId> = data.colony.iter().map(|colony| colony.id).collect();
        data.ant.retain(|row| kept.contains(&row.colony_id));
        data.chamber.retain(|row| kept.contains(&row.colony_id));
        data.explored_territory
            .retain(|row| kept.contains(&row.colony_id));
        data.discovered_resource
            .retain(|row| kept.contains(&row.colony_id));
        data.larva.retain(|row| kept.contains(&row.colony_id));
        data.pheromone.retain(|row| kept.contains(&row.colony_id));
        self
    }

    /// Merges the caller's current world into a previously stored snapshot.
    ///
    /// Rows owned by other identities are kept from `stored`; the caller's
    /// rows and every shared table come from `self`. Counters take the
    /// maximum of both sides.
    #[must_use]
    pub fn merge_into(self, stored: WorldSnapshot, identity: &PlayerId) -> Self {
        let mine = self.data;
        let theirs = stored.data;
        let foreign: BTreeSet<ColonyId> = theirs
            .colony
            .iter()
            .filter(|colony| &colony.owner != identity)
            .map(|colony| colony.id)
            .collect();
        let local: BTreeSet<ColonyId> = mine.colony.iter().map(|colony| colony.id).collect();
        let is_foreign = |colony_id: &ColonyId| foreign.contains(colony_id) && !local.contains(colony_id);

        let mut next_id = self.next_id;
        next_id.merge_max(&stored.next_id);

        let data = SnapshotData {
            player: merge_rows(
                theirs
                    .player
                    .into_iter()
                    .filter(|player| &player.identity != identity),
                mine.player,
            ),
            colony: merge_rows(
                theirs
                    .colony
                    .into_iter()
                    .filter(|colony| is_foreign(&colony.id)),
                mine.colony,
            ),
            ant: merge_rows(
                theirs
                    .ant
                    .into_iter()
                    .filter(|row| is_foreign(&row.colony_id)),
                mine.ant,
            ),
            chamber: merge_rows(
                theirs
                    .chamber
                    .into_iter()
                    .filter(|row| is_foreign(&row.colony_id)),
                mine.chamber,
            ),
            explored_territory: merge_rows(
                theirs
                    .explored_territory
                    .into_iter()
                    .filter(|row| is_foreign(&row.colony_id)),
                mine.explored_territory,
            ),
            discovered_resource: merge_rows(
                theirs
                    .discovered_resource
                    .into_iter()
                    .filter(|row| is_foreign(&row.colony_id)),
                mine.discovered_resource,
            ),
            larva: merge_rows(
                theirs
                    .larva
                    .into_iter()
                    .filter(|row| is_foreign(&row.colony_id)),
                mine.larva,
            ),
            pheromone: merge_rows(
                theirs
                    .pheromone
                    .into_iter()
                    .filter(|row| is_foreign(&row.colony_id)),
                mine.pheromone,
            ),
            tunnel: mine.tunnel,
            resource_node: mine.resource_node,
            battle: mine.battle,
            obstacle: mine.obstacle,
            prey: mine.prey,
            predator: mine.predator,
        };
        Self { data, next_id }
    }
}

fn merge_rows<R: Row>(kept: impl Iterator<Item = R>, replacement: Vec<R>) -> Vec<R> {
    let mut table = Table::from_rows(kept);
    for row in replacement {
        table.insert(row);
    }
    table.to_vec()
}

fn max_key<R: Row>(table: &Table<R>, raw: impl Fn(&R::Key) -> u32) -> Option<(TableName, u32)> {
    table.keys().iter().map(raw).max().map(|id| (R::TABLE, id))
}

/// Full rows of one table as a JSON array.
pub fn table_json(world: &World, table: TableName) -> serde_json::Result<serde_json::Value> {
    match table {
        TableName::Player => serde_json::to_value(world.players.to_vec()),
        TableName::Colony => serde_json::to_value(world.colonies.to_vec()),
        TableName::Ant => serde_json::to_value(world.ants.to_vec()),
        TableName::Tunnel => serde_json::to_value(world.tunnels.to_vec()),
        TableName::Chamber => serde_json::to_value(world.chambers.to_vec()),
        TableName::ResourceNode => serde_json::to_value(world.resources.to_vec()),
        TableName::Pheromone => serde_json::to_value(world.pheromones.to_vec()),
        TableName::Battle => serde_json::to_value(world.battles.to_vec()),
        TableName::ExploredTerritory => serde_json::to_value(world.territories.to_vec()),
        TableName::DiscoveredResource => serde_json::to_value(world.discoveries.to_vec()),
        TableName::Obstacle => serde_json::to_value(world.obstacles.to_vec()),
        TableName::Prey => serde_json::to_value(world.prey.to_vec()),
        TableName::Predator => serde_json::to_value(world.predators.to_vec()),
        TableName::Larva => serde_json::to_value(world.larvae.to_vec()),
    }
}
