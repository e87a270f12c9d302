#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scouting system: resource discovery, predator spotting, territory facts
//! and group-hunt initiation.

use std::collections::BTreeSet;

use colony_wars_core::{
    AntId, AntType, ColonyId, Event, Position, PreyId, TableName, TaskType, TerritoryId,
};
use colony_wars_world::{balance, entities, query, routing, ExploredTerritory, TickContext, World};
use tracing::{debug, info};

/// Edge length of an exploration cell.
pub const TERRITORY_CELL_SIZE: f32 = 50.0;
/// Distance within which a scout spots predators.
pub const PREDATOR_DETECTION_RADIUS: f32 = 100.0;
/// Distance within which a scout can call in a group hunt.
pub const HUNT_SIGHT_RADIUS: f32 = 80.0;
/// Minimum health for prey to be worth a group hunt.
pub const LARGE_PREY_HEALTH: f32 = 50.0;
/// Idle fighters required before a group hunt is called.
pub const MIN_HUNTERS: usize = 2;
/// Fighters dispatched to a group hunt.
pub const MAX_HUNTERS: usize = 3;

/// Map cell containing the position.
#[must_use]
pub fn territory_cell(position: Position) -> (i32, i32) {
    (
        (position.x / TERRITORY_CELL_SIZE).floor() as i32,
        (position.y / TERRITORY_CELL_SIZE).floor() as i32,
    )
}

/// Pure system that lets scouts reveal the map around them.
#[derive(Debug, Default)]
pub struct Scouting {
    explored: BTreeSet<(ColonyId, i32, i32)>,
}

impl Scouting {
    /// Creates the scouting system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every scout's sweep for the tick.
    pub fn handle(&mut self, world: &mut World, ctx: TickContext, out: &mut Vec<Event>) {
        let scouts: Vec<(AntId, ColonyId, Position, f32)> = world
            .ants
            .iter()
            .filter(|ant| ant.ant_type == AntType::Scout)
            .map(|ant| {
                (
                    ant.id,
                    ant.colony_id,
                    ant.position,
                    balance::discovery_radius(ant.ant_trait),
                )
            })
            .collect();
        if scouts.is_empty() {
            return;
        }

        self.explored.clear();
        self.explored.extend(
            world
                .territories
                .iter()
                .map(|fact| (fact.colony_id, fact.cell_x, fact.cell_y)),
        );

        for (scout, colony_id, position, radius) in scouts {
            discover_nearby(world, scout, colony_id, position, radius, ctx, out);
            spot_predators(world, position);
            if position.is_surface() {
                self.record_territory(world, colony_id, position, ctx);
                call_group_hunt(world, colony_id, position);
            }
        }
    }

    fn record_territory(
        &mut self,
        world: &mut World,
        colony_id: ColonyId,
        position: Position,
        ctx: TickContext,
    ) {
        let (cell_x, cell_y) = territory_cell(position);
        if !self.explored.insert((colony_id, cell_x, cell_y)) {
            return;
        }
        let has_resources = world
            .resources
            .iter()
            .any(|node| territory_cell(node.position) == (cell_x, cell_y));
        let threat_level = world
            .predators
            .iter()
            .filter(|predator| {
                predator.position.planar_distance(position) <= PREDATOR_DETECTION_RADIUS
            })
            .count() as u32;
        let id = TerritoryId::new(world.next_id(TableName::ExploredTerritory));
        world.territories.insert(ExploredTerritory {
            id,
            colony_id,
            cell_x,
            cell_y,
            has_resources,
            has_threats: threat_level > 0,
            threat_level,
            explored_at: ctx.now,
        });
        debug!(colony = colony_id.get(), cell_x, cell_y, "territory_explored");
    }
}

fn discover_nearby(
    world: &mut World,
    scout: AntId,
    colony_id: ColonyId,
    position: Position,
    radius: f32,
    ctx: TickContext,
    out: &mut Vec<Event>,
) {
    let unseen: Vec<_> = world
        .resources
        .iter()
        .filter(|node| node.position.planar_distance(position) <= radius)
        .filter(|node| !query::is_discovered(world, colony_id, node.id))
        .map(|node| node.id)
        .collect();
    for resource_id in unseen {
        if entities::discover_resource(world, colony_id, resource_id, ctx.now, out) {
            info!(
                scout = scout.get(),
                colony = colony_id.get(),
                resource = resource_id.get(),
                "scout_discovered_resource"
            );
        }
    }
}

fn spot_predators(world: &mut World, position: Position) {
    let unspotted: Vec<_> = world
        .predators
        .iter()
        .filter(|predator| {
            !predator.scout_detected
                && predator.position.planar_distance(position) <= PREDATOR_DETECTION_RADIUS
        })
        .map(|predator| predator.id)
        .collect();
    for predator_id in unspotted {
        let _ = world
            .predators
            .update(&predator_id, |predator| predator.scout_detected = true);
        info!(predator = predator_id.get(), "predator_spotted");
    }
}

fn call_group_hunt(world: &mut World, colony_id: ColonyId, position: Position) {
    let Some((prey_id, prey_position)) = world
        .prey
        .iter()
        .filter(|prey| {
            prey.hunted_by.is_none()
                && prey.health >= LARGE_PREY_HEALTH
                && prey.position.planar_distance(position) <= HUNT_SIGHT_RADIUS
        })
        .map(|prey| (prey.id, prey.position))
        .next()
    else {
        return;
    };

    let fighters = query::idle_fighters_near(world, colony_id, prey_position);
    if fighters.len() < MIN_HUNTERS {
        return;
    }
    let dispatched = dispatch_hunters(world, &fighters, prey_id, prey_position);
    if dispatched == 0 {
        return;
    }
    let _ = world
        .prey
        .update(&prey_id, |prey| prey.hunted_by = Some(colony_id));
    info!(
        colony = colony_id.get(),
        prey = prey_id.get(),
        hunters = dispatched,
        "group_hunt_called"
    );
}

fn dispatch_hunters(
    world: &mut World,
    fighters: &[AntId],
    prey_id: PreyId,
    prey_position: Position,
) -> usize {
    let mut dispatched = 0;
    for fighter in fighters.iter().take(MAX_HUNTERS) {
        if routing::route_ant(world, *fighter, prey_position, TaskType::Fighting).is_err() {
            continue;
        }
        let _ = world
            .ants
            .update(fighter, |ant| ant.hunt_target_id = Some(prey_id));
        dispatched += 1;
    }
    dispatched
}
