//! Read-only views over the world used by commands, systems and adapters.

use colony_wars_core::{
    AntId, AntType, ChamberType, ColonyId, PlayerId, Position, ResourceId, Timestamp,
};

use crate::{
    balance::{self, ENERGY_LIFETIME_SECS, SURFACE_DRAIN_MULTIPLIER},
    Ant, Chamber, Colony, ResourceNode, World,
};

/// Colony owned by `caller`, if it exists.
#[must_use]
pub fn owned_colony<'world>(
    world: &'world World,
    caller: &PlayerId,
    colony_id: ColonyId,
) -> Option<&'world Colony> {
    world
        .colonies
        .get(&colony_id)
        .filter(|colony| &colony.owner == caller)
}

/// Reports whether the ant belongs to a colony owned by `caller`.
#[must_use]
pub fn owns_ant(world: &World, caller: &PlayerId, ant: &Ant) -> bool {
    owned_colony(world, caller, ant.colony_id).is_some()
}

/// Colonies owned by the identity.
#[must_use]
pub fn colonies_of<'world>(world: &'world World, owner: &PlayerId) -> Vec<&'world Colony> {
    world.colonies.query(|colony| &colony.owner == owner)
}

/// Ants of a colony.
#[must_use]
pub fn colony_ants(world: &World, colony_id: ColonyId) -> Vec<&Ant> {
    world.ants.query(|ant| ant.colony_id == colony_id)
}

/// Chambers of a colony.
#[must_use]
pub fn colony_chambers(world: &World, colony_id: ColonyId) -> Vec<&Chamber> {
    world
        .chambers
        .query(|chamber| chamber.colony_id == colony_id)
}

/// Number of ants of the caste in the colony.
#[must_use]
pub fn count_ants(world: &World, colony_id: ColonyId, ant_type: AntType) -> usize {
    world
        .ants
        .iter()
        .filter(|ant| ant.colony_id == colony_id && ant.ant_type == ant_type)
        .count()
}

/// Population derived from the ant table.
#[must_use]
pub fn derived_population(world: &World, colony_id: ColonyId) -> u32 {
    world
        .ants
        .iter()
        .filter(|ant| ant.colony_id == colony_id)
        .map(|ant| balance::population_cost(ant.ant_type))
        .sum()
}

/// Total population capacity of the colony's chambers.
#[must_use]
pub fn population_capacity(world: &World, colony_id: ColonyId) -> u32 {
    world
        .chambers
        .iter()
        .filter(|chamber| chamber.colony_id == colony_id)
        .map(|chamber| chamber.capacity)
        .sum()
}

/// Reports whether the colony owns a chamber of the provided kind.
#[must_use]
pub fn has_chamber(world: &World, colony_id: ColonyId, chamber_type: ChamberType) -> bool {
    world
        .chambers
        .iter()
        .any(|chamber| chamber.colony_id == colony_id && chamber.chamber_type == chamber_type)
}

/// Nearest burrow entrance of the colony.
#[must_use]
pub fn nearest_entrance(world: &World, colony_id: ColonyId, from: Position) -> Option<&Chamber> {
    nearest(
        world
            .chambers
            .iter()
            .filter(|chamber| chamber.colony_id == colony_id && chamber.is_entrance),
        from,
        |chamber| chamber.position,
    )
}

/// Deep chamber of the colony's burrow.
#[must_use]
pub fn deep_chamber(world: &World, colony_id: ColonyId) -> Option<&Chamber> {
    world.chambers.iter().find(|chamber| {
        chamber.colony_id == colony_id
            && chamber.chamber_type == ChamberType::Burrow
            && !chamber.is_entrance
    })
}

/// Where carried cargo is dropped off: the nearest storage, otherwise the deep chamber.
#[must_use]
pub fn drop_off_point(world: &World, colony_id: ColonyId, from: Position) -> Option<Position> {
    nearest(
        world.chambers.iter().filter(|chamber| {
            chamber.colony_id == colony_id && chamber.chamber_type == ChamberType::Storage
        }),
        from,
        |chamber| chamber.position,
    )
    .or_else(|| deep_chamber(world, colony_id))
    .map(|chamber| chamber.position)
}

/// Chamber of the colony whose bounds contain the position.
#[must_use]
pub fn chamber_at(world: &World, colony_id: ColonyId, position: Position) -> Option<&Chamber> {
    world.chambers.iter().find(|chamber| {
        chamber.colony_id == colony_id && !chamber.is_entrance && chamber.contains(position)
    })
}

/// Reports whether the colony knows about the resource node.
#[must_use]
pub fn is_discovered(world: &World, colony_id: ColonyId, resource_id: ResourceId) -> bool {
    world
        .discoveries
        .iter()
        .any(|fact| fact.colony_id == colony_id && fact.resource_id == resource_id)
}

/// Nearest non-empty node the colony has discovered.
#[must_use]
pub fn nearest_discovered_resource(
    world: &World,
    colony_id: ColonyId,
    from: Position,
) -> Option<&ResourceNode> {
    nearest(
        world
            .resources
            .iter()
            .filter(|node| node.amount > 0.0 && is_discovered(world, colony_id, node.id)),
        from,
        |node| node.position,
    )
}

/// Nearest discovered non-empty node within `radius` of the position.
#[must_use]
pub fn discovered_resource_near(
    world: &World,
    colony_id: ColonyId,
    position: Position,
    radius: f32,
) -> Option<&ResourceNode> {
    nearest_discovered_resource(world, colony_id, position)
        .filter(|node| node.position.distance(position) <= radius)
}

/// Energy of an ant as a percentage, derived from time since its last meal.
#[must_use]
pub fn energy(ant: &Ant, now: Timestamp) -> f32 {
    let elapsed = now.seconds_since(ant.last_fed_at);
    let multiplier = if ant.on_surface() {
        SURFACE_DRAIN_MULTIPLIER
    } else {
        1.0
    };
    (100.0 - elapsed * (100.0 / ENERGY_LIFETIME_SECS) * multiplier).clamp(0.0, 100.0)
}

/// Idle soldiers and majors of the colony, nearest to `to` first.
#[must_use]
pub fn idle_fighters_near(world: &World, colony_id: ColonyId, to: Position) -> Vec<AntId> {
    let mut fighters: Vec<&Ant> = world
        .ants
        .iter()
        .filter(|ant| {
            ant.colony_id == colony_id && ant.ant_type.is_fighter() && ant.is_available()
        })
        .collect();
    fighters.sort_by(|a, b| {
        a.position
            .distance(to)
            .total_cmp(&b.position.distance(to))
            .then(a.id.cmp(&b.id))
    });
    fighters.into_iter().map(|ant| ant.id).collect()
}

/// Weighted colony score recorded when a young queen departs.
#[must_use]
pub fn colony_score(colony: &Colony) -> f32 {
    colony.food
        + colony.water
        + colony.minerals * 2.0
        + colony.jelly * 3.0
        + colony.population as f32 * 10.0
}

/// Element of `items` closest to `from`; ties resolve to the earliest element.
pub fn nearest<'a, T>(
    items: impl IntoIterator<Item = &'a T>,
    from: Position,
    position: impl Fn(&T) -> Position,
) -> Option<&'a T>
where
    T: 'a,
{
    let mut best: Option<(&'a T, f32)> = None;
    for item in items {
        let distance = position(item).distance(from);
        if best.map_or(true, |(_, closest)| distance < closest) {
            best = Some((item, distance));
        }
    }
    best.map(|(item, _)| item)
}
