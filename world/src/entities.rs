//! Entity lifecycle helpers shared by commands and tick systems.
//!
//! Ants are only ever created through [`spawn_ant`] and removed through
//! [`remove_ant`], which keeps `Colony::population` equal to the summed
//! population cost of the colony's ants.

use colony_wars_core::{
    AntId, AntTrait, AntType, ChamberId, ChamberType, ColonyId, DeathCause, Event, LarvaId,
    PlayerId, Position, PredatorId, PreyId, Rejection, ResourceId, ResourceType, TableName,
    TaskType, Timestamp,
};
use rand::{seq::SliceRandom, Rng};
use tracing::{debug, info};

use crate::{
    balance::{self, unit_stats},
    query, routing, Ant, Cargo, Chamber, Colony, DiscoveredResource, FoundingStage, Larva,
    PendingFounding, Player, ResourceNode, SimRng, TaskTimer, TimerKind, World,
};

/// Inserts a new ant and charges its population cost to the colony.
pub fn spawn_ant(
    world: &mut World,
    colony_id: ColonyId,
    ant_type: AntType,
    position: Position,
    ant_trait: Option<AntTrait>,
    now: Timestamp,
) -> AntId {
    let stats = unit_stats(ant_type);
    let (health, speed, attack) = balance::with_trait(stats, ant_trait);
    let id = AntId::new(world.next_id(TableName::Ant));
    let matures_at =
        (ant_type == AntType::YoungQueen).then(|| now.after(balance::YOUNG_QUEEN_MATURATION));

    world.ants.insert(Ant {
        id,
        colony_id,
        ant_type,
        position,
        health,
        max_health: health,
        carrying: None,
        task: TaskType::Idle,
        target: None,
        speed,
        attack,
        last_fed_at: now,
        ant_trait,
        matures_at,
        final_target: None,
        final_task: None,
        stashed_order: None,
        waiting_at_entrance: false,
        wait_ticks: 0,
        wounded: false,
        hunt_target_id: None,
        defend_target_id: None,
        attack_ready_at: now,
        timer: None,
        created_at: now,
    });
    let _ = world.colonies.update(&colony_id, |colony| {
        colony.population += stats.population_cost;
    });
    id
}

/// Removes an ant, releases its population slots and clears references to it.
pub fn remove_ant(
    world: &mut World,
    ant_id: AntId,
    cause: DeathCause,
    out_events: &mut Vec<Event>,
) -> Option<Ant> {
    let ant = world.ants.remove(&ant_id)?;
    let cost = balance::population_cost(ant.ant_type);
    let _ = world.colonies.update(&ant.colony_id, |colony| {
        colony.population = colony.population.saturating_sub(cost);
    });
    for predator in world.predators.iter_mut() {
        if predator.target_ant_id == Some(ant_id) {
            predator.target_ant_id = None;
        }
    }

    match cause {
        DeathCause::Starvation => {
            info!(ant = ant_id.get(), colony = ant.colony_id.get(), "ant_starved");
        }
        DeathCause::Combat => {
            info!(ant = ant_id.get(), colony = ant.colony_id.get(), "ant_killed");
        }
        DeathCause::NuptialFlight | DeathCause::ColonyCollapse => {
            debug!(ant = ant_id.get(), ?cause, "ant_removed");
        }
    }
    out_events.push(Event::AntDied {
        colony: ant.colony_id,
        ant: ant_id,
        cause,
    });
    Some(ant)
}

/// Removes a colony and every row that depends on it.
pub fn remove_colony(world: &mut World, colony_id: ColonyId) -> Option<Colony> {
    let colony = world.colonies.remove(&colony_id)?;
    let _ = world.ants.retain(|ant| ant.colony_id != colony_id);
    let _ = world.chambers.retain(|chamber| chamber.colony_id != colony_id);
    let _ = world.larvae.retain(|larva| larva.colony_id != colony_id);
    let _ = world.tunnels.retain(|tunnel| tunnel.colony_id != colony_id);
    let _ = world.pheromones.retain(|marker| marker.colony_id != colony_id);
    let _ = world
        .territories
        .retain(|fact| fact.colony_id != colony_id);
    let _ = world
        .discoveries
        .retain(|fact| fact.colony_id != colony_id);
    for prey in world.prey.iter_mut() {
        if prey.hunted_by == Some(colony_id) {
            prey.hunted_by = None;
        }
    }
    Some(colony)
}

/// Founds a colony whose queen starts digging the burrow at `position`.
///
/// The caller must have verified that the owner has a player record.
pub fn found_colony(
    world: &mut World,
    owner: &PlayerId,
    position: Position,
    inherited_trait: Option<AntTrait>,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> ColonyId {
    let generations = world
        .players
        .get(owner)
        .map_or(0, |player| player.generations_survived);
    let bonus_jelly = (5.0 * generations as f32).min(50.0);
    let bonus_water = (3.0 * generations as f32).min(30.0);
    let origin = Position::surface(position.x, position.y);

    let colony_id = ColonyId::new(world.next_id(TableName::Colony));
    world.colonies.insert(Colony {
        id: colony_id,
        owner: owner.clone(),
        queen_id: None,
        food: balance::SEED_FOOD,
        water: balance::SEED_WATER + bonus_water,
        minerals: 0.0,
        jelly: balance::SEED_JELLY + bonus_jelly,
        larvae: 0,
        population: 0,
        ai_enabled: true,
        territory_radius: balance::SEED_TERRITORY_RADIUS,
        inherited_trait,
        generation: generations + 1,
        stage: FoundingStage::Digging,
        origin,
        casualties: 0,
        general_retreat: false,
        last_death_at: None,
        threat: None,
        resources_gathered: 0.0,
        created_at: now,
    });

    let queen_id = spawn_ant(
        world,
        colony_id,
        AntType::Queen,
        origin,
        inherited_trait,
        now,
    );
    let _ = world.ants.update(&queen_id, |queen| {
        queen.task = TaskType::Building;
        queen.timer = Some(TaskTimer {
            kind: TimerKind::FoundBurrow,
            due_at: now.after(balance::BURROW_DIG_DURATION),
        });
    });
    let _ = world.colonies.update(&colony_id, |colony| {
        colony.queen_id = Some(queen_id);
    });
    let _ = world.players.update(owner, |player| {
        player.colonies_founded += 1;
        player.pending_founding = None;
    });

    info!(
        colony = colony_id.get(),
        owner = %owner,
        x = origin.x,
        y = origin.y,
        generation = generations + 1,
        "colony_founded"
    );
    out_events.push(Event::ColonyFounded {
        colony: colony_id,
        owner: owner.clone(),
    });
    colony_id
}

/// Completes the founding dig: entrance and deep chamber, first larva and
/// the resource nodes the colony starts out knowing.
pub fn complete_burrow(
    world: &mut World,
    queen_id: AntId,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) {
    let Some(colony_id) = world.ants.get(&queen_id).map(|queen| queen.colony_id) else {
        return;
    };
    let Some(origin) = world.colonies.get(&colony_id).map(|colony| colony.origin) else {
        return;
    };
    if query::deep_chamber(world, colony_id).is_some() {
        let _ = world.ants.update(&queen_id, |queen| {
            queen.timer = None;
            queen.go_idle();
        });
        return;
    }

    let _entrance = insert_chamber(
        world,
        colony_id,
        ChamberType::Burrow,
        origin.at_depth(balance::ENTRANCE_DEPTH),
        true,
        now,
        out_events,
    );
    let deep_position = origin.at_depth(balance::DEEP_CHAMBER_DEPTH);
    let deep = insert_chamber(
        world,
        colony_id,
        ChamberType::Burrow,
        deep_position,
        false,
        now,
        out_events,
    );

    let _ = world.ants.update(&queen_id, |queen| {
        queen.position = deep_position;
        queen.timer = None;
        queen.go_idle();
    });
    let _ = world.colonies.update(&colony_id, |colony| {
        colony.jelly = (colony.jelly - balance::BURROW_JELLY_COST).max(0.0);
        colony.territory_radius = balance::SEED_TERRITORY_RADIUS;
        colony.stage = FoundingStage::Bootstrapping {
            first_worker_at: now.after(balance::FIRST_WORKER_DELAY),
        };
    });
    let _ = insert_larva(world, colony_id, Some(deep), deep_position, now, out_events);

    let mut nearby: Vec<(ResourceId, f32)> = world
        .resources
        .iter()
        .map(|node| (node.id, node.position.planar_distance(origin)))
        .filter(|(_, distance)| *distance <= balance::FOUNDING_DISCOVERY_RADIUS)
        .collect();
    nearby.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    for (resource_id, _) in nearby.into_iter().take(balance::FOUNDING_DISCOVERY_COUNT) {
        if discover_resource(world, colony_id, resource_id, now, out_events) {
            info!(
                colony = colony_id.get(),
                resource = resource_id.get(),
                "auto_discovered"
            );
        }
    }

    info!(colony = colony_id.get(), "burrow_completed");
    out_events.push(Event::BurrowCompleted { colony: colony_id });
}

/// Inserts a chamber with the stats of its kind.
pub fn insert_chamber(
    world: &mut World,
    colony_id: ColonyId,
    chamber_type: ChamberType,
    position: Position,
    is_entrance: bool,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> ChamberId {
    let stats = balance::chamber_stats(chamber_type, is_entrance);
    let id = ChamberId::new(world.next_id(TableName::Chamber));
    world.chambers.insert(Chamber {
        id,
        colony_id,
        chamber_type,
        position,
        level: 1,
        capacity: stats.capacity,
        larvae_capacity: stats.larvae_capacity,
        larvae_count: 0,
        is_entrance,
        created_at: now,
    });
    out_events.push(Event::ChamberBuilt {
        colony: colony_id,
        chamber: id,
        chamber_type,
    });
    id
}

/// Inserts a larva and bumps both larvae counters.
pub fn insert_larva(
    world: &mut World,
    colony_id: ColonyId,
    chamber_id: Option<ChamberId>,
    position: Position,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> LarvaId {
    let id = LarvaId::new(world.next_id(TableName::Larva));
    world.larvae.insert(Larva {
        id,
        colony_id,
        chamber_id,
        position,
        created_at: now,
    });
    if let Some(chamber_id) = chamber_id {
        let _ = world.chambers.update(&chamber_id, |chamber| {
            chamber.larvae_count += 1;
        });
    }
    let _ = world.colonies.update(&colony_id, |colony| colony.larvae += 1);
    out_events.push(Event::LarvaLaid {
        colony: colony_id,
        larva: id,
    });
    id
}

/// Raises the colony's oldest larva into an ant of the requested caste.
///
/// Ownership is not checked here; callers authorise first.
pub fn raise_larva(
    world: &mut World,
    colony_id: ColonyId,
    ant_type: AntType,
    position: Position,
    now: Timestamp,
    rng: &mut SimRng,
    out_events: &mut Vec<Event>,
) -> Result<AntId, Rejection> {
    let colony = world
        .colonies
        .get(&colony_id)
        .ok_or(Rejection::ColonyMissing(colony_id))?;
    let stats = unit_stats(ant_type);
    let base_cost = stats
        .jelly_cost
        .ok_or(Rejection::NotRaisable { ant_type })?;

    let larva = world
        .larvae
        .iter()
        .filter(|larva| {
            larva.colony_id == colony_id
                && query::chamber_at(world, colony_id, larva.position).is_some()
        })
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
        .map(|larva| (larva.id, larva.chamber_id))
        .ok_or(Rejection::NoLarvae)?;

    let capacity = query::population_capacity(world, colony_id);
    let required = colony.population + stats.population_cost;
    if required > capacity {
        return Err(Rejection::PopulationCapReached { capacity, required });
    }

    let (food_cost, water_cost) = if ant_type == AntType::YoungQueen {
        if !query::has_chamber(world, colony_id, ChamberType::ThroneRoom) {
            return Err(Rejection::ThroneRoomRequired);
        }
        (balance::YOUNG_QUEEN_FOOD, balance::YOUNG_QUEEN_WATER)
    } else {
        (0.0, 0.0)
    };
    check_stock(colony, ResourceType::Food, food_cost)?;
    check_stock(colony, ResourceType::Water, water_cost)?;

    let first_unit = !world
        .ants
        .iter()
        .any(|ant| ant.colony_id == colony_id && ant.ant_type != AntType::Queen);
    let jelly_cost = if ant_type == AntType::Worker && first_unit {
        balance::FIRST_WORKER_JELLY
    } else {
        base_cost
    };
    if colony.jelly < jelly_cost {
        return Err(Rejection::InsufficientJelly {
            needed: jelly_cost,
            available: colony.jelly,
        });
    }

    let (larva_id, chamber_id) = larva;
    let _ = world.larvae.remove(&larva_id);
    if let Some(chamber_id) = chamber_id {
        let _ = world.chambers.update(&chamber_id, |chamber| {
            chamber.larvae_count = chamber.larvae_count.saturating_sub(1);
        });
    }
    let _ = world.colonies.update(&colony_id, |colony| {
        colony.jelly -= jelly_cost;
        colony.food -= food_cost;
        colony.water -= water_cost;
        colony.larvae = colony.larvae.saturating_sub(1);
    });

    let ant_trait = balance::trait_pool(ant_type).choose(rng).copied();
    let ant_id = spawn_ant(world, colony_id, ant_type, position, ant_trait, now);
    info!(
        colony = colony_id.get(),
        ant = ant_id.get(),
        ?ant_type,
        ?ant_trait,
        jelly_cost,
        "ant_hatched"
    );
    out_events.push(Event::AntHatched {
        colony: colony_id,
        ant: ant_id,
        ant_type,
    });
    Ok(ant_id)
}

/// Starts a queen laying an egg; the larva appears when the lay timer expires.
///
/// Ownership is not checked here; callers authorise first.
pub fn start_laying(world: &mut World, queen_id: AntId, now: Timestamp) -> Result<(), Rejection> {
    let queen = world.ants.get(&queen_id).ok_or(Rejection::AntMissing(queen_id))?;
    if queen.ant_type != AntType::Queen {
        return Err(Rejection::WrongAntType {
            ant_type: queen.ant_type,
        });
    }
    if queen.timer.is_some() {
        return Err(Rejection::AlreadyLaying);
    }
    let colony = world
        .colonies
        .get(&queen.colony_id)
        .ok_or(Rejection::ColonyMissing(queen.colony_id))?;
    if colony.jelly < balance::LAY_EGG_JELLY {
        return Err(Rejection::InsufficientJelly {
            needed: balance::LAY_EGG_JELLY,
            available: colony.jelly,
        });
    }
    let chamber = query::chamber_at(world, queen.colony_id, queen.position)
        .filter(|chamber| chamber.larvae_capacity > 0)
        .ok_or(Rejection::NotInNursery)?;
    if !chamber.has_larvae_headroom() {
        return Err(Rejection::LarvaeCapacityReached);
    }

    let colony_id = queen.colony_id;
    let duration = balance::lay_egg_duration(queen.ant_trait);
    let _ = world.colonies.update(&colony_id, |colony| {
        colony.jelly -= balance::LAY_EGG_JELLY;
    });
    let _ = world.ants.update(&queen_id, |queen| {
        queen.go_idle();
        queen.task = TaskType::Depositing;
        queen.timer = Some(TaskTimer {
            kind: TimerKind::LayEgg,
            due_at: now.after(duration),
        });
    });
    debug!(queen = queen_id.get(), colony = colony_id.get(), "egg_laying_started");
    Ok(())
}

fn check_stock(colony: &Colony, resource: ResourceType, needed: f32) -> Result<(), Rejection> {
    let available = colony.stored(resource);
    if needed > 0.0 && available < needed {
        return Err(Rejection::InsufficientResources {
            resource,
            needed,
            available,
        });
    }
    Ok(())
}

/// Records that the colony knows about the node. Returns `false` if it already did.
pub fn discover_resource(
    world: &mut World,
    colony_id: ColonyId,
    resource_id: ResourceId,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> bool {
    if query::is_discovered(world, colony_id, resource_id) {
        return false;
    }
    let id = colony_wars_core::DiscoveryId::new(world.next_id(TableName::DiscoveredResource));
    world.discoveries.insert(DiscoveredResource {
        id,
        colony_id,
        resource_id,
        discovered_at: now,
    });
    out_events.push(Event::ResourceDiscovered {
        colony: colony_id,
        resource: resource_id,
    });
    true
}

/// Inserts a resource node.
pub fn insert_resource(
    world: &mut World,
    resource_type: ResourceType,
    position: Position,
    amount: f32,
    regeneration_rate: f32,
    from_prey: bool,
) -> ResourceId {
    let id = ResourceId::new(world.next_id(TableName::ResourceNode));
    world.resources.insert(ResourceNode {
        id,
        resource_type,
        position,
        amount,
        max_amount: amount,
        regeneration_rate,
        from_prey,
    });
    id
}

/// Converts dead prey into a food node and releases every ant hunting it.
pub fn kill_prey(
    world: &mut World,
    prey_id: PreyId,
    killer: ColonyId,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Option<ResourceId> {
    let prey = world.prey.remove(&prey_id)?;
    let hunters: Vec<(AntId, ColonyId)> = world
        .ants
        .iter()
        .filter(|ant| ant.hunt_target_id == Some(prey_id))
        .map(|ant| (ant.id, ant.colony_id))
        .collect();
    let group_hunt = prey.hunted_by.is_some() && hunters.len() >= 2;
    let amount = if group_hunt {
        prey.food_value * balance::GROUP_KILL_MULTIPLIER
    } else {
        prey.food_value
    };
    let node = insert_resource(world, ResourceType::Food, prey.position, amount, 0.0, true);

    let mut colonies: Vec<ColonyId> = hunters.iter().map(|(_, colony)| *colony).collect();
    colonies.push(killer);
    colonies.sort();
    colonies.dedup();
    for colony_id in colonies {
        let _ = discover_resource(world, colony_id, node, now, out_events);
    }
    for (ant_id, _) in &hunters {
        let _ = world.ants.update(ant_id, Ant::go_idle);
    }

    info!(
        prey = prey_id.get(),
        kind = ?prey.kind,
        hunters = hunters.len(),
        group_hunt,
        food = amount,
        "prey_killed"
    );
    out_events.push(Event::PreyKilled {
        prey: prey_id,
        node,
        group_hunt,
    });
    Some(node)
}

/// Removes a predator and stands down every ant defending against it.
pub fn remove_predator(
    world: &mut World,
    predator_id: PredatorId,
    killed: bool,
    out_events: &mut Vec<Event>,
) -> bool {
    if world.predators.remove(&predator_id).is_none() {
        return false;
    }
    for ant in world.ants.iter_mut() {
        if ant.defend_target_id == Some(predator_id) {
            ant.go_idle();
        }
    }
    if killed {
        info!(predator = predator_id.get(), "predator_killed");
        out_events.push(Event::PredatorKilled {
            predator: predator_id,
        });
    } else {
        info!(predator = predator_id.get(), "predator_departed");
        out_events.push(Event::PredatorDeparted {
            predator: predator_id,
        });
    }
    true
}

/// Drops off the ant's cargo into its colony's stores.
pub fn deposit_cargo(world: &mut World, ant_id: AntId, out_events: &mut Vec<Event>) -> Option<Cargo> {
    let (colony_id, cargo) = {
        let ant = world.ants.get_mut(&ant_id)?;
        let cargo = ant.carrying.take()?;
        (ant.colony_id, cargo)
    };
    let owner = world.colonies.get_mut(&colony_id).map(|colony| {
        colony.deposit(cargo.resource_type, cargo.amount);
        colony.resources_gathered += cargo.amount;
        colony.owner.clone()
    });
    if let Some(owner) = owner {
        let _ = world.players.update(&owner, |player| {
            player.resources_gathered += cargo.amount;
        });
    }
    debug!(
        ant = ant_id.get(),
        colony = colony_id.get(),
        resource = ?cargo.resource_type,
        amount = cargo.amount,
        "resources_deposited"
    );
    out_events.push(Event::ResourcesDeposited {
        colony: colony_id,
        resource_type: cargo.resource_type,
        amount: cargo.amount,
    });
    Some(cargo)
}

/// Sends an idle worker toward the nearest discovered non-empty node.
pub fn assign_gathering(world: &mut World, ant_id: AntId) -> bool {
    let Some(ant) = world.ants.get(&ant_id) else {
        return false;
    };
    let Some(destination) = query::nearest_discovered_resource(world, ant.colony_id, ant.position)
        .map(|node| node.position)
    else {
        return false;
    };
    routing::route_ant(world, ant_id, destination, TaskType::Gathering).is_ok()
}

/// Ends a young queen's stay: records the score, removes her and schedules
/// the owner's next colony.
pub fn depart_on_nuptial_flight(
    world: &mut World,
    queen_id: AntId,
    now: Timestamp,
    rng: &mut SimRng,
    out_events: &mut Vec<Event>,
) -> Option<f32> {
    let queen = world.ants.get(&queen_id)?;
    let ant_trait = queen.ant_trait;
    let colony = world.colonies.get(&queen.colony_id)?;
    let colony_id = colony.id;
    let owner = colony.owner.clone();
    let origin = colony.origin;
    let score = query::colony_score(colony);

    let _ = remove_ant(world, queen_id, DeathCause::NuptialFlight, out_events);

    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = rng.gen_range(150.0..300.0);
    let limit = balance::WORLD_HALF_EXTENT * 0.8;
    let position = Position::surface(
        (origin.x + angle.cos() * distance).clamp(-limit, limit),
        (origin.y + angle.sin() * distance).clamp(-limit, limit),
    );
    let _ = world.players.update(&owner, |player: &mut Player| {
        player.queens_produced += 1;
        player.generations_survived += 1;
        if score > player.best_colony_score {
            player.best_colony_score = score;
        }
        player.pending_founding = Some(PendingFounding {
            due_at: now.after(balance::REFOUNDING_DELAY),
            position,
            inherited_trait: ant_trait,
        });
    });

    info!(
        colony = colony_id.get(),
        owner = %owner,
        score,
        ?ant_trait,
        "nuptial_flight"
    );
    out_events.push(Event::NuptialFlightDeparted {
        colony: colony_id,
        player: owner,
        score,
    });
    Some(score)
}
