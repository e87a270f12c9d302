//! Command Interface: validated, atomic state transitions requested by players.
//!
//! Every reducer authorises the caller against the rows it references and
//! either mutates the world or returns a [`Rejection`] without touching it.

use std::collections::{BTreeMap, BTreeSet};

use colony_wars_core::{
    AntId, AntTrait, AntType, AttackTarget, BattleId, ChamberType, ColonyId, Command, DeathCause,
    Event, PheromoneId, PheromoneKind, PlayerId, Position, Rejection, TableName, TaskType,
    Timestamp, TunnelId,
};
use tracing::{debug, info, warn};

use crate::{
    balance, entities, generation, query,
    routing::{self, Route},
    Ant, Battle, FoundingStage, Pheromone, Player, SimRng, TaskTimer, TimerKind, Tunnel, World,
};

/// Executes the provided command against the world on behalf of `caller`.
///
/// Rejections are logged, reported through a [`Event::CommandRejected`] and
/// returned; the world is left untouched in that case.
pub fn apply(
    world: &mut World,
    caller: &PlayerId,
    command: Command,
    now: Timestamp,
    rng: &mut SimRng,
    out_events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    let method = command.method();
    let result = match command {
        Command::CreatePlayer { username } => {
            create_player(world, caller, username, now, out_events)
        }
        Command::CreateColony { x, y } => create_colony(world, caller, x, y, now, out_events),
        Command::SpawnLarva { queen_id } => spawn_larva(world, caller, queen_id, now),
        Command::FeedLarva {
            colony_id,
            ant_type,
            x,
            y,
            z,
        } => feed_larva(
            world,
            caller,
            colony_id,
            ant_type,
            Position::new(x, y, z),
            now,
            rng,
            out_events,
        ),
        Command::CommandAnts {
            ant_ids,
            target_x,
            target_y,
            target_z,
            task,
        } => command_ants(
            world,
            caller,
            &ant_ids,
            Position::new(target_x, target_y, target_z),
            task,
        ),
        Command::BuildChamber {
            ant_id,
            chamber_type,
            x,
            y,
            z,
        } => build_chamber(
            world,
            caller,
            ant_id,
            chamber_type,
            Position::new(x, y, z),
            now,
            out_events,
        ),
        Command::DigTunnel {
            colony_id,
            start_x,
            start_y,
            start_z,
            end_x,
            end_y,
            end_z,
        } => dig_tunnel(
            world,
            caller,
            colony_id,
            Position::new(start_x, start_y, start_z),
            Position::new(end_x, end_y, end_z),
        ),
        Command::AttackTarget {
            attacker_id,
            target,
        } => attack_target(world, caller, attacker_id, target, now, out_events),
        Command::DepositResources { ant_id } => {
            deposit_resources(world, caller, ant_id, out_events)
        }
        Command::LayPheromone {
            colony_id,
            x,
            y,
            z,
            kind,
        } => lay_pheromone(world, caller, colony_id, Position::new(x, y, z), kind),
        Command::ToggleColonyAi { colony_id } => toggle_colony_ai(world, caller, colony_id),
        Command::NuptialFlight { queen_id } => {
            nuptial_flight(world, caller, queen_id, now, rng, out_events)
        }
        Command::RespawnAsQueen {
            x,
            y,
            inherited_trait,
        } => respawn_as_queen(world, caller, x, y, inherited_trait, now, rng, out_events),
    };

    if let Err(reason) = &result {
        warn!(method, caller = %caller, reason = %reason, "command_rejected");
        out_events.push(Event::CommandRejected {
            method,
            reason: reason.clone(),
        });
    }
    result
}

/// Registers the caller. Calling it again for the same identity is a no-op.
pub fn create_player(
    world: &mut World,
    caller: &PlayerId,
    username: String,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    if world.players.contains(caller) {
        debug!(caller = %caller, "player_already_registered");
        return Ok(());
    }
    world.players.insert(Player {
        identity: caller.clone(),
        username,
        created_at: now,
        colonies_founded: 0,
        generations_survived: 0,
        queens_produced: 0,
        best_colony_score: 0.0,
        resources_gathered: 0.0,
        pending_founding: None,
    });
    info!(caller = %caller, "player_created");
    out_events.push(Event::PlayerCreated {
        player: caller.clone(),
    });
    Ok(())
}

/// Founds a colony whose queen starts digging a burrow at the location.
pub fn create_colony(
    world: &mut World,
    caller: &PlayerId,
    x: f32,
    y: f32,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    if !world.players.contains(caller) {
        return Err(Rejection::PlayerMissing(caller.clone()));
    }
    let _ = entities::found_colony(world, caller, Position::surface(x, y), None, now, out_events);
    Ok(())
}

/// Starts the queen laying an egg; the larva appears when the lay timer expires.
pub fn spawn_larva(
    world: &mut World,
    caller: &PlayerId,
    queen_id: AntId,
    now: Timestamp,
) -> Result<(), Rejection> {
    let _ = owned_ant(world, caller, queen_id)?;
    entities::start_laying(world, queen_id, now)
}

/// Raises one of the colony's larvae into an ant of the requested caste.
#[allow(clippy::too_many_arguments)]
pub fn feed_larva(
    world: &mut World,
    caller: &PlayerId,
    colony_id: ColonyId,
    ant_type: AntType,
    position: Position,
    now: Timestamp,
    rng: &mut SimRng,
    out_events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    let _ = owned_colony(world, caller, colony_id)?;
    let _ = entities::raise_larva(world, colony_id, ant_type, position, now, rng, out_events)?;
    Ok(())
}

/// Orders a group of ants to a destination, charging jelly per unit of travel.
///
/// The order is all-or-nothing: if any colony involved cannot pay, or any ant
/// cannot be routed, nothing changes. A later order always replaces an
/// earlier one.
pub fn command_ants(
    world: &mut World,
    caller: &PlayerId,
    ant_ids: &[AntId],
    destination: Position,
    task: Option<TaskType>,
) -> Result<(), Rejection> {
    let mut seen = BTreeSet::new();
    let ants: Vec<&Ant> = ant_ids
        .iter()
        .filter(|id| seen.insert(**id))
        .filter_map(|id| world.ants.get(id))
        .filter(|ant| query::owns_ant(world, caller, ant))
        .filter(|ant| {
            !ant.timer.is_some_and(|timer| {
                matches!(timer.kind, TimerKind::FoundBurrow | TimerKind::LayEgg)
            })
        })
        .collect();
    if ants.is_empty() {
        return Err(Rejection::EmptyOrder);
    }

    let mut costs: BTreeMap<ColonyId, f32> = BTreeMap::new();
    for ant in &ants {
        *costs.entry(ant.colony_id).or_insert(0.0) +=
            ant.position.distance(destination) * balance::JELLY_PER_DISTANCE;
    }
    for (colony_id, needed) in &costs {
        let available = world
            .colonies
            .get(colony_id)
            .map_or(0.0, |colony| colony.jelly);
        if available < *needed {
            return Err(Rejection::InsufficientJelly {
                needed: *needed,
                available,
            });
        }
    }

    let mut plans: Vec<(AntId, Route, Option<colony_wars_core::PreyId>)> = Vec::new();
    for ant in &ants {
        let (ant_task, hunt) = match task {
            Some(task) => (task, None),
            None => infer_task(world, ant, destination),
        };
        let hunt = hunt.or_else(|| {
            (ant_task == TaskType::Fighting)
                .then(|| prey_near(world, destination))
                .flatten()
        });
        let route = routing::plan_route(world, ant, destination, ant_task)?;
        plans.push((ant.id, route, hunt));
    }

    for (colony_id, cost) in costs {
        let _ = world.colonies.update(&colony_id, |colony| colony.jelly -= cost);
    }
    let count = plans.len();
    for (ant_id, route, hunt) in plans {
        let _ = world.ants.update(&ant_id, |ant| {
            ant.stashed_order = None;
            ant.hunt_target_id = hunt;
            ant.defend_target_id = None;
            routing::apply_route(ant, route);
        });
    }
    debug!(
        caller = %caller,
        ants = count,
        x = destination.x,
        y = destination.y,
        z = destination.z,
        "ants_commanded"
    );
    Ok(())
}

const TASK_INFERENCE_RADIUS: f32 = 15.0;

fn infer_task(
    world: &World,
    ant: &Ant,
    destination: Position,
) -> (TaskType, Option<colony_wars_core::PreyId>) {
    match ant.ant_type {
        AntType::Worker
            if query::discovered_resource_near(
                world,
                ant.colony_id,
                destination,
                TASK_INFERENCE_RADIUS,
            )
            .is_some() =>
        {
            (TaskType::Gathering, None)
        }
        ant_type if ant_type.is_fighter() => match prey_near(world, destination) {
            Some(prey) => (TaskType::Fighting, Some(prey)),
            None => (TaskType::Exploring, None),
        },
        _ => (TaskType::Exploring, None),
    }
}

fn prey_near(world: &World, destination: Position) -> Option<colony_wars_core::PreyId> {
    query::nearest(world.prey.iter(), destination, |prey| prey.position)
        .filter(|prey| prey.position.distance(destination) <= TASK_INFERENCE_RADIUS)
        .map(|prey| prey.id)
}

/// Constructs a chamber.
///
/// Queens may dig the colony's single burrow; workers build every other
/// kind underground. Chambers too close to an existing one are pushed out
/// radially; chambers close enough are joined to it by a tunnel.
pub fn build_chamber(
    world: &mut World,
    caller: &PlayerId,
    ant_id: AntId,
    chamber_type: ChamberType,
    position: Position,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    let ant = owned_ant(world, caller, ant_id)?;
    let colony_id = ant.colony_id;
    let colony = world
        .colonies
        .get(&colony_id)
        .ok_or(Rejection::ColonyMissing(colony_id))?;

    if chamber_type == ChamberType::Burrow {
        if ant.ant_type != AntType::Queen {
            return Err(Rejection::WrongAntType {
                ant_type: ant.ant_type,
            });
        }
        let digging = ant
            .timer
            .is_some_and(|timer| timer.kind == TimerKind::FoundBurrow);
        if digging || query::has_chamber(world, colony_id, ChamberType::Burrow) {
            return Err(Rejection::BurrowAlreadyBuilt);
        }
        let origin = Position::surface(position.x, position.y);
        let _ = world.colonies.update(&colony_id, |colony| {
            colony.origin = origin;
            colony.stage = FoundingStage::Digging;
        });
        let _ = world.ants.update(&ant_id, |queen| {
            queen.go_idle();
            queen.position = origin;
            queen.task = TaskType::Building;
            queen.timer = Some(TaskTimer {
                kind: TimerKind::FoundBurrow,
                due_at: now.after(balance::BURROW_DIG_DURATION),
            });
        });
        info!(colony = colony_id.get(), "burrow_digging_started");
        return Ok(());
    }

    if ant.ant_type != AntType::Worker {
        return Err(Rejection::WrongAntType {
            ant_type: ant.ant_type,
        });
    }
    if position.is_surface() {
        return Err(Rejection::ChamberMustBeUnderground);
    }
    let stats = balance::chamber_stats(chamber_type, false);
    for (resource, needed) in [
        (colony_wars_core::ResourceType::Food, stats.food_cost),
        (colony_wars_core::ResourceType::Minerals, stats.mineral_cost),
    ] {
        let available = colony.stored(resource);
        if available < needed {
            return Err(Rejection::InsufficientResources {
                resource,
                needed,
                available,
            });
        }
    }

    let nearest = query::nearest(
        world
            .chambers
            .iter()
            .filter(|chamber| chamber.colony_id == colony_id && !chamber.is_entrance),
        position,
        |chamber| chamber.position,
    )
    .map(|chamber| chamber.position);
    let (position, connect_from) = match nearest {
        Some(anchor) => {
            let distance = anchor.planar_distance(position);
            if distance < balance::MIN_CHAMBER_SPACING {
                let (dx, dy) = if distance > f32::EPSILON {
                    ((position.x - anchor.x) / distance, (position.y - anchor.y) / distance)
                } else {
                    (1.0, 0.0)
                };
                let relocated = Position::new(
                    anchor.x + dx * balance::RELOCATED_CHAMBER_SPACING,
                    anchor.y + dy * balance::RELOCATED_CHAMBER_SPACING,
                    position.z,
                );
                info!(
                    colony = colony_id.get(),
                    from_x = position.x,
                    from_y = position.y,
                    to_x = relocated.x,
                    to_y = relocated.y,
                    "chamber_relocated"
                );
                (relocated, Some(anchor))
            } else if distance > balance::MAX_CONNECTED_SPACING {
                info!(
                    colony = colony_id.get(),
                    distance, "chamber_not_auto_connected"
                );
                (position, None)
            } else {
                (position, Some(anchor))
            }
        }
        None => (position, None),
    };

    let _ = world.colonies.update(&colony_id, |colony| {
        colony.food -= stats.food_cost;
        colony.minerals -= stats.mineral_cost;
    });
    let chamber_id = entities::insert_chamber(
        world,
        colony_id,
        chamber_type,
        position,
        false,
        now,
        out_events,
    );
    if let Some(anchor) = connect_from {
        let tunnel_id = TunnelId::new(world.next_id(TableName::Tunnel));
        world.tunnels.insert(Tunnel {
            id: tunnel_id,
            colony_id,
            start: anchor,
            end: position,
            width: balance::TUNNEL_WIDTH,
        });
    }
    if routing::route_ant(world, ant_id, position, TaskType::Building).is_err() {
        debug!(ant = ant_id.get(), "builder_not_routed");
    }
    info!(
        colony = colony_id.get(),
        chamber = chamber_id.get(),
        ?chamber_type,
        "colony_building_chamber"
    );
    Ok(())
}

const TUNNEL_DIGGER_RANGE: f32 = 10.0;

/// Excavates a tunnel; a worker of the colony must stand near the start point.
pub fn dig_tunnel(
    world: &mut World,
    caller: &PlayerId,
    colony_id: ColonyId,
    start: Position,
    end: Position,
) -> Result<(), Rejection> {
    let _ = owned_colony(world, caller, colony_id)?;
    let digger_nearby = world.ants.iter().any(|ant| {
        ant.colony_id == colony_id
            && ant.ant_type == AntType::Worker
            && ant.position.distance(start) < TUNNEL_DIGGER_RANGE
    });
    if !digger_nearby {
        return Err(Rejection::NoWorkerNearby);
    }
    let id = TunnelId::new(world.next_id(TableName::Tunnel));
    world.tunnels.insert(Tunnel {
        id,
        colony_id,
        start,
        end,
        width: balance::TUNNEL_WIDTH,
    });
    debug!(colony = colony_id.get(), tunnel = id.get(), "tunnel_dug");
    Ok(())
}

/// Direct melee attack. The blow is recorded as a battle row.
pub fn attack_target(
    world: &mut World,
    caller: &PlayerId,
    attacker_id: AntId,
    target: AttackTarget,
    now: Timestamp,
    out_events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    let attacker = owned_ant(world, caller, attacker_id)?;
    let (colony_id, from, damage) = (attacker.colony_id, attacker.position, attacker.attack);

    let (target_position, range) = match target {
        AttackTarget::Ant(id) => {
            let victim = world.ants.get(&id).ok_or(Rejection::TargetMissing)?;
            if victim.colony_id == colony_id {
                return Err(Rejection::FriendlyFire);
            }
            (victim.position, balance::ANT_ATTACK_RANGE)
        }
        AttackTarget::Prey(id) => (
            world.prey.get(&id).ok_or(Rejection::TargetMissing)?.position,
            balance::PREY_ENGAGE_RANGE,
        ),
        AttackTarget::Predator(id) => (
            world
                .predators
                .get(&id)
                .ok_or(Rejection::TargetMissing)?
                .position,
            balance::PREY_ENGAGE_RANGE,
        ),
    };
    let distance = from.distance(target_position);
    if distance > range {
        return Err(Rejection::OutOfRange { distance, range });
    }

    let battle_id = BattleId::new(world.next_id(TableName::Battle));
    world.battles.insert(Battle {
        id: battle_id,
        colony_id,
        attacker_id,
        target,
        position: target_position,
        damage,
        at: now,
    });

    match target {
        AttackTarget::Ant(id) => {
            let dead = world.ants.get_mut(&id).is_some_and(|victim| {
                victim.health -= damage;
                victim.health <= 0.0
            });
            if dead {
                let _ = entities::remove_ant(world, id, DeathCause::Combat, out_events);
            }
        }
        AttackTarget::Prey(id) => {
            let dead = world.prey.get_mut(&id).is_some_and(|prey| {
                prey.health -= damage;
                prey.health <= 0.0
            });
            if dead {
                let _ = entities::kill_prey(world, id, colony_id, now, out_events);
            }
        }
        AttackTarget::Predator(id) => {
            let dead = world.predators.get_mut(&id).is_some_and(|predator| {
                predator.health -= damage;
                predator.health <= 0.0
            });
            if dead {
                let _ = entities::remove_predator(world, id, true, out_events);
            }
        }
    }
    debug!(
        attacker = attacker_id.get(),
        battle = battle_id.get(),
        damage,
        "attack_resolved"
    );
    Ok(())
}

/// Drops off an ant's cargo into its colony's stores.
pub fn deposit_resources(
    world: &mut World,
    caller: &PlayerId,
    ant_id: AntId,
    out_events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    let ant = owned_ant(world, caller, ant_id)?;
    if ant.carrying.is_none() {
        return Err(Rejection::NothingCarried);
    }
    let returning = ant.task == TaskType::Returning;
    let _ = entities::deposit_cargo(world, ant_id, out_events);
    if returning {
        let _ = world.ants.update(&ant_id, Ant::go_idle);
    }
    Ok(())
}

/// Places a pheromone marker.
pub fn lay_pheromone(
    world: &mut World,
    caller: &PlayerId,
    colony_id: ColonyId,
    position: Position,
    kind: PheromoneKind,
) -> Result<(), Rejection> {
    let _ = owned_colony(world, caller, colony_id)?;
    let id = PheromoneId::new(world.next_id(TableName::Pheromone));
    world.pheromones.insert(Pheromone {
        id,
        colony_id,
        position,
        kind,
        strength: balance::PHEROMONE_STRENGTH,
    });
    debug!(colony = colony_id.get(), ?kind, "pheromone_laid");
    Ok(())
}

/// Flips the colony's automatic management flag.
pub fn toggle_colony_ai(
    world: &mut World,
    caller: &PlayerId,
    colony_id: ColonyId,
) -> Result<(), Rejection> {
    let _ = owned_colony(world, caller, colony_id)?;
    let mut enabled = false;
    let _ = world.colonies.update(&colony_id, |colony| {
        colony.ai_enabled = !colony.ai_enabled;
        enabled = colony.ai_enabled;
    });
    info!(colony = colony_id.get(), enabled, "colony_ai_toggled");
    Ok(())
}

/// Sends a young queen away on her nuptial flight.
pub fn nuptial_flight(
    world: &mut World,
    caller: &PlayerId,
    queen_id: AntId,
    now: Timestamp,
    rng: &mut SimRng,
    out_events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    let queen = owned_ant(world, caller, queen_id)?;
    if queen.ant_type != AntType::YoungQueen {
        return Err(Rejection::WrongAntType {
            ant_type: queen.ant_type,
        });
    }
    let _ = entities::depart_on_nuptial_flight(world, queen_id, now, rng, out_events);
    Ok(())
}

/// Regenerates the world and restarts the caller as a fresh queen.
///
/// Every global entity is wiped and reseeded, not only the caller's rows.
#[allow(clippy::too_many_arguments)]
pub fn respawn_as_queen(
    world: &mut World,
    caller: &PlayerId,
    x: f32,
    y: f32,
    inherited_trait: Option<AntTrait>,
    now: Timestamp,
    rng: &mut SimRng,
    out_events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    if !world.players.contains(caller) {
        create_player(world, caller, caller.as_str().to_owned(), now, out_events)?;
    }
    let owned: Vec<ColonyId> = query::colonies_of(world, caller)
        .into_iter()
        .map(|colony| colony.id)
        .collect();
    for colony_id in owned {
        let _ = entities::remove_colony(world, colony_id);
    }

    world.resources.clear();
    world.obstacles.clear();
    world.prey.clear();
    world.predators.clear();
    world.discoveries.clear();
    for ant in world.ants.iter_mut() {
        if ant.hunt_target_id.is_some() || ant.defend_target_id.is_some() {
            ant.go_idle();
        }
    }
    generation::populate(world, rng);
    out_events.push(Event::WorldRegenerated);
    info!(caller = %caller, "world_regenerated");

    let _ = entities::found_colony(
        world,
        caller,
        Position::surface(x, y),
        inherited_trait,
        now,
        out_events,
    );
    Ok(())
}

fn owned_ant<'world>(
    world: &'world World,
    caller: &PlayerId,
    ant_id: AntId,
) -> Result<&'world Ant, Rejection> {
    let ant = world.ants.get(&ant_id).ok_or(Rejection::AntMissing(ant_id))?;
    if !query::owns_ant(world, caller, ant) {
        return Err(Rejection::NotOwned);
    }
    Ok(ant)
}

fn owned_colony<'world>(
    world: &'world World,
    caller: &PlayerId,
    colony_id: ColonyId,
) -> Result<&'world crate::Colony, Rejection> {
    let colony = world
        .colonies
        .get(&colony_id)
        .ok_or(Rejection::ColonyMissing(colony_id))?;
    if &colony.owner != caller {
        return Err(Rejection::NotOwned);
    }
    Ok(colony)
}
