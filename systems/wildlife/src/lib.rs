#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wildlife system driving predators and prey.
//!
//! Predators chase the nearest surface ant, strike on contact and raise a hive
//! alert in the victim's colony. Casualties can push a colony into general
//! retreat. Birds without prey grow bored and eventually leave. Prey wander
//! and flee from nearby ants. Finally every colony facing a dangerous bird
//! pulls its surface ants underground and sends them back out once the sky
//! is clear.

use colony_wars_core::{
    AntId, AntType, ColonyId, DeathCause, Event, Position, PredatorId, PredatorKind, PreyId,
    TaskType,
};
use colony_wars_world::{
    balance, entities, query, routing, SimRng, StashReason, ThreatAlert, TickContext, World,
};
use rand::Rng;
use tracing::{debug, info};

/// Boredom past which a bird searches erratically.
pub const ERRATIC_BOREDOM: u32 = 200;
/// Boredom past which a bird leaves the map.
pub const DEPARTURE_BOREDOM: u32 = 300;
/// Distance from an ant at which prey flee.
pub const PREY_FLEE_RADIUS: f32 = 40.0;
/// Health above which a bird is considered dangerous.
pub const DANGEROUS_BIRD_HEALTH: f32 = 50.0;
/// Margin added to a bird's hunt radius when judging danger.
pub const DANGER_MARGIN: f32 = 50.0;

/// Multiple of the map half extent beyond which a predator has left.
const OFF_MAP_FACTOR: f32 = 1.2;
/// Maximum offset of a fresh wandering destination.
const WANDER_SPREAD: f32 = 100.0;
/// Share of full speed used while wandering.
const WANDER_PACE: f32 = 0.5;

/// Pure system that runs predator and prey behaviour once per tick.
///
/// Retreat bookkeeping lives entirely in the world: a colony is retreating
/// while [`is_retreating`] holds, and an ant it pulled home carries a
/// [`StashReason::Retreat`] order until the colony is safe again.
#[derive(Debug, Default)]
pub struct Wildlife {
    exposed: Vec<AntId>,
}

impl Wildlife {
    /// Creates the wildlife system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances every predator and prey, then applies danger retreats.
    pub fn handle(
        &mut self,
        world: &mut World,
        ctx: TickContext,
        rng: &mut SimRng,
        out: &mut Vec<Event>,
    ) {
        update_general_retreat(world, ctx, rng, out);
        for predator_id in world.predators.keys() {
            hunt(world, predator_id, ctx, rng, out);
        }
        remove_off_map(world, out);
        for prey_id in world.prey.keys() {
            move_prey(world, prey_id, ctx, rng);
        }
        self.retreat_from_danger(world);
    }

    fn retreat_from_danger(&mut self, world: &mut World) {
        for colony_id in world.colonies.keys() {
            if is_retreating(world, colony_id) {
                self.pull_underground(world, colony_id);
            } else {
                send_back_out(world, colony_id);
            }
        }
    }

    fn pull_underground(&mut self, world: &mut World, colony_id: ColonyId) {
        self.exposed.clear();
        self.exposed.extend(
            world
                .ants
                .iter()
                .filter(|ant| {
                    ant.colony_id == colony_id
                        && ant.on_surface()
                        && ant.task != TaskType::Entering
                        && ant.timer.is_none()
                })
                .map(|ant| ant.id),
        );
        if self.exposed.is_empty() {
            return;
        }
        let mut sent = 0;
        for ant_id in self.exposed.drain(..) {
            if routing::send_home(world, ant_id, StashReason::Retreat) {
                sent += 1;
            }
        }
        info!(colony = colony_id.get(), sent, "colony_retreating");
    }
}

/// Reports whether the colony's surface ants must stay underground: a
/// dangerous bird is near one of them or the colony is in general retreat.
#[must_use]
pub fn is_retreating(world: &World, colony_id: ColonyId) -> bool {
    if world
        .colonies
        .get(&colony_id)
        .is_some_and(|colony| colony.general_retreat)
    {
        return true;
    }
    world
        .predators
        .iter()
        .filter(|predator| {
            predator.kind == PredatorKind::Bird && predator.health > DANGEROUS_BIRD_HEALTH
        })
        .any(|bird| {
            world.ants.iter().any(|ant| {
                ant.colony_id == colony_id
                    && ant.on_surface()
                    && ant.position.planar_distance(bird.position)
                        <= bird.hunt_radius + DANGER_MARGIN
            })
        })
}

/// Resumes every order the colony's ants set aside when danger pulled them home.
fn send_back_out(world: &mut World, colony_id: ColonyId) {
    let returning: Vec<(AntId, AntType)> = world
        .ants
        .iter()
        .filter(|ant| {
            ant.colony_id == colony_id
                && ant
                    .stashed_order
                    .is_some_and(|order| order.reason == StashReason::Retreat)
        })
        .map(|ant| (ant.id, ant.ant_type))
        .collect();
    if returning.is_empty() {
        return;
    }

    let mut resumed = 0;
    for (ant_id, ant_type) in returning {
        if routing::resume_stashed(world, ant_id) {
            resumed += 1;
            continue;
        }
        let available = world.ants.get(&ant_id).is_some_and(|ant| ant.is_available());
        if ant_type == AntType::Worker && available && entities::assign_gathering(world, ant_id) {
            resumed += 1;
        }
    }
    info!(colony = colony_id.get(), resumed, "colony_retreat_over");
}

fn update_general_retreat(
    world: &mut World,
    ctx: TickContext,
    rng: &mut SimRng,
    out: &mut Vec<Event>,
) {
    for colony in world.colonies.iter_mut() {
        let calm = colony
            .last_death_at
            .map_or(true, |at| ctx.now.since(at) >= balance::RETREAT_COOLDOWN);
        if calm {
            if colony.general_retreat {
                colony.general_retreat = false;
                info!(colony = colony.id.get(), "general_retreat_lifted");
                out.push(Event::GeneralRetreatChanged {
                    colony: colony.id,
                    active: false,
                });
            }
            colony.casualties = 0;
            continue;
        }
        if !colony.general_retreat
            && colony.casualties > balance::RETREAT_CASUALTY_THRESHOLD
            && rng.gen_bool(balance::RETREAT_CHANCE)
        {
            colony.general_retreat = true;
            info!(
                colony = colony.id.get(),
                casualties = colony.casualties,
                "general_retreat_ordered"
            );
            out.push(Event::GeneralRetreatChanged {
                colony: colony.id,
                active: true,
            });
        }
    }
}

fn hunt(
    world: &mut World,
    predator_id: PredatorId,
    ctx: TickContext,
    rng: &mut SimRng,
    out: &mut Vec<Event>,
) {
    let Some(predator) = world.predators.get(&predator_id) else {
        return;
    };
    let (position, hunt_radius) = (predator.position, predator.hunt_radius);
    let step = predator.speed * balance::SPEED_SCALE * ctx.dt_secs();

    let quarry = world
        .ants
        .iter()
        .filter(|ant| ant.on_surface() && ant.position.planar_distance(position) <= hunt_radius)
        .min_by(|a, b| {
            a.position
                .planar_distance(position)
                .total_cmp(&b.position.planar_distance(position))
                .then(a.id.cmp(&b.id))
        })
        .map(|ant| (ant.id, Position::surface(ant.position.x, ant.position.y)));

    let Some((ant_id, ant_position)) = quarry else {
        idle(world, predator_id, step, rng, out);
        return;
    };

    let strike = world.predators.get_mut(&predator_id).and_then(|predator| {
        predator.target_ant_id = Some(ant_id);
        predator.boredom = 0;
        predator.wander_target = None;
        let (next, _) = predator.position.step_toward(ant_position, step);
        predator.position = next;
        let in_contact =
            next.planar_distance(ant_position) <= balance::PREDATOR_CONTACT_RANGE;
        if !in_contact || predator.attack_ready_at > ctx.now {
            return None;
        }
        predator.attack_ready_at = ctx.now.after(balance::ATTACK_COOLDOWN);
        Some(predator.attack)
    });
    if let Some(damage) = strike {
        strike_ant(world, predator_id, ant_id, damage, ctx, out);
    }
}

/// A predator without quarry grows bored, wanders, and birds eventually leave.
fn idle(
    world: &mut World,
    predator_id: PredatorId,
    step: f32,
    rng: &mut SimRng,
    out: &mut Vec<Event>,
) {
    let departed = world.predators.get_mut(&predator_id).is_some_and(|predator| {
        predator.target_ant_id = None;
        let mut erratic = false;
        if predator.kind == PredatorKind::Bird {
            predator.boredom += 1;
            if predator.boredom == ERRATIC_BOREDOM + 1 {
                info!(predator = predator.id.get(), "bird_restless");
            }
            erratic = predator.boredom > ERRATIC_BOREDOM;
        }
        if predator.boredom > DEPARTURE_BOREDOM {
            return true;
        }
        predator.position = wander(
            predator.position,
            &mut predator.wander_target,
            step * WANDER_PACE,
            erratic,
            rng,
        );
        false
    });
    if departed {
        let _ = entities::remove_predator(world, predator_id, false, out);
    }
}

fn strike_ant(
    world: &mut World,
    predator_id: PredatorId,
    ant_id: AntId,
    damage: f32,
    ctx: TickContext,
    out: &mut Vec<Event>,
) {
    let Some((colony_id, location, dead)) = world.ants.get_mut(&ant_id).map(|ant| {
        ant.health -= damage;
        ant.wounded = true;
        (ant.colony_id, ant.position, ant.health <= 0.0)
    }) else {
        return;
    };
    debug!(
        predator = predator_id.get(),
        ant = ant_id.get(),
        damage,
        "ant_struck"
    );
    raise_hive_alert(world, colony_id, predator_id, location, ctx, out);

    if dead {
        let _ = entities::remove_ant(world, ant_id, DeathCause::Combat, out);
        let _ = world.colonies.update(&colony_id, |colony| {
            colony.casualties += 1;
            colony.last_death_at = Some(ctx.now);
            info!(
                colony = colony_id.get(),
                casualties = colony.casualties,
                "colony_casualty"
            );
        });
    }
}

fn raise_hive_alert(
    world: &mut World,
    colony_id: ColonyId,
    predator_id: PredatorId,
    location: Position,
    ctx: TickContext,
    out: &mut Vec<Event>,
) {
    let _ = world.colonies.update(&colony_id, |colony| {
        colony.threat = Some(ThreatAlert {
            predator: predator_id,
            location,
            at: ctx.now,
        });
    });

    let mut responders = 0;
    for fighter in query::idle_fighters_near(world, colony_id, location)
        .into_iter()
        .take(balance::MAX_RESPONDERS)
    {
        if routing::route_ant(world, fighter, location, TaskType::Fighting).is_err() {
            continue;
        }
        let _ = world
            .ants
            .update(&fighter, |ant| ant.defend_target_id = Some(predator_id));
        responders += 1;
    }
    info!(
        colony = colony_id.get(),
        predator = predator_id.get(),
        responders,
        "hive_alert"
    );
    out.push(Event::HiveAlert {
        colony: colony_id,
        predator: predator_id,
        location,
    });
}

fn remove_off_map(world: &mut World, out: &mut Vec<Event>) {
    let limit = balance::WORLD_HALF_EXTENT * OFF_MAP_FACTOR;
    let gone: Vec<PredatorId> = world
        .predators
        .iter()
        .filter(|predator| predator.position.x.abs() > limit || predator.position.y.abs() > limit)
        .map(|predator| predator.id)
        .collect();
    for predator_id in gone {
        let _ = entities::remove_predator(world, predator_id, false, out);
    }
}

fn move_prey(world: &mut World, prey_id: PreyId, ctx: TickContext, rng: &mut SimRng) {
    let Some(position) = world.prey.get(&prey_id).map(|prey| prey.position) else {
        return;
    };
    let pinned = world.ants.iter().any(|ant| {
        ant.hunt_target_id == Some(prey_id)
            && ant.position.distance(position) <= balance::PREY_ENGAGE_RANGE
    });
    if pinned {
        return;
    }
    let threat = world
        .ants
        .iter()
        .filter(|ant| {
            ant.on_surface() && ant.position.planar_distance(position) <= PREY_FLEE_RADIUS
        })
        .min_by(|a, b| {
            a.position
                .planar_distance(position)
                .total_cmp(&b.position.planar_distance(position))
        })
        .map(|ant| ant.position);

    let _ = world.prey.update(&prey_id, |prey| {
        let step = prey.speed * balance::SPEED_SCALE * ctx.dt_secs();
        prey.position = match threat {
            Some(threat) => {
                prey.wander_target = None;
                flee(prey.position, threat, step)
            }
            None => wander(
                prey.position,
                &mut prey.wander_target,
                step * WANDER_PACE,
                false,
                rng,
            ),
        };
    });
}

fn flee(position: Position, threat: Position, step: f32) -> Position {
    let (dx, dy) = (position.x - threat.x, position.y - threat.y);
    let length = (dx * dx + dy * dy).sqrt();
    if length <= f32::EPSILON {
        return position;
    }
    clamp_to_map(
        position.x + dx / length * step,
        position.y + dy / length * step,
    )
}

/// Steps toward the wandering destination, picking a fresh one when needed.
fn wander(
    position: Position,
    destination: &mut Option<Position>,
    step: f32,
    erratic: bool,
    rng: &mut SimRng,
) -> Position {
    let target = match *destination {
        Some(target) if !erratic => target,
        _ => {
            let target = clamp_to_map(
                position.x + rng.gen_range(-WANDER_SPREAD..WANDER_SPREAD),
                position.y + rng.gen_range(-WANDER_SPREAD..WANDER_SPREAD),
            );
            *destination = Some(target);
            target
        }
    };
    let (next, arrived) = position.step_toward(target, step);
    if arrived {
        *destination = None;
    }
    next
}

fn clamp_to_map(x: f32, y: f32) -> Position {
    let extent = balance::WORLD_HALF_EXTENT;
    Position::surface(x.clamp(-extent, extent), y.clamp(-extent, extent))
}
