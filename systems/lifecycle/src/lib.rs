#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Entity lifecycle system: cleanup, hunger, timed completions and upkeep.
//!
//! [`Lifecycle::handle`] runs before movement and covers orphan cleanup,
//! energy decay and every timestamp-driven completion. [`Lifecycle::replenish`]
//! runs after the wildlife pass and covers regeneration, pheromone decay,
//! idle feeding and healing.

use colony_wars_core::{AntId, ColonyId, DeathCause, Event, Position, ResourceType, TaskType};
use colony_wars_world::{
    balance, entities, query, routing, Ant, FoundingStage, PendingFounding, SimRng, StashReason,
    TickContext, TimerKind, World,
};
use rand::Rng;
use tracing::{debug, info};

/// Distance from a dig site within which newly found deposits appear.
const DIG_DISCOVERY_SPREAD: f32 = 30.0;
const DIG_WATER_CHANCE: f64 = 0.6;
const DIG_MINERAL_CHANCE: f64 = 0.4;

/// Pure system that keeps entities consistent and resolves deferred effects.
#[derive(Debug, Default)]
pub struct Lifecycle {
    starved: u64,
}

impl Lifecycle {
    /// Creates the lifecycle system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ants that starved since the system was created.
    #[must_use]
    pub fn starved(&self) -> u64 {
        self.starved
    }

    /// Cleanup, hunger and timed completions.
    pub fn handle(
        &mut self,
        world: &mut World,
        ctx: TickContext,
        rng: &mut SimRng,
        out: &mut Vec<Event>,
    ) {
        collapse_headless_colonies(world, ctx, out);
        remove_orphans(world, ctx);
        self.update_energy(world, ctx, out);
        collapse_headless_colonies(world, ctx, out);
        resolve_timers(world, ctx, rng, out);
        resolve_maturation(world, ctx, rng, out);
        resolve_bootstrap(world, ctx, rng, out);
        resolve_refounding(world, ctx, out);
    }

    /// Regeneration, pheromone decay, idle feeding and healing.
    pub fn replenish(&mut self, world: &mut World, ctx: TickContext) {
        regenerate_resources(world, ctx);
        decay_pheromones(world, ctx);
        feed_idle_ants(world, ctx);
        heal_wounded(world, ctx);
    }

    fn update_energy(&mut self, world: &mut World, ctx: TickContext, out: &mut Vec<Event>) {
        for ant_id in world.ants.keys() {
            let Some(ant) = world.ants.get(&ant_id) else {
                continue;
            };
            let energy = query::energy(ant, ctx.now);
            if energy <= 0.0 {
                self.starved += 1;
                let _ = entities::remove_ant(world, ant_id, DeathCause::Starvation, out);
                continue;
            }
            let hungry = energy < balance::HUNGRY_ENERGY
                && ant.on_surface()
                && !matches!(
                    ant.task,
                    TaskType::Returning | TaskType::Fighting | TaskType::Entering
                );
            if hungry && routing::send_home(world, ant_id, StashReason::Hunger) {
                debug!(ant = ant_id.get(), energy, "hungry_ant_heading_home");
            }
        }
    }
}

/// Tears down colonies whose queen is gone and schedules the owner's next
/// colony when they have nothing else left.
fn collapse_headless_colonies(world: &mut World, ctx: TickContext, out: &mut Vec<Event>) {
    let headless: Vec<ColonyId> = world
        .colonies
        .iter()
        .filter(|colony| {
            colony
                .queen_id
                .map_or(true, |queen| !world.ants.contains(&queen))
        })
        .map(|colony| colony.id)
        .collect();

    for colony_id in headless {
        let Some(colony) = entities::remove_colony(world, colony_id) else {
            continue;
        };
        info!(colony = colony_id.get(), owner = %colony.owner, "colony_collapsed");
        out.push(Event::ColonyCollapsed { colony: colony_id });

        let has_other = world
            .colonies
            .iter()
            .any(|other| other.owner == colony.owner);
        let _ = world.players.update(&colony.owner, |player| {
            if !has_other && player.pending_founding.is_none() {
                player.pending_founding = Some(PendingFounding {
                    due_at: ctx.now.after(balance::REFOUNDING_DELAY),
                    position: colony.origin,
                    inherited_trait: colony.inherited_trait,
                });
            }
        });
    }
}

fn remove_orphans(world: &mut World, ctx: TickContext) {
    let live: Vec<ColonyId> = world.colonies.keys();
    let alive = |colony_id: &ColonyId| live.binary_search(colony_id).is_ok();

    let orphans = world.ants.retain(|ant| alive(&ant.colony_id))
        + world.chambers.retain(|chamber| alive(&chamber.colony_id))
        + world.larvae.retain(|larva| alive(&larva.colony_id))
        + world.tunnels.retain(|tunnel| alive(&tunnel.colony_id))
        + world.pheromones.retain(|marker| alive(&marker.colony_id))
        + world.territories.retain(|fact| alive(&fact.colony_id))
        + world.discoveries.retain(|fact| alive(&fact.colony_id));
    if orphans > 0 {
        debug!(orphans, "orphans_removed");
    }

    let _ = world
        .battles
        .retain(|battle| ctx.now.since(battle.at) <= balance::BATTLE_RETENTION);
    let _ = world.resources.retain(|node| {
        !(node.from_prey && node.amount <= 0.0 && node.regeneration_rate <= 0.0)
    });

    let stale_targets: Vec<_> = world
        .predators
        .iter()
        .filter(|predator| {
            predator
                .target_ant_id
                .is_some_and(|ant| !world.ants.contains(&ant))
        })
        .map(|predator| predator.id)
        .collect();
    for predator_id in stale_targets {
        let _ = world
            .predators
            .update(&predator_id, |predator| predator.target_ant_id = None);
    }

    let dangling: Vec<AntId> = world
        .ants
        .iter()
        .filter(|ant| {
            ant.hunt_target_id
                .is_some_and(|prey| !world.prey.contains(&prey))
                || ant
                    .defend_target_id
                    .is_some_and(|predator| !world.predators.contains(&predator))
        })
        .map(|ant| ant.id)
        .collect();
    for ant_id in dangling {
        let _ = world.ants.update(&ant_id, Ant::go_idle);
    }
}

fn resolve_timers(world: &mut World, ctx: TickContext, rng: &mut SimRng, out: &mut Vec<Event>) {
    let due: Vec<(AntId, TimerKind)> = world
        .ants
        .iter()
        .filter_map(|ant| ant.timer.map(|timer| (ant.id, timer)))
        .filter(|(_, timer)| timer.due_at <= ctx.now)
        .map(|(id, timer)| (id, timer.kind))
        .collect();

    for (ant_id, kind) in due {
        match kind {
            TimerKind::FoundBurrow => entities::complete_burrow(world, ant_id, ctx.now, out),
            TimerKind::LayEgg => finish_laying(world, ant_id, ctx, rng, out),
            TimerKind::DigResources => finish_digging(world, ant_id, ctx, rng, out),
        }
    }
}

fn finish_laying(
    world: &mut World,
    queen_id: AntId,
    ctx: TickContext,
    rng: &mut SimRng,
    out: &mut Vec<Event>,
) {
    let Some(queen) = world.ants.get(&queen_id) else {
        return;
    };
    let colony_id = queen.colony_id;
    let chamber = query::chamber_at(world, colony_id, queen.position)
        .filter(|chamber| chamber.has_larvae_headroom())
        .map(|chamber| (chamber.id, chamber.position));

    match chamber {
        Some((chamber_id, center)) => {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let radius = rng.gen_range(0.0..balance::CHAMBER_RADIUS * 0.8);
            let position = Position::new(
                center.x + angle.cos() * radius,
                center.y + angle.sin() * radius,
                center.z,
            );
            let larva =
                entities::insert_larva(world, colony_id, Some(chamber_id), position, ctx.now, out);
            debug!(
                queen = queen_id.get(),
                larva = larva.get(),
                colony = colony_id.get(),
                "egg_laid"
            );
        }
        None => {
            debug!(queen = queen_id.get(), "egg_laying_abandoned");
        }
    }
    let _ = world.ants.update(&queen_id, |queen| {
        queen.timer = None;
        queen.go_idle();
    });
}

fn finish_digging(
    world: &mut World,
    ant_id: AntId,
    ctx: TickContext,
    rng: &mut SimRng,
    out: &mut Vec<Event>,
) {
    let Some(ant) = world.ants.get(&ant_id) else {
        return;
    };
    let (colony_id, site, ant_trait) = (ant.colony_id, ant.position, ant.ant_trait);
    let _ = world.ants.update(&ant_id, |ant| ant.timer = None);

    let mut found = Vec::new();
    for (resource_type, chance) in [
        (ResourceType::Water, DIG_WATER_CHANCE),
        (ResourceType::Minerals, DIG_MINERAL_CHANCE),
    ] {
        if !rng.gen_bool(chance) {
            continue;
        }
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = rng.gen_range(0.0..DIG_DISCOVERY_SPREAD);
        let position = Position::new(
            site.x + angle.cos() * radius,
            site.y + angle.sin() * radius,
            site.z,
        );
        let amount = rng.gen_range(50.0..150.0_f32).round();
        let node = entities::insert_resource(world, resource_type, position, amount, 0.2, false);
        let _ = entities::discover_resource(world, colony_id, node, ctx.now, out);
        found.push((node, resource_type));
    }

    let Some((node_id, resource_type)) = found.first().copied() else {
        debug!(ant = ant_id.get(), "dig_found_nothing");
        let _ = world.ants.update(&ant_id, Ant::go_idle);
        return;
    };
    info!(
        ant = ant_id.get(),
        colony = colony_id.get(),
        deposits = found.len(),
        "dig_discovered_resources"
    );

    let mut taken = 0.0;
    let _ = world.resources.update(&node_id, |node| {
        taken = balance::gather_amount(ant_trait).min(node.amount);
        node.amount -= taken;
    });
    let _ = world.ants.update(&ant_id, |ant| {
        ant.carrying = Some(colony_wars_world::Cargo {
            resource_type,
            amount: taken,
        });
    });
    let routed = query::drop_off_point(world, colony_id, site)
        .map(|drop_off| routing::route_ant(world, ant_id, drop_off, TaskType::Returning).is_ok())
        .unwrap_or(false);
    if !routed {
        let _ = world.ants.update(&ant_id, Ant::go_idle);
    }
}

fn resolve_maturation(
    world: &mut World,
    ctx: TickContext,
    rng: &mut SimRng,
    out: &mut Vec<Event>,
) {
    let mature: Vec<AntId> = world
        .ants
        .iter()
        .filter(|ant| ant.matures_at.is_some_and(|due| due <= ctx.now))
        .map(|ant| ant.id)
        .collect();
    for queen_id in mature {
        if entities::depart_on_nuptial_flight(world, queen_id, ctx.now, rng, out).is_some() {
            info!(queen = queen_id.get(), "young_queen_matured");
        }
    }
}

fn resolve_bootstrap(world: &mut World, ctx: TickContext, rng: &mut SimRng, out: &mut Vec<Event>) {
    let due: Vec<(ColonyId, Option<Position>)> = world
        .colonies
        .iter()
        .filter(|colony| {
            matches!(colony.stage, FoundingStage::Bootstrapping { first_worker_at } if first_worker_at <= ctx.now)
        })
        .map(|colony| {
            (
                colony.id,
                query::deep_chamber(world, colony.id).map(|chamber| chamber.position),
            )
        })
        .collect();

    for (colony_id, deep) in due {
        let _ = world
            .colonies
            .update(&colony_id, |colony| colony.stage = FoundingStage::Established);
        let Some(position) = deep else {
            continue;
        };
        match entities::raise_larva(
            world,
            colony_id,
            colony_wars_core::AntType::Worker,
            position,
            ctx.now,
            rng,
            out,
        ) {
            Ok(worker) => {
                let gathering = entities::assign_gathering(world, worker);
                info!(
                    colony = colony_id.get(),
                    worker = worker.get(),
                    gathering,
                    "first_worker_bootstrapped"
                );
            }
            Err(reason) => {
                debug!(colony = colony_id.get(), reason = %reason, "first_worker_skipped");
            }
        }
    }
}

fn resolve_refounding(world: &mut World, ctx: TickContext, out: &mut Vec<Event>) {
    let due: Vec<(colony_wars_core::PlayerId, PendingFounding)> = world
        .players
        .iter()
        .filter_map(|player| {
            player
                .pending_founding
                .filter(|pending| pending.due_at <= ctx.now)
                .map(|pending| (player.identity.clone(), pending))
        })
        .collect();
    for (identity, pending) in due {
        let colony = entities::found_colony(
            world,
            &identity,
            pending.position,
            pending.inherited_trait,
            ctx.now,
            out,
        );
        info!(player = %identity, colony = colony.get(), "colony_refounded");
    }
}

fn regenerate_resources(world: &mut World, ctx: TickContext) {
    let dt = ctx.dt_secs();
    let growing: Vec<_> = world
        .resources
        .iter()
        .filter(|node| node.amount < node.max_amount && node.regeneration_rate > 0.0)
        .map(|node| node.id)
        .collect();
    for node_id in growing {
        let _ = world.resources.update(&node_id, |node| {
            node.amount = (node.amount + node.regeneration_rate * dt).min(node.max_amount);
        });
    }
}

fn decay_pheromones(world: &mut World, ctx: TickContext) {
    if world.pheromones.is_empty() {
        return;
    }
    let decay = balance::PHEROMONE_DECAY_PER_SECOND * ctx.dt_secs();
    for marker in world.pheromones.iter_mut() {
        marker.strength -= decay;
    }
    let _ = world.pheromones.retain(|marker| marker.strength > 0.0);
}

fn feed_idle_ants(world: &mut World, ctx: TickContext) {
    let hungry: Vec<(AntId, ColonyId, f32)> = world
        .ants
        .iter()
        .filter(|ant| {
            ant.task == TaskType::Idle
                && !ant.on_surface()
                && query::energy(ant, ctx.now) < balance::FEEDING_ENERGY
        })
        .map(|ant| {
            (
                ant.id,
                ant.colony_id,
                balance::feed_cost(ant.ant_type, ant.ant_trait),
            )
        })
        .collect();

    for (ant_id, colony_id, cost) in hungry {
        let mut paid = false;
        let _ = world.colonies.update(&colony_id, |colony| {
            if colony.jelly >= cost {
                colony.jelly -= cost;
                paid = true;
            }
        });
        if !paid {
            debug!(ant = ant_id.get(), colony = colony_id.get(), "feeding_deferred");
            continue;
        }
        let hunger_stash = world.ants.get_mut(&ant_id).is_some_and(|ant| {
            ant.last_fed_at = ctx.now;
            ant.stashed_order
                .is_some_and(|order| order.reason == StashReason::Hunger)
        });
        if hunger_stash && routing::resume_stashed(world, ant_id) {
            debug!(ant = ant_id.get(), "fed_and_resumed");
        }
    }
}

fn heal_wounded(world: &mut World, ctx: TickContext) {
    let heal = balance::HEAL_PER_SECOND * ctx.dt_secs();
    let wounded: Vec<AntId> = world
        .ants
        .iter()
        .filter(|ant| ant.wounded && !ant.on_surface())
        .map(|ant| ant.id)
        .collect();
    for ant_id in wounded {
        let _ = world.ants.update(&ant_id, |ant| {
            ant.health = (ant.health + heal).min(ant.max_health);
            if ant.health >= ant.max_health {
                ant.wounded = false;
            }
        });
    }
}
