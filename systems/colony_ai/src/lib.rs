#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Colony bookkeeping and the automatic colony manager.
//!
//! Every colony pays jelly upkeep and has its larvae counters rebuilt from the
//! larva table. Colonies with AI enabled additionally follow a fixed build
//! order, keep their queen laying, turn food into jelly through royal workers
//! and put idle workers and scouts to use.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use colony_wars_core::{AntId, AntType, ChamberId, ColonyId, Event, Position, TaskType};
use colony_wars_world::{
    balance, entities, query, routing, FoundingStage, SimRng, TickContext, World,
};
use rand::Rng;
use tracing::{debug, info};

/// Jelly lost per second by every colony.
pub const JELLY_DECAY_PER_SECOND: f32 = 0.2;
/// Castes raised in order, each up to the given head count.
pub const BUILD_ORDER: [(AntType, usize); 4] = [
    (AntType::Worker, 2),
    (AntType::Scout, 1),
    (AntType::Soldier, 2),
    (AntType::RoyalWorker, 1),
];

const RELAY_CHANCE: f64 = 0.05;
const ROYAL_CONVERSION_CHANCE: f64 = 0.1;
const ROYAL_FOOD_COST: f32 = 5.0;
const ROYAL_MINERAL_COST: f32 = 2.0;
const ROYAL_JELLY_YIELD: f32 = 5.0;
const WORKER_ASSIGN_CHANCE: f64 = 0.3;
const SCOUT_EXPLORE_CHANCE: f64 = 0.2;
const SCOUT_MIN_RANGE: f32 = 100.0;
const SCOUT_MAX_RANGE: f32 = 300.0;
const EMERGENCY_JELLY_FLOOR: f32 = 10.0;
const EMERGENCY_FOOD_FLOOR: f32 = 20.0;
const EMERGENCY_FOOD_COST: f32 = 10.0;
const EMERGENCY_JELLY_YIELD: f32 = 5.0;

/// Pure system that keeps colony counters honest and runs enabled colonies.
#[derive(Debug, Default)]
pub struct ColonyAi {
    colony_larvae: BTreeMap<ColonyId, u32>,
    chamber_larvae: BTreeMap<ChamberId, u32>,
}

impl ColonyAi {
    /// Creates the colony AI system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies upkeep, reconciles larvae and runs every AI-enabled colony.
    pub fn handle(
        &mut self,
        world: &mut World,
        ctx: TickContext,
        rng: &mut SimRng,
        out: &mut Vec<Event>,
    ) {
        decay_jelly(world, ctx);
        self.reconcile_larvae(world);

        for colony_id in world.colonies.keys() {
            let Some(colony) = world.colonies.get(&colony_id) else {
                continue;
            };
            if !colony.ai_enabled || colony.stage != FoundingStage::Established {
                continue;
            }
            let sheltering = colony.general_retreat;

            follow_build_order(world, colony_id, ctx, rng, out);
            relay_eggs(world, colony_id, ctx, rng);
            convert_royal_jelly(world, colony_id, rng);
            if !sheltering {
                assign_idle_workers(world, colony_id, rng);
                send_idle_scouts(world, colony_id, rng);
            }
            emergency_conversion(world, colony_id);
        }
    }

    fn reconcile_larvae(&mut self, world: &mut World) {
        self.colony_larvae.clear();
        self.chamber_larvae.clear();
        for larva in world.larvae.iter() {
            *self.colony_larvae.entry(larva.colony_id).or_default() += 1;
            if let Some(chamber_id) = larva.chamber_id {
                *self.chamber_larvae.entry(chamber_id).or_default() += 1;
            }
        }

        let drifted: Vec<(ColonyId, u32)> = world
            .colonies
            .iter()
            .filter_map(|colony| {
                let actual = self.colony_larvae.get(&colony.id).copied().unwrap_or(0);
                (colony.larvae != actual).then_some((colony.id, actual))
            })
            .collect();
        for (colony_id, actual) in drifted {
            let _ = world.colonies.update(&colony_id, |colony| colony.larvae = actual);
            debug!(colony = colony_id.get(), larvae = actual, "colony_larvae_reconciled");
        }

        let drifted: Vec<(ChamberId, u32)> = world
            .chambers
            .iter()
            .filter_map(|chamber| {
                let actual = self.chamber_larvae.get(&chamber.id).copied().unwrap_or(0);
                (chamber.larvae_count != actual).then_some((chamber.id, actual))
            })
            .collect();
        for (chamber_id, actual) in drifted {
            let _ = world
                .chambers
                .update(&chamber_id, |chamber| chamber.larvae_count = actual);
            debug!(chamber = chamber_id.get(), larvae = actual, "chamber_larvae_reconciled");
        }
    }
}

fn decay_jelly(world: &mut World, ctx: TickContext) {
    let decay = JELLY_DECAY_PER_SECOND * ctx.dt_secs();
    for colony in world.colonies.iter_mut() {
        colony.jelly = (colony.jelly - decay).max(0.0);
    }
}

/// Raises at most one larva into the first caste still below its head count.
fn follow_build_order(
    world: &mut World,
    colony_id: ColonyId,
    ctx: TickContext,
    rng: &mut SimRng,
    out: &mut Vec<Event>,
) {
    let Some((ant_type, wanted)) = BUILD_ORDER
        .iter()
        .copied()
        .find(|(ant_type, wanted)| query::count_ants(world, colony_id, *ant_type) < *wanted)
    else {
        return;
    };
    let Some(nursery) = query::deep_chamber(world, colony_id).map(|chamber| chamber.position)
    else {
        return;
    };

    match entities::raise_larva(world, colony_id, ant_type, nursery, ctx.now, rng, out) {
        Ok(ant_id) => {
            info!(
                colony = colony_id.get(),
                ?ant_type,
                have = query::count_ants(world, colony_id, ant_type),
                wanted,
                "colony_building"
            );
            if ant_type == AntType::Worker {
                let _ = entities::assign_gathering(world, ant_id);
            }
        }
        Err(reason) => {
            debug!(colony = colony_id.get(), ?ant_type, reason = %reason, "build_order_waiting");
        }
    }
}

fn relay_eggs(world: &mut World, colony_id: ColonyId, ctx: TickContext, rng: &mut SimRng) {
    let Some(queen_id) = world
        .colonies
        .get(&colony_id)
        .and_then(|colony| colony.queen_id)
    else {
        return;
    };
    let laying = world
        .ants
        .get(&queen_id)
        .is_some_and(|queen| queen.timer.is_some());
    if laying || !rng.gen_bool(RELAY_CHANCE) {
        return;
    }
    if let Err(reason) = entities::start_laying(world, queen_id, ctx.now) {
        debug!(colony = colony_id.get(), reason = %reason, "queen_not_laying");
    }
}

fn convert_royal_jelly(world: &mut World, colony_id: ColonyId, rng: &mut SimRng) {
    let royals = query::count_ants(world, colony_id, AntType::RoyalWorker);
    for _ in 0..royals {
        if !rng.gen_bool(ROYAL_CONVERSION_CHANCE) {
            continue;
        }
        let _ = world.colonies.update(&colony_id, |colony| {
            if colony.food >= ROYAL_FOOD_COST && colony.minerals >= ROYAL_MINERAL_COST {
                colony.food -= ROYAL_FOOD_COST;
                colony.minerals -= ROYAL_MINERAL_COST;
                colony.jelly += ROYAL_JELLY_YIELD;
                debug!(colony = colony_id.get(), jelly = colony.jelly, "royal_jelly_produced");
            }
        });
    }
}

fn idle_of_type(world: &World, colony_id: ColonyId, ant_type: AntType) -> Vec<AntId> {
    world
        .ants
        .iter()
        .filter(|ant| {
            ant.colony_id == colony_id && ant.ant_type == ant_type && ant.is_available()
        })
        .map(|ant| ant.id)
        .collect()
}

fn assign_idle_workers(world: &mut World, colony_id: ColonyId, rng: &mut SimRng) {
    for worker in idle_of_type(world, colony_id, AntType::Worker) {
        if rng.gen_bool(WORKER_ASSIGN_CHANCE) && entities::assign_gathering(world, worker) {
            debug!(worker = worker.get(), "idle_worker_assigned");
        }
    }
}

fn send_idle_scouts(world: &mut World, colony_id: ColonyId, rng: &mut SimRng) {
    let Some(home) = world
        .colonies
        .get(&colony_id)
        .and_then(|colony| colony.queen_id)
        .and_then(|queen| world.ants.get(&queen))
        .map(|queen| queen.position)
    else {
        return;
    };
    let extent = balance::WORLD_HALF_EXTENT;
    for scout in idle_of_type(world, colony_id, AntType::Scout) {
        if !rng.gen_bool(SCOUT_EXPLORE_CHANCE) {
            continue;
        }
        let angle = rng.gen_range(0.0..TAU);
        let range = rng.gen_range(SCOUT_MIN_RANGE..SCOUT_MAX_RANGE);
        let destination = Position::surface(
            (home.x + angle.cos() * range).clamp(-extent, extent),
            (home.y + angle.sin() * range).clamp(-extent, extent),
        );
        match routing::route_ant(world, scout, destination, TaskType::Exploring) {
            Ok(()) => debug!(scout = scout.get(), ?destination, "scout_sent_exploring"),
            Err(reason) => debug!(scout = scout.get(), reason = %reason, "scout_stayed_home"),
        }
    }
}

fn emergency_conversion(world: &mut World, colony_id: ColonyId) {
    let _ = world.colonies.update(&colony_id, |colony| {
        if colony.jelly < EMERGENCY_JELLY_FLOOR && colony.food >= EMERGENCY_FOOD_FLOOR {
            colony.food -= EMERGENCY_FOOD_COST;
            colony.jelly += EMERGENCY_JELLY_YIELD;
            info!(
                colony = colony_id.get(),
                jelly = colony.jelly,
                food = colony.food,
                "emergency_jelly_conversion"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_wars_core::{PlayerId, Timestamp};
    use colony_wars_world::{create_colony, create_player, seeded_rng};
    use std::time::Duration;

    #[test]
    fn jelly_decays_even_without_ai_and_never_goes_negative() {
        let mut world = World::new();
        let mut events = Vec::new();
        let owner = PlayerId::new("player_upkeep");
        create_player(&mut world, &owner, "upkeep".into(), Timestamp::ZERO, &mut events)
            .expect("player");
        create_colony(&mut world, &owner, 0.0, 0.0, Timestamp::ZERO, &mut events)
            .expect("colony");
        let colony = world.colonies.keys()[0];
        let _ = world.colonies.update(&colony, |colony| {
            colony.ai_enabled = false;
            colony.jelly = 1.0;
        });

        let ctx = TickContext::new(Timestamp::from_millis(100), Duration::from_millis(100));
        let mut ai = ColonyAi::new();
        let mut rng = seeded_rng(1);
        ai.handle(&mut world, ctx, &mut rng, &mut events);
        let jelly = world.colonies.get(&colony).map(|colony| colony.jelly);
        assert!(jelly.is_some_and(|jelly| (jelly - 0.98).abs() < 1e-5));

        let long = TickContext::new(Timestamp::from_millis(60_000), Duration::from_secs(60));
        ai.handle(&mut world, long, &mut rng, &mut events);
        assert_eq!(world.colonies.get(&colony).map(|colony| colony.jelly), Some(0.0));
    }
}
