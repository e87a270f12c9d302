#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Combat system resolving ant attacks against prey and predators.
//!
//! Hunters sharing a prey gain a group bonus and, once enough of them are
//! engaged, a pinned bonus. Each strike risks wounding the attacker. Defenders
//! answering a hive alert strike predators on the same cadence without bonus.

use colony_wars_core::{AntId, DeathCause, Event, PredatorId, PreyId, TaskType};
use colony_wars_world::{balance, entities, Ant, SimRng, TickContext, World};
use rand::Rng;
use tracing::debug;

/// Damage bonus per additional attacker on the same prey.
const GROUP_BONUS_PER_ATTACKER: f32 = 0.2;
/// Damage multiplier once a prey is pinned.
const PINNED_MULTIPLIER: f32 = 1.5;
/// Share of the prey's attack dealt to a wounded attacker.
const WOUND_DAMAGE_SHARE: f32 = 0.5;

/// Damage multiplier for one of `attackers` ants engaging prey with `prey_health`.
#[must_use]
pub fn hunt_multiplier(attackers: usize, prey_health: f32) -> f32 {
    if attackers == 0 {
        return 0.0;
    }
    let group = 1.0 + GROUP_BONUS_PER_ATTACKER * (attackers - 1) as f32;
    let pin_threshold = (prey_health / balance::PIN_HEALTH_PER_ATTACKER).ceil().max(1.0);
    let pinned = attackers >= 2 && attackers as f32 >= pin_threshold;
    if pinned {
        group * PINNED_MULTIPLIER
    } else {
        group
    }
}

/// Pure system that resolves automatic fighting once per tick.
#[derive(Debug, Default)]
pub struct Combat {
    engaged: Vec<AntId>,
}

impl Combat {
    /// Creates the combat system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves hunts, defences and idle fighters.
    pub fn handle(
        &mut self,
        world: &mut World,
        ctx: TickContext,
        rng: &mut SimRng,
        out: &mut Vec<Event>,
    ) {
        for prey_id in world.prey.keys() {
            self.resolve_hunt(world, prey_id, ctx, rng, out);
        }
        for predator_id in world.predators.keys() {
            self.resolve_defence(world, predator_id, ctx, out);
        }
        engage_idle_fighters(world);
    }

    fn resolve_hunt(
        &mut self,
        world: &mut World,
        prey_id: PreyId,
        ctx: TickContext,
        rng: &mut SimRng,
        out: &mut Vec<Event>,
    ) {
        let Some(prey) = world.prey.get(&prey_id) else {
            return;
        };
        let (prey_position, prey_attack) = (prey.position, prey.attack);

        self.engaged.clear();
        let mut chasing = Vec::new();
        for ant in world
            .ants
            .iter()
            .filter(|ant| ant.hunt_target_id == Some(prey_id) && ant.task == TaskType::Fighting)
        {
            if ant.position.distance(prey_position) <= balance::PREY_ENGAGE_RANGE {
                self.engaged.push(ant.id);
            } else if ant.target.is_none() {
                chasing.push(ant.id);
            }
        }
        for ant_id in chasing {
            let _ = world
                .ants
                .update(&ant_id, |ant| ant.target = Some(prey_position));
        }
        if self.engaged.is_empty() {
            return;
        }

        let attackers = self.engaged.len();
        for index in 0..attackers {
            let ant_id = self.engaged[index];
            let Some(prey_health) = world.prey.get(&prey_id).map(|prey| prey.health) else {
                return;
            };
            let multiplier = hunt_multiplier(attackers, prey_health);
            let Some((colony_id, damage)) = world.ants.get_mut(&ant_id).and_then(|ant| {
                if ant.attack_ready_at > ctx.now {
                    return None;
                }
                ant.attack_ready_at = ctx.now.after(balance::ATTACK_COOLDOWN);
                Some((ant.colony_id, ant.attack * multiplier))
            }) else {
                continue;
            };

            let killed = world.prey.get_mut(&prey_id).is_some_and(|prey| {
                prey.health -= damage;
                prey.health <= 0.0
            });
            debug!(
                ant = ant_id.get(),
                prey = prey_id.get(),
                damage,
                attackers,
                "prey_struck"
            );
            if rng.gen_bool(balance::WOUND_CHANCE) {
                wound(world, ant_id, prey_attack * WOUND_DAMAGE_SHARE, out);
            }
            if killed {
                let _ = entities::kill_prey(world, prey_id, colony_id, ctx.now, out);
                return;
            }
        }
    }

    fn resolve_defence(
        &mut self,
        world: &mut World,
        predator_id: PredatorId,
        ctx: TickContext,
        out: &mut Vec<Event>,
    ) {
        let Some(position) = world.predators.get(&predator_id).map(|p| p.position) else {
            return;
        };

        self.engaged.clear();
        let mut chasing = Vec::new();
        for ant in world
            .ants
            .iter()
            .filter(|ant| ant.defend_target_id == Some(predator_id))
        {
            if ant.position.distance(position) <= balance::PREDATOR_ENGAGE_RANGE {
                self.engaged.push(ant.id);
            } else if ant.on_surface() && ant.task == TaskType::Fighting {
                chasing.push(ant.id);
            }
        }
        for ant_id in chasing {
            let _ = world
                .ants
                .update(&ant_id, |ant| ant.target = Some(position));
        }

        for index in 0..self.engaged.len() {
            let ant_id = self.engaged[index];
            let Some(damage) = world.ants.get_mut(&ant_id).and_then(|ant| {
                if ant.attack_ready_at > ctx.now {
                    return None;
                }
                ant.attack_ready_at = ctx.now.after(balance::ATTACK_COOLDOWN);
                Some(ant.attack)
            }) else {
                continue;
            };
            let killed = world.predators.get_mut(&predator_id).is_some_and(|predator| {
                predator.health -= damage;
                predator.health <= 0.0
            });
            debug!(
                ant = ant_id.get(),
                predator = predator_id.get(),
                damage,
                "predator_struck"
            );
            if killed {
                let _ = entities::remove_predator(world, predator_id, true, out);
                return;
            }
        }
    }
}

fn wound(world: &mut World, ant_id: AntId, damage: f32, out: &mut Vec<Event>) {
    let dead = world.ants.get_mut(&ant_id).is_some_and(|ant| {
        ant.health -= damage;
        ant.wounded = true;
        ant.health <= 0.0
    });
    debug!(ant = ant_id.get(), damage, "attacker_wounded");
    if dead {
        let _ = entities::remove_ant(world, ant_id, DeathCause::Combat, out);
    }
}

/// Fighters that arrived without a live target pick up nearby prey or stand down.
fn engage_idle_fighters(world: &mut World) {
    let stalled: Vec<(AntId, Option<PreyId>)> = world
        .ants
        .iter()
        .filter(|ant| {
            ant.task == TaskType::Fighting
                && ant.target.is_none()
                && ant.hunt_target_id.is_none()
                && ant.defend_target_id.is_none()
        })
        .map(|ant| {
            let prey = world
                .prey
                .iter()
                .filter(|prey| prey.position.distance(ant.position) <= balance::PREY_ENGAGE_RANGE)
                .min_by(|a, b| {
                    a.position
                        .distance(ant.position)
                        .total_cmp(&b.position.distance(ant.position))
                })
                .map(|prey| prey.id);
            (ant.id, prey)
        })
        .collect();

    for (ant_id, prey) in stalled {
        let _ = world.ants.update(&ant_id, |ant| match prey {
            Some(prey) => ant.hunt_target_id = Some(prey),
            None => Ant::go_idle(ant),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_hunters_get_no_bonus() {
        assert_eq!(hunt_multiplier(1, 100.0), 1.0);
    }

    #[test]
    fn groups_scale_and_pin_large_prey() {
        let three_on_big = hunt_multiplier(3, 100.0);
        assert!((three_on_big - 1.4).abs() < 1e-6);

        let four_on_big = hunt_multiplier(4, 100.0);
        assert!((four_on_big - 1.6 * 1.5).abs() < 1e-6);

        let two_on_small = hunt_multiplier(2, 30.0);
        assert!((two_on_small - 1.2 * 1.5).abs() < 1e-6);
    }
}
