#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement system that integrates ant positions and resolves arrivals.

use colony_wars_core::{AntId, ColonyId, Event, Position, TaskType};
use colony_wars_world::{
    balance, entities, query, routing, Ant, Cargo, TaskTimer, TickContext, TimerKind, World,
};
use tracing::{debug, info};

/// Distance from a gathering destination within which a node can be harvested.
const GATHER_REACH: f32 = 15.0;
/// Ticks an ant waits at a blocked entrance before dropping its order.
pub const MAX_WAIT_TICKS: u32 = 100;

/// Pure system that advances every moving ant by one tick.
#[derive(Debug, Default)]
pub struct Movement {
    moving: Vec<AntId>,
    waiting: Vec<AntId>,
}

impl Movement {
    /// Creates the movement system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries blocked exits, then steps every ant with a target.
    pub fn handle(&mut self, world: &mut World, ctx: TickContext, out: &mut Vec<Event>) {
        self.waiting.clear();
        self.waiting.extend(
            world
                .ants
                .iter()
                .filter(|ant| ant.waiting_at_entrance)
                .map(|ant| ant.id),
        );
        for ant_id in self.waiting.drain(..) {
            retry_exit(world, ant_id);
        }

        self.moving.clear();
        self.moving.extend(
            world
                .ants
                .iter()
                .filter(|ant| ant.target.is_some())
                .map(|ant| ant.id),
        );
        let dt = ctx.dt_secs();
        for ant_id in self.moving.drain(..) {
            let arrived = world.ants.get_mut(&ant_id).is_some_and(|ant| {
                let Some(target) = ant.target else {
                    return false;
                };
                let mut step = ant.speed * balance::SPEED_SCALE * dt;
                if ant.wounded {
                    step *= 0.5;
                }
                let (next, arrived) = ant.position.step_toward(target, step);
                ant.position = next;
                arrived
            });
            if arrived {
                arrive(world, ant_id, ctx, out);
            }
        }
    }
}

fn retry_exit(world: &mut World, ant_id: AntId) {
    let Some(ant) = world.ants.get(&ant_id) else {
        return;
    };
    let safe = routing::entrance_is_safe(world, ant.position);
    let _ = world.ants.update(&ant_id, |ant| {
        if safe {
            routing::cross_to_surface(ant);
            debug!(ant = ant.id.get(), "exit_resumed");
            return;
        }
        ant.wait_ticks += 1;
        if ant.wait_ticks >= MAX_WAIT_TICKS {
            ant.waiting_at_entrance = false;
            ant.wait_ticks = 0;
            ant.go_idle();
            debug!(ant = ant.id.get(), "exit_abandoned");
        }
    });
}

fn arrive(world: &mut World, ant_id: AntId, ctx: TickContext, out: &mut Vec<Event>) {
    let Some(ant) = world.ants.get(&ant_id) else {
        return;
    };
    let (colony_id, position, task) = (ant.colony_id, ant.position, ant.task);

    match task {
        TaskType::Entering => {
            let entrance = query::nearest_entrance(world, colony_id, position)
                .map(|chamber| chamber.position);
            let _ = world.ants.update(&ant_id, |ant| match entrance {
                Some(entrance) => routing::cross_underground(ant, entrance),
                None => ant.go_idle(),
            });
        }
        TaskType::Exiting => {
            let safe = routing::entrance_is_safe(world, position);
            let _ = world.ants.update(&ant_id, |ant| {
                if safe {
                    routing::cross_to_surface(ant);
                } else {
                    ant.task = TaskType::Idle;
                    ant.target = None;
                    ant.waiting_at_entrance = true;
                    ant.wait_ticks = 0;
                }
            });
            if !safe {
                info!(ant = ant_id.get(), colony = colony_id.get(), "waiting_at_entrance");
            }
        }
        TaskType::Digging => {
            let _ = world.ants.update(&ant_id, |ant| {
                if ant.on_surface() {
                    ant.go_idle();
                    return;
                }
                ant.target = None;
                ant.timer = Some(TaskTimer {
                    kind: TimerKind::DigResources,
                    due_at: ctx.now.after(balance::RESOURCE_DIG_DURATION),
                });
            });
        }
        TaskType::Gathering => gather(world, ant_id),
        TaskType::Returning | TaskType::Depositing => {
            let _ = entities::deposit_cargo(world, ant_id, out);
            let _ = world.ants.update(&ant_id, Ant::go_idle);
        }
        TaskType::Fighting => {
            let _ = world.ants.update(&ant_id, |ant| ant.target = None);
        }
        TaskType::Idle | TaskType::Exploring | TaskType::Building => {
            let _ = world.ants.update(&ant_id, Ant::go_idle);
        }
    }
}

fn gather(world: &mut World, ant_id: AntId) {
    let Some(ant) = world.ants.get(&ant_id) else {
        return;
    };
    let (colony_id, position, ant_trait) = (ant.colony_id, ant.position, ant.ant_trait);
    let already_loaded = ant.carrying.is_some();

    if !already_loaded {
        let Some(node_id) = query::discovered_resource_near(world, colony_id, position, GATHER_REACH)
            .map(|node| node.id)
        else {
            debug!(ant = ant_id.get(), "nothing_to_gather");
            let _ = world.ants.update(&ant_id, Ant::go_idle);
            return;
        };
        let mut cargo = None;
        let _ = world.resources.update(&node_id, |node| {
            let amount = balance::gather_amount(ant_trait).min(node.amount);
            node.amount -= amount;
            cargo = Some(Cargo {
                resource_type: node.resource_type,
                amount,
            });
        });
        let _ = world.ants.update(&ant_id, |ant| ant.carrying = cargo);
    }

    if !return_cargo(world, ant_id, colony_id, position) {
        let _ = world.ants.update(&ant_id, Ant::go_idle);
    }
}

fn return_cargo(world: &mut World, ant_id: AntId, colony_id: ColonyId, from: Position) -> bool {
    query::drop_off_point(world, colony_id, from).is_some_and(|drop_off| {
        routing::route_ant(world, ant_id, drop_off, TaskType::Returning).is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_wars_core::{AntType, PlayerId, Timestamp};
    use colony_wars_world::{create_colony, create_player};
    use std::time::Duration;

    fn colony_with_burrow() -> (World, ColonyId) {
        let mut world = World::new();
        let mut events = Vec::new();
        let owner = PlayerId::new("player_movement");
        create_player(&mut world, &owner, "mover".into(), Timestamp::ZERO, &mut events)
            .expect("player");
        create_colony(&mut world, &owner, 0.0, 0.0, Timestamp::ZERO, &mut events)
            .expect("colony");
        let colony = world.colonies.keys()[0];
        let queen = world
            .colonies
            .get(&colony)
            .and_then(|colony| colony.queen_id)
            .expect("queen");
        entities::complete_burrow(&mut world, queen, Timestamp::from_millis(5_000), &mut events);
        (world, colony)
    }

    fn tick() -> TickContext {
        TickContext::new(Timestamp::from_millis(6_000), Duration::from_millis(100))
    }

    #[test]
    fn ants_advance_by_speed_and_snap_on_arrival() {
        let (mut world, colony) = colony_with_burrow();
        let worker = entities::spawn_ant(
            &mut world,
            colony,
            AntType::Worker,
            Position::surface(100.0, 0.0),
            None,
            Timestamp::ZERO,
        );
        let _ = world.ants.update(&worker, |ant| {
            ant.task = TaskType::Exploring;
            ant.target = Some(Position::surface(100.0, 3.0));
        });

        let mut movement = Movement::new();
        let mut events = Vec::new();
        movement.handle(&mut world, tick(), &mut events);
        let ant = world.ants.get(&worker).expect("worker");
        assert!((ant.position.y - 2.0).abs() < 1e-4);
        assert_eq!(ant.task, TaskType::Exploring);

        movement.handle(&mut world, tick(), &mut events);
        let ant = world.ants.get(&worker).expect("worker");
        assert_eq!(ant.position, Position::surface(100.0, 3.0));
        assert_eq!(ant.task, TaskType::Idle);
        assert!(ant.target.is_none());
    }

    #[test]
    fn entering_ants_continue_to_their_final_leg() {
        let (mut world, colony) = colony_with_burrow();
        let worker = entities::spawn_ant(
            &mut world,
            colony,
            AntType::Worker,
            Position::surface(0.5, 0.0),
            None,
            Timestamp::ZERO,
        );
        routing::route_ant(
            &mut world,
            worker,
            Position::new(10.0, 0.0, -10.0),
            TaskType::Exploring,
        )
        .expect("routed");
        assert_eq!(world.ants.get(&worker).map(|ant| ant.task), Some(TaskType::Entering));

        let mut events = Vec::new();
        Movement::new().handle(&mut world, tick(), &mut events);
        let ant = world.ants.get(&worker).expect("worker");
        assert_eq!(ant.position.z, -1.0);
        assert_eq!(ant.task, TaskType::Exploring);
        assert_eq!(ant.target, Some(Position::new(10.0, 0.0, -10.0)));
    }

    #[test]
    fn digging_on_arrival_starts_the_dig_timer() {
        let (mut world, colony) = colony_with_burrow();
        let worker = entities::spawn_ant(
            &mut world,
            colony,
            AntType::Worker,
            Position::new(30.0, 0.0, -5.0),
            None,
            Timestamp::ZERO,
        );
        routing::route_ant(
            &mut world,
            worker,
            Position::new(31.0, 0.0, -5.0),
            TaskType::Digging,
        )
        .expect("routed");

        let mut events = Vec::new();
        Movement::new().handle(&mut world, tick(), &mut events);
        let ant = world.ants.get(&worker).expect("worker");
        assert_eq!(ant.task, TaskType::Digging);
        assert!(ant.target.is_none());
        assert_eq!(
            ant.timer.map(|timer| timer.kind),
            Some(TimerKind::DigResources)
        );
    }
}
