//! Burrow routing: moves that cross between the surface and the underground
//! go through the colony's nearest entrance.

use colony_wars_core::{AntId, Position, Rejection, TaskType};
use tracing::debug;

use crate::{balance, query, Ant, StashReason, StashedOrder, TimerKind, World};

/// Planar distance from an entrance within which predators block exiting.
pub const ENTRANCE_SIGHT_RADIUS: f32 = 80.0;

/// Planned movement for a single ant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Route {
    /// Task for the first leg.
    pub task: TaskType,
    /// Target of the first leg.
    pub target: Position,
    /// Destination and task resumed after crossing an entrance.
    pub final_leg: Option<(Position, TaskType)>,
}

/// Surface point above an entrance where ants cross over.
#[must_use]
pub fn crossing_point(entrance: Position) -> Position {
    entrance.at_depth(0.0)
}

/// Plans how `ant` reaches `destination` to perform `task`.
pub fn plan_route(
    world: &World,
    ant: &Ant,
    destination: Position,
    task: TaskType,
) -> Result<Route, Rejection> {
    let destination = if task == TaskType::Digging && destination.is_surface() {
        destination.at_depth(balance::DIG_DEPTH)
    } else {
        destination
    };

    let from_surface = ant.position.is_surface();
    let to_surface = destination.is_surface();
    if from_surface == to_surface {
        return Ok(Route {
            task,
            target: destination,
            final_leg: None,
        });
    }

    let entrance = query::nearest_entrance(world, ant.colony_id, ant.position)
        .ok_or(Rejection::NoBurrowEntrance)?
        .position;
    let route = if from_surface {
        Route {
            task: TaskType::Entering,
            target: crossing_point(entrance),
            final_leg: Some((destination, task)),
        }
    } else {
        Route {
            task: TaskType::Exiting,
            target: entrance,
            final_leg: Some((destination, task)),
        }
    };
    Ok(route)
}

/// Applies a planned route, overriding whatever the ant was doing.
pub fn apply_route(ant: &mut Ant, route: Route) {
    ant.task = route.task;
    ant.target = Some(route.target);
    ant.final_target = route.final_leg.map(|(target, _)| target);
    ant.final_task = route.final_leg.map(|(_, task)| task);
    ant.waiting_at_entrance = false;
    ant.wait_ticks = 0;
    if ant
        .timer
        .is_some_and(|timer| timer.kind == TimerKind::DigResources)
    {
        ant.timer = None;
    }
}

/// Plans and applies a route for the ant.
pub fn route_ant(
    world: &mut World,
    ant_id: AntId,
    destination: Position,
    task: TaskType,
) -> Result<(), Rejection> {
    let ant = world.ants.get(&ant_id).ok_or(Rejection::AntMissing(ant_id))?;
    let route = plan_route(world, ant, destination, task)?;
    let _ = world.ants.update(&ant_id, |ant| apply_route(ant, route));
    Ok(())
}

/// Stashes the ant's current order and sends it to the nearest entrance.
///
/// Returns `false` if the ant is already underground, already heading in, or
/// its colony has no entrance.
pub fn send_home(world: &mut World, ant_id: AntId, reason: StashReason) -> bool {
    let Some(ant) = world.ants.get(&ant_id) else {
        return false;
    };
    if !ant.on_surface() || ant.task == TaskType::Entering {
        return false;
    }
    let Some(entrance) = query::nearest_entrance(world, ant.colony_id, ant.position)
        .map(|chamber| chamber.position)
    else {
        return false;
    };

    let _ = world.ants.update(&ant_id, |ant| {
        if ant.stashed_order.is_none() && ant.task != TaskType::Idle {
            ant.stashed_order = Some(StashedOrder {
                task: ant.final_task.unwrap_or(ant.task),
                target: ant.final_target.or(ant.target),
                reason,
            });
        }
        ant.hunt_target_id = None;
        ant.defend_target_id = None;
        apply_route(
            ant,
            Route {
                task: TaskType::Entering,
                target: crossing_point(entrance),
                final_leg: None,
            },
        );
    });
    debug!(ant = ant_id.get(), ?reason, "ant_sent_home");
    true
}

/// Resumes the ant's stashed order. Returns whether anything was resumed.
pub fn resume_stashed(world: &mut World, ant_id: AntId) -> bool {
    let Some(order) = world
        .ants
        .get_mut(&ant_id)
        .and_then(|ant| ant.stashed_order.take())
    else {
        return false;
    };
    match order.target {
        Some(target) if order.task != TaskType::Idle => {
            if route_ant(world, ant_id, target, order.task).is_err() {
                let _ = world.ants.update(&ant_id, Ant::go_idle);
                return false;
            }
            debug!(ant = ant_id.get(), task = ?order.task, "stashed_order_resumed");
            true
        }
        _ => false,
    }
}

/// Reports whether no predator is within sight of the entrance.
#[must_use]
pub fn entrance_is_safe(world: &World, entrance: Position) -> bool {
    !world
        .predators
        .iter()
        .any(|predator| predator.position.planar_distance(entrance) <= ENTRANCE_SIGHT_RADIUS)
}

/// Moves an ant standing at an entrance up to the surface and on to its final leg.
pub fn cross_to_surface(ant: &mut Ant) {
    ant.position = crossing_point(ant.position);
    ant.waiting_at_entrance = false;
    ant.wait_ticks = 0;
    match (ant.final_target.take(), ant.final_task.take()) {
        (Some(target), Some(task)) if task != TaskType::Idle => {
            ant.task = task;
            ant.target = Some(target);
        }
        _ => ant.go_idle(),
    }
}

/// Moves an ant standing above an entrance underground and on to its final leg.
pub fn cross_underground(ant: &mut Ant, entrance: Position) {
    ant.position = entrance;
    match (ant.final_target.take(), ant.final_task.take()) {
        (Some(target), Some(task)) if task != TaskType::Idle => {
            ant.task = task;
            ant.target = Some(target);
        }
        _ => ant.go_idle(),
    }
}
