//! Random seeding of the shared world: resource nodes, obstacles and wildlife.

use colony_wars_core::{
    ObstacleId, ObstacleKind, Position, PredatorId, PredatorKind, PreyId, PreyKind, ResourceType,
    TableName, Timestamp,
};
use rand::Rng;
use tracing::info;

use crate::{
    balance::{self, WORLD_HALF_EXTENT},
    entities, Obstacle, Predator, Prey, SimRng, World,
};

const FOOD_NODES: usize = 12;
const MINERAL_NODES: usize = 4;
const OBSTACLES: usize = 15;
const PREY_COUNT: usize = 8;
const BIRDS: usize = 2;
const SPIDERS: usize = 2;
/// Predators never spawn closer than this to the map center.
const PREDATOR_MIN_DISTANCE: f32 = 250.0;

/// Seeds resource nodes, obstacles, prey and predators.
pub fn populate(world: &mut World, rng: &mut SimRng) {
    let spread = WORLD_HALF_EXTENT * 0.8;

    for _ in 0..FOOD_NODES {
        let position = random_surface(rng, spread);
        let amount = rng.gen_range(200.0..500.0_f32).round();
        let regeneration = rng.gen_range(0.5..1.0);
        let _ = entities::insert_resource(
            world,
            ResourceType::Food,
            position,
            amount,
            regeneration,
            false,
        );
    }
    for _ in 0..MINERAL_NODES {
        let surface = random_surface(rng, spread);
        let position = surface.at_depth(rng.gen_range(-30.0..-15.0));
        let _ = entities::insert_resource(
            world,
            ResourceType::Minerals,
            position,
            500.0,
            0.5,
            false,
        );
    }
    for _ in 0..OBSTACLES {
        let kind = if rng.gen_bool(0.5) {
            ObstacleKind::Rock
        } else {
            ObstacleKind::Plant
        };
        let id = ObstacleId::new(world.next_id(TableName::Obstacle));
        world.obstacles.insert(Obstacle {
            id,
            kind,
            position: random_surface(rng, spread),
            radius: rng.gen_range(5.0..20.0),
        });
    }
    for index in 0..PREY_COUNT {
        let kind = match index % 3 {
            0 => PreyKind::Caterpillar,
            1 => PreyKind::Beetle,
            _ => PreyKind::Grasshopper,
        };
        let position = random_surface(rng, spread);
        let _ = spawn_prey(world, kind, position);
    }
    for (kind, count) in [(PredatorKind::Bird, BIRDS), (PredatorKind::Spider, SPIDERS)] {
        for _ in 0..count {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let distance = rng.gen_range(PREDATOR_MIN_DISTANCE..spread);
            let position = Position::surface(angle.cos() * distance, angle.sin() * distance);
            let _ = spawn_predator(world, kind, position, Timestamp::ZERO);
        }
    }

    info!(
        resources = world.resources.len(),
        obstacles = world.obstacles.len(),
        prey = world.prey.len(),
        predators = world.predators.len(),
        "world_generated"
    );
}

/// Inserts a prey animal with its species' stats.
pub fn spawn_prey(world: &mut World, kind: PreyKind, position: Position) -> PreyId {
    let stats = balance::prey_stats(kind);
    let id = PreyId::new(world.next_id(TableName::Prey));
    world.prey.insert(Prey {
        id,
        kind,
        position,
        health: stats.health,
        max_health: stats.health,
        speed: stats.speed,
        attack: stats.attack,
        food_value: stats.food_value,
        hunted_by: None,
        wander_target: None,
    });
    id
}

/// Inserts a predator with its species' stats.
pub fn spawn_predator(
    world: &mut World,
    kind: PredatorKind,
    position: Position,
    now: Timestamp,
) -> PredatorId {
    let stats = balance::predator_stats(kind);
    let id = PredatorId::new(world.next_id(TableName::Predator));
    world.predators.insert(Predator {
        id,
        kind,
        position,
        health: stats.health,
        max_health: stats.health,
        speed: stats.speed,
        attack: stats.attack,
        hunt_radius: stats.hunt_radius,
        target_ant_id: None,
        boredom: 0,
        scout_detected: false,
        attack_ready_at: now,
        wander_target: None,
    });
    id
}

/// Uniformly random surface point within `spread` of the map center.
pub fn random_surface(rng: &mut SimRng, spread: f32) -> Position {
    Position::surface(rng.gen_range(-spread..spread), rng.gen_range(-spread..spread))
}
