//! Gameplay tuning: unit stats, chamber stats, wildlife stats and timers.

use std::time::Duration;

use colony_wars_core::{AntTrait, AntType, ChamberType, PredatorKind, PreyKind};

/// Planar radius of a chamber's spatial bounds.
pub const CHAMBER_RADIUS: f32 = 20.0;
/// Depth tolerance of a chamber's spatial bounds.
pub const CHAMBER_DEPTH_TOLERANCE: f32 = 2.0;
/// Depth of a burrow's entrance chamber.
pub const ENTRANCE_DEPTH: f32 = -1.0;
/// Depth of a burrow's deep chamber.
pub const DEEP_CHAMBER_DEPTH: f32 = -10.0;
/// Depth workers descend to when ordered to dig from the surface.
pub const DIG_DEPTH: f32 = -5.0;
/// Half extent of the square map.
pub const WORLD_HALF_EXTENT: f32 = 800.0;

/// Movement distance per second for each point of speed.
pub const SPEED_SCALE: f32 = 10.0;

/// Queen jelly charged per unit of commanded travel.
pub const JELLY_PER_DISTANCE: f32 = 0.01;
/// Queen jelly charged for laying one egg.
pub const LAY_EGG_JELLY: f32 = 0.5;
/// Queen jelly consumed when the founding burrow completes.
pub const BURROW_JELLY_COST: f32 = 2.0;

/// Colonies closer than this to an existing chamber are pushed out.
pub const MIN_CHAMBER_SPACING: f32 = 60.0;
/// Distance relocated chambers are pushed to.
pub const RELOCATED_CHAMBER_SPACING: f32 = 100.0;
/// Chambers further than this are not connected by a tunnel.
pub const MAX_CONNECTED_SPACING: f32 = 150.0;
/// Width of auto-connected tunnels.
pub const TUNNEL_WIDTH: f32 = 2.0;

/// Founding queen dig duration.
pub const BURROW_DIG_DURATION: Duration = Duration::from_secs(5);
/// Egg laying duration.
pub const LAY_EGG_DURATION: Duration = Duration::from_secs(3);
/// Egg laying duration for fertile queens.
pub const FERTILE_LAY_EGG_DURATION: Duration = Duration::from_secs(2);
/// Worker resource dig duration.
pub const RESOURCE_DIG_DURATION: Duration = Duration::from_secs(3);
/// Young queen maturation before the automatic nuptial flight.
pub const YOUNG_QUEEN_MATURATION: Duration = Duration::from_secs(120);
/// Delay before a new colony is founded after a flight or collapse.
pub const REFOUNDING_DELAY: Duration = Duration::from_secs(3);
/// Delay between burrow completion and the first worker.
pub const FIRST_WORKER_DELAY: Duration = Duration::from_millis(2_500);

/// Seconds of underground life in a full stomach.
pub const ENERGY_LIFETIME_SECS: f32 = 240.0;
/// Surface energy drain multiplier.
pub const SURFACE_DRAIN_MULTIPLIER: f32 = 1.5;
/// Energy below which surface ants head home.
pub const HUNGRY_ENERGY: f32 = 25.0;
/// Energy below which idle underground ants eat.
pub const FEEDING_ENERGY: f32 = 90.0;
/// Health regained per second underground while wounded.
pub const HEAL_PER_SECOND: f32 = 5.0;

/// Starting food of a colony.
pub const SEED_FOOD: f32 = 10.0;
/// Starting water of a colony.
pub const SEED_WATER: f32 = 10.0;
/// Starting jelly of a colony.
pub const SEED_JELLY: f32 = 20.0;
/// Starting territory radius.
pub const SEED_TERRITORY_RADIUS: f32 = 50.0;
/// Radius within which a fresh burrow discovers resource nodes.
pub const FOUNDING_DISCOVERY_RADIUS: f32 = 400.0;
/// Number of nodes a fresh burrow discovers.
pub const FOUNDING_DISCOVERY_COUNT: usize = 3;

/// Interval between attacks.
pub const ATTACK_COOLDOWN: Duration = Duration::from_secs(1);
/// Engagement range against prey.
pub const PREY_ENGAGE_RANGE: f32 = 10.0;
/// Engagement range against predators.
pub const PREDATOR_ENGAGE_RANGE: f32 = 8.0;
/// Range of an explicit attack against another ant.
pub const ANT_ATTACK_RANGE: f32 = 5.0;
/// Range within which predators strike ants.
pub const PREDATOR_CONTACT_RANGE: f32 = 5.0;
/// Chance for an attacker to be wounded by prey.
pub const WOUND_CHANCE: f64 = 0.1;
/// Prey health per attacker required to pin the prey.
pub const PIN_HEALTH_PER_ATTACKER: f32 = 30.0;
/// Food multiplier for group kills.
pub const GROUP_KILL_MULTIPLIER: f32 = 1.5;
/// Age after which battle records are pruned.
pub const BATTLE_RETENTION: Duration = Duration::from_secs(30);

/// Defenders dispatched by a hive alert or a group hunt.
pub const MAX_RESPONDERS: usize = 3;
/// Casualties after which general retreat may begin.
pub const RETREAT_CASUALTY_THRESHOLD: u32 = 3;
/// Per-tick chance to enter general retreat.
pub const RETREAT_CHANCE: f64 = 0.5;
/// Calm period after the last death that lifts general retreat.
pub const RETREAT_COOLDOWN: Duration = Duration::from_secs(30);

/// Pheromone strength when laid.
pub const PHEROMONE_STRENGTH: f32 = 100.0;
/// Pheromone strength lost per second.
pub const PHEROMONE_DECAY_PER_SECOND: f32 = 2.0;

/// Base statistics of a caste.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitStats {
    /// Health at hatching.
    pub health: f32,
    /// Base speed.
    pub speed: f32,
    /// Damage per attack.
    pub attack: f32,
    /// Population slots used.
    pub population_cost: u32,
    /// Jelly needed to raise the caste from a larva, if possible at all.
    pub jelly_cost: Option<f32>,
    /// Jelly eaten per feeding.
    pub feed_cost: f32,
}

/// Looks up the balance table row for the caste.
#[must_use]
pub const fn unit_stats(ant_type: AntType) -> UnitStats {
    match ant_type {
        AntType::Queen => UnitStats {
            health: 200.0,
            speed: 0.5,
            attack: 0.0,
            population_cost: 0,
            jelly_cost: None,
            feed_cost: 0.3,
        },
        AntType::YoungQueen => UnitStats {
            health: 120.0,
            speed: 1.0,
            attack: 5.0,
            population_cost: 1,
            jelly_cost: Some(20.0),
            feed_cost: 0.2,
        },
        AntType::Worker => UnitStats {
            health: 50.0,
            speed: 2.0,
            attack: 5.0,
            population_cost: 1,
            jelly_cost: Some(2.0),
            feed_cost: 0.1,
        },
        AntType::RoyalWorker => UnitStats {
            health: 60.0,
            speed: 1.5,
            attack: 3.0,
            population_cost: 1,
            jelly_cost: Some(3.0),
            feed_cost: 0.1,
        },
        AntType::Soldier => UnitStats {
            health: 100.0,
            speed: 1.5,
            attack: 20.0,
            population_cost: 1,
            jelly_cost: Some(3.0),
            feed_cost: 0.15,
        },
        AntType::Scout => UnitStats {
            health: 30.0,
            speed: 3.0,
            attack: 10.0,
            population_cost: 1,
            jelly_cost: Some(2.5),
            feed_cost: 0.1,
        },
        AntType::Major => UnitStats {
            health: 150.0,
            speed: 1.0,
            attack: 30.0,
            population_cost: 2,
            jelly_cost: Some(5.0),
            feed_cost: 0.25,
        },
    }
}

/// Population slots used by an ant of the caste.
#[must_use]
pub const fn population_cost(ant_type: AntType) -> u32 {
    unit_stats(ant_type).population_cost
}

/// Jelly charged for the colony's very first worker.
pub const FIRST_WORKER_JELLY: f32 = 1.0;
/// Extra food charged for a young queen.
pub const YOUNG_QUEEN_FOOD: f32 = 50.0;
/// Extra water charged for a young queen.
pub const YOUNG_QUEEN_WATER: f32 = 25.0;

/// Traits a caste may roll when raised.
#[must_use]
pub const fn trait_pool(ant_type: AntType) -> &'static [AntTrait] {
    match ant_type {
        AntType::Queen | AntType::RoyalWorker => &[],
        AntType::Worker => &[
            AntTrait::Efficient,
            AntTrait::Hardy,
            AntTrait::Swift,
            AntTrait::Forager,
        ],
        AntType::Soldier => &[AntTrait::Strong, AntTrait::Hardy, AntTrait::Swift],
        AntType::Major => &[AntTrait::Strong, AntTrait::Hardy],
        AntType::Scout => &[AntTrait::Swift, AntTrait::KeenEyed],
        AntType::YoungQueen => &[AntTrait::Fertile, AntTrait::Hardy, AntTrait::Efficient],
    }
}

/// Health, speed and attack after applying a trait.
#[must_use]
pub fn with_trait(stats: UnitStats, ant_trait: Option<AntTrait>) -> (f32, f32, f32) {
    let (mut health, mut speed, mut attack) = (stats.health, stats.speed, stats.attack);
    match ant_trait {
        Some(AntTrait::Hardy) => health *= 1.25,
        Some(AntTrait::Swift) => speed *= 1.2,
        Some(AntTrait::Strong) => attack *= 1.25,
        _ => {}
    }
    (health, speed, attack)
}

/// Jelly eaten per feeding by an ant of the caste carrying the trait.
#[must_use]
pub fn feed_cost(ant_type: AntType, ant_trait: Option<AntTrait>) -> f32 {
    let base = unit_stats(ant_type).feed_cost;
    if ant_trait == Some(AntTrait::Efficient) {
        base * 0.6
    } else {
        base
    }
}

/// Amount a worker collects per gathering trip.
#[must_use]
pub fn gather_amount(ant_trait: Option<AntTrait>) -> f32 {
    if ant_trait == Some(AntTrait::Forager) {
        15.0
    } else {
        10.0
    }
}

/// Scout discovery radius.
#[must_use]
pub fn discovery_radius(ant_trait: Option<AntTrait>) -> f32 {
    if ant_trait == Some(AntTrait::KeenEyed) {
        75.0
    } else {
        50.0
    }
}

/// Egg laying duration for a queen carrying the trait.
#[must_use]
pub fn lay_egg_duration(ant_trait: Option<AntTrait>) -> Duration {
    if ant_trait == Some(AntTrait::Fertile) {
        FERTILE_LAY_EGG_DURATION
    } else {
        LAY_EGG_DURATION
    }
}

/// Capacity and cost of a chamber.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChamberStats {
    /// Population capacity.
    pub capacity: u32,
    /// Larvae capacity.
    pub larvae_capacity: u32,
    /// Food cost.
    pub food_cost: f32,
    /// Mineral cost.
    pub mineral_cost: f32,
}

/// Capacity and cost of a chamber. Burrows are paid for by the founding dig.
#[must_use]
pub const fn chamber_stats(chamber_type: ChamberType, is_entrance: bool) -> ChamberStats {
    let (capacity, larvae_capacity, food_cost, mineral_cost) = match chamber_type {
        ChamberType::Burrow if is_entrance => (0, 0, 0.0, 0.0),
        ChamberType::Burrow => (10, 5, 0.0, 0.0),
        ChamberType::Nursery => (5, 5, 20.0, 5.0),
        ChamberType::Storage => (0, 0, 15.0, 10.0),
        ChamberType::Barracks => (10, 0, 40.0, 20.0),
        ChamberType::ThroneRoom => (2, 0, 60.0, 30.0),
    };
    ChamberStats {
        capacity,
        larvae_capacity,
        food_cost,
        mineral_cost,
    }
}

/// Base statistics of a prey species.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreyStats {
    /// Health.
    pub health: f32,
    /// Speed.
    pub speed: f32,
    /// Damage dealt to wounded attackers.
    pub attack: f32,
    /// Food yielded when killed.
    pub food_value: f32,
}

/// Looks up the balance table row for the prey kind.
#[must_use]
pub const fn prey_stats(kind: PreyKind) -> PreyStats {
    match kind {
        PreyKind::Caterpillar => PreyStats {
            health: 100.0,
            speed: 0.5,
            attack: 5.0,
            food_value: 50.0,
        },
        PreyKind::Beetle => PreyStats {
            health: 60.0,
            speed: 1.0,
            attack: 15.0,
            food_value: 30.0,
        },
        PreyKind::Grasshopper => PreyStats {
            health: 30.0,
            speed: 2.5,
            attack: 8.0,
            food_value: 15.0,
        },
    }
}

/// Base statistics of a predator species.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PredatorStats {
    /// Health.
    pub health: f32,
    /// Speed.
    pub speed: f32,
    /// Damage per strike.
    pub attack: f32,
    /// Distance within which ants are noticed.
    pub hunt_radius: f32,
}

/// Looks up the balance table row for the predator kind.
#[must_use]
pub const fn predator_stats(kind: PredatorKind) -> PredatorStats {
    match kind {
        PredatorKind::Bird => PredatorStats {
            health: 80.0,
            speed: 4.0,
            attack: 30.0,
            hunt_radius: 100.0,
        },
        PredatorKind::Spider => PredatorStats {
            health: 100.0,
            speed: 2.0,
            attack: 25.0,
            hunt_radius: 50.0,
        },
    }
}
