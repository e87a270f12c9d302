//! Entity records stored in the world tables.
//!
//! Every optional field an entity may carry is declared up front so that a
//! persisted row always round-trips into the same shape.

use colony_wars_core::{
    AntId, AntTrait, AntType, AttackTarget, BattleId, ChamberId, ChamberType, ColonyId,
    DiscoveryId, LarvaId, ObstacleId, ObstacleKind, PheromoneId, PheromoneKind, PlayerId,
    Position, PredatorId, PredatorKind, PreyId, PreyKind, ResourceId, ResourceType, TableName,
    TaskType, TerritoryId, Timestamp, TunnelId,
};
use serde::{Deserialize, Serialize};

use crate::store::Row;

macro_rules! impl_row {
    ($record:ty, $key:ty, $table:expr, $field:ident) => {
        impl Row for $record {
            type Key = $key;
            const TABLE: TableName = $table;

            fn key(&self) -> $key {
                self.$field.clone()
            }
        }
    };
}

/// A founding that will be carried out by the tick loop once due.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingFounding {
    /// Moment the new colony is founded.
    pub due_at: Timestamp,
    /// Surface location of the new burrow.
    pub position: Position,
    /// Trait carried by the new queen.
    pub inherited_trait: Option<AntTrait>,
}

/// Registered player and their lifetime progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Identity owning the record.
    pub identity: PlayerId,
    /// Display name.
    pub username: String,
    /// Registration time.
    pub created_at: Timestamp,
    /// Colonies ever founded by the player.
    pub colonies_founded: u32,
    /// Generations that ended with a nuptial flight.
    pub generations_survived: u32,
    /// Young queens that departed on nuptial flights.
    pub queens_produced: u32,
    /// Highest colony score recorded at a nuptial flight.
    pub best_colony_score: f32,
    /// Total cargo deposited across every colony.
    pub resources_gathered: f32,
    /// Colony waiting to be founded automatically.
    #[serde(default)]
    pub pending_founding: Option<PendingFounding>,
}

impl_row!(Player, PlayerId, TableName::Player, identity);

/// Lifecycle stage of a freshly founded colony.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum FoundingStage {
    /// The queen is digging the burrow on the surface.
    Digging,
    /// The burrow exists and the first worker hatches at the given time.
    Bootstrapping {
        /// Moment the first worker is raised.
        first_worker_at: Timestamp,
    },
    /// The colony runs on its own.
    Established,
}

/// Most recent attack that put the colony on alert.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreatAlert {
    /// Predator responsible for the attack.
    pub predator: PredatorId,
    /// Location of the attack.
    pub location: Position,
    /// Time of the attack.
    pub at: Timestamp,
}

/// A player's colony.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    /// Identifier of the colony.
    pub id: ColonyId,
    /// Identity owning the colony.
    pub owner: PlayerId,
    /// Founding queen; the colony is torn down once she no longer exists.
    pub queen_id: Option<AntId>,
    /// Food stores.
    pub food: f32,
    /// Water stores.
    pub water: f32,
    /// Mineral stores.
    pub minerals: f32,
    /// Queen jelly, the production and movement currency.
    pub jelly: f32,
    /// Number of larvae; reconciled against the larva table every tick.
    pub larvae: u32,
    /// Sum of the population cost of every ant in the colony.
    pub population: u32,
    /// Whether the colony manages itself.
    pub ai_enabled: bool,
    /// Radius of the colony's claimed territory.
    pub territory_radius: f32,
    /// Trait inherited from the previous generation.
    pub inherited_trait: Option<AntTrait>,
    /// Generation index of the colony for its owner.
    pub generation: u32,
    /// Founding progress.
    pub stage: FoundingStage,
    /// Surface location where the burrow is dug.
    pub origin: Position,
    /// Predator kills suffered since the last calm period.
    pub casualties: u32,
    /// Whether every ant is ordered underground.
    pub general_retreat: bool,
    /// Time of the most recent predator kill.
    pub last_death_at: Option<Timestamp>,
    /// Most recent hive alert.
    pub threat: Option<ThreatAlert>,
    /// Total cargo deposited by the colony.
    pub resources_gathered: f32,
    /// Founding time.
    pub created_at: Timestamp,
}

impl_row!(Colony, ColonyId, TableName::Colony, id);

impl Colony {
    /// Amount stored for the provided resource.
    #[must_use]
    pub fn stored(&self, resource: ResourceType) -> f32 {
        match resource {
            ResourceType::Food => self.food,
            ResourceType::Water => self.water,
            ResourceType::Minerals => self.minerals,
            ResourceType::Larvae => self.larvae as f32,
        }
    }

    /// Adds cargo to the matching store. Larvae are not depositable.
    pub fn deposit(&mut self, resource: ResourceType, amount: f32) {
        match resource {
            ResourceType::Food => self.food += amount,
            ResourceType::Water => self.water += amount,
            ResourceType::Minerals => self.minerals += amount,
            ResourceType::Larvae => {}
        }
    }
}

/// Resource carried by an ant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    /// Kind of resource.
    pub resource_type: ResourceType,
    /// Quantity carried.
    pub amount: f32,
}

/// Why an order was set aside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StashReason {
    /// The ant went home to eat.
    Hunger,
    /// The ant was pulled underground by danger.
    Retreat,
}

/// Order set aside while an ant deals with hunger or danger.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StashedOrder {
    /// Task to resume.
    pub task: TaskType,
    /// Destination to resume toward.
    pub target: Option<Position>,
    /// Reason the order was stashed.
    pub reason: StashReason,
}

/// Deferred completions attached to an ant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Queen finishes digging the founding burrow.
    FoundBurrow,
    /// Queen finishes laying an egg.
    LayEgg,
    /// Worker finishes digging for water and minerals.
    DigResources,
}

/// Deferred completion checked by the tick loop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskTimer {
    /// Completion effect.
    pub kind: TimerKind,
    /// Moment the effect applies.
    pub due_at: Timestamp,
}

/// A single ant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ant {
    /// Identifier of the ant.
    pub id: AntId,
    /// Owning colony.
    pub colony_id: ColonyId,
    /// Caste.
    pub ant_type: AntType,
    /// Current location.
    pub position: Position,
    /// Remaining health.
    pub health: f32,
    /// Health ceiling.
    pub max_health: f32,
    /// Carried resource, at most one kind at a time.
    pub carrying: Option<Cargo>,
    /// Current activity.
    pub task: TaskType,
    /// Movement target; always `None` while idle.
    pub target: Option<Position>,
    /// Base speed in world units per tenth of a second.
    pub speed: f32,
    /// Damage dealt per attack.
    pub attack: f32,
    /// Last feeding, driving energy decay.
    pub last_fed_at: Timestamp,
    /// Heritable modifier.
    pub ant_trait: Option<AntTrait>,
    /// Maturation deadline of a young queen.
    pub matures_at: Option<Timestamp>,
    /// Destination to resume after crossing a burrow entrance.
    pub final_target: Option<Position>,
    /// Task to resume after crossing a burrow entrance.
    pub final_task: Option<TaskType>,
    /// Order set aside for hunger or retreat.
    pub stashed_order: Option<StashedOrder>,
    /// Waiting underground at an entrance for predators to leave.
    pub waiting_at_entrance: bool,
    /// Ticks spent waiting at the entrance.
    pub wait_ticks: u32,
    /// Wounded ants move at half speed until healed underground.
    pub wounded: bool,
    /// Prey this ant is hunting.
    pub hunt_target_id: Option<PreyId>,
    /// Predator this ant is defending against.
    pub defend_target_id: Option<PredatorId>,
    /// Earliest time of the next attack.
    pub attack_ready_at: Timestamp,
    /// Deferred completion in progress.
    pub timer: Option<TaskTimer>,
    /// Hatching time.
    pub created_at: Timestamp,
}

impl_row!(Ant, AntId, TableName::Ant, id);

impl Ant {
    /// Drops every order and movement target.
    pub fn go_idle(&mut self) {
        self.task = TaskType::Idle;
        self.target = None;
        self.final_target = None;
        self.final_task = None;
        self.hunt_target_id = None;
        self.defend_target_id = None;
    }

    /// Reports whether the ant is above ground.
    #[must_use]
    pub fn on_surface(&self) -> bool {
        self.position.is_surface()
    }

    /// Reports whether the ant is free to receive automatic assignments.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.task == TaskType::Idle
            && !self.waiting_at_entrance
            && self.timer.is_none()
            && self.stashed_order.is_none()
    }
}

/// Passage between two chambers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tunnel {
    /// Identifier of the tunnel.
    pub id: TunnelId,
    /// Owning colony.
    pub colony_id: ColonyId,
    /// Start point.
    pub start: Position,
    /// End point.
    pub end: Position,
    /// Passage width.
    pub width: f32,
}

impl_row!(Tunnel, TunnelId, TableName::Tunnel, id);

/// Excavated room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chamber {
    /// Identifier of the chamber.
    pub id: ChamberId,
    /// Owning colony.
    pub colony_id: ColonyId,
    /// Kind of chamber.
    pub chamber_type: ChamberType,
    /// Center of the chamber.
    pub position: Position,
    /// Upgrade level.
    pub level: u32,
    /// Population capacity contributed.
    pub capacity: u32,
    /// Larvae the chamber can hold.
    pub larvae_capacity: u32,
    /// Larvae currently in the chamber.
    pub larvae_count: u32,
    /// Whether this is a burrow's shallow entrance.
    pub is_entrance: bool,
    /// Construction time.
    pub created_at: Timestamp,
}

impl_row!(Chamber, ChamberId, TableName::Chamber, id);

impl Chamber {
    /// Reports whether a position lies within the chamber's spatial bounds.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.position.planar_distance(position) <= crate::balance::CHAMBER_RADIUS
            && (self.position.z - position.z).abs() <= crate::balance::CHAMBER_DEPTH_TOLERANCE
    }

    /// Reports whether another larva fits in the chamber.
    #[must_use]
    pub fn has_larvae_headroom(&self) -> bool {
        self.larvae_count < self.larvae_capacity
    }
}

/// Harvestable resource deposit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Identifier of the node.
    pub id: ResourceId,
    /// Kind of resource.
    pub resource_type: ResourceType,
    /// Location of the deposit.
    pub position: Position,
    /// Remaining amount.
    pub amount: f32,
    /// Amount ceiling.
    pub max_amount: f32,
    /// Amount regained per second.
    pub regeneration_rate: f32,
    /// Whether the node is a prey carcass.
    pub from_prey: bool,
}

impl_row!(ResourceNode, ResourceId, TableName::ResourceNode, id);

/// Scent marker laid by a colony.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pheromone {
    /// Identifier of the marker.
    pub id: PheromoneId,
    /// Colony that laid it.
    pub colony_id: ColonyId,
    /// Location of the marker.
    pub position: Position,
    /// Purpose of the marker.
    pub kind: PheromoneKind,
    /// Remaining strength; the marker fades at zero.
    pub strength: f32,
}

impl_row!(Pheromone, PheromoneId, TableName::Pheromone, id);

/// Record of an explicit attack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    /// Identifier of the record.
    pub id: BattleId,
    /// Colony of the attacker.
    pub colony_id: ColonyId,
    /// Attacking ant.
    pub attacker_id: AntId,
    /// Entity attacked.
    pub target: AttackTarget,
    /// Location of the attack.
    pub position: Position,
    /// Damage dealt.
    pub damage: f32,
    /// Time of the attack.
    pub at: Timestamp,
}

impl_row!(Battle, BattleId, TableName::Battle, id);

/// A map cell a colony's scouts have visited.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExploredTerritory {
    /// Identifier of the fact.
    pub id: TerritoryId,
    /// Colony that explored the cell.
    pub colony_id: ColonyId,
    /// Cell column.
    pub cell_x: i32,
    /// Cell row.
    pub cell_y: i32,
    /// Whether the cell holds resource nodes.
    pub has_resources: bool,
    /// Whether predators were sighted nearby.
    pub has_threats: bool,
    /// Number of predators sighted nearby.
    pub threat_level: u32,
    /// Exploration time.
    pub explored_at: Timestamp,
}

impl_row!(ExploredTerritory, TerritoryId, TableName::ExploredTerritory, id);

/// A resource node known to a colony.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredResource {
    /// Identifier of the fact.
    pub id: DiscoveryId,
    /// Colony that knows about the node.
    pub colony_id: ColonyId,
    /// Node that was discovered.
    pub resource_id: ResourceId,
    /// Discovery time.
    pub discovered_at: Timestamp,
}

impl_row!(DiscoveredResource, DiscoveryId, TableName::DiscoveredResource, id);

/// Terrain feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Identifier of the obstacle.
    pub id: ObstacleId,
    /// Kind of obstacle.
    pub kind: ObstacleKind,
    /// Center of the obstacle.
    pub position: Position,
    /// Footprint radius.
    pub radius: f32,
}

impl_row!(Obstacle, ObstacleId, TableName::Obstacle, id);

/// Huntable surface animal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prey {
    /// Identifier of the animal.
    pub id: PreyId,
    /// Species.
    pub kind: PreyKind,
    /// Current location.
    pub position: Position,
    /// Remaining health.
    pub health: f32,
    /// Health ceiling.
    pub max_health: f32,
    /// Speed in world units per tenth of a second.
    pub speed: f32,
    /// Damage dealt to attackers that get wounded.
    pub attack: f32,
    /// Food yielded when killed.
    pub food_value: f32,
    /// Colony that tagged the animal for a group hunt.
    pub hunted_by: Option<ColonyId>,
    /// Current wandering destination.
    pub wander_target: Option<Position>,
}

impl_row!(Prey, PreyId, TableName::Prey, id);

/// Surface predator that hunts ants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Predator {
    /// Identifier of the predator.
    pub id: PredatorId,
    /// Species.
    pub kind: PredatorKind,
    /// Current location.
    pub position: Position,
    /// Remaining health.
    pub health: f32,
    /// Health ceiling.
    pub max_health: f32,
    /// Speed in world units per tenth of a second.
    pub speed: f32,
    /// Damage dealt per attack.
    pub attack: f32,
    /// Distance within which ants are noticed.
    pub hunt_radius: f32,
    /// Ant being hunted.
    pub target_ant_id: Option<AntId>,
    /// Ticks spent without a target.
    pub boredom: u32,
    /// Whether a scout has spotted the predator.
    pub scout_detected: bool,
    /// Earliest time of the next attack.
    pub attack_ready_at: Timestamp,
    /// Current wandering destination.
    pub wander_target: Option<Position>,
}

impl_row!(Predator, PredatorId, TableName::Predator, id);

/// Egg laid by a queen, waiting to be raised.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Larva {
    /// Identifier of the larva.
    pub id: LarvaId,
    /// Owning colony.
    pub colony_id: ColonyId,
    /// Chamber housing the larva.
    pub chamber_id: Option<ChamberId>,
    /// Location inside the chamber.
    pub position: Position,
    /// Laying time.
    pub created_at: Timestamp,
}

impl_row!(Larva, LarvaId, TableName::Larva, id);
