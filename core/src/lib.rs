#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Colony Wars simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the tick systems. Adapters submit [`Command`]
//! values describing desired mutations on behalf of a [`PlayerId`], the world
//! validates and executes those commands via its `apply` entry point, and both
//! commands and ticks broadcast [`Event`] values describing what happened.
//! Rejected commands surface as a typed [`Rejection`] rather than a panic.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

pub mod ids;

pub use ids::{
    AntId, BattleId, ChamberId, ColonyId, DiscoveryId, LarvaId, ObstacleId, PheromoneId,
    PredatorId, PreyId, ResourceId, TerritoryId, TunnelId,
};

/// Depth separating the surface from the underground.
///
/// Positions with `z` strictly above this value are on the surface.
pub const SURFACE_DEPTH_THRESHOLD: f32 = -0.5;

/// Opaque identity string used as the tenancy boundary for every command.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a new player identity from the provided string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the underlying identity string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point in simulated time measured in milliseconds since the simulation epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Simulation epoch.
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from a millisecond count.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Millisecond count represented by the timestamp.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns the timestamp shifted forward by the provided duration.
    #[must_use]
    pub fn after(self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Time elapsed since an earlier timestamp, saturating at zero.
    #[must_use]
    pub fn since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Seconds elapsed since an earlier timestamp as a float, saturating at zero.
    #[must_use]
    pub fn seconds_since(self, earlier: Timestamp) -> f32 {
        self.since(earlier).as_secs_f32()
    }
}

/// Location in the three-dimensional world.
///
/// `z` encodes depth: zero is the surface, negative values are underground.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// East-west coordinate.
    pub x: f32,
    /// North-south coordinate.
    pub y: f32,
    /// Depth coordinate; negative values lie underground.
    pub z: f32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Creates a position on the surface.
    #[must_use]
    pub const fn surface(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Euclidean distance between two positions, depth included.
    #[must_use]
    pub fn distance(self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance between two positions projected onto the map plane.
    #[must_use]
    pub fn planar_distance(self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Reports whether the position lies on the surface.
    #[must_use]
    pub fn is_surface(self) -> bool {
        self.z > SURFACE_DEPTH_THRESHOLD
    }

    /// Returns the same map location at a different depth.
    #[must_use]
    pub const fn at_depth(self, z: f32) -> Self {
        Self {
            x: self.x,
            y: self.y,
            z,
        }
    }

    /// Moves toward `target` by at most `step` units, returning the new
    /// position and whether the target was reached.
    #[must_use]
    pub fn step_toward(self, target: Position, step: f32) -> (Position, bool) {
        let distance = self.distance(target);
        if distance <= step || distance <= f32::EPSILON {
            return (target, true);
        }
        let scale = step / distance;
        let next = Position::new(
            self.x + (target.x - self.x) * scale,
            self.y + (target.y - self.y) * scale,
            self.z + (target.z - self.z) * scale,
        );
        (next, false)
    }
}

/// Castes of ants a colony can raise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AntType {
    /// Founding queen; the colony dies with her.
    Queen,
    /// Princess raised in a throne room who leaves on a nuptial flight.
    YoungQueen,
    /// General-purpose gatherer and builder.
    Worker,
    /// Converts food and minerals into queen jelly.
    RoyalWorker,
    /// Front-line fighter.
    Soldier,
    /// Fast explorer that reveals resources and threats.
    Scout,
    /// Heavy fighter that costs two population slots.
    Major,
}

impl AntType {
    /// Every caste in declaration order.
    pub const ALL: [AntType; 7] = [
        AntType::Queen,
        AntType::YoungQueen,
        AntType::Worker,
        AntType::RoyalWorker,
        AntType::Soldier,
        AntType::Scout,
        AntType::Major,
    ];

    /// Reports whether the caste responds to hive alerts and hunts prey.
    #[must_use]
    pub const fn is_fighter(self) -> bool {
        matches!(self, AntType::Soldier | AntType::Major)
    }
}

/// Current activity of an ant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    /// Waiting for orders.
    Idle,
    /// Heading to a resource node to collect from it.
    Gathering,
    /// Travelling to reveal the map.
    Exploring,
    /// Engaging prey or predators.
    Fighting,
    /// Excavating underground for water and minerals.
    Digging,
    /// Constructing a chamber or burrow.
    Building,
    /// Routing to a burrow entrance in order to go underground.
    Entering,
    /// Routing to a burrow entrance in order to reach the surface.
    Exiting,
    /// Queen laying an egg or worker dropping off cargo.
    Depositing,
    /// Carrying cargo back to the colony.
    Returning,
}

/// Specialised rooms a colony may excavate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChamberType {
    /// Colony access structure, split into entrance and deep chamber.
    Burrow,
    /// Larvae care chamber.
    Nursery,
    /// Resource drop-off chamber.
    Storage,
    /// Soldier quarters.
    Barracks,
    /// Royal chamber required to raise young queens.
    ThroneRoom,
}

/// Resources tracked by colonies and carried by ants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// Gathered from surface nodes and prey carcasses.
    Food,
    /// Found by digging underground.
    Water,
    /// Found by digging underground.
    Minerals,
    /// Conceptual resource; never spawned as a world node.
    Larvae,
}

/// Heritable modifiers rolled when a larva is raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AntTrait {
    /// Moves twenty percent faster.
    Swift,
    /// Hits twenty-five percent harder.
    Strong,
    /// Has twenty-five percent more health.
    Hardy,
    /// Eats forty percent less jelly per feeding.
    Efficient,
    /// Carries larger loads when gathering.
    Forager,
    /// Scouts notice resources from further away.
    KeenEyed,
    /// Queens lay eggs faster.
    Fertile,
}

/// Species of surface predators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredatorKind {
    /// Fast aerial hunter that loses interest when no prey is visible.
    Bird,
    /// Slower ground hunter that never leaves.
    Spider,
}

/// Species of huntable surface prey.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreyKind {
    /// Slow, sturdy and nutritious.
    Caterpillar,
    /// Armoured and bites back.
    Beetle,
    /// Fast and fragile.
    Grasshopper,
}

/// Purpose advertised by a pheromone marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PheromoneKind {
    /// Points toward food.
    Food,
    /// Warns of danger.
    Danger,
    /// Points home.
    Home,
}

/// Decorative or blocking terrain features.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Boulder.
    Rock,
    /// Shrub or grass tuft.
    Plant,
}

/// Entity targeted by an explicit attack order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackTarget {
    /// Another colony's ant.
    Ant(AntId),
    /// Surface prey.
    Prey(PreyId),
    /// Surface predator.
    Predator(PredatorId),
}

/// Reasons an ant may leave the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    /// Energy reached zero.
    Starvation,
    /// Killed in a fight.
    Combat,
    /// Departed on a nuptial flight.
    NuptialFlight,
    /// Removed while tearing down the owning colony.
    ColonyCollapse,
}

/// Names of the persisted entity tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableName {
    /// Player accounts.
    Player,
    /// Colonies.
    Colony,
    /// Ants.
    Ant,
    /// Tunnels between chambers.
    Tunnel,
    /// Chambers.
    Chamber,
    /// Resource nodes.
    ResourceNode,
    /// Pheromone markers.
    Pheromone,
    /// Battle records.
    Battle,
    /// Explored map cells.
    ExploredTerritory,
    /// Discovered resource facts.
    DiscoveredResource,
    /// Terrain obstacles.
    Obstacle,
    /// Prey animals.
    Prey,
    /// Predators.
    Predator,
    /// Larvae.
    Larva,
}

impl TableName {
    /// Every table in persisted order.
    pub const ALL: [TableName; 14] = [
        TableName::Player,
        TableName::Colony,
        TableName::Ant,
        TableName::Tunnel,
        TableName::Chamber,
        TableName::ResourceNode,
        TableName::Pheromone,
        TableName::Battle,
        TableName::ExploredTerritory,
        TableName::DiscoveredResource,
        TableName::Obstacle,
        TableName::Prey,
        TableName::Predator,
        TableName::Larva,
    ];

    /// Name under which the table is persisted and subscribed to.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TableName::Player => "Player",
            TableName::Colony => "Colony",
            TableName::Ant => "Ant",
            TableName::Tunnel => "Tunnel",
            TableName::Chamber => "Chamber",
            TableName::ResourceNode => "ResourceNode",
            TableName::Pheromone => "Pheromone",
            TableName::Battle => "Battle",
            TableName::ExploredTerritory => "ExploredTerritory",
            TableName::DiscoveredResource => "DiscoveredResource",
            TableName::Obstacle => "Obstacle",
            TableName::Prey => "Prey",
            TableName::Predator => "Predator",
            TableName::Larva => "Larva",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands that express every permissible player-initiated world mutation.
///
/// The serde representation doubles as the name-based dispatch surface:
/// `{"method": "create_colony", "args": {"x": 0.0, "y": 0.0}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "args", rename_all = "snake_case")]
pub enum Command {
    /// Registers the caller as a player. Repeated calls are ignored.
    CreatePlayer {
        /// Display name shown to other players.
        username: String,
    },
    /// Founds a colony whose queen starts digging a burrow at the location.
    CreateColony {
        /// Surface x coordinate of the burrow.
        x: f32,
        /// Surface y coordinate of the burrow.
        y: f32,
    },
    /// Asks a queen to lay an egg.
    SpawnLarva {
        /// Queen that should lay.
        queen_id: AntId,
    },
    /// Raises one larva into an ant of the requested caste.
    FeedLarva {
        /// Colony owning the larva.
        colony_id: ColonyId,
        /// Caste of the resulting ant.
        ant_type: AntType,
        /// Spawn x coordinate.
        x: f32,
        /// Spawn y coordinate.
        y: f32,
        /// Spawn depth.
        z: f32,
    },
    /// Orders a group of ants to travel to a destination.
    CommandAnts {
        /// Ants receiving the order.
        ant_ids: Vec<AntId>,
        /// Destination x coordinate.
        target_x: f32,
        /// Destination y coordinate.
        target_y: f32,
        /// Destination depth.
        target_z: f32,
        /// Task to perform on arrival; inferred when absent.
        #[serde(default)]
        task: Option<TaskType>,
    },
    /// Orders an ant to construct a chamber.
    BuildChamber {
        /// Builder ant.
        ant_id: AntId,
        /// Kind of chamber to construct.
        chamber_type: ChamberType,
        /// Requested x coordinate.
        x: f32,
        /// Requested y coordinate.
        y: f32,
        /// Requested depth.
        z: f32,
    },
    /// Excavates a tunnel between two points.
    DigTunnel {
        /// Colony that owns the tunnel.
        colony_id: ColonyId,
        /// Start x coordinate.
        start_x: f32,
        /// Start y coordinate.
        start_y: f32,
        /// Start depth.
        start_z: f32,
        /// End x coordinate.
        end_x: f32,
        /// End y coordinate.
        end_y: f32,
        /// End depth.
        end_z: f32,
    },
    /// Direct melee attack against an adjacent target.
    AttackTarget {
        /// Attacking ant.
        attacker_id: AntId,
        /// Entity being attacked.
        target: AttackTarget,
    },
    /// Drops off an ant's cargo into the colony stores.
    DepositResources {
        /// Ant carrying the cargo.
        ant_id: AntId,
    },
    /// Places a pheromone marker.
    LayPheromone {
        /// Colony laying the marker.
        colony_id: ColonyId,
        /// Marker x coordinate.
        x: f32,
        /// Marker y coordinate.
        y: f32,
        /// Marker depth.
        z: f32,
        /// Purpose of the marker.
        kind: PheromoneKind,
    },
    /// Flips the colony's automatic management flag.
    ToggleColonyAi {
        /// Colony to toggle.
        colony_id: ColonyId,
    },
    /// Sends a young queen away, ending the generation and seeding the next.
    NuptialFlight {
        /// Young queen departing.
        queen_id: AntId,
    },
    /// Regenerates the world and restarts the caller as a fresh queen.
    RespawnAsQueen {
        /// Surface x coordinate of the new burrow.
        x: f32,
        /// Surface y coordinate of the new burrow.
        y: f32,
        /// Trait inherited by the new queen.
        #[serde(default, rename = "trait")]
        inherited_trait: Option<AntTrait>,
    },
}

impl Command {
    /// Dispatch name of the command.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Command::CreatePlayer { .. } => "create_player",
            Command::CreateColony { .. } => "create_colony",
            Command::SpawnLarva { .. } => "spawn_larva",
            Command::FeedLarva { .. } => "feed_larva",
            Command::CommandAnts { .. } => "command_ants",
            Command::BuildChamber { .. } => "build_chamber",
            Command::DigTunnel { .. } => "dig_tunnel",
            Command::AttackTarget { .. } => "attack_target",
            Command::DepositResources { .. } => "deposit_resources",
            Command::LayPheromone { .. } => "lay_pheromone",
            Command::ToggleColonyAi { .. } => "toggle_colony_ai",
            Command::NuptialFlight { .. } => "nuptial_flight",
            Command::RespawnAsQueen { .. } => "respawn_as_queen",
        }
    }

    /// Builds a command from a method name and a JSON argument object.
    pub fn from_call(method: &str, args: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::json!({ "method": method, "args": args }))
    }
}

/// Events broadcast by the world after processing commands and ticks.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Simulated time covered by the tick.
        dt: Duration,
    },
    /// A player account was registered.
    PlayerCreated {
        /// Identity of the new player.
        player: PlayerId,
    },
    /// A colony was founded and its queen started digging.
    ColonyFounded {
        /// Identifier of the new colony.
        colony: ColonyId,
        /// Owner of the colony.
        owner: PlayerId,
    },
    /// The founding burrow was completed.
    BurrowCompleted {
        /// Colony that finished digging.
        colony: ColonyId,
    },
    /// A colony lost its queen and was torn down.
    ColonyCollapsed {
        /// Colony that was removed.
        colony: ColonyId,
    },
    /// A queen laid an egg that became a larva.
    LarvaLaid {
        /// Colony owning the larva.
        colony: ColonyId,
        /// Identifier of the larva.
        larva: LarvaId,
    },
    /// A larva was raised into an ant.
    AntHatched {
        /// Colony owning the ant.
        colony: ColonyId,
        /// Identifier of the ant.
        ant: AntId,
        /// Caste of the ant.
        ant_type: AntType,
    },
    /// An ant left the world.
    AntDied {
        /// Colony that owned the ant.
        colony: ColonyId,
        /// Identifier of the ant.
        ant: AntId,
        /// Reason the ant was removed.
        cause: DeathCause,
    },
    /// A chamber was constructed.
    ChamberBuilt {
        /// Colony owning the chamber.
        colony: ColonyId,
        /// Identifier of the chamber.
        chamber: ChamberId,
        /// Kind of chamber.
        chamber_type: ChamberType,
    },
    /// A colony learned about a resource node.
    ResourceDiscovered {
        /// Colony that discovered the resource.
        colony: ColonyId,
        /// Node that was discovered.
        resource: ResourceId,
    },
    /// Cargo was added to a colony's stores.
    ResourcesDeposited {
        /// Receiving colony.
        colony: ColonyId,
        /// Kind of cargo.
        resource_type: ResourceType,
        /// Amount deposited.
        amount: f32,
    },
    /// Prey was killed and converted into food.
    PreyKilled {
        /// Prey that died.
        prey: PreyId,
        /// Food node created at the carcass.
        node: ResourceId,
        /// Whether the kill counted as a group hunt.
        group_hunt: bool,
    },
    /// A predator attacked a colony's ant and defenders were alerted.
    HiveAlert {
        /// Colony under attack.
        colony: ColonyId,
        /// Attacking predator.
        predator: PredatorId,
        /// Location of the attack.
        location: Position,
    },
    /// A colony entered or left general retreat.
    GeneralRetreatChanged {
        /// Affected colony.
        colony: ColonyId,
        /// Whether retreat is now active.
        active: bool,
    },
    /// A predator was killed by defenders.
    PredatorKilled {
        /// Predator that died.
        predator: PredatorId,
    },
    /// A predator lost interest and left the map.
    PredatorDeparted {
        /// Predator that left.
        predator: PredatorId,
    },
    /// A young queen departed and the player's meta progress was updated.
    NuptialFlightDeparted {
        /// Colony the queen left.
        colony: ColonyId,
        /// Owner of the colony.
        player: PlayerId,
        /// Colony score at departure.
        score: f32,
    },
    /// Global world entities were wiped and reseeded.
    WorldRegenerated,
    /// A command was rejected by validation.
    CommandRejected {
        /// Dispatch name of the rejected command.
        method: &'static str,
        /// Reason for the rejection.
        reason: Rejection,
    },
}

/// Reasons a command may be rejected by the world.
///
/// Rejections are ordinary gameplay outcomes: the world is left untouched and
/// the caller may retry once conditions change.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Rejection {
    /// The caller has no player record.
    #[error("player {0} is not registered")]
    PlayerMissing(PlayerId),
    /// The referenced colony does not exist.
    #[error("colony {0:?} does not exist")]
    ColonyMissing(ColonyId),
    /// The referenced ant does not exist.
    #[error("ant {0:?} does not exist")]
    AntMissing(AntId),
    /// The referenced entity belongs to another player.
    #[error("referenced entity belongs to another player")]
    NotOwned,
    /// No authorised ants were named by the order.
    #[error("no authorised ants in order")]
    EmptyOrder,
    /// The colony cannot pay the jelly cost.
    #[error("insufficient jelly: need {needed:.2}, have {available:.2}")]
    InsufficientJelly {
        /// Jelly required.
        needed: f32,
        /// Jelly available.
        available: f32,
    },
    /// The colony cannot pay a food, water or mineral cost.
    #[error("insufficient {resource:?}: need {needed:.2}, have {available:.2}")]
    InsufficientResources {
        /// Resource that is short.
        resource: ResourceType,
        /// Amount required.
        needed: f32,
        /// Amount available.
        available: f32,
    },
    /// The colony has no larvae to raise.
    #[error("colony has no larvae")]
    NoLarvae,
    /// The colony's chambers cannot house another unit.
    #[error("population capacity {capacity} reached (need {required})")]
    PopulationCapReached {
        /// Total capacity of the colony's chambers.
        capacity: u32,
        /// Population required after raising the unit.
        required: u32,
    },
    /// Raising a young queen requires a throne room.
    #[error("a throne room is required")]
    ThroneRoomRequired,
    /// The queen's chamber has no room for another larva.
    #[error("chamber larvae capacity reached")]
    LarvaeCapacityReached,
    /// The queen is already laying an egg.
    #[error("queen is already laying")]
    AlreadyLaying,
    /// The queen is not inside a chamber that can hold larvae.
    #[error("queen is not inside a nursery chamber")]
    NotInNursery,
    /// The ant's caste cannot perform the action.
    #[error("{ant_type:?} cannot perform this action")]
    WrongAntType {
        /// Caste of the ant that was asked.
        ant_type: AntType,
    },
    /// The colony already owns its single burrow.
    #[error("colony already has a burrow")]
    BurrowAlreadyBuilt,
    /// The requested caste cannot be raised from a larva.
    #[error("{ant_type:?} cannot be raised from a larva")]
    NotRaisable {
        /// Requested caste.
        ant_type: AntType,
    },
    /// The colony has no burrow entrance to route through.
    #[error("colony has no burrow entrance")]
    NoBurrowEntrance,
    /// Chambers other than the burrow must be dug underground.
    #[error("chambers must be built underground")]
    ChamberMustBeUnderground,
    /// The target is too far away.
    #[error("target out of range ({distance:.1} > {range:.1})")]
    OutOfRange {
        /// Distance to the target.
        distance: f32,
        /// Maximum allowed distance.
        range: f32,
    },
    /// The attack target does not exist.
    #[error("attack target does not exist")]
    TargetMissing,
    /// Ants cannot attack their own colony.
    #[error("ants cannot attack their own colony")]
    FriendlyFire,
    /// The ant carries nothing.
    #[error("ant is not carrying anything")]
    NothingCarried,
    /// No worker is close enough to dig.
    #[error("no worker close enough to dig")]
    NoWorkerNearby,
}
