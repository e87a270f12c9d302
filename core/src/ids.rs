//! Numeric identifiers for every entity table.
//!
//! Identifiers are allocated by the world from per-table counters and are
//! never reused, including across save and load.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }
    };
}

entity_id!(
    /// Unique identifier assigned to a colony.
    ColonyId
);
entity_id!(
    /// Unique identifier assigned to an ant.
    AntId
);
entity_id!(
    /// Unique identifier assigned to a tunnel.
    TunnelId
);
entity_id!(
    /// Unique identifier assigned to a chamber.
    ChamberId
);
entity_id!(
    /// Unique identifier assigned to a resource node.
    ResourceId
);
entity_id!(
    /// Unique identifier assigned to a pheromone marker.
    PheromoneId
);
entity_id!(
    /// Unique identifier assigned to a battle record.
    BattleId
);
entity_id!(
    /// Unique identifier assigned to an explored territory cell.
    TerritoryId
);
entity_id!(
    /// Unique identifier assigned to a discovered-resource fact.
    DiscoveryId
);
entity_id!(
    /// Unique identifier assigned to a terrain obstacle.
    ObstacleId
);
entity_id!(
    /// Unique identifier assigned to a prey animal.
    PreyId
);
entity_id!(
    /// Unique identifier assigned to a predator.
    PredatorId
);
entity_id!(
    /// Unique identifier assigned to a larva.
    LarvaId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&AntId::new(42)).expect("serialize");
        assert_eq!(json, "42");
        let back: AntId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.get(), 42);
    }
}
