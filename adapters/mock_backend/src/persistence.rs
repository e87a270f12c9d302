//! Saving and loading the world under one storage key, scoped per identity.

use colony_wars_core::PlayerId;
use colony_wars_world::{World, WorldSnapshot};
use tracing::{debug, warn};

use crate::{PersistenceError, Storage};

/// Reads and writes the shared world blob on behalf of one identity.
#[derive(Debug)]
pub struct Persistence<S> {
    storage: S,
    key: String,
}

impl<S: Storage> Persistence<S> {
    /// Creates an adapter storing the blob under `key`.
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Storage key of the world blob.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable access to the underlying storage.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Loads what `identity` may see of the stored world.
    ///
    /// A missing or unreadable blob yields `Ok(None)`; only storage failures
    /// are errors.
    pub fn load(&self, identity: &PlayerId) -> Result<Option<World>, PersistenceError> {
        Ok(self
            .stored()?
            .map(|snapshot| snapshot.filter_for(identity).restore()))
    }

    /// Merges the caller's world into the stored blob and writes it back.
    pub fn save(&mut self, world: &World, identity: &PlayerId) -> Result<(), PersistenceError> {
        let stored = self.stored()?.unwrap_or_default();
        let merged = WorldSnapshot::capture(world).merge_into(stored, identity);
        let text = serde_json::to_string(&merged)?;
        self.storage.write(&self.key, &text)?;
        debug!(key = %self.key, bytes = text.len(), "state_saved");
        Ok(())
    }

    fn stored(&self) -> Result<Option<WorldSnapshot>, PersistenceError> {
        let Some(text) = self.storage.read(&self.key)? else {
            debug!(key = %self.key, "no_saved_state");
            return Ok(None);
        };
        match serde_json::from_str(&text) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(error) => {
                warn!(key = %self.key, %error, "saved_state_unreadable");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use colony_wars_core::Timestamp;
    use colony_wars_world::{create_colony, create_player};

    #[test]
    fn corrupt_blobs_load_as_nothing() {
        let mut storage = MemoryStorage::new();
        storage.write("state", "{ not json").expect("write");
        let persistence = Persistence::new(storage, "state");
        let loaded = persistence
            .load(&PlayerId::new("player_corrupt1"))
            .expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn saving_keeps_other_players_rows() {
        let storage = MemoryStorage::new();
        let alice = PlayerId::new("player_alice0001");
        let bob = PlayerId::new("player_bob000001");
        let mut events = Vec::new();

        let mut alice_world = World::new();
        create_player(&mut alice_world, &alice, "alice".into(), Timestamp::ZERO, &mut events)
            .expect("alice");
        create_colony(&mut alice_world, &alice, 0.0, 0.0, Timestamp::ZERO, &mut events)
            .expect("alice colony");
        let mut alice_side = Persistence::new(storage.clone(), "state");
        alice_side.save(&alice_world, &alice).expect("save alice");

        let mut bob_side = Persistence::new(storage, "state");
        let mut bob_world = bob_side.load(&bob).expect("load").expect("blob");
        assert!(bob_world.colonies.is_empty());
        create_player(&mut bob_world, &bob, "bob".into(), Timestamp::ZERO, &mut events)
            .expect("bob");
        create_colony(&mut bob_world, &bob, 50.0, 50.0, Timestamp::ZERO, &mut events)
            .expect("bob colony");
        bob_side.save(&bob_world, &bob).expect("save bob");

        let alice_again = alice_side.load(&alice).expect("load").expect("blob");
        assert_eq!(alice_again.colonies.len(), 1);
        assert!(alice_again.colonies.iter().all(|colony| colony.owner == alice));
        assert_eq!(alice_again.players.len(), 1);
        let colony_ids: Vec<_> = alice_again.colonies.keys();
        let bob_again = bob_side.load(&bob).expect("load").expect("blob");
        assert!(bob_again.colonies.keys().iter().all(|id| !colony_ids.contains(id)));
    }
}
