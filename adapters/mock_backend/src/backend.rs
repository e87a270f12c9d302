//! The mock authoritative server driving one player session.

use std::time::Duration;

use colony_wars_core::{Command, Event, PlayerId, TableName, Timestamp};
use colony_wars_simulation::Simulation;
use colony_wars_world::World;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::{generate_identity, BackendConfig, IDENTITY_KEY},
    CallError, EventBus, Listener, Persistence, PersistenceError, Storage,
};

/// Tables pushed to listeners as soon as a session connects.
pub const INITIAL_TABLES: [TableName; 5] = [
    TableName::Player,
    TableName::Colony,
    TableName::Ant,
    TableName::Chamber,
    TableName::ResourceNode,
];

/// Session-level surface shared by every backend a client can talk to.
pub trait Backend {
    /// Identity all calls are made on behalf of.
    fn identity(&self) -> &PlayerId;

    /// World as currently seen by the session.
    fn world(&self) -> &World;

    /// Loads the stored world, starts the clock at `now` and publishes the
    /// initial tables.
    fn connect(&mut self, now: Timestamp) -> Result<(), PersistenceError>;

    /// Stops the session after a final save.
    fn disconnect(&mut self) -> Result<(), PersistenceError>;

    /// Registers a listener for changes to `table`.
    fn on(&mut self, table: TableName, listener: Listener);

    /// Executes a named command with JSON arguments.
    fn call(&mut self, method: &str, args: Value) -> Result<(), CallError>;

    /// Runs one tick ending at `now`. Returns whether the tick ran.
    fn tick(&mut self, now: Timestamp) -> Result<bool, PersistenceError>;
}

/// In-process backend: the simulation plus persistence and subscriptions.
#[derive(Debug)]
pub struct MockBackend<S> {
    config: BackendConfig,
    identity: PlayerId,
    persistence: Persistence<S>,
    simulation: Simulation,
    bus: EventBus,
    events: Vec<Event>,
    connected: bool,
}

impl<S: Storage> MockBackend<S> {
    /// Creates a disconnected backend over `storage`.
    ///
    /// The identity comes from the configuration, else from the one
    /// remembered in storage, else a new one is generated and remembered.
    pub fn new(config: BackendConfig, mut storage: S) -> Result<Self, PersistenceError> {
        let identity = resolve_identity(&config, &mut storage)?;
        let simulation = Simulation::with_world(World::new(), &config.simulation, Timestamp::ZERO);
        let persistence = Persistence::new(storage, config.storage_key.clone());
        Ok(Self {
            config,
            identity,
            persistence,
            simulation,
            bus: EventBus::new(),
            events: Vec::new(),
            connected: false,
        })
    }

    /// Reports whether the session is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Tick engine of the session.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Persistence adapter of the session.
    #[must_use]
    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    /// Takes the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Decodes a named command and queues it for the next tick.
    pub fn enqueue(&mut self, method: &str, args: Value) -> Result<(), CallError> {
        if !self.connected {
            return Err(CallError::NotConnected);
        }
        let command = decode(method, args)?;
        self.simulation.submit(self.identity.clone(), command);
        Ok(())
    }

    /// Runs whole ticks covering `duration` of simulated time, then saves.
    pub fn advance(&mut self, duration: Duration) -> Result<u64, PersistenceError> {
        if !self.connected {
            return Ok(0);
        }
        let ran = self.simulation.advance(duration, &mut self.events);
        if ran > 0 {
            self.persist_and_publish()?;
        }
        Ok(ran)
    }

    fn persist_and_publish(&mut self) -> Result<(), PersistenceError> {
        let saved = self.persistence.save(self.simulation.world(), &self.identity);
        let _ = self.bus.flush(self.simulation.world_mut());
        saved
    }
}

impl<S: Storage> Backend for MockBackend<S> {
    fn identity(&self) -> &PlayerId {
        &self.identity
    }

    fn world(&self) -> &World {
        self.simulation.world()
    }

    fn connect(&mut self, now: Timestamp) -> Result<(), PersistenceError> {
        let loaded = match self.persistence.load(&self.identity) {
            Ok(loaded) => loaded,
            Err(error) => {
                warn!(%error, "state_load_failed");
                None
            }
        };
        let resumed = loaded.is_some();
        let settings = &self.config.simulation;
        let mut simulation = Simulation::with_world(loaded.unwrap_or_default(), settings, now);
        if settings.generate_world && simulation.world().resources.is_empty() {
            simulation.generate();
        }
        let _ = simulation.world_mut().take_dirty_tables();
        self.simulation = simulation;
        self.connected = true;

        info!(identity = %self.identity, resumed, now = now.as_millis(), "backend_connected");
        self.bus.publish(self.simulation.world(), &INITIAL_TABLES);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), PersistenceError> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        info!(identity = %self.identity, ticks = self.simulation.ticks(), "backend_disconnected");
        self.persistence.save(self.simulation.world(), &self.identity)
    }

    fn on(&mut self, table: TableName, listener: Listener) {
        self.bus.on(table, listener);
    }

    fn call(&mut self, method: &str, args: Value) -> Result<(), CallError> {
        if !self.connected {
            return Err(CallError::NotConnected);
        }
        let command = decode(method, args)?;
        debug!(identity = %self.identity, method, "call");
        let outcome = self
            .simulation
            .execute(&self.identity, command, &mut self.events);
        self.persist_and_publish()?;
        outcome.map_err(CallError::Rejected)
    }

    fn tick(&mut self, now: Timestamp) -> Result<bool, PersistenceError> {
        if !self.connected {
            return Ok(false);
        }
        if !self.simulation.tick(now, &mut self.events) {
            return Ok(false);
        }
        self.persist_and_publish()?;
        Ok(true)
    }
}

fn decode(method: &str, args: Value) -> Result<Command, CallError> {
    Command::from_call(method, args).map_err(|source| CallError::Decode {
        method: method.to_owned(),
        source,
    })
}

fn resolve_identity<S: Storage>(
    config: &BackendConfig,
    storage: &mut S,
) -> Result<PlayerId, PersistenceError> {
    if let Some(identity) = &config.identity {
        return Ok(PlayerId::new(identity.clone()));
    }
    let remembered = storage
        .read(IDENTITY_KEY)?
        .and_then(|text| serde_json::from_str::<String>(&text).ok())
        .filter(|identity| !identity.is_empty());
    if let Some(identity) = remembered {
        return Ok(PlayerId::new(identity));
    }
    let identity = generate_identity(&mut rand::thread_rng());
    storage.write(IDENTITY_KEY, &serde_json::to_string(identity.as_str())?)?;
    info!(identity = %identity, "identity_generated");
    Ok(identity)
}
