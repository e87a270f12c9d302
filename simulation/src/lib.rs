#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick engine that owns the Colony Wars world and advances it in fixed steps.
//!
//! Each tick first applies the commands queued since the previous tick, in
//! arrival order, then runs the systems in this order:
//!
//! 1. lifecycle: orphan cleanup, hunger, timed completions
//! 2. movement and arrivals
//! 3. combat
//! 4. scouting
//! 5. wildlife and danger retreats
//! 6. lifecycle: regeneration, idle feeding, healing
//! 7. colony bookkeeping and AI
//!
//! The engine is single-owner: commands and ticks both take `&mut self`, so
//! one logical step always completes before the next begins.

mod config;
mod scheduler;

use std::collections::VecDeque;
use std::time::Duration;

use colony_wars_core::{Command, Event, PlayerId, Rejection, Timestamp};
use colony_wars_system_colony_ai::ColonyAi;
use colony_wars_system_combat::Combat;
use colony_wars_system_lifecycle::Lifecycle;
use colony_wars_system_movement::Movement;
use colony_wars_system_scouting::Scouting;
use colony_wars_system_wildlife::Wildlife;
use colony_wars_world::{self as world, generation, seeded_rng, SimRng, TickContext, World};
use tracing::{debug, trace};

pub use config::{SimulationConfig, DEFAULT_SEED};
pub use scheduler::TickScheduler;

#[derive(Debug)]
struct QueuedCommand {
    caller: PlayerId,
    command: Command,
}

/// Deterministic simulation harness that owns the mutable [`World`].
#[derive(Debug)]
pub struct Simulation {
    world: World,
    rng: SimRng,
    clock: Timestamp,
    tick_interval: Duration,
    queue: VecDeque<QueuedCommand>,
    lifecycle: Lifecycle,
    movement: Movement,
    combat: Combat,
    scouting: Scouting,
    wildlife: Wildlife,
    colony_ai: ColonyAi,
    ticks: u64,
    skipped_ticks: u64,
}

impl Simulation {
    /// Creates a simulation at the epoch, seeding a fresh world if configured.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self::starting_at(config, Timestamp::ZERO)
    }

    /// Creates a fresh simulation whose clock starts at `now`.
    #[must_use]
    pub fn starting_at(config: &SimulationConfig, now: Timestamp) -> Self {
        let mut rng = seeded_rng(config.rng_seed);
        let mut world = World::new();
        if config.generate_world {
            generation::populate(&mut world, &mut rng);
        }
        Self::assemble(world, rng, config, now)
    }

    /// Seeds resources and wildlife into the current world.
    pub fn generate(&mut self) {
        generation::populate(&mut self.world, &mut self.rng);
    }

    /// Resumes a simulation over an existing world with its clock at `now`.
    #[must_use]
    pub fn with_world(world: World, config: &SimulationConfig, now: Timestamp) -> Self {
        Self::assemble(world, seeded_rng(config.rng_seed), config, now)
    }

    fn assemble(world: World, rng: SimRng, config: &SimulationConfig, clock: Timestamp) -> Self {
        Self {
            world,
            rng,
            clock,
            tick_interval: config.tick_interval(),
            queue: VecDeque::new(),
            lifecycle: Lifecycle::new(),
            movement: Movement::new(),
            combat: Combat::new(),
            scouting: Scouting::new(),
            wildlife: Wildlife::new(),
            colony_ai: ColonyAi::new(),
            ticks: 0,
            skipped_ticks: 0,
        }
    }

    /// Current world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world for adapters and test setup.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Replaces the world, returning the previous one.
    pub fn replace_world(&mut self, world: World) -> World {
        std::mem::replace(&mut self.world, world)
    }

    /// Simulated time of the most recent tick.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock
    }

    /// Simulated time covered by one tick.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Ticks executed so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks refused because they did not move the clock forward.
    #[must_use]
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }

    /// Ants that starved since the simulation started.
    #[must_use]
    pub fn starved(&self) -> u64 {
        self.lifecycle.starved()
    }

    /// Commands waiting for the next tick.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queues a command to be applied at the start of the next tick.
    pub fn submit(&mut self, caller: PlayerId, command: Command) {
        self.queue.push_back(QueuedCommand { caller, command });
    }

    /// Applies a command immediately at the current simulated time.
    pub fn execute(
        &mut self,
        caller: &PlayerId,
        command: Command,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        world::apply(
            &mut self.world,
            caller,
            command,
            self.clock,
            &mut self.rng,
            out_events,
        )
    }

    /// Runs one tick ending at `now`.
    ///
    /// Returns `false` without touching the world when `now` is not later
    /// than the previous tick.
    pub fn tick(&mut self, now: Timestamp, out_events: &mut Vec<Event>) -> bool {
        if now <= self.clock {
            self.skipped_ticks += 1;
            debug!(
                now = now.as_millis(),
                clock = self.clock.as_millis(),
                "tick_skipped"
            );
            return false;
        }
        let dt = now.since(self.clock);
        self.clock = now;

        while let Some(QueuedCommand { caller, command }) = self.queue.pop_front() {
            // Rejections are already logged and reported as events.
            let _ = world::apply(
                &mut self.world,
                &caller,
                command,
                now,
                &mut self.rng,
                out_events,
            );
        }

        let ctx = TickContext::new(now, dt);
        let world = &mut self.world;
        let rng = &mut self.rng;
        self.lifecycle.handle(world, ctx, rng, out_events);
        self.movement.handle(world, ctx, out_events);
        self.combat.handle(world, ctx, rng, out_events);
        self.scouting.handle(world, ctx, out_events);
        self.wildlife.handle(world, ctx, rng, out_events);
        self.lifecycle.replenish(world, ctx);
        self.colony_ai.handle(world, ctx, rng, out_events);

        self.ticks += 1;
        out_events.push(Event::TimeAdvanced { dt });
        trace!(tick = self.ticks, now = now.as_millis(), "tick_completed");
        true
    }

    /// Runs as many whole ticks as fit in `duration`, returning how many ran.
    pub fn advance(&mut self, duration: Duration, out_events: &mut Vec<Event>) -> u64 {
        let steps = duration.as_millis() / self.tick_interval.as_millis().max(1);
        let mut ran = 0;
        for _ in 0..steps {
            let next = self.clock.after(self.tick_interval);
            if self.tick(next, out_events) {
                ran += 1;
            }
        }
        ran
    }
}
