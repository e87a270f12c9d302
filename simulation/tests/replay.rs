use std::time::Duration;

use colony_wars_core::{AntType, Command, Event, PlayerId};
use colony_wars_simulation::{Simulation, SimulationConfig};
use colony_wars_world::WorldSnapshot;

fn scripted_run(seed: u64) -> (WorldSnapshot, Vec<Event>) {
    let config = SimulationConfig {
        rng_seed: seed,
        ..SimulationConfig::default()
    };
    let mut simulation = Simulation::new(&config);
    let player = PlayerId::new("player_replay01");
    let mut events = Vec::new();

    simulation.submit(player.clone(), Command::CreatePlayer {
        username: "replay".into(),
    });
    simulation.submit(player.clone(), Command::CreateColony { x: 40.0, y: -40.0 });
    let _ = simulation.advance(Duration::from_secs(10), &mut events);

    if let Some(colony) = simulation.world().colonies.keys().first().copied() {
        simulation.submit(player, Command::FeedLarva {
            colony_id: colony,
            ant_type: AntType::Scout,
            x: 40.0,
            y: -40.0,
            z: -10.0,
        });
    }
    let _ = simulation.advance(Duration::from_secs(30), &mut events);

    (WorldSnapshot::capture(simulation.world()), events)
}

#[test]
fn same_seed_and_script_replay_identically() {
    let (first, first_events) = scripted_run(42);
    let (second, second_events) = scripted_run(42);
    assert_eq!(first, second);
    assert_eq!(first_events, second_events);
}

#[test]
fn different_seeds_generate_different_worlds() {
    let (first, _) = scripted_run(1);
    let (second, _) = scripted_run(2);
    assert_ne!(first, second);
}
