use std::time::Duration;

use colony_wars_core::{AntType, ColonyId, Event, PlayerId, Timestamp};
use colony_wars_system_colony_ai::ColonyAi;
use colony_wars_world::{
    create_colony, create_player, entities, query, seeded_rng, FoundingStage, TickContext, World,
};

fn established_colony() -> (World, ColonyId) {
    let mut world = World::new();
    let mut events = Vec::new();
    let owner = PlayerId::new("player_manager1");
    create_player(&mut world, &owner, "manager".into(), Timestamp::ZERO, &mut events)
        .expect("player");
    create_colony(&mut world, &owner, 0.0, 0.0, Timestamp::ZERO, &mut events).expect("colony");
    let colony = world.colonies.keys()[0];
    let queen = world
        .colonies
        .get(&colony)
        .and_then(|colony| colony.queen_id)
        .expect("queen");
    entities::complete_burrow(&mut world, queen, Timestamp::from_millis(5_000), &mut events);
    let _ = world
        .colonies
        .update(&colony, |colony| colony.stage = FoundingStage::Established);
    (world, colony)
}

fn tick_at(millis: u64) -> TickContext {
    TickContext::new(Timestamp::from_millis(millis), Duration::from_millis(100))
}

#[test]
fn build_order_raises_one_worker_per_tick_first() {
    let (mut world, colony) = established_colony();
    assert_eq!(world.colonies.get(&colony).map(|colony| colony.larvae), Some(1));

    let mut events = Vec::new();
    ColonyAi::new().handle(&mut world, tick_at(6_000), &mut seeded_rng(7), &mut events);

    let hatched: Vec<AntType> = events
        .iter()
        .filter_map(|event| match event {
            Event::AntHatched { ant_type, .. } => Some(*ant_type),
            _ => None,
        })
        .collect();
    assert_eq!(hatched, vec![AntType::Worker]);
    assert_eq!(query::count_ants(&world, colony, AntType::Worker), 1);
    let colony = world.colonies.get(&colony).expect("colony");
    assert_eq!(colony.larvae, 0);
    assert_eq!(colony.population, 1);
}

#[test]
fn disabled_colonies_are_left_alone() {
    let (mut world, colony) = established_colony();
    let _ = world.colonies.update(&colony, |colony| colony.ai_enabled = false);

    let mut events = Vec::new();
    ColonyAi::new().handle(&mut world, tick_at(6_000), &mut seeded_rng(7), &mut events);

    assert!(events.is_empty());
    assert_eq!(query::count_ants(&world, colony, AntType::Worker), 0);
}

#[test]
fn larvae_counters_are_rebuilt_from_rows() {
    let (mut world, colony) = established_colony();
    let _ = world.colonies.update(&colony, |colony| {
        colony.larvae = 7;
        colony.ai_enabled = false;
    });
    let deep = query::deep_chamber(&world, colony).map(|chamber| chamber.id).expect("deep");
    let _ = world.chambers.update(&deep, |chamber| chamber.larvae_count = 4);

    let mut events = Vec::new();
    ColonyAi::new().handle(&mut world, tick_at(6_000), &mut seeded_rng(1), &mut events);

    assert_eq!(world.colonies.get(&colony).map(|colony| colony.larvae), Some(1));
    assert_eq!(world.chambers.get(&deep).map(|chamber| chamber.larvae_count), Some(1));
}

#[test]
fn emergency_conversion_rescues_a_starving_colony() {
    let (mut world, colony) = established_colony();
    let _ = world.colonies.update(&colony, |colony| {
        colony.jelly = 5.0;
        colony.food = 30.0;
    });
    // Nothing to raise, so the build order cannot spend the rescued jelly.
    let _ = world.larvae.retain(|_| false);

    let mut events = Vec::new();
    ColonyAi::new().handle(&mut world, tick_at(6_000), &mut seeded_rng(2), &mut events);

    let colony = world.colonies.get(&colony).expect("colony");
    assert!((colony.food - 20.0).abs() < 1e-4);
    assert!(colony.jelly > 9.0 && colony.jelly < 10.0);
}
