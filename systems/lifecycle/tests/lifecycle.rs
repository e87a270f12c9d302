use std::time::Duration;

use colony_wars_core::{
    AntId, AntTrait, AntType, ColonyId, DeathCause, Event, PlayerId, Position, ResourceType,
    TaskType, Timestamp,
};
use colony_wars_system_lifecycle::Lifecycle;
use colony_wars_world::{
    balance, create_colony, create_player, entities, query, seeded_rng, FoundingStage, StashReason,
    StashedOrder, TickContext, World,
};

/// Colony at the origin with a food node in reach and its burrow dug at 5 s.
fn dug_in() -> (World, ColonyId, AntId) {
    let mut world = World::new();
    let mut events = Vec::new();
    let owner = PlayerId::new("player_upkeep01");
    let _ = entities::insert_resource(
        &mut world,
        ResourceType::Food,
        Position::surface(120.0, 0.0),
        300.0,
        0.5,
        false,
    );
    create_player(&mut world, &owner, "upkeep".into(), Timestamp::ZERO, &mut events)
        .expect("player");
    create_colony(&mut world, &owner, 0.0, 0.0, Timestamp::ZERO, &mut events).expect("colony");
    let colony = world.colonies.keys()[0];
    let queen = world
        .colonies
        .get(&colony)
        .and_then(|colony| colony.queen_id)
        .expect("queen");
    entities::complete_burrow(&mut world, queen, Timestamp::from_millis(5_000), &mut events);
    (world, colony, queen)
}

fn tick_at(millis: u64) -> TickContext {
    TickContext::new(Timestamp::from_millis(millis), Duration::from_millis(100))
}

fn deep_position(world: &World, colony: ColonyId) -> Position {
    query::deep_chamber(world, colony)
        .map(|chamber| chamber.position)
        .expect("deep chamber")
}

#[test]
fn first_worker_hatches_after_the_bootstrap_delay_and_heads_out() {
    let (mut world, colony, _) = dug_in();
    assert!(query::is_discovered(&world, colony, world.resources.keys()[0]));
    let mut lifecycle = Lifecycle::new();
    let mut events = Vec::new();

    lifecycle.handle(&mut world, tick_at(7_400), &mut seeded_rng(4), &mut events);
    assert_eq!(query::count_ants(&world, colony, AntType::Worker), 0);

    lifecycle.handle(&mut world, tick_at(7_500), &mut seeded_rng(4), &mut events);

    assert_eq!(
        world.colonies.get(&colony).map(|colony| colony.stage),
        Some(FoundingStage::Established)
    );
    let worker = world
        .ants
        .iter()
        .find(|ant| ant.ant_type == AntType::Worker)
        .expect("first worker");
    assert_eq!(worker.task, TaskType::Exiting);
    assert_eq!(worker.final_task, Some(TaskType::Gathering));
    assert_eq!(worker.final_target, Some(Position::surface(120.0, 0.0)));
    assert_eq!(world.colonies.get(&colony).map(|colony| colony.population), Some(1));
}

#[test]
fn laid_eggs_become_larvae_in_the_queens_chamber() {
    let (mut world, colony, queen) = dug_in();
    let _ = world
        .colonies
        .update(&colony, |colony| colony.stage = FoundingStage::Established);
    entities::start_laying(&mut world, queen, Timestamp::from_millis(6_000)).expect("laying");
    let mut lifecycle = Lifecycle::new();
    let mut events = Vec::new();

    lifecycle.handle(&mut world, tick_at(8_900), &mut seeded_rng(5), &mut events);
    assert_eq!(world.larvae.len(), 1);

    lifecycle.handle(&mut world, tick_at(9_000), &mut seeded_rng(5), &mut events);

    assert_eq!(world.larvae.len(), 2);
    assert_eq!(world.colonies.get(&colony).map(|colony| colony.larvae), Some(2));
    let deep = deep_position(&world, colony);
    assert!(world
        .larvae
        .iter()
        .all(|larva| larva.position.z == deep.z && larva.position.planar_distance(deep) <= balance::CHAMBER_RADIUS));
    let queen = world.ants.get(&queen).expect("queen");
    assert!(queen.timer.is_none());
    assert_eq!(queen.task, TaskType::Idle);
    assert!(events.iter().any(|event| matches!(event, Event::LarvaLaid { .. })));
}

#[test]
fn hungry_ants_eat_underground_and_resume_their_order() {
    let (mut world, colony, _) = dug_in();
    let deep = deep_position(&world, colony);
    let worker = entities::spawn_ant(&mut world, colony, AntType::Worker, deep, None, Timestamp::ZERO);
    let _ = world.ants.update(&worker, |ant| {
        ant.stashed_order = Some(StashedOrder {
            task: TaskType::Exploring,
            target: Some(Position::surface(200.0, 0.0)),
            reason: StashReason::Hunger,
        });
    });
    let jelly_before = world.colonies.get(&colony).map_or(0.0, |colony| colony.jelly);

    Lifecycle::new().replenish(&mut world, tick_at(100_000));

    let ant = world.ants.get(&worker).expect("worker");
    assert_eq!(ant.last_fed_at, Timestamp::from_millis(100_000));
    assert!(ant.stashed_order.is_none());
    assert_eq!(ant.task, TaskType::Exiting);
    assert_eq!(ant.final_target, Some(Position::surface(200.0, 0.0)));
    let jelly_after = world.colonies.get(&colony).map_or(0.0, |colony| colony.jelly);
    assert!(jelly_after <= jelly_before - balance::feed_cost(AntType::Worker, None));
}

#[test]
fn wounded_ants_heal_only_underground() {
    let (mut world, colony, _) = dug_in();
    let deep = deep_position(&world, colony);
    let below = entities::spawn_ant(&mut world, colony, AntType::Worker, deep, None, Timestamp::ZERO);
    let above = entities::spawn_ant(
        &mut world,
        colony,
        AntType::Worker,
        Position::surface(40.0, 0.0),
        None,
        Timestamp::ZERO,
    );
    for ant in [below, above] {
        let _ = world.ants.update(&ant, |ant| {
            ant.health = 42.0;
            ant.wounded = true;
        });
    }
    let second = |millis| TickContext::new(Timestamp::from_millis(millis), Duration::from_secs(1));
    let mut lifecycle = Lifecycle::new();

    lifecycle.replenish(&mut world, second(6_000));
    assert_eq!(world.ants.get(&below).map(|ant| ant.health), Some(47.0));
    assert_eq!(world.ants.get(&above).map(|ant| ant.health), Some(42.0));

    lifecycle.replenish(&mut world, second(7_000));
    let healed = world.ants.get(&below).expect("healed");
    assert_eq!(healed.health, 50.0);
    assert!(!healed.wounded);
}

#[test]
fn collapsed_colonies_are_refounded_after_the_delay() {
    let (mut world, colony, queen) = dug_in();
    let mut events = Vec::new();
    let _ = entities::remove_ant(&mut world, queen, DeathCause::Combat, &mut events);
    let mut lifecycle = Lifecycle::new();

    lifecycle.handle(&mut world, tick_at(10_000), &mut seeded_rng(6), &mut events);
    assert!(!world.colonies.contains(&colony));
    assert!(world.chambers.is_empty());
    assert!(world.larvae.is_empty());

    lifecycle.handle(&mut world, tick_at(13_000), &mut seeded_rng(6), &mut events);
    let refounded: Vec<_> = world.colonies.iter().collect();
    assert_eq!(refounded.len(), 1);
    assert_eq!(refounded[0].origin, Position::surface(0.0, 0.0));
    assert_eq!(refounded[0].stage, FoundingStage::Digging);
}

#[test]
fn young_queens_fly_off_when_mature_and_the_heir_inherits_their_trait() {
    let (mut world, colony, founder) = dug_in();
    let owner = PlayerId::new("player_upkeep01");
    let _ = world
        .colonies
        .update(&colony, |colony| colony.stage = FoundingStage::Established);
    let _ = world
        .players
        .update(&owner, |player| player.generations_survived = 12);
    let deep = deep_position(&world, colony);
    let young = entities::spawn_ant(
        &mut world,
        colony,
        AntType::YoungQueen,
        deep,
        Some(AntTrait::Hardy),
        Timestamp::ZERO,
    );
    let mut lifecycle = Lifecycle::new();
    let mut events = Vec::new();

    lifecycle.handle(&mut world, tick_at(119_900), &mut seeded_rng(7), &mut events);
    assert!(world.ants.contains(&young));

    lifecycle.handle(&mut world, tick_at(120_000), &mut seeded_rng(7), &mut events);
    assert!(!world.ants.contains(&young));
    assert!(world.ants.contains(&founder));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::NuptialFlightDeparted { .. })));
    let player = world.players.get(&owner).expect("player");
    assert_eq!(player.generations_survived, 13);
    assert_eq!(player.queens_produced, 1);
    assert_eq!(
        player.pending_founding.map(|pending| pending.due_at),
        Some(Timestamp::from_millis(123_000))
    );

    lifecycle.handle(&mut world, tick_at(122_900), &mut seeded_rng(7), &mut events);
    assert_eq!(world.colonies.len(), 1);

    lifecycle.handle(&mut world, tick_at(123_000), &mut seeded_rng(7), &mut events);
    let heir = world
        .colonies
        .iter()
        .find(|other| other.id != colony)
        .expect("refounded colony");
    assert_eq!(heir.inherited_trait, Some(AntTrait::Hardy));
    assert_eq!(heir.generation, 14);
    assert_eq!(heir.stage, FoundingStage::Digging);
    assert_eq!(heir.jelly, balance::SEED_JELLY + 50.0);
    assert_eq!(heir.water, balance::SEED_WATER + 30.0);
    let heir_queen = heir
        .queen_id
        .and_then(|queen| world.ants.get(&queen))
        .expect("heir queen");
    assert_eq!(heir_queen.ant_trait, Some(AntTrait::Hardy));
    assert!(world
        .players
        .get(&owner)
        .is_some_and(|player| player.pending_founding.is_none()));
}
