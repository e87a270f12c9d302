use colony_wars_core::{
    AntId, AntTrait, AntType, AttackTarget, ChamberType, ColonyId, Command, Event, PlayerId,
    Position, PreyKind, Rejection, ResourceType, TaskType, Timestamp,
};
use colony_wars_world::{
    apply, balance, entities, generation, query, seeded_rng, SimRng, World,
};

struct Fixture {
    world: World,
    rng: SimRng,
    events: Vec<Event>,
    owner: PlayerId,
}

impl Fixture {
    fn new() -> Self {
        let mut fixture = Self {
            world: World::new(),
            rng: seeded_rng(11),
            events: Vec::new(),
            owner: PlayerId::new("player_abc123xyz"),
        };
        let owner = fixture.owner.clone();
        fixture
            .run(&owner, Command::CreatePlayer {
                username: "founder".into(),
            })
            .expect("player");
        fixture
    }

    fn run(&mut self, caller: &PlayerId, command: Command) -> Result<(), Rejection> {
        apply(
            &mut self.world,
            caller,
            command,
            Timestamp::from_millis(10_000),
            &mut self.rng,
            &mut self.events,
        )
    }

    fn found(&mut self, x: f32, y: f32) -> ColonyId {
        let owner = self.owner.clone();
        self.run(&owner, Command::CreateColony { x, y }).expect("colony");
        let colony = *self
            .world
            .colonies
            .keys()
            .last()
            .expect("colony row");
        let queen = self.queen(colony);
        entities::complete_burrow(
            &mut self.world,
            queen,
            Timestamp::from_millis(5_000),
            &mut self.events,
        );
        colony
    }

    fn rival(&mut self, x: f32, y: f32) -> (PlayerId, ColonyId) {
        let rival = PlayerId::new("player_rival0001");
        self.run(&rival, Command::CreatePlayer {
            username: "rival".into(),
        })
        .expect("rival");
        self.run(&rival, Command::CreateColony { x, y }).expect("rival colony");
        let colony = query::colonies_of(&self.world, &rival)
            .first()
            .map(|colony| colony.id)
            .expect("rival colony row");
        (rival, colony)
    }

    fn stock(&mut self, colony: ColonyId, food: f32, water: f32, minerals: f32, jelly: f32) {
        let _ = self.world.colonies.update(&colony, |colony| {
            colony.food = food;
            colony.water = water;
            colony.minerals = minerals;
            colony.jelly = jelly;
        });
    }

    fn deep_larva(&mut self, colony: ColonyId) {
        let (chamber, position) = query::deep_chamber(&self.world, colony)
            .map(|chamber| (chamber.id, chamber.position))
            .expect("deep chamber");
        let _ = entities::insert_larva(
            &mut self.world,
            colony,
            Some(chamber),
            position,
            Timestamp::ZERO,
            &mut self.events,
        );
    }

    fn queen(&self, colony: ColonyId) -> AntId {
        self.world
            .colonies
            .get(&colony)
            .and_then(|colony| colony.queen_id)
            .expect("queen")
    }

    fn feed(&mut self, colony: ColonyId, ant_type: AntType) -> Result<(), Rejection> {
        let owner = self.owner.clone();
        self.run(&owner, Command::FeedLarva {
            colony_id: colony,
            ant_type,
            x: 0.0,
            y: 0.0,
            z: -10.0,
        })
    }
}

#[test]
fn completed_burrow_has_entrance_deep_chamber_and_one_larva() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);

    let chambers = query::colony_chambers(&fixture.world, colony);
    assert_eq!(chambers.len(), 2);
    assert!(chambers
        .iter()
        .any(|chamber| chamber.is_entrance && chamber.position.z == -1.0));
    assert!(chambers
        .iter()
        .any(|chamber| !chamber.is_entrance && chamber.position.z == -10.0 && chamber.capacity >= 10));
    assert_eq!(fixture.world.colonies.get(&colony).map(|colony| colony.larvae), Some(1));
    assert_eq!(fixture.world.larvae.len(), 1);
}

#[test]
fn first_worker_costs_one_jelly() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let _ = fixture.world.colonies.update(&colony, |colony| colony.jelly = 20.0);

    fixture.feed(colony, AntType::Worker).expect("fed");

    let colony_row = fixture.world.colonies.get(&colony).expect("colony");
    assert_eq!(colony_row.population, 1);
    assert!((colony_row.jelly - 19.0).abs() < 1e-6);
    assert_eq!(colony_row.larvae, 0);
    assert_eq!(query::count_ants(&fixture.world, colony, AntType::Worker), 1);
}

#[test]
fn feeding_without_larvae_is_rejected_untouched() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    fixture.feed(colony, AntType::Worker).expect("fed");
    let before = fixture.world.colonies.get(&colony).cloned();

    assert_eq!(fixture.feed(colony, AntType::Soldier), Err(Rejection::NoLarvae));
    assert_eq!(fixture.world.colonies.get(&colony).cloned(), before);
    assert!(matches!(
        fixture.events.last(),
        Some(Event::CommandRejected {
            method: "feed_larva",
            reason: Rejection::NoLarvae
        })
    ));
}

#[test]
fn population_matches_the_ant_table_after_feeding() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let _ = fixture.world.colonies.update(&colony, |colony| colony.jelly = 100.0);
    let deep = query::deep_chamber(&fixture.world, colony)
        .map(|chamber| (chamber.id, chamber.position))
        .expect("deep chamber");
    for _ in 0..3 {
        let _ = entities::insert_larva(
            &mut fixture.world,
            colony,
            Some(deep.0),
            deep.1,
            Timestamp::ZERO,
            &mut fixture.events,
        );
    }

    for ant_type in [AntType::Worker, AntType::Major, AntType::Scout, AntType::Soldier] {
        fixture.feed(colony, ant_type).expect("fed");
    }

    let population = fixture.world.colonies.get(&colony).map(|colony| colony.population);
    assert_eq!(population, Some(5));
    assert_eq!(population, Some(query::derived_population(&fixture.world, colony)));
}

#[test]
fn second_burrow_is_rejected() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let queen = fixture.queen(colony);
    let owner = fixture.owner.clone();

    let result = fixture.run(&owner, Command::BuildChamber {
        ant_id: queen,
        chamber_type: ChamberType::Burrow,
        x: 50.0,
        y: 50.0,
        z: 0.0,
    });
    assert_eq!(result, Err(Rejection::BurrowAlreadyBuilt));
}

#[test]
fn crowded_chambers_are_pushed_out_and_tunnelled() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let _ = fixture.world.colonies.update(&colony, |colony| {
        colony.food = 100.0;
        colony.minerals = 100.0;
    });
    let worker = entities::spawn_ant(
        &mut fixture.world,
        colony,
        AntType::Worker,
        Position::new(0.0, 0.0, -10.0),
        None,
        Timestamp::ZERO,
    );
    let owner = fixture.owner.clone();

    fixture
        .run(&owner, Command::BuildChamber {
            ant_id: worker,
            chamber_type: ChamberType::Nursery,
            x: 10.0,
            y: 0.0,
            z: -10.0,
        })
        .expect("built");

    let nursery = fixture
        .world
        .chambers
        .iter()
        .find(|chamber| chamber.chamber_type == ChamberType::Nursery)
        .expect("nursery");
    assert!((nursery.position.x - 100.0).abs() < 1e-4);
    assert!(nursery.position.y.abs() < 1e-4);
    assert_eq!(fixture.world.tunnels.len(), 1);

    let colony_row = fixture.world.colonies.get(&colony).expect("colony");
    assert!((colony_row.food - 80.0).abs() < 1e-4);
    assert!((colony_row.minerals - 95.0).abs() < 1e-4);
}

#[test]
fn surface_chambers_are_rejected() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let worker = entities::spawn_ant(
        &mut fixture.world,
        colony,
        AntType::Worker,
        Position::surface(5.0, 5.0),
        None,
        Timestamp::ZERO,
    );
    let owner = fixture.owner.clone();

    let result = fixture.run(&owner, Command::BuildChamber {
        ant_id: worker,
        chamber_type: ChamberType::Storage,
        x: 200.0,
        y: 0.0,
        z: 0.0,
    });
    assert_eq!(result, Err(Rejection::ChamberMustBeUnderground));
}

#[test]
fn unaffordable_orders_move_nobody() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let ants: Vec<AntId> = (0..2)
        .map(|offset| {
            entities::spawn_ant(
                &mut fixture.world,
                colony,
                AntType::Scout,
                Position::surface(offset as f32, 0.0),
                None,
                Timestamp::ZERO,
            )
        })
        .collect();
    let _ = fixture.world.colonies.update(&colony, |colony| colony.jelly = 1.0);
    let owner = fixture.owner.clone();

    let result = fixture.run(&owner, Command::CommandAnts {
        ant_ids: ants.clone(),
        target_x: 100.0,
        target_y: 0.0,
        target_z: 0.0,
        task: None,
    });

    assert!(matches!(result, Err(Rejection::InsufficientJelly { .. })));
    assert_eq!(fixture.world.colonies.get(&colony).map(|colony| colony.jelly), Some(1.0));
    for ant in &ants {
        let ant = fixture.world.ants.get(ant).expect("ant");
        assert_eq!(ant.task, TaskType::Idle);
        assert!(ant.target.is_none());
    }
}

#[test]
fn later_orders_replace_earlier_ones() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let scout = entities::spawn_ant(
        &mut fixture.world,
        colony,
        AntType::Scout,
        Position::surface(0.0, 50.0),
        None,
        Timestamp::ZERO,
    );
    let owner = fixture.owner.clone();

    for target_x in [100.0, -100.0] {
        fixture
            .run(&owner, Command::CommandAnts {
                ant_ids: vec![scout, scout],
                target_x,
                target_y: 50.0,
                target_z: 0.0,
                task: None,
            })
            .expect("commanded");
    }

    let ant = fixture.world.ants.get(&scout).expect("scout");
    assert_eq!(ant.task, TaskType::Exploring);
    assert_eq!(ant.target, Some(Position::surface(-100.0, 50.0)));
    let jelly = fixture.world.colonies.get(&colony).map(|colony| colony.jelly);
    assert!(jelly.is_some_and(|jelly| (jelly - 16.0).abs() < 1e-4));
}

#[test]
fn commanding_someone_elses_ants_is_an_empty_order() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let queen = fixture.queen(colony);
    let intruder = PlayerId::new("player_intruder0");
    fixture
        .run(&intruder, Command::CreatePlayer {
            username: "intruder".into(),
        })
        .expect("intruder");

    let result = fixture.run(&intruder, Command::CommandAnts {
        ant_ids: vec![queen],
        target_x: 10.0,
        target_y: 10.0,
        target_z: -10.0,
        task: None,
    });
    assert_eq!(result, Err(Rejection::EmptyOrder));
}

#[test]
fn commands_dispatch_by_method_name() {
    let command = Command::from_call("create_colony", serde_json::json!({ "x": 12.0, "y": -4.0 }))
        .expect("decoded");
    assert_eq!(command, Command::CreateColony { x: 12.0, y: -4.0 });
    assert!(Command::from_call("summon_dragon", serde_json::json!({})).is_err());
}

#[test]
fn larvae_outside_every_chamber_cannot_be_raised() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let _ = fixture.world.colonies.update(&colony, |colony| colony.jelly = 20.0);
    let stray = entities::insert_larva(
        &mut fixture.world,
        colony,
        None,
        Position::new(300.0, 0.0, -10.0),
        Timestamp::ZERO,
        &mut fixture.events,
    );

    fixture.feed(colony, AntType::Worker).expect("fed");
    assert!(fixture.world.larvae.contains(&stray));
    assert_eq!(fixture.world.larvae.len(), 1);

    assert_eq!(fixture.feed(colony, AntType::Worker), Err(Rejection::NoLarvae));
    assert!(fixture.world.larvae.contains(&stray));
}

#[test]
fn queens_lay_one_egg_at_a_time_for_half_a_jelly() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let queen = fixture.queen(colony);
    let owner = fixture.owner.clone();

    let _ = fixture.world.colonies.update(&colony, |colony| colony.jelly = 0.4);
    let result = fixture.run(&owner, Command::SpawnLarva { queen_id: queen });
    assert!(matches!(
        result,
        Err(Rejection::InsufficientJelly { needed, .. }) if needed == balance::LAY_EGG_JELLY
    ));
    assert!(fixture.world.ants.get(&queen).is_some_and(|queen| queen.timer.is_none()));

    let _ = fixture.world.colonies.update(&colony, |colony| colony.jelly = 10.0);
    fixture
        .run(&owner, Command::SpawnLarva { queen_id: queen })
        .expect("laying");
    assert_eq!(
        fixture.run(&owner, Command::SpawnLarva { queen_id: queen }),
        Err(Rejection::AlreadyLaying)
    );
    assert_eq!(fixture.world.colonies.get(&colony).map(|colony| colony.jelly), Some(9.5));
    let queen = fixture.world.ants.get(&queen).expect("queen");
    assert_eq!(queen.task, TaskType::Depositing);
    assert_eq!(
        queen.timer.map(|timer| timer.due_at),
        Some(Timestamp::from_millis(13_000))
    );
}

#[test]
fn full_nurseries_refuse_new_eggs() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let queen = fixture.queen(colony);
    let _ = fixture.world.colonies.update(&colony, |colony| colony.jelly = 10.0);
    for _ in 0..4 {
        fixture.deep_larva(colony);
    }
    let owner = fixture.owner.clone();

    assert_eq!(
        fixture.run(&owner, Command::SpawnLarva { queen_id: queen }),
        Err(Rejection::LarvaeCapacityReached)
    );
    assert_eq!(fixture.world.colonies.get(&colony).map(|colony| colony.jelly), Some(10.0));
    assert!(fixture.world.ants.get(&queen).is_some_and(|queen| queen.timer.is_none()));
}

#[test]
fn young_queens_need_a_throne_room_and_extra_stores() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    fixture.stock(colony, 100.0, 100.0, 0.0, 100.0);

    assert_eq!(
        fixture.feed(colony, AntType::YoungQueen),
        Err(Rejection::ThroneRoomRequired)
    );
    assert_eq!(fixture.world.larvae.len(), 1);

    let _ = entities::insert_chamber(
        &mut fixture.world,
        colony,
        ChamberType::ThroneRoom,
        Position::new(100.0, 0.0, -10.0),
        false,
        Timestamp::ZERO,
        &mut fixture.events,
    );
    fixture.feed(colony, AntType::YoungQueen).expect("fed");

    let colony_row = fixture.world.colonies.get(&colony).expect("colony");
    assert_eq!(colony_row.food, 100.0 - balance::YOUNG_QUEEN_FOOD);
    assert_eq!(colony_row.water, 100.0 - balance::YOUNG_QUEEN_WATER);
    assert_eq!(colony_row.jelly, 80.0);
    let young = fixture
        .world
        .ants
        .iter()
        .find(|ant| ant.ant_type == AntType::YoungQueen)
        .expect("young queen");
    assert_eq!(young.matures_at, Some(Timestamp::from_millis(130_000)));
}

#[test]
fn feeding_past_the_chamber_capacity_is_rejected() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    fixture.stock(colony, 0.0, 0.0, 0.0, 100.0);
    for _ in 0..10 {
        let _ = entities::spawn_ant(
            &mut fixture.world,
            colony,
            AntType::Worker,
            Position::new(0.0, 0.0, -10.0),
            None,
            Timestamp::ZERO,
        );
    }

    assert_eq!(
        fixture.feed(colony, AntType::Soldier),
        Err(Rejection::PopulationCapReached {
            capacity: 10,
            required: 11
        })
    );
    assert_eq!(fixture.world.larvae.len(), 1);
    assert_eq!(fixture.world.colonies.get(&colony).map(|colony| colony.jelly), Some(100.0));
}

#[test]
fn attacks_in_reach_are_recorded_as_battles() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let (_, rival_colony) = fixture.rival(400.0, 0.0);
    let spawn = |fixture: &mut Fixture, colony, x| {
        entities::spawn_ant(
            &mut fixture.world,
            colony,
            AntType::Worker,
            Position::surface(x, 0.0),
            None,
            Timestamp::ZERO,
        )
    };
    let attacker = spawn(&mut fixture, colony, 0.0);
    let sister = spawn(&mut fixture, colony, 1.0);
    let near = spawn(&mut fixture, rival_colony, 3.0);
    let far = spawn(&mut fixture, rival_colony, 50.0);
    let owner = fixture.owner.clone();
    let attack = |fixture: &mut Fixture, target| {
        fixture.run(&owner, Command::AttackTarget {
            attacker_id: attacker,
            target: AttackTarget::Ant(target),
        })
    };

    assert_eq!(attack(&mut fixture, sister), Err(Rejection::FriendlyFire));
    assert!(matches!(
        attack(&mut fixture, far),
        Err(Rejection::OutOfRange { range, .. }) if range == balance::ANT_ATTACK_RANGE
    ));
    assert!(fixture.world.battles.is_empty());

    attack(&mut fixture, near).expect("attacked");
    let battle = fixture.world.battles.iter().next().expect("battle row");
    assert_eq!(fixture.world.battles.len(), 1);
    assert_eq!(battle.attacker_id, attacker);
    assert_eq!(battle.colony_id, colony);
    assert_eq!(battle.target, AttackTarget::Ant(near));
    assert_eq!(battle.damage, 5.0);
    assert_eq!(fixture.world.ants.get(&near).map(|ant| ant.health), Some(45.0));
    assert_eq!(fixture.world.ants.get(&sister).map(|ant| ant.health), Some(50.0));
}

#[test]
fn nuptial_flight_scores_the_colony_and_schedules_the_next_one() {
    let mut fixture = Fixture::new();
    let colony = fixture.found(0.0, 0.0);
    let founder = fixture.queen(colony);
    let young = entities::spawn_ant(
        &mut fixture.world,
        colony,
        AntType::YoungQueen,
        Position::new(0.0, 0.0, -10.0),
        Some(AntTrait::Fertile),
        Timestamp::ZERO,
    );
    fixture.stock(colony, 100.0, 50.0, 10.0, 30.0);
    let owner = fixture.owner.clone();

    assert_eq!(
        fixture.run(&owner, Command::NuptialFlight { queen_id: founder }),
        Err(Rejection::WrongAntType {
            ant_type: AntType::Queen
        })
    );
    fixture
        .run(&owner, Command::NuptialFlight { queen_id: young })
        .expect("departed");

    assert!(!fixture.world.ants.contains(&young));
    assert!(fixture.world.ants.contains(&founder));
    let player = fixture.world.players.get(&owner).expect("player");
    assert_eq!(player.queens_produced, 1);
    assert_eq!(player.generations_survived, 1);
    assert_eq!(player.best_colony_score, 270.0);
    let pending = player.pending_founding.expect("pending founding");
    assert_eq!(pending.due_at, Timestamp::from_millis(13_000));
    assert_eq!(pending.inherited_trait, Some(AntTrait::Fertile));
    assert!(pending.position.is_surface());
    assert!(fixture.events.iter().any(|event| matches!(
        event,
        Event::NuptialFlightDeparted { score, .. } if *score == 270.0
    )));
}

#[test]
fn respawning_regenerates_the_world_and_refounds_the_caller() {
    let mut fixture = Fixture::new();
    let old = fixture.found(0.0, 0.0);
    let (rival, rival_colony) = fixture.rival(400.0, 0.0);
    let marker = entities::insert_resource(
        &mut fixture.world,
        ResourceType::Food,
        Position::surface(777.0, 0.0),
        50.0,
        0.0,
        false,
    );
    let prey = generation::spawn_prey(
        &mut fixture.world,
        PreyKind::Beetle,
        Position::surface(420.0, 0.0),
    );
    let hunter = entities::spawn_ant(
        &mut fixture.world,
        rival_colony,
        AntType::Soldier,
        Position::surface(410.0, 0.0),
        None,
        Timestamp::ZERO,
    );
    let _ = fixture.world.ants.update(&hunter, |ant| {
        ant.task = TaskType::Fighting;
        ant.hunt_target_id = Some(prey);
    });
    let owner = fixture.owner.clone();

    fixture
        .run(&owner, Command::RespawnAsQueen {
            x: -200.0,
            y: 50.0,
            inherited_trait: Some(AntTrait::Swift),
        })
        .expect("respawned");

    assert!(!fixture.world.colonies.contains(&old));
    let mine = query::colonies_of(&fixture.world, &owner);
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].origin, Position::surface(-200.0, 50.0));
    assert_eq!(mine[0].inherited_trait, Some(AntTrait::Swift));
    assert_eq!(query::colonies_of(&fixture.world, &rival).len(), 1);

    let hunter = fixture.world.ants.get(&hunter).expect("hunter");
    assert!(hunter.hunt_target_id.is_none());
    assert_eq!(hunter.task, TaskType::Idle);

    assert!(!fixture.world.resources.contains(&marker));
    assert!(!fixture.world.prey.contains(&prey));
    assert_eq!(fixture.world.resources.len(), 16);
    assert_eq!(fixture.world.prey.len(), 8);
    assert_eq!(fixture.world.predators.len(), 4);
    assert!(fixture
        .events
        .iter()
        .any(|event| matches!(event, Event::WorldRegenerated)));
}
