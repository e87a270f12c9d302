use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use colony_wars_core::{Event, Rejection, TableName, Timestamp};
use colony_wars_mock_backend::{
    Backend, BackendConfig, CallError, FileStorage, MemoryStorage, MockBackend, Storage,
    DEFAULT_STORAGE_KEY,
};
use serde_json::json;
use tempfile::TempDir;

const CONNECTED_AT: Timestamp = Timestamp::from_millis(1_700_000_000_000);

fn config_for(identity: &str) -> BackendConfig {
    BackendConfig {
        identity: Some(identity.to_owned()),
        ..BackendConfig::default()
    }
}

fn connected(identity: &str, storage: MemoryStorage) -> MockBackend<MemoryStorage> {
    let mut backend = MockBackend::new(config_for(identity), storage).expect("backend");
    backend.connect(CONNECTED_AT).expect("connect");
    backend
}

fn found_colony(backend: &mut MockBackend<MemoryStorage>, name: &str, x: f32) {
    backend
        .call("create_player", json!({ "username": name }))
        .expect("player");
    backend
        .call("create_colony", json!({ "x": x, "y": 0.0 }))
        .expect("colony");
}

#[test]
fn connecting_publishes_the_initial_tables() {
    let mut backend =
        MockBackend::new(config_for("player_initial01"), MemoryStorage::new()).expect("backend");
    let seen = Arc::new(Mutex::new(Vec::new()));
    for table in [TableName::Player, TableName::ResourceNode, TableName::Predator] {
        let seen = Arc::clone(&seen);
        backend.on(
            table,
            Box::new(move |snapshot| {
                seen.lock()
                    .expect("lock")
                    .push((snapshot.table, snapshot.len()));
            }),
        );
    }

    backend.connect(CONNECTED_AT).expect("connect");

    let seen = seen.lock().expect("lock");
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], (TableName::Player, 0));
    assert_eq!(seen[1].0, TableName::ResourceNode);
    assert!(seen[1].1 > 0);
}

#[test]
fn calls_before_connecting_are_refused() {
    let mut backend =
        MockBackend::new(config_for("player_early0001"), MemoryStorage::new()).expect("backend");
    let result = backend.call("create_player", json!({ "username": "early" }));
    assert!(matches!(result, Err(CallError::NotConnected)));
    assert!(!backend.tick(CONNECTED_AT).expect("tick"));
}

#[test]
fn calls_are_saved_and_published() {
    let storage = MemoryStorage::new();
    let mut backend = connected("player_caller001", storage.clone());
    let colonies = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&colonies);
    backend.on(
        TableName::Colony,
        Box::new(move |snapshot| sink.lock().expect("lock").push(snapshot.len())),
    );

    found_colony(&mut backend, "caller", 0.0);

    assert_eq!(*colonies.lock().expect("lock"), vec![1]);
    let blob = storage
        .read(DEFAULT_STORAGE_KEY)
        .expect("read")
        .expect("saved blob");
    let document: serde_json::Value = serde_json::from_str(&blob).expect("json");
    assert_eq!(document["data"]["Colony"].as_array().map(Vec::len), Some(1));
    assert!(document["nextId"].is_object());
}

#[test]
fn bad_calls_are_told_apart_from_rejections() {
    let mut backend = connected("player_badcall01", MemoryStorage::new());

    let unknown = backend.call("summon_dragon", json!({}));
    assert!(matches!(unknown, Err(CallError::Decode { .. })));
    let malformed = backend.call("create_colony", json!({ "x": "left" }));
    assert!(matches!(malformed, Err(CallError::Decode { .. })));

    let rejected = backend.call("create_colony", json!({ "x": 0.0, "y": 0.0 }));
    assert!(matches!(
        rejected,
        Err(CallError::Rejected(Rejection::PlayerMissing(_)))
    ));
    assert!(backend
        .drain_events()
        .iter()
        .any(|event| matches!(event, Event::CommandRejected { .. })));
}

#[test]
fn sessions_only_load_their_own_colonies() {
    let storage = MemoryStorage::new();
    let mut alice = connected("player_alice0001", storage.clone());
    found_colony(&mut alice, "alice", 0.0);
    alice.disconnect().expect("disconnect");

    let mut bob = connected("player_bob000001", storage.clone());
    assert!(bob.world().colonies.is_empty());
    assert!(bob.world().players.is_empty());
    assert_eq!(bob.world().resources.len(), alice.world().resources.len());
    found_colony(&mut bob, "bob", 300.0);

    let alice_again = connected("player_alice0001", storage);
    let owners: Vec<String> = alice_again
        .world()
        .colonies
        .iter()
        .map(|colony| colony.owner.to_string())
        .collect();
    assert_eq!(owners, vec!["player_alice0001".to_owned()]);
    assert_eq!(
        alice_again.world().colonies.keys(),
        alice.world().colonies.keys()
    );
    assert_eq!(
        alice_again.world().ants.keys(),
        alice.world().ants.keys()
    );
}

#[test]
fn unreadable_state_starts_a_fresh_world() {
    let mut storage = MemoryStorage::new();
    storage
        .write(DEFAULT_STORAGE_KEY, "{\"data\": [")
        .expect("write");

    let backend = connected("player_corrupt01", storage);

    assert!(backend.world().colonies.is_empty());
    assert!(!backend.world().resources.is_empty());
}

#[test]
fn ticks_advance_the_session_clock() {
    let mut backend = connected("player_ticking01", MemoryStorage::new());
    found_colony(&mut backend, "ticker", 0.0);
    let _ = backend.drain_events();

    assert!(backend
        .tick(Timestamp::from_millis(CONNECTED_AT.as_millis() + 100))
        .expect("tick"));
    assert!(!backend
        .tick(Timestamp::from_millis(CONNECTED_AT.as_millis() + 100))
        .expect("tick"));
    let ran = backend.advance(Duration::from_secs(6)).expect("advance");

    assert_eq!(ran, 60);
    assert!(backend
        .drain_events()
        .iter()
        .any(|event| matches!(event, Event::BurrowCompleted { .. })));
    assert_eq!(backend.simulation().skipped_ticks(), 1);
}

#[test]
fn queued_calls_wait_for_the_next_tick() {
    let mut backend = connected("player_queued001", MemoryStorage::new());
    backend
        .enqueue("create_player", json!({ "username": "queued" }))
        .expect("queued");
    assert!(backend.world().players.is_empty());

    assert!(backend
        .tick(Timestamp::from_millis(CONNECTED_AT.as_millis() + 100))
        .expect("tick"));
    assert_eq!(backend.world().players.len(), 1);
}

#[test]
fn file_storage_remembers_identity_and_world() {
    let temp = TempDir::new().expect("tempdir");
    let config = BackendConfig::default();

    let mut first = MockBackend::new(config.clone(), FileStorage::new(temp.path())).expect("backend");
    first.connect(CONNECTED_AT).expect("connect");
    first
        .call("create_player", json!({ "username": "filed" }))
        .expect("player");
    first.disconnect().expect("disconnect");

    let mut second = MockBackend::new(config, FileStorage::new(temp.path())).expect("backend");
    assert_eq!(second.identity(), first.identity());
    second.connect(CONNECTED_AT).expect("connect");
    assert_eq!(second.world().players.len(), 1);
    assert!(temp.path().join(format!("{DEFAULT_STORAGE_KEY}.json")).exists());
}
