use std::process::{Command, Output};

use tempfile::TempDir;

fn colony_wars(state: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_colony-wars"))
        .arg("--state-dir")
        .arg(state.path())
        .args(["--identity", "player_cli000001", "--seed", "3"])
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch colony-wars")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn calls_persist_between_invocations() {
    let state = TempDir::new().expect("tempdir");

    let player = colony_wars(&state, &["call", "create_player", r#"{"username":"cli"}"#]);
    assert!(player.status.success(), "{}", String::from_utf8_lossy(&player.stderr));
    let colony = colony_wars(&state, &["call", "create_colony", r#"{"x": 10, "y": -20}"#]);
    assert!(colony.status.success(), "{}", String::from_utf8_lossy(&colony.stderr));
    assert!(stdout(&colony).contains("create_colony: ok"));

    let status = colony_wars(&state, &["status"]);
    assert!(status.status.success());
    let report = stdout(&status);
    assert!(report.contains("identity: player_cli000001"));
    assert!(report.contains("Digging"));
    assert!(report.contains("Queen: 1"));
}

#[test]
fn rejected_calls_exit_with_an_error() {
    let state = TempDir::new().expect("tempdir");

    let orphan = colony_wars(&state, &["call", "create_colony", r#"{"x": 0, "y": 0}"#]);
    assert!(!orphan.status.success());
    let unknown = colony_wars(&state, &["call", "summon_dragon"]);
    assert!(!unknown.status.success());
}

#[test]
fn running_the_simulation_reports_ticks() {
    let state = TempDir::new().expect("tempdir");

    let run = colony_wars(&state, &["run", "--seconds", "2"]);
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    assert!(stdout(&run).contains("ran 20 ticks"));
}
