#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line adapter for the Colony Wars mock backend.

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colony_wars_core::{AntType, Event};
use colony_wars_mock_backend::{wall_clock, Backend, BackendConfig, FileStorage, MockBackend};
use colony_wars_simulation::TickScheduler;
use colony_wars_world::query;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_STATE_DIR: &str = ".colony-wars";

#[derive(Parser, Debug)]
#[command(
    name = "colony-wars",
    version,
    about = "Run and poke the Colony Wars mock backend"
)]
struct Cli {
    /// TOML file with backend settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Play as this identity instead of the remembered one.
    #[arg(long)]
    identity: Option<String>,
    /// Seed of the simulation RNG.
    #[arg(long)]
    seed: Option<u64>,
    /// Directory holding the saved world and identity.
    #[arg(long, default_value = DEFAULT_STATE_DIR)]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the tick loop.
    Run {
        /// Simulated seconds to run.
        #[arg(long, default_value_t = 60)]
        seconds: u64,
        /// Pace ticks on the wall clock instead of running flat out.
        #[arg(long)]
        realtime: bool,
    },
    /// Invoke a named command, e.g. `call create_colony '{"x":0,"y":0}'`.
    Call {
        /// Method name.
        method: String,
        /// JSON arguments (joined with spaces).
        args: Vec<String>,
    },
    /// Print the caller's colonies.
    Status,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let storage = FileStorage::new(&cli.state_dir);
    let mut backend = MockBackend::new(config, storage)
        .with_context(|| format!("failed to open state in {}", cli.state_dir.display()))?;
    backend
        .connect(wall_clock())
        .context("failed to connect to the mock backend")?;

    match cli.command {
        Command::Run { seconds, realtime } => {
            run_command(&mut backend, Duration::from_secs(seconds), realtime)?;
        }
        Command::Call { method, args } => call_command(&mut backend, &method, &args)?,
        Command::Status => status_command(&backend),
    }

    backend.disconnect().context("failed to save the world")?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(cli: &Cli) -> Result<BackendConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => BackendConfig::default(),
    };
    if let Some(identity) = &cli.identity {
        config.identity = Some(identity.clone());
    }
    if let Some(seed) = cli.seed {
        config.simulation.rng_seed = seed;
    }
    Ok(config)
}

fn read_config(path: &Path) -> Result<BackendConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn parse_args(args: &[String]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    let joined = args.join(" ");
    serde_json::from_str(&joined).with_context(|| format!("arguments are not JSON: {joined}"))
}

fn run_command(
    backend: &mut MockBackend<FileStorage>,
    duration: Duration,
    realtime: bool,
) -> Result<()> {
    let ran = if realtime {
        run_paced(backend, duration)?
    } else {
        backend.advance(duration).context("failed to save the world")?
    };
    let events = backend.drain_events();
    report(&events);
    println!(
        "ran {ran} ticks, {} skipped, {} ants starved",
        backend.simulation().skipped_ticks(),
        backend.simulation().starved()
    );
    Ok(())
}

fn run_paced(backend: &mut MockBackend<FileStorage>, duration: Duration) -> Result<u64> {
    let mut scheduler = TickScheduler::new(backend.simulation().tick_interval());
    let started = Instant::now();
    let mut ran = 0;
    while started.elapsed() < duration {
        if scheduler.poll(Instant::now()) && backend.tick(wall_clock()).context("tick failed")? {
            ran += 1;
        }
        thread::sleep(scheduler.time_until_next(Instant::now()));
    }
    info!(
        ticks = ran,
        coalesced = scheduler.skipped_intervals(),
        "realtime_run_finished"
    );
    Ok(ran)
}

fn call_command(
    backend: &mut MockBackend<FileStorage>,
    method: &str,
    args: &[String],
) -> Result<()> {
    let args = parse_args(args)?;
    if let Err(error) = backend.call(method, args) {
        bail!("{method} failed: {error}");
    }
    report(&backend.drain_events());
    println!("{method}: ok");
    Ok(())
}

fn report(events: &[Event]) {
    for event in events {
        match event {
            Event::TimeAdvanced { .. } | Event::CommandRejected { .. } => {}
            other => println!("  {other:?}"),
        }
    }
}

fn status_command(backend: &MockBackend<FileStorage>) {
    let world = backend.world();
    println!("identity: {}", backend.identity());
    let colonies = query::colonies_of(world, backend.identity());
    if colonies.is_empty() {
        println!("no colonies");
        return;
    }
    for colony in colonies {
        println!(
            "colony {} ({:?}): population {} larvae {} | food {:.1} water {:.1} minerals {:.1} jelly {:.1}",
            colony.id.get(),
            colony.stage,
            colony.population,
            colony.larvae,
            colony.food,
            colony.water,
            colony.minerals,
            colony.jelly,
        );
        for ant_type in AntType::ALL {
            let count = query::count_ants(world, colony.id, ant_type);
            if count > 0 {
                println!("  {ant_type:?}: {count}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_config_file() {
        let dir = std::env::temp_dir().join(format!("colony-wars-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("backend.toml");
        fs::write(&path, "identity = \"player_fromfile1\"\n[simulation]\nrng_seed = 5\n")
            .expect("write config");

        let cli = Cli::try_parse_from([
            "colony-wars",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--seed",
            "9",
            "status",
        ])
        .expect("parse");
        let config = load_config(&cli).expect("config");

        assert_eq!(config.identity.as_deref(), Some("player_fromfile1"));
        assert_eq!(config.simulation.rng_seed, 9);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn call_arguments_are_joined_into_json() {
        let args = vec!["{\"x\":".to_owned(), "1.5, \"y\": 2}".to_owned()];
        let value = parse_args(&args).expect("json");
        assert_eq!(value["x"], 1.5);
        assert!(parse_args(&[]).expect("empty").is_object());
        assert!(parse_args(&["nope".to_owned()]).is_err());
    }

    #[test]
    fn run_defaults_to_a_simulated_minute() {
        let cli = Cli::try_parse_from(["colony-wars", "run"]).expect("parse");
        assert!(matches!(
            cli.command,
            Command::Run {
                seconds: 60,
                realtime: false
            }
        ));
        assert_eq!(cli.state_dir, PathBuf::from(DEFAULT_STATE_DIR));
    }
}
