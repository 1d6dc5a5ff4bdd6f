use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use civitas::{
    engine::{EngineBuilder, EngineSettings},
    save::SaveGame,
    scenario::ScenarioLoader,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Civitas city simulation runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/new_haven.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override snapshot interval in ticks
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Resume from a save game instead of the scenario's starting city
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write a save game here when the run finishes
    #[arg(long)]
    save: Option<PathBuf>,

    /// Serve the run over HTTP instead of running to completion
    #[arg(long)]
    serve: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let (mut world, scenario_name, seed) = match &cli.load {
        Some(path) => {
            let save = SaveGame::read_from(path)
                .with_context(|| format!("Failed to load save {}", path.display()))?;
            info!(
                target: "civitas::cli",
                path = %path.display(),
                tick = save.world.tick(),
                saved_at = %save.saved_at,
                "save.loaded"
            );
            (save.world, save.scenario, save.seed)
        }
        None => (scenario.build_world()?, scenario.name.clone(), scenario.seed),
    };
    let ticks = scenario.ticks(cli.ticks);
    let snapshot_interval = cli
        .snapshot_interval
        .unwrap_or(scenario.snapshot_interval_ticks);
    let snapshot_dir = cli
        .snapshot_dir
        .unwrap_or_else(|| PathBuf::from("snapshots"));

    if cli.serve {
        let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
        return runtime.block_on(web::run(WebServerConfig {
            world,
            scenario_name,
            seed,
            cadence: scenario.cadence.clone(),
            ticks,
            snapshot_interval,
            snapshot_dir,
            host: cli.host,
            port: cli.port,
        }));
    }

    let settings = EngineSettings {
        scenario_name: scenario_name.clone(),
        seed,
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };
    let mut engine = EngineBuilder::new(settings)
        .with_standard_systems(&scenario.cadence)
        .build();

    engine.run(&mut world, ticks)?;

    if let Some(path) = &cli.save {
        SaveGame::new(scenario_name.clone(), seed, world.clone()).write_to(path)?;
        info!(target: "civitas::cli", path = %path.display(), "save.written");
    }

    let snapshot = world.snapshot(&scenario_name);
    println!(
        "Scenario '{}' ran {} ticks (day {:.0}). Population {}, money {:.0}, happiness {:.1}, achievements {}",
        scenario_name,
        ticks,
        snapshot.days_elapsed,
        snapshot.population,
        snapshot.money,
        snapshot.average_happiness,
        snapshot.achievements_unlocked.len()
    );
    Ok(())
}
