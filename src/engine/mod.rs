use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::{
    rng::{RngManager, SystemRng},
    snapshot::SnapshotWriter,
    world::{World, WorldSnapshot},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

struct ScheduledSystem {
    system: Box<dyn System>,
    interval: u64,
}

impl ScheduledSystem {
    fn is_due(&self, tick: u64) -> bool {
        (tick + 1) % self.interval == 0
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<ScheduledSystem>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    /// Registers a system at its own default cadence.
    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.push_system(system);
        self
    }

    /// Registers a system that runs once every `interval` ticks (0 is treated as 1).
    pub fn with_system_every(mut self, system: impl System + 'static, interval: u64) -> Self {
        self.systems.push(ScheduledSystem {
            system: Box::new(system),
            interval: interval.max(1),
        });
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        let interval = system.default_interval().max(1);
        self.systems.push(ScheduledSystem {
            system: Box::new(system),
            interval,
        });
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<ScheduledSystem>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    /// Registered systems with their cadence, in execution order.
    pub fn schedule(&self) -> Vec<(&str, u64)> {
        self.systems
            .iter()
            .map(|entry| (entry.system.name(), entry.interval))
            .collect()
    }

    /// Advances the world by exactly one tick.
    pub fn step(&mut self, world: &mut World) -> Result<()> {
        let current_tick = world.tick();
        let day = world.days_elapsed();
        for entry in &mut self.systems {
            if !entry.is_due(current_tick) {
                continue;
            }
            let name = entry.system.name().to_string();
            let mut rng_stream = self.rng.stream(&name, current_tick);
            let ctx = SystemContext {
                tick: current_tick,
                day,
                dt_days: world.dt_days() * entry.interval as f64,
                scenario_name: &self.settings.scenario_name,
            };
            entry
                .system
                .run(&ctx, world, &mut rng_stream)
                .with_context(|| format!("system '{name}' failed at tick {current_tick}"))?;
        }
        world.advance_time();
        if let Some(path) = self
            .snapshot_writer
            .maybe_write(world, &self.settings.scenario_name)?
        {
            debug!(target: "civitas::engine", tick = world.tick(), path = %path.display(), "snapshot.written");
        }
        Ok(())
    }

    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<()> {
        self.run_with_hook(world, ticks, |_| {})
    }

    /// Runs `ticks` ticks, handing a snapshot of the world to `hook` after each one.
    pub fn run_with_hook<F>(&mut self, world: &mut World, ticks: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(WorldSnapshot),
    {
        info!(
            target: "civitas::engine",
            scenario = %self.settings.scenario_name,
            seed = self.rng.seed(),
            start_tick = world.tick(),
            ticks,
            "run.started"
        );
        for _ in 0..ticks {
            self.step(world)?;
            hook(world.snapshot(&self.settings.scenario_name));
        }
        info!(
            target: "civitas::engine",
            scenario = %self.settings.scenario_name,
            tick = world.tick(),
            population = world.total_population(),
            money = world.ledger().money,
            "run.finished"
        );
        Ok(())
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    /// Simulated day at the start of this tick.
    pub day: f64,
    /// Simulated days since this system last ran.
    pub dt_days: f64,
    pub scenario_name: &'a str,
}

pub trait System: Send {
    fn name(&self) -> &str;

    fn default_interval(&self) -> u64 {
        1
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut SystemRng) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{components::EconomyLedger, grid::CityGrid};

    struct Counter {
        label: &'static str,
        seen: Arc<Mutex<Vec<(u64, f64, f64)>>>,
    }

    impl System for Counter {
        fn name(&self) -> &str {
            self.label
        }

        fn run(&mut self, ctx: &SystemContext, _world: &mut World, _rng: &mut SystemRng) -> Result<()> {
            self.seen.lock().unwrap().push((ctx.tick, ctx.day, ctx.dt_days));
            Ok(())
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            scenario_name: "unit".into(),
            seed: 1,
            snapshot_interval_ticks: 0,
            snapshot_dir: PathBuf::from("unused"),
        }
    }

    #[test]
    fn cadence_gates_system_runs() {
        let daily = Arc::new(Mutex::new(Vec::new()));
        let weekly = Arc::new(Mutex::new(Vec::new()));
        let mut engine = EngineBuilder::new(settings())
            .with_system(Counter {
                label: "daily",
                seen: daily.clone(),
            })
            .with_system_every(
                Counter {
                    label: "weekly",
                    seen: weekly.clone(),
                },
                7,
            )
            .build();
        let mut world = World::new(CityGrid::flat(4, 4), EconomyLedger::new(0.0, 0.1), 1.0);
        engine.run(&mut world, 14).unwrap();

        assert_eq!(daily.lock().unwrap().len(), 14);
        assert_eq!(*weekly.lock().unwrap(), vec![(6, 6.0, 7.0), (13, 13.0, 7.0)]);
        assert_eq!(world.tick(), 14);
        assert_eq!(engine.schedule(), vec![("daily", 1), ("weekly", 7)]);
    }
}
