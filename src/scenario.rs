use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    actions::ScheduledAction,
    catalog::BuildingKind,
    components::{Building, EconomyLedger},
    grid::{CityGrid, Position},
    systems::{generate_citizen, Cadence},
    world::{CitySettings, World},
};

const SETTLER_AGES: (f64, f64) = (18.0, 60.0);
const SETTLER_STREAM: u64 = 0x5e77_1e25;

fn default_dt_days() -> f64 {
    1.0
}

fn default_snapshot_interval_ticks() -> u64 {
    30
}

fn default_width() -> u32 {
    48
}

fn default_height() -> u32 {
    32
}

fn default_generate_terrain() -> bool {
    true
}

fn default_starting_money() -> f64 {
    50_000.0
}

fn default_tax_rate() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_dt_days")]
    pub dt_days: f64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub initial_citizens: u32,
    #[serde(default)]
    pub buildings: Vec<ScenarioBuilding>,
    #[serde(default)]
    pub city: CitySettings,
    #[serde(default)]
    pub cadence: Cadence,
    #[serde(default)]
    pub actions: Vec<ScheduledAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_generate_terrain")]
    pub generate_terrain: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            generate_terrain: default_generate_terrain(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    #[serde(default = "default_starting_money")]
    pub starting_money: f64,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_money: default_starting_money(),
            tax_rate: default_tax_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioBuilding {
    pub kind: BuildingKind,
    pub x: i32,
    pub y: i32,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        Scenario::parse(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

impl Scenario {
    pub fn parse(yaml: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if !(self.dt_days.is_finite() && self.dt_days > 0.0) {
            bail!("dt_days must be positive, got {}", self.dt_days);
        }
        if self.grid.width == 0 || self.grid.height == 0 {
            bail!("grid must be at least 1x1");
        }
        if !(0.0..=EconomyLedger::MAX_TAX_RATE).contains(&self.economy.tax_rate) {
            bail!("tax_rate {} is outside 0..={}", self.economy.tax_rate, EconomyLedger::MAX_TAX_RATE);
        }
        if let Some(bad) = self.actions.iter().find(|a| !(a.day.is_finite() && a.day >= 0.0)) {
            bail!("scheduled action day must be a finite, non-negative number, got {}", bad.day);
        }
        Ok(())
    }

    /// Lays out the starting city. Pre-placed buildings are free and settlers
    /// arrive homeless; the first population pass houses them.
    pub fn build_world(&self) -> Result<World> {
        let grid = if self.grid.generate_terrain {
            CityGrid::generate(self.grid.width, self.grid.height, self.seed)
        } else {
            CityGrid::flat(self.grid.width, self.grid.height)
        };
        let ledger = EconomyLedger::new(self.economy.starting_money, self.economy.tax_rate);
        let mut world = World::new(grid, ledger, self.dt_days);
        *world.settings_mut() = self.city.clone();

        for placed in &self.buildings {
            let pos = Position::new(placed.x, placed.y);
            if !world.grid().is_buildable(pos) {
                bail!(
                    "scenario building {:?} at ({}, {}) is off the map or on water",
                    placed.kind,
                    placed.x,
                    placed.y
                );
            }
            if let Some(existing) = world.building_at(pos) {
                bail!("scenario building at ({}, {}) overlaps building {existing}", placed.x, placed.y);
            }
            world.spawn_building(Building::new(placed.kind, pos, 0.0));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ SETTLER_STREAM);
        for _ in 0..self.initial_citizens {
            world.spawn_citizen(generate_citizen(&mut rng, SETTLER_AGES));
        }

        for action in &self.actions {
            world.schedule(action.clone());
        }
        Ok(world)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(360)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::CityAction;

    const MINIMAL: &str = r#"
name: sandbox
seed: 3
grid:
  width: 12
  height: 10
  generate_terrain: false
buildings:
  - { kind: house, x: 1, y: 1 }
  - { kind: shop, x: 2, y: 1 }
initial_citizens: 6
actions:
  - day: 5
    action: { type: set_tax_rate, rate: 0.2 }
  - day: 2
    action: { type: build, kind: park, x: 4, y: 4 }
"#;

    #[test]
    fn defaults_fill_missing_sections() {
        let scenario = Scenario::parse(MINIMAL).unwrap();
        assert_eq!(scenario.dt_days, 1.0);
        assert_eq!(scenario.economy.starting_money, 50_000.0);
        assert_eq!(scenario.cadence, Cadence::default());
        assert!(!scenario.city.disasters.enabled);
        assert_eq!(scenario.ticks(None), 360);
        assert_eq!(scenario.ticks(Some(5)), 5);
    }

    #[test]
    fn world_matches_the_layout() {
        let world = Scenario::parse(MINIMAL).unwrap().build_world().unwrap();
        assert_eq!(world.buildings().count(), 2);
        assert_eq!(world.total_population(), 6);
        assert_eq!(world.ledger().money, 50_000.0);
        assert_eq!(world.stats().buildings_built, 0);
        let days: Vec<f64> = world.pending_actions().iter().map(|a| a.day).collect();
        assert_eq!(days, vec![2.0, 5.0]);
        assert!(matches!(world.pending_actions()[0].action, CityAction::Build { .. }));
    }

    #[test]
    fn overlapping_buildings_are_rejected() {
        let yaml = MINIMAL.replace("x: 2, y: 1", "x: 1, y: 1");
        let err = Scenario::parse(&yaml).unwrap().build_world().unwrap_err();
        assert!(err.to_string().contains("overlaps"));
    }

    #[test]
    fn bad_tax_rate_fails_to_parse() {
        let yaml = format!("{MINIMAL}economy:\n  tax_rate: 0.9\n");
        assert!(Scenario::parse(&yaml).is_err());
    }

    #[test]
    fn action_days_must_be_real_calendar_days() {
        for day in [".nan", ".inf", "-1"] {
            let yaml = MINIMAL.replace("day: 5", &format!("day: {day}"));
            let err = Scenario::parse(&yaml).unwrap_err();
            assert!(err.to_string().contains("scheduled action day"), "{day}: {err}");
        }
    }
}
