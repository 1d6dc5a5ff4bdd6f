mod achievements;
mod actions;
mod bookkeeping;
mod citizens;
mod disasters;
mod economy;
mod maintenance;
mod population;

use serde::{Deserialize, Serialize};

use crate::engine::EngineBuilder;

pub use achievements::AchievementSystem;
pub use actions::ActionSystem;
pub use bookkeeping::BookkeepingSystem;
pub use citizens::{daily_wage, CitizenSystem};
pub use disasters::{risk_modifier, DisasterSystem};
pub use economy::{close_month, demand_target, EconomySystem};
pub use maintenance::{wear_factor, MaintenanceSystem};
pub use population::{annual_mortality, attractiveness, generate_citizen, PopulationSystem};

fn every_tick() -> u64 {
    1
}

fn monthly() -> u64 {
    30
}

fn weekly() -> u64 {
    7
}

/// How many ticks pass between runs of each standard system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    #[serde(default = "every_tick")]
    pub actions: u64,
    #[serde(default = "every_tick")]
    pub maintenance: u64,
    #[serde(default = "every_tick")]
    pub disasters: u64,
    #[serde(default = "every_tick")]
    pub population: u64,
    #[serde(default = "every_tick")]
    pub citizens: u64,
    #[serde(default = "monthly")]
    pub economy: u64,
    #[serde(default = "weekly")]
    pub achievements: u64,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            actions: every_tick(),
            maintenance: every_tick(),
            disasters: every_tick(),
            population: every_tick(),
            citizens: every_tick(),
            economy: monthly(),
            achievements: weekly(),
        }
    }
}

impl EngineBuilder {
    /// Registers the full city simulation in its fixed execution order.
    pub fn with_standard_systems(self, cadence: &Cadence) -> Self {
        self.with_system_every(ActionSystem::new(), cadence.actions)
            .with_system_every(MaintenanceSystem::new(), cadence.maintenance)
            .with_system_every(DisasterSystem::new(), cadence.disasters)
            .with_system_every(PopulationSystem::new(), cadence.population)
            .with_system_every(CitizenSystem::new(), cadence.citizens)
            .with_system_every(EconomySystem::new(), cadence.economy)
            .with_system_every(AchievementSystem::new(), cadence.achievements)
            .with_system(BookkeepingSystem::new())
    }
}
