use anyhow::Result;

use crate::{
    components::clamp_level,
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Last system of the tick: keeps every level inside its valid range and
/// updates running records.
pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(&mut self, _ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng) -> Result<()> {
        for citizen in world.citizens.values_mut() {
            citizen.needs.clamp_all();
            citizen.happiness = clamp_level(citizen.happiness);
            citizen.education = clamp_level(citizen.education);
            if !citizen.wealth.is_finite() || citizen.wealth < 0.0 {
                citizen.wealth = 0.0;
            }
        }
        for building in world.buildings.values_mut() {
            building.condition = clamp_level(building.condition);
        }
        while world.events.len() > World::EVENT_LOG_CAPACITY {
            world.events.pop_front();
        }
        let population = world.total_population();
        if population > world.stats.peak_population {
            world.stats.peak_population = population;
        }
        Ok(())
    }
}
