use anyhow::Result;
use tracing::warn;

use crate::{
    components::{BudgetCategory, EventKind},
    engine::{System, SystemContext},
    rng::SystemRng,
    world::{EntityId, World},
};

/// Wear multiplier for a maintenance funding level; full funding is 1.0.
pub fn wear_factor(funding: f64) -> f64 {
    (1.5 - 0.5 * funding).max(0.0)
}

pub struct MaintenanceSystem;

impl MaintenanceSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MaintenanceSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MaintenanceSystem {
    fn name(&self) -> &str {
        "maintenance"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng) -> Result<()> {
        let wear = wear_factor(world.ledger.budget.level(BudgetCategory::Maintenance));
        for building in world.buildings.values_mut() {
            let decay = building.kind.spec().decay_per_day * wear * ctx.dt_days;
            building.condition = (building.condition - decay).max(0.0);
        }

        let collapsed: Vec<EntityId> = world
            .buildings
            .iter()
            .filter(|(_, b)| b.condition <= 0.0)
            .map(|(id, _)| *id)
            .collect();
        for id in collapsed {
            let Some(building) = world.remove_building(id) else {
                continue;
            };
            world.stats.buildings_lost += 1;
            let name = building.kind.spec().name;
            world.push_event(
                EventKind::BuildingCollapsed,
                format!(
                    "{name} at ({}, {}) collapsed",
                    building.position.x, building.position.y
                ),
            );
            warn!(
                target: "civitas::maintenance",
                tick = ctx.tick,
                id = %id,
                kind = name,
                "building.collapsed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::BuildingKind,
        components::{Building, EconomyLedger},
        grid::{CityGrid, Position},
        rng::RngManager,
    };

    fn ctx(dt_days: f64) -> SystemContext<'static> {
        SystemContext {
            tick: 0,
            day: 0.0,
            dt_days,
            scenario_name: "unit",
        }
    }

    #[test]
    fn cuts_speed_up_decay() {
        assert!(wear_factor(0.0) > wear_factor(1.0));
        assert!(wear_factor(1.5) < wear_factor(1.0));
        assert_eq!(wear_factor(1.0), 1.0);
    }

    #[test]
    fn ruined_buildings_collapse() {
        let mut world = World::new(CityGrid::flat(4, 4), EconomyLedger::new(0.0, 0.1), 1.0);
        let ruin = world.spawn_building(Building::new(BuildingKind::House, Position::new(0, 0), 0.0));
        let sound = world.spawn_building(Building::new(BuildingKind::House, Position::new(1, 0), 0.0));
        world.building_mut(ruin).unwrap().condition = 0.001;
        let mut rng = RngManager::new(0).stream("maintenance", 0);
        MaintenanceSystem::new().run(&ctx(1.0), &mut world, &mut rng).unwrap();

        assert!(world.building(ruin).is_none());
        assert!(world.building(sound).unwrap().condition < 100.0);
        assert_eq!(world.stats().buildings_lost, 1);
        assert!(world.events().any(|e| e.kind == EventKind::BuildingCollapsed));
    }
}
