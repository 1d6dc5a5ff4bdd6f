//! Per-tile service coverage, rebuilt from the building registry.

use crate::{
    catalog::CoverageLayer,
    grid::{CityGrid, Position, Terrain},
    world::World,
};

const GREENERY_RADIUS: f64 = 2.0;
const GREENERY_PER_FOREST_TILE: f64 = 6.0;

pub struct CoverageMap {
    width: u32,
    height: u32,
    layers: Vec<Vec<f64>>,
    greenery: Vec<f64>,
}

impl CoverageMap {
    pub fn build(world: &World) -> Self {
        let grid = world.grid();
        let tiles = (grid.width() * grid.height()) as usize;
        let mut map = Self {
            width: grid.width(),
            height: grid.height(),
            layers: vec![vec![0.0; tiles]; CoverageLayer::ALL.len()],
            greenery: vec![0.0; tiles],
        };

        let budget = &world.ledger().budget;
        for (_, building) in world.buildings() {
            let spec = building.kind.spec();
            let funding = spec.budget.map(|category| budget.level(category)).unwrap_or(1.0);
            let output = building.condition_factor() * funding;
            if output <= 0.0 {
                continue;
            }
            for effect in spec.effects {
                for (pos, distance) in grid.tiles_within(building.position, effect.radius) {
                    let falloff = 1.0 - distance / (effect.radius + 1.0);
                    if let Some(idx) = map.index(pos) {
                        map.layers[effect.layer.index()][idx] += effect.strength * falloff * output;
                    }
                }
            }
        }

        map.accumulate_greenery(grid);
        map
    }

    fn accumulate_greenery(&mut self, grid: &CityGrid) {
        for forest in grid.tiles_of(Terrain::Forest) {
            for (pos, _) in grid.tiles_within(forest, GREENERY_RADIUS) {
                if let Some(idx) = self.index(pos) {
                    self.greenery[idx] += GREENERY_PER_FOREST_TILE;
                }
            }
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        Some(pos.y as usize * self.width as usize + pos.x as usize)
    }

    /// Coverage of `layer` at `pos`, capped at 100. Zero outside the map.
    pub fn level(&self, layer: CoverageLayer, pos: Position) -> f64 {
        self.index(pos)
            .map(|idx| self.layers[layer.index()][idx].min(100.0))
            .unwrap_or(0.0)
    }

    pub fn greenery(&self, pos: Position) -> f64 {
        self.index(pos)
            .map(|idx| self.greenery[idx].min(100.0))
            .unwrap_or(0.0)
    }

    /// Environmental quality: greenery and parks raise it, pollution lowers it.
    pub fn environment(&self, pos: Position) -> f64 {
        let base = 55.0;
        let value = base + 0.25 * self.level(CoverageLayer::Recreation, pos) + 0.4 * self.greenery(pos)
            - self.level(CoverageLayer::Pollution, pos);
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::BuildingKind,
        components::{Building, BudgetCategory, EconomyLedger},
    };

    fn world() -> World {
        World::new(CityGrid::flat(20, 20), EconomyLedger::new(0.0, 0.1), 1.0)
    }

    #[test]
    fn coverage_falls_off_with_distance() {
        let mut world = world();
        world.spawn_building(Building::new(BuildingKind::Park, Position::new(10, 10), 0.0));
        let map = CoverageMap::build(&world);
        let center = map.level(CoverageLayer::Recreation, Position::new(10, 10));
        let near = map.level(CoverageLayer::Recreation, Position::new(12, 10));
        let far = map.level(CoverageLayer::Recreation, Position::new(19, 19));
        assert_eq!(center, 70.0);
        assert!(near < center && near > 0.0);
        assert_eq!(far, 0.0);
        assert_eq!(map.level(CoverageLayer::Recreation, Position::new(-1, 4)), 0.0);
    }

    #[test]
    fn funding_and_condition_scale_output() {
        let mut world = world();
        let id = world.spawn_building(Building::new(BuildingKind::Clinic, Position::new(5, 5), 0.0));
        let full = CoverageMap::build(&world).level(CoverageLayer::Healthcare, Position::new(5, 5));

        world.set_budget(BudgetCategory::Healthcare, 0.5).unwrap();
        let half_funded = CoverageMap::build(&world).level(CoverageLayer::Healthcare, Position::new(5, 5));
        assert!((half_funded - full * 0.5).abs() < 1e-9);

        world.building_mut(id).unwrap().condition = 0.0;
        let ruined = CoverageMap::build(&world).level(CoverageLayer::Healthcare, Position::new(5, 5));
        assert_eq!(ruined, 0.0);
    }

    #[test]
    fn pollution_lowers_environment() {
        let mut world = world();
        let clean = CoverageMap::build(&world).environment(Position::new(3, 3));
        world.spawn_building(Building::new(BuildingKind::Factory, Position::new(3, 3), 0.0));
        let polluted = CoverageMap::build(&world).environment(Position::new(3, 3));
        assert!(polluted < clean);
    }
}
