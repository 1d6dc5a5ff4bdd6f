//! Player-facing city actions and the schedule that replays them headlessly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::BuildingKind,
    components::{BudgetAllocations, BudgetCategory, Building, EconomyLedger, EventKind, MAX_LEVEL},
    grid::Position,
    world::{EntityId, World},
};

const DEMOLITION_REFUND: f64 = 0.25;
const REPAIR_COST_SHARE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CityError {
    #[error("({x}, {y}) is outside the city limits")]
    OutOfBounds { x: i32, y: i32 },
    #[error("terrain at ({x}, {y}) cannot be built on")]
    Unbuildable { x: i32, y: i32 },
    #[error("({x}, {y}) is already occupied by building {existing}")]
    Occupied { x: i32, y: i32, existing: EntityId },
    #[error("insufficient funds: need {needed:.0}, have {available:.0}")]
    InsufficientFunds { needed: f64, available: f64 },
    #[error("no building with id {0}")]
    UnknownBuilding(EntityId),
    #[error("no building at ({x}, {y})")]
    NoBuildingAt { x: i32, y: i32 },
    #[error("tax rate {0} is outside 0..=0.5")]
    InvalidTaxRate(f64),
    #[error("funding level {level} for {category:?} is outside 0..=1.5")]
    InvalidBudget { category: BudgetCategory, level: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CityAction {
    Build { kind: BuildingKind, x: i32, y: i32 },
    Demolish { x: i32, y: i32 },
    Repair { x: i32, y: i32 },
    SetTaxRate { rate: f64 },
    SetBudget { category: BudgetCategory, level: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub day: f64,
    pub action: CityAction,
}

impl World {
    pub fn place_building(&mut self, kind: BuildingKind, pos: Position) -> Result<EntityId, CityError> {
        if !self.grid.contains(pos) {
            return Err(CityError::OutOfBounds { x: pos.x, y: pos.y });
        }
        if !self.grid.is_buildable(pos) {
            return Err(CityError::Unbuildable { x: pos.x, y: pos.y });
        }
        if let Some(existing) = self.building_at(pos) {
            return Err(CityError::Occupied {
                x: pos.x,
                y: pos.y,
                existing,
            });
        }
        let cost = kind.spec().cost;
        self.charge(cost)?;
        let id = self.spawn_building(Building::new(kind, pos, self.days_elapsed()));
        self.stats.buildings_built += 1;
        self.push_event(
            EventKind::BuildingPlaced,
            format!("{} built at ({}, {})", kind.spec().name, pos.x, pos.y),
        );
        Ok(id)
    }

    /// Removes a building, refunding part of its cost in proportion to its condition.
    pub fn demolish(&mut self, id: EntityId) -> Result<Building, CityError> {
        let building = self
            .remove_building(id)
            .ok_or(CityError::UnknownBuilding(id))?;
        let refund = building.kind.spec().cost * DEMOLITION_REFUND * building.condition_factor();
        self.ledger.money += refund;
        self.push_event(
            EventKind::BuildingDemolished,
            format!(
                "{} at ({}, {}) demolished",
                building.kind.spec().name,
                building.position.x,
                building.position.y
            ),
        );
        Ok(building)
    }

    /// Restores full condition; returns what the repair cost.
    pub fn repair(&mut self, id: EntityId) -> Result<f64, CityError> {
        let building = self.building(id).ok_or(CityError::UnknownBuilding(id))?;
        let damage = (MAX_LEVEL - building.condition).max(0.0) / MAX_LEVEL;
        let cost = building.kind.spec().cost * REPAIR_COST_SHARE * damage;
        self.charge(cost)?;
        if let Some(building) = self.building_mut(id) {
            building.condition = MAX_LEVEL;
        }
        Ok(cost)
    }

    pub fn set_tax_rate(&mut self, rate: f64) -> Result<(), CityError> {
        if !(0.0..=EconomyLedger::MAX_TAX_RATE).contains(&rate) {
            return Err(CityError::InvalidTaxRate(rate));
        }
        self.ledger.tax_rate = rate;
        Ok(())
    }

    pub fn set_budget(&mut self, category: BudgetCategory, level: f64) -> Result<(), CityError> {
        if !(0.0..=BudgetAllocations::MAX_FUNDING).contains(&level) {
            return Err(CityError::InvalidBudget { category, level });
        }
        *self.ledger.budget.level_mut(category) = level;
        Ok(())
    }

    pub fn apply_action(&mut self, action: &CityAction) -> Result<(), CityError> {
        match *action {
            CityAction::Build { kind, x, y } => {
                self.place_building(kind, Position::new(x, y))?;
            }
            CityAction::Demolish { x, y } => {
                let id = self.building_id_at(x, y)?;
                self.demolish(id)?;
            }
            CityAction::Repair { x, y } => {
                let id = self.building_id_at(x, y)?;
                self.repair(id)?;
            }
            CityAction::SetTaxRate { rate } => self.set_tax_rate(rate)?,
            CityAction::SetBudget { category, level } => self.set_budget(category, level)?,
        }
        Ok(())
    }

    /// Queues an action; actions due on the same day keep their insertion order.
    pub fn schedule(&mut self, scheduled: ScheduledAction) {
        let index = self
            .pending_actions
            .partition_point(|queued| queued.day <= scheduled.day);
        self.pending_actions.insert(index, scheduled);
    }

    pub fn pending_actions(&self) -> &[ScheduledAction] {
        &self.pending_actions
    }

    pub(crate) fn take_due_actions(&mut self, day: f64) -> Vec<ScheduledAction> {
        let due = self
            .pending_actions
            .partition_point(|queued| queued.day <= day);
        self.pending_actions.drain(..due).collect()
    }

    fn building_id_at(&self, x: i32, y: i32) -> Result<EntityId, CityError> {
        self.building_at(Position::new(x, y))
            .ok_or(CityError::NoBuildingAt { x, y })
    }

    fn charge(&mut self, cost: f64) -> Result<(), CityError> {
        if cost > self.ledger.money {
            return Err(CityError::InsufficientFunds {
                needed: cost,
                available: self.ledger.money,
            });
        }
        self.ledger.money -= cost;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CityGrid, Terrain};

    fn world_with(money: f64) -> World {
        let mut grid = CityGrid::flat(12, 12);
        grid.set_terrain(Position::new(5, 5), Terrain::Water);
        World::new(grid, EconomyLedger::new(money, 0.1), 1.0)
    }

    #[test]
    fn placing_charges_and_records() {
        let mut world = world_with(1_000.0);
        let id = world
            .place_building(BuildingKind::House, Position::new(1, 1))
            .unwrap();
        assert_eq!(world.building(id).unwrap().kind, BuildingKind::House);
        assert_eq!(world.ledger().money, 1_000.0 - BuildingKind::House.spec().cost);
        assert_eq!(world.stats().buildings_built, 1);
    }

    #[test]
    fn placement_is_validated() {
        let mut world = world_with(1_000.0);
        assert_eq!(
            world.place_building(BuildingKind::House, Position::new(12, 0)),
            Err(CityError::OutOfBounds { x: 12, y: 0 })
        );
        assert_eq!(
            world.place_building(BuildingKind::House, Position::new(5, 5)),
            Err(CityError::Unbuildable { x: 5, y: 5 })
        );
        let first = world
            .place_building(BuildingKind::House, Position::new(2, 2))
            .unwrap();
        assert_eq!(
            world.place_building(BuildingKind::Park, Position::new(2, 2)),
            Err(CityError::Occupied {
                x: 2,
                y: 2,
                existing: first
            })
        );
        assert!(matches!(
            world.place_building(BuildingKind::Hospital, Position::new(3, 3)),
            Err(CityError::InsufficientFunds { .. })
        ));
        assert_eq!(world.stats().buildings_built, 1);
    }

    #[test]
    fn demolish_refunds_by_condition() {
        let mut world = world_with(1_000.0);
        let id = world
            .place_building(BuildingKind::House, Position::new(1, 1))
            .unwrap();
        world.building_mut(id).unwrap().condition = 50.0;
        let before = world.ledger().money;
        world.demolish(id).unwrap();
        let refund = BuildingKind::House.spec().cost * DEMOLITION_REFUND * 0.5;
        assert!((world.ledger().money - before - refund).abs() < 1e-9);
        assert!(matches!(
            world.demolish(id),
            Err(CityError::UnknownBuilding(missing)) if missing == id
        ));
    }

    #[test]
    fn repair_restores_condition() {
        let mut world = world_with(5_000.0);
        let id = world
            .place_building(BuildingKind::Shop, Position::new(1, 1))
            .unwrap();
        world.building_mut(id).unwrap().condition = 40.0;
        let cost = world.repair(id).unwrap();
        assert!(cost > 0.0);
        assert_eq!(world.building(id).unwrap().condition, MAX_LEVEL);
    }

    #[test]
    fn policy_ranges_are_enforced() {
        let mut world = world_with(0.0);
        assert_eq!(world.set_tax_rate(0.7), Err(CityError::InvalidTaxRate(0.7)));
        world.set_tax_rate(0.2).unwrap();
        assert_eq!(world.ledger().tax_rate, 0.2);
        assert!(world.set_budget(BudgetCategory::Safety, 2.0).is_err());
        world.set_budget(BudgetCategory::Safety, 1.25).unwrap();
        assert_eq!(world.ledger().budget.safety, 1.25);
    }

    #[test]
    fn schedule_orders_by_day() {
        let mut world = world_with(0.0);
        let tax = |rate| ScheduledAction {
            day: 10.0,
            action: CityAction::SetTaxRate { rate },
        };
        world.schedule(tax(0.1));
        world.schedule(ScheduledAction {
            day: 2.0,
            action: CityAction::Demolish { x: 0, y: 0 },
        });
        world.schedule(tax(0.2));
        let days: Vec<f64> = world.pending_actions().iter().map(|a| a.day).collect();
        assert_eq!(days, vec![2.0, 10.0, 10.0]);
        assert_eq!(world.take_due_actions(5.0).len(), 1);
        let due = world.take_due_actions(10.0);
        assert_eq!(due[0].action, CityAction::SetTaxRate { rate: 0.1 });
        assert_eq!(due[1].action, CityAction::SetTaxRate { rate: 0.2 });
        assert!(world.pending_actions().is_empty());
    }
}
