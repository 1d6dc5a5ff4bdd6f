use anyhow::Result;
use tracing::info;

use crate::{
    catalog::BuildingCategory,
    components::{BudgetCategory, EventKind, MarketDemand, MonthlyReport},
    engine::{System, SystemContext},
    rng::SystemRng,
    systems::citizens::daily_wage,
    world::World,
};

const DAYS_PER_MONTH: f64 = 30.0;
const DEMAND_SMOOTHING: f64 = 0.4;
const MAX_DEMAND: f64 = 2.0;

/// Monthly budget close: taxes, business income, upkeep and market demand.
pub struct EconomySystem;

impl EconomySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EconomySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for EconomySystem {
    fn name(&self) -> &str {
        "economy"
    }

    fn default_interval(&self) -> u64 {
        DAYS_PER_MONTH as u64
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng) -> Result<()> {
        let report = close_month(world, ctx.dt_days);
        let net = report.net();
        let month = report.month;
        world.ledger.money = report.balance_after;
        world.ledger.record(report);
        world.ledger.months_elapsed += 1;

        if net < 0.0 {
            world.ledger.deficit_streak += 1;
            let streak = world.ledger.deficit_streak;
            world.push_event(
                EventKind::BudgetDeficit,
                format!("Month {month} ran a deficit of {:.0} ({streak} in a row)", -net),
            );
        } else {
            world.ledger.deficit_streak = 0;
            if net > 0.0 {
                world.stats.surplus_months += 1;
            }
        }
        world.push_event(
            EventKind::MonthClosed,
            format!("Month {month} closed with balance {:.0}", world.ledger.money),
        );

        let target = demand_target(world);
        let demand = &mut world.ledger.demand;
        demand.residential = smooth(demand.residential, target.residential);
        demand.commercial = smooth(demand.commercial, target.commercial);
        demand.industrial = smooth(demand.industrial, target.industrial);

        info!(
            target: "civitas::economy",
            tick = ctx.tick,
            month,
            net,
            money = world.ledger.money,
            residential = world.ledger.demand.residential,
            commercial = world.ledger.demand.commercial,
            industrial = world.ledger.demand.industrial,
            "month.closed"
        );
        Ok(())
    }
}

fn smooth(current: f64, target: f64) -> f64 {
    let blended = (1.0 - DEMAND_SMOOTHING) * current + DEMAND_SMOOTHING * target;
    blended.clamp(0.0, MAX_DEMAND)
}

fn demand_multiplier(demand: &MarketDemand, category: BuildingCategory) -> f64 {
    match category {
        BuildingCategory::Commercial => demand.commercial,
        BuildingCategory::Industrial => demand.industrial,
        BuildingCategory::Office => 0.5 * (demand.commercial + demand.industrial),
        _ => 1.0,
    }
}

/// Builds the report for the `dt_days` that just passed without touching the ledger.
pub fn close_month(world: &World, dt_days: f64) -> MonthlyReport {
    let ledger = &world.ledger;
    let period = dt_days / DAYS_PER_MONTH;

    let mut income_tax = 0.0;
    for citizen in world.citizens.values() {
        let Some(kind) = citizen
            .workplace
            .and_then(|work| world.buildings.get(&work))
            .map(|b| b.kind)
        else {
            continue;
        };
        income_tax += daily_wage(&world.settings, kind, citizen.education) * dt_days * ledger.tax_rate;
    }

    let occupancy = world.occupancy();
    let maintenance_funding = ledger.budget.level(BudgetCategory::Maintenance);
    let mut business_income = 0.0;
    let mut building_upkeep = 0.0;
    let mut service_upkeep = 0.0;
    for (id, building) in world.buildings.iter() {
        let spec = building.kind.spec();
        if spec.income > 0.0 {
            let staffing = if spec.jobs == 0 {
                1.0
            } else {
                let workers = occupancy.get(id).map(|o| o.workers).unwrap_or(0);
                workers as f64 / spec.jobs as f64
            };
            business_income += spec.income
                * period
                * building.condition_factor()
                * staffing
                * demand_multiplier(&ledger.demand, spec.category);
        }
        match spec.budget {
            Some(category) => service_upkeep += spec.upkeep * period * ledger.budget.level(category),
            None => building_upkeep += spec.upkeep * period * (0.8 + 0.2 * maintenance_funding),
        }
    }

    let mut report = MonthlyReport {
        month: ledger.months_elapsed + 1,
        income_tax,
        business_income,
        building_upkeep,
        service_upkeep,
        balance_after: 0.0,
    };
    report.balance_after = ledger.money + report.net();
    report
}

/// Where demand is heading given current vacancies and the commercial/industrial mix.
pub fn demand_target(world: &World) -> MarketDemand {
    let housing = world.housing_capacity() as f64;
    let jobs = world.job_capacity() as f64;
    let housing_vacancy = if housing > 0.0 {
        world.free_housing() as f64 / housing
    } else {
        0.0
    };
    let job_vacancy = if jobs > 0.0 {
        world.free_jobs() as f64 / jobs
    } else {
        0.0
    };

    let (commercial_jobs, industrial_jobs) =
        world
            .buildings
            .values()
            .fold((0.0, 0.0), |(commercial, industrial), b| {
                let spec = b.kind.spec();
                match spec.category {
                    BuildingCategory::Commercial => (commercial + spec.jobs as f64, industrial),
                    BuildingCategory::Industrial => (commercial, industrial + spec.jobs as f64),
                    _ => (commercial, industrial),
                }
            });
    let population = world.total_population() as f64;

    MarketDemand {
        residential: (1.0 + job_vacancy - housing_vacancy).clamp(0.0, MAX_DEMAND),
        commercial: (population / (5.0 * commercial_jobs).max(1.0)).clamp(0.0, MAX_DEMAND),
        industrial: ((1.2 * commercial_jobs + 10.0) / (industrial_jobs + 10.0)).clamp(0.0, MAX_DEMAND),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::BuildingKind,
        components::{Building, EconomyLedger},
        grid::{CityGrid, Position},
    };

    fn world() -> World {
        World::new(CityGrid::flat(16, 16), EconomyLedger::new(1_000.0, 0.1), 1.0)
    }

    #[test]
    fn empty_city_pays_only_upkeep() {
        let mut world = world();
        world.spawn_building(Building::new(BuildingKind::House, Position::new(1, 1), 0.0));
        let report = close_month(&world, 30.0);
        assert_eq!(report.income(), 0.0);
        assert!((report.building_upkeep - BuildingKind::House.spec().upkeep).abs() < 1e-9);
        assert!(report.balance_after < 1_000.0);
        assert_eq!(report.month, 1);
    }

    #[test]
    fn unstaffed_shops_earn_nothing() {
        let mut world = world();
        world.spawn_building(Building::new(BuildingKind::Shop, Position::new(1, 1), 0.0));
        assert_eq!(close_month(&world, 30.0).business_income, 0.0);
    }

    #[test]
    fn underfunded_services_cost_less() {
        let mut world = world();
        world.spawn_building(Building::new(BuildingKind::Clinic, Position::new(1, 1), 0.0));
        let full = close_month(&world, 30.0).service_upkeep;
        world.set_budget(BudgetCategory::Healthcare, 0.5).unwrap();
        let half = close_month(&world, 30.0).service_upkeep;
        assert!((half - 0.5 * full).abs() < 1e-9);
    }

    #[test]
    fn demand_stays_in_range() {
        let mut world = world();
        for x in 0..6 {
            world.spawn_building(Building::new(BuildingKind::Factory, Position::new(x, 0), 0.0));
        }
        let target = demand_target(&world);
        for value in [target.residential, target.commercial, target.industrial] {
            assert!((0.0..=MAX_DEMAND).contains(&value));
        }
        assert!(target.industrial < 1.0);
        assert!(target.residential >= 1.0);
    }
}
