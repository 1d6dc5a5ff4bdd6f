use anyhow::Result;

use crate::{
    catalog::{BuildingKind, CoverageLayer},
    components::{clamp_level, Citizen, Disaster, NeedKind},
    coverage::CoverageMap,
    engine::{System, SystemContext},
    grid::Position,
    hazards,
    rng::SystemRng,
    world::{CitySettings, EntityId, World},
};

const NEED_ADJUST_RATE: f64 = 0.25;
const HAPPINESS_ADJUST_RATE: f64 = 0.1;
const UNHAPPY_THRESHOLD: f64 = 30.0;
const ROAMING_COVERAGE: f64 = 20.0;
const TAX_TOLERANCE: f64 = 0.1;
const TAX_PENALTY_PER_POINT: f64 = 60.0;
const POVERTY_PENALTY: f64 = 10.0;
const DISASTER_STRESS: f64 = 15.0;

/// Gross daily pay for a worker with `education` at a `kind` workplace.
pub fn daily_wage(settings: &CitySettings, kind: BuildingKind, education: f64) -> f64 {
    settings.base_wage * kind.spec().wage_factor * (1.0 + clamp_level(education) / 100.0)
}

struct Surroundings {
    home: Option<(Position, f64)>,
    workplace: Option<BuildingKind>,
    /// Happiness lost to disasters currently reaching the citizen.
    stress: f64,
}

fn disaster_stress(disasters: &[Disaster], home: Option<Position>) -> f64 {
    disasters
        .iter()
        .map(|disaster| {
            let intensity = match home {
                Some(pos) => disaster.intensity_at(pos),
                None if hazards::profile(disaster.kind).city_wide => 1.0,
                None => 0.0,
            };
            intensity * disaster.severity * DISASTER_STRESS
        })
        .sum()
}

pub struct CitizenSystem;

impl CitizenSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CitizenSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CitizenSystem {
    fn name(&self) -> &str {
        "citizens"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng) -> Result<()> {
        let dt = ctx.dt_days;
        let coverage = CoverageMap::build(world);
        let tax_rate = world.ledger.tax_rate;
        let settings = world.settings.clone();
        let disasters: Vec<Disaster> = world.disasters.values().cloned().collect();
        let ids: Vec<EntityId> = world.citizens.keys().copied().collect();
        for id in ids {
            let surroundings = {
                let Some(citizen) = world.citizens.get(&id) else {
                    continue;
                };
                let home = citizen
                    .home
                    .and_then(|home| world.buildings.get(&home))
                    .map(|b| (b.position, b.condition_factor()));
                Surroundings {
                    home,
                    workplace: citizen
                        .workplace
                        .and_then(|work| world.buildings.get(&work))
                        .map(|b| b.kind),
                    stress: disaster_stress(&disasters, home.map(|(pos, _)| pos)),
                }
            };
            let Some(citizen) = world.citizens.get_mut(&id) else {
                continue;
            };
            update_needs(citizen, &surroundings, &coverage, dt);
            update_finances(citizen, &surroundings, &settings, tax_rate, dt);
            update_education(citizen, dt);
            update_happiness(citizen, tax_rate, surroundings.stress, dt);
        }
        Ok(())
    }
}

fn need_target(
    citizen: &Citizen,
    kind: NeedKind,
    surroundings: &Surroundings,
    coverage: &CoverageMap,
) -> f64 {
    let site = surroundings.home.map(|(pos, _)| pos);
    let at_home = |layer: CoverageLayer| {
        site.map(|pos| coverage.level(layer, pos))
            .unwrap_or(ROAMING_COVERAGE)
    };
    match kind {
        NeedKind::Housing => surroundings
            .home
            .map(|(_, condition)| 40.0 + 60.0 * condition)
            .unwrap_or(0.0),
        NeedKind::Employment => {
            if !citizen.is_working_age() {
                80.0
            } else if surroundings.workplace.is_some() {
                100.0
            } else {
                0.0
            }
        }
        NeedKind::Shopping => at_home(CoverageLayer::Shopping),
        NeedKind::Healthcare => at_home(CoverageLayer::Healthcare),
        NeedKind::Education => {
            let covered = at_home(CoverageLayer::Education);
            if citizen.age_years < 25.0 {
                covered
            } else {
                50.0 + 0.5 * covered
            }
        }
        NeedKind::Recreation => {
            let greenery = site.map(|pos| coverage.greenery(pos)).unwrap_or(0.0);
            at_home(CoverageLayer::Recreation) + 0.2 * greenery
        }
        NeedKind::Safety => 30.0 + 0.7 * at_home(CoverageLayer::Safety),
        NeedKind::Environment => site
            .map(|pos| coverage.environment(pos))
            .unwrap_or(ROAMING_COVERAGE),
    }
}

fn update_needs(citizen: &mut Citizen, surroundings: &Surroundings, coverage: &CoverageMap, dt: f64) {
    let step = (NEED_ADJUST_RATE * dt).min(1.0);
    for kind in NeedKind::ALL {
        let target = clamp_level(need_target(citizen, kind, surroundings, coverage));
        let need = citizen.needs.get_mut(kind);
        *need = clamp_level(*need + (target - *need) * step);
    }
}

fn update_finances(
    citizen: &mut Citizen,
    surroundings: &Surroundings,
    settings: &CitySettings,
    tax_rate: f64,
    dt: f64,
) {
    if let Some(kind) = surroundings.workplace {
        let gross = daily_wage(settings, kind, citizen.education) * dt;
        citizen.wealth += gross * (1.0 - tax_rate);
    }
    // Children are provided for by their household.
    if citizen.age_years >= Citizen::WORKING_AGE.0 {
        let mut cost = settings.living_cost * (1.0 - 0.3 * citizen.traits.frugality) * dt;
        if surroundings.home.is_none() {
            cost *= 0.5;
        }
        citizen.wealth -= cost;
    }
    citizen.wealth = citizen.wealth.max(0.0);
}

fn update_education(citizen: &mut Citizen, dt: f64) {
    let schooling = citizen.needs.education / 100.0;
    let gain = if citizen.age_years < 25.0 {
        0.08 * schooling * (0.5 + citizen.traits.ambition)
    } else {
        0.005 * schooling * citizen.traits.ambition
    };
    citizen.education = clamp_level(citizen.education + gain * dt);
}

fn happiness_target(citizen: &Citizen, tax_rate: f64, stress: f64) -> f64 {
    let (weighted, total_weight) = NeedKind::ALL.iter().fold((0.0, 0.0), |(sum, weights), kind| {
        let weight = citizen.traits.need_weight(*kind).max(0.05);
        (sum + weight * citizen.needs.get(*kind), weights + weight)
    });
    let mut target = weighted / total_weight;
    target += 5.0 * citizen.wealth / (citizen.wealth + 2_000.0);
    target -= (tax_rate - TAX_TOLERANCE).max(0.0) * TAX_PENALTY_PER_POINT;
    if citizen.wealth <= 0.0 && citizen.is_working_age() && citizen.workplace.is_none() {
        target -= POVERTY_PENALTY;
    }
    target -= stress * (1.0 - 0.5 * citizen.traits.resilience);
    clamp_level(target)
}

fn update_happiness(citizen: &mut Citizen, tax_rate: f64, stress: f64, dt: f64) {
    let target = happiness_target(citizen, tax_rate, stress);
    let step = (HAPPINESS_ADJUST_RATE * dt).min(1.0);
    citizen.happiness = clamp_level(citizen.happiness + (target - citizen.happiness) * step);

    if citizen.happiness < UNHAPPY_THRESHOLD {
        citizen.unhappy_days += dt;
    } else {
        citizen.unhappy_days = 0.0;
    }
    if citizen.home.is_none() {
        citizen.homeless_days += dt;
    } else {
        citizen.homeless_days = 0.0;
    }
}
