use anyhow::Result;
use rand::{seq::SliceRandom, Rng};
use tracing::{info, warn};

use crate::{
    catalog::CoverageLayer,
    components::{clamp_level, DisasterKind, EventKind, MAX_LEVEL},
    coverage::CoverageMap,
    engine::{System, SystemContext},
    grid::{Position, Terrain},
    hazards::{self, SEVERITY_RANGE},
    rng::SystemRng,
    world::{EntityId, World},
};

const FIRE_PROTECTION_SHIELD: f64 = 0.7;
const HEALTHCARE_SHIELD: f64 = 0.6;
const RESILIENCE_SHIELD: f64 = 0.5;

/// Applies active disasters, retires finished ones and rolls for new ones.
pub struct DisasterSystem;

impl DisasterSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DisasterSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DisasterSystem {
    fn name(&self) -> &str {
        "disasters"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut SystemRng) -> Result<()> {
        if world.disasters.is_empty() && !world.settings.disasters.enabled {
            return Ok(());
        }
        let coverage = CoverageMap::build(world);
        apply_active(world, &coverage, rng, ctx.dt_days);
        retire_finished(world, ctx.tick);
        maybe_trigger(world, &coverage, rng, ctx.dt_days, ctx.tick);
        Ok(())
    }
}

fn apply_active(world: &mut World, coverage: &CoverageMap, rng: &mut SystemRng, dt: f64) {
    let active: Vec<EntityId> = world.disasters.keys().copied().collect();
    for id in active {
        let Some(disaster) = world.disasters.get(&id).cloned() else {
            continue;
        };
        let effects = &disaster.effects;

        for building in world.buildings.values_mut() {
            let intensity = disaster.intensity_at(building.position);
            if intensity <= 0.0 {
                continue;
            }
            let mut damage = effects.building_damage * intensity * dt;
            if disaster.kind == DisasterKind::Fire {
                let protection = coverage.level(CoverageLayer::FireProtection, building.position);
                damage *= 1.0 - FIRE_PROTECTION_SHIELD * protection / MAX_LEVEL;
            }
            building.condition = (building.condition - damage).max(0.0);
        }

        let mut casualties = Vec::new();
        for (citizen_id, citizen) in world.citizens.iter_mut() {
            let site = citizen
                .home
                .and_then(|home| world.buildings.get(&home))
                .map(|b| b.position);
            let intensity = match site {
                Some(pos) => disaster.intensity_at(pos),
                // Without a home only city-wide hazards can reach someone.
                None if hazards::profile(disaster.kind).city_wide => 1.0,
                None => 0.0,
            };
            if intensity <= 0.0 {
                continue;
            }
            let shock = 1.0 - RESILIENCE_SHIELD * citizen.traits.resilience;
            citizen.happiness = clamp_level(citizen.happiness - effects.happiness * intensity * dt * shock);
            citizen.needs.safety = clamp_level(citizen.needs.safety - effects.safety * intensity * dt);
            citizen.needs.healthcare = clamp_level(citizen.needs.healthcare - effects.health * intensity * dt);

            let care = site
                .map(|pos| coverage.level(CoverageLayer::Healthcare, pos))
                .unwrap_or(0.0);
            let chance = effects.mortality * dt * intensity * (1.0 - HEALTHCARE_SHIELD * care / MAX_LEVEL);
            if rng.chance(chance) {
                casualties.push(*citizen_id);
            }
        }
        for citizen_id in casualties {
            world.remove_citizen(citizen_id);
            world.stats.deaths += 1;
        }

        if let Some(disaster) = world.disasters.get_mut(&id) {
            disaster.elapsed_days += dt;
        }
    }
}

fn retire_finished(world: &mut World, tick: u64) {
    let finished: Vec<EntityId> = world
        .disasters
        .iter()
        .filter(|(_, disaster)| disaster.is_expired())
        .map(|(id, _)| *id)
        .collect();
    for id in finished {
        let Some(disaster) = world.disasters.remove(&id) else {
            continue;
        };
        world.stats.disasters_survived += 1;
        world.push_event(
            EventKind::DisasterEnded,
            format!("The {} has passed", disaster.kind.label()),
        );
        info!(target: "civitas::disasters", tick, kind = disaster.kind.label(), "disaster.ended");
    }
}

/// Multiplier on a hazard's base odds given the current state of the city.
pub fn risk_modifier(world: &World, coverage: &CoverageMap, kind: DisasterKind) -> f64 {
    match kind {
        DisasterKind::Flood => {
            if world.grid.has_water() {
                1.0
            } else {
                0.0
            }
        }
        DisasterKind::Fire => {
            if world.buildings.is_empty() {
                return 0.0;
            }
            let protection = world
                .buildings
                .values()
                .map(|b| coverage.level(CoverageLayer::FireProtection, b.position))
                .sum::<f64>()
                / world.buildings.len() as f64;
            1.0 - 0.5 * protection / MAX_LEVEL
        }
        DisasterKind::Epidemic => {
            let population = world.total_population() as f64;
            let health = if population > 0.0 {
                world.citizens.values().map(|c| c.needs.healthcare).sum::<f64>() / population
            } else {
                MAX_LEVEL
            };
            let crowding = (0.5 + population / 500.0).min(2.0);
            crowding * (1.3 - 0.8 * health / MAX_LEVEL).max(0.2)
        }
        DisasterKind::Earthquake | DisasterKind::Tornado => 1.0,
    }
}

fn maybe_trigger(world: &mut World, coverage: &CoverageMap, rng: &mut SystemRng, dt: f64, tick: u64) {
    let settings = world.settings.disasters.clone();
    if !settings.enabled
        || world.days_elapsed() < settings.grace_days
        || world.total_population() < settings.min_population
    {
        return;
    }
    for profile in hazards::profiles() {
        if world.active_disaster_count() >= settings.max_active {
            break;
        }
        if world.disasters.values().any(|d| d.kind == profile.kind) {
            continue;
        }
        let chance = profile.annual_probability / 365.0
            * dt
            * settings.frequency
            * risk_modifier(world, coverage, profile.kind);
        if !rng.chance(chance) {
            continue;
        }
        let Some(epicenter) = pick_epicenter(world, profile.kind, rng) else {
            continue;
        };
        let severity = rng.gen_range(SEVERITY_RANGE.0..=SEVERITY_RANGE.1);
        let duration = span(rng, profile.duration_days);
        let radius = span(rng, profile.radius);
        let id = world.start_disaster(profile.kind, epicenter, severity, duration, radius);
        warn!(
            target: "civitas::disasters",
            tick,
            id = %id,
            kind = profile.kind.label(),
            severity,
            x = epicenter.x,
            y = epicenter.y,
            "disaster.started"
        );
    }
}

fn span(rng: &mut SystemRng, (low, high): (f64, f64)) -> f64 {
    if high > low {
        rng.gen_range(low..=high)
    } else {
        low
    }
}

fn random_tile(world: &World, rng: &mut SystemRng) -> Option<Position> {
    let (width, height) = (world.grid.width() as i32, world.grid.height() as i32);
    if width == 0 || height == 0 {
        return None;
    }
    Some(Position::new(rng.gen_range(0..width), rng.gen_range(0..height)))
}

fn pick_epicenter(world: &World, kind: DisasterKind, rng: &mut SystemRng) -> Option<Position> {
    match kind {
        DisasterKind::Fire => {
            let sites: Vec<Position> = world.buildings.values().map(|b| b.position).collect();
            sites.choose(rng).copied().or_else(|| random_tile(world, rng))
        }
        DisasterKind::Flood => world.grid.tiles_of(Terrain::Water).choose(rng).copied(),
        DisasterKind::Earthquake | DisasterKind::Tornado => random_tile(world, rng),
        DisasterKind::Epidemic => Some(Position::new(
            world.grid.width() as i32 / 2,
            world.grid.height() as i32 / 2,
        )),
    }
}
