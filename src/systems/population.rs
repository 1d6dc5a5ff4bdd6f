use std::collections::BTreeMap;

use anyhow::Result;
use rand::{seq::SliceRandom, Rng};
use tracing::debug;

use crate::{
    components::{Citizen, Needs, Personality},
    engine::{System, SystemContext},
    rng::SystemRng,
    world::{EntityId, Occupancy, World},
};

const FIRST_NAMES: &[&str] = &[
    "Ada", "Bram", "Cleo", "Dario", "Edda", "Felix", "Greta", "Hugo", "Ines", "Jonas", "Kira",
    "Luca", "Mira", "Nils", "Olga", "Pavel", "Rosa", "Soren", "Tess", "Uma",
];

const LAST_NAMES: &[&str] = &[
    "Abbott", "Brandt", "Castillo", "Dvorak", "Eriksen", "Fontaine", "Gallo", "Hale", "Ivers",
    "Janssen", "Kowal", "Lindqvist", "Moreau", "Novak", "Okafor", "Petrov", "Quinn", "Reyes",
];

const MAX_AGE_YEARS: f64 = 110.0;
const FERTILE_AGES: (f64, f64) = (20.0, 40.0);
const ANNUAL_BIRTH_CHANCE: f64 = 0.06;
const EMIGRATION_UNHAPPY_DAYS: f64 = 30.0;
const EMIGRATION_DAILY_CHANCE: f64 = 0.1;
const EMIGRATION_HOMELESS_DAYS: f64 = 21.0;
const IMMIGRATION_MIN_HAPPINESS: f64 = 40.0;
const EMPTY_CITY_HAPPINESS: f64 = 60.0;

/// Annual probability of death at `age`, before healthcare is taken into account.
pub fn annual_mortality(age: f64) -> f64 {
    let infant = if age < 1.0 { 0.004 } else { 0.0 };
    let senior = (age - 50.0).max(0.0);
    (0.002 + infant + 0.000_25 * senior * senior).min(1.0)
}

/// A fresh adult arriving in (or seeding) the city.
pub fn generate_citizen<R: Rng + ?Sized>(rng: &mut R, age_range: (f64, f64)) -> Citizen {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Smith");
    Citizen {
        name: format!("{first} {last}"),
        age_years: rng.gen_range(age_range.0..=age_range.1),
        education: rng.gen_range(20.0..=80.0),
        happiness: 60.0,
        wealth: rng.gen_range(200.0..=2_000.0),
        needs: Needs::default(),
        traits: Personality {
            ambition: rng.gen(),
            sociability: rng.gen(),
            frugality: rng.gen(),
            resilience: rng.gen(),
        },
        home: None,
        workplace: None,
        unhappy_days: 0.0,
        homeless_days: 0.0,
    }
}

fn newborn<R: Rng + ?Sized>(rng: &mut R, parent: &Citizen) -> Citizen {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
    let family = parent.name.rsplit(' ').next().unwrap_or("Smith");
    Citizen {
        name: format!("{first} {family}"),
        age_years: 0.0,
        education: 0.0,
        happiness: parent.happiness,
        wealth: 0.0,
        needs: parent.needs.clone(),
        traits: Personality {
            ambition: rng.gen(),
            sociability: rng.gen(),
            frugality: rng.gen(),
            resilience: rng.gen(),
        },
        home: parent.home,
        workplace: None,
        unhappy_days: 0.0,
        homeless_days: 0.0,
    }
}

pub struct PopulationSystem;

impl PopulationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PopulationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PopulationSystem {
    fn name(&self) -> &str {
        "population"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut SystemRng) -> Result<()> {
        let dt = ctx.dt_days;
        age_and_bury(world, rng, dt);
        release_stale_references(world);
        emigrate(world, rng, dt);

        let mut occupancy = world.occupancy();
        births(world, rng, dt, &mut occupancy);
        immigrate(world, rng, dt);
        assign_homes(world, &mut occupancy);
        assign_jobs(world, &mut occupancy);
        debug!(
            target: "civitas::population",
            tick = ctx.tick,
            population = world.total_population(),
            homeless = world.homeless_count(),
            unemployment = world.unemployment_rate(),
            "population.updated"
        );
        Ok(())
    }
}

fn age_and_bury(world: &mut World, rng: &mut SystemRng, dt: f64) {
    let dt_years = dt / 365.0;
    let mut deceased = Vec::new();
    for (id, citizen) in world.citizens.iter_mut() {
        citizen.age_years += dt_years;
        let care = 1.4 - 0.8 * citizen.needs.healthcare / 100.0;
        let chance = annual_mortality(citizen.age_years) * care * dt_years;
        if citizen.age_years >= MAX_AGE_YEARS || rng.chance(chance) {
            deceased.push(*id);
        }
    }
    for id in deceased {
        world.remove_citizen(id);
        world.stats.deaths += 1;
    }
}

fn release_stale_references(world: &mut World) {
    let buildings = &world.buildings;
    for citizen in world.citizens.values_mut() {
        if citizen.home.is_some_and(|home| !buildings.contains_key(&home)) {
            citizen.home = None;
        }
        let keeps_job = citizen.is_working_age()
            && citizen
                .workplace
                .is_some_and(|work| buildings.contains_key(&work));
        if !keeps_job {
            citizen.workplace = None;
        }
    }
}

fn emigrate(world: &mut World, rng: &mut SystemRng, dt: f64) {
    let chance = (EMIGRATION_DAILY_CHANCE * dt).min(1.0);
    let mut leaving = Vec::new();
    for (id, citizen) in world.citizens.iter() {
        let fed_up = citizen.unhappy_days >= EMIGRATION_UNHAPPY_DAYS && rng.chance(chance);
        let adult = citizen.age_years >= Citizen::WORKING_AGE.0;
        if fed_up || (adult && citizen.homeless_days >= EMIGRATION_HOMELESS_DAYS) {
            leaving.push(*id);
        }
    }
    for id in leaving {
        world.remove_citizen(id);
        world.stats.emigrants += 1;
    }
}

fn births(world: &mut World, rng: &mut SystemRng, dt: f64, occupancy: &mut BTreeMap<EntityId, Occupancy>) {
    let dt_years = dt / 365.0;
    let mut babies = Vec::new();
    for citizen in world.citizens.values() {
        if citizen.age_years < FERTILE_AGES.0 || citizen.age_years >= FERTILE_AGES.1 {
            continue;
        }
        let Some(home) = citizen.home else {
            continue;
        };
        let capacity = world
            .buildings
            .get(&home)
            .map(|b| b.kind.spec().residents)
            .unwrap_or(0);
        let Some(entry) = occupancy.get_mut(&home) else {
            continue;
        };
        if entry.residents >= capacity {
            continue;
        }
        let chance = ANNUAL_BIRTH_CHANCE * (citizen.happiness / 100.0) * dt_years;
        if rng.chance(chance) {
            entry.residents += 1;
            babies.push(newborn(rng, citizen));
        }
    }
    for baby in babies {
        world.spawn_citizen(baby);
        world.stats.births += 1;
    }
}

/// How appealing the city looks from outside, 0..=1.
pub fn attractiveness(world: &World) -> f64 {
    let happiness = if world.total_population() == 0 {
        EMPTY_CITY_HAPPINESS
    } else {
        world.average_happiness()
    };
    if happiness < IMMIGRATION_MIN_HAPPINESS {
        return 0.0;
    }
    let mood = ((happiness - IMMIGRATION_MIN_HAPPINESS) / (100.0 - IMMIGRATION_MIN_HAPPINESS)).clamp(0.0, 1.0);
    let demand = (world.ledger.demand.residential / 2.0).clamp(0.0, 1.0);
    let jobs = if world.free_jobs() > 0 { 1.0 } else { 0.5 };
    mood * (0.5 + 0.5 * demand) * jobs
}

fn immigrate(world: &mut World, rng: &mut SystemRng, dt: f64) {
    // Homeless residents are housed before any newcomer.
    let free_housing = world.free_housing().saturating_sub(world.homeless_count());
    if free_housing == 0 {
        return;
    }
    let expected =
        world.settings.immigration_rate * free_housing as f64 * attractiveness(world) * dt;
    let arrivals = rng.occurrences(expected).min(free_housing);
    for _ in 0..arrivals {
        let citizen = generate_citizen(rng, (18.0, 45.0));
        world.spawn_citizen(citizen);
        world.stats.immigrants += 1;
    }
}

fn assign_homes(world: &mut World, occupancy: &mut BTreeMap<EntityId, Occupancy>) {
    let mut vacancies: Vec<(EntityId, u32)> = world
        .buildings
        .iter()
        .filter(|(_, b)| b.kind.is_residential())
        .filter_map(|(id, b)| {
            let used = occupancy.get(id).map(|o| o.residents).unwrap_or(0);
            let free = b.kind.spec().residents.saturating_sub(used);
            (free > 0).then_some((*id, free))
        })
        .collect();
    // Best-kept housing fills first.
    let condition = |id: &EntityId| world.buildings.get(id).map(|b| b.condition).unwrap_or(0.0);
    vacancies.sort_by(|a, b| condition(&b.0).total_cmp(&condition(&a.0)).then(a.0.cmp(&b.0)));

    let mut slots = vacancies.into_iter().flat_map(|(id, free)| std::iter::repeat(id).take(free as usize));
    for citizen in world.citizens.values_mut() {
        if citizen.home.is_some() {
            continue;
        }
        let Some(home) = slots.next() else {
            break;
        };
        citizen.home = Some(home);
        citizen.homeless_days = 0.0;
        if let Some(entry) = occupancy.get_mut(&home) {
            entry.residents += 1;
        }
    }
}

fn assign_jobs(world: &mut World, occupancy: &mut BTreeMap<EntityId, Occupancy>) {
    let mut openings: Vec<(EntityId, f64, f64, u32)> = world
        .buildings
        .iter()
        .filter(|(_, b)| b.kind.is_workplace())
        .filter_map(|(id, b)| {
            let spec = b.kind.spec();
            let used = occupancy.get(id).map(|o| o.workers).unwrap_or(0);
            let free = spec.jobs.saturating_sub(used);
            (free > 0).then_some((*id, spec.wage_factor, spec.min_education, free))
        })
        .collect();
    // Best-paying openings are offered first.
    openings.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    for citizen in world.citizens.values_mut() {
        if citizen.workplace.is_some() || !citizen.is_working_age() {
            continue;
        }
        let Some(opening) = openings
            .iter_mut()
            .find(|(_, _, min_education, free)| *free > 0 && citizen.education >= *min_education)
        else {
            continue;
        };
        opening.3 -= 1;
        citizen.workplace = Some(opening.0);
        if let Some(entry) = occupancy.get_mut(&opening.0) {
            entry.workers += 1;
        }
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
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world() -> World {
        World::new(CityGrid::flat(16, 16), EconomyLedger::new(0.0, 0.1), 1.0)
    }

    fn resident(age: f64, happiness: f64) -> Citizen {
        let mut rng = ChaCha8Rng::seed_from_u64(age.to_bits());
        let mut citizen = generate_citizen(&mut rng, (30.0, 30.0));
        citizen.age_years = age;
        citizen.happiness = happiness;
        citizen
    }

    fn stream() -> SystemRng {
        RngManager::new(8).stream("population", 0)
    }

    #[test]
    fn mortality_rises_with_age() {
        assert!(annual_mortality(30.0) < annual_mortality(70.0));
        assert!(annual_mortality(70.0) < annual_mortality(90.0));
        assert!(annual_mortality(0.5) > annual_mortality(10.0));
        assert!(annual_mortality(200.0) <= 1.0);
    }

    #[test]
    fn generated_citizens_are_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..100 {
            let citizen = generate_citizen(&mut rng, (18.0, 45.0));
            assert!((18.0..=45.0).contains(&citizen.age_years));
            assert!((20.0..=80.0).contains(&citizen.education));
            assert!(citizen.home.is_none() && citizen.workplace.is_none());
            assert_eq!(citizen.name.split(' ').count(), 2);
        }
    }

    #[test]
    fn newborns_keep_the_family_name() {
        let mut rng = RngManager::new(3).stream("population", 0);
        let mut parent_rng = ChaCha8Rng::seed_from_u64(9);
        let parent = generate_citizen(&mut parent_rng, (25.0, 30.0));
        let baby = newborn(&mut rng, &parent);
        assert_eq!(baby.name.rsplit(' ').next(), parent.name.rsplit(' ').next());
        assert_eq!(baby.age_years, 0.0);
        assert_eq!(baby.home, parent.home);
    }

    #[test]
    fn a_long_unhappy_streak_drives_people_away() {
        let mut world = world();
        let mut fed_up = resident(30.0, 10.0);
        fed_up.unhappy_days = 30.0;
        let fed_up = world.spawn_citizen(fed_up);
        let mut grumbling = resident(30.0, 10.0);
        grumbling.unhappy_days = 29.0;
        let grumbling = world.spawn_citizen(grumbling);

        // A ten-day step makes the daily departure chance certain.
        emigrate(&mut world, &mut stream(), 10.0);
        assert!(world.citizen(fed_up).is_none());
        assert!(world.citizen(grumbling).is_some());
        assert_eq!(world.stats.emigrants, 1);
    }

    #[test]
    fn homeless_adults_leave_after_three_weeks() {
        let mut world = world();
        let mut adult = resident(30.0, 70.0);
        adult.homeless_days = 21.0;
        let adult = world.spawn_citizen(adult);
        let mut newcomer = resident(30.0, 70.0);
        newcomer.homeless_days = 20.0;
        let newcomer = world.spawn_citizen(newcomer);
        let mut child = resident(10.0, 70.0);
        child.homeless_days = 40.0;
        let child = world.spawn_citizen(child);

        emigrate(&mut world, &mut stream(), 1.0);
        assert!(world.citizen(adult).is_none());
        assert!(world.citizen(newcomer).is_some());
        assert!(world.citizen(child).is_some());
    }

    #[test]
    fn only_fertile_residents_with_room_have_children() {
        let mut world = world();
        let roomy = world.spawn_building(Building::new(BuildingKind::House, Position::new(1, 1), 0.0));
        let crowded = world.spawn_building(Building::new(BuildingKind::House, Position::new(3, 1), 0.0));
        for (age, home) in [(30.0, roomy), (45.0, roomy), (15.0, roomy)] {
            let mut citizen = resident(age, 100.0);
            citizen.home = Some(home);
            world.spawn_citizen(citizen);
        }
        for _ in 0..3 {
            let mut citizen = resident(25.0, 100.0);
            citizen.home = Some(crowded);
            world.spawn_citizen(citizen);
        }

        // Over a century every eligible parent would have a child.
        let mut occupancy = world.occupancy();
        births(&mut world, &mut stream(), 36_500.0, &mut occupancy);

        assert_eq!(world.stats.births, 2);
        let occupancy = world.occupancy();
        assert_eq!(occupancy[&roomy].residents, 4);
        assert_eq!(occupancy[&crowded].residents, 4);
        let babies = world.citizens().filter(|(_, c)| c.age_years == 0.0).count();
        assert_eq!(babies, 2);
    }

    #[test]
    fn retirees_leave_their_jobs() {
        let mut world = world();
        let shop = world.spawn_building(Building::new(BuildingKind::Shop, Position::new(2, 2), 0.0));
        let mut worker = resident(40.0, 60.0);
        worker.workplace = Some(shop);
        let worker = world.spawn_citizen(worker);
        let mut retiree = resident(66.0, 60.0);
        retiree.workplace = Some(shop);
        let retiree = world.spawn_citizen(retiree);

        release_stale_references(&mut world);
        assert_eq!(world.citizen(worker).and_then(|c| c.workplace), Some(shop));
        assert_eq!(world.citizen(retiree).and_then(|c| c.workplace), None);
    }

    #[test]
    fn gloomy_cities_attract_nobody() {
        let mut world = world();
        world.spawn_building(Building::new(BuildingKind::Shop, Position::new(2, 2), 0.0));
        world.spawn_building(Building::new(BuildingKind::Apartment, Position::new(4, 4), 0.0));
        world.settings.immigration_rate = 100.0;
        let gloomy = world.spawn_citizen(resident(30.0, 35.0));
        assert_eq!(attractiveness(&world), 0.0);

        immigrate(&mut world, &mut stream(), 1.0);
        assert_eq!(world.total_population(), 1);

        world.remove_citizen(gloomy);
        world.spawn_citizen(resident(30.0, 80.0));
        assert!(attractiveness(&world) > 0.0);
    }

    #[test]
    fn homeless_residents_are_housed_before_newcomers() {
        let mut world = world();
        world.spawn_building(Building::new(BuildingKind::Shop, Position::new(2, 2), 0.0));
        world.spawn_building(Building::new(BuildingKind::House, Position::new(4, 4), 0.0));
        world.settings.immigration_rate = 100.0;
        for _ in 0..4 {
            world.spawn_citizen(resident(30.0, 90.0));
        }

        immigrate(&mut world, &mut stream(), 1.0);
        assert_eq!(world.total_population(), 4);

        world.citizens.pop_first();
        world.citizens.pop_first();
        immigrate(&mut world, &mut stream(), 1.0);
        assert_eq!(world.total_population(), 4);
        assert_eq!(world.stats.immigrants, 2);

        let mut occupancy = world.occupancy();
        assign_homes(&mut world, &mut occupancy);
        assert_eq!(world.homeless_count(), 0);
    }
}
