use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    achievements,
    actions::ScheduledAction,
    catalog::BuildingKind,
    components::{
        AchievementState, Building, Citizen, CityEvent, CityStats, Disaster, DisasterKind,
        EconomyLedger, EventKind, MarketDemand, MonthlyReport,
    },
    grid::{CityGrid, Position},
    hazards,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn default_frequency() -> f64 {
    1.0
}

fn default_grace_days() -> f64 {
    90.0
}

fn default_max_active() -> usize {
    2
}

fn default_min_population() -> u64 {
    20
}

fn default_immigration_rate() -> f64 {
    0.04
}

fn default_base_wage() -> f64 {
    30.0
}

fn default_living_cost() -> f64 {
    18.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    #[serde(default = "default_grace_days")]
    pub grace_days: f64,
    #[serde(default = "default_max_active")]
    pub max_active: usize,
    #[serde(default = "default_min_population")]
    pub min_population: u64,
}

impl Default for DisasterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: default_frequency(),
            grace_days: default_grace_days(),
            max_active: default_max_active(),
            min_population: default_min_population(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySettings {
    #[serde(default)]
    pub disasters: DisasterSettings,
    /// Share of free housing filled per day by a perfectly attractive city.
    #[serde(default = "default_immigration_rate")]
    pub immigration_rate: f64,
    #[serde(default = "default_base_wage")]
    pub base_wage: f64,
    #[serde(default = "default_living_cost")]
    pub living_cost: f64,
}

impl Default for CitySettings {
    fn default() -> Self {
        Self {
            disasters: DisasterSettings::default(),
            immigration_rate: default_immigration_rate(),
            base_wage: default_base_wage(),
            living_cost: default_living_cost(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub residents: u32,
    pub workers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSnapshot {
    pub id: u64,
    pub kind: BuildingKind,
    pub x: i32,
    pub y: i32,
    pub condition: f64,
    pub residents: u32,
    pub workers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterSnapshot {
    pub id: u64,
    pub kind: DisasterKind,
    pub severity: f64,
    pub x: i32,
    pub y: i32,
    pub radius: f64,
    pub remaining_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub days_elapsed: f64,
    pub month: u64,
    pub population: u64,
    pub employed: u64,
    pub unemployment_rate: f64,
    pub homeless: u64,
    pub average_happiness: f64,
    pub average_education: f64,
    pub money: f64,
    pub tax_rate: f64,
    pub demand: MarketDemand,
    pub last_month: Option<MonthlyReport>,
    pub stats: CityStats,
    pub achievements_unlocked: Vec<String>,
    pub buildings: Vec<BuildingSnapshot>,
    pub disasters: Vec<DisasterSnapshot>,
    pub recent_events: Vec<CityEvent>,
}

/// The whole city. Systems mutate it; save games serialize it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    next_entity: u64,
    tick: u64,
    days_elapsed: f64,
    dt_days: f64,
    pub(crate) grid: CityGrid,
    pub(crate) citizens: BTreeMap<EntityId, Citizen>,
    pub(crate) buildings: BTreeMap<EntityId, Building>,
    #[serde(default)]
    pub(crate) disasters: BTreeMap<EntityId, Disaster>,
    pub(crate) ledger: EconomyLedger,
    #[serde(default)]
    pub(crate) achievements: Vec<AchievementState>,
    #[serde(default)]
    pub(crate) stats: CityStats,
    #[serde(default)]
    pub(crate) events: VecDeque<CityEvent>,
    #[serde(default)]
    pub(crate) pending_actions: Vec<ScheduledAction>,
    #[serde(default)]
    pub(crate) settings: CitySettings,
}

impl World {
    pub const EVENT_LOG_CAPACITY: usize = 256;

    pub fn new(grid: CityGrid, ledger: EconomyLedger, dt_days: f64) -> Self {
        Self {
            next_entity: 0,
            tick: 0,
            days_elapsed: 0.0,
            dt_days,
            grid,
            citizens: BTreeMap::new(),
            buildings: BTreeMap::new(),
            disasters: BTreeMap::new(),
            ledger,
            achievements: achievements::initial_states(),
            stats: CityStats::default(),
            events: VecDeque::new(),
            pending_actions: Vec::new(),
            settings: CitySettings::default(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn dt_days(&self) -> f64 {
        self.dt_days
    }

    pub fn advance_time(&mut self) {
        self.tick += 1;
        self.days_elapsed += self.dt_days;
    }

    pub fn days_elapsed(&self) -> f64 {
        self.days_elapsed
    }

    pub fn grid(&self) -> &CityGrid {
        &self.grid
    }

    pub fn ledger(&self) -> &EconomyLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut EconomyLedger {
        &mut self.ledger
    }

    pub fn settings(&self) -> &CitySettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut CitySettings {
        &mut self.settings
    }

    pub fn stats(&self) -> &CityStats {
        &self.stats
    }

    pub fn achievements(&self) -> &[AchievementState] {
        &self.achievements
    }

    pub fn is_unlocked(&self, achievement_id: &str) -> bool {
        self.achievements
            .iter()
            .any(|state| state.id == achievement_id && state.unlocked)
    }

    pub fn events(&self) -> impl Iterator<Item = &CityEvent> {
        self.events.iter()
    }

    pub fn spawn_citizen(&mut self, citizen: Citizen) -> EntityId {
        let id = self.allocate();
        self.citizens.insert(id, citizen);
        id
    }

    pub fn remove_citizen(&mut self, id: EntityId) -> Option<Citizen> {
        self.citizens.remove(&id)
    }

    /// Adds a building without charging for it. City actions go through
    /// [`World::place_building`] instead.
    pub fn spawn_building(&mut self, building: Building) -> EntityId {
        let id = self.allocate();
        self.buildings.insert(id, building);
        id
    }

    /// Removes a building and clears every home/workplace reference to it.
    pub fn remove_building(&mut self, id: EntityId) -> Option<Building> {
        let removed = self.buildings.remove(&id)?;
        for citizen in self.citizens.values_mut() {
            if citizen.home == Some(id) {
                citizen.home = None;
            }
            if citizen.workplace == Some(id) {
                citizen.workplace = None;
            }
        }
        Some(removed)
    }

    pub fn citizen(&self, id: EntityId) -> Option<&Citizen> {
        self.citizens.get(&id)
    }

    pub fn citizen_mut(&mut self, id: EntityId) -> Option<&mut Citizen> {
        self.citizens.get_mut(&id)
    }

    pub fn citizen_ids(&self) -> Vec<EntityId> {
        self.citizens.keys().copied().collect()
    }

    pub fn citizens(&self) -> impl Iterator<Item = (EntityId, &Citizen)> {
        self.citizens.iter().map(|(id, citizen)| (*id, citizen))
    }

    pub fn building(&self, id: EntityId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    pub fn building_mut(&mut self, id: EntityId) -> Option<&mut Building> {
        self.buildings.get_mut(&id)
    }

    pub fn building_ids(&self) -> Vec<EntityId> {
        self.buildings.keys().copied().collect()
    }

    pub fn buildings(&self) -> impl Iterator<Item = (EntityId, &Building)> {
        self.buildings.iter().map(|(id, building)| (*id, building))
    }

    pub fn building_at(&self, pos: Position) -> Option<EntityId> {
        self.buildings
            .iter()
            .find(|(_, building)| building.position == pos)
            .map(|(id, _)| *id)
    }

    pub fn disaster(&self, id: EntityId) -> Option<&Disaster> {
        self.disasters.get(&id)
    }

    pub fn disasters(&self) -> impl Iterator<Item = (EntityId, &Disaster)> {
        self.disasters.iter().map(|(id, disaster)| (*id, disaster))
    }

    pub fn active_disaster_count(&self) -> usize {
        self.disasters.len()
    }

    /// Starts a disaster with explicit parameters; effects come from its hazard profile.
    pub fn start_disaster(
        &mut self,
        kind: DisasterKind,
        epicenter: Position,
        severity: f64,
        duration_days: f64,
        radius: f64,
    ) -> EntityId {
        let profile = hazards::profile(kind);
        let severity = severity.clamp(0.0, 1.0);
        let radius = if profile.city_wide {
            self.grid.max_dimension() as f64 * 2.0
        } else {
            radius.max(0.0)
        };
        let disaster = Disaster {
            kind,
            severity,
            epicenter,
            radius,
            started_day: self.days_elapsed,
            duration_days: duration_days.max(0.0),
            elapsed_days: 0.0,
            effects: profile.effects(severity),
        };
        let id = self.allocate();
        self.disasters.insert(id, disaster);
        self.stats.disasters_started += 1;
        self.push_event(
            EventKind::DisasterStarted,
            format!(
                "A {} struck near ({}, {}) with severity {:.0}%",
                kind.label(),
                epicenter.x,
                epicenter.y,
                severity * 100.0
            ),
        );
        id
    }

    pub fn push_event(&mut self, kind: EventKind, message: impl Into<String>) {
        self.events.push_back(CityEvent {
            tick: self.tick,
            day: self.days_elapsed,
            kind,
            message: message.into(),
        });
        while self.events.len() > Self::EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
    }

    pub fn total_population(&self) -> u64 {
        self.citizens.len() as u64
    }

    pub fn employed_count(&self) -> u64 {
        self.citizens.values().filter(|c| c.is_employed()).count() as u64
    }

    pub fn homeless_count(&self) -> u64 {
        self.citizens.values().filter(|c| c.home.is_none()).count() as u64
    }

    /// Share of working-age citizens without a job.
    pub fn unemployment_rate(&self) -> f64 {
        let (workforce, unemployed) = self
            .citizens
            .values()
            .filter(|c| c.is_working_age())
            .fold((0u64, 0u64), |(workforce, unemployed), c| {
                (workforce + 1, unemployed + u64::from(!c.is_employed()))
            });
        if workforce == 0 {
            0.0
        } else {
            unemployed as f64 / workforce as f64
        }
    }

    pub fn average_happiness(&self) -> f64 {
        self.average_of(|c| c.happiness)
    }

    pub fn average_education(&self) -> f64 {
        self.average_of(|c| c.education)
    }

    fn average_of(&self, field: impl Fn(&Citizen) -> f64) -> f64 {
        if self.citizens.is_empty() {
            return 0.0;
        }
        self.citizens.values().map(field).sum::<f64>() / self.citizens.len() as f64
    }

    pub fn occupancy(&self) -> BTreeMap<EntityId, Occupancy> {
        let mut occupancy: BTreeMap<EntityId, Occupancy> = self
            .buildings
            .keys()
            .map(|id| (*id, Occupancy::default()))
            .collect();
        for citizen in self.citizens.values() {
            if let Some(entry) = citizen.home.and_then(|home| occupancy.get_mut(&home)) {
                entry.residents += 1;
            }
            if let Some(entry) = citizen.workplace.and_then(|work| occupancy.get_mut(&work)) {
                entry.workers += 1;
            }
        }
        occupancy
    }

    pub fn housing_capacity(&self) -> u64 {
        self.buildings
            .values()
            .map(|b| b.kind.spec().residents as u64)
            .sum()
    }

    pub fn job_capacity(&self) -> u64 {
        self.buildings
            .values()
            .map(|b| b.kind.spec().jobs as u64)
            .sum()
    }

    pub fn free_housing(&self) -> u64 {
        let housed = self.citizens.values().filter(|c| c.home.is_some()).count() as u64;
        self.housing_capacity().saturating_sub(housed)
    }

    pub fn free_jobs(&self) -> u64 {
        self.job_capacity().saturating_sub(self.employed_count())
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        let occupancy = self.occupancy();
        let buildings = self
            .buildings
            .iter()
            .map(|(id, building)| {
                let occ = occupancy.get(id).copied().unwrap_or_default();
                BuildingSnapshot {
                    id: id.raw(),
                    kind: building.kind,
                    x: building.position.x,
                    y: building.position.y,
                    condition: building.condition,
                    residents: occ.residents,
                    workers: occ.workers,
                }
            })
            .collect();
        let disasters = self
            .disasters
            .iter()
            .map(|(id, disaster)| DisasterSnapshot {
                id: id.raw(),
                kind: disaster.kind,
                severity: disaster.severity,
                x: disaster.epicenter.x,
                y: disaster.epicenter.y,
                radius: disaster.radius,
                remaining_days: (disaster.duration_days - disaster.elapsed_days).max(0.0),
            })
            .collect();
        let skip = self.events.len().saturating_sub(10);
        WorldSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            days_elapsed: self.days_elapsed,
            month: self.ledger.months_elapsed,
            population: self.total_population(),
            employed: self.employed_count(),
            unemployment_rate: self.unemployment_rate(),
            homeless: self.homeless_count(),
            average_happiness: self.average_happiness(),
            average_education: self.average_education(),
            money: self.ledger.money,
            tax_rate: self.ledger.tax_rate,
            demand: self.ledger.demand.clone(),
            last_month: self.ledger.last_report().cloned(),
            stats: self.stats.clone(),
            achievements_unlocked: self
                .achievements
                .iter()
                .filter(|state| state.unlocked)
                .map(|state| state.id.clone())
                .collect(),
            buildings,
            disasters,
            recent_events: self.events.iter().skip(skip).cloned().collect(),
        }
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Needs, Personality};

    fn citizen(age: f64) -> Citizen {
        Citizen {
            name: "Test".into(),
            age_years: age,
            education: 40.0,
            happiness: 60.0,
            wealth: 100.0,
            needs: Needs::default(),
            traits: Personality::default(),
            home: None,
            workplace: None,
            unhappy_days: 0.0,
            homeless_days: 0.0,
        }
    }

    fn world() -> World {
        World::new(CityGrid::flat(16, 16), EconomyLedger::new(10_000.0, 0.1), 1.0)
    }

    #[test]
    fn removing_a_building_releases_references() {
        let mut world = world();
        let house = world.spawn_building(Building::new(BuildingKind::House, Position::new(1, 1), 0.0));
        let shop = world.spawn_building(Building::new(BuildingKind::Shop, Position::new(2, 1), 0.0));
        let id = world.spawn_citizen(citizen(30.0));
        {
            let c = world.citizen_mut(id).unwrap();
            c.home = Some(house);
            c.workplace = Some(shop);
        }
        assert_eq!(world.occupancy()[&house].residents, 1);
        world.remove_building(house);
        assert_eq!(world.citizen(id).unwrap().home, None);
        assert_eq!(world.citizen(id).unwrap().workplace, Some(shop));
        assert_eq!(world.homeless_count(), 1);
    }

    #[test]
    fn unemployment_counts_only_working_age() {
        let mut world = world();
        world.spawn_citizen(citizen(8.0));
        world.spawn_citizen(citizen(80.0));
        world.spawn_citizen(citizen(30.0));
        assert_eq!(world.unemployment_rate(), 1.0);
        let empty = self::world();
        assert_eq!(empty.unemployment_rate(), 0.0);
    }

    #[test]
    fn event_log_is_bounded() {
        let mut world = world();
        for i in 0..(World::EVENT_LOG_CAPACITY + 10) {
            world.push_event(EventKind::MonthClosed, format!("event {i}"));
        }
        assert_eq!(world.events().count(), World::EVENT_LOG_CAPACITY);
        assert_eq!(world.events().next().unwrap().message, "event 10");
    }

    #[test]
    fn epidemics_cover_the_whole_city() {
        let mut world = world();
        let id = world.start_disaster(DisasterKind::Epidemic, Position::new(0, 0), 0.5, 10.0, 1.0);
        let disaster = world.disaster(id).unwrap();
        assert!(disaster.covers(Position::new(15, 15)));
        assert_eq!(world.stats().disasters_started, 1);
    }
}
