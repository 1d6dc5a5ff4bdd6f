use serde::{Deserialize, Serialize};

use crate::{
    catalog::BuildingKind,
    grid::Position,
    world::EntityId,
};

pub const MAX_LEVEL: f64 = 100.0;

pub fn clamp_level(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, MAX_LEVEL)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedKind {
    Housing,
    Employment,
    Shopping,
    Healthcare,
    Education,
    Recreation,
    Safety,
    Environment,
}

impl NeedKind {
    pub const ALL: [NeedKind; 8] = [
        NeedKind::Housing,
        NeedKind::Employment,
        NeedKind::Shopping,
        NeedKind::Healthcare,
        NeedKind::Education,
        NeedKind::Recreation,
        NeedKind::Safety,
        NeedKind::Environment,
    ];
}

/// Satisfaction of each need, 0 (unmet) to 100 (fully met).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    pub housing: f64,
    pub employment: f64,
    pub shopping: f64,
    pub healthcare: f64,
    pub education: f64,
    pub recreation: f64,
    pub safety: f64,
    pub environment: f64,
}

impl Needs {
    pub fn uniform(level: f64) -> Self {
        Self {
            housing: level,
            employment: level,
            shopping: level,
            healthcare: level,
            education: level,
            recreation: level,
            safety: level,
            environment: level,
        }
    }

    pub fn get(&self, kind: NeedKind) -> f64 {
        match kind {
            NeedKind::Housing => self.housing,
            NeedKind::Employment => self.employment,
            NeedKind::Shopping => self.shopping,
            NeedKind::Healthcare => self.healthcare,
            NeedKind::Education => self.education,
            NeedKind::Recreation => self.recreation,
            NeedKind::Safety => self.safety,
            NeedKind::Environment => self.environment,
        }
    }

    pub fn get_mut(&mut self, kind: NeedKind) -> &mut f64 {
        match kind {
            NeedKind::Housing => &mut self.housing,
            NeedKind::Employment => &mut self.employment,
            NeedKind::Shopping => &mut self.shopping,
            NeedKind::Healthcare => &mut self.healthcare,
            NeedKind::Education => &mut self.education,
            NeedKind::Recreation => &mut self.recreation,
            NeedKind::Safety => &mut self.safety,
            NeedKind::Environment => &mut self.environment,
        }
    }

    pub fn clamp_all(&mut self) {
        for kind in NeedKind::ALL {
            let value = self.get_mut(kind);
            *value = clamp_level(*value);
        }
    }
}

impl Default for Needs {
    fn default() -> Self {
        Self::uniform(50.0)
    }
}

/// Personality traits in 0..=1. They reweight needs and soften shocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub ambition: f64,
    pub sociability: f64,
    pub frugality: f64,
    pub resilience: f64,
}

impl Personality {
    pub fn need_weight(&self, kind: NeedKind) -> f64 {
        match kind {
            NeedKind::Housing => 1.6,
            NeedKind::Employment => 0.8 + self.ambition,
            NeedKind::Shopping => 0.5 + 0.5 * self.sociability - 0.3 * self.frugality,
            NeedKind::Healthcare => 1.0,
            NeedKind::Education => 0.4 + 0.8 * self.ambition,
            NeedKind::Recreation => 0.4 + 0.8 * self.sociability,
            NeedKind::Safety => 1.1,
            NeedKind::Environment => 0.7,
        }
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            ambition: 0.5,
            sociability: 0.5,
            frugality: 0.5,
            resilience: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citizen {
    pub name: String,
    pub age_years: f64,
    pub education: f64,
    pub happiness: f64,
    pub wealth: f64,
    pub needs: Needs,
    pub traits: Personality,
    pub home: Option<EntityId>,
    pub workplace: Option<EntityId>,
    #[serde(default)]
    pub unhappy_days: f64,
    #[serde(default)]
    pub homeless_days: f64,
}

impl Citizen {
    pub const WORKING_AGE: (f64, f64) = (18.0, 65.0);

    pub fn is_working_age(&self) -> bool {
        self.age_years >= Self::WORKING_AGE.0 && self.age_years < Self::WORKING_AGE.1
    }

    pub fn is_employed(&self) -> bool {
        self.workplace.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub kind: BuildingKind,
    pub position: Position,
    pub condition: f64,
    pub built_day: f64,
}

impl Building {
    pub fn new(kind: BuildingKind, position: Position, built_day: f64) -> Self {
        Self {
            kind,
            position,
            condition: MAX_LEVEL,
            built_day,
        }
    }

    /// 0..=1 factor applied to everything the building produces.
    pub fn condition_factor(&self) -> f64 {
        clamp_level(self.condition) / MAX_LEVEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterKind {
    Fire,
    Flood,
    Earthquake,
    Tornado,
    Epidemic,
}

impl DisasterKind {
    pub const ALL: [DisasterKind; 5] = [
        DisasterKind::Fire,
        DisasterKind::Flood,
        DisasterKind::Earthquake,
        DisasterKind::Tornado,
        DisasterKind::Epidemic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DisasterKind::Fire => "fire",
            DisasterKind::Flood => "flood",
            DisasterKind::Earthquake => "earthquake",
            DisasterKind::Tornado => "tornado",
            DisasterKind::Epidemic => "epidemic",
        }
    }
}

/// Per-day deltas a disaster applies inside its radius, already scaled by severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterEffects {
    pub building_damage: f64,
    pub happiness: f64,
    pub safety: f64,
    pub health: f64,
    pub mortality: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disaster {
    pub kind: DisasterKind,
    pub severity: f64,
    pub epicenter: Position,
    pub radius: f64,
    pub started_day: f64,
    pub duration_days: f64,
    pub elapsed_days: f64,
    pub effects: DisasterEffects,
}

impl Disaster {
    pub fn is_expired(&self) -> bool {
        self.elapsed_days >= self.duration_days
    }

    pub fn covers(&self, pos: Position) -> bool {
        self.epicenter.distance(pos) <= self.radius
    }

    /// Intensity at `pos`: 1 at the epicenter falling to 0.5 at the edge, 0 outside.
    pub fn intensity_at(&self, pos: Position) -> f64 {
        if !self.covers(pos) {
            return 0.0;
        }
        if self.radius <= 0.0 {
            return 1.0;
        }
        1.0 - 0.5 * (self.epicenter.distance(pos) / self.radius)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCategory {
    Healthcare,
    Education,
    Safety,
    Recreation,
    Maintenance,
}

impl BudgetCategory {
    pub const ALL: [BudgetCategory; 5] = [
        BudgetCategory::Healthcare,
        BudgetCategory::Education,
        BudgetCategory::Safety,
        BudgetCategory::Recreation,
        BudgetCategory::Maintenance,
    ];
}

/// Funding levels per budget category; 1.0 is fully funded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocations {
    pub healthcare: f64,
    pub education: f64,
    pub safety: f64,
    pub recreation: f64,
    pub maintenance: f64,
}

impl BudgetAllocations {
    pub const MAX_FUNDING: f64 = 1.5;

    pub fn level(&self, category: BudgetCategory) -> f64 {
        match category {
            BudgetCategory::Healthcare => self.healthcare,
            BudgetCategory::Education => self.education,
            BudgetCategory::Safety => self.safety,
            BudgetCategory::Recreation => self.recreation,
            BudgetCategory::Maintenance => self.maintenance,
        }
    }

    pub fn level_mut(&mut self, category: BudgetCategory) -> &mut f64 {
        match category {
            BudgetCategory::Healthcare => &mut self.healthcare,
            BudgetCategory::Education => &mut self.education,
            BudgetCategory::Safety => &mut self.safety,
            BudgetCategory::Recreation => &mut self.recreation,
            BudgetCategory::Maintenance => &mut self.maintenance,
        }
    }
}

impl Default for BudgetAllocations {
    fn default() -> Self {
        Self {
            healthcare: 1.0,
            education: 1.0,
            safety: 1.0,
            recreation: 1.0,
            maintenance: 1.0,
        }
    }
}

/// Demand multipliers in 0..=2; 1.0 is balanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDemand {
    pub residential: f64,
    pub commercial: f64,
    pub industrial: f64,
}

impl Default for MarketDemand {
    fn default() -> Self {
        Self {
            residential: 1.0,
            commercial: 1.0,
            industrial: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub month: u64,
    pub income_tax: f64,
    pub business_income: f64,
    pub building_upkeep: f64,
    pub service_upkeep: f64,
    pub balance_after: f64,
}

impl MonthlyReport {
    pub fn income(&self) -> f64 {
        self.income_tax + self.business_income
    }

    pub fn expenses(&self) -> f64 {
        self.building_upkeep + self.service_upkeep
    }

    pub fn net(&self) -> f64 {
        self.income() - self.expenses()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyLedger {
    pub money: f64,
    pub tax_rate: f64,
    #[serde(default)]
    pub budget: BudgetAllocations,
    #[serde(default)]
    pub demand: MarketDemand,
    #[serde(default)]
    pub months_elapsed: u64,
    #[serde(default)]
    pub deficit_streak: u32,
    #[serde(default)]
    pub history: Vec<MonthlyReport>,
}

impl EconomyLedger {
    pub const MAX_TAX_RATE: f64 = 0.5;
    pub const HISTORY_MONTHS: usize = 12;

    pub fn new(money: f64, tax_rate: f64) -> Self {
        Self {
            money,
            tax_rate,
            budget: BudgetAllocations::default(),
            demand: MarketDemand::default(),
            months_elapsed: 0,
            deficit_streak: 0,
            history: Vec::new(),
        }
    }

    pub fn last_report(&self) -> Option<&MonthlyReport> {
        self.history.last()
    }

    pub fn record(&mut self, report: MonthlyReport) {
        self.history.push(report);
        if self.history.len() > Self::HISTORY_MONTHS {
            let excess = self.history.len() - Self::HISTORY_MONTHS;
            self.history.drain(..excess);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityStats {
    pub buildings_built: u64,
    pub buildings_lost: u64,
    pub births: u64,
    pub deaths: u64,
    pub immigrants: u64,
    pub emigrants: u64,
    pub disasters_started: u64,
    pub disasters_survived: u64,
    pub peak_population: u64,
    pub surplus_months: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BuildingPlaced,
    BuildingDemolished,
    BuildingCollapsed,
    DisasterStarted,
    DisasterEnded,
    AchievementUnlocked,
    MonthClosed,
    BudgetDeficit,
    ActionRejected,
}

/// Player-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityEvent {
    pub tick: u64,
    pub day: f64,
    pub kind: EventKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AchievementState {
    pub id: String,
    pub unlocked: bool,
    pub unlocked_day: Option<f64>,
    pub progress: f64,
}
