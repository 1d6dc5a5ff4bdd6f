//! Static building catalogue.
//!
//! Every placeable building kind maps to one [`BuildingSpec`]. Money figures
//! are monthly (upkeep, income) or one-off (cost); decay is condition points
//! lost per simulated day at full maintenance funding.

use serde::{Deserialize, Serialize};

use crate::components::BudgetCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingCategory {
    Residential,
    Commercial,
    Industrial,
    Office,
    Service,
    Recreation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    House,
    Apartment,
    Shop,
    Mall,
    Farm,
    Factory,
    Office,
    Clinic,
    Hospital,
    School,
    University,
    PoliceStation,
    FireStation,
    Park,
}

/// Area layers a building can project onto surrounding tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageLayer {
    Shopping,
    Healthcare,
    Education,
    Recreation,
    Safety,
    FireProtection,
    Pollution,
}

impl CoverageLayer {
    pub const ALL: [CoverageLayer; 7] = [
        CoverageLayer::Shopping,
        CoverageLayer::Healthcare,
        CoverageLayer::Education,
        CoverageLayer::Recreation,
        CoverageLayer::Safety,
        CoverageLayer::FireProtection,
        CoverageLayer::Pollution,
    ];

    pub fn index(self) -> usize {
        match self {
            CoverageLayer::Shopping => 0,
            CoverageLayer::Healthcare => 1,
            CoverageLayer::Education => 2,
            CoverageLayer::Recreation => 3,
            CoverageLayer::Safety => 4,
            CoverageLayer::FireProtection => 5,
            CoverageLayer::Pollution => 6,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AreaEffect {
    pub layer: CoverageLayer,
    pub strength: f64,
    pub radius: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BuildingSpec {
    pub kind: BuildingKind,
    pub name: &'static str,
    pub category: BuildingCategory,
    pub cost: f64,
    pub upkeep: f64,
    pub income: f64,
    pub residents: u32,
    pub jobs: u32,
    pub min_education: f64,
    pub wage_factor: f64,
    pub decay_per_day: f64,
    pub budget: Option<BudgetCategory>,
    pub effects: &'static [AreaEffect],
}

const fn effect(layer: CoverageLayer, strength: f64, radius: f64) -> AreaEffect {
    AreaEffect {
        layer,
        strength,
        radius,
    }
}

const HOUSE: BuildingSpec = BuildingSpec {
    kind: BuildingKind::House,
    name: "House",
    category: BuildingCategory::Residential,
    cost: 400.0,
    upkeep: 4.0,
    income: 0.0,
    residents: 4,
    jobs: 0,
    min_education: 0.0,
    wage_factor: 0.0,
    decay_per_day: 0.02,
    budget: None,
    effects: &[],
};

const APARTMENT: BuildingSpec = BuildingSpec {
    kind: BuildingKind::Apartment,
    name: "Apartment block",
    category: BuildingCategory::Residential,
    cost: 2_200.0,
    upkeep: 25.0,
    income: 0.0,
    residents: 24,
    jobs: 0,
    min_education: 0.0,
    wage_factor: 0.0,
    decay_per_day: 0.03,
    budget: None,
    effects: &[],
};

const SHOP: BuildingSpec = BuildingSpec {
    kind: BuildingKind::Shop,
    name: "Shop",
    category: BuildingCategory::Commercial,
    cost: 900.0,
    upkeep: 15.0,
    income: 350.0,
    residents: 0,
    jobs: 6,
    min_education: 0.0,
    wage_factor: 1.0,
    decay_per_day: 0.03,
    budget: None,
    effects: &[effect(CoverageLayer::Shopping, 60.0, 6.0)],
};

const MALL: BuildingSpec = BuildingSpec {
    kind: BuildingKind::Mall,
    name: "Mall",
    category: BuildingCategory::Commercial,
    cost: 7_000.0,
    upkeep: 110.0,
    income: 2_600.0,
    residents: 0,
    jobs: 30,
    min_education: 0.0,
    wage_factor: 1.05,
    decay_per_day: 0.03,
    budget: None,
    effects: &[effect(CoverageLayer::Shopping, 95.0, 11.0)],
};

const FARM: BuildingSpec = BuildingSpec {
    kind: BuildingKind::Farm,
    name: "Farm",
    category: BuildingCategory::Industrial,
    cost: 1_200.0,
    upkeep: 10.0,
    income: 450.0,
    residents: 0,
    jobs: 8,
    min_education: 0.0,
    wage_factor: 0.9,
    decay_per_day: 0.02,
    budget: None,
    effects: &[],
};

const FACTORY: BuildingSpec = BuildingSpec {
    kind: BuildingKind::Factory,
    name: "Factory",
    category: BuildingCategory::Industrial,
    cost: 4_500.0,
    upkeep: 70.0,
    income: 1_900.0,
    residents: 0,
    jobs: 28,
    min_education: 0.0,
    wage_factor: 1.1,
    decay_per_day: 0.04,
    budget: None,
    effects: &[effect(CoverageLayer::Pollution, 45.0, 5.0)],
};

const OFFICE: BuildingSpec = BuildingSpec {
    kind: BuildingKind::Office,
    name: "Office tower",
    category: BuildingCategory::Office,
    cost: 5_500.0,
    upkeep: 55.0,
    income: 2_300.0,
    residents: 0,
    jobs: 20,
    min_education: 45.0,
    wage_factor: 1.5,
    decay_per_day: 0.025,
    budget: None,
    effects: &[],
};

const CLINIC: BuildingSpec = BuildingSpec {
    kind: BuildingKind::Clinic,
    name: "Clinic",
    category: BuildingCategory::Service,
    cost: 2_500.0,
    upkeep: 140.0,
    income: 0.0,
    residents: 0,
    jobs: 6,
    min_education: 50.0,
    wage_factor: 1.3,
    decay_per_day: 0.025,
    budget: Some(BudgetCategory::Healthcare),
    effects: &[effect(CoverageLayer::Healthcare, 70.0, 7.0)],
};

const HOSPITAL: BuildingSpec = BuildingSpec {
    kind: BuildingKind::Hospital,
    name: "Hospital",
    category: BuildingCategory::Service,
    cost: 11_000.0,
    upkeep: 550.0,
    income: 0.0,
    residents: 0,
    jobs: 30,
    min_education: 55.0,
    wage_factor: 1.4,
    decay_per_day: 0.025,
    budget: Some(BudgetCategory::Healthcare),
    effects: &[effect(CoverageLayer::Healthcare, 100.0, 12.0)],
};

const SCHOOL: BuildingSpec = BuildingSpec {
    kind: BuildingKind::School,
    name: "School",
    category: BuildingCategory::Service,
    cost: 3_500.0,
    upkeep: 180.0,
    income: 0.0,
    residents: 0,
    jobs: 10,
    min_education: 50.0,
    wage_factor: 1.2,
    decay_per_day: 0.025,
    budget: Some(BudgetCategory::Education),
    effects: &[effect(CoverageLayer::Education, 80.0, 8.0)],
};

const UNIVERSITY: BuildingSpec = BuildingSpec {
    kind: BuildingKind::University,
    name: "University",
    category: BuildingCategory::Service,
    cost: 18_000.0,
    upkeep: 800.0,
    income: 0.0,
    residents: 0,
    jobs: 40,
    min_education: 65.0,
    wage_factor: 1.6,
    decay_per_day: 0.02,
    budget: Some(BudgetCategory::Education),
    effects: &[effect(CoverageLayer::Education, 100.0, 14.0)],
};

const POLICE_STATION: BuildingSpec = BuildingSpec {
    kind: BuildingKind::PoliceStation,
    name: "Police station",
    category: BuildingCategory::Service,
    cost: 3_000.0,
    upkeep: 220.0,
    income: 0.0,
    residents: 0,
    jobs: 10,
    min_education: 20.0,
    wage_factor: 1.2,
    decay_per_day: 0.03,
    budget: Some(BudgetCategory::Safety),
    effects: &[effect(CoverageLayer::Safety, 80.0, 9.0)],
};

const FIRE_STATION: BuildingSpec = BuildingSpec {
    kind: BuildingKind::FireStation,
    name: "Fire station",
    category: BuildingCategory::Service,
    cost: 3_000.0,
    upkeep: 220.0,
    income: 0.0,
    residents: 0,
    jobs: 10,
    min_education: 20.0,
    wage_factor: 1.2,
    decay_per_day: 0.03,
    budget: Some(BudgetCategory::Safety),
    effects: &[
        effect(CoverageLayer::Safety, 35.0, 9.0),
        effect(CoverageLayer::FireProtection, 90.0, 10.0),
    ],
};

const PARK: BuildingSpec = BuildingSpec {
    kind: BuildingKind::Park,
    name: "Park",
    category: BuildingCategory::Recreation,
    cost: 700.0,
    upkeep: 18.0,
    income: 0.0,
    residents: 0,
    jobs: 1,
    min_education: 0.0,
    wage_factor: 0.8,
    decay_per_day: 0.02,
    budget: Some(BudgetCategory::Recreation),
    effects: &[effect(CoverageLayer::Recreation, 70.0, 6.0)],
};

impl BuildingKind {
    pub const ALL: [BuildingKind; 14] = [
        BuildingKind::House,
        BuildingKind::Apartment,
        BuildingKind::Shop,
        BuildingKind::Mall,
        BuildingKind::Farm,
        BuildingKind::Factory,
        BuildingKind::Office,
        BuildingKind::Clinic,
        BuildingKind::Hospital,
        BuildingKind::School,
        BuildingKind::University,
        BuildingKind::PoliceStation,
        BuildingKind::FireStation,
        BuildingKind::Park,
    ];

    pub fn spec(self) -> &'static BuildingSpec {
        match self {
            BuildingKind::House => &HOUSE,
            BuildingKind::Apartment => &APARTMENT,
            BuildingKind::Shop => &SHOP,
            BuildingKind::Mall => &MALL,
            BuildingKind::Farm => &FARM,
            BuildingKind::Factory => &FACTORY,
            BuildingKind::Office => &OFFICE,
            BuildingKind::Clinic => &CLINIC,
            BuildingKind::Hospital => &HOSPITAL,
            BuildingKind::School => &SCHOOL,
            BuildingKind::University => &UNIVERSITY,
            BuildingKind::PoliceStation => &POLICE_STATION,
            BuildingKind::FireStation => &FIRE_STATION,
            BuildingKind::Park => &PARK,
        }
    }

    pub fn category(self) -> BuildingCategory {
        self.spec().category
    }

    pub fn is_residential(self) -> bool {
        self.category() == BuildingCategory::Residential
    }

    pub fn is_workplace(self) -> bool {
        self.spec().jobs > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_consistent() {
        for kind in BuildingKind::ALL {
            let spec = kind.spec();
            assert_eq!(spec.kind, kind, "{} maps to the wrong spec", spec.name);
            assert!(spec.cost > 0.0);
            assert!(spec.decay_per_day > 0.0);
            if kind.is_residential() {
                assert!(spec.residents > 0 && spec.jobs == 0);
            } else {
                assert!(spec.jobs > 0 && spec.wage_factor > 0.0);
            }
            for effect in spec.effects {
                assert!(effect.strength > 0.0 && effect.radius > 0.0);
            }
        }
    }

    #[test]
    fn service_buildings_draw_from_a_budget() {
        for kind in BuildingKind::ALL {
            let spec = kind.spec();
            let serves_citizens = spec
                .effects
                .iter()
                .any(|e| e.layer != CoverageLayer::Shopping && e.layer != CoverageLayer::Pollution);
            assert_eq!(serves_citizens, spec.budget.is_some(), "{}", spec.name);
        }
    }

    #[test]
    fn layer_indices_are_unique() {
        let mut seen = [false; 7];
        for layer in CoverageLayer::ALL {
            assert!(!seen[layer.index()]);
            seen[layer.index()] = true;
        }
    }
}
