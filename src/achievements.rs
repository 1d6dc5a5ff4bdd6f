use crate::{components::AchievementState, world::World};

#[derive(Debug, Clone, Copy)]
pub enum Requirement {
    Population(u64),
    BuildingsBuilt(u64),
    Money(f64),
    AverageHappiness { min: f64, min_population: u64 },
    DisastersSurvived(u64),
    UnemploymentBelow { max: f64, min_population: u64 },
    AverageEducation { min: f64, min_population: u64 },
    SurplusMonths(u64),
}

#[derive(Debug, Clone, Copy)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub requirement: Requirement,
    pub reward: f64,
}

const ACHIEVEMENTS: &[AchievementDefinition] = &[
    AchievementDefinition {
        id: "first_steps",
        title: "First Steps",
        requirement: Requirement::BuildingsBuilt(5),
        reward: 500.0,
    },
    AchievementDefinition {
        id: "village",
        title: "Village",
        requirement: Requirement::Population(50),
        reward: 1_000.0,
    },
    AchievementDefinition {
        id: "town",
        title: "Town",
        requirement: Requirement::Population(250),
        reward: 5_000.0,
    },
    AchievementDefinition {
        id: "city",
        title: "City",
        requirement: Requirement::Population(1_000),
        reward: 20_000.0,
    },
    AchievementDefinition {
        id: "prosperous",
        title: "Prosperous",
        requirement: Requirement::Money(100_000.0),
        reward: 0.0,
    },
    AchievementDefinition {
        id: "happy_citizens",
        title: "Happy Citizens",
        requirement: Requirement::AverageHappiness {
            min: 75.0,
            min_population: 50,
        },
        reward: 2_500.0,
    },
    AchievementDefinition {
        id: "survivor",
        title: "Survivor",
        requirement: Requirement::DisastersSurvived(1),
        reward: 1_000.0,
    },
    AchievementDefinition {
        id: "resilient",
        title: "Resilient",
        requirement: Requirement::DisastersSurvived(10),
        reward: 10_000.0,
    },
    AchievementDefinition {
        id: "full_employment",
        title: "Full Employment",
        requirement: Requirement::UnemploymentBelow {
            max: 0.03,
            min_population: 100,
        },
        reward: 3_000.0,
    },
    AchievementDefinition {
        id: "educated",
        title: "Educated Populace",
        requirement: Requirement::AverageEducation {
            min: 60.0,
            min_population: 100,
        },
        reward: 3_000.0,
    },
    AchievementDefinition {
        id: "balanced_books",
        title: "Balanced Books",
        requirement: Requirement::SurplusMonths(12),
        reward: 5_000.0,
    },
];

pub fn definitions() -> &'static [AchievementDefinition] {
    ACHIEVEMENTS
}

pub fn definition(id: &str) -> Option<&'static AchievementDefinition> {
    ACHIEVEMENTS.iter().find(|def| def.id == id)
}

pub fn initial_states() -> Vec<AchievementState> {
    ACHIEVEMENTS
        .iter()
        .map(|def| AchievementState {
            id: def.id.to_string(),
            ..AchievementState::default()
        })
        .collect()
}

/// Adds states for achievements missing from an older save and drops unknown ids.
pub fn sync_states(states: &mut Vec<AchievementState>) {
    states.retain(|state| definition(&state.id).is_some());
    for def in ACHIEVEMENTS {
        if !states.iter().any(|state| state.id == def.id) {
            states.push(AchievementState {
                id: def.id.to_string(),
                ..AchievementState::default()
            });
        }
    }
}

fn ratio(current: f64, target: f64) -> f64 {
    if target <= 0.0 {
        1.0
    } else {
        (current / target).clamp(0.0, 1.0)
    }
}

/// Progress toward `requirement` in 0..=1; 1 means satisfied.
pub fn progress(requirement: &Requirement, world: &World) -> f64 {
    let population = world.total_population();
    let gated = |min_population: u64, inner: f64| {
        if population < min_population {
            ratio(population as f64, min_population as f64).min(0.99) * inner.min(1.0)
        } else {
            inner
        }
    };
    match *requirement {
        Requirement::Population(target) => ratio(population as f64, target as f64),
        Requirement::BuildingsBuilt(target) => {
            ratio(world.stats().buildings_built as f64, target as f64)
        }
        Requirement::Money(target) => ratio(world.ledger().money, target),
        Requirement::AverageHappiness {
            min,
            min_population,
        } => gated(min_population, ratio(world.average_happiness(), min)),
        Requirement::DisastersSurvived(target) => {
            ratio(world.stats().disasters_survived as f64, target as f64)
        }
        Requirement::UnemploymentBelow {
            max,
            min_population,
        } => {
            let unemployment = world.unemployment_rate();
            let inner = if unemployment <= max {
                1.0
            } else {
                ratio(1.0 - unemployment, 1.0 - max)
            };
            gated(min_population, inner)
        }
        Requirement::AverageEducation {
            min,
            min_population,
        } => gated(min_population, ratio(world.average_education(), min)),
        Requirement::SurplusMonths(target) => {
            ratio(world.stats().surplus_months as f64, target as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        components::{AchievementState, EconomyLedger},
        grid::CityGrid,
    };

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<&str> = definitions().iter().map(|def| def.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), definitions().len());
    }

    #[test]
    fn sync_repairs_old_state_lists() {
        let mut states = vec![
            AchievementState {
                id: "village".into(),
                unlocked: true,
                unlocked_day: Some(40.0),
                progress: 1.0,
            },
            AchievementState {
                id: "retired_achievement".into(),
                ..AchievementState::default()
            },
        ];
        sync_states(&mut states);
        assert_eq!(states.len(), definitions().len());
        assert!(states.iter().any(|s| s.id == "village" && s.unlocked));
        assert!(!states.iter().any(|s| s.id == "retired_achievement"));
    }

    #[test]
    fn gated_requirements_stay_below_one_for_small_cities() {
        let world = World::new(CityGrid::flat(4, 4), EconomyLedger::new(0.0, 0.1), 1.0);
        let requirement = Requirement::UnemploymentBelow {
            max: 0.03,
            min_population: 100,
        };
        assert!(progress(&requirement, &world) < 1.0);
        assert_eq!(progress(&Requirement::Money(0.0), &world), 1.0);
    }
}
