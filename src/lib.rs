pub mod achievements;
pub mod actions;
pub mod catalog;
pub mod components;
pub mod coverage;
pub mod engine;
pub mod grid;
pub mod hazards;
pub mod rng;
pub mod save;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod web;
pub mod world;

pub use actions::{CityAction, CityError, ScheduledAction};
pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use save::{SaveError, SaveGame};
pub use scenario::{Scenario, ScenarioLoader};
pub use systems::Cadence;
pub use world::{EntityId, World, WorldSnapshot};
