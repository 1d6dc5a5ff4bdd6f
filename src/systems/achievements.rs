use anyhow::Result;
use tracing::info;

use crate::{
    achievements::{self, definitions},
    components::EventKind,
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Tracks progress on every achievement and pays out rewards once.
pub struct AchievementSystem;

impl AchievementSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AchievementSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AchievementSystem {
    fn name(&self) -> &str {
        "achievements"
    }

    fn default_interval(&self) -> u64 {
        7
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng) -> Result<()> {
        achievements::sync_states(&mut world.achievements);
        let day = world.days_elapsed();
        for def in definitions() {
            let progress = achievements::progress(&def.requirement, world);
            let Some(state) = world.achievements.iter_mut().find(|s| s.id == def.id) else {
                continue;
            };
            if state.unlocked {
                continue;
            }
            state.progress = progress;
            if progress < 1.0 {
                continue;
            }
            state.unlocked = true;
            state.unlocked_day = Some(day);
            world.ledger.money += def.reward;
            world.push_event(
                EventKind::AchievementUnlocked,
                format!("Achievement unlocked: {} (+{:.0})", def.title, def.reward),
            );
            info!(
                target: "civitas::achievements",
                tick = ctx.tick,
                id = def.id,
                reward = def.reward,
                "achievement.unlocked"
            );
        }
        Ok(())
    }
}
