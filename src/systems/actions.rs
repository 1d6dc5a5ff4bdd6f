use anyhow::Result;
use tracing::{debug, warn};

use crate::{
    components::EventKind,
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Replays scheduled city actions once their day has come.
///
/// A rejected action is reported as an event and dropped; it never aborts the run.
pub struct ActionSystem;

impl ActionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ActionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ActionSystem {
    fn name(&self) -> &str {
        "actions"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng) -> Result<()> {
        for scheduled in world.take_due_actions(ctx.day) {
            match world.apply_action(&scheduled.action) {
                Ok(()) => {
                    debug!(target: "civitas::actions", tick = ctx.tick, action = ?scheduled.action, "action.applied");
                }
                Err(err) => {
                    warn!(
                        target: "civitas::actions",
                        tick = ctx.tick,
                        action = ?scheduled.action,
                        error = %err,
                        "action.rejected"
                    );
                    world.push_event(EventKind::ActionRejected, err.to_string());
                }
            }
        }
        Ok(())
    }
}
