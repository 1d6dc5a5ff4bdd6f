use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::world::World;

/// Writes `<dir>/<scenario>/tick_NNNNNN.json` every `interval_ticks` ticks.
pub struct SnapshotWriter {
    output_dir: PathBuf,
    interval_ticks: u64,
}

impl SnapshotWriter {
    pub fn new(output_dir: impl AsRef<Path>, interval_ticks: u64) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            interval_ticks,
        }
    }

    pub fn should_write(&self, tick: u64) -> bool {
        self.interval_ticks > 0 && tick > 0 && tick % self.interval_ticks == 0
    }

    pub fn maybe_write(&self, world: &World, scenario_name: &str) -> Result<Option<PathBuf>> {
        if !self.should_write(world.tick()) {
            return Ok(None);
        }
        let dir = self.output_dir.join(scenario_name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("tick_{:06}.json", world.tick()));
        let json = serde_json::to_string_pretty(&world.snapshot(scenario_name))
            .context("Failed to serialize world snapshot")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_gating() {
        let writer = SnapshotWriter::new("unused", 30);
        assert!(!writer.should_write(0));
        assert!(!writer.should_write(29));
        assert!(writer.should_write(30));
        assert!(!writer.should_write(31));
        assert!(writer.should_write(60));
        assert!(!SnapshotWriter::new("unused", 0).should_write(30));
    }
}
