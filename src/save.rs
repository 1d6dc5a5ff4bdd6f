//! Versioned save games.
//!
//! A save is the complete [`World`] plus the seed it was running with. The
//! random streams only depend on `(seed, system, tick)`, so a loaded game
//! continues exactly where the saved one would have gone.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{achievements, world::World};

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save file has no version field")]
    MissingVersion,
    #[error("save version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u64, supported: u32 },
    #[error("malformed save data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveGame {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub scenario: String,
    pub seed: u64,
    pub world: World,
}

impl SaveGame {
    pub fn new(scenario: impl Into<String>, seed: u64, world: World) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: Utc::now(),
            scenario: scenario.into(),
            seed,
            world,
        }
    }

    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a save, rejecting files without a version or from a newer build.
    /// Sections added after version 1 fall back to their defaults.
    pub fn from_json(data: &str) -> Result<Self, SaveError> {
        let raw: serde_json::Value = serde_json::from_str(data)?;
        let version = raw
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or(SaveError::MissingVersion)?;
        if version > u64::from(SAVE_VERSION) {
            return Err(SaveError::UnsupportedVersion {
                found: version,
                supported: SAVE_VERSION,
            });
        }
        let mut save: SaveGame = serde_json::from_value(raw)?;
        achievements::sync_states(&mut save.world.achievements);
        Ok(save)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SaveError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, SaveError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }
}
