// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Configuration loading: stream map, volume level tables, and the
//! initial-level sidecar, each resolved env-override -> config-dir ->
//! bundled default.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::manager::{InitialLevelStore, ManagerError, StreamMap, VolumeStore};

const DEFAULT_STREAM_MAP: &str = include_str!("../assets/stream-map.default.json");
const DEFAULT_VOLUME_TABLE: &str = include_str!("../assets/volumes.default.ini");

const STREAM_MAP_ENV: &str = "STREAMMGR_STREAM_MAP";
const VOLUME_TABLE_ENV: &str = "STREAMMGR_VOLUME_TABLE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("initial-levels JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Manager(#[from] ManagerError),
    #[error("no config directory found")]
    NoConfigDir,
    #[error("internal state lock poisoned by an earlier panic")]
    Poisoned,
}

/// Resolves and loads the daemon's three config documents.
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = directories::ProjectDirs::from("org", "streammgr", "streammgr")
            .map(|d| d.config_dir().to_path_buf())
            .ok_or(ConfigError::NoConfigDir)?;
        fs::create_dir_all(&config_dir)?;
        debug!("Config directory: {:?}", config_dir);
        Ok(Self { config_dir })
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.config_dir.join(name)
    }

    /// Loads the Stream Map (C1): an env-var path override, then
    /// `<config-dir>/stream-map.json`, then the bundled default.
    pub fn load_stream_map(&self) -> Result<StreamMap, ConfigError> {
        if let Ok(path) = std::env::var(STREAM_MAP_ENV) {
            info!(path, "Loading stream map from {STREAM_MAP_ENV}");
            let content = fs::read_to_string(path)?;
            return Ok(StreamMap::load(&content)?);
        }

        let path = self.config_path("stream-map.json");
        if path.exists() {
            info!(?path, "Loading stream map from config directory");
            let content = fs::read_to_string(&path)?;
            return Ok(StreamMap::load(&content)?);
        }

        debug!("No stream map override found, using bundled default");
        Ok(StreamMap::load(DEFAULT_STREAM_MAP)?)
    }

    /// Loads the Volume Store (C2) for exactly the volume types the given
    /// stream map declares, reading level tables and gain modifiers from
    /// an env-var override, then `<config-dir>/volumes.ini`, then the
    /// bundled default table.
    pub fn load_volume_store(&self, stream_map: &StreamMap) -> Result<VolumeStore, ConfigError> {
        let mut store = VolumeStore::new(known_volume_types(stream_map));

        let content = if let Ok(path) = std::env::var(VOLUME_TABLE_ENV) {
            info!(path, "Loading volume table from {VOLUME_TABLE_ENV}");
            fs::read_to_string(path)?
        } else {
            let path = self.config_path("volumes.ini");
            if path.exists() {
                info!(?path, "Loading volume table from config directory");
                fs::read_to_string(&path)?
            } else {
                debug!("No volume table override found, using bundled default");
                DEFAULT_VOLUME_TABLE.to_string()
            }
        };

        store.load_ini(&content)?;
        Ok(store)
    }

    pub fn load_initial_levels(&self) -> Result<JsonInitialLevels, ConfigError> {
        let path = self.config_path("initial-levels.json");
        if !path.exists() {
            debug!("No initial-levels sidecar found, starting empty");
            return Ok(JsonInitialLevels::default());
        }
        let content = fs::read_to_string(&path)?;
        let levels: HashMap<String, u32> = serde_json::from_str(&content)?;
        info!(count = levels.len(), "Loaded initial volume levels");
        Ok(JsonInitialLevels { levels })
    }

    pub fn save_initial_levels(&self, levels: &JsonInitialLevels) -> Result<(), ConfigError> {
        let path = self.config_path("initial-levels.json");
        let content = serde_json::to_string_pretty(&levels.levels)?;
        fs::write(&path, content)?;
        debug!(?path, "Saved initial volume levels");
        Ok(())
    }
}

fn known_volume_types(stream_map: &StreamMap) -> Vec<(String, bool)> {
    let (roles, _) = stream_map.roles_and_priorities();
    let mut seen = HashMap::new();
    for role in roles {
        let Some(spec) = stream_map.get(&role) else { continue };
        if let Some(vt) = &spec.volume_type_in {
            *seen.entry(vt.clone()).or_insert(false) |= spec.is_hal_volume_in;
        }
        if let Some(vt) = &spec.volume_type_out {
            *seen.entry(vt.clone()).or_insert(false) |= spec.is_hal_volume_out;
        }
    }
    seen.into_iter().collect()
}

/// Persisted initial-playback-level store (§6), backed by a small JSON
/// sidecar instead of a system key-value service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonInitialLevels {
    levels: HashMap<String, u32>,
}

impl InitialLevelStore for JsonInitialLevels {
    fn initial_level(&self, volume_type: &str) -> Option<u32> {
        self.levels.get(volume_type).copied()
    }
}

impl From<HashMap<String, u32>> for JsonInitialLevels {
    fn from(levels: HashMap<String, u32>) -> Self {
        Self { levels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_default_stream_map_parses() {
        StreamMap::load(DEFAULT_STREAM_MAP).expect("bundled stream map must be valid JSON");
    }

    #[test]
    fn bundled_default_volume_table_loads_against_its_own_stream_map() {
        let map = StreamMap::load(DEFAULT_STREAM_MAP).unwrap();
        let mut store = VolumeStore::new(known_volume_types(&map));
        store
            .load_ini(DEFAULT_VOLUME_TABLE)
            .expect("bundled volume table must parse");
    }

    #[test]
    fn initial_levels_round_trip_through_json() {
        let mut levels = JsonInitialLevels::default();
        levels.levels.insert("media".to_string(), 4);
        let json = serde_json::to_string(&levels.levels).unwrap();
        let restored: HashMap<String, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.get("media"), Some(&4));
    }
}
