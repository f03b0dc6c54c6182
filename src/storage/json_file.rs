use super::{AchievementSet, Snapshot, Storage};
use crate::error::StoreError;
use crate::types::GameState;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const STATE_FILE: &str = "state.json";
const ACHIEVEMENTS_FILE: &str = "achievements.json";

/// Stores the row and the achievement set as two JSON files in a directory.
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!("💾 Game data directory: {:?}", dir);
        Ok(Self { dir })
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub fn achievements_path(&self) -> PathBuf {
        self.dir.join(ACHIEVEMENTS_FILE)
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let value = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?;
        Ok(Some(value))
    }

    /// Write to a sibling temp file, flush it to disk and rename over the
    /// target. Readers only ever see a complete snapshot, even after a crash.
    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");

        let mut file = File::create(&tmp)?;
        file.write_all(&body)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, path)?;
        Self::sync_parent(path)?;
        debug!("Wrote {:?}", path);
        Ok(())
    }

    /// Persist the rename itself.
    #[cfg(unix)]
    fn sync_parent(path: &Path) -> Result<(), StoreError> {
        if let Some(dir) = path.parent() {
            File::open(dir)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_parent(_path: &Path) -> Result<(), StoreError> {
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Snapshot, StoreError> {
        let state = Self::read_json::<GameState>(&self.state_path())?;
        let achievements = Self::read_json::<AchievementSet>(&self.achievements_path())?
            .unwrap_or_default();
        Ok(Snapshot {
            state,
            achievements,
        })
    }

    fn save_state(&self, state: &GameState) -> Result<(), StoreError> {
        Self::write_json(&self.state_path(), state)
    }

    fn save_achievements(&self, achievements: &AchievementSet) -> Result<(), StoreError> {
        Self::write_json(&self.achievements_path(), achievements)
    }
}
