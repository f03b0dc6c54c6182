use crate::offline::DEFAULT_OFFLINE_CAP_SECS;
use crate::ticks::TickSchedule;
use crate::yields::{AUTO_BASE_PERIOD_MS, MINING_PERIOD_MS, ROOM_PERIOD_MS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "GOAT_CLICKER";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Where the game row, achievements and this file live.
    pub data_dir: PathBuf,
    pub offline: OfflineConfig,
    pub ticks: TicksConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OfflineConfig {
    pub cap_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TicksConfig {
    pub auto_base_ms: u64,
    pub room_ms: u64,
    pub mining_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: Self::default_dir(),
            offline: OfflineConfig {
                cap_secs: DEFAULT_OFFLINE_CAP_SECS,
            },
            ticks: TicksConfig {
                auto_base_ms: AUTO_BASE_PERIOD_MS,
                room_ms: ROOM_PERIOD_MS,
                mining_ms: MINING_PERIOD_MS,
            },
            log: LogConfig {
                filter: "goat_clicker=debug,info".to_string(),
            },
        }
    }
}

impl Config {
    /// Layered load: defaults, then the TOML file (if present), then
    /// `GOAT_CLICKER__SECTION__KEY` environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        let defaults = ::config::Config::try_from(&Config::default())
            .context("Failed to build default configuration")?;

        let settings = ::config::Config::builder()
            .add_source(defaults)
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {:?}", path))?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, writing a default file first if none exists.
    ///
    /// `data_dir` overrides the file's value and is what a freshly written
    /// file records.
    pub fn load_or_init(path: &Path, data_dir: Option<&Path>) -> Result<Self> {
        if !path.exists() {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            let mut fresh = Config::default();
            if let Some(dir) = data_dir {
                fresh.data_dir = dir.to_path_buf();
            }
            fresh.save(path)?;
        }

        let mut config = Self::load(path)?;
        if let Some(dir) = data_dir {
            config.data_dir = dir.to_path_buf();
        }
        Ok(config)
    }

    /// Config file location: explicit path, else inside `data_dir`, else the
    /// home default.
    pub fn resolve_path(explicit: Option<&Path>, data_dir: Option<&Path>) -> PathBuf {
        match (explicit, data_dir) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(dir)) => dir.join(CONFIG_FILE),
            (None, None) => Self::default_path(),
        }
    }

    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".goat-clicker")
    }

    pub fn default_path() -> PathBuf {
        Self::default_dir().join(CONFIG_FILE)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, config_str).context("Failed to write config file")?;

        Ok(())
    }

    pub fn schedule(&self) -> TickSchedule {
        TickSchedule {
            auto_base_ms: self.ticks.auto_base_ms,
            room_ms: self.ticks.room_ms,
            mining_ms: self.ticks.mining_ms,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ticks.auto_base_ms == 0 || self.ticks.room_ms == 0 || self.ticks.mining_ms == 0 {
            anyhow::bail!("Tick periods must be greater than zero");
        }
        Ok(())
    }
}
